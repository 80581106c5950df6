//! Domain model and shared primitives for the keyword-research pipeline.
//!
//! This crate provides the fundamental building blocks used across every
//! other `kwr-*` crate: the Run/Job/Keyword/Cluster/Stage domain model, the
//! shared error taxonomy, and small validated value types (`Phrase`,
//! `Score`, `Similarity`).
pub mod error;
pub mod ids;
pub mod models;
pub mod traits;
pub mod values;

pub use error::{KwrError, Result};
pub use ids::{ClusterId, JobId, KeywordId, RoadmapItemId, RunId};

/// Re-export commonly used types so downstream crates don't need their own
/// `chrono`/`uuid` dependency just to name a field type.
pub use chrono::{DateTime, Utc};
pub use uuid::Uuid;
