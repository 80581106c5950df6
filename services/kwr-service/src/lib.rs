//! kwr-service: orchestrates the keyword-research pipeline over HTTP.
//!
//! Ties together `kwr-core` domain types, `kwr-config` settings,
//! `kwr-providers` backends, and `kwr-pipeline`'s pure engines behind one
//! per-run `Orchestrator`, following the teacher's container/HTTP split.

pub mod config;
pub mod container;
pub mod http;
pub mod orchestrator;
pub mod providers;
pub mod stages;

pub use config::Config;
pub use container::ServiceContainer;
pub use http::HttpServer;
pub use orchestrator::build_pipeline;
