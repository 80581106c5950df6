//! Run Store Interface: persists `Run`, `Keyword`, `Cluster`, and
//! `RoadmapItem` state across a pipeline execution and exposes progress
//! snapshots to pollers. The concrete backend is a deployment choice;
//! `InMemoryRunStore` is the reference implementation used by `kwr-service`
//! and the test suite.

pub mod store;

pub use store::{InMemoryRunStore, RunStore};
