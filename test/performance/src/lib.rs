//! Throughput benchmarks for the pipeline's CPU-bound cores live in
//! `tests/throughput.rs`; this crate has no runtime surface of its own.
