//! Core library for the `hoststat` daemon.
//!
//! Each enabled metric source gets its own sampling pipeline that ticks once
//! per second, keeps recent samples in a bounded recency buffer, and
//! periodically reduces the latest window of samples into an
//! [`source::AggregateSnapshot`]. The [`orchestrator::Orchestrator`] runs all
//! pipelines concurrently and merges their snapshots into a single output
//! stream, which the `hoststat` binary prints through [`sinks`].
pub mod args;
pub mod buffer;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod pipeline;
pub mod shutdown;
pub mod sinks;
pub mod source;
