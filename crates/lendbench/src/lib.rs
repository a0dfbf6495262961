//! Cross-Database Latency Benchmark
//!
//! This crate measures how long the same library-lending queries take on
//! different database engines.
//!
//! # Components
//!
//! - **Sampler**: one cold run plus N warm runs, with mean and 95% CI
//! - **Dataset**: synthetic books, borrowers and lending transactions, plus
//!   sized subsets (250k to 1000k)
//! - **Queries**: four queries of increasing join complexity
//! - **Backends**: MySQL, Cassandra, MongoDB, Neo4j, Redis, and in-process
//!   SQLite and key-value stores
//! - **Report**: accumulated results CSV and a cold-time chart

pub mod backends;
pub mod config;
pub mod dataset;
pub mod error;
pub mod query;
pub mod report;
pub mod runner;
pub mod sampler;

pub use backends::{open, Backend, BackendKind, KeyValueBackend, MemoryStore, SqliteBackend};
pub use config::AdapterConfig;
pub use dataset::{Dataset, DatasetSize};
pub use error::{Error, Result};
pub use query::{QueryId, QueryParams, QueryRows};
pub use report::{Measurement, ResultRow};
pub use runner::run_suite;
pub use sampler::{measure, MeasurementResult, Sampler};
