//! Relay Engine
//!
//! Queue-backed job coordination and adaptive execution.
//!
//! This crate contains:
//! - Coordinator: submission, leasing, retries and result persistence
//! - Strategy engine: sequential, batched, bounded, tiered and adaptive runs
//! - Distributor, aggregator and test suite builders
//! - Repositories for the queue, object store and metrics sink, with HTTP and
//!   in-memory implementations

pub mod aggregate;
pub mod config;
pub mod coordinator;
pub mod distributor;
pub mod error;
pub mod repository;
pub mod service;
pub mod strategy;
pub mod suite;

pub use aggregate::{AggregateReport, ErrorAggregator};
pub use config::Config;
pub use coordinator::{ConsumerSettings, JobCoordinator, ResultArchive};
pub use distributor::ErrorDistributor;
pub use error::{RelayError, Result};
pub use strategy::{ExecutionConfig, ProgressSink, StrategyEngine};
pub use suite::TestSuiteBuilder;
