//! Repository layer
//!
//! Repositories abstract the external services the coordinator depends on:
//! the durable queue, the result object store and the metrics sink. They carry
//! no business logic.
//!
//! All repositories are trait-based so the engine can run against the HTTP
//! services or the in-memory implementations used for local runs and tests.

mod memory;
mod metrics;
mod queue;
mod store;

// Re-export traits
pub use metrics::MetricsSink;
pub use queue::QueueService;
pub use store::ObjectStore;

// Re-export implementations
pub use memory::{InMemoryMetrics, InMemoryObjectStore, InMemoryQueue, StoredObject};
pub use metrics::{HttpMetricsSink, LogMetricsSink, record_metric};
pub use queue::HttpQueue;
pub use store::HttpObjectStore;
