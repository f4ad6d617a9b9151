//! Data Transfer Objects for the external services
//!
//! This module contains DTOs exchanged with the durable queue, the object
//! store, the metrics sink and the inference endpoint, plus the status views
//! returned to callers.

pub mod error_report;
pub mod inference;
pub mod metrics;
pub mod queue;
pub mod status;
pub mod store;
