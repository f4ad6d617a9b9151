//! Relay Core
//!
//! Core types and abstractions for the Relay job distribution system.
//!
//! This crate contains:
//! - Domain types: Core business entities (Job, JobResult, ExecutionResult, etc.)
//! - DTOs: Data transfer objects exchanged with the queue and object store
//! - Classifier: Pure error classification and priority scoring

pub mod classifier;
pub mod domain;
pub mod dto;
