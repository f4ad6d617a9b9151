//! Core domain types
//!
//! This module contains the core domain structures used across Relay crates.
//! These types are shared between the coordinator (submits and persists),
//! the consumer loop (executes) and the strategy engine (aggregates).

pub mod error_fix;
pub mod execution;
pub mod job;
pub mod result;
