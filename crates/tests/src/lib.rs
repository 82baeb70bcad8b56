//! Integration tests for the alerting workspace
//!
//! This crate contains:
//!
//! - `processor_tests`: reconciliation outcomes, write counts and failure handling through the
//!   public processor API
//! - `runtime_tests`: intake decoding, per-id routing, fatal errors and graceful shutdown
//! - `mock_infrastructure`: storage and stream wrappers that record traffic and inject faults
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test --package tests
//! ```
//!
//! No external services are needed; every test runs against the in-memory drivers.

#[cfg(test)]
mod processor_tests;


/// Mock infrastructure for testing
pub mod mock_infrastructure;
