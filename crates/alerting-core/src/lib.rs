//! # Alerting Core
//!
//! Alert lifecycle reconciliation engine.
//!
//! This crate provides:
//!
//! - **[`alerts`]**: the v1 [`Alert`](alerts::Alert) the engine reconciles and the extended
//!   v2 schema with severity, labels and actions.
//!
//! - **[`events`]**: write-once lifecycle events describing what happened to an alert.
//!
//! - **[`ports`]**: the storage and stream traits plus in-memory and Redis drivers.
//!
//! - **[`processor`]**: the reconciliation processor, the only component with decision logic.
//!
//! - **[`runtime`]**: intake, id-routed worker queues and graceful shutdown.
//!
//! - **[`config`]**: layered configuration; **[`metrics`]**: Prometheus counters.
//!
//! ## Data Flow
//!
//! ```text
//! intake topic
//!       │ bytes
//!       ▼
//! ┌─────────────┐
//! │   Intake    │ ─── undecodable ──► log/error event
//! └──────┬──────┘
//!        │ Alert
//!        ▼
//! ┌─────────────┐
//! │ Dispatcher  │  hash(id) % workers
//! └──────┬──────┘
//!        │
//!   ┌────┴────┐
//!   ▼         ▼
//! Worker 0 … Worker N-1        (one Processor each)
//!   │
//!   ├── Storage.get(id) ──► compare with snapshot
//!   │
//!   ├── Storage.set(id) ──► store topic (mirror)
//!   │
//!   └── lifecycle event ──► event topic
//! ```
//!
//! ## Feature Flags
//!
//! - `redis` (default): Redis storage and stream drivers

pub mod alerts;
pub mod config;
pub mod events;
pub mod metrics;
pub mod ports;
pub mod processor;
pub mod runtime;
