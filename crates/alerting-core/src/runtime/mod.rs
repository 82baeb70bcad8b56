//! Alerting runtime initialization and lifecycle management.
//!
//! The runtime turns the single-consumer [`Processor`](crate::processor::Processor)
//! into a service: an intake task subscribes to the intake topic, decodes payloads
//! and hands each alert to a [`Dispatcher`], which routes it by id to one of N
//! bounded worker queues. Each worker runs its own processor, so every alert id is
//! handled by exactly one task in arrival order.
//!
//! # Example
//!
//! ```no_run
//! use alerting_core::{config::AppConfig, runtime::AlertingRuntime};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::load()?;
//!
//!     let mut runtime = AlertingRuntime::builder().with_config(config).build()?;
//!     runtime.start().await?;
//!
//!     let report = runtime.wait_for_shutdown().await;
//!     println!("processed {} alerts", report.summary.processed);
//!     Ok(())
//! }
//! ```

pub mod builder;
pub mod components;
pub mod dispatcher;
pub mod intake;
pub mod lifecycle;

pub use builder::{AlertingRuntimeBuilder, RuntimeError};
pub use components::{connect_storage, connect_stream, AlertingComponents};
pub use dispatcher::{DispatchError, Dispatcher};
pub use intake::IntakeStats;
pub use lifecycle::{AlertingRuntime, ShutdownReport};
