//! Mock Infrastructure for Testing the Alerting Subsystem
//!
//! Wrappers around the in-memory drivers that record every write and can be told
//! to fail, so tests can assert on exact side effects and on retry behavior.
//!
//! ## Usage
//!
//! ```ignore
//! use tests::mock_infrastructure::{RecordingStorage, RecordingStream};
//!
//! let storage = RecordingStorage::new();
//! storage.fail_next_sets(2);
//! // the next two `set` calls return an error, the third succeeds
//! ```

pub mod recording_ports;
pub mod test_helpers;

pub use recording_ports::{RecordingStorage, RecordingStream};
pub use test_helpers::*;
