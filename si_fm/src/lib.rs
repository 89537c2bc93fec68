//! The Fault Manager (FM): a staged, interruptible error-event processor
//! with severity-based queueing (via `si_itcom::event_queue`), resumable
//! per-tick processing, crash-safe persistence, and a rotating fault-event
//! log file (spec §4.2).
//!
//! # Module structure
//!
//! - [`processor`] — the stage machine (`FmProcessor`) and `FaultNotifier`.
//! - [`persistence`] — the `event_data.bin` crash-safe record.
//! - [`log_sink`] — the rotating fault-event log file.
//! - [`error`] — FM-local error type.

pub mod error;
pub mod log_sink;
pub mod persistence;
pub mod processor;
