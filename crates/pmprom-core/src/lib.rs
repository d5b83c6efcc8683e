//! pmprom core: frame telemetry record parsing, label keys, and error types.
//!
//! This crate defines the input-side contracts shared by the exporter engine
//! and its tests. It carries no runtime or network dependencies.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! A malformed telemetry line must surface as `LineError`, never as a crash.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod protocol;

pub use error::{ErrorCode, LineError, PmPromError, Result};
pub use protocol::label::{LabelField, LabelKey, LabelSchema};
pub use protocol::record::{decode_line, parse_line, Record, Timings};
