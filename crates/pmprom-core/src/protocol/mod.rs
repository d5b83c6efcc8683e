//! Input-side protocol: one comma-separated telemetry line per presented frame.
//!
//! - `record`: positional field parsing into a typed `Record`.
//! - `label`: the label schema and the per-record label key.
//!
//! Parsing is panic-free: short lines and non-numeric fields are reported as
//! `LineError` instead of panicking on out-of-range indexing.

pub mod label;
pub mod record;
