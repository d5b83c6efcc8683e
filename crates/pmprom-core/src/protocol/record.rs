//! Record parser (panic-free).
//!
//! Column layout of a frame line (0-based):
//!
//! | idx | column |
//! |-----|--------|
//! | 0..=7 | Application, ProcessID, SwapChainAddress, Runtime, SyncInterval, PresentFlags, AllowsTearing, PresentMode |
//! | 8 | Dropped |
//! | 9 | TimeInSeconds |
//! | 10 | MsBetweenPresents |
//! | 11 | MsBetweenDisplayChange |
//! | 12 | MsInPresentAPI |
//! | 13 | MsUntilRenderComplete |
//! | 14 | MsUntilDisplayed |
//!
//! Columns past 14 are ignored.

use crate::error::LineError;

/// Minimum number of fields a data line must carry.
pub const MIN_FIELDS: usize = 15;

/// Number of leading identity (non-numeric) columns.
pub const IDENTITY_COLUMNS: usize = 8;

const DELIMITER: char = ',';

const DROPPED: (usize, &str) = (8, "Dropped");
const TIME_IN_SECONDS: (usize, &str) = (9, "TimeInSeconds");
const MS_BETWEEN_PRESENTS: (usize, &str) = (10, "MsBetweenPresents");
const MS_BETWEEN_DISPLAY_CHANGE: (usize, &str) = (11, "MsBetweenDisplayChange");
const MS_IN_PRESENT_API: (usize, &str) = (12, "MsInPresentAPI");
const MS_UNTIL_RENDER_COMPLETE: (usize, &str) = (13, "MsUntilRenderComplete");
const MS_UNTIL_DISPLAYED: (usize, &str) = (14, "MsUntilDisplayed");

/// Per-frame timing durations, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timings {
    pub between_presents: f64,
    pub between_display_change: f64,
    pub in_present_api: f64,
    pub until_render_complete: f64,
    pub until_displayed: f64,
}

/// One parsed telemetry line.
///
/// Immutable once parsed; consumed once by the update router.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    identity: [String; IDENTITY_COLUMNS],
    /// Dropped-frame count (integer or real input, always >= 0).
    pub dropped: f64,
    /// Seconds since capture start.
    pub time_in_seconds: f64,
    pub timings: Timings,
}

impl Record {
    /// Raw value of identity column `idx` (0..8), verbatim.
    pub fn identity(&self, idx: usize) -> Option<&str> {
        self.identity.get(idx).map(String::as_str)
    }

    pub fn application(&self) -> &str {
        &self.identity[0]
    }

    pub fn process_id(&self) -> &str {
        &self.identity[1]
    }
}

/// Turn one raw input segment (without its `\n`) into text.
///
/// A trailing `\r` is dropped so CRLF captures parse like LF ones.
pub fn decode_line(raw: &[u8]) -> Result<&str, LineError> {
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    std::str::from_utf8(raw).map_err(|_| LineError::NotUtf8)
}

/// Parse one data line into a `Record`.
///
/// Every numeric field is validated before anything is returned, so a
/// caller never sees a partially valid record.
pub fn parse_line(line: &str) -> Result<Record, LineError> {
    let fields: Vec<&str> = line.split(DELIMITER).collect();
    if fields.len() < MIN_FIELDS {
        return Err(LineError::TooFewFields {
            expected: MIN_FIELDS,
            found: fields.len(),
        });
    }

    let dropped = number(&fields, DROPPED)?;
    if dropped < 0.0 {
        return Err(LineError::OutOfRange {
            index: DROPPED.0,
            field: DROPPED.1,
            value: dropped,
        });
    }

    let time_in_seconds = number(&fields, TIME_IN_SECONDS)?;
    let timings = Timings {
        between_presents: number(&fields, MS_BETWEEN_PRESENTS)?,
        between_display_change: number(&fields, MS_BETWEEN_DISPLAY_CHANGE)?,
        in_present_api: number(&fields, MS_IN_PRESENT_API)?,
        until_render_complete: number(&fields, MS_UNTIL_RENDER_COMPLETE)?,
        until_displayed: number(&fields, MS_UNTIL_DISPLAYED)?,
    };

    let identity: [String; IDENTITY_COLUMNS] =
        std::array::from_fn(|i| fields.get(i).copied().unwrap_or_default().to_string());

    Ok(Record {
        identity,
        dropped,
        time_in_seconds,
        timings,
    })
}

fn number(fields: &[&str], (index, field): (usize, &'static str)) -> Result<f64, LineError> {
    let raw = fields.get(index).copied().ok_or(LineError::TooFewFields {
        expected: MIN_FIELDS,
        found: fields.len(),
    })?;

    let value: f64 = raw.trim().parse().map_err(|_| LineError::NumericParse {
        index,
        field,
        value: raw.to_string(),
    })?;

    // "NaN" and "inf" parse fine but would poison counters and sums.
    if !value.is_finite() {
        return Err(LineError::OutOfRange { index, field, value });
    }
    Ok(value)
}
