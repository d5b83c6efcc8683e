//! Shared error types across pmprom crates.

use thiserror::Error;

/// Stable error codes, used in log fields and asserted on by tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// A single input line could not be turned into a record.
    LineParse,
    /// Invalid configuration or command line.
    Config,
    /// Input stream or socket I/O failure.
    Io,
    /// The publishing collaborator failed (bind, push, shutdown).
    Publish,
    /// Anything else.
    Internal,
}

impl ErrorCode {
    /// String representation used in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::LineParse => "LINE_PARSE",
            ErrorCode::Config => "CONFIG",
            ErrorCode::Io => "IO",
            ErrorCode::Publish => "PUBLISH",
            ErrorCode::Internal => "INTERNAL",
        }
    }
}

/// Why one input line was rejected.
///
/// Recovered at line granularity by the stream runner; never fatal.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LineError {
    #[error("expected at least {expected} fields, found {found}")]
    TooFewFields { expected: usize, found: usize },
    #[error("field {index} ({field}) is not a number: {value:?}")]
    NumericParse {
        index: usize,
        field: &'static str,
        value: String,
    },
    #[error("field {index} ({field}) is out of range: {value}")]
    OutOfRange {
        index: usize,
        field: &'static str,
        value: f64,
    },
    #[error("line is not valid UTF-8")]
    NotUtf8,
}

impl LineError {
    /// Column index the failure refers to, if any.
    pub fn field_index(&self) -> Option<usize> {
        match self {
            LineError::TooFewFields { .. } | LineError::NotUtf8 => None,
            LineError::NumericParse { index, .. } | LineError::OutOfRange { index, .. } => {
                Some(*index)
            }
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, PmPromError>;

/// Unified error type used by core and exporter.
#[derive(Debug, Error)]
pub enum PmPromError {
    #[error("line parse: {0}")]
    Line(#[from] LineError),
    #[error("config: {0}")]
    Config(String),
    #[error("io: {0}")]
    Io(String),
    #[error("publish: {0}")]
    Publish(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl PmPromError {
    /// Map to a stable error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            PmPromError::Line(_) => ErrorCode::LineParse,
            PmPromError::Config(_) => ErrorCode::Config,
            PmPromError::Io(_) => ErrorCode::Io,
            PmPromError::Publish(_) => ErrorCode::Publish,
            PmPromError::Internal(_) => ErrorCode::Internal,
        }
    }
}

impl From<std::io::Error> for PmPromError {
    fn from(e: std::io::Error) -> Self {
        PmPromError::Io(e.to_string())
    }
}
