//! Domain-specific error types for the LED matrix stack.
//!
//! All fallible operations return `Result<T, MatrixError>`. Whether an
//! error is fatal is decided by the caller: the demo binary treats
//! [`MatrixError::TransportUnavailable`] and [`MatrixError::Io`] as
//! unrecoverable and exits.

use thiserror::Error;

/// The canonical error type for the LED matrix stack.
#[derive(Debug, Error)]
pub enum MatrixError {
    // ── Grid Errors ──────────────────────────────────────────────
    /// A grid coordinate lies outside the fixed 8×8 area.
    #[error("pixel index out of range: row {row}, col {col}")]
    OutOfRange { row: usize, col: usize },

    /// A color string could not be parsed into an RGB triple.
    #[error("invalid color: {0}")]
    InvalidColor(String),

    // ── Frame Errors ─────────────────────────────────────────────
    /// A frame buffer does not have the expected length.
    #[error("malformed frame: expected {expected} bytes, got {actual}")]
    MalformedFrame { expected: usize, actual: usize },

    /// A UART row frame violated the wire format.
    #[error("invalid row frame: {0}")]
    InvalidRowFrame(&'static str),

    // ── Transport Errors ─────────────────────────────────────────
    /// The serial port or listening socket could not be acquired.
    #[error("transport unavailable: {target}: {reason}")]
    TransportUnavailable { target: String, reason: String },

    /// The transport is not in a state that permits the operation.
    #[error("transport state: {0}")]
    InvalidState(&'static str),

    /// The serial or TCP layer reported an error.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Catch-all for errors that do not fit another variant.
    #[error("{0}")]
    Other(String),
}

impl MatrixError {
    /// Whether the error leaves the device in a state nobody can
    /// recover from without operator intervention.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            MatrixError::TransportUnavailable { .. } | MatrixError::Io(_)
        )
    }
}

// ── Convenient From implementations ──────────────────────────────

impl From<String> for MatrixError {
    fn from(s: String) -> Self {
        MatrixError::Other(s)
    }
}

impl From<&str> for MatrixError {
    fn from(s: &str) -> Self {
        MatrixError::Other(s.to_string())
    }
}

impl From<serialport::Error> for MatrixError {
    fn from(e: serialport::Error) -> Self {
        MatrixError::Io(e.into())
    }
}
