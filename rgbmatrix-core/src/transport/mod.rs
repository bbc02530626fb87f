//! Interchangeable output backends for a [`PixelGrid`].
//!
//! | Backend                    | Target                                   |
//! |----------------------------|------------------------------------------|
//! | [`UartTransport`]          | FPGA board on a serial port, ASCII frames |
//! | [`PreviewServerTransport`] | Browser page fed by server-sent events    |
//!
//! Both follow the same lifecycle, enforced by [`TransportState`]:
//!
//! ```text
//!  Closed ──open()──► Open ──close()──► Closed
//! ```
//!
//! There is no reconnect transition; a failed `open` leaves the backend
//! `Closed`.

pub mod preview;
pub mod uart;

use async_trait::async_trait;

use crate::error::MatrixError;
use crate::grid::PixelGrid;

pub use preview::{PreviewConfig, PreviewServerTransport};
pub use uart::UartTransport;

// ── Transport ────────────────────────────────────────────────────

/// Capability set shared by all backends.
#[async_trait]
pub trait Transport: Send {
    /// Short human-readable backend name for logs.
    fn name(&self) -> &'static str;

    /// Acquire the underlying device or socket.
    async fn open(&mut self) -> Result<(), MatrixError>;

    /// Encode `grid` for this backend and send it.
    async fn render(&mut self, grid: &PixelGrid) -> Result<(), MatrixError>;

    /// Release the underlying device or socket.
    async fn close(&mut self) -> Result<(), MatrixError>;

    fn is_open(&self) -> bool;
}

// ── TransportState ───────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportState {
    #[default]
    Closed,
    Open,
}

impl std::fmt::Display for TransportState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Closed => write!(f, "Closed"),
            Self::Open => write!(f, "Open"),
        }
    }
}

impl TransportState {
    pub fn is_open(self) -> bool {
        self == Self::Open
    }

    /// Valid from: `Closed`.
    pub fn open(&mut self) -> Result<(), MatrixError> {
        match self {
            Self::Closed => {
                *self = Self::Open;
                Ok(())
            }
            Self::Open => Err(MatrixError::InvalidState("already open")),
        }
    }

    /// Valid from: `Open`.
    pub fn close(&mut self) -> Result<(), MatrixError> {
        match self {
            Self::Open => {
                *self = Self::Closed;
                Ok(())
            }
            Self::Closed => Err(MatrixError::InvalidState("not open")),
        }
    }

    /// Fails unless `Closed`.
    pub fn require_closed(self) -> Result<(), MatrixError> {
        match self {
            Self::Closed => Ok(()),
            Self::Open => Err(MatrixError::InvalidState("already open")),
        }
    }

    /// Fails unless `Open`.
    pub fn require_open(self) -> Result<(), MatrixError> {
        if self.is_open() {
            Ok(())
        } else {
            Err(MatrixError::InvalidState("not open"))
        }
    }
}
