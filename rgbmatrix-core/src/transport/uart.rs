//! Serial backend for the FPGA-driven panel.
//!
//! The port runs at a fixed 921600 baud, 8N1. The transport never reads,
//! and `serialport` applies its timeout to writes as well, so the port is
//! opened with [`WRITE_TIMEOUT`] and a write blocks until the line drains.
//! Every render is serialized by [`SerpentineEncoder`] and sent as eight
//! ASCII row frames (see [`crate::codec`]).

use std::io::Write;
use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;
use tokio_util::codec::Encoder as _;
use tracing::{debug, info, warn};

use crate::codec::{ROW_FRAME_LEN, RowFrame, UartFrameCodec};
use crate::encoder::{FRAME_LEN, FrameBuffer, FrameEncoder, SerpentineEncoder};
use crate::error::MatrixError;
use crate::grid::{HEIGHT, PixelGrid};
use crate::transport::{Transport, TransportState};

/// Line speed expected by the board.
pub const BAUD_RATE: u32 = 921_600;

/// Upper bound on a single blocking write. A full update (416 bytes) takes
/// under 5 ms on the wire.
pub const WRITE_TIMEOUT: Duration = Duration::from_secs(1);

type PortHandle = Box<dyn Write + Send>;

/// UART transport. Owns the serial handle while `Open`.
pub struct UartTransport {
    port_name: String,
    handle: Option<PortHandle>,
    state: TransportState,
    encoder: SerpentineEncoder,
    codec: UartFrameCodec,
    scratch: BytesMut,
}

impl UartTransport {
    /// A closed transport for the named port (`COM6`, `/dev/ttyUSB0`, …).
    pub fn new(port_name: impl Into<String>) -> Self {
        Self {
            port_name: port_name.into(),
            handle: None,
            state: TransportState::Closed,
            encoder: SerpentineEncoder,
            codec: UartFrameCodec,
            scratch: BytesMut::with_capacity(ROW_FRAME_LEN * HEIGHT),
        }
    }

    /// An already-open transport writing into `writer`, e.g. a loopback
    /// or a port configured by the caller.
    pub fn attached(port_name: impl Into<String>, writer: impl Write + Send + 'static) -> Self {
        let mut transport = Self::new(port_name);
        transport.handle = Some(Box::new(writer));
        transport.state = TransportState::Open;
        transport
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    /// Open the serial port.
    pub fn open_port(&mut self) -> Result<(), MatrixError> {
        self.state.require_closed()?;

        let port = serialport::new(&self.port_name, BAUD_RATE)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .timeout(WRITE_TIMEOUT)
            .open()
            .map_err(|e| MatrixError::TransportUnavailable {
                target: self.port_name.clone(),
                reason: e.to_string(),
            })?;

        self.handle = Some(Box::new(port));
        self.state.open()?;
        info!(port = %self.port_name, baud = BAUD_RATE, "UART opened");
        Ok(())
    }

    /// Send a full frame buffer as eight row frames.
    ///
    /// A buffer that is not exactly [`FRAME_LEN`] bytes long is dropped
    /// without writing anything.
    pub fn write(&mut self, buffer: &[u8]) -> Result<(), MatrixError> {
        let Ok(frame) = <&FrameBuffer>::try_from(buffer) else {
            warn!(
                len = buffer.len(),
                expected = FRAME_LEN,
                "ignoring frame buffer with wrong length"
            );
            return Ok(());
        };

        self.state.require_open()?;
        let handle = self
            .handle
            .as_mut()
            .ok_or(MatrixError::InvalidState("no serial handle"))?;

        for row in RowFrame::split(frame) {
            self.scratch.clear();
            self.codec.encode(row, &mut self.scratch)?;
            handle.write_all(&self.scratch)?;
        }
        handle.flush()?;
        debug!(port = %self.port_name, "frame written");
        Ok(())
    }

    /// Flush and release the serial handle.
    pub fn close_port(&mut self) -> Result<(), MatrixError> {
        self.state.close()?;
        if let Some(mut handle) = self.handle.take() {
            handle.flush()?;
        }
        info!(port = %self.port_name, "UART closed");
        Ok(())
    }
}

impl std::fmt::Debug for UartTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UartTransport")
            .field("port_name", &self.port_name)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Transport for UartTransport {
    fn name(&self) -> &'static str {
        "uart"
    }

    async fn open(&mut self) -> Result<(), MatrixError> {
        self.open_port()
    }

    async fn render(&mut self, grid: &PixelGrid) -> Result<(), MatrixError> {
        let buffer = self.encoder.encode(grid);
        self.write(&buffer)
    }

    async fn close(&mut self) -> Result<(), MatrixError> {
        self.close_port()
    }

    fn is_open(&self) -> bool {
        self.state.is_open()
    }
}

// ── Tests ────────────────────────────────────────────────────────
