//! # rgbmatrix-core
//!
//! Device abstraction for an 8×8 RGB LED matrix.
//!
//! This crate contains:
//! - **Grid**: `PixelGrid`, the fixed 8×8 model animations draw into
//! - **Color**: `Rgb` plus the named color table
//! - **Encoder**: `SerpentineEncoder` (UART chain order, GRB) and `HtmlEncoder`
//! - **Codec**: `UartFrameCodec` for the ASCII row frames via `tokio_util`
//! - **Transport**: `UartTransport` and `PreviewServerTransport` behind one trait
//! - **Display**: `Display`, pairing a grid with a transport
//! - **Error**: `MatrixError`, a typed `thiserror`-based error enum

pub mod codec;
pub mod color;
pub mod display;
pub mod encoder;
pub mod error;
pub mod grid;
pub mod transport;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use codec::{ROW_FRAME_LEN, RowFrame, UartFrameCodec};
pub use color::Rgb;
pub use display::Display;
pub use encoder::{FRAME_LEN, FrameBuffer, FrameEncoder, HtmlEncoder, SerpentineEncoder};
pub use error::MatrixError;
pub use grid::{HEIGHT, PixelGrid, WIDTH};
pub use transport::{
    PreviewConfig, PreviewServerTransport, Transport, TransportState, UartTransport,
};
