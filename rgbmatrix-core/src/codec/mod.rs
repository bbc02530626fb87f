//! ASCII row framing for the UART link to the FPGA board.
//!
//! ## Wire format
//!
//! One frame per physical row, eight frames per full update:
//!
//! ```text
//! '<'  row (2 hex digits, 1-based)  data (48 hex digits = 24 GRB bytes)  '>'
//! ```
//!
//! The encoder emits the row number in lowercase and the data in
//! uppercase, which is what the board firmware was written against. The
//! decoder accepts either case in both fields.

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::encoder::{FRAME_LEN, FrameBuffer, ROW_BYTES};
use crate::error::MatrixError;
use crate::grid::HEIGHT;

const START: u8 = b'<';
const END: u8 = b'>';

/// Encoded size of one row frame: start + 2 row digits + data + end.
pub const ROW_FRAME_LEN: usize = 1 + 2 + ROW_BYTES * 2 + 1;

const HEX_LOWER: &[u8; 16] = b"0123456789abcdef";
const HEX_UPPER: &[u8; 16] = b"0123456789ABCDEF";

// ── RowFrame ─────────────────────────────────────────────────────

/// One physical row as carried on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowFrame {
    /// 1-based row number.
    pub row: u8,
    /// GRB bytes in chain order.
    pub data: [u8; ROW_BYTES],
}

impl RowFrame {
    /// Split a full frame buffer into its eight row frames, top to bottom.
    pub fn split(buffer: &FrameBuffer) -> impl Iterator<Item = RowFrame> + '_ {
        buffer
            .chunks_exact(ROW_BYTES)
            .enumerate()
            .map(|(i, chunk)| {
                let mut data = [0u8; ROW_BYTES];
                data.copy_from_slice(chunk);
                RowFrame {
                    row: i as u8 + 1,
                    data,
                }
            })
    }

    /// Reassemble a full frame buffer from row frames. Rows may arrive in
    /// any order; every row must be present.
    pub fn assemble(frames: &[RowFrame]) -> Result<FrameBuffer, MatrixError> {
        let mut buf = [0u8; FRAME_LEN];
        let mut seen = [false; HEIGHT];
        for frame in frames {
            let idx = frame.index()?;
            buf[idx * ROW_BYTES..(idx + 1) * ROW_BYTES].copy_from_slice(&frame.data);
            seen[idx] = true;
        }
        if seen.iter().any(|s| !s) {
            return Err(MatrixError::MalformedFrame {
                expected: HEIGHT,
                actual: seen.iter().filter(|s| **s).count(),
            });
        }
        Ok(buf)
    }

    /// 0-based row index, validated against the panel height.
    pub fn index(&self) -> Result<usize, MatrixError> {
        match self.row as usize {
            r @ 1..=HEIGHT => Ok(r - 1),
            _ => Err(MatrixError::InvalidRowFrame("row number out of range")),
        }
    }
}

// ── UartFrameCodec ───────────────────────────────────────────────

/// `tokio_util` codec for [`RowFrame`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct UartFrameCodec;

impl Encoder<RowFrame> for UartFrameCodec {
    type Error = MatrixError;

    fn encode(&mut self, item: RowFrame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.reserve(ROW_FRAME_LEN);
        dst.put_u8(START);
        put_hex(dst, item.row, HEX_LOWER);
        for byte in item.data {
            put_hex(dst, byte, HEX_UPPER);
        }
        dst.put_u8(END);
        Ok(())
    }
}

impl Decoder for UartFrameCodec {
    type Item = RowFrame;
    type Error = MatrixError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        // Resynchronise on the next start marker.
        match src.iter().position(|&b| b == START) {
            Some(0) => {}
            Some(skip) => src.advance(skip),
            None => {
                src.clear();
                return Ok(None);
            }
        }

        if src.len() < ROW_FRAME_LEN {
            return Ok(None);
        }

        let raw = src.split_to(ROW_FRAME_LEN);
        if raw[ROW_FRAME_LEN - 1] != END {
            return Err(MatrixError::InvalidRowFrame("missing end marker"));
        }

        let row = parse_hex(raw[1], raw[2])?;
        let mut data = [0u8; ROW_BYTES];
        for (byte, pair) in data.iter_mut().zip(raw[3..ROW_FRAME_LEN - 1].chunks_exact(2)) {
            *byte = parse_hex(pair[0], pair[1])?;
        }

        let frame = RowFrame { row, data };
        frame.index()?;
        Ok(Some(frame))
    }
}

fn put_hex(dst: &mut BytesMut, byte: u8, table: &[u8; 16]) {
    dst.put_u8(table[(byte >> 4) as usize]);
    dst.put_u8(table[(byte & 0x0f) as usize]);
}

fn nibble(c: u8) -> Result<u8, MatrixError> {
    match c {
        b'0'..=b'9' => Ok(c - b'0'),
        b'a'..=b'f' => Ok(c - b'a' + 10),
        b'A'..=b'F' => Ok(c - b'A' + 10),
        _ => Err(MatrixError::InvalidRowFrame("non-hex digit")),
    }
}

fn parse_hex(hi: u8, lo: u8) -> Result<u8, MatrixError> {
    Ok((nibble(hi)? << 4) | nibble(lo)?)
}

// ── Tests ────────────────────────────────────────────────────────
