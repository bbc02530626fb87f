//! Grid → wire payload conversion.
//!
//! Two encoders exist, one per transport:
//!
//! | Encoder              | Output                                       |
//! |----------------------|----------------------------------------------|
//! | [`SerpentineEncoder`]| 192-byte buffer in LED chain order, GRB      |
//! | [`HtmlEncoder`]      | HTML fragment of inline-styled `div`s         |
//!
//! ## Serpentine layout
//!
//! The panel is a single chain of 64 LEDs laid out boustrophedon style:
//!
//! ```text
//! row 0:  ──►──►──►──►──►──►──►──┐
//! row 1:  ┌──◄──◄──◄──◄──◄──◄──◄─┘
//! row 2:  └─►──►──►──►──►──►──►──┐
//! ...
//! ```
//!
//! Each LED expects its channels as (G, R, B).

use std::fmt::Write as _;

use crate::color::Rgb;
use crate::error::MatrixError;
use crate::grid::{HEIGHT, PixelGrid, WIDTH};

/// Bytes per LED.
pub const CHANNELS: usize = 3;
/// Bytes per physical row.
pub const ROW_BYTES: usize = WIDTH * CHANNELS;
/// Bytes per full frame.
pub const FRAME_LEN: usize = HEIGHT * ROW_BYTES;

/// A full frame in chain order.
pub type FrameBuffer = [u8; FRAME_LEN];

/// Turns a [`PixelGrid`] into a transport-specific payload.
pub trait FrameEncoder {
    type Frame;

    fn encode(&self, grid: &PixelGrid) -> Self::Frame;
}

// ── SerpentineEncoder ────────────────────────────────────────────

/// Encoder for the UART-attached panel.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerpentineEncoder;

impl SerpentineEncoder {
    /// Logical column feeding physical position `pos` of row `row`.
    const fn logical_col(row: usize, pos: usize) -> usize {
        if row % 2 == 0 { pos } else { WIDTH - 1 - pos }
    }

    /// Inverse of [`encode`](FrameEncoder::encode).
    pub fn decode(&self, buffer: &[u8]) -> Result<PixelGrid, MatrixError> {
        if buffer.len() != FRAME_LEN {
            return Err(MatrixError::MalformedFrame {
                expected: FRAME_LEN,
                actual: buffer.len(),
            });
        }

        let mut grid = PixelGrid::default();
        let rows = grid.rows_mut();
        for (i, chunk) in buffer.chunks_exact(ROW_BYTES).enumerate() {
            for (pos, grb) in chunk.chunks_exact(CHANNELS).enumerate() {
                rows[i][Self::logical_col(i, pos)] = Rgb::new(grb[1], grb[0], grb[2]);
            }
        }
        Ok(grid)
    }
}

impl FrameEncoder for SerpentineEncoder {
    type Frame = FrameBuffer;

    fn encode(&self, grid: &PixelGrid) -> FrameBuffer {
        let mut buf = [0u8; FRAME_LEN];
        for (i, row) in grid.rows().enumerate() {
            for pos in 0..WIDTH {
                let px = row[Self::logical_col(i, pos)];
                let base = i * ROW_BYTES + pos * CHANNELS;
                buf[base..base + CHANNELS].copy_from_slice(&[px.g, px.r, px.b]);
            }
        }
        buf
    }
}

// ── HtmlEncoder ──────────────────────────────────────────────────

/// Encoder for the browser preview: one `line` div per row, one `led`
/// div per cell.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlEncoder;

impl FrameEncoder for HtmlEncoder {
    type Frame = String;

    fn encode(&self, grid: &PixelGrid) -> String {
        // ~70 bytes per cell.
        let mut html = String::with_capacity(WIDTH * HEIGHT * 72 + 256);
        html.push_str(r#"<div id="ledArray2">"#);
        for row in grid.rows() {
            html.push_str(r#"<div class="line">"#);
            for px in row {
                // Writing into a String cannot fail.
                let _ = write!(
                    html,
                    r#"<div class="led" style="background-color:{px};"></div>"#
                );
            }
            html.push_str("</div>");
        }
        html.push_str("</div>");
        html
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient() -> PixelGrid {
        let mut grid = PixelGrid::default();
        for row in 0..HEIGHT {
            for col in 0..WIDTH {
                let v = (row * WIDTH + col) as u8;
                grid.set(row, col, Rgb::new(v, v.wrapping_add(100), 255 - v))
                    .unwrap();
            }
        }
        grid
    }

    #[test]
    fn channels_are_swapped_to_grb() {
        let grid = PixelGrid::new(Rgb::new(1, 2, 3));
        let buf = SerpentineEncoder.encode(&grid);
        assert_eq!(buf.len(), FRAME_LEN);
        for triple in buf[..ROW_BYTES].chunks_exact(CHANNELS) {
            assert_eq!(triple, &[2, 1, 3]);
        }
    }

    #[test]
    fn odd_rows_are_reversed() {
        let mut grid = PixelGrid::default();
        for col in 0..WIDTH {
            grid.set(1, col, Rgb::new(col as u8 + 1, 0, 0)).unwrap();
        }
        let buf = SerpentineEncoder.encode(&grid);
        let row1 = &buf[ROW_BYTES..2 * ROW_BYTES];

        // Physical column 0 carries logical column 7 (R = 8), red in slot 1.
        assert_eq!(&row1[0..3], &[0, 8, 0]);
        assert_eq!(&row1[21..24], &[0, 1, 0]);
    }

    #[test]
    fn even_rows_keep_order() {
        let mut grid = PixelGrid::default();
        grid.set(2, 0, Rgb::new(9, 0, 0)).unwrap();
        let buf = SerpentineEncoder.encode(&grid);
        assert_eq!(buf[2 * ROW_BYTES + 1], 9);
    }

    #[test]
    fn decode_inverts_encode() {
        let grid = gradient();
        let buf = SerpentineEncoder.encode(&grid);
        assert_eq!(SerpentineEncoder.decode(&buf).unwrap(), grid);
    }

    #[test]
    fn decode_rejects_short_buffer() {
        let err = SerpentineEncoder.decode(&[0u8; 10]).unwrap_err();
        assert!(matches!(
            err,
            MatrixError::MalformedFrame {
                expected: FRAME_LEN,
                actual: 10
            }
        ));
    }

    #[test]
    fn html_has_one_led_per_cell() {
        let html = HtmlEncoder.encode(&PixelGrid::new(Rgb::new(0, 0, 0)));
        assert_eq!(html.matches("rgb(0, 0, 0)").count(), WIDTH * HEIGHT);
        assert_eq!(html.matches(r#"class="line""#).count(), HEIGHT);
        assert!(html.starts_with(r#"<div id="ledArray2">"#));
        assert!(html.ends_with("</div></div>"));
        assert!(!html.contains('\n'));
    }

    #[test]
    fn html_preserves_row_major_order() {
        let mut grid = PixelGrid::default();
        grid.set(0, 1, Rgb::new(10, 20, 30)).unwrap();
        let html = HtmlEncoder.encode(&grid);
        let first = html.find("rgb(0, 0, 0)").unwrap();
        let marked = html.find("rgb(10, 20, 30)").unwrap();
        assert!(first < marked);
        // Second cell of the first line.
        assert_eq!(html[..marked].matches(r#"class="led""#).count(), 2);
    }
}
