//! The in-memory 8×8 pixel model animations draw into.
//!
//! Cells are addressed row-major, `(row, col)`, with `(0, 0)` in the
//! top-left corner as seen by the viewer. The physical wiring order is
//! the encoder's concern, not the grid's.

use crate::color::Rgb;
use crate::error::MatrixError;

/// Number of LED columns.
pub const WIDTH: usize = 8;
/// Number of LED rows.
pub const HEIGHT: usize = 8;

/// Row-major cell storage.
pub type Rows = [[Rgb; WIDTH]; HEIGHT];

/// Fixed-size 8×8 grid of RGB cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelGrid {
    cells: Rows,
}

impl PixelGrid {
    /// A grid with every cell set to `color`.
    pub fn new(color: Rgb) -> Self {
        Self {
            cells: [[color; WIDTH]; HEIGHT],
        }
    }

    pub const fn width(&self) -> usize {
        WIDTH
    }

    pub const fn height(&self) -> usize {
        HEIGHT
    }

    /// Reset every cell to `color`.
    pub fn fill(&mut self, color: Rgb) {
        self.cells = [[color; WIDTH]; HEIGHT];
    }

    /// Color at `(row, col)`.
    pub fn get(&self, row: usize, col: usize) -> Result<Rgb, MatrixError> {
        Self::check(row, col)?;
        Ok(self.cells[row][col])
    }

    /// Set the color at `(row, col)`. Out-of-range indices are rejected,
    /// never clamped.
    pub fn set(&mut self, row: usize, col: usize, color: Rgb) -> Result<(), MatrixError> {
        Self::check(row, col)?;
        self.cells[row][col] = color;
        Ok(())
    }

    /// One full row, left to right.
    pub fn row(&self, row: usize) -> Result<&[Rgb; WIDTH], MatrixError> {
        self.cells
            .get(row)
            .ok_or(MatrixError::OutOfRange { row, col: 0 })
    }

    pub fn row_mut(&mut self, row: usize) -> Result<&mut [Rgb; WIDTH], MatrixError> {
        self.cells
            .get_mut(row)
            .ok_or(MatrixError::OutOfRange { row, col: 0 })
    }

    pub fn set_row(&mut self, row: usize, colors: [Rgb; WIDTH]) -> Result<(), MatrixError> {
        let slot = self
            .cells
            .get_mut(row)
            .ok_or(MatrixError::OutOfRange { row, col: 0 })?;
        *slot = colors;
        Ok(())
    }

    /// Rows top to bottom.
    pub fn rows(&self) -> impl ExactSizeIterator<Item = &[Rgb; WIDTH]> {
        self.cells.iter()
    }

    /// Direct access to the backing array, for bulk edits such as
    /// scrolling with `copy_within`.
    pub fn rows_mut(&mut self) -> &mut Rows {
        &mut self.cells
    }

    /// Copy every row one step down. Row 0 keeps its contents and the
    /// bottom row falls off.
    pub fn shift_down(&mut self) {
        self.cells.copy_within(0..HEIGHT - 1, 1);
    }

    fn check(row: usize, col: usize) -> Result<(), MatrixError> {
        if row >= HEIGHT || col >= WIDTH {
            return Err(MatrixError::OutOfRange { row, col });
        }
        Ok(())
    }
}

impl Default for PixelGrid {
    fn default() -> Self {
        Self::new(Rgb::default())
    }
}

// ── Tests ────────────────────────────────────────────────────────
