//! Demo animations.
//!
//! Each animation is split into a pure step function over [`PixelGrid`]
//! and an async runner that renders every step through a [`Display`]
//! with a fixed frame delay.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use rgbmatrix_core::color::BLACK;
use rgbmatrix_core::grid::{HEIGHT, WIDTH};
use rgbmatrix_core::{Display, MatrixError, PixelGrid, Rgb};

/// Steps the diagonal wipe takes; enough for the band to leave the panel.
pub const DIAGONAL_STEPS: usize = 2 * WIDTH;

/// Where the snake starts, as `(row, col)`.
pub const SNAKE_START: (usize, usize) = (3, 3);

/// Pause on the blank panel before the zigzag starts painting.
pub const ZIGZAG_INTRO: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Animation {
    /// A lit band sweeping from the top-left corner.
    Diagonal,
    /// A worm spiralling out from the middle until it is boxed in.
    #[default]
    Snake,
    /// Fill the panel one cell at a time in serpentine order.
    #[value(name = "zigzag")]
    ZigZag,
}

impl fmt::Display for Animation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Diagonal => write!(f, "diagonal"),
            Self::Snake => write!(f, "snake"),
            Self::ZigZag => write!(f, "zigzag"),
        }
    }
}

impl Animation {
    /// Paint color used when none is configured.
    pub fn default_color(self) -> Rgb {
        match self {
            Self::Diagonal => Rgb::new(200, 0, 0),
            Self::Snake | Self::ZigZag => Rgb::new(50, 250, 50),
        }
    }

    /// Frame delay used when none is configured.
    pub fn default_delay(self) -> Duration {
        match self {
            Self::Diagonal => Duration::from_millis(300),
            Self::Snake | Self::ZigZag => Duration::from_millis(100),
        }
    }

    /// Play the animation to completion on an open display.
    pub async fn run(
        self,
        display: &mut Display,
        color: Rgb,
        delay: Duration,
    ) -> Result<(), MatrixError> {
        info!(animation = %self, %color, ?delay, "starting");
        match self {
            Self::Diagonal => diagonal(display, color, delay).await?,
            Self::Snake => snake(display, color, delay).await?,
            Self::ZigZag => zigzag(display, color, delay).await?,
        }
        let frames = display.frames();
        info!(animation = %self, frames, "finished");
        Ok(())
    }
}

// ── Diagonal ─────────────────────────────────────────────────────

/// Move every row down by one, shift the top row right and blank the
/// top-left cell.
pub fn diagonal_step(grid: &mut PixelGrid) {
    grid.shift_down();
    let top = &mut grid.rows_mut()[0];
    top.copy_within(0..WIDTH - 1, 1);
    top[0] = BLACK;
}

pub async fn diagonal(
    display: &mut Display,
    color: Rgb,
    delay: Duration,
) -> Result<(), MatrixError> {
    display.grid_mut().set(0, 0, color)?;
    display.render().await?;

    for _ in 0..DIAGONAL_STEPS {
        tokio::time::sleep(delay).await;
        diagonal_step(display.grid_mut());
        display.render().await?;
    }
    Ok(())
}

// ── Snake ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Heading {
    Up,
    Right,
    Down,
    Left,
}

impl Heading {
    /// `(row, col)` offset of one step.
    fn delta(self) -> (isize, isize) {
        match self {
            Self::Up => (-1, 0),
            Self::Right => (0, 1),
            Self::Down => (1, 0),
            Self::Left => (0, -1),
        }
    }

    fn clockwise(self) -> Self {
        match self {
            Self::Up => Self::Right,
            Self::Right => Self::Down,
            Self::Down => Self::Left,
            Self::Left => Self::Up,
        }
    }
}

/// Walk state of the snake. The head never enters a cell twice.
#[derive(Debug, Clone)]
pub struct Snake {
    row: usize,
    col: usize,
    heading: Heading,
    visited: [[bool; WIDTH]; HEIGHT],
}

impl Default for Snake {
    fn default() -> Self {
        Self::new()
    }
}

impl Snake {
    pub fn new() -> Self {
        let (row, col) = SNAKE_START;
        let mut visited = [[false; WIDTH]; HEIGHT];
        visited[row][col] = true;
        Self {
            row,
            col,
            heading: Heading::Right,
            visited,
        }
    }

    /// Current head as `(row, col)`.
    pub fn position(&self) -> (usize, usize) {
        (self.row, self.col)
    }

    pub fn heading(&self) -> Heading {
        self.heading
    }

    /// Move one cell. When the way ahead is blocked, turn clockwise once
    /// and try again. Returns `false` once the snake is boxed in.
    pub fn advance(&mut self) -> bool {
        for _ in 0..2 {
            if let Some((row, col)) = self.ahead() {
                self.row = row;
                self.col = col;
                self.visited[row][col] = true;
                return true;
            }
            self.heading = self.heading.clockwise();
        }
        false
    }

    /// The cell in front of the head, if it is on the panel and unused.
    fn ahead(&self) -> Option<(usize, usize)> {
        let (dr, dc) = self.heading.delta();
        let row = self.row.checked_add_signed(dr)?;
        let col = self.col.checked_add_signed(dc)?;
        (row < HEIGHT && col < WIDTH && !self.visited[row][col]).then_some((row, col))
    }
}

pub async fn snake(display: &mut Display, color: Rgb, delay: Duration) -> Result<(), MatrixError> {
    display.render().await?;

    let mut snake = Snake::new();
    loop {
        let (row, col) = snake.position();
        display.grid_mut().set(row, col, color)?;
        display.render().await?;

        if !snake.advance() {
            debug!(row, col, "snake boxed in");
            break;
        }
        tokio::time::sleep(delay).await;
    }
    Ok(())
}

// ── ZigZag ───────────────────────────────────────────────────────

/// Cells in painting order: row 0 right to left, row 1 left to right,
/// and so on.
pub fn zigzag_order() -> impl Iterator<Item = (usize, usize)> {
    (0..HEIGHT).flat_map(|row| {
        (0..WIDTH).map(move |i| {
            let col = if row % 2 == 0 { WIDTH - 1 - i } else { i };
            (row, col)
        })
    })
}

pub async fn zigzag(display: &mut Display, color: Rgb, delay: Duration) -> Result<(), MatrixError> {
    display.render().await?;
    tokio::time::sleep(ZIGZAG_INTRO).await;

    for (row, col) in zigzag_order() {
        display.grid_mut().set(row, col, color)?;
        display.render().await?;
        tokio::time::sleep(delay).await;
    }
    Ok(())
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use async_trait::async_trait;
    use rgbmatrix_core::color::RED;
    use rgbmatrix_core::{Transport, TransportState};

    use super::*;

    /// Accepts every frame and drops it.
    #[derive(Default)]
    struct Sink {
        state: TransportState,
    }

    #[async_trait]
    impl Transport for Sink {
        fn name(&self) -> &'static str {
            "sink"
        }

        async fn open(&mut self) -> Result<(), MatrixError> {
            self.state.open()
        }

        async fn render(&mut self, _grid: &PixelGrid) -> Result<(), MatrixError> {
            self.state.require_open()
        }

        async fn close(&mut self) -> Result<(), MatrixError> {
            self.state.close()
        }

        fn is_open(&self) -> bool {
            self.state.is_open()
        }
    }

    fn lit(grid: &PixelGrid) -> HashSet<(usize, usize)> {
        let mut cells = HashSet::new();
        for (row, line) in grid.rows().enumerate() {
            for (col, &c) in line.iter().enumerate() {
                if c != BLACK {
                    cells.insert((row, col));
                }
            }
        }
        cells
    }

    #[test]
    fn diagonal_forms_an_anti_diagonal_band() {
        let mut grid = PixelGrid::default();
        grid.set(0, 0, RED).unwrap();
        for _ in 0..3 {
            diagonal_step(&mut grid);
        }
        let expected: HashSet<_> = [(0, 3), (1, 2), (2, 1), (3, 0)].into();
        assert_eq!(lit(&grid), expected);

        for _ in 3..DIAGONAL_STEPS {
            diagonal_step(&mut grid);
        }
        assert!(lit(&grid).is_empty());
    }

    #[test]
    fn snake_turns_clockwise_at_the_edge() {
        let mut snake = Snake::new();
        let mut path = vec![snake.position()];
        for _ in 0..7 {
            assert!(snake.advance());
            path.push(snake.position());
        }
        assert_eq!(
            path,
            [(3, 3), (3, 4), (3, 5), (3, 6), (3, 7), (4, 7), (5, 7), (6, 7)]
        );
        assert_eq!(snake.heading(), Heading::Down);
    }

    #[test]
    fn snake_never_revisits_and_stops() {
        let mut snake = Snake::new();
        let mut path = vec![snake.position()];
        while snake.advance() {
            path.push(snake.position());
        }
        let distinct: HashSet<_> = path.iter().copied().collect();
        assert_eq!(distinct.len(), path.len());
        assert_eq!(path.len(), 44);
        assert_eq!(&path[path.len() - 3..], &[(1, 4), (1, 5), (1, 6)]);
        assert!(!snake.advance());
    }

    #[test]
    fn zigzag_covers_panel_in_serpentine_order() {
        let order: Vec<_> = zigzag_order().collect();
        assert_eq!(order.len(), WIDTH * HEIGHT);
        assert_eq!(order[0], (0, 7));
        assert_eq!(order[7], (0, 0));
        assert_eq!(order[8], (1, 0));
        assert_eq!(order[15], (1, 7));
        assert_eq!(order[16], (2, 7));
        let distinct: HashSet<_> = order.iter().copied().collect();
        assert_eq!(distinct.len(), WIDTH * HEIGHT);
    }

    #[tokio::test(start_paused = true)]
    async fn runners_render_every_step() {
        let mut display = Display::new(Sink::default());
        display.open().await.unwrap();
        Animation::Snake
            .run(&mut display, RED, Duration::ZERO)
            .await
            .unwrap();
        assert_eq!(display.frames(), 1 + 44);
        assert_eq!(lit(display.grid()).len(), 44);

        let mut display = Display::new(Sink::default());
        display.open().await.unwrap();
        Animation::ZigZag
            .run(&mut display, RED, Duration::ZERO)
            .await
            .unwrap();
        assert_eq!(display.frames(), 1 + 64);
        assert_eq!(lit(display.grid()).len(), 64);

        let mut display = Display::new(Sink::default());
        display.open().await.unwrap();
        Animation::Diagonal
            .run(&mut display, RED, Duration::ZERO)
            .await
            .unwrap();
        assert_eq!(display.frames(), 1 + DIAGONAL_STEPS as u64);
        assert!(lit(display.grid()).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn each_animation_keeps_its_own_pace() {
        let mut display = Display::new(Sink::default());
        display.open().await.unwrap();
        let start = tokio::time::Instant::now();
        Animation::Diagonal
            .run(
                &mut display,
                Animation::Diagonal.default_color(),
                Animation::Diagonal.default_delay(),
            )
            .await
            .unwrap();
        assert_paced(start.elapsed(), Duration::from_millis(300) * DIAGONAL_STEPS as u32);

        let mut display = Display::new(Sink::default());
        display.open().await.unwrap();
        let start = tokio::time::Instant::now();
        Animation::ZigZag
            .run(&mut display, RED, Animation::ZigZag.default_delay())
            .await
            .unwrap();
        assert_paced(
            start.elapsed(),
            ZIGZAG_INTRO + Duration::from_millis(100) * (WIDTH * HEIGHT) as u32,
        );
    }

    /// The paused clock can round each sleep up by a millisecond.
    fn assert_paced(elapsed: Duration, expected: Duration) {
        assert!(
            elapsed >= expected && elapsed < expected + Duration::from_millis(100),
            "elapsed {elapsed:?}, expected about {expected:?}"
        );
    }

    #[test]
    fn default_colors_differ_per_animation() {
        assert_eq!(Animation::Diagonal.default_color(), Rgb::new(200, 0, 0));
        assert_eq!(Animation::Snake.default_color(), Rgb::new(50, 250, 50));
        assert_eq!(Animation::ZigZag.default_delay(), Duration::from_millis(100));
    }

    #[test]
    fn names_match_config_spelling() {
        #[derive(Deserialize)]
        struct Entry {
            name: Animation,
        }
        let entry: Entry = toml::from_str(r#"name = "zigzag""#).unwrap();
        assert_eq!(entry.name, Animation::ZigZag);
        assert_eq!(Animation::ZigZag.to_string(), "zigzag");
        assert_eq!(Animation::default(), Animation::Snake);
    }
}
