//! Composition root: one grid, one transport.

use tracing::{debug, info};

use crate::color::Rgb;
use crate::error::MatrixError;
use crate::grid::PixelGrid;
use crate::transport::{PreviewConfig, PreviewServerTransport, Transport, UartTransport};

/// A pixel grid bound to an output backend.
///
/// Animations draw into [`grid_mut`](Self::grid_mut) and call
/// [`render`](Self::render) whenever a frame is complete.
pub struct Display {
    grid: PixelGrid,
    transport: Box<dyn Transport>,
    frames: u64,
}

impl Display {
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self::with_default_color(transport, Rgb::default())
    }

    /// Start from a grid filled with `color`.
    pub fn with_default_color(transport: impl Transport + 'static, color: Rgb) -> Self {
        Self {
            grid: PixelGrid::new(color),
            transport: Box::new(transport),
            frames: 0,
        }
    }

    /// Display for the board on serial port `port`.
    pub fn uart(port: impl Into<String>) -> Self {
        Self::new(UartTransport::new(port))
    }

    /// Display for the browser preview.
    pub fn preview(config: PreviewConfig) -> Self {
        Self::new(PreviewServerTransport::new(config))
    }

    pub fn grid(&self) -> &PixelGrid {
        &self.grid
    }

    pub fn grid_mut(&mut self) -> &mut PixelGrid {
        &mut self.grid
    }

    pub fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    /// Frames rendered since construction.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub async fn open(&mut self) -> Result<(), MatrixError> {
        self.transport.open().await?;
        info!(transport = self.transport.name(), "display opened");
        Ok(())
    }

    /// Encode the current grid and send it.
    pub async fn render(&mut self) -> Result<(), MatrixError> {
        self.transport.render(&self.grid).await?;
        self.frames += 1;
        debug!(frame = self.frames, "rendered");
        Ok(())
    }

    pub async fn close(&mut self) -> Result<(), MatrixError> {
        self.transport.close().await?;
        info!(
            transport = self.transport.name(),
            frames = self.frames,
            "display closed"
        );
        Ok(())
    }
}

impl std::fmt::Debug for Display {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Display")
            .field("transport", &self.transport.name())
            .field("open", &self.transport.is_open())
            .field("frames", &self.frames)
            .finish_non_exhaustive()
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use super::*;
    use crate::color::{GRAY, RED};
    use crate::transport::TransportState;

    /// Records every grid it is asked to render.
    #[derive(Default)]
    struct Recorder {
        state: TransportState,
        frames: Arc<Mutex<Vec<PixelGrid>>>,
    }

    #[async_trait]
    impl Transport for Recorder {
        fn name(&self) -> &'static str {
            "recorder"
        }

        async fn open(&mut self) -> Result<(), MatrixError> {
            self.state.open()
        }

        async fn render(&mut self, grid: &PixelGrid) -> Result<(), MatrixError> {
            self.state.require_open()?;
            self.frames.lock().unwrap().push(*grid);
            Ok(())
        }

        async fn close(&mut self) -> Result<(), MatrixError> {
            self.state.close()
        }

        fn is_open(&self) -> bool {
            self.state.is_open()
        }
    }

    #[tokio::test]
    async fn render_sends_current_grid() {
        let recorder = Recorder::default();
        let frames = Arc::clone(&recorder.frames);
        let mut display = Display::with_default_color(recorder, GRAY);

        display.open().await.unwrap();
        display.render().await.unwrap();
        display.grid_mut().set(0, 0, RED).unwrap();
        display.render().await.unwrap();
        display.close().await.unwrap();

        let frames = frames.lock().unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0], PixelGrid::new(GRAY));
        assert_eq!(frames[1].get(0, 0).unwrap(), RED);
        assert_eq!(display.frames(), 2);
        assert!(!display.transport().is_open());
    }

    #[tokio::test]
    async fn render_before_open_fails() {
        let mut display = Display::new(Recorder::default());
        assert!(display.render().await.is_err());
        assert_eq!(display.frames(), 0);
    }

    #[test]
    fn uart_display_starts_closed() {
        let display = Display::uart("COM6");
        assert_eq!(display.transport().name(), "uart");
        assert!(!display.transport().is_open());
        assert_eq!(display.grid(), &PixelGrid::default());
    }
}
