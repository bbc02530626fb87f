//! Browser stand-in for the physical panel.
//!
//! `open` starts a local HTTP server, announces `Connected` on the
//! `connection_status` channel and points the default browser at the
//! preview page. Each `render` pushes a fresh HTML fragment to every
//! page subscribed to `led_array`. `close` announces `NOT Connected`,
//! ends all event streams and stops the server.

pub mod channel;
pub mod server;

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::encoder::{FrameEncoder, HtmlEncoder};
use crate::error::MatrixError;
use crate::grid::PixelGrid;
use crate::transport::{Transport, TransportState};

pub use channel::{
    CONNECTION_STATUS, Channel, ChannelRegistry, Event, LED_ARRAY, STATUS_CONNECTED,
    STATUS_DISCONNECTED, SUBSCRIBER_BACKLOG, Subscription,
};
pub use server::{PAGE_PATH, PreviewServer, SHUTDOWN_GRACE};

/// Port the preview page has always been served on.
pub const DEFAULT_PORT: u16 = 8000;

/// Preview server settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    /// Interface to bind.
    pub host: String,
    /// TCP port; 0 picks a free one.
    pub port: u16,
    /// Launch the default browser on open.
    pub open_browser: bool,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: DEFAULT_PORT,
            open_browser: true,
        }
    }
}

impl PreviewConfig {
    fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// ── PreviewServerTransport ───────────────────────────────────────

pub struct PreviewServerTransport {
    config: PreviewConfig,
    encoder: HtmlEncoder,
    routes: Arc<ChannelRegistry>,
    server: Option<PreviewServer>,
    state: TransportState,
}

impl PreviewServerTransport {
    pub fn new(config: PreviewConfig) -> Self {
        Self {
            config,
            encoder: HtmlEncoder,
            routes: Arc::new(ChannelRegistry::preview()),
            server: None,
            state: TransportState::Closed,
        }
    }

    /// Bound address while open.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.server.as_ref().map(PreviewServer::local_addr)
    }

    /// URL of the preview page while open.
    pub fn page_url(&self) -> Option<String> {
        self.local_addr().map(|addr| {
            let host = if addr.ip().is_unspecified() {
                "localhost".to_string()
            } else {
                addr.ip().to_string()
            };
            format!("http://{host}:{}{PAGE_PATH}", addr.port())
        })
    }

    /// The channel registered under `name`.
    pub fn channel(&self, name: &str) -> Option<&Arc<Channel>> {
        self.routes.get(name)
    }

    /// Broadcast the connection state. Going down also ends every stream.
    fn set_connected(&self, connected: bool) {
        let status = if connected {
            STATUS_CONNECTED
        } else {
            STATUS_DISCONNECTED
        };
        if let Some(channel) = self.routes.get(CONNECTION_STATUS) {
            channel.publish(status);
        }
        if !connected {
            self.routes.close_all();
        }
        debug!(status, "connection state broadcast");
    }

    fn launch_browser(&self) {
        let Some(url) = self.page_url() else {
            return;
        };
        match webbrowser::open(&url) {
            Ok(()) => info!("opened {url}"),
            Err(e) => warn!("could not open browser for {url}: {e}"),
        }
    }
}

impl std::fmt::Debug for PreviewServerTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreviewServerTransport")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("local_addr", &self.local_addr())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Transport for PreviewServerTransport {
    fn name(&self) -> &'static str {
        "preview"
    }

    async fn open(&mut self) -> Result<(), MatrixError> {
        self.state.require_closed()?;

        // Channels closed by a previous session stay closed; start fresh.
        self.routes = Arc::new(ChannelRegistry::preview());
        let server = PreviewServer::bind(&self.config.bind_addr(), Arc::clone(&self.routes)).await?;
        self.server = Some(server);
        self.state.open()?;
        self.set_connected(true);

        if self.config.open_browser {
            self.launch_browser();
        }
        Ok(())
    }

    async fn render(&mut self, grid: &PixelGrid) -> Result<(), MatrixError> {
        self.state.require_open()?;
        let html = self.encoder.encode(grid);
        if let Some(channel) = self.routes.get(LED_ARRAY) {
            let reached = channel.publish(html);
            debug!(subscribers = reached, "frame published");
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<(), MatrixError> {
        self.state.close()?;
        self.set_connected(false);
        if let Some(server) = self.server.take() {
            server.shutdown().await?;
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.state.is_open()
    }
}

impl Drop for PreviewServerTransport {
    fn drop(&mut self) {
        if let Some(server) = &self.server {
            self.routes.close_all();
            server.abort();
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn ephemeral() -> PreviewConfig {
        PreviewConfig {
            port: 0,
            open_browser: false,
            ..PreviewConfig::default()
        }
    }

    #[test]
    fn default_config() {
        let cfg = PreviewConfig::default();
        assert_eq!(cfg.port, 8000);
        assert!(cfg.open_browser);
        assert_eq!(cfg.bind_addr(), "127.0.0.1:8000");
    }

    #[tokio::test]
    async fn render_requires_open() {
        let mut preview = PreviewServerTransport::new(ephemeral());
        let err = preview.render(&PixelGrid::default()).await.unwrap_err();
        assert!(matches!(err, MatrixError::InvalidState(_)));
        assert!(preview.local_addr().is_none());
    }

    #[tokio::test]
    async fn open_announces_connected_and_close_quits() {
        let mut preview = PreviewServerTransport::new(ephemeral());
        preview.open().await.unwrap();
        assert!(preview.is_open());
        assert!(preview.page_url().unwrap().ends_with("/LedArray.html"));

        let mut status = preview.channel(CONNECTION_STATUS).unwrap().subscribe();
        let mut leds = preview.channel(LED_ARRAY).unwrap().subscribe();
        assert_eq!(status.recv().await, Some(Event::Data("Connected".into())));

        preview.render(&PixelGrid::default()).await.unwrap();
        match leds.recv().await {
            Some(Event::Data(html)) => assert_eq!(html.matches("rgb(0, 0, 0)").count(), 64),
            other => panic!("unexpected event: {other:?}"),
        }

        preview.close().await.unwrap();
        assert!(!preview.is_open());
        assert_eq!(
            status.recv().await,
            Some(Event::Data("NOT Connected".into()))
        );
        assert_eq!(status.recv().await, Some(Event::Quit));
        assert_eq!(leds.recv().await, Some(Event::Quit));
    }

    #[tokio::test]
    async fn port_in_use_is_unavailable() {
        let mut first = PreviewServerTransport::new(ephemeral());
        first.open().await.unwrap();
        let port = first.local_addr().unwrap().port();

        let mut second = PreviewServerTransport::new(PreviewConfig {
            port,
            ..ephemeral()
        });
        let err = second.open().await.unwrap_err();
        assert!(matches!(err, MatrixError::TransportUnavailable { .. }));
        assert!(!second.is_open());

        first.close().await.unwrap();
    }
}
