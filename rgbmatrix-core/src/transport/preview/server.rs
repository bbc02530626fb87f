//! Minimal HTTP/1.1 server for the preview page.
//!
//! Routes:
//!
//! | Path                        | Response                              |
//! |-----------------------------|---------------------------------------|
//! | `/`, `/LedArray.html`       | the static preview page               |
//! | `/local_cgi/<channel>[?…]`  | `text/event-stream` fed by `<channel>` |
//!
//! One task per connection. Streaming handlers run until their channel
//! delivers [`Event::Quit`], the client goes away, or the server is
//! cancelled. Cancellation also interrupts a write stuck on a client that
//! stopped reading, and shutdown aborts whatever is still running after
//! [`SHUTDOWN_GRACE`].

use std::fmt::Write as _;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::channel::{ChannelRegistry, Event};
use crate::error::MatrixError;

/// The page served at `/`.
pub const PREVIEW_PAGE: &str = include_str!("../../../assets/LedArray.html");
pub const PAGE_PATH: &str = "/LedArray.html";

const STREAM_PREFIX: &str = "/local_cgi/";
const MAX_HEAD: usize = 8 * 1024;

/// How long shutdown waits for connection tasks before aborting them.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

// ── Response heading ─────────────────────────────────────────────

fn reason_phrase(code: u16) -> &'static str {
    match code {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        405 => "Method Not Allowed",
        431 => "Request Header Fields Too Large",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}

/// Status line plus headers of a response.
#[derive(Debug)]
struct ResponseHead {
    status: u16,
    content_type: &'static str,
    content_length: Option<usize>,
    streaming: bool,
}

impl ResponseHead {
    const fn new(status: u16, content_type: &'static str) -> Self {
        Self {
            status,
            content_type,
            content_length: None,
            streaming: false,
        }
    }

    const fn with_content_length(mut self, len: usize) -> Self {
        self.content_length = Some(len);
        self
    }

    const fn event_stream() -> Self {
        Self {
            status: 200,
            content_type: "text/event-stream",
            content_length: None,
            streaming: true,
        }
    }

    fn render(&self) -> String {
        let mut out = String::with_capacity(160);
        // Writing into a String cannot fail.
        let _ = write!(
            out,
            "HTTP/1.1 {} {}\r\nContent-Type: {}\r\n",
            self.status,
            reason_phrase(self.status),
            self.content_type,
        );
        if let Some(len) = self.content_length {
            let _ = write!(out, "Content-Length: {len}\r\n");
        }
        if self.streaming {
            out.push_str("Cache-Control: no-cache\r\n");
        }
        out.push_str("Connection: close\r\n\r\n");
        out
    }
}

// ── Request parsing ──────────────────────────────────────────────

/// Method and target of a request line. Returns `None` when the line is
/// not `METHOD TARGET VERSION`.
fn parse_request_line(head: &str) -> Option<(&str, &str)> {
    let line = head.lines().next()?;
    let mut parts = line.split_whitespace();
    let method = parts.next()?;
    let target = parts.next()?;
    parts.next()?;
    Some((method, target))
}

/// Read until the blank line that ends the request head.
async fn read_head(stream: &mut TcpStream) -> Result<Option<String>, MatrixError> {
    let mut buf = Vec::with_capacity(1024);
    let mut chunk = [0u8; 1024];
    loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(None);
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            buf.truncate(end);
            return Ok(Some(String::from_utf8_lossy(&buf).into_owned()));
        }
        if buf.len() >= MAX_HEAD {
            return Err("request head too large".into());
        }
    }
}

/// Strip the query string.
fn route_path(target: &str) -> &str {
    target.split(['?', '#']).next().unwrap_or(target)
}

// ── Connection handling ──────────────────────────────────────────

async fn respond(
    stream: &mut TcpStream,
    status: u16,
    content_type: &'static str,
    body: &str,
) -> Result<(), MatrixError> {
    let head = ResponseHead::new(status, content_type).with_content_length(body.len());
    stream.write_all(head.render().as_bytes()).await?;
    stream.write_all(body.as_bytes()).await?;
    stream.flush().await?;
    Ok(())
}

/// Serialize one event-stream frame. Multi-line payloads become one
/// `data:` line each, as the event-stream format requires.
fn sse_frame(payload: &str) -> String {
    let mut frame = String::with_capacity(payload.len() + 8);
    for line in payload.split('\n') {
        frame.push_str("data: ");
        frame.push_str(line);
        frame.push('\n');
    }
    frame.push('\n');
    frame
}

async fn stream_channel(
    stream: &mut TcpStream,
    routes: &ChannelRegistry,
    name: &str,
    cancel: &CancellationToken,
) -> Result<(), MatrixError> {
    let Some(channel) = routes.get(name) else {
        return respond(
            stream,
            404,
            "text/plain",
            &format!("No such event channel ({name})"),
        )
        .await;
    };

    // Subscribe before the head goes out so a client that has seen the
    // head is guaranteed to receive every later event.
    let mut events = channel.subscribe();
    stream
        .write_all(ResponseHead::event_stream().render().as_bytes())
        .await?;
    stream.flush().await?;
    debug!(channel = name, "event stream opened");

    loop {
        let event = tokio::select! {
            biased;
            ev = events.recv() => ev,
            _ = cancel.cancelled() => None,
        };
        let frame = match event {
            Some(Event::Data(payload)) => sse_frame(&payload),
            Some(Event::Quit) | None => break,
        };

        // A write with room in the socket buffer completes on its first
        // poll, so queued frames still go out after cancellation.
        let written = tokio::select! {
            biased;
            res = write_frame(stream, frame.as_bytes()) => Some(res),
            _ = cancel.cancelled() => None,
        };
        match written {
            Some(res) => res?,
            None => {
                debug!(channel = name, "event stream cancelled mid-write");
                return Ok(());
            }
        }
        debug!(channel = name, bytes = frame.len(), "event sent");
    }

    debug!(channel = name, "event stream closed");
    stream.shutdown().await?;
    Ok(())
}

async fn write_frame(stream: &mut TcpStream, frame: &[u8]) -> Result<(), MatrixError> {
    stream.write_all(frame).await?;
    stream.flush().await?;
    Ok(())
}

async fn handle_connection(
    mut stream: TcpStream,
    routes: Arc<ChannelRegistry>,
    cancel: CancellationToken,
) -> Result<(), MatrixError> {
    let head = tokio::select! {
        head = read_head(&mut stream) => head?,
        _ = cancel.cancelled() => return Ok(()),
    };
    let Some(head) = head else {
        return Ok(());
    };

    let Some((method, target)) = parse_request_line(&head) else {
        return respond(&mut stream, 400, "text/plain", "Bad Request").await;
    };
    if method != "GET" {
        return respond(&mut stream, 405, "text/plain", "Method Not Allowed").await;
    }

    let path = route_path(target);
    match path {
        "/" | PAGE_PATH => {
            respond(&mut stream, 200, "text/html; charset=utf-8", PREVIEW_PAGE).await
        }
        _ => match path.strip_prefix(STREAM_PREFIX) {
            Some(name) => {
                stream_channel(&mut stream, &routes, name.trim_matches('/'), &cancel).await
            }
            None => respond(&mut stream, 404, "text/plain", "Not Found").await,
        },
    }
}

// ── PreviewServer ────────────────────────────────────────────────

/// Handle to a running preview server.
#[derive(Debug)]
pub struct PreviewServer {
    local_addr: SocketAddr,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl PreviewServer {
    /// Bind `addr` and start serving `routes` on a background task.
    pub async fn bind(addr: &str, routes: Arc<ChannelRegistry>) -> Result<Self, MatrixError> {
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            MatrixError::TransportUnavailable {
                target: addr.to_string(),
                reason: e.to_string(),
            }
        })?;
        let local_addr = listener.local_addr()?;
        let cancel = CancellationToken::new();
        let task = tokio::spawn(accept_loop(listener, routes, cancel.clone()));
        info!("preview server listening on http://{local_addr}");

        Ok(Self {
            local_addr,
            cancel,
            task,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting, wait for every connection task, release the socket.
    pub async fn shutdown(self) -> Result<(), MatrixError> {
        self.cancel.cancel();
        self.task
            .await
            .map_err(|e| format!("preview server task: {e}"))?;
        info!("preview server on {} stopped", self.local_addr);
        Ok(())
    }

    /// Cancel without waiting, for use from `Drop`.
    pub fn abort(&self) {
        self.cancel.cancel();
    }
}

async fn accept_loop(listener: TcpListener, routes: Arc<ChannelRegistry>, cancel: CancellationToken) {
    let mut connections = JoinSet::new();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    debug!(%peer, "preview client connected");
                    let routes = Arc::clone(&routes);
                    let cancel = cancel.clone();
                    connections.spawn(async move {
                        if let Err(e) = handle_connection(stream, routes, cancel).await {
                            debug!(%peer, "preview connection ended: {e}");
                        }
                    });
                }
                Err(e) => warn!("preview accept error: {e}"),
            },
            Some(done) = connections.join_next(), if !connections.is_empty() => {
                if let Err(e) = done {
                    warn!("preview connection task failed: {e}");
                }
            }
        }
    }

    drop(listener);
    let drain = async {
        while let Some(done) = connections.join_next().await {
            if let Err(e) = done {
                warn!("preview connection task failed: {e}");
            }
        }
    };
    if tokio::time::timeout(SHUTDOWN_GRACE, drain).await.is_err() {
        warn!(
            remaining = connections.len(),
            "preview connections still busy after {SHUTDOWN_GRACE:?}; aborting"
        );
        connections.abort_all();
        while connections.join_next().await.is_some() {}
    }
}

// ── Tests ────────────────────────────────────────────────────────
