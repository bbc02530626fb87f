//! Named broadcast channels feeding the event-stream endpoints.
//!
//! Every browser connection subscribes to exactly one [`Channel`] and
//! gets its own bounded queue. Publishing never blocks: the payload is
//! pushed into each live queue, and a queue whose receiver is gone or
//! already holds [`SUBSCRIBER_BACKLOG`] undelivered events is dropped.
//! A dropped subscriber drains what it has and then sees the end of its
//! stream. A channel remembers its last payload so late subscribers see
//! the current state immediately.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::debug;

/// Channel carrying `Connected` / `NOT Connected`.
pub const CONNECTION_STATUS: &str = "connection_status";
/// Channel carrying the rendered LED fragment.
pub const LED_ARRAY: &str = "led_array";

/// Undelivered events a subscriber may hold before it is dropped.
pub const SUBSCRIBER_BACKLOG: usize = 32;

/// Status payloads on [`CONNECTION_STATUS`].
pub const STATUS_CONNECTED: &str = "Connected";
pub const STATUS_DISCONNECTED: &str = "NOT Connected";

/// Message delivered to a subscriber's queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Payload for one `data:` frame.
    Data(String),
    /// End the stream.
    Quit,
}

pub type Subscription = mpsc::Receiver<Event>;

#[derive(Debug, Default)]
struct ChannelInner {
    subscribers: Vec<mpsc::Sender<Event>>,
    current: Option<String>,
    closed: bool,
}

/// One named fan-out channel.
#[derive(Debug)]
pub struct Channel {
    name: &'static str,
    inner: Mutex<ChannelInner>,
}

impl Channel {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            inner: Mutex::new(ChannelInner::default()),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    fn lock(&self) -> MutexGuard<'_, ChannelInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a new subscriber. The queue is primed with the current
    /// payload, and with [`Event::Quit`] if the channel is already closed.
    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_BACKLOG);
        let mut inner = self.lock();
        if let Some(current) = &inner.current {
            let _ = tx.try_send(Event::Data(current.clone()));
        }
        if inner.closed {
            let _ = tx.try_send(Event::Quit);
        } else {
            inner.subscribers.push(tx);
        }
        rx
    }

    /// Send `payload` to every subscriber and remember it. Returns the
    /// number of subscribers reached.
    pub fn publish(&self, payload: impl Into<String>) -> usize {
        let payload = payload.into();
        let name = self.name;
        let mut inner = self.lock();
        inner
            .subscribers
            .retain(|tx| match tx.try_send(Event::Data(payload.clone())) {
                Ok(()) => true,
                Err(TrySendError::Full(_)) => {
                    debug!(channel = name, "subscriber fell behind; dropped");
                    false
                }
                Err(TrySendError::Closed(_)) => false,
            });
        inner.current = Some(payload);
        inner.subscribers.len()
    }

    /// Terminate every stream. Later subscribers get an immediate `Quit`.
    pub fn close(&self) {
        let mut inner = self.lock();
        inner.closed = true;
        // A full queue cannot take the Quit, but dropping its sender ends
        // the stream just the same.
        for tx in inner.subscribers.drain(..) {
            let _ = tx.try_send(Event::Quit);
        }
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Live subscribers, after pruning dropped ones.
    pub fn subscriber_count(&self) -> usize {
        let mut inner = self.lock();
        inner.subscribers.retain(|tx| !tx.is_closed());
        inner.subscribers.len()
    }
}

// ── ChannelRegistry ──────────────────────────────────────────────

/// Routing table from `/local_cgi/<name>` to its channel, fixed at
/// construction.
#[derive(Debug, Default)]
pub struct ChannelRegistry {
    channels: HashMap<&'static str, Arc<Channel>>,
}

impl ChannelRegistry {
    pub fn new(names: &[&'static str]) -> Self {
        let channels = names
            .iter()
            .map(|&name| (name, Arc::new(Channel::new(name))))
            .collect();
        Self { channels }
    }

    /// The table used by the preview page.
    pub fn preview() -> Self {
        Self::new(&[CONNECTION_STATUS, LED_ARRAY])
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Channel>> {
        self.channels.get(name)
    }

    pub fn channels(&self) -> impl Iterator<Item = &Arc<Channel>> {
        self.channels.values()
    }

    /// Close every channel.
    pub fn close_all(&self) {
        for channel in self.channels() {
            channel.close();
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
