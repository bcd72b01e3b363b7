//! One subscriber's outbound queue, split into a hub side and a transport side.
//!
//! [`Connection`] is owned by the hub and is the only producer for the
//! queue. [`Subscriber`] is handed to the transport, which drains the queue
//! and watches for closure. Both share a [`ConnectionState`] carrying the
//! liveness flag, the close reason, and the cancellation token that tells
//! the transport to hang up.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::HubError;
use crate::update::Update;

/// Opaque subscriber identity, supplied by the authentication layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(String);

impl ConnectionId {
    /// Wrap an identity string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identity string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConnectionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ConnectionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&ConnectionId> for ConnectionId {
    fn from(value: &ConnectionId) -> Self {
        value.clone()
    }
}

/// Why a connection's queue was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    /// The transport asked to unregister.
    Unregistered,
    /// The outbound queue overflowed.
    Evicted,
    /// The transport dropped its end of the queue.
    Disconnected,
    /// The hub was stopped.
    HubStopped,
}

/// State shared between the hub side and the transport side.
#[derive(Debug)]
struct ConnectionState {
    connected_at: DateTime<Utc>,
    alive: AtomicBool,
    reason: OnceLock<CloseReason>,
    closed: CancellationToken,
}

/// Hub-side handle: the producer end of a subscriber's queue.
#[derive(Debug)]
pub struct Connection {
    id: ConnectionId,
    sender: mpsc::Sender<Arc<Update>>,
    state: Arc<ConnectionState>,
}

/// Transport-side handle: the consumer end of a subscriber's queue.
#[derive(Debug)]
pub struct Subscriber {
    id: ConnectionId,
    receiver: mpsc::Receiver<Arc<Update>>,
    state: Arc<ConnectionState>,
}

/// Create a connected queue pair with the given capacity.
pub fn channel(id: ConnectionId, capacity: usize) -> (Connection, Subscriber) {
    let (sender, receiver) = mpsc::channel(capacity.max(1));
    let state = Arc::new(ConnectionState {
        connected_at: Utc::now(),
        alive: AtomicBool::new(true),
        reason: OnceLock::new(),
        closed: CancellationToken::new(),
    });

    (
        Connection {
            id: id.clone(),
            sender,
            state: state.clone(),
        },
        Subscriber {
            id,
            receiver,
            state,
        },
    )
}

impl Connection {
    /// The connection's identity.
    pub fn id(&self) -> &ConnectionId {
        &self.id
    }

    /// Whether the connection is still open.
    pub fn is_alive(&self) -> bool {
        self.state.alive.load(Ordering::SeqCst)
    }

    /// Append an update without waiting.
    ///
    /// A full queue yields [`HubError::SubscriberEvicted`]; a dropped
    /// transport yields [`HubError::SubscriberDisconnected`]. The caller is
    /// expected to evict the connection in both cases.
    pub fn enqueue(&self, update: Arc<Update>) -> Result<(), HubError> {
        if !self.is_alive() {
            return Err(HubError::SubscriberDisconnected(self.id.clone()));
        }
        match self.sender.try_send(update) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => {
                Err(HubError::SubscriberEvicted(self.id.clone()))
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                Err(HubError::SubscriberDisconnected(self.id.clone()))
            }
        }
    }

    /// Close the queue and signal the transport to hang up.
    ///
    /// Updates already queued remain readable. Only the first reason sticks.
    pub fn close(&self, reason: CloseReason) {
        let _ = self.state.reason.set(reason);
        self.state.alive.store(false, Ordering::SeqCst);
        self.state.closed.cancel();
    }

    /// Number of updates waiting in the queue.
    pub fn queued(&self) -> usize {
        self.sender.max_capacity() - self.sender.capacity()
    }

    /// Serializable snapshot of this connection.
    pub fn info(&self) -> ConnectionInfo {
        ConnectionInfo {
            id: self.id.clone(),
            connected_at: self.state.connected_at,
            alive: self.is_alive(),
            queued: self.queued(),
        }
    }
}

impl Subscriber {
    /// The connection's identity.
    pub fn id(&self) -> &ConnectionId {
        &self.id
    }

    /// Receive the next update in FIFO order.
    ///
    /// Returns `None` once the hub has closed the queue and every update
    /// queued before closure has been read.
    pub async fn recv(&mut self) -> Option<Arc<Update>> {
        tokio::select! {
            biased;
            update = self.receiver.recv() => update,
            _ = self.state.closed.cancelled() => {
                self.receiver.close();
                self.receiver.recv().await
            }
        }
    }

    /// Take every update currently queued without waiting.
    pub fn drain(&mut self) -> Vec<Arc<Update>> {
        let mut updates = Vec::new();
        while let Ok(update) = self.receiver.try_recv() {
            updates.push(update);
        }
        updates
    }

    /// Whether the hub has closed this connection.
    pub fn is_closed(&self) -> bool {
        self.state.closed.is_cancelled()
    }

    /// Why the connection was closed, if it has been.
    pub fn close_reason(&self) -> Option<CloseReason> {
        self.state.reason.get().copied()
    }

    /// Token cancelled when the hub closes this connection.
    pub fn closed_token(&self) -> CancellationToken {
        self.state.closed.clone()
    }
}

/// Snapshot of connection info (serializable).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionInfo {
    /// Connection ID.
    pub id: ConnectionId,
    /// Connected at.
    pub connected_at: DateTime<Utc>,
    /// Is alive.
    pub alive: bool,
    /// Updates waiting to be written.
    pub queued: usize,
}
