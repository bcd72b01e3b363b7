//! Public hub handle.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::info;

use filestore_core::config::RealtimeConfig;

use crate::connection::handle::{self, ConnectionId, ConnectionInfo, Subscriber};
use crate::connection::registry::Registry;
use crate::error::HubError;
use crate::metrics::{HubMetrics, MetricsSnapshot};
use crate::update::Update;

use super::command::Command;
use super::control::ControlLoop;

/// Lifecycle state of a hub. `Stopped` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HubState {
    /// Constructed, loop not yet spawned.
    Created,
    /// Loop running and accepting commands.
    Running,
    /// Stopped; every operation fails with [`HubError::HubStopped`].
    Stopped,
}

#[derive(Debug)]
enum Lifecycle {
    Created,
    Running(mpsc::UnboundedSender<Command>),
    Stopped,
}

#[derive(Debug)]
struct HubInner {
    config: RealtimeConfig,
    registry: Arc<Registry>,
    metrics: Arc<HubMetrics>,
    /// Guards both command acceptance and the transition to `Stopped`, so a
    /// command is either queued ahead of `Stop` or rejected.
    lifecycle: Mutex<Lifecycle>,
}

/// Process-wide fan-out broadcaster.
///
/// Cheap to clone; every clone talks to the same control loop. Construct
/// once at startup, call [`Hub::start`] from inside a tokio runtime, and
/// [`Hub::stop`] at shutdown.
#[derive(Debug, Clone)]
pub struct Hub {
    inner: Arc<HubInner>,
}

impl Hub {
    /// Creates a hub in the `Created` state.
    pub fn new(config: RealtimeConfig) -> Self {
        Self {
            inner: Arc::new(HubInner {
                config,
                registry: Arc::new(Registry::new()),
                metrics: Arc::new(HubMetrics::new()),
                lifecycle: Mutex::new(Lifecycle::Created),
            }),
        }
    }

    /// Spawns the control loop on the current tokio runtime.
    pub fn start(&self) -> Result<JoinHandle<()>, HubError> {
        let mut lifecycle = self.lifecycle();
        match *lifecycle {
            Lifecycle::Created => {}
            Lifecycle::Running(_) => return Err(HubError::HubAlreadyStarted),
            Lifecycle::Stopped => return Err(HubError::HubStopped),
        }

        let (sender, receiver) = mpsc::unbounded_channel();
        let control = ControlLoop::new(
            receiver,
            self.inner.registry.clone(),
            self.inner.metrics.clone(),
            self.inner.config.clone(),
        );
        let handle = tokio::spawn(control.run());
        *lifecycle = Lifecycle::Running(sender);

        info!("Real-time hub started");
        Ok(handle)
    }

    /// Stops the hub: every connection's queue is closed and later calls
    /// fail with [`HubError::HubStopped`]. Commands accepted before this
    /// call are applied first. Idempotent.
    pub async fn stop(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        {
            let mut lifecycle = self.lifecycle();
            match std::mem::replace(&mut *lifecycle, Lifecycle::Stopped) {
                Lifecycle::Running(sender) => {
                    if sender.send(Command::Stop { done: done_tx }).is_err() {
                        return;
                    }
                }
                Lifecycle::Created | Lifecycle::Stopped => return,
            }
        }

        let _ = done_rx.await;
        info!("Real-time hub stopped");
    }

    /// Registers a subscriber under `id` and returns the transport side of
    /// its queue. Other subscribers are told `user_joined`.
    pub async fn register(&self, id: impl Into<ConnectionId>) -> Result<Subscriber, HubError> {
        let (connection, subscriber) =
            handle::channel(id.into(), self.inner.config.queue_capacity);
        let (reply, outcome) = oneshot::channel();

        self.submit(Command::Register { connection, reply })?;
        outcome.await.map_err(|_| HubError::HubStopped)??;

        Ok(subscriber)
    }

    /// Removes `id`, closes its queue, and tells the others `user_left`.
    /// Unknown identities are ignored.
    pub fn unregister(&self, id: impl Into<ConnectionId>) -> Result<(), HubError> {
        self.submit(Command::Unregister { id: id.into() })
    }

    /// Fans `update` out to every connection registered when the hub
    /// applies it. Never waits on a subscriber.
    pub fn publish(&self, update: Update) -> Result<(), HubError> {
        self.submit(Command::Publish(Arc::new(update)))
    }

    /// Delivers `update` to a single connection, with the same
    /// evict-on-overflow policy as [`Hub::publish`].
    pub fn send_to_one(
        &self,
        id: impl Into<ConnectionId>,
        update: Update,
    ) -> Result<(), HubError> {
        self.submit(Command::SendToOne {
            id: id.into(),
            update: Arc::new(update),
        })
    }

    /// Waits until every command accepted before this call has been applied.
    pub async fn flush(&self) -> Result<(), HubError> {
        let (reply, done) = oneshot::channel();
        self.submit(Command::Flush { reply })?;
        done.await.map_err(|_| HubError::HubStopped)
    }

    /// Current lifecycle state.
    pub fn state(&self) -> HubState {
        match *self.lifecycle() {
            Lifecycle::Created => HubState::Created,
            Lifecycle::Running(_) => HubState::Running,
            Lifecycle::Stopped => HubState::Stopped,
        }
    }

    /// Number of registered connections.
    pub fn connection_count(&self) -> usize {
        self.inner.registry.len()
    }

    /// Whether `id` is currently registered.
    pub fn is_connected(&self, id: &ConnectionId) -> bool {
        self.inner.registry.contains(id)
    }

    /// Identities of all registered connections.
    pub fn connection_ids(&self) -> Vec<ConnectionId> {
        self.inner.registry.ids()
    }

    /// Info snapshots for all registered connections.
    pub fn connections(&self) -> Vec<ConnectionInfo> {
        self.inner.registry.info()
    }

    /// Snapshot of hub counters.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.inner.metrics.snapshot()
    }

    /// The configuration this hub was built with.
    pub fn config(&self) -> &RealtimeConfig {
        &self.inner.config
    }

    fn submit(&self, command: Command) -> Result<(), HubError> {
        match &*self.lifecycle() {
            Lifecycle::Running(sender) => sender.send(command).map_err(|_| HubError::HubStopped),
            Lifecycle::Created => Err(HubError::HubNotStarted),
            Lifecycle::Stopped => Err(HubError::HubStopped),
        }
    }

    fn lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        // Nothing panics while the lock is held, so a poisoned lock still
        // holds a consistent lifecycle.
        self.inner
            .lifecycle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::update::UpdateKind;

    fn config(queue_capacity: usize) -> RealtimeConfig {
        RealtimeConfig {
            queue_capacity,
            announce_presence: false,
            ..RealtimeConfig::default()
        }
    }

    #[tokio::test]
    async fn test_lifecycle_transitions() {
        let hub = Hub::new(config(4));
        assert_eq!(hub.state(), HubState::Created);
        assert!(matches!(hub.publish(Update::new("x", json!(null))), Err(HubError::HubNotStarted)));

        let _loop = hub.start().expect("start");
        assert_eq!(hub.state(), HubState::Running);
        assert!(matches!(hub.start(), Err(HubError::HubAlreadyStarted)));

        hub.stop().await;
        assert_eq!(hub.state(), HubState::Stopped);
        hub.stop().await;
        assert!(matches!(hub.start(), Err(HubError::HubStopped)));
    }

    #[tokio::test]
    async fn test_send_to_one_targets_single_connection() {
        let hub = Hub::new(config(4));
        let _loop = hub.start().expect("start");
        let mut a = hub.register("a").await.expect("register a");
        let mut b = hub.register("b").await.expect("register b");

        hub.send_to_one("a", Update::connected(a.id())).expect("send");
        hub.send_to_one("ghost", Update::new("x", json!(1))).expect("unknown is a no-op");
        hub.flush().await.expect("flush");

        let got = a.drain();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].kind, UpdateKind::Connected);
        assert!(b.drain().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_registration_keeps_original() {
        let hub = Hub::new(config(4));
        let _loop = hub.start().expect("start");
        let mut first = hub.register("a").await.expect("register");

        let err = hub.register("a").await.expect_err("duplicate");
        assert!(matches!(err, HubError::DuplicateIdentity(_)));
        assert_eq!(hub.metrics().duplicate_rejections, 1);

        hub.publish(Update::new(UpdateKind::FileDeleted, json!({ "key": "k" })))
            .expect("publish");
        hub.flush().await.expect("flush");
        assert_eq!(first.drain().len(), 1);
        assert!(!first.is_closed());
    }
}
