//! The hub control loop.
//!
//! Every registry mutation and every fan-out runs here, one command at a
//! time, which is what gives each connection a queue order equal to the
//! order in which the hub accepted the publishes.

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use filestore_core::config::RealtimeConfig;

use crate::connection::handle::{CloseReason, Connection, ConnectionId};
use crate::connection::registry::Registry;
use crate::error::HubError;
use crate::metrics::HubMetrics;
use crate::update::Update;

use super::command::Command;

/// Connections that must be removed, with the reason for each.
type Removals = VecDeque<(ConnectionId, CloseReason)>;

/// Owns the receiving end of the command channel.
#[derive(Debug)]
pub struct ControlLoop {
    commands: mpsc::UnboundedReceiver<Command>,
    registry: Arc<Registry>,
    metrics: Arc<HubMetrics>,
    config: RealtimeConfig,
}

impl ControlLoop {
    /// Creates a control loop over the given registry.
    pub fn new(
        commands: mpsc::UnboundedReceiver<Command>,
        registry: Arc<Registry>,
        metrics: Arc<HubMetrics>,
        config: RealtimeConfig,
    ) -> Self {
        Self {
            commands,
            registry,
            metrics,
            config,
        }
    }

    /// Runs until a `Stop` command arrives or every sender is dropped.
    pub async fn run(mut self) {
        info!(queue_capacity = self.config.queue_capacity, "Hub control loop running");

        while let Some(command) = self.commands.recv().await {
            let backlog = self.commands.len();
            if backlog > self.config.command_backlog_warn {
                warn!(backlog, "Hub control loop is falling behind");
            }

            match command {
                Command::Register { connection, reply } => {
                    let result = self.register(connection);
                    let _ = reply.send(result);
                }
                Command::Unregister { id } => {
                    self.remove_all(VecDeque::from([(id, CloseReason::Unregistered)]));
                }
                Command::Publish(update) => {
                    self.metrics.published();
                    let failed = self.fan_out(&update, None);
                    self.remove_all(failed);
                }
                Command::SendToOne { id, update } => {
                    self.send_to_one(&id, update);
                }
                Command::Flush { reply } => {
                    let _ = reply.send(());
                }
                Command::Stop { done } => {
                    self.close_all();
                    let _ = done.send(());
                    info!("Hub control loop stopped");
                    return;
                }
            }
        }

        // Every sender dropped without an explicit stop.
        self.close_all();
        info!("Hub control loop exited");
    }

    fn register(&mut self, connection: Connection) -> Result<(), HubError> {
        let id = connection.id().clone();

        if let Err(err) = self.registry.add(Arc::new(connection)) {
            self.metrics.duplicate_rejected();
            warn!(conn_id = %id, "Rejected registration: identity already registered");
            return Err(err);
        }

        self.metrics.connection_opened();
        info!(conn_id = %id, total = self.registry.len(), "Connection registered");

        if self.config.announce_presence {
            let joined = Arc::new(Update::user_joined(&id));
            let failed = self.fan_out(&joined, Some(&id));
            self.remove_all(failed);
        }

        Ok(())
    }

    fn send_to_one(&mut self, id: &ConnectionId, update: Arc<Update>) {
        let Some(connection) = self.registry.get(id) else {
            debug!(conn_id = %id, kind = %update.kind, "Targeted update for unknown connection");
            return;
        };

        match connection.enqueue(update) {
            Ok(()) => self.metrics.delivered(1, 0),
            Err(err) => {
                self.metrics.delivered(0, 1);
                drop(connection);
                self.remove_all(VecDeque::from([(id.clone(), close_reason(&err))]));
            }
        }
    }

    /// Enqueues `update` on every registered connection except `exclude`
    /// and returns the connections that could not take it.
    fn fan_out(&self, update: &Arc<Update>, exclude: Option<&ConnectionId>) -> Removals {
        let mut failed = Removals::new();
        let mut delivered = 0u64;

        for connection in self.registry.snapshot() {
            if Some(connection.id()) == exclude {
                continue;
            }
            match connection.enqueue(update.clone()) {
                Ok(()) => delivered += 1,
                Err(err) => {
                    debug!(conn_id = %connection.id(), error = %err, "Enqueue failed");
                    failed.push_back((connection.id().clone(), close_reason(&err)));
                }
            }
        }

        self.metrics.delivered(delivered, failed.len() as u64);
        debug!(kind = %update.kind, delivered, failed = failed.len(), "Update fanned out");
        failed
    }

    /// Removes, closes, and announces each connection in turn. A departure
    /// announcement that overflows another queue queues that connection
    /// for removal too; the registry shrinks every round, so this ends.
    fn remove_all(&mut self, mut pending: Removals) {
        while let Some((id, reason)) = pending.pop_front() {
            let Some(connection) = self.registry.remove(&id) else {
                debug!(conn_id = %id, "Connection already removed");
                continue;
            };

            connection.close(reason);
            self.metrics
                .connection_closed(matches!(reason, CloseReason::Evicted));

            match reason {
                CloseReason::Evicted => {
                    warn!(conn_id = %id, "Evicted connection: outbound queue full");
                }
                _ => info!(conn_id = %id, reason = ?reason, "Connection unregistered"),
            }

            if self.config.announce_presence {
                let left = Arc::new(Update::user_left(&id));
                pending.extend(self.fan_out(&left, None));
            }
        }
    }

    fn close_all(&mut self) {
        let connections = self.registry.drain();
        for connection in &connections {
            connection.close(CloseReason::HubStopped);
            self.metrics.connection_closed(false);
        }
        info!(count = connections.len(), "All connections closed");
    }
}

fn close_reason(err: &HubError) -> CloseReason {
    match err {
        HubError::SubscriberEvicted(_) => CloseReason::Evicted,
        _ => CloseReason::Disconnected,
    }
}
