//! Messages accepted by the control loop.

use std::sync::Arc;

use tokio::sync::oneshot;

use crate::connection::handle::{Connection, ConnectionId};
use crate::error::HubError;
use crate::update::Update;

/// A request for the control loop. Commands are applied strictly in the
/// order they were accepted.
#[derive(Debug)]
pub enum Command {
    /// Add a connection and announce it to the others.
    Register {
        /// The hub side of the new connection.
        connection: Connection,
        /// Outcome of the registration.
        reply: oneshot::Sender<Result<(), HubError>>,
    },
    /// Remove a connection, close its queue, announce its departure.
    Unregister {
        /// Identity to remove.
        id: ConnectionId,
    },
    /// Fan an update out to every registered connection.
    Publish(Arc<Update>),
    /// Deliver an update to one connection.
    SendToOne {
        /// Target identity.
        id: ConnectionId,
        /// The update.
        update: Arc<Update>,
    },
    /// Resolves once every earlier command has been applied.
    Flush {
        /// Completion signal.
        reply: oneshot::Sender<()>,
    },
    /// Close every connection and exit the loop.
    Stop {
        /// Completion signal.
        done: oneshot::Sender<()>,
    },
}
