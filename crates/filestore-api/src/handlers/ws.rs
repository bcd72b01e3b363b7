//! WebSocket upgrade handler.

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::Response;
use futures::{SinkExt, StreamExt, future};
use serde::Deserialize;
use tracing::{debug, info, warn};

use filestore_core::error::AppError;
use filestore_realtime::session::{Frame, run_session};
use filestore_realtime::{ConnectionId, Hub, Subscriber, Update};

use crate::error::ApiError;
use crate::state::AppState;

/// Query parameters for the WebSocket upgrade.
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// Client identity. Must be unique among live connections.
    pub client_id: String,
}

/// A registration waiting for its socket.
///
/// Unregisters the identity when dropped before [`PendingSession::take`],
/// which covers a handler future dropped mid-request and an upgrade that
/// never completes.
struct PendingSession {
    hub: Hub,
    subscriber: Option<Subscriber>,
}

impl PendingSession {
    fn new(hub: Hub, subscriber: Subscriber) -> Self {
        Self {
            hub,
            subscriber: Some(subscriber),
        }
    }

    /// Hands the subscriber to the socket driver.
    fn take(&mut self) -> Option<Subscriber> {
        self.subscriber.take()
    }
}

impl Drop for PendingSession {
    fn drop(&mut self) {
        if let Some(subscriber) = self.subscriber.take() {
            debug!(conn_id = %subscriber.id(), "Releasing registration without a socket");
            let _ = self.hub.unregister(subscriber.id());
        }
    }
}

/// GET /ws?client_id={id}: WebSocket upgrade
///
/// The connection is registered before the upgrade so a stopped hub or a
/// duplicate identity is reported as an HTTP error.
pub async fn ws_upgrade(
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> Result<Response, ApiError> {
    let client_id = query.client_id.trim();
    if client_id.is_empty() {
        return Err(AppError::validation("client_id must not be empty").into());
    }

    let subscriber = state.hub.register(client_id).await?;
    let failed_id = subscriber.id().clone();
    let pending = PendingSession::new(state.hub.clone(), subscriber);

    Ok(ws
        .on_failed_upgrade(move |e| {
            warn!(conn_id = %failed_id, error = %e, "WebSocket upgrade failed");
        })
        .on_upgrade(move |socket| handle_socket(state, pending, socket)))
}

/// Drives an established WebSocket until either side closes it.
async fn handle_socket(state: AppState, mut pending: PendingSession, socket: WebSocket) {
    let Some(subscriber) = pending.take() else {
        return;
    };
    let id: ConnectionId = subscriber.id().clone();
    info!(conn_id = %id, "WebSocket connection established");

    let (ws_tx, ws_rx) = socket.split();
    let sink = ws_tx.with(|text: String| {
        future::ready(Ok::<_, axum::Error>(Message::Text(text.into())))
    });
    let stream = ws_rx.map(|result| result.map(frame_from_message));

    if let Err(e) = state.hub.send_to_one(&id, Update::connected(&id)) {
        warn!(conn_id = %id, error = %e, "Could not acknowledge connection");
    }

    let outcome = run_session(
        state.hub.clone(),
        subscriber,
        sink,
        stream,
        state.ping_recorder.clone(),
    )
    .await;

    info!(conn_id = %id, outcome = ?outcome, "WebSocket connection closed");
}

fn frame_from_message(message: Message) -> Frame {
    match message {
        Message::Text(text) => Frame::Text(text.as_str().to_owned()),
        Message::Close(_) => Frame::Close,
        Message::Binary(_) | Message::Ping(_) | Message::Pong(_) => Frame::Control,
    }
}

#[cfg(test)]
mod tests {
    use filestore_core::config::RealtimeConfig;

    use super::*;

    fn started_hub() -> Hub {
        let hub = Hub::new(RealtimeConfig {
            announce_presence: false,
            ..RealtimeConfig::default()
        });
        hub.start().expect("start hub");
        hub
    }

    #[tokio::test]
    async fn test_unclaimed_registration_is_released() {
        let hub = started_hub();
        let pending =
            PendingSession::new(hub.clone(), hub.register("alice").await.expect("register"));
        drop(pending);

        hub.flush().await.expect("flush");
        assert!(!hub.is_connected(&"alice".into()));
        assert!(hub.register("alice").await.is_ok(), "identity is free again");
    }

    #[tokio::test]
    async fn test_claimed_registration_is_kept() {
        let hub = started_hub();
        let mut pending =
            PendingSession::new(hub.clone(), hub.register("bob").await.expect("register"));
        let subscriber = pending.take().expect("subscriber");
        drop(pending);

        hub.flush().await.expect("flush");
        assert!(hub.is_connected(subscriber.id()));
    }

    #[test]
    fn test_frame_mapping() {
        assert_eq!(
            frame_from_message(Message::Text("hi".into())),
            Frame::Text("hi".to_string())
        );
        assert_eq!(frame_from_message(Message::Close(None)), Frame::Close);
        assert_eq!(
            frame_from_message(Message::Ping(Vec::new().into())),
            Frame::Control
        );
    }
}
