//! Inbound half of a session: handles control frames until the transport
//! or the hub ends the session.

use chrono::Utc;
use futures::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::connection::handle::ConnectionId;
use crate::hub::Hub;
use crate::update::{InboundFrame, Update, serializer, validator};

use super::Frame;
use super::ping::PingRecorder;

/// How the read loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// The client closed the session or the stream ended.
    ClientClosed,
    /// The transport reported an error or stopped accepting writes.
    TransportError,
    /// The hub closed the connection (eviction, unregister, or stop).
    HubClosed,
}

/// Reads frames from `stream` until it ends, fails, `closed` fires, or the
/// writer reports a dead transport through `write_failed`.
pub async fn read_loop<R, E>(
    hub: &Hub,
    id: &ConnectionId,
    mut stream: R,
    closed: CancellationToken,
    write_failed: CancellationToken,
    recorder: &dyn PingRecorder,
) -> ReadOutcome
where
    R: Stream<Item = Result<Frame, E>> + Unpin + Send,
    E: std::fmt::Display + Send,
{
    loop {
        let frame = tokio::select! {
            biased;
            _ = closed.cancelled() => return ReadOutcome::HubClosed,
            _ = write_failed.cancelled() => return ReadOutcome::TransportError,
            frame = stream.next() => frame,
        };

        match frame {
            None | Some(Ok(Frame::Close)) => return ReadOutcome::ClientClosed,
            Some(Err(e)) => {
                warn!(conn_id = %id, error = %e, "Transport error");
                return ReadOutcome::TransportError;
            }
            Some(Ok(Frame::Control)) => {}
            Some(Ok(Frame::Text(text))) => handle_text(hub, id, &text, recorder).await,
        }
    }
}

async fn handle_text(hub: &Hub, id: &ConnectionId, text: &str, recorder: &dyn PingRecorder) {
    if let Err(e) = validator::validate_inbound(text, hub.config().max_inbound_frame_bytes) {
        debug!(conn_id = %id, error = %e, "Ignoring inbound frame");
        return;
    }

    match serializer::decode_inbound(text) {
        Ok(InboundFrame::Ping { timestamp }) => {
            if let Err(e) = recorder.record_ping(id, Utc::now()).await {
                warn!(conn_id = %id, error = %e, "Failed to record ping");
            }
            if let Err(e) = hub.send_to_one(id, Update::pong(timestamp)) {
                debug!(conn_id = %id, error = %e, "Could not answer ping");
            }
        }
        Ok(InboundFrame::Pong { .. }) => {
            debug!(conn_id = %id, "Pong received");
        }
        Err(e) => {
            debug!(conn_id = %id, error = %e, "Ignoring unrecognized inbound frame");
        }
    }
}
