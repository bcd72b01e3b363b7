//! Transport-agnostic session driver.
//!
//! A transport (the WebSocket handler in `filestore-api`) registers a
//! connection with the hub, adapts its socket into a [`Frame`] stream and a
//! `String` sink, and hands both to [`run_session`]. The driver runs the
//! writer as its own task and the reader inline, then unregisters.

pub mod ping;
pub mod reader;
pub mod writer;

use std::sync::Arc;

use futures::{Sink, Stream};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::connection::handle::Subscriber;
use crate::hub::Hub;

pub use ping::{PingRecorder, TracingPingRecorder};
pub use reader::ReadOutcome;

/// An inbound transport frame, reduced to what the session cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A text frame carrying JSON.
    Text(String),
    /// Transport-level control traffic (ping/pong/binary) the transport
    /// library already handles.
    Control,
    /// The client asked to close.
    Close,
}

/// Drives one registered connection until either side ends it.
///
/// When the client goes away, or the writer gives up on a stalled
/// transport, the writer is aborted and the connection is unregistered.
/// When the hub closes the connection first, the writer is allowed to
/// flush whatever was queued before closure, bounded by
/// `close_flush_timeout_ms`.
pub async fn run_session<S, R, E>(
    hub: Hub,
    subscriber: Subscriber,
    sink: S,
    stream: R,
    recorder: Arc<dyn PingRecorder>,
) -> ReadOutcome
where
    S: Sink<String> + Unpin + Send + 'static,
    S::Error: std::fmt::Display + Send,
    R: Stream<Item = Result<Frame, E>> + Unpin + Send,
    E: std::fmt::Display + Send,
{
    let id = subscriber.id().clone();
    let closed = subscriber.closed_token();
    let write_failed = CancellationToken::new();
    let config = hub.config();
    let mut writer = tokio::spawn(writer::write_loop(
        subscriber,
        sink,
        config.write_timeout(),
        write_failed.clone(),
    ));

    let outcome = reader::read_loop(
        &hub,
        &id,
        stream,
        closed,
        write_failed,
        recorder.as_ref(),
    )
    .await;

    match outcome {
        ReadOutcome::HubClosed => {
            match timeout(config.close_flush_timeout(), &mut writer).await {
                Ok(written) => {
                    let written = written.unwrap_or(0);
                    debug!(conn_id = %id, written, "Writer drained after hub close");
                }
                Err(_) => {
                    writer.abort();
                    warn!(conn_id = %id, "Backlog flush timed out; dropping transport");
                }
            }
        }
        ReadOutcome::ClientClosed | ReadOutcome::TransportError => {
            writer.abort();
            if let Err(e) = hub.unregister(&id) {
                debug!(conn_id = %id, error = %e, "Unregister after disconnect");
            }
        }
    }

    info!(conn_id = %id, outcome = ?outcome, "Session ended");
    outcome
}
