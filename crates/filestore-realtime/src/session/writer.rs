//! Outbound half of a session: drains the queue to the transport.

use std::time::Duration;

use futures::{Sink, SinkExt};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::connection::handle::Subscriber;
use crate::update::serializer;

/// Writes every queued update to `sink` as a JSON text frame, in order.
///
/// Ends when the hub closes the queue (after the backlog is written) or
/// when the sink fails or stalls past `write_timeout`. On failure `failed`
/// is cancelled so the read side can end the session. Returns the number
/// of frames written.
pub async fn write_loop<S>(
    mut subscriber: Subscriber,
    mut sink: S,
    write_timeout: Duration,
    failed: CancellationToken,
) -> u64
where
    S: Sink<String> + Unpin,
    S::Error: std::fmt::Display,
{
    let mut written = 0u64;

    while let Some(update) = subscriber.recv().await {
        let text = match serializer::encode(&update) {
            Ok(text) => text,
            Err(e) => {
                warn!(conn_id = %subscriber.id(), error = %e, "Dropping unserializable update");
                continue;
            }
        };

        match timeout(write_timeout, sink.send(text)).await {
            Ok(Ok(())) => written += 1,
            Ok(Err(e)) => {
                debug!(conn_id = %subscriber.id(), error = %e, "Transport write failed");
                failed.cancel();
                return written;
            }
            Err(_) => {
                warn!(conn_id = %subscriber.id(), written, "Transport write timed out");
                failed.cancel();
                return written;
            }
        }
    }

    match timeout(write_timeout, sink.close()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => debug!(conn_id = %subscriber.id(), error = %e, "Transport close failed"),
        Err(_) => debug!(conn_id = %subscriber.id(), "Transport close timed out"),
    }
    debug!(
        conn_id = %subscriber.id(),
        reason = ?subscriber.close_reason(),
        written,
        "Writer finished"
    );
    written
}
