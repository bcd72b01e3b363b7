//! Ping bookkeeping seam.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;

use filestore_core::AppResult;

use crate::connection::handle::ConnectionId;

/// Records client keepalive pings, e.g. into the metadata database.
#[async_trait]
pub trait PingRecorder: Send + Sync {
    /// Record that `id` pinged at `at`.
    async fn record_ping(&self, id: &ConnectionId, at: DateTime<Utc>) -> AppResult<()>;
}

/// Recorder that only emits a trace event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingPingRecorder;

#[async_trait]
impl PingRecorder for TracingPingRecorder {
    async fn record_ping(&self, id: &ConnectionId, at: DateTime<Utc>) -> AppResult<()> {
        debug!(conn_id = %id, at = %at, "Client ping");
        Ok(())
    }
}
