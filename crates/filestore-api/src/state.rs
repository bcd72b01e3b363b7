//! Application state shared across all handlers and middleware.

use std::sync::Arc;
use std::time::Instant;

use filestore_core::config::AppConfig;
use filestore_realtime::Hub;
use filestore_realtime::session::{PingRecorder, TracingPingRecorder};

/// Shared application state. Cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    /// Full application configuration.
    pub config: Arc<AppConfig>,
    /// Real-time update hub.
    pub hub: Hub,
    /// Sink for client keepalive pings.
    pub ping_recorder: Arc<dyn PingRecorder>,
    /// Process start, for uptime reporting.
    pub started_at: Instant,
}

impl AppState {
    /// Builds state around an already-started hub, recording pings to the
    /// log only.
    pub fn new(config: AppConfig, hub: Hub) -> Self {
        Self::with_ping_recorder(config, hub, Arc::new(TracingPingRecorder))
    }

    /// Builds state with a custom ping recorder.
    pub fn with_ping_recorder(
        config: AppConfig,
        hub: Hub,
        ping_recorder: Arc<dyn PingRecorder>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            hub,
            ping_recorder,
            started_at: Instant::now(),
        }
    }
}
