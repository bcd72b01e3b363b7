//! Real-time update hub configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Real-time (WebSocket) hub configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// Capacity of each connection's outbound queue. A subscriber whose
    /// queue fills up is evicted.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Pending control-loop commands above which a warning is logged.
    #[serde(default = "default_command_backlog_warn")]
    pub command_backlog_warn: usize,
    /// Whether to announce `user_joined` / `user_left` to other subscribers.
    #[serde(default = "default_true")]
    pub announce_presence: bool,
    /// Maximum accepted size of an inbound text frame in bytes.
    #[serde(default = "default_max_inbound_frame")]
    pub max_inbound_frame_bytes: usize,
    /// Longest a single outbound frame may wait on the transport before the
    /// session is treated as dead, in milliseconds.
    #[serde(default = "default_write_timeout_ms")]
    pub write_timeout_ms: u64,
    /// Longest the writer may keep flushing its backlog after the hub has
    /// closed the connection, in milliseconds.
    #[serde(default = "default_close_flush_timeout_ms")]
    pub close_flush_timeout_ms: u64,
}

impl RealtimeConfig {
    /// Per-frame write deadline.
    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    /// Deadline for flushing the backlog of a closed connection.
    pub fn close_flush_timeout(&self) -> Duration {
        Duration::from_millis(self.close_flush_timeout_ms)
    }
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            command_backlog_warn: default_command_backlog_warn(),
            announce_presence: true,
            max_inbound_frame_bytes: default_max_inbound_frame(),
            write_timeout_ms: default_write_timeout_ms(),
            close_flush_timeout_ms: default_close_flush_timeout_ms(),
        }
    }
}

fn default_queue_capacity() -> usize {
    256
}

fn default_command_backlog_warn() -> usize {
    10_000
}

fn default_true() -> bool {
    true
}

fn default_max_inbound_frame() -> usize {
    65_536
}

fn default_write_timeout_ms() -> u64 {
    10_000
}

fn default_close_flush_timeout_ms() -> u64 {
    2_000
}
