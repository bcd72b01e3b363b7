//! Hub metrics.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Hub-level metrics counters.
#[derive(Debug, Default)]
pub struct HubMetrics {
    /// Total connections registered
    pub connections_total: AtomicU64,
    /// Connections currently registered
    pub connections_active: AtomicU64,
    /// Connections evicted because their queue overflowed
    pub connections_evicted: AtomicU64,
    /// Registrations rejected for a duplicate identity
    pub duplicate_rejections: AtomicU64,
    /// Updates accepted by `publish`
    pub updates_published: AtomicU64,
    /// Updates appended to a connection queue
    pub updates_delivered: AtomicU64,
    /// Updates that could not be appended (full or closed queue)
    pub updates_dropped: AtomicU64,
}

impl HubMetrics {
    /// Create new zeroed metrics
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn connection_opened(&self) {
        self.connections_total.fetch_add(1, Ordering::Relaxed);
        self.connections_active.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn connection_closed(&self, evicted: bool) {
        self.connections_active.fetch_sub(1, Ordering::Relaxed);
        if evicted {
            self.connections_evicted.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn duplicate_rejected(&self) {
        self.duplicate_rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn published(&self) {
        self.updates_published.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn delivered(&self, delivered: u64, dropped: u64) {
        self.updates_delivered.fetch_add(delivered, Ordering::Relaxed);
        self.updates_dropped.fetch_add(dropped, Ordering::Relaxed);
    }

    /// Get a snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            connections_total: self.connections_total.load(Ordering::Relaxed),
            connections_active: self.connections_active.load(Ordering::Relaxed),
            connections_evicted: self.connections_evicted.load(Ordering::Relaxed),
            duplicate_rejections: self.duplicate_rejections.load(Ordering::Relaxed),
            updates_published: self.updates_published.load(Ordering::Relaxed),
            updates_delivered: self.updates_delivered.load(Ordering::Relaxed),
            updates_dropped: self.updates_dropped.load(Ordering::Relaxed),
        }
    }
}

/// Serializable metrics snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Total connections ever registered
    pub connections_total: u64,
    /// Currently registered connections
    pub connections_active: u64,
    /// Connections evicted for overflow
    pub connections_evicted: u64,
    /// Duplicate-identity registrations rejected
    pub duplicate_rejections: u64,
    /// Updates accepted by `publish`
    pub updates_published: u64,
    /// Per-connection deliveries
    pub updates_delivered: u64,
    /// Per-connection drops
    pub updates_dropped: u64,
}
