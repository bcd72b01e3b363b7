//! Connection registry: the authoritative set of live subscribers.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::error::HubError;

use super::handle::{Connection, ConnectionId, ConnectionInfo};

/// Thread-safe set of registered connections, keyed by identity.
///
/// Mutation (`add`, `remove`, `drain`) is crate-private and only performed
/// by the hub's control loop, so membership changes are serialized with
/// fan-out. Reads are lock-free and may come from any thread.
#[derive(Debug, Default)]
pub struct Registry {
    connections: DashMap<ConnectionId, Arc<Connection>>,
}

impl Registry {
    /// Creates a new empty registry.
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
        }
    }

    /// Inserts a connection. Rejects an identity that is already present.
    pub(crate) fn add(&self, connection: Arc<Connection>) -> Result<(), HubError> {
        match self.connections.entry(connection.id().clone()) {
            Entry::Occupied(entry) => Err(HubError::DuplicateIdentity(entry.key().clone())),
            Entry::Vacant(entry) => {
                entry.insert(connection);
                Ok(())
            }
        }
    }

    /// Removes a connection. Absent identities are not an error, since
    /// unregistration can race with eviction.
    pub(crate) fn remove(&self, id: &ConnectionId) -> Option<Arc<Connection>> {
        self.connections.remove(id).map(|(_, connection)| connection)
    }

    /// Removes and returns every connection.
    pub(crate) fn drain(&self) -> Vec<Arc<Connection>> {
        let ids = self.ids();
        ids.iter().filter_map(|id| self.remove(id)).collect()
    }

    /// Gets a specific connection by identity.
    pub fn get(&self, id: &ConnectionId) -> Option<Arc<Connection>> {
        self.connections.get(id).map(|entry| entry.value().clone())
    }

    /// Copy of the current membership for iteration.
    pub fn snapshot(&self) -> Vec<Arc<Connection>> {
        self.connections
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Whether `id` is registered.
    pub fn contains(&self, id: &ConnectionId) -> bool {
        self.connections.contains_key(id)
    }

    /// All registered identities.
    pub fn ids(&self) -> Vec<ConnectionId> {
        self.connections.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Info snapshots for every registered connection.
    pub fn info(&self) -> Vec<ConnectionInfo> {
        self.connections
            .iter()
            .map(|entry| entry.value().info())
            .collect()
    }

    /// Returns the number of registered connections.
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Returns whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::connection::handle;

    fn connection(id: &str) -> Arc<Connection> {
        let (conn, _sub) = handle::channel(ConnectionId::from(id), 4);
        Arc::new(conn)
    }

    #[test]
    fn test_add_rejects_duplicate() {
        let registry = Registry::new();
        registry.add(connection("a")).expect("first add");
        let err = registry.add(connection("a")).expect_err("duplicate");
        assert!(matches!(err, HubError::DuplicateIdentity(id) if id.as_str() == "a"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let registry = Registry::new();
        assert!(registry.remove(&ConnectionId::from("ghost")).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_membership_matches_register_unregister_sequence() {
        let registry = Registry::new();
        let mut expected = BTreeSet::new();
        let ops: &[(&str, bool)] = &[
            ("a", true),
            ("b", true),
            ("c", true),
            ("b", false),
            ("d", true),
            ("a", false),
            ("a", true),
            ("zz", false),
        ];
        for (id, add) in ops {
            if *add {
                registry.add(connection(id)).expect("unique");
                expected.insert(ConnectionId::from(*id));
            } else {
                registry.remove(&ConnectionId::from(*id));
                expected.remove(&ConnectionId::from(*id));
            }
        }
        let actual: BTreeSet<_> = registry.ids().into_iter().collect();
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_snapshot_is_independent_of_later_removal() {
        let registry = Registry::new();
        registry.add(connection("a")).expect("add");
        registry.add(connection("b")).expect("add");
        let snapshot = registry.snapshot();
        registry.remove(&ConnectionId::from("a"));
        assert_eq!(snapshot.len(), 2);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.drain().len(), 1);
        assert!(registry.is_empty());
    }
}
