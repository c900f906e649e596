//! # Identity Registry
//!
//! Maps registered application ids to connections.
//!
//! ## Naming
//!
//! ```text
//! registerAs("x")  →  "x"        first claimant
//! registerAs("x")  →  "x-2"      next free suffix
//! registerAs("x")  →  "x-3"
//! ```
//!
//! ## Lookup
//!
//! Exact match first. A name without `-` then falls back to the earliest
//! live registration whose plain id equals it.

use std::collections::HashMap;

use shared_types::{plain_app_id, ConnectionHandle};

use super::connection_table::Connection;

#[derive(Debug, Clone, Copy)]
struct Entry {
    handle: ConnectionHandle,
    /// Registration order, used for stable iteration and fallback lookup.
    seq: u64,
}

/// Result of a registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registered {
    /// Name now held by the connection.
    pub assigned: String,
    /// Name the connection held before, already released.
    pub previous: Option<String>,
}

/// Name → connection map.
#[derive(Debug, Default)]
pub struct IdentityRegistry {
    names: HashMap<String, Entry>,
    next_seq: u64,
}

impl IdentityRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Give `conn` the first free name among `desired`, `desired-2`, `desired-3`, ...
    ///
    /// Any name `conn` already holds is released first, so re-registering
    /// under the same name yields that name again.
    pub fn register(&mut self, conn: &mut Connection, desired: &str) -> Registered {
        let previous = self.unregister(conn);

        let assigned = if self.names.contains_key(desired) {
            (2u64..)
                .map(|n| format!("{desired}-{n}"))
                .find(|candidate| !self.names.contains_key(candidate))
                .unwrap_or_else(|| desired.to_string())
        } else {
            desired.to_string()
        };

        let seq = self.next_seq;
        self.next_seq += 1;
        self.names.insert(
            assigned.clone(),
            Entry {
                handle: conn.handle(),
                seq,
            },
        );
        conn.app_id = Some(assigned.clone());

        Registered { assigned, previous }
    }

    /// Release the name held by `conn`, returning it.
    pub fn unregister(&mut self, conn: &mut Connection) -> Option<String> {
        let name = conn.app_id.take()?;
        match self.names.get(&name) {
            Some(entry) if entry.handle == conn.handle() => {
                self.names.remove(&name);
            }
            _ => {}
        }
        Some(name)
    }

    /// Resolve a target identity.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<ConnectionHandle> {
        if let Some(entry) = self.names.get(name) {
            return Some(entry.handle);
        }
        if name.contains('-') {
            return None;
        }
        self.names
            .iter()
            .filter(|(registered, _)| plain_app_id(registered) == name)
            .min_by_key(|(_, entry)| entry.seq)
            .map(|(_, entry)| entry.handle)
    }

    /// True when `name` is held verbatim.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    /// Registered names and their holders, in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, ConnectionHandle)> {
        let mut entries: Vec<_> = self.names.iter().collect();
        entries.sort_by_key(|(_, entry)| entry.seq);
        entries
            .into_iter()
            .map(|(name, entry)| (name.as_str(), entry.handle))
    }

    /// Snapshot of all names, in registration order.
    #[must_use]
    pub fn all_names(&self) -> Vec<String> {
        self.iter().map(|(name, _)| name.to_string()).collect()
    }

    /// Number of registered names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// True when nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ConnectionTable;
    use proptest::prelude::*;

    fn table_with(n: u64) -> ConnectionTable {
        let mut table = ConnectionTable::new();
        for raw in 1..=n {
            table.insert(ConnectionHandle::new(raw)).unwrap();
        }
        table
    }

    fn register(
        registry: &mut IdentityRegistry,
        table: &mut ConnectionTable,
        raw: u64,
        name: &str,
    ) -> Registered {
        let conn = table.find_mut(ConnectionHandle::new(raw)).unwrap();
        registry.register(conn, name)
    }

    #[test]
    fn test_collisions_get_numeric_suffix() {
        let mut table = table_with(3);
        let mut registry = IdentityRegistry::new();

        assert_eq!(register(&mut registry, &mut table, 1, "x").assigned, "x");
        assert_eq!(register(&mut registry, &mut table, 2, "x").assigned, "x-2");
        assert_eq!(register(&mut registry, &mut table, 3, "x").assigned, "x-3");
        assert_eq!(
            table.find(ConnectionHandle::new(2)).unwrap().plain_app_id(),
            Some("x")
        );
    }

    #[test]
    fn test_reregister_releases_old_name() {
        let mut table = table_with(2);
        let mut registry = IdentityRegistry::new();
        register(&mut registry, &mut table, 1, "x");

        let again = register(&mut registry, &mut table, 1, "y");
        assert_eq!(again.previous.as_deref(), Some("x"));
        assert!(!registry.contains("x"));

        // Freed name is handed out verbatim
        assert_eq!(register(&mut registry, &mut table, 2, "x").assigned, "x");
    }

    #[test]
    fn test_reregister_same_name_is_stable() {
        let mut table = table_with(1);
        let mut registry = IdentityRegistry::new();
        register(&mut registry, &mut table, 1, "x");

        let again = register(&mut registry, &mut table, 1, "x");
        assert_eq!(again.assigned, "x");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_find_exact_before_plain() {
        let mut table = table_with(2);
        let mut registry = IdentityRegistry::new();
        register(&mut registry, &mut table, 1, "x");
        register(&mut registry, &mut table, 2, "x");

        assert_eq!(registry.find("x"), Some(ConnectionHandle::new(1)));
        assert_eq!(registry.find("x-2"), Some(ConnectionHandle::new(2)));
        assert_eq!(registry.find("x-3"), None);
    }

    #[test]
    fn test_find_plain_fallback_earliest_registration() {
        let mut table = table_with(2);
        let mut registry = IdentityRegistry::new();
        register(&mut registry, &mut table, 2, "kate-99");
        register(&mut registry, &mut table, 1, "kate-12");

        assert_eq!(registry.find("kate"), Some(ConnectionHandle::new(2)));
        // Fallback only for names without '-'
        assert_eq!(registry.find("kate-1"), None);
    }

    #[test]
    fn test_unregister() {
        let mut table = table_with(1);
        let mut registry = IdentityRegistry::new();
        register(&mut registry, &mut table, 1, "x");

        let conn = table.find_mut(ConnectionHandle::new(1)).unwrap();
        assert_eq!(registry.unregister(conn).as_deref(), Some("x"));
        assert!(conn.app_id().is_none());
        assert!(registry.is_empty());
        assert_eq!(registry.unregister(conn), None);
    }

    #[test]
    fn test_all_names_in_registration_order() {
        let mut table = table_with(3);
        let mut registry = IdentityRegistry::new();
        register(&mut registry, &mut table, 3, "c");
        register(&mut registry, &mut table, 1, "a");
        register(&mut registry, &mut table, 2, "b");

        assert_eq!(registry.all_names(), vec!["c", "a", "b"]);
    }

    proptest! {
        #[test]
        fn prop_same_name_yields_suffix_sequence(
            n in 1u64..24,
            base in "[a-z]{1,8}",
        ) {
            let mut table = table_with(n);
            let mut registry = IdentityRegistry::new();

            let assigned: Vec<String> = (1..=n)
                .map(|raw| register(&mut registry, &mut table, raw, &base).assigned)
                .collect();

            for (i, name) in assigned.iter().enumerate() {
                let expected = if i == 0 { base.clone() } else { format!("{base}-{}", i + 1) };
                prop_assert_eq!(name, &expected);
                prop_assert_eq!(registry.find(name), Some(ConnectionHandle::new(i as u64 + 1)));
            }
            prop_assert_eq!(registry.len() as u64, n);
        }
    }
}
