//! # Connection Table
//!
//! Per-connection routing state keyed by transport handle. Entries exist from
//! accept to close; nothing here blocks.

use std::collections::BTreeMap;

use shared_types::{plain_app_id, ConnectionHandle};

use super::errors::RouterError;

/// Routing state of one live transport session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    handle: ConnectionHandle,
    /// Set by the identity registry only.
    pub(crate) app_id: Option<String>,
    notify: bool,
    /// Callers blocked on a reply from this connection, one entry per call.
    waiting_for_reply: Vec<ConnectionHandle>,
    /// Callers this connection answered with `ReplyWait` and still owes.
    waiting_for_delayed_reply: Vec<ConnectionHandle>,
}

impl Connection {
    fn new(handle: ConnectionHandle) -> Self {
        Self {
            handle,
            app_id: None,
            notify: false,
            waiting_for_reply: Vec::new(),
            waiting_for_delayed_reply: Vec::new(),
        }
    }

    /// Transport handle.
    #[must_use]
    pub fn handle(&self) -> ConnectionHandle {
        self.handle
    }

    /// Registered identity.
    #[must_use]
    pub fn app_id(&self) -> Option<&str> {
        self.app_id.as_deref()
    }

    /// Registered identity truncated at its first `-`.
    #[must_use]
    pub fn plain_app_id(&self) -> Option<&str> {
        self.app_id.as_deref().map(plain_app_id)
    }

    /// Identity for log lines.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.app_id.as_deref().unwrap_or("<anonymous>")
    }

    /// Whether presence changes are broadcast to this connection.
    #[must_use]
    pub fn notify(&self) -> bool {
        self.notify
    }

    /// Enable or disable presence broadcasts.
    pub fn set_notify(&mut self, enable: bool) {
        self.notify = enable;
    }

    /// Callers blocked on this connection.
    #[must_use]
    pub fn waiting_for_reply(&self) -> &[ConnectionHandle] {
        &self.waiting_for_reply
    }

    /// Callers owed a delayed reply.
    #[must_use]
    pub fn waiting_for_delayed_reply(&self) -> &[ConnectionHandle] {
        &self.waiting_for_delayed_reply
    }

    /// Record one outstanding call from `caller`.
    pub fn push_waiting(&mut self, caller: ConnectionHandle) {
        self.waiting_for_reply.push(caller);
    }

    /// Resolve one outstanding call from `caller`.
    pub fn take_waiting(&mut self, caller: ConnectionHandle) -> bool {
        remove_first(&mut self.waiting_for_reply, caller)
    }

    /// Move one outstanding call from `caller` to the delayed list.
    pub fn defer(&mut self, caller: ConnectionHandle) -> bool {
        if !self.take_waiting(caller) {
            return false;
        }
        self.waiting_for_delayed_reply.push(caller);
        true
    }

    /// Resolve one delayed call from `caller`.
    pub fn take_delayed(&mut self, caller: ConnectionHandle) -> bool {
        remove_first(&mut self.waiting_for_delayed_reply, caller)
    }

    fn forget_peer(&mut self, peer: ConnectionHandle) {
        self.waiting_for_reply.retain(|h| *h != peer);
        self.waiting_for_delayed_reply.retain(|h| *h != peer);
    }
}

fn remove_first(list: &mut Vec<ConnectionHandle>, handle: ConnectionHandle) -> bool {
    match list.iter().position(|h| *h == handle) {
        Some(index) => {
            list.remove(index);
            true
        }
        None => false,
    }
}

/// All live connections, iterated in handle order.
#[derive(Debug, Default)]
pub struct ConnectionTable {
    connections: BTreeMap<ConnectionHandle, Connection>,
}

impl ConnectionTable {
    /// Empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a freshly accepted connection.
    pub fn insert(&mut self, handle: ConnectionHandle) -> Result<&mut Connection, RouterError> {
        if self.connections.contains_key(&handle) {
            return Err(RouterError::DuplicateConnection(handle));
        }
        Ok(self
            .connections
            .entry(handle)
            .or_insert_with(|| Connection::new(handle)))
    }

    /// Look up a connection.
    #[must_use]
    pub fn find(&self, handle: ConnectionHandle) -> Option<&Connection> {
        self.connections.get(&handle)
    }

    /// Look up a connection for mutation.
    pub fn find_mut(&mut self, handle: ConnectionHandle) -> Option<&mut Connection> {
        self.connections.get_mut(&handle)
    }

    /// Drop a closed connection.
    pub fn remove(&mut self, handle: ConnectionHandle) -> Option<Connection> {
        self.connections.remove(&handle)
    }

    /// Erase `peer` from every waiting list.
    pub fn purge_peer(&mut self, peer: ConnectionHandle) {
        for connection in self.connections.values_mut() {
            connection.forget_peer(peer);
        }
    }

    /// Check whether a handle is live.
    #[must_use]
    pub fn contains(&self, handle: ConnectionHandle) -> bool {
        self.connections.contains_key(&handle)
    }

    /// Live connections in handle order.
    pub fn iter(&self) -> impl Iterator<Item = &Connection> {
        self.connections.values()
    }

    /// Number of live connections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// True when no connection is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
