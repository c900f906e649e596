//! # Connection Lifecycle
//!
//! Accept and teardown. Teardown order is fixed:
//!
//! 1. `ReplyFailed` to every caller still waiting on the closing connection
//! 2. the same for callers owed a delayed reply
//! 3. release the identity and broadcast `applicationRemoved`
//! 4. drop the connection's signal subscriptions
//! 5. forget the connection and purge it from every waiting list

use bytes::Bytes;
use dr_01_wire_protocol::{Envelope, Opcode};
use shared_types::ConnectionHandle;
use tracing::{debug, info, warn};

use super::server_object::APPLICATION_REMOVED;
use super::MessageRouter;
use crate::domain::{CorrelationKey, DisconnectReport, RouterError};
use crate::ports::outbound::{MessageSink, SignalRelay};

impl<S, R> MessageRouter<S, R>
where
    S: MessageSink,
    R: SignalRelay,
{
    pub(crate) fn accept(&mut self, handle: ConnectionHandle) -> Result<(), RouterError> {
        self.state.connections.insert(handle)?;
        debug!(conn = %handle, "[dr-02] Connection accepted");
        Ok(())
    }

    pub(crate) fn teardown(&mut self, handle: ConnectionHandle) -> Option<DisconnectReport> {
        let conn = self.state.connections.find(handle)?;
        let app_id = conn.app_id().map(str::to_string);
        let owed: Vec<ConnectionHandle> = conn
            .waiting_for_reply()
            .iter()
            .chain(conn.waiting_for_delayed_reply())
            .copied()
            .collect();

        for peer in &owed {
            self.abort_call(handle, app_id.as_deref(), *peer);
        }

        let released = match self.state.connections.find_mut(handle) {
            Some(conn) => self.state.identities.unregister(conn),
            None => None,
        };
        if let Some(name) = released {
            self.broadcast_presence(APPLICATION_REMOVED, &name, handle);
        }

        self.signals.connection_removed(handle, app_id.as_deref());
        self.state.connections.remove(handle);
        self.state.connections.purge_peer(handle);

        info!(
            conn = %handle,
            app_id = ?app_id,
            aborted_calls = owed.len(),
            "[dr-02] Connection closed"
        );

        Some(DisconnectReport {
            handle,
            app_id,
            aborted_calls: owed.len(),
        })
    }

    /// Unblock `peer`, which was waiting on the closing connection.
    fn abort_call(
        &mut self,
        closing: ConnectionHandle,
        closing_app: Option<&str>,
        peer: ConnectionHandle,
    ) {
        let peer_app = self
            .state
            .connections
            .find(peer)
            .and_then(|conn| conn.app_id())
            .unwrap_or_default()
            .to_string();

        warn!(
            from = closing_app.unwrap_or("<anonymous>"),
            to = %peer_app,
            conn = %closing,
            peer = %peer,
            "[dr-02] Aborting call, peer closed before replying"
        );

        self.sink.deliver(
            peer,
            Envelope::new(
                Opcode::ReplyFailed,
                CorrelationKey::SyntheticFailure.wire_value(),
                closing_app.unwrap_or_default(),
                peer_app,
                Bytes::new(),
            ),
        );
    }
}
