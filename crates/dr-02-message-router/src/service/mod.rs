//! # Message Router Service
//!
//! Owns the [`RouterState`] and implements [`RouterApi`].
//!
//! ## Dispatch
//!
//! ```text
//! Send / ReplyDelayed ──→ multicast │ forward │ server object (no reply)
//! Call / Find         ──→ forward + record waiter │ server object (Reply/ReplyFailed)
//! Reply / ReplyFailed
//!   / ReplyWait       ──→ settle waiter on the replier ──→ forward to caller
//! ```
//!
//! Everything runs synchronously on the caller's thread; outbound envelopes
//! go through the [`MessageSink`] before `route` returns.

mod dispatch;
mod lifecycle;
mod server_object;

pub use server_object::{APPLICATION_REGISTERED, APPLICATION_REMOVED, EMIT_OBJECT};

use dr_01_wire_protocol::{Envelope, Opcode};
use shared_types::ConnectionHandle;
use tracing::warn;

use crate::domain::{
    ConnectionTable, DisconnectReport, DropReason, IdentityRegistry, KeyCounter, RouteOutcome,
    RouterError,
};
use crate::ports::inbound::RouterApi;
use crate::ports::outbound::{MessageSink, SignalRelay};

/// Connection table, identity registry and reply-key counter.
///
/// Created once per router, never shared.
#[derive(Debug, Default)]
pub struct RouterState {
    pub connections: ConnectionTable,
    pub identities: IdentityRegistry,
    pub keys: KeyCounter,
}

impl RouterState {
    /// Fresh state with the counter at its seed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// The message router.
pub struct MessageRouter<S, R>
where
    S: MessageSink,
    R: SignalRelay,
{
    pub(crate) state: RouterState,
    pub(crate) sink: S,
    pub(crate) signals: R,
}

impl<S, R> MessageRouter<S, R>
where
    S: MessageSink,
    R: SignalRelay,
{
    /// Router with empty state.
    pub fn new(sink: S, signals: R) -> Self {
        Self {
            state: RouterState::new(),
            sink,
            signals,
        }
    }

    /// Routing state.
    pub fn state(&self) -> &RouterState {
        &self.state
    }

    /// Outbound sink.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Outbound sink, mutably.
    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Signal relay.
    pub fn signals(&self) -> &R {
        &self.signals
    }

    /// Signal relay, mutably.
    pub fn signals_mut(&mut self) -> &mut R {
        &mut self.signals
    }

    /// Number of live connections.
    pub fn connection_count(&self) -> usize {
        self.state.connections.len()
    }

    /// Number of registered identities.
    pub fn registered_count(&self) -> usize {
        self.state.identities.len()
    }
}

impl<S, R> RouterApi for MessageRouter<S, R>
where
    S: MessageSink,
    R: SignalRelay,
{
    fn connection_accepted(&mut self, handle: ConnectionHandle) -> Result<(), RouterError> {
        self.accept(handle)
    }

    fn route(&mut self, from: ConnectionHandle, envelope: Envelope) -> RouteOutcome {
        if !self.state.connections.contains(from) {
            warn!(conn = %from, opcode = %envelope.opcode, "[dr-02] Envelope from unknown connection");
            return RouteOutcome::Dropped(DropReason::UnknownSender);
        }

        match envelope.opcode {
            Opcode::Send | Opcode::ReplyDelayed => self.route_send(from, envelope),
            Opcode::Call | Opcode::Find => self.route_call(from, envelope),
            Opcode::Reply | Opcode::ReplyFailed | Opcode::ReplyWait => {
                self.route_reply(from, envelope)
            }
        }
    }

    fn disconnect(&mut self, handle: ConnectionHandle) -> Option<DisconnectReport> {
        self.teardown(handle)
    }
}
