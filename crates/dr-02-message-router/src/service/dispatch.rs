//! # Opcode Dispatch
//!
//! Send, call and reply routing. Forwarded envelopes are passed on untouched,
//! including their key and body bytes.

use bytes::Bytes;
use dr_01_wire_protocol::{Envelope, Opcode};
use shared_types::{ConnectionHandle, MulticastPattern, SERVER_APP_ID};
use tracing::{debug, warn};

use super::MessageRouter;
use crate::domain::{DropReason, RouteOutcome, RouterError};
use crate::ports::outbound::{MessageSink, SignalRelay};

impl<S, R> MessageRouter<S, R>
where
    S: MessageSink,
    R: SignalRelay,
{
    /// Send and ReplyDelayed: fire-and-forget.
    pub(crate) fn route_send(&mut self, from: ConnectionHandle, envelope: Envelope) -> RouteOutcome {
        let prefix = MulticastPattern::parse(&envelope.to_app).map(|p| p.prefix().to_owned());
        if let Some(prefix) = prefix {
            return self.multicast(&prefix, envelope);
        }

        if let Some(target) = self.state.identities.find(&envelope.to_app) {
            if envelope.opcode == Opcode::ReplyDelayed {
                let settled = self
                    .state
                    .connections
                    .find_mut(from)
                    .is_some_and(|conn| conn.take_delayed(target));
                if !settled {
                    warn!(
                        conn = %from,
                        to = %envelope.to_app,
                        "[dr-02] ReplyDelayed for a call that was never deferred"
                    );
                    return RouteOutcome::Dropped(DropReason::NotDelayed);
                }
            }
            self.sink.deliver(target, envelope);
            return RouteOutcome::Forwarded(target);
        }

        if envelope.opcode == Opcode::Send && envelope.to_app == SERVER_APP_ID {
            let result = envelope
                .call_body()
                .map_err(RouterError::from)
                .and_then(|body| self.service_call(from, &envelope.from_app, body));
            return match result {
                Ok(_) => RouteOutcome::Serviced,
                Err(error) => {
                    warn!(conn = %from, %error, "[dr-02] Server send failed");
                    RouteOutcome::ServiceFailed
                }
            };
        }

        debug!(
            conn = %from,
            opcode = %envelope.opcode,
            to = %envelope.to_app,
            "[dr-02] Dropping envelope for unknown target"
        );
        RouteOutcome::Dropped(DropReason::UnknownTarget)
    }

    fn multicast(&mut self, prefix: &str, envelope: Envelope) -> RouteOutcome {
        let pattern = MulticastPattern::from_prefix(prefix);
        let targets: Vec<ConnectionHandle> = self
            .state
            .identities
            .iter()
            .filter(|(name, _)| pattern.matches(name))
            .map(|(_, handle)| handle)
            .collect();

        let envelope = envelope.with_opcode(Opcode::Send);
        for target in &targets {
            self.sink.deliver(*target, envelope.clone());
        }

        debug!(
            prefix = pattern.prefix(),
            receivers = targets.len(),
            "[dr-02] Multicast delivered"
        );
        RouteOutcome::Multicast(targets.len())
    }

    /// Call and Find: the target owes the caller one reply.
    pub(crate) fn route_call(&mut self, from: ConnectionHandle, envelope: Envelope) -> RouteOutcome {
        if let Some(target) = self.state.identities.find(&envelope.to_app) {
            if let Some(callee) = self.state.connections.find_mut(target) {
                callee.push_waiting(from);
            }
            self.sink.deliver(target, envelope);
            return RouteOutcome::Forwarded(target);
        }

        if envelope.to_app != SERVER_APP_ID {
            debug!(
                conn = %from,
                opcode = %envelope.opcode,
                to = %envelope.to_app,
                "[dr-02] Call to unknown target, caller gets no reply"
            );
            return RouteOutcome::Dropped(DropReason::UnknownTarget);
        }

        if envelope.opcode == Opcode::Find {
            return RouteOutcome::Dropped(DropReason::ServerFind);
        }

        let key = self.state.keys.resolve(envelope.key);
        let result = envelope
            .call_body()
            .map_err(RouterError::from)
            .and_then(|body| self.service_call(from, &envelope.from_app, body));

        let (reply, outcome) = match result {
            Ok(value) => (
                Envelope::new(
                    Opcode::Reply,
                    key.wire_value(),
                    SERVER_APP_ID,
                    envelope.from_app,
                    value.into_reply_body().encode(),
                ),
                RouteOutcome::Serviced,
            ),
            Err(error) => {
                warn!(conn = %from, %error, "[dr-02] Server call failed");
                (
                    Envelope::new(
                        Opcode::ReplyFailed,
                        key.wire_value(),
                        SERVER_APP_ID,
                        envelope.from_app,
                        Bytes::new(),
                    ),
                    RouteOutcome::ServiceFailed,
                )
            }
        };
        self.sink.deliver(from, reply);
        outcome
    }

    /// Reply, ReplyFailed and ReplyWait: settle the waiter, then forward.
    pub(crate) fn route_reply(&mut self, from: ConnectionHandle, envelope: Envelope) -> RouteOutcome {
        let Some(caller) = self.state.identities.find(&envelope.to_app) else {
            warn!(
                conn = %from,
                opcode = %envelope.opcode,
                to = %envelope.to_app,
                "[dr-02] Reply to unknown application"
            );
            return RouteOutcome::Dropped(DropReason::UnknownTarget);
        };

        let Some(replier) = self.state.connections.find_mut(from) else {
            return RouteOutcome::Dropped(DropReason::UnknownSender);
        };

        let settled = match envelope.opcode {
            Opcode::ReplyWait => replier.defer(caller),
            Opcode::ReplyFailed => replier.take_waiting(caller) || replier.take_delayed(caller),
            _ => replier.take_waiting(caller),
        };
        if !settled {
            warn!(
                conn = %from,
                from_app = replier.display_name(),
                opcode = %envelope.opcode,
                to = %envelope.to_app,
                "[dr-02] Reply from a connection that owed none"
            );
            return RouteOutcome::Dropped(DropReason::NotWaiting);
        }

        self.sink.deliver(caller, envelope);
        RouteOutcome::Forwarded(caller)
    }
}
