//! # Built-in Server Object
//!
//! Functions the router answers itself when an envelope addresses the
//! server identity.
//!
//! | Function | Arguments | Returns |
//! |----------|-----------|---------|
//! | `registerAs` | name | assigned name |
//! | `registeredApplications` | | all names |
//! | `isApplicationRegistered` | name | bool |
//! | `setNotifications` | enable | void |
//! | `connectSignal` | sender, senderObj, signal, receiverObj, slot, volatile | bool |
//! | `disconnectSignal` | sender, senderObj, signal, receiverObj, slot | bool |
//!
//! The pseudo-object `emit` relays its function name as a signal.

use dr_01_wire_protocol::{ArgReader, ArgWriter, CallBody, Envelope, Opcode, ReturnValue};
use shared_types::{
    is_reserved_app_id, plain_app_id, ConnectionHandle, MulticastPattern, SERVER_APP_ID,
};
use tracing::{debug, info};

use super::MessageRouter;
use crate::domain::RouterError;
use crate::ports::outbound::{
    MessageSink, SignalConnectRequest, SignalDisconnectRequest, SignalRelay,
};

/// Object name that turns a call into a signal emission.
pub const EMIT_OBJECT: &str = "emit";

/// Presence notification sent after a successful registration.
pub const APPLICATION_REGISTERED: &str = "applicationRegistered";

/// Presence notification sent when a name is released.
pub const APPLICATION_REMOVED: &str = "applicationRemoved";

impl<S, R> MessageRouter<S, R>
where
    S: MessageSink,
    R: SignalRelay,
{
    pub(crate) fn service_call(
        &mut self,
        from: ConnectionHandle,
        from_app: &str,
        call: CallBody,
    ) -> Result<ReturnValue, RouterError> {
        if call.object == EMIT_OBJECT {
            self.emit_signal(from, from_app, &call);
            return Ok(ReturnValue::Void);
        }

        let function = call.function_name();
        let mut args = ArgReader::new(call.args.clone());
        let bad_args = |source| RouterError::BadArguments {
            function: function.to_string(),
            source,
        };

        match function {
            "registerAs" => {
                let name = args.string().map_err(bad_args)?;
                self.register_as(from, &name).map(ReturnValue::String)
            }
            "registeredApplications" => {
                Ok(ReturnValue::StringList(self.state.identities.all_names()))
            }
            "isApplicationRegistered" => {
                let name = args.string().map_err(bad_args)?;
                Ok(ReturnValue::Bool(self.state.identities.find(&name).is_some()))
            }
            "setNotifications" => {
                let enable = args.boolean().map_err(bad_args)?;
                let conn = self
                    .state
                    .connections
                    .find_mut(from)
                    .ok_or(RouterError::UnknownConnection(from))?;
                conn.set_notify(enable);
                debug!(conn = %from, enable, "[dr-02] Presence notifications toggled");
                Ok(ReturnValue::Void)
            }
            "connectSignal" => {
                let request = SignalConnectRequest {
                    sender_app: args.string().map_err(bad_args)?,
                    sender_obj: args.string().map_err(bad_args)?,
                    signal: args.string().map_err(bad_args)?,
                    receiver_obj: args.string().map_err(bad_args)?,
                    slot: args.string().map_err(bad_args)?,
                    volatile: args.boolean().map_err(bad_args)?,
                };
                Ok(ReturnValue::Bool(self.signals.connect(from, request)))
            }
            "disconnectSignal" => {
                let request = SignalDisconnectRequest {
                    sender_app: args.string().map_err(bad_args)?,
                    sender_obj: args.string().map_err(bad_args)?,
                    signal: args.string().map_err(bad_args)?,
                    receiver_obj: args.string().map_err(bad_args)?,
                    slot: args.string().map_err(bad_args)?,
                };
                Ok(ReturnValue::Bool(self.signals.disconnect(from, request)))
            }
            other => Err(RouterError::UnknownFunction(other.to_string())),
        }
    }

    fn register_as(&mut self, from: ConnectionHandle, name: &str) -> Result<String, RouterError> {
        if name.is_empty()
            || plain_app_id(name).is_empty()
            || is_reserved_app_id(name)
            || MulticastPattern::parse(name).is_some()
        {
            return Err(RouterError::InvalidName(name.to_string()));
        }

        let conn = self
            .state
            .connections
            .find_mut(from)
            .ok_or(RouterError::UnknownConnection(from))?;
        let registered = self.state.identities.register(conn, name);

        info!(
            conn = %from,
            app_id = %registered.assigned,
            previous = ?registered.previous,
            "[dr-02] Application registered"
        );

        if let Some(previous) = &registered.previous {
            self.broadcast_presence(APPLICATION_REMOVED, previous, from);
        }
        self.broadcast_presence(APPLICATION_REGISTERED, &registered.assigned, from);

        Ok(registered.assigned)
    }

    /// Fan out `call.function` to connected slots.
    fn emit_signal(&mut self, from: ConnectionHandle, from_app: &str, call: &CallBody) {
        let origin = self
            .state
            .connections
            .find(from)
            .and_then(|conn| conn.app_id())
            .unwrap_or(from_app)
            .to_string();

        let targets = self.signals.emit(&origin, &call.function, &call.args);
        debug!(
            origin = %origin,
            signal = %call.function,
            receivers = targets.len(),
            "[dr-02] Signal emitted"
        );

        for target in targets {
            let receiver_app = self
                .state
                .connections
                .find(target.receiver)
                .and_then(|conn| conn.app_id())
                .unwrap_or_default()
                .to_string();
            let body = CallBody::new(target.receiver_obj, target.slot, target.args).encode();
            self.sink.deliver(
                target.receiver,
                Envelope::new(Opcode::Send, 0, origin.as_str(), receiver_app, body),
            );
        }
    }

    /// Tell every connection with notifications enabled, except `except`.
    pub(crate) fn broadcast_presence(
        &mut self,
        function: &str,
        app_id: &str,
        except: ConnectionHandle,
    ) {
        let args = ArgWriter::new().string(app_id).finish();
        let body = CallBody::new("", function, args).encode();

        for conn in self.state.connections.iter() {
            if !conn.notify() || conn.handle() == except {
                continue;
            }
            self.sink.deliver(
                conn.handle(),
                Envelope::new(
                    Opcode::Send,
                    0,
                    SERVER_APP_ID,
                    conn.app_id().unwrap_or_default(),
                    body.clone(),
                ),
            );
        }
    }
}
