//! # Signal Relay Adapter
//!
//! Binds the router's `SignalRelay` port to `shared_bus::SignalHub`.

use bytes::Bytes;
use dr_02_message_router::{
    SignalConnectRequest, SignalDisconnectRequest, SignalRelay, SignalTarget,
};
use shared_bus::{DisconnectFilter, SignalHub, SignalSubscription};
use shared_types::ConnectionHandle;

/// `SignalRelay` over an owned hub.
#[derive(Debug, Default)]
pub struct HubRelay {
    hub: SignalHub,
}

impl HubRelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// The underlying hub.
    pub fn hub(&self) -> &SignalHub {
        &self.hub
    }
}

impl SignalRelay for HubRelay {
    fn emit(&mut self, origin_app: &str, name: &str, args: &Bytes) -> Vec<SignalTarget> {
        self.hub
            .emit(origin_app, name, args)
            .into_iter()
            .map(|delivery| SignalTarget {
                receiver: delivery.receiver,
                receiver_obj: delivery.receiver_obj,
                slot: delivery.slot,
                args: delivery.args,
            })
            .collect()
    }

    fn connect(&mut self, receiver: ConnectionHandle, request: SignalConnectRequest) -> bool {
        self.hub.connect(SignalSubscription {
            sender_app: request.sender_app,
            sender_obj: request.sender_obj,
            signal: request.signal,
            receiver,
            receiver_obj: request.receiver_obj,
            slot: request.slot,
            volatile: request.volatile,
        })
    }

    fn disconnect(&mut self, receiver: ConnectionHandle, request: SignalDisconnectRequest) -> bool {
        let filter = DisconnectFilter {
            sender_app: request.sender_app,
            sender_obj: request.sender_obj,
            signal: request.signal,
            receiver_obj: request.receiver_obj,
            slot: request.slot,
        };
        self.hub.disconnect(receiver, &filter)
    }

    fn connection_removed(&mut self, handle: ConnectionHandle, app_id: Option<&str>) {
        self.hub.remove_connection(handle, app_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(sender: &str, volatile: bool) -> SignalConnectRequest {
        SignalConnectRequest {
            sender_app: sender.into(),
            sender_obj: "Transport".into(),
            signal: "trackChanged(string)".into(),
            receiver_obj: "Tray".into(),
            slot: "onTrack(string)".into(),
            volatile,
        }
    }

    #[test]
    fn test_connect_emit_disconnect() {
        let mut relay = HubRelay::new();
        let panel = ConnectionHandle::new(2);
        assert!(relay.connect(panel, request("player", false)));
        assert!(!relay.connect(panel, request("player", false)));

        let args = Bytes::from_static(b"x");
        let targets = relay.emit("player-3", "Transport#trackChanged(string)", &args);
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].receiver, panel);
        assert_eq!(targets[0].slot, "onTrack(string)");

        let filter = SignalDisconnectRequest {
            slot: "onTrack(string)".into(),
            ..Default::default()
        };
        assert!(relay.disconnect(panel, filter));
        assert_eq!(relay.hub().subscription_count(), 0);
    }

    #[test]
    fn test_volatile_subscriptions_follow_sender() {
        let mut relay = HubRelay::new();
        relay.connect(ConnectionHandle::new(2), request("player", true));
        relay.connect(ConnectionHandle::new(3), request("player", false));

        relay.connection_removed(ConnectionHandle::new(1), Some("player"));
        assert_eq!(relay.hub().subscription_count(), 1);

        relay.connection_removed(ConnectionHandle::new(3), None);
        assert_eq!(relay.hub().subscription_count(), 0);
    }
}
