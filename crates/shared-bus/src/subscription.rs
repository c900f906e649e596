//! # Subscriptions
//!
//! Records of which receiver slot listens to which sender signal.

use bytes::Bytes;
use shared_types::{plain_app_id, ConnectionHandle};

/// One connected slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalSubscription {
    /// Sender application; empty matches any sender.
    pub sender_app: String,
    /// Sender object; empty matches any object.
    pub sender_obj: String,
    /// Signal name.
    pub signal: String,
    /// Connection owning the slot.
    pub receiver: ConnectionHandle,
    /// Object inside the receiver.
    pub receiver_obj: String,
    /// Slot invoked on delivery.
    pub slot: String,
    /// Dropped when the sender application goes away.
    pub volatile: bool,
}

impl SignalSubscription {
    /// True when an emission by `origin_app` of `sender_obj#signal` reaches this slot.
    ///
    /// A sender name without `-` also matches suffixed instances of it.
    #[must_use]
    pub fn matches(&self, origin_app: &str, sender_obj: &str, signal: &str) -> bool {
        if self.signal != signal {
            return false;
        }
        if !self.sender_obj.is_empty() && self.sender_obj != sender_obj {
            return false;
        }
        self.sender_app.is_empty()
            || self.sender_app == origin_app
            || (!self.sender_app.contains('-') && self.sender_app == plain_app_id(origin_app))
    }

    /// True when this subscription is identical apart from the volatile flag.
    #[must_use]
    pub fn same_target(&self, other: &Self) -> bool {
        self.sender_app == other.sender_app
            && self.sender_obj == other.sender_obj
            && self.signal == other.signal
            && self.receiver == other.receiver
            && self.receiver_obj == other.receiver_obj
            && self.slot == other.slot
    }
}

/// Selector for `disconnectSignal`; empty fields are wildcards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisconnectFilter {
    pub sender_app: String,
    pub sender_obj: String,
    pub signal: String,
    pub receiver_obj: String,
    pub slot: String,
}

impl DisconnectFilter {
    /// True when `sub` is selected.
    #[must_use]
    pub fn selects(&self, sub: &SignalSubscription) -> bool {
        fn field(filter: &str, value: &str) -> bool {
            filter.is_empty() || filter == value
        }

        field(&self.sender_app, &sub.sender_app)
            && field(&self.sender_obj, &sub.sender_obj)
            && field(&self.signal, &sub.signal)
            && field(&self.receiver_obj, &sub.receiver_obj)
            && field(&self.slot, &sub.slot)
    }
}

/// One slot invocation produced by an emission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalDelivery {
    /// Connection owning the slot.
    pub receiver: ConnectionHandle,
    /// Object inside the receiver.
    pub receiver_obj: String,
    /// Slot to invoke.
    pub slot: String,
    /// Marshaled signal arguments, passed through untouched.
    pub args: Bytes,
}
