//! # Signal Hub
//!
//! Owns every signal subscription. Lives inside the router task, so it is
//! accessed through `&mut self` without locking.

use std::collections::HashMap;

use bytes::Bytes;
use shared_types::ConnectionHandle;
use tracing::{debug, warn};

use crate::split_signal_name;
use crate::subscription::{DisconnectFilter, SignalDelivery, SignalSubscription};

/// Subscriptions indexed by signal name.
#[derive(Debug, Default)]
pub struct SignalHub {
    /// Signal name → subscriptions in connect order.
    by_signal: HashMap<String, Vec<SignalSubscription>>,

    /// Total emissions seen.
    signals_emitted: u64,
}

impl SignalHub {
    /// Empty hub.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Connect a slot to a signal.
    ///
    /// Returns `false` for an incomplete subscription or an exact duplicate.
    pub fn connect(&mut self, subscription: SignalSubscription) -> bool {
        if subscription.signal.is_empty()
            || subscription.receiver_obj.is_empty()
            || subscription.slot.is_empty()
        {
            warn!(
                receiver = %subscription.receiver,
                signal = %subscription.signal,
                slot = %subscription.slot,
                "Rejected incomplete signal connection"
            );
            return false;
        }

        let entries = self
            .by_signal
            .entry(subscription.signal.clone())
            .or_default();
        if entries.iter().any(|existing| existing.same_target(&subscription)) {
            debug!(
                receiver = %subscription.receiver,
                signal = %subscription.signal,
                "Signal connection already present"
            );
            return false;
        }

        debug!(
            sender = %subscription.sender_app,
            sender_obj = %subscription.sender_obj,
            signal = %subscription.signal,
            receiver = %subscription.receiver,
            slot = %subscription.slot,
            volatile = subscription.volatile,
            "Signal connected"
        );
        entries.push(subscription);
        true
    }

    /// Remove the receiver's subscriptions selected by `filter`.
    ///
    /// Returns `true` if at least one subscription was removed.
    pub fn disconnect(&mut self, receiver: ConnectionHandle, filter: &DisconnectFilter) -> bool {
        let removed = self.remove_where(|sub| sub.receiver == receiver && filter.selects(sub));
        debug!(receiver = %receiver, removed, "Signal disconnect");
        removed > 0
    }

    /// Fan out an emission of `name` (`"senderObj#signal"`) by `origin_app`.
    pub fn emit(&mut self, origin_app: &str, name: &str, args: &Bytes) -> Vec<SignalDelivery> {
        self.signals_emitted += 1;
        let (sender_obj, signal) = split_signal_name(name);

        let deliveries: Vec<SignalDelivery> = self
            .by_signal
            .get(signal)
            .into_iter()
            .flatten()
            .filter(|sub| sub.matches(origin_app, sender_obj, signal))
            .map(|sub| SignalDelivery {
                receiver: sub.receiver,
                receiver_obj: sub.receiver_obj.clone(),
                slot: sub.slot.clone(),
                args: args.clone(),
            })
            .collect();

        debug!(
            origin = origin_app,
            signal = name,
            receivers = deliveries.len(),
            "Signal emitted"
        );
        deliveries
    }

    /// Forget a closed connection.
    ///
    /// Drops every subscription it owns, and every volatile subscription
    /// listening to `app_id`. Returns the number removed.
    pub fn remove_connection(&mut self, handle: ConnectionHandle, app_id: Option<&str>) -> usize {
        let removed = self.remove_where(|sub| {
            sub.receiver == handle
                || (sub.volatile && app_id.is_some_and(|app| sub.sender_app == app))
        });
        if removed > 0 {
            debug!(connection = %handle, removed, "Dropped signal connections");
        }
        removed
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.by_signal.values().map(Vec::len).sum()
    }

    /// Total emissions seen.
    #[must_use]
    pub fn signals_emitted(&self) -> u64 {
        self.signals_emitted
    }

    fn remove_where<F>(&mut self, mut predicate: F) -> usize
    where
        F: FnMut(&SignalSubscription) -> bool,
    {
        let mut removed = 0;
        self.by_signal.retain(|_, entries| {
            let before = entries.len();
            entries.retain(|sub| !predicate(sub));
            removed += before - entries.len();
            !entries.is_empty()
        });
        removed
    }
}
