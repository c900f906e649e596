//! # Shared Bus - Signal Relay
//!
//! One-to-many notifications between registered applications. A receiver
//! connects one of its slots to a signal of some sender; when the sender
//! emits that signal the relay fans it out to every connected slot.
//!
//! ## Flow
//!
//! ```text
//! ┌──────────────┐                    ┌──────────────┐
//! │  Receiver    │  connectSignal()   │              │
//! │              │ ─────────────────→ │  SignalHub   │
//! └──────────────┘                    │              │
//!        ↑                            └──────────────┘
//!        │  Send(receiverObj, slot, args)     ↑
//!        └──────────── router ←───── emit("obj#signal", args)
//!                                        from sender
//! ```
//!
//! The hub only keeps bookkeeping and computes deliveries; the router turns
//! each [`SignalDelivery`] into an envelope and writes it.

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod hub;
pub mod subscription;

pub use hub::SignalHub;
pub use subscription::{DisconnectFilter, SignalDelivery, SignalSubscription};

/// Separator between sender object and signal name in an emitted name.
pub const SIGNAL_SEPARATOR: char = '#';

/// Split an emitted name into `(sender_obj, signal)`.
///
/// A name without separator is an object-less signal.
#[must_use]
pub fn split_signal_name(name: &str) -> (&str, &str) {
    match name.split_once(SIGNAL_SEPARATOR) {
        Some((object, signal)) => (object, signal),
        None => ("", name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_signal_name() {
        assert_eq!(
            split_signal_name("Transport#trackChanged(string)"),
            ("Transport", "trackChanged(string)")
        );
        assert_eq!(split_signal_name("quit()"), ("", "quit()"));
        assert_eq!(split_signal_name("#x"), ("", "x"));
    }
}
