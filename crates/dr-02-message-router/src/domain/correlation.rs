//! # Correlation Keys
//!
//! A caller may leave `key = 0` and let the router pick one; any other value
//! is echoed back untouched. Key `1` is reserved for replies the router
//! synthesizes when a peer dies, so the counter never hands out `0` or `1`.

/// Key on every peer-death `ReplyFailed`.
pub const SYNTHETIC_FAILURE_KEY: u32 = 1;

/// First key the counter hands out.
pub const KEY_COUNTER_SEED: u32 = 42;

/// Key carried by a reply the router produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorrelationKey {
    /// Drawn from the counter because the caller sent `0`.
    Assigned(u32),
    /// The caller's own non-zero key.
    Echoed(u32),
    /// Peer-death failure.
    SyntheticFailure,
}

impl CorrelationKey {
    /// Value written into the frame header.
    #[must_use]
    pub const fn wire_value(self) -> u32 {
        match self {
            Self::Assigned(key) | Self::Echoed(key) => key,
            Self::SyntheticFailure => SYNTHETIC_FAILURE_KEY,
        }
    }
}

/// Monotonic reply-key counter.
#[derive(Debug, Clone)]
pub struct KeyCounter {
    next: u32,
}

impl Default for KeyCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyCounter {
    /// Counter starting at [`KEY_COUNTER_SEED`].
    #[must_use]
    pub const fn new() -> Self {
        Self {
            next: KEY_COUNTER_SEED,
        }
    }

    #[cfg(test)]
    pub(crate) const fn starting_at(next: u32) -> Self {
        Self { next }
    }

    /// Hand out the next key.
    pub fn next_key(&mut self) -> u32 {
        while self.next <= SYNTHETIC_FAILURE_KEY {
            self.next = self.next.wrapping_add(1);
        }
        let key = self.next;
        self.next = self.next.wrapping_add(1);
        key
    }

    /// Key for a reply to a call that carried `requested`.
    pub fn resolve(&mut self, requested: u32) -> CorrelationKey {
        if requested == 0 {
            CorrelationKey::Assigned(self.next_key())
        } else {
            CorrelationKey::Echoed(requested)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_starts_at_seed() {
        let mut keys = KeyCounter::new();
        assert_eq!(keys.next_key(), KEY_COUNTER_SEED);
        assert_eq!(keys.next_key(), KEY_COUNTER_SEED + 1);
    }

    #[test]
    fn test_counter_skips_reserved_on_wrap() {
        let mut keys = KeyCounter::starting_at(u32::MAX);
        assert_eq!(keys.next_key(), u32::MAX);
        assert_eq!(keys.next_key(), 2);
        assert_eq!(keys.next_key(), 3);
    }

    #[test]
    fn test_resolve_echoes_nonzero() {
        let mut keys = KeyCounter::new();
        assert_eq!(keys.resolve(7), CorrelationKey::Echoed(7));
        assert_eq!(keys.resolve(0), CorrelationKey::Assigned(KEY_COUNTER_SEED));
        // Echoing does not consume the counter
        assert_eq!(keys.resolve(0).wire_value(), KEY_COUNTER_SEED + 1);
    }

    #[test]
    fn test_synthetic_failure_wire_value() {
        assert_eq!(CorrelationKey::SyntheticFailure.wire_value(), 1);
    }
}
