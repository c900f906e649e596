//! # Adapters
//!
//! Implementations of the router's outbound ports.
//!
//! - `outbound` - `ConnectionWriters`: envelopes to per-connection writer tasks
//! - `signal_bus` - `HubRelay`: the signal relay over `shared_bus::SignalHub`

pub mod outbound;
pub mod signal_bus;

pub use outbound::ConnectionWriters;
pub use signal_bus::HubRelay;
