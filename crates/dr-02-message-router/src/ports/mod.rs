//! # Ports Layer
//!
//! - `inbound`: what the transport boundary drives (`RouterApi`)
//! - `outbound`: what the router needs from its host (`MessageSink`, `SignalRelay`)

pub mod inbound;
pub mod outbound;

pub use inbound::RouterApi;
pub use outbound::{
    MessageSink, SignalConnectRequest, SignalDisconnectRequest, SignalRelay, SignalTarget,
};
