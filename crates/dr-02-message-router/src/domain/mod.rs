//! # Domain Layer
//!
//! Pure routing bookkeeping: which connections exist, which names they hold,
//! who is waiting on whom, and how correlation keys are handed out.

pub mod connection_table;
pub mod correlation;
pub mod errors;
pub mod identity_registry;
pub mod outcome;

pub use connection_table::{Connection, ConnectionTable};
pub use correlation::{CorrelationKey, KeyCounter, KEY_COUNTER_SEED, SYNTHETIC_FAILURE_KEY};
pub use errors::RouterError;
pub use identity_registry::{IdentityRegistry, Registered};
pub use outcome::{DisconnectReport, DropReason, RouteOutcome};
