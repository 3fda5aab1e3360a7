//! Shared state and change signalling between docks and overlays
//!
//! The state lives in a store (see [`crate::storage`]); this module holds the
//! state type itself and the signal that tells other contexts to re-read it.

pub mod state;
pub mod messages;
pub mod signal;

pub use state::State;
pub use messages::{ChangeEvent, ContextId};
pub use signal::{ChangeSignal, SignalHub, Subscription};
