//! Token-gated dispatch pipeline.
//!
//! `Idle -> CheckingFreshness -> (Refreshing)? -> Submitting -> terminal`,
//! one pass per trigger, serialized by an in-flight gate.

mod dispatcher;
mod state;

pub use dispatcher::{DispatchOutcome, GatePolicy, TokenGatedDispatcher};
pub use state::{DispatchState, StateTracker};
