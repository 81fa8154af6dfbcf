//! Runtime for executing turns
//!
//! One turn per request: the runtime owns the conversation log and session
//! state, performs supervisor effects, and enforces the hop budget.

mod executor;

#[cfg(test)]
pub mod testing;

pub use executor::{TurnError, TurnFailure, TurnOutcome, TurnRuntime};
