//! Effects produced by supervisor transitions

use super::route::ResponderName;
use crate::conversation::Turn;

/// Work for the runtime to carry out after a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Ask the classification capability for the next label
    Classify,

    /// Run a responder against the current log and state
    Invoke { responder: ResponderName },

    /// Append a turn to the conversation log
    AppendTurn { turn: Turn },

    /// Hand control back to the supervisor
    ReturnToSupervisor,

    /// End the turn; the output is the last turn in the log
    Finish,
}

impl Effect {
    pub fn invoke(responder: ResponderName) -> Self {
        Effect::Invoke { responder }
    }

    pub fn append(turn: Turn) -> Self {
        Effect::AppendTurn { turn }
    }
}
