//! Events that drive the supervisor

use super::route::ResponderName;

/// Inputs to the supervisor state machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Control returned to the supervisor (turn start, or after a responder)
    Invoked,

    /// The classifier answered; the label is validated by the transition
    Classified { label: String },

    /// A responder produced its fragment
    ResponderCompleted {
        responder: ResponderName,
        fragment: String,
    },
}
