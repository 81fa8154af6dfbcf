//! Supervisor routing state machine
//!
//! Implements the Elm Architecture pattern with pure state transitions:
//! the supervisor decides, the runtime performs the effects.

mod effect;
pub mod event;
pub mod flow;
mod route;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::Effect;
pub use event::Event;
pub use flow::{ActiveFlow, FlowDefinition, FlowId};
pub use route::{ResponderName, RoutingError, Target, FINISH_LABEL};
pub use state::{RequestContext, SessionState};
pub use transition::{transition, SupervisorError, TransitionResult};
