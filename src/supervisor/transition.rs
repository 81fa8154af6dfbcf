//! Pure supervisor transition function
//!
//! Given the current session state and an event, decide the next state and
//! the effects the runtime must perform. No I/O happens here; the only await
//! points (classifier and responders) live in the runtime.

use super::flow::FlowDefinition;
use super::route::{ResponderName, RoutingError, Target};
use super::{Effect, Event, SessionState};
use crate::conversation::Turn;
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: SessionState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: SessionState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Errors that end the turn
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SupervisorError {
    #[error(transparent)]
    Routing(#[from] RoutingError),
    #[error("flow state inconsistency: {0}")]
    FlowStateInconsistency(String),
    #[error("{responder} completed but the supervisor routed to {expected}")]
    UnexpectedCompletion {
        responder: ResponderName,
        expected: String,
    },
}

/// Pure transition function
pub fn transition(state: &SessionState, event: Event) -> Result<TransitionResult, SupervisorError> {
    let result = match event {
        Event::Invoked => on_invoked(state),
        Event::Classified { label } => on_classified(state, &label)?,
        Event::ResponderCompleted {
            responder,
            fragment,
        } => on_responder_completed(state, responder, fragment)?,
    };

    result
        .new_state
        .check()
        .map_err(SupervisorError::FlowStateInconsistency)?;
    Ok(result)
}

/// Supervisor entry: the four routing rules, checked in priority order
fn on_invoked(state: &SessionState) -> TransitionResult {
    // 1. Flow trigger in the caller context starts a flow, once per request
    if state.flow.is_none() && !state.flow_triggered {
        let started = state
            .context()
            .and_then(|ctx| ctx.kind())
            .and_then(FlowDefinition::for_trigger)
            .and_then(FlowDefinition::start);
        if let Some((first, flow)) = started {
            let mut new_state = state.clone();
            new_state.flow = Some(flow);
            new_state.flow_triggered = true;
            new_state.next = Some(Target::Responder(first));
            return TransitionResult::new(new_state).with_effect(Effect::invoke(first));
        }
    }

    match &state.flow {
        // 2. All expected results are in: compose, clear the flow, finish
        Some(flow) if flow.queue.is_empty() => {
            let combined = flow.definition().compose(&flow.results);
            let mut new_state = state.clone();
            new_state.flow = None;
            new_state.next = Some(Target::Finish);
            TransitionResult::new(new_state)
                .with_effect(Effect::append(Turn::supervisor(combined)))
                .with_effect(Effect::Finish)
        }

        // 3. Dispatch the queue head; it is popped when it completes
        Some(flow) => {
            let head = flow.queue[0];
            let mut new_state = state.clone();
            new_state.next = Some(Target::Responder(head));
            TransitionResult::new(new_state).with_effect(Effect::invoke(head))
        }

        // 4. No flow: defer to the classifier
        None => TransitionResult::new(state.clone()).with_effect(Effect::Classify),
    }
}

fn on_classified(state: &SessionState, label: &str) -> Result<TransitionResult, SupervisorError> {
    if let Some(flow) = &state.flow {
        return Err(SupervisorError::FlowStateInconsistency(format!(
            "classification received while flow {} is active",
            flow.id
        )));
    }

    let target: Target = label.parse()?;
    let mut new_state = state.clone();
    new_state.next = Some(target);

    let effect = match target {
        Target::Responder(name) => Effect::invoke(name),
        Target::Finish => Effect::Finish,
    };
    Ok(TransitionResult::new(new_state).with_effect(effect))
}

fn on_responder_completed(
    state: &SessionState,
    responder: ResponderName,
    fragment: String,
) -> Result<TransitionResult, SupervisorError> {
    if state.next != Some(Target::Responder(responder)) {
        return Err(SupervisorError::UnexpectedCompletion {
            responder,
            expected: state
                .next
                .map_or_else(|| "nothing".to_string(), |t| t.label().to_string()),
        });
    }

    let mut new_state = state.clone();
    if let Some(flow) = new_state.flow.as_mut() {
        if flow.definition().expects(responder) {
            flow.results.insert(responder, fragment.clone());
            if flow.queue.front() == Some(&responder) {
                flow.queue.pop_front();
            }
        }
    }

    Ok(TransitionResult::new(new_state)
        .with_effect(Effect::append(Turn::responder(responder, fragment)))
        .with_effect(Effect::ReturnToSupervisor))
}
