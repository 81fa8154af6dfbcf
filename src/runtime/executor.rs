//! Turn executor
//!
//! Drives the pure supervisor transition with real collaborators: the
//! classifier and the responders are the only await points.

use crate::classifier::Classifier;
use crate::conversation::{Author, ConversationLog};
use crate::responders::{container_class, html, ResponderRegistry};
use crate::supervisor::{transition, Effect, Event, RequestContext, ResponderName, SessionState, SupervisorError};
use std::collections::VecDeque;
use std::sync::Arc;
use thiserror::Error;

/// Output when a turn ends without any fragment being written
const NO_MATCH_CLASS: &str = "supervisor-response";

/// Errors that end a turn without output
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TurnError {
    #[error(transparent)]
    Supervisor(#[from] SupervisorError),
    #[error("turn exceeded the hop budget of {0}")]
    HopBudgetExceeded(u32),
}

/// A failed turn, with the log as it stood when the error hit
#[derive(Debug, Clone, Error)]
#[error("{error}")]
pub struct TurnFailure {
    #[source]
    pub error: TurnError,
    pub log: ConversationLog,
    pub hops: u32,
}

/// A finished turn
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// Fragment returned to the caller
    pub output: String,
    pub log: ConversationLog,
    pub state: SessionState,
    /// Supervisor invocations used
    pub hops: u32,
}

/// Runs one request through the supervisor until it finishes or fails
#[derive(Clone)]
pub struct TurnRuntime {
    classifier: Arc<dyn Classifier>,
    responders: ResponderRegistry,
    max_hops: u32,
}

/// Mutable bookkeeping for one turn
struct ActiveTurn {
    log: ConversationLog,
    state: SessionState,
    hops: u32,
}

impl TurnRuntime {
    pub fn new(classifier: Arc<dyn Classifier>, responders: ResponderRegistry, max_hops: u32) -> Self {
        Self {
            classifier,
            responders,
            max_hops,
        }
    }

    /// Run a turn for a fresh request
    pub async fn run_turn(
        &self,
        message: &str,
        context: Option<RequestContext>,
    ) -> Result<TurnOutcome, TurnFailure> {
        let mut turn = ActiveTurn {
            log: ConversationLog::from_user_message(message),
            state: SessionState::new(context),
            hops: 0,
        };

        match self.drive(&mut turn).await {
            Ok(()) => Ok(Self::finish(turn)),
            Err(error) => Err(TurnFailure {
                error,
                log: turn.log,
                hops: turn.hops,
            }),
        }
    }

    /// Feed events through the supervisor until it emits `Finish`
    async fn drive(&self, turn: &mut ActiveTurn) -> Result<(), TurnError> {
        let mut events = VecDeque::from([Event::Invoked]);
        while let Some(event) = events.pop_front() {
            if event == Event::Invoked {
                turn.hops += 1;
                if turn.hops > self.max_hops {
                    tracing::warn!(max_hops = self.max_hops, "Hop budget exceeded");
                    return Err(TurnError::HopBudgetExceeded(self.max_hops));
                }
            }

            let result = transition(&turn.state, event)?;
            turn.state = result.new_state;

            for effect in result.effects {
                match effect {
                    Effect::Classify => {
                        let label = self
                            .classifier
                            .classify(&turn.log)
                            .await
                            .map_err(SupervisorError::from)?;
                        tracing::info!(hop = turn.hops, %label, "Classified");
                        events.push_back(Event::Classified { label });
                    }
                    Effect::Invoke { responder } => {
                        let fragment = self.invoke(responder, turn).await;
                        events.push_back(Event::ResponderCompleted {
                            responder,
                            fragment,
                        });
                    }
                    Effect::AppendTurn { turn: entry } => turn.log.append(entry),
                    Effect::ReturnToSupervisor => events.push_back(Event::Invoked),
                    Effect::Finish => return Ok(()),
                }
            }
        }

        // Every path through the supervisor ends in Finish or an error
        Err(TurnError::Supervisor(SupervisorError::FlowStateInconsistency(
            "event queue drained without finishing".to_string(),
        )))
    }

    async fn invoke(&self, name: ResponderName, turn: &ActiveTurn) -> String {
        let Some(responder) = self.responders.get(name) else {
            tracing::error!(responder = %name, "Responder not registered");
            return html::apology(container_class(name), "that service is not available right now.");
        };

        let start = std::time::Instant::now();
        let fragment = responder.respond(&turn.log, &turn.state).await;
        tracing::info!(
            hop = turn.hops,
            responder = %name,
            duration_ms = %start.elapsed().as_millis(),
            "Responder completed"
        );
        fragment
    }

    fn finish(turn: ActiveTurn) -> TurnOutcome {
        let output = match turn.log.last() {
            Some(last) if last.author != Author::User => last.content.clone(),
            _ => html::apology(
                NO_MATCH_CLASS,
                "I couldn't match that request to one of the health assistants.",
            ),
        };
        tracing::info!(hops = turn.hops, turns = turn.log.len(), "Turn finished");
        TurnOutcome {
            output,
            log: turn.log,
            state: turn.state,
            hops: turn.hops,
        }
    }
}
