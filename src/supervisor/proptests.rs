//! Property-based tests for the supervisor
//!
//! These tests drive the pure transition function with a synchronous,
//! scripted classifier and verify the routing invariants hold for any input.

use super::*;
use crate::conversation::{ConversationLog, Turn};
use proptest::prelude::*;
use serde_json::json;
use std::collections::VecDeque;

// ============================================================================
// Test Helpers
// ============================================================================

const HOP_BUDGET: usize = 10;

#[derive(Debug)]
struct Simulation {
    invoked: Vec<ResponderName>,
    classify_calls: usize,
    log: ConversationLog,
    outcome: Result<SessionState, String>,
}

fn fragment_for(name: ResponderName) -> String {
    format!("<div class=\"{name}\">{name}</div>")
}

/// Run one turn to completion the way the runtime does, without I/O
fn simulate(context: Option<RequestContext>, labels: Vec<String>) -> Simulation {
    let mut labels: VecDeque<String> = labels.into();
    let mut state = SessionState::new(context);
    let mut log = ConversationLog::from_user_message("hello");
    let mut pending = VecDeque::from([Event::Invoked]);
    let mut invoked = Vec::new();
    let mut classify_calls = 0;
    let mut hops = 0;

    while let Some(event) = pending.pop_front() {
        if event == Event::Invoked {
            hops += 1;
            if hops > HOP_BUDGET {
                return Simulation {
                    invoked,
                    classify_calls,
                    log,
                    outcome: Err("hop budget exceeded".to_string()),
                };
            }
        }
        let result = match transition(&state, event) {
            Ok(r) => r,
            Err(e) => {
                return Simulation {
                    invoked,
                    classify_calls,
                    log,
                    outcome: Err(e.to_string()),
                }
            }
        };
        state = result.new_state;
        for effect in result.effects {
            match effect {
                Effect::Classify => {
                    classify_calls += 1;
                    // An exhausted script behaves like an unreachable classifier
                    let label = labels.pop_front().unwrap_or_else(|| "<unavailable>".to_string());
                    pending.push_back(Event::Classified { label });
                }
                Effect::Invoke { responder } => {
                    invoked.push(responder);
                    pending.push_back(Event::ResponderCompleted {
                        responder,
                        fragment: fragment_for(responder),
                    });
                }
                Effect::AppendTurn { turn } => log.append(turn),
                Effect::ReturnToSupervisor => pending.push_back(Event::Invoked),
                Effect::Finish => {
                    return Simulation {
                        invoked,
                        classify_calls,
                        log,
                        outcome: Ok(state),
                    }
                }
            }
        }
    }

    Simulation {
        invoked,
        classify_calls,
        log,
        outcome: Err("event queue drained without finish".to_string()),
    }
}

fn phs_context() -> Option<RequestContext> {
    Some(RequestContext::new(json!({"type": "personal_health_summary"})))
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_responder() -> impl Strategy<Value = ResponderName> {
    prop::sample::select(ResponderName::ALL.to_vec())
}

fn arb_valid_label() -> impl Strategy<Value = String> {
    prop_oneof![
        arb_responder().prop_map(|r| r.label().to_string()),
        Just(FINISH_LABEL.to_string()),
    ]
}

fn arb_any_label() -> impl Strategy<Value = String> {
    prop_oneof![
        3 => arb_valid_label(),
        1 => "[a-zA-Z_ -]{0,20}",
    ]
}

fn arb_context() -> impl Strategy<Value = Option<RequestContext>> {
    prop_oneof![
        Just(None),
        Just(phs_context()),
        "[a-z_]{1,12}".prop_map(|kind| Some(RequestContext::new(json!({ "type": kind })))),
        Just(Some(RequestContext::new(json!({"steps": 8000, "sleep_hours": 6})))),
    ]
}

fn arb_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        Just(Event::Invoked),
        arb_any_label().prop_map(|label| Event::Classified { label }),
        arb_responder().prop_map(|responder| Event::ResponderCompleted {
            responder,
            fragment: fragment_for(responder),
        }),
    ]
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    // PHS runs diet then exercise exactly once, whatever the classifier says
    #[test]
    fn prop_phs_sequence_is_fixed(labels in prop::collection::vec(arb_any_label(), 0..5)) {
        let sim = simulate(phs_context(), labels);
        prop_assert_eq!(&sim.invoked, &vec![ResponderName::Diet, ResponderName::Exercise]);
        prop_assert_eq!(sim.classify_calls, 0);

        let state = sim.outcome.expect("phs flow should finish");
        prop_assert!(state.flow.is_none());
        prop_assert_eq!(state.next, Some(Target::Finish));

        let last = sim.log.last().unwrap();
        prop_assert_eq!(last.author, crate::conversation::Author::Supervisor);
        let diet = last.content.find(&fragment_for(ResponderName::Diet)).unwrap();
        let exercise = last.content.find(&fragment_for(ResponderName::Exercise)).unwrap();
        prop_assert!(diet < exercise);
    }

    // Without a flow, each hop makes at most one classifier call
    #[test]
    fn prop_one_classification_per_hop(
        responders in prop::collection::vec(arb_responder(), 0..6),
    ) {
        let mut labels: Vec<String> = responders.iter().map(|r| r.label().to_string()).collect();
        labels.push(FINISH_LABEL.to_string());

        let sim = simulate(None, labels);
        prop_assert!(sim.outcome.is_ok(), "turn failed: {:?}", sim.outcome);
        prop_assert_eq!(&sim.invoked, &responders);
        prop_assert_eq!(sim.classify_calls, responders.len() + 1);
        // user turn plus one fragment per responder hop
        prop_assert_eq!(sim.log.len(), responders.len() + 1);
    }

    // A classifier that never says FINISH is caught by the hop budget
    #[test]
    fn prop_non_terminating_classifier_hits_budget(responder in arb_responder()) {
        let labels = vec![responder.label().to_string(); HOP_BUDGET * 2];
        let sim = simulate(None, labels);
        prop_assert_eq!(sim.outcome.unwrap_err(), "hop budget exceeded");
        prop_assert!(sim.invoked.len() <= HOP_BUDGET);
    }

    // Labels outside the seven valid values never route anywhere
    #[test]
    fn prop_invalid_labels_rejected(label in "[a-zA-Z_ -]{0,20}") {
        let valid = label == FINISH_LABEL
            || ResponderName::ALL.iter().any(|r| r.label() == label);
        let result = transition(&SessionState::new(None), Event::Classified { label });
        if valid {
            prop_assert!(result.is_ok());
        } else {
            prop_assert!(matches!(result, Err(SupervisorError::Routing(_))));
        }
    }

    // A rejected label leaves the log exactly as the user left it
    #[test]
    fn prop_routing_error_does_not_touch_log(label in "[a-z]{1,8}_agent") {
        let sim = simulate(None, vec![label]);
        prop_assert!(sim.outcome.is_err());
        prop_assert_eq!(sim.log.len(), 1);
        prop_assert!(sim.invoked.is_empty());
    }

    // Any sequence of events keeps flow bookkeeping consistent
    #[test]
    fn prop_flow_state_stays_consistent(
        context in arb_context(),
        events in prop::collection::vec(arb_event(), 1..20),
    ) {
        let mut state = SessionState::new(context.clone());
        for event in events {
            if let Ok(result) = transition(&state, event) {
                prop_assert!(result.new_state.check().is_ok());
                prop_assert_eq!(result.new_state.context(), context.as_ref());
                if let Some(flow) = &result.new_state.flow {
                    prop_assert!(result.new_state.flow_triggered);
                    for queued in &flow.queue {
                        prop_assert!(!flow.results.contains_key(queued));
                    }
                }
                state = result.new_state;
            }
        }
    }

    // Every scripted turn either finishes or fails; it never stalls
    #[test]
    fn prop_turn_terminates(
        context in arb_context(),
        labels in prop::collection::vec(arb_valid_label(), 0..12),
    ) {
        let sim = simulate(context, labels);
        if let Err(reason) = &sim.outcome {
            prop_assert_ne!(reason.as_str(), "event queue drained without finish");
        }
    }
}

#[test]
fn test_symptom_scenario() {
    let sim = simulate(
        None,
        vec!["symptom-checker".to_string(), FINISH_LABEL.to_string()],
    );
    assert!(sim.outcome.is_ok());
    assert_eq!(sim.invoked, vec![ResponderName::SymptomChecker]);
    assert_eq!(
        sim.log.last(),
        Some(&Turn::responder(
            ResponderName::SymptomChecker,
            fragment_for(ResponderName::SymptomChecker)
        ))
    );
}
