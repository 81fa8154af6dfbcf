//! Composite flow definitions
//!
//! A flow is an ordered list of responders whose fragments are merged into a
//! single supervisor turn. The first step is dispatched immediately when the
//! flow starts; the remaining steps are queued.

use super::route::ResponderName;
use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};
use std::fmt;

/// Identifier of a composite flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FlowId {
    #[serde(rename = "phs")]
    PersonalHealthSummary,
}

impl FlowId {
    pub fn as_str(self) -> &'static str {
        match self {
            FlowId::PersonalHealthSummary => "phs",
        }
    }

    pub fn definition(self) -> &'static FlowDefinition {
        match self {
            FlowId::PersonalHealthSummary => &PERSONAL_HEALTH_SUMMARY,
        }
    }
}

impl fmt::Display for FlowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static description of a composite flow
#[derive(Debug)]
pub struct FlowDefinition {
    pub id: FlowId,
    /// Value of `context.type` that starts this flow
    pub trigger: &'static str,
    /// Responders in execution order; the combined output follows this order
    pub steps: &'static [ResponderName],
    /// Container class of the combined output
    pub container_class: &'static str,
    pub title: &'static str,
}

pub const PERSONAL_HEALTH_SUMMARY: FlowDefinition = FlowDefinition {
    id: FlowId::PersonalHealthSummary,
    trigger: "personal_health_summary",
    steps: &[ResponderName::Diet, ResponderName::Exercise],
    container_class: "personal-health-summary",
    title: "Personal Health Summary",
};

/// Every flow the supervisor knows how to start
pub const FLOWS: &[&FlowDefinition] = &[&PERSONAL_HEALTH_SUMMARY];

impl FlowDefinition {
    /// Look up the flow started by a context `type` value
    pub fn for_trigger(kind: &str) -> Option<&'static FlowDefinition> {
        FLOWS.iter().copied().find(|flow| flow.trigger == kind)
    }

    pub fn expects(&self, name: ResponderName) -> bool {
        self.steps.contains(&name)
    }

    /// Split the flow into the responder to run now and the flow state to track.
    ///
    /// Returns `None` for a flow without steps.
    pub fn start(&self) -> Option<(ResponderName, ActiveFlow)> {
        let (first, rest) = self.steps.split_first()?;
        Some((
            *first,
            ActiveFlow {
                id: self.id,
                queue: rest.iter().copied().collect(),
                results: BTreeMap::new(),
            },
        ))
    }

    /// Concatenate stored fragments, in step order, inside the container
    pub fn compose(&self, results: &BTreeMap<ResponderName, String>) -> String {
        let mut html = format!(
            "<div class=\"{}\">\n  <h2>{}</h2>\n",
            self.container_class, self.title
        );
        for step in self.steps {
            let fragment = results.get(step).map_or("", String::as_str);
            html.push_str("  <div class=\"phs-section\">");
            html.push_str(fragment);
            html.push_str("</div>\n");
        }
        html.push_str("</div>");
        html
    }
}

/// Flow bookkeeping carried in the session state while a flow runs.
///
/// `queue` and `results` only exist inside this struct, so clearing the flow
/// clears them too.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveFlow {
    pub id: FlowId,
    /// Responders still pending; the head is popped when it completes
    pub queue: VecDeque<ResponderName>,
    /// Fragments collected so far
    pub results: BTreeMap<ResponderName, String>,
}

impl ActiveFlow {
    pub fn definition(&self) -> &'static FlowDefinition {
        self.id.definition()
    }

    /// Validate the flow bookkeeping against its definition
    pub fn check(&self) -> Result<(), String> {
        let def = self.definition();
        if let Some(stray) = self.queue.iter().find(|r| !def.expects(**r)) {
            return Err(format!("{stray} queued but not part of flow {}", self.id));
        }
        if let Some(stray) = self.results.keys().find(|r| !def.expects(**r)) {
            return Err(format!("{stray} has a result but is not part of flow {}", self.id));
        }
        if let Some(both) = self.queue.iter().find(|r| self.results.contains_key(*r)) {
            return Err(format!("{both} is still queued but already has a result"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phs_start_runs_diet_and_queues_exercise() {
        let (first, flow) = PERSONAL_HEALTH_SUMMARY.start().unwrap();
        assert_eq!(first, ResponderName::Diet);
        assert_eq!(flow.queue, VecDeque::from([ResponderName::Exercise]));
        assert!(flow.results.is_empty());
        assert!(flow.check().is_ok());
    }

    #[test]
    fn test_compose_orders_by_steps() {
        let mut results = BTreeMap::new();
        results.insert(ResponderName::Exercise, "<div>EX</div>".to_string());
        results.insert(ResponderName::Diet, "<div>DIET</div>".to_string());

        let html = PERSONAL_HEALTH_SUMMARY.compose(&results);
        assert!(html.starts_with("<div class=\"personal-health-summary\">"));
        assert!(html.contains("<h2>Personal Health Summary</h2>"));
        let diet = html.find("DIET").unwrap();
        let ex = html.find("EX</div>").unwrap();
        assert!(diet < ex);
        assert!(html.ends_with("</div>"));
    }

    #[test]
    fn test_compose_tolerates_missing_fragment() {
        let html = PERSONAL_HEALTH_SUMMARY.compose(&BTreeMap::new());
        assert_eq!(html.matches("<div class=\"phs-section\"></div>").count(), 2);
    }

    #[test]
    fn test_trigger_lookup() {
        assert!(FlowDefinition::for_trigger("personal_health_summary").is_some());
        assert!(FlowDefinition::for_trigger("journal").is_none());
    }

    #[test]
    fn test_check_rejects_foreign_responder() {
        let flow = ActiveFlow {
            id: FlowId::PersonalHealthSummary,
            queue: VecDeque::from([ResponderName::Medication]),
            results: BTreeMap::new(),
        };
        assert!(flow.check().is_err());
    }

    #[test]
    fn test_check_rejects_result_for_queued_responder() {
        let mut results = BTreeMap::new();
        results.insert(ResponderName::Exercise, String::new());
        let flow = ActiveFlow {
            id: FlowId::PersonalHealthSummary,
            queue: VecDeque::from([ResponderName::Exercise]),
            results,
        };
        assert!(flow.check().is_err());
    }
}
