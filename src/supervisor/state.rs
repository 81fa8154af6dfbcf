//! Session state threaded through every routing decision

use super::flow::ActiveFlow;
use super::route::Target;
use serde_json::Value;

/// Caller-supplied context (wearables, journal, flow trigger).
///
/// Opaque to the supervisor except for the `type` field.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestContext(Value);

impl RequestContext {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// The `type` field, when it is a string
    pub fn kind(&self) -> Option<&str> {
        self.0.get("type").and_then(Value::as_str)
    }

    pub fn as_json(&self) -> &Value {
        &self.0
    }
}

/// Mutable per-request routing state.
///
/// `context` is fixed at construction; transitions copy it forward untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    /// Active composite flow, with its queue and collected results
    pub flow: Option<ActiveFlow>,
    /// Most recent routing decision
    pub next: Option<Target>,
    /// Set once a flow has been started for this request
    pub flow_triggered: bool,
    context: Option<RequestContext>,
}

impl SessionState {
    pub fn new(context: Option<RequestContext>) -> Self {
        Self {
            context,
            ..Self::default()
        }
    }

    pub fn context(&self) -> Option<&RequestContext> {
        self.context.as_ref()
    }

    pub fn flow_active(&self) -> bool {
        self.flow.is_some()
    }

    /// Assert the flow invariants hold
    pub fn check(&self) -> Result<(), String> {
        match &self.flow {
            Some(flow) => flow.check(),
            None => Ok(()),
        }
    }
}
