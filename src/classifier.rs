//! Routing classification
//!
//! The classifier reads the whole log and names one of the six responders or
//! FINISH. It returns the raw label; the supervisor decides whether the label
//! is valid.

use crate::conversation::ConversationLog;
use crate::llm::{LlmRequest, LlmService};
use crate::supervisor::{ResponderName, RoutingError, FINISH_LABEL};
use async_trait::async_trait;
use serde::Deserialize;
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

#[async_trait]
pub trait Classifier: Send + Sync {
    /// Pick the next label for this log
    async fn classify(&self, log: &ConversationLog) -> Result<String, RoutingError>;
}

/// Fixed routing instruction naming every responder and FINISH
pub fn instruction() -> String {
    let mut prompt = String::from(
        "You are the supervisor of a health assistant system.\n\n\
         Read the conversation and decide which expert should handle the request next:\n\n",
    );
    for name in ResponderName::ALL {
        let _ = writeln!(prompt, "- {}: {}", name.label(), name.description());
    }
    let _ = write!(
        prompt,
        "\nRules:\n\
         - Choose at most one label: the expert that best matches the request.\n\
         - Never invent inputs the user did not give.\n\
         - If the user's request is fully answered by an expert's output, return {FINISH_LABEL}.\n\n\
         Respond with a JSON object of the form {{\"next\": \"<label>\"}} where <label> is one of: {}, {FINISH_LABEL}.",
        ResponderName::ALL.map(ResponderName::label).join(", ")
    );
    prompt
}

#[derive(Debug, Deserialize)]
struct Decision {
    next: String,
}

/// Pull the label out of the model's answer.
///
/// Accepts `{"next": label}` and falls back to the bare trimmed text.
fn extract_label(text: &str) -> String {
    let trimmed = text.trim();
    match serde_json::from_str::<Decision>(trimmed) {
        Ok(decision) => decision.next.trim().to_string(),
        Err(_) => trimmed.trim_matches('"').to_string(),
    }
}

/// Classifier backed by the chat model in JSON mode
pub struct LlmClassifier {
    llm: Arc<dyn LlmService>,
    timeout: Duration,
}

impl LlmClassifier {
    pub fn new(llm: Arc<dyn LlmService>, timeout: Duration) -> Self {
        Self { llm, timeout }
    }
}

#[async_trait]
impl Classifier for LlmClassifier {
    async fn classify(&self, log: &ConversationLog) -> Result<String, RoutingError> {
        let request = LlmRequest {
            system: Some(instruction()),
            messages: log.to_llm_messages(),
            tools: Vec::new(),
            max_tokens: Some(64),
            json_output: true,
        };

        let response = tokio::time::timeout(self.timeout, self.llm.complete(&request))
            .await
            .map_err(|_| RoutingError::Unavailable(format!("no answer within {}s", self.timeout.as_secs())))?
            .map_err(|e| RoutingError::Unavailable(e.message))?;

        let label = extract_label(&response.text());
        tracing::debug!(%label, "Classifier answered");
        Ok(label)
    }
}
