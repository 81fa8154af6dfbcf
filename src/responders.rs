//! Responder implementations
//!
//! Each responder turns the conversation so far into one HTML fragment for
//! its domain. Responders never fail: any problem becomes an apologetic
//! fragment, so the supervisor always gets something to append.

mod air_quality;
mod diet;
mod exercise;
pub mod html;
mod medication;
mod providers;
mod symptoms;

pub use air_quality::AirQualityResponder;
pub use diet::DietResponder;
pub use exercise::ExerciseResponder;
pub use medication::MedicationResponder;
pub use providers::ProviderLookupResponder;
pub use symptoms::SymptomCheckerResponder;

use crate::conversation::ConversationLog;
use crate::fetch::{DataSources, FetchError};
use crate::llm::{ContentBlock, LlmError, LlmMessage, LlmRequest, LlmResponse, LlmService, MessageRole, ToolDefinition};
use crate::supervisor::{ResponderName, SessionState};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

const MAX_TOKENS: u32 = 2048;

/// A named unit that answers one intent domain
#[async_trait]
pub trait Responder: Send + Sync {
    fn name(&self) -> ResponderName;

    /// Produce one fragment from the log and session state
    async fn respond(&self, log: &ConversationLog, state: &SessionState) -> String;
}

/// Container class every fragment of this responder is wrapped in
pub fn container_class(name: ResponderName) -> &'static str {
    match name {
        ResponderName::Diet => "diet-plan",
        ResponderName::Exercise => "exercise-plan",
        ResponderName::ProviderLookup => "provider-results",
        ResponderName::Medication => "medication-info",
        ResponderName::SymptomChecker => "symptoms-checker",
        ResponderName::AirQuality => "air-quality-info",
    }
}

/// A data lookup failed or came back empty
#[derive(Debug, Error)]
pub enum ResponderDataError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("invalid lookup parameters: {0}")]
    Parameters(String),
    #[error("no matching records")]
    Empty,
    #[error("lookup timed out after {0:?}")]
    Timeout(Duration),
}

/// Responders by name
#[derive(Default, Clone)]
pub struct ResponderRegistry {
    responders: HashMap<ResponderName, Arc<dyn Responder>>,
}

impl ResponderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// All six responders backed by one generator and the configured sources
    pub fn standard(generator: &Generator, sources: &DataSources) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(DietResponder::new(generator.clone())));
        registry.register(Arc::new(ExerciseResponder::new(generator.clone())));
        registry.register(Arc::new(ProviderLookupResponder::new(
            generator.clone(),
            Arc::clone(&sources.providers),
        )));
        registry.register(Arc::new(MedicationResponder::new(
            generator.clone(),
            Arc::clone(&sources.medication),
        )));
        registry.register(Arc::new(SymptomCheckerResponder::new(generator.clone())));
        registry.register(Arc::new(AirQualityResponder::new(
            generator.clone(),
            Arc::clone(&sources.air_quality),
        )));
        registry
    }

    pub fn register(&mut self, responder: Arc<dyn Responder>) {
        self.responders.insert(responder.name(), responder);
    }

    pub fn get(&self, name: ResponderName) -> Option<Arc<dyn Responder>> {
        self.responders.get(&name).cloned()
    }

    pub fn len(&self) -> usize {
        self.responders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.responders.is_empty()
    }
}

/// A responder backed by a data lookup tool
pub(crate) struct Lookup<'a> {
    pub name: ResponderName,
    pub system: &'a str,
    pub tool: ToolDefinition,
    /// Tail of the apology shown when the lookup produces nothing
    pub unavailable: &'a str,
    /// Deadline for the whole lookup, geocoding included
    pub deadline: Duration,
}

/// Shared text generation for all responders
#[derive(Clone)]
pub struct Generator {
    llm: Arc<dyn LlmService>,
    llm_timeout: Duration,
    fetch_timeout: Duration,
}

impl Generator {
    pub fn new(llm: Arc<dyn LlmService>, llm_timeout: Duration, fetch_timeout: Duration) -> Self {
        Self {
            llm,
            llm_timeout,
            fetch_timeout,
        }
    }

    pub fn fetch_timeout(&self) -> Duration {
        self.fetch_timeout
    }

    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        match tokio::time::timeout(self.llm_timeout, self.llm.complete(request)).await {
            Ok(result) => result,
            Err(_) => Err(LlmError::timeout(format!(
                "no response within {}s",
                self.llm_timeout.as_secs()
            ))),
        }
    }

    fn request(system: &str, messages: Vec<LlmMessage>, tools: Vec<ToolDefinition>) -> LlmRequest {
        LlmRequest {
            system: Some(system.to_string()),
            messages,
            tools,
            max_tokens: Some(MAX_TOKENS),
            json_output: false,
        }
    }

    /// Generate a fragment with no tools, optionally preceded by a context message
    pub(crate) async fn compose(
        &self,
        name: ResponderName,
        system: &str,
        preamble: Option<String>,
        log: &ConversationLog,
    ) -> String {
        let class = container_class(name);
        let mut messages: Vec<LlmMessage> = preamble.into_iter().map(LlmMessage::user).collect();
        messages.extend(log.to_llm_messages());

        match self.complete(&Self::request(system, messages, Vec::new())).await {
            Ok(response) => html::finalize(&response.text(), class),
            Err(e) => {
                tracing::warn!(responder = %name, error = %e, "Responder generation failed");
                html::apology(class, "the assistant is unavailable right now. Please try again shortly.")
            }
        }
    }

    /// Offer the model one lookup tool; fetch with its arguments and have it
    /// format the record.
    ///
    /// A failed or empty lookup ends in an apology without a second model call.
    pub(crate) async fn lookup<F, Fut>(&self, lookup: Lookup<'_>, log: &ConversationLog, fetch: F) -> String
    where
        F: FnOnce(Value) -> Fut + Send,
        Fut: Future<Output = Result<Value, ResponderDataError>> + Send,
    {
        let name = lookup.name;
        let class = container_class(name);
        let messages = log.to_llm_messages();

        let first = self
            .complete(&Self::request(lookup.system, messages.clone(), vec![lookup.tool.clone()]))
            .await;
        let response = match first {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(responder = %name, error = %e, "Responder generation failed");
                return html::apology(class, "the assistant is unavailable right now. Please try again shortly.");
            }
        };

        let Some((call_id, tool_name, input)) = response.first_tool_use() else {
            return html::finalize(&response.text(), class);
        };
        if tool_name != lookup.tool.name {
            tracing::warn!(responder = %name, tool = tool_name, "Model called an unknown tool");
            return html::apology(class, lookup.unavailable);
        }
        let (call_id, input) = (call_id.to_string(), input.clone());

        let fetched = match tokio::time::timeout(lookup.deadline, fetch(input.clone())).await {
            Ok(result) => result,
            Err(_) => Err(ResponderDataError::Timeout(lookup.deadline)),
        };
        let record = match fetched {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(responder = %name, error = %e, %input, "Lookup produced no data");
                return html::apology(class, lookup.unavailable);
            }
        };

        let mut messages = messages;
        messages.push(LlmMessage {
            role: MessageRole::Assistant,
            content: vec![ContentBlock::tool_use(call_id.clone(), lookup.tool.name.clone(), input)],
        });
        messages.push(LlmMessage {
            role: MessageRole::User,
            content: vec![ContentBlock::tool_result(call_id, record.to_string(), false)],
        });

        match self.complete(&Self::request(lookup.system, messages, Vec::new())).await {
            Ok(response) => html::finalize(&response.text(), class),
            Err(e) => {
                tracing::warn!(responder = %name, error = %e, "Responder formatting failed");
                html::apology(class, "the assistant is unavailable right now. Please try again shortly.")
            }
        }
    }
}

/// Decode tool arguments into lookup parameters
pub(crate) fn parameters<T: serde::de::DeserializeOwned>(input: Value) -> Result<T, ResponderDataError> {
    serde_json::from_value(input).map_err(|e| ResponderDataError::Parameters(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::testing::{MockAirQuality, MockLlmService, MockMedication, MockProviders};

    fn sources() -> DataSources {
        DataSources {
            air_quality: Arc::new(MockAirQuality::empty()),
            medication: Arc::new(MockMedication::empty()),
            providers: Arc::new(MockProviders::empty()),
        }
    }

    #[test]
    fn test_standard_registry_covers_every_responder() {
        let generator = Generator::new(
            Arc::new(MockLlmService::new()),
            Duration::from_secs(1),
            Duration::from_secs(1),
        );
        let registry = ResponderRegistry::standard(&generator, &sources());
        assert_eq!(registry.len(), ResponderName::ALL.len());
        for name in ResponderName::ALL {
            assert_eq!(registry.get(name).unwrap().name(), name);
        }
    }

    #[test]
    fn test_container_classes_are_distinct() {
        let mut classes: Vec<_> = ResponderName::ALL.iter().map(|n| container_class(*n)).collect();
        classes.sort_unstable();
        classes.dedup();
        assert_eq!(classes.len(), 6);
    }

    #[tokio::test]
    async fn test_generation_timeout_becomes_apology() {
        let llm = Arc::new(MockLlmService::new().with_delay(Duration::from_millis(200)));
        llm.queue_text("<div class=\"symptoms-checker\">late</div>");
        let generator = Generator::new(llm, Duration::from_millis(10), Duration::from_secs(1));

        let log = ConversationLog::from_user_message("headache");
        let out = generator
            .compose(ResponderName::SymptomChecker, "system", None, &log)
            .await;
        assert!(out.contains("Sorry"));
        assert!(out.starts_with("<div class=\"symptoms-checker\">"));
    }
}
