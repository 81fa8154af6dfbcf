//! Mock implementations for testing
//!
//! These mocks enable turn and responder tests without real I/O.

use crate::classifier::Classifier;
use crate::conversation::ConversationLog;
use crate::fetch::{
    AirQualityReading, AirQualitySource, FetchError, MedicationSource, ProviderQuery, ProviderRecord,
    ProviderSource,
};
use crate::llm::{LlmError, LlmRequest, LlmResponse, LlmService};
use crate::responders::{container_class, Responder};
use crate::supervisor::{RequestContext, ResponderName, RoutingError, SessionState};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ============================================================================
// Mock LLM Service
// ============================================================================

/// Mock LLM service that returns queued responses
pub struct MockLlmService {
    responses: Mutex<VecDeque<Result<LlmResponse, LlmError>>>,
    requests: Mutex<Vec<LlmRequest>>,
    delay: Option<Duration>,
}

impl MockLlmService {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Sleep before answering each request
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queue a successful response
    pub fn queue_response(&self, response: LlmResponse) {
        self.responses.lock().unwrap().push_back(Ok(response));
    }

    /// Queue a plain text answer
    pub fn queue_text(&self, text: &str) {
        self.queue_response(LlmResponse::text_only(text));
    }

    /// Queue an error response
    pub fn queue_error(&self, error: LlmError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    /// Get recorded requests
    pub fn requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmService for MockLlmService {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::network("No mock response queued")))
    }

    fn model_id(&self) -> &str {
        "mock-model"
    }
}

// ============================================================================
// Mock Classifier
// ============================================================================

/// Classifier that answers from a script; an exhausted script is unavailable
pub struct MockClassifier {
    labels: Mutex<VecDeque<String>>,
    calls: Mutex<usize>,
}

impl MockClassifier {
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            labels: Mutex::new(labels.into_iter().map(Into::into).collect()),
            calls: Mutex::new(0),
        }
    }

    pub fn unavailable() -> Self {
        Self::new(Vec::<String>::new())
    }

    pub fn call_count(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl Classifier for MockClassifier {
    async fn classify(&self, _log: &ConversationLog) -> Result<String, RoutingError> {
        *self.calls.lock().unwrap() += 1;
        self.labels
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| RoutingError::Unavailable("mock classifier exhausted".to_string()))
    }
}

// ============================================================================
// Mock Responder
// ============================================================================

/// Responder that returns a fixed fragment and records what it saw
pub struct MockResponder {
    name: ResponderName,
    seen: Mutex<Vec<(usize, Option<RequestContext>)>>,
}

impl MockResponder {
    pub fn new(name: ResponderName) -> Self {
        Self {
            name,
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn fragment_for(name: ResponderName) -> String {
        format!("<div class=\"{}\"><p>{name} fragment</p></div>", container_class(name))
    }

    pub fn call_count(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    pub fn seen_contexts(&self) -> Vec<Option<RequestContext>> {
        self.seen.lock().unwrap().iter().map(|(_, ctx)| ctx.clone()).collect()
    }

    pub fn seen_log_lengths(&self) -> Vec<usize> {
        self.seen.lock().unwrap().iter().map(|(len, _)| *len).collect()
    }
}

#[async_trait]
impl Responder for MockResponder {
    fn name(&self) -> ResponderName {
        self.name
    }

    async fn respond(&self, log: &ConversationLog, state: &SessionState) -> String {
        self.seen
            .lock()
            .unwrap()
            .push((log.len(), state.context().cloned()));
        Self::fragment_for(self.name)
    }
}

// ============================================================================
// Mock Data Sources
// ============================================================================

/// Air quality source with a canned reading or failure
#[derive(Clone, Default)]
pub struct MockAirQuality {
    reading: Option<AirQualityReading>,
    failure: Arc<Mutex<Option<FetchError>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockAirQuality {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_reading(reading: AirQualityReading) -> Self {
        Self {
            reading: Some(reading),
            ..Self::default()
        }
    }

    /// Fail the first call with `error`
    pub fn failing(error: FetchError) -> Self {
        Self {
            failure: Arc::new(Mutex::new(Some(error))),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl AirQualitySource for MockAirQuality {
    async fn current(&self, zip_code: &str) -> Result<Option<AirQualityReading>, FetchError> {
        self.calls.lock().unwrap().push(zip_code.to_string());
        if let Some(error) = self.failure.lock().unwrap().take() {
            return Err(error);
        }
        Ok(self.reading.clone())
    }
}

/// Medication source with an optional canned label
#[derive(Clone, Default)]
pub struct MockMedication {
    label: Option<Value>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockMedication {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_label(label: Value) -> Self {
        Self {
            label: Some(label),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl MedicationSource for MockMedication {
    async fn label(&self, ingredient: &str) -> Result<Option<Value>, FetchError> {
        self.calls.lock().unwrap().push(ingredient.to_string());
        Ok(self.label.clone())
    }
}

/// Provider source with canned records
#[derive(Clone, Default)]
pub struct MockProviders {
    records: Vec<ProviderRecord>,
    queries: Arc<Mutex<Vec<ProviderQuery>>>,
}

impl MockProviders {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<ProviderRecord>) -> Self {
        Self {
            records,
            ..Self::default()
        }
    }

    pub fn queries(&self) -> Vec<ProviderQuery> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProviderSource for MockProviders {
    async fn search(&self, query: &ProviderQuery) -> Result<Vec<ProviderRecord>, FetchError> {
        self.queries.lock().unwrap().push(query.clone());
        Ok(self.records.clone())
    }
}
