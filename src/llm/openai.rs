//! `OpenAI`-compatible chat completions provider

use super::types::{ContentBlock, LlmMessage, LlmRequest, LlmResponse, MessageRole, ToolDefinition, Usage};
use super::{LlmError, LlmService};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Chat completions client for the direct API or any compatible gateway
pub struct OpenAIService {
    client: Client,
    api_key: String,
    endpoint: String,
    model: String,
}

impl OpenAIService {
    pub fn new(api_key: String, model: String, base_url: &str, timeout: Duration) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::unknown(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            endpoint: format!("{}/v1/chat/completions", base_url.trim_end_matches('/')),
            model,
        })
    }

    fn build_body(&self, request: &LlmRequest) -> ChatBody {
        let mut messages: Vec<WireMessage> = request
            .system
            .iter()
            .map(|system| WireMessage::plain("system", system.clone()))
            .collect();
        for message in &request.messages {
            append_message(&mut messages, message);
        }

        ChatBody {
            model: self.model.clone(),
            messages,
            tools: (!request.tools.is_empty()).then(|| request.tools.iter().map(WireTool::from).collect()),
            max_tokens: request.max_tokens,
            temperature: 0.0,
            response_format: request.json_output.then_some(ResponseFormat { r#type: "json_object" }),
        }
    }
}

/// Flatten one message into wire messages.
///
/// Text and tool calls share a single message under the sender's role; each
/// tool result becomes its own `tool` message keyed by call id.
fn append_message(out: &mut Vec<WireMessage>, message: &LlmMessage) {
    let role = match message.role {
        MessageRole::User => "user",
        MessageRole::Assistant => "assistant",
    };

    let text: Vec<&str> = message
        .content
        .iter()
        .filter_map(|block| match block {
            ContentBlock::Text { text } => Some(text.as_str()),
            _ => None,
        })
        .collect();
    let calls: Vec<WireToolCall> = message
        .content
        .iter()
        .filter_map(|block| match block {
            ContentBlock::ToolUse { id, name, input } => Some(WireToolCall::new(id, name, input)),
            _ => None,
        })
        .collect();

    let start = out.len();
    if !text.is_empty() || !calls.is_empty() {
        out.push(WireMessage {
            role: role.to_string(),
            content: (!text.is_empty()).then(|| text.join("\n")),
            tool_calls: (!calls.is_empty()).then_some(calls),
            tool_call_id: None,
        });
    }

    for block in &message.content {
        if let ContentBlock::ToolResult { tool_use_id, content, is_error } = block {
            let content = if *is_error { format!("Error: {content}") } else { content.clone() };
            out.push(WireMessage {
                tool_call_id: Some(tool_use_id.clone()),
                ..WireMessage::plain("tool", content)
            });
        }
    }

    if out.len() == start {
        out.push(WireMessage::plain(role, String::new()));
    }
}

fn into_response(reply: ChatReply) -> Result<LlmResponse, LlmError> {
    let Some(choice) = reply.choices.into_iter().next() else {
        return Err(LlmError::unknown("No choices in response"));
    };

    let text = choice.message.content.filter(|t| !t.is_empty()).map(|text| ContentBlock::Text { text });
    let calls = choice
        .message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .filter(|call| !call.function.name.is_empty())
        .map(|call| {
            let input = serde_json::from_str(&call.function.arguments).unwrap_or_else(|e| {
                tracing::warn!(error = %e, tool = %call.function.name, "Unparseable tool arguments");
                Value::Object(serde_json::Map::new())
            });
            ContentBlock::ToolUse {
                id: call.id,
                name: call.function.name,
                input,
            }
        });

    let usage = reply.usage.map_or_else(Usage::default, |u| Usage {
        input_tokens: u64::from(u.prompt_tokens),
        output_tokens: u64::from(u.completion_tokens),
    });

    Ok(LlmResponse {
        content: text.into_iter().chain(calls).collect(),
        usage,
    })
}

fn status_error(status: StatusCode, body: &str) -> LlmError {
    let Ok(ErrorBody { error }) = serde_json::from_str::<ErrorBody>(body) else {
        return LlmError::unknown(format!("HTTP {status} error: {body}"));
    };
    let message = error.message;
    match status.as_u16() {
        401 | 403 => LlmError::auth(format!("Authentication failed: {message}")),
        429 => LlmError::rate_limit(format!("Rate limit exceeded: {message}")),
        400 => LlmError::invalid_request(format!("Invalid request: {message}")),
        500..=599 => LlmError::server_error(format!("Server error: {message}")),
        _ => LlmError::unknown(format!("HTTP {status}: {message}")),
    }
}

#[async_trait]
impl LlmService for OpenAIService {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&self.build_body(request))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::timeout(format!("Request timeout: {e}"))
                } else if e.is_connect() {
                    LlmError::network(format!("Connection failed: {e}"))
                } else {
                    LlmError::unknown(format!("Request failed: {e}"))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| LlmError::network(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(status_error(status, &body));
        }

        let reply: ChatReply =
            serde_json::from_str(&body).map_err(|e| LlmError::unknown(format!("Failed to parse response: {e}")))?;
        into_response(reply)
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

// Wire format

#[derive(Debug, Serialize)]
struct ChatBody {
    model: String,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<WireTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    r#type: &'static str,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireMessage {
    role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<WireToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

impl WireMessage {
    fn plain(role: &str, content: String) -> Self {
        Self {
            role: role.to_string(),
            content: Some(content),
            tool_calls: None,
            tool_call_id: None,
        }
    }
}

#[derive(Debug, Serialize)]
struct WireTool {
    r#type: &'static str,
    function: WireFunction,
}

impl From<&ToolDefinition> for WireTool {
    fn from(tool: &ToolDefinition) -> Self {
        Self {
            r#type: "function",
            function: WireFunction {
                name: tool.name.clone(),
                description: tool.description.clone(),
                parameters: tool.input_schema.clone(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct WireFunction {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireToolCall {
    id: String,
    #[serde(default = "function_type")]
    r#type: String,
    function: WireCall,
}

impl WireToolCall {
    fn new(id: &str, name: &str, input: &Value) -> Self {
        Self {
            id: id.to_string(),
            r#type: function_type(),
            function: WireCall {
                name: name.to_string(),
                arguments: input.to_string(),
            },
        }
    }
}

fn function_type() -> String {
    "function".to_string()
}

#[derive(Debug, Serialize, Deserialize)]
struct WireCall {
    name: String,
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    choices: Vec<ReplyChoice>,
    #[serde(default)]
    usage: Option<ReplyUsage>,
}

#[derive(Debug, Deserialize)]
struct ReplyChoice {
    message: WireMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}
