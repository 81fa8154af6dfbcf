//! Healthcare provider lookup from the NPI registry

use super::{parameters, Generator, Lookup, Responder, ResponderDataError};
use crate::conversation::ConversationLog;
use crate::fetch::{ProviderQuery, ProviderSource};
use crate::llm::ToolDefinition;
use crate::supervisor::{ResponderName, SessionState};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

pub const TOOL_NAME: &str = "get_health_centers";

/// Registry search plus one geocode per record
const DEADLINE_FACTOR: u32 = 4;

const SYSTEM_PROMPT: &str = r#"You are an expert in locating healthcare providers and medical facilities using National Provider Identifier (NPI) registry data.

Rules:
- Use the `get_health_centers` tool when users ask for providers or facilities by location.
- Never fabricate or guess provider results. Rely only on the tool results.

Tool parameters:
- zip_code: required, the ZIP code to search
- primary_taxonomy_description: optional specialty filter (e.g. "dentist", "emergency", "pediatrics", "cardiology")
- entity_type: optional, "Organization" (default) or "Individual"

Format each result with these field mappings:
- Name: provider_org_name_legal for organizations, provider_first_name and provider_last_name_legal for individuals
- NPI: npi
- Type: entity_type
- Primary Specialty: primary_taxonomy_description
- All Specialties: taxonomy_descriptions_list, comma separated
- Address: practice_street_address, practice_city_name, practice_state_name, practice_postal_code
- Phone: practice_phone_number if available
- Latitude and Longitude: latitude, longitude (always include them)
- Last Updated: last_update_date

<div class="provider-results">
<h3>Healthcare Providers Found</h3>
<div class="provider-card">
  <h4><strong>[Provider Name]</strong></h4>
  <ul>
    <li><strong>NPI:</strong> ...</li>
    <li><strong>Type:</strong> ...</li>
    <li><strong>Primary Specialty:</strong> ...</li>
    <li><strong>All Specialties:</strong> ...</li>
    <li><strong>Address:</strong> ...</li>
    <li><strong>Phone:</strong> ...</li>
    <li><strong>Latitude:</strong> ...</li>
    <li><strong>Longitude:</strong> ...</li>
    <li><strong>Last Updated:</strong> ...</li>
  </ul>
</div>
</div>

Use only div, ul, li, strong, h3 and h4. Do not return JSON or plain text."#;

fn tool() -> ToolDefinition {
    ToolDefinition {
        name: TOOL_NAME.to_string(),
        description: "Locate healthcare providers or facilities in the NPI registry by ZIP code \
                      and optional specialty. Results include latitude and longitude."
            .to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "zip_code": {
                    "type": "string",
                    "description": "ZIP code where the provider or facility is located"
                },
                "primary_taxonomy_description": {
                    "type": "string",
                    "description": "Partial match on specialty, e.g. 'dentist' or 'cardiology'"
                },
                "entity_type": {
                    "type": "string",
                    "enum": ["Organization", "Individual"],
                    "description": "Defaults to Organization"
                }
            },
            "required": ["zip_code"]
        }),
    }
}

pub struct ProviderLookupResponder {
    generator: Generator,
    source: Arc<dyn ProviderSource>,
}

impl ProviderLookupResponder {
    pub fn new(generator: Generator, source: Arc<dyn ProviderSource>) -> Self {
        Self { generator, source }
    }
}

#[async_trait]
impl Responder for ProviderLookupResponder {
    fn name(&self) -> ResponderName {
        ResponderName::ProviderLookup
    }

    async fn respond(&self, log: &ConversationLog, _state: &SessionState) -> String {
        let lookup = Lookup {
            name: ResponderName::ProviderLookup,
            system: SYSTEM_PROMPT,
            tool: tool(),
            unavailable: "I couldn't find matching healthcare providers for that location right now.",
            deadline: self.generator.fetch_timeout() * DEADLINE_FACTOR,
        };
        let source = Arc::clone(&self.source);

        self.generator
            .lookup(lookup, log, |input| async move {
                let query: ProviderQuery = parameters(input)?;
                if query.zip_code.trim().is_empty() {
                    return Err(ResponderDataError::Parameters("empty zip_code".to_string()));
                }
                let records = source.search(&query).await?;
                if records.is_empty() {
                    return Err(ResponderDataError::Empty);
                }
                serde_json::to_value(records).map_err(|e| ResponderDataError::Parameters(e.to_string()))
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::ProviderRecord;
    use crate::llm::{ContentBlock, LlmResponse, Usage};
    use crate::runtime::testing::{MockLlmService, MockProviders};
    use std::time::Duration;

    fn clinic() -> ProviderRecord {
        serde_json::from_value(json!({
            "npi": 1234567890,
            "provider_org_name_legal": "Congress Avenue Clinic",
            "entity_type": "Organization",
            "latitude": 30.27,
            "longitude": -97.74
        }))
        .unwrap()
    }

    fn responder(llm: Arc<MockLlmService>, source: MockProviders) -> ProviderLookupResponder {
        ProviderLookupResponder::new(
            Generator::new(llm, Duration::from_secs(5), Duration::from_secs(5)),
            Arc::new(source),
        )
    }

    #[tokio::test]
    async fn test_search_uses_model_arguments() {
        let llm = Arc::new(MockLlmService::new());
        llm.queue_response(LlmResponse {
            content: vec![ContentBlock::tool_use(
                "call_p",
                TOOL_NAME,
                json!({"zip_code": "78701", "primary_taxonomy_description": "dentist"}),
            )],
            usage: Usage::default(),
        });
        llm.queue_text("<div class=\"provider-results\"><h3>Healthcare Providers Found</h3></div>");
        let source = MockProviders::with_records(vec![clinic()]);

        let out = responder(llm.clone(), source.clone())
            .respond(
                &ConversationLog::from_user_message("dentists near 78701"),
                &SessionState::new(None),
            )
            .await;

        assert!(out.contains("Healthcare Providers Found"));
        let queries = source.queries();
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].zip_code, "78701");
        assert_eq!(queries[0].specialty.as_deref(), Some("dentist"));

        let requests = llm.requests();
        let ContentBlock::ToolResult { content, .. } = &requests[1].messages.last().unwrap().content[0] else {
            panic!("expected tool result");
        };
        assert!(content.contains("Congress Avenue Clinic"));
        assert!(content.contains("\"latitude\":30.27"));
    }

    #[tokio::test]
    async fn test_no_records_apologizes() {
        let llm = Arc::new(MockLlmService::new());
        llm.queue_response(LlmResponse {
            content: vec![ContentBlock::tool_use("c", TOOL_NAME, json!({"zip_code": "00000"}))],
            usage: Usage::default(),
        });

        let out = responder(llm.clone(), MockProviders::empty())
            .respond(&ConversationLog::from_user_message("clinics in 00000"), &SessionState::new(None))
            .await;
        assert!(out.starts_with("<div class=\"provider-results\">"));
        assert!(out.contains("Sorry"));
        assert_eq!(llm.requests().len(), 1);
    }
}
