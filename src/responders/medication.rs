//! Drug label information from OpenFDA

use super::{parameters, Generator, Lookup, Responder, ResponderDataError};
use crate::conversation::ConversationLog;
use crate::fetch::MedicationSource;
use crate::llm::ToolDefinition;
use crate::supervisor::{ResponderName, SessionState};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

pub const TOOL_NAME: &str = "get_medication_info";

const SYSTEM_PROMPT: &str = r#"You are a medication information expert. Use the `get_medication_info` tool to retrieve drug label information from the OpenFDA Drug Label API for a given active ingredient. Never answer from memory.

Once you receive the tool response, extract these fields when available and format them as HTML:

<div class="medication-info">
<h2>Medication Information for: <em>{ingredient}</em></h2>
<ul>
  <li><strong>Active Ingredient:</strong> ...</li>
  <li><strong>Purpose:</strong> ...</li>
  <li><strong>Usage:</strong> ...</li>
  <li><strong>Dosage:</strong> ...</li>
  <li><strong>Warnings:</strong> ...</li>
  <li><strong>Inactive Ingredients:</strong> ...</li>
  <li><strong>Storage Info:</strong> ...</li>
  <li><strong>Questions or Contact:</strong> ...</li>
</ul>
</div>

Do not include raw JSON, label metadata, or empty sections. Respond only with valid HTML."#;

#[derive(Debug, Deserialize)]
struct MedicationParams {
    ingredient: String,
}

fn tool() -> ToolDefinition {
    ToolDefinition {
        name: TOOL_NAME.to_string(),
        description: "Retrieve medication label details (usage, warnings, dosage, ingredients) \
                      for an active ingredient from the OpenFDA Drug Label API."
            .to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "ingredient": {
                    "type": "string",
                    "description": "Active ingredient name, e.g. 'ibuprofen'"
                }
            },
            "required": ["ingredient"]
        }),
    }
}

pub struct MedicationResponder {
    generator: Generator,
    source: Arc<dyn MedicationSource>,
}

impl MedicationResponder {
    pub fn new(generator: Generator, source: Arc<dyn MedicationSource>) -> Self {
        Self { generator, source }
    }
}

#[async_trait]
impl Responder for MedicationResponder {
    fn name(&self) -> ResponderName {
        ResponderName::Medication
    }

    async fn respond(&self, log: &ConversationLog, _state: &SessionState) -> String {
        let lookup = Lookup {
            name: ResponderName::Medication,
            system: SYSTEM_PROMPT,
            tool: tool(),
            unavailable: "I couldn't find label information for that medication right now.",
            deadline: self.generator.fetch_timeout(),
        };
        let source = Arc::clone(&self.source);

        self.generator
            .lookup(lookup, log, |input| async move {
                let params: MedicationParams = parameters(input)?;
                let ingredient = params.ingredient.trim();
                if ingredient.is_empty() {
                    return Err(ResponderDataError::Parameters("empty ingredient".to_string()));
                }
                source.label(ingredient).await?.ok_or(ResponderDataError::Empty)
            })
            .await
    }
}
