//! Current air quality by ZIP code

use super::{parameters, Generator, Lookup, Responder, ResponderDataError};
use crate::conversation::ConversationLog;
use crate::fetch::AirQualitySource;
use crate::llm::ToolDefinition;
use crate::supervisor::{ResponderName, SessionState};
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use serde_json::json;
use std::sync::{Arc, LazyLock};

pub const TOOL_NAME: &str = "get_air_quality";

static ZIP_CODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{5}$").expect("hardcoded regex"));

const SYSTEM_PROMPT: &str = r#"You are an air quality monitoring assistant.

Use the `get_air_quality` tool to retrieve the current Air Quality Index (AQI) for the U.S. ZIP code the user gives. Never guess a ZIP code.

Display the data in this HTML block:

<div class="air-quality-info">
<h2>Current Air Quality Report</h2>
<ul>
  <li><strong>Area:</strong> {area}</li>
  <li><strong>State:</strong> {state}</li>
  <li><strong>Latitude:</strong> {latitude}</li>
  <li><strong>Longitude:</strong> {longitude}</li>
  <li><strong>Pollutant:</strong> {pollutant} ({pollutant_description})</li>
  <li><strong>AQI:</strong> {aqi}</li>
  <li><strong>Category:</strong> {category}</li>
  <li><strong>Observed Date:</strong> {observed_date}</li>
  <li><strong>Observed Hour:</strong> {observed_hour} {timezone}</li>
</ul>
<p>Values based on data from AirNow API. Always refer to local authorities for health precautions.</p>
</div>

For the pollutant description write a 6-10 word plain-language note naming a common source or general health effect, using cautious "can/may" phrasing. If the code is unknown write "air pollutant; details unknown".
Use only div, ul, li, p, strong and h2. Respond only with valid HTML."#;

#[derive(Debug, Deserialize)]
struct AirQualityParams {
    zip_code: String,
}

fn tool() -> ToolDefinition {
    ToolDefinition {
        name: TOOL_NAME.to_string(),
        description: "Fetch the current air quality index (AQI) for a U.S. ZIP code from AirNow."
            .to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "zip_code": {
                    "type": "string",
                    "description": "5-digit U.S. ZIP code, e.g. '90210'"
                }
            },
            "required": ["zip_code"]
        }),
    }
}

pub struct AirQualityResponder {
    generator: Generator,
    source: Arc<dyn AirQualitySource>,
}

impl AirQualityResponder {
    pub fn new(generator: Generator, source: Arc<dyn AirQualitySource>) -> Self {
        Self { generator, source }
    }
}

#[async_trait]
impl Responder for AirQualityResponder {
    fn name(&self) -> ResponderName {
        ResponderName::AirQuality
    }

    async fn respond(&self, log: &ConversationLog, _state: &SessionState) -> String {
        let lookup = Lookup {
            name: ResponderName::AirQuality,
            system: SYSTEM_PROMPT,
            tool: tool(),
            unavailable: "I couldn't find air quality data for that ZIP code right now.",
            deadline: self.generator.fetch_timeout(),
        };
        let source = Arc::clone(&self.source);

        self.generator
            .lookup(lookup, log, |input| async move {
                let params: AirQualityParams = parameters(input)?;
                let zip_code = params.zip_code.trim();
                if !ZIP_CODE.is_match(zip_code) {
                    return Err(ResponderDataError::Parameters(format!("not a ZIP code: {zip_code:?}")));
                }
                let reading = source.current(zip_code).await?.ok_or(ResponderDataError::Empty)?;
                serde_json::to_value(reading).map_err(|e| ResponderDataError::Parameters(e.to_string()))
            })
            .await
    }
}
