//! OpenFDA drug label lookup

use super::{get_json, FetchError, MedicationSource};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;

const LABEL_URL: &str = "https://api.fda.gov/drug/label.json";

/// Label metadata that never reaches the formatter
const DROPPED_FIELDS: &[&str] = &["set_id", "id", "effective_time", "version", "openfda", "spl_product_data_elements"];

#[derive(Debug, Deserialize)]
struct LabelResponse {
    #[serde(default)]
    results: Vec<Value>,
}

pub struct OpenFdaClient {
    client: Client,
}

impl OpenFdaClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

fn search_term(ingredient: &str) -> String {
    format!("active_ingredient:\"{}\"", ingredient.trim().replace('"', ""))
}

fn strip_metadata(mut label: Value) -> Value {
    if let Some(fields) = label.as_object_mut() {
        for key in DROPPED_FIELDS {
            fields.remove(*key);
        }
    }
    label
}

#[async_trait]
impl MedicationSource for OpenFdaClient {
    async fn label(&self, ingredient: &str) -> Result<Option<Value>, FetchError> {
        let request = self
            .client
            .get(LABEL_URL)
            .query(&[("search", search_term(ingredient).as_str()), ("limit", "1")]);

        match get_json::<LabelResponse>(request).await {
            Ok(resp) => Ok(resp.results.into_iter().next().map(strip_metadata)),
            // OpenFDA answers an empty search with 404
            Err(FetchError::Status { status, .. }) if status == StatusCode::NOT_FOUND.as_u16() => Ok(None),
            Err(e) => Err(e),
        }
    }
}
