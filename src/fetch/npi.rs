//! NPI provider registry served from a Supabase (PostgREST) table

use super::{get_json, FetchError, Geocoder, ProviderSource};
use crate::config::RegistryConfig;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

const RESULT_LIMIT: usize = 20;

/// NPI entity type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityType {
    #[default]
    Organization,
    Individual,
}

impl EntityType {
    fn as_str(self) -> &'static str {
        match self {
            EntityType::Organization => "Organization",
            EntityType::Individual => "Individual",
        }
    }
}

/// Search parameters, as supplied in the model's tool call
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProviderQuery {
    pub zip_code: String,
    #[serde(default, rename = "primary_taxonomy_description")]
    pub specialty: Option<String>,
    #[serde(default)]
    pub entity_type: EntityType,
}

/// One registry row, enriched with coordinates when geocoding succeeds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderRecord {
    #[serde(flatten)]
    pub fields: Map<String, Value>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

impl ProviderRecord {
    /// Street, city, state and postal code joined for geocoding
    pub fn address(&self) -> String {
        ["practice_street_address", "practice_city_name", "practice_state_name", "practice_postal_code"]
            .iter()
            .filter_map(|key| self.fields.get(*key))
            .filter_map(|v| match v {
                Value::String(s) => Some(s.trim().to_string()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

pub struct NpiRegistry {
    client: Client,
    config: RegistryConfig,
    geocoder: Option<Arc<dyn Geocoder>>,
}

impl NpiRegistry {
    pub fn new(client: Client, config: RegistryConfig, geocoder: Option<Arc<dyn Geocoder>>) -> Self {
        Self {
            client,
            config,
            geocoder,
        }
    }

    /// PostgREST filter parameters for a query
    fn filters(query: &ProviderQuery) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("select", "*".to_string()),
            ("zip_code", format!("eq.{}", query.zip_code.trim())),
            ("entity_type", format!("eq.{}", query.entity_type.as_str())),
            ("limit", RESULT_LIMIT.to_string()),
        ];
        if let Some(specialty) = query.specialty.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            params.push(("primary_taxonomy_description", format!("ilike.*{specialty}*")));
        }
        params
    }

    async fn enrich(&self, records: &mut [ProviderRecord]) {
        let Some(geocoder) = &self.geocoder else {
            return;
        };
        for record in records.iter_mut() {
            let address = record.address();
            if address.is_empty() {
                continue;
            }
            match geocoder.locate(&address).await {
                Ok(Some(coords)) => {
                    record.latitude = Some(coords.latitude);
                    record.longitude = Some(coords.longitude);
                }
                Ok(None) => tracing::debug!(%address, "No geocode match"),
                Err(e) => tracing::warn!(%address, error = %e, "Geocoding failed"),
            }
        }
    }
}

#[async_trait]
impl ProviderSource for NpiRegistry {
    async fn search(&self, query: &ProviderQuery) -> Result<Vec<ProviderRecord>, FetchError> {
        let (Some(url), Some(key), Some(table)) = (&self.config.url, &self.config.key, &self.config.table) else {
            return Err(FetchError::NotConfigured("SUPABASE_URL/SUPABASE_KEY/SUPABASE_TABLE"));
        };

        let endpoint = format!("{}/rest/v1/{table}", url.trim_end_matches('/'));
        let request = self
            .client
            .get(endpoint)
            .header("apikey", key)
            .bearer_auth(key)
            .query(&Self::filters(query));

        let mut records: Vec<ProviderRecord> = get_json(request).await?;
        tracing::info!(
            zip_code = %query.zip_code,
            specialty = ?query.specialty,
            count = records.len(),
            "Provider registry search"
        );

        self.enrich(&mut records).await;
        Ok(records)
    }
}
