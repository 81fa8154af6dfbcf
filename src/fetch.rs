//! Data-fetch capabilities used by the lookup responders
//!
//! Each source takes structured parameters and returns a record or nothing.
//! Sources are never retried or cached here.

mod airnow;
mod geocode;
mod npi;
mod openfda;

pub use airnow::{AirNowClient, AirQualityReading};
pub use geocode::{Coordinates, LocationIqGeocoder};
pub use npi::{NpiRegistry, ProviderQuery, ProviderRecord};
pub use openfda::OpenFdaClient;

use crate::config::SourcesConfig;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use thiserror::Error;

/// Failure talking to an external data source
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("failed to decode response: {0}")]
    Decode(String),
    #[error("{0} is not configured")]
    NotConfigured(&'static str),
}

/// Current air quality for a U.S. ZIP code
#[async_trait]
pub trait AirQualitySource: Send + Sync {
    async fn current(&self, zip_code: &str) -> Result<Option<AirQualityReading>, FetchError>;
}

/// Drug label lookup by active ingredient
#[async_trait]
pub trait MedicationSource: Send + Sync {
    async fn label(&self, ingredient: &str) -> Result<Option<serde_json::Value>, FetchError>;
}

/// Provider registry search
#[async_trait]
pub trait ProviderSource: Send + Sync {
    async fn search(&self, query: &ProviderQuery) -> Result<Vec<ProviderRecord>, FetchError>;
}

/// Address to coordinates
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn locate(&self, place: &str) -> Result<Option<Coordinates>, FetchError>;
}

/// The configured set of data sources handed to the responders
#[derive(Clone)]
pub struct DataSources {
    pub air_quality: Arc<dyn AirQualitySource>,
    pub medication: Arc<dyn MedicationSource>,
    pub providers: Arc<dyn ProviderSource>,
}

impl DataSources {
    /// Build HTTP-backed sources sharing one client.
    ///
    /// Sources with missing credentials are still built and report
    /// `NotConfigured` when called.
    pub fn from_config(config: &SourcesConfig) -> Result<Self, FetchError> {
        let client = Client::builder().timeout(config.timeout).build()?;

        let geocoder = config.geocode_key.clone().map(|key| {
            Arc::new(LocationIqGeocoder::new(client.clone(), key)) as Arc<dyn Geocoder>
        });
        if geocoder.is_none() {
            tracing::warn!("GEOLOCATION_IQ_API_KEY not set, provider results will lack coordinates");
        }

        Ok(Self {
            air_quality: Arc::new(AirNowClient::new(client.clone(), config.air_quality_key.clone())),
            medication: Arc::new(OpenFdaClient::new(client.clone())),
            providers: Arc::new(NpiRegistry::new(client, config.registry.clone(), geocoder)),
        })
    }
}

/// Send a request and decode a successful JSON body
pub(crate) async fn get_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, FetchError> {
    let response = request.send().await?;
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(FetchError::Status {
            status: status.as_u16(),
            body: truncate(&body, 200),
        });
    }

    serde_json::from_str(&body).map_err(|e| FetchError::Decode(e.to_string()))
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let head: String = s.chars().take(max).collect();
    format!("{head}...")
}
