//! AirNow current observations by ZIP code

use super::{get_json, AirQualitySource, FetchError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

const OBSERVATION_URL: &str = "https://www.airnowapi.org/aq/observation/zipCode/current/";
const SEARCH_DISTANCE_MILES: u32 = 25;

/// First pollutant reported for the area
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AirQualityReading {
    pub area: String,
    pub state: String,
    pub latitude: f64,
    pub longitude: f64,
    pub pollutant: String,
    pub aqi: i32,
    pub category: String,
    pub observed_date: String,
    pub observed_hour: u32,
    pub timezone: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Observation {
    reporting_area: String,
    state_code: String,
    latitude: f64,
    longitude: f64,
    parameter_name: String,
    #[serde(rename = "AQI")]
    aqi: i32,
    category: Category,
    date_observed: String,
    hour_observed: u32,
    local_time_zone: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Category {
    name: String,
}

impl From<Observation> for AirQualityReading {
    fn from(o: Observation) -> Self {
        Self {
            area: o.reporting_area,
            state: o.state_code,
            latitude: o.latitude,
            longitude: o.longitude,
            pollutant: o.parameter_name,
            aqi: o.aqi,
            category: o.category.name,
            observed_date: o.date_observed.trim().to_string(),
            observed_hour: o.hour_observed,
            timezone: o.local_time_zone,
        }
    }
}

pub struct AirNowClient {
    client: Client,
    api_key: Option<String>,
}

impl AirNowClient {
    pub fn new(client: Client, api_key: Option<String>) -> Self {
        Self { client, api_key }
    }
}

fn first_reading(observations: Vec<Observation>) -> Option<AirQualityReading> {
    observations.into_iter().next().map(AirQualityReading::from)
}

#[async_trait]
impl AirQualitySource for AirNowClient {
    async fn current(&self, zip_code: &str) -> Result<Option<AirQualityReading>, FetchError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(FetchError::NotConfigured("AIR_QUALITY_API_KEY"))?;

        let distance = SEARCH_DISTANCE_MILES.to_string();
        let request = self.client.get(OBSERVATION_URL).query(&[
            ("format", "application/json"),
            ("zipCode", zip_code.trim()),
            ("distance", distance.as_str()),
            ("API_KEY", api_key),
        ]);

        let observations: Vec<Observation> = get_json(request).await?;
        tracing::debug!(zip_code, count = observations.len(), "AirNow observations");
        Ok(first_reading(observations))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_observation_maps_to_reading() {
        let observations: Vec<Observation> = serde_json::from_value(json!([
            {
                "DateObserved": "2025-06-01 ",
                "HourObserved": 14,
                "LocalTimeZone": "PST",
                "ReportingArea": "NW Coastal LA",
                "StateCode": "CA",
                "Latitude": 34.0505,
                "Longitude": -118.4566,
                "ParameterName": "O3",
                "AQI": 42,
                "Category": {"Number": 1, "Name": "Good"}
            },
            {
                "DateObserved": "2025-06-01 ",
                "HourObserved": 14,
                "LocalTimeZone": "PST",
                "ReportingArea": "NW Coastal LA",
                "StateCode": "CA",
                "Latitude": 34.0505,
                "Longitude": -118.4566,
                "ParameterName": "PM2.5",
                "AQI": 55,
                "Category": {"Number": 2, "Name": "Moderate"}
            }
        ]))
        .unwrap();

        let reading = first_reading(observations).unwrap();
        assert_eq!(reading.area, "NW Coastal LA");
        assert_eq!(reading.pollutant, "O3");
        assert_eq!(reading.aqi, 42);
        assert_eq!(reading.category, "Good");
        assert_eq!(reading.observed_date, "2025-06-01");
    }

    #[test]
    fn test_no_observations_is_absence() {
        assert!(first_reading(Vec::new()).is_none());
    }

    #[tokio::test]
    async fn test_missing_key_reports_not_configured() {
        let client = AirNowClient::new(Client::new(), None);
        let err = client.current("90210").await.unwrap_err();
        assert!(matches!(err, FetchError::NotConfigured("AIR_QUALITY_API_KEY")));
    }
}
