//! LocationIQ forward geocoding

use super::{get_json, FetchError, Geocoder};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

const SEARCH_URL: &str = "https://us1.locationiq.com/v1/search.php";

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// LocationIQ returns coordinates as strings
#[derive(Debug, Deserialize)]
struct Place {
    lat: String,
    lon: String,
}

impl Place {
    fn coordinates(&self) -> Result<Coordinates, FetchError> {
        let parse = |s: &str| {
            s.parse::<f64>()
                .map_err(|e| FetchError::Decode(format!("bad coordinate {s:?}: {e}")))
        };
        Ok(Coordinates {
            latitude: parse(&self.lat)?,
            longitude: parse(&self.lon)?,
        })
    }
}

pub struct LocationIqGeocoder {
    client: Client,
    api_key: String,
}

impl LocationIqGeocoder {
    pub fn new(client: Client, api_key: String) -> Self {
        Self { client, api_key }
    }
}

#[async_trait]
impl Geocoder for LocationIqGeocoder {
    async fn locate(&self, place: &str) -> Result<Option<Coordinates>, FetchError> {
        let request = self.client.get(SEARCH_URL).query(&[
            ("key", self.api_key.as_str()),
            ("q", place),
            ("format", "json"),
        ]);
        let places: Vec<Place> = get_json(request).await?;
        places.first().map(Place::coordinates).transpose()
    }
}
