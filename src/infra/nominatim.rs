use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::app::ports::{GeocodeHit, GeocoderPort};
use crate::config::GeocoderConfig;
use crate::error::{GeocodeError, Result};

/// Nominatim `/search` client. Uses the HTTP client's default timeout.
pub struct NominatimGeocoder {
    client: reqwest::Client,
    search_url: String,
}

#[derive(Debug, Deserialize)]
struct Place {
    lat: serde_json::Value,
    lon: serde_json::Value,
    #[serde(default)]
    address: Option<PlaceAddress>,
}

#[derive(Debug, Default, Deserialize)]
struct PlaceAddress {
    state: Option<String>,
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
}

fn coordinate(value: &serde_json::Value, field: &str) -> std::result::Result<f64, GeocodeError> {
    let parsed = match value {
        serde_json::Value::String(s) => s.trim().parse().ok(),
        serde_json::Value::Number(n) => n.as_f64(),
        _ => None,
    };
    parsed.ok_or_else(|| GeocodeError::BadResponse(format!("unparseable {field}: {value}")))
}

impl NominatimGeocoder {
    pub fn new(config: &GeocoderConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self {
            client,
            search_url: format!("{}/search", config.endpoint.trim_end_matches('/')),
        })
    }
}

#[async_trait]
impl GeocoderPort for NominatimGeocoder {
    async fn search(&self, query: &str) -> std::result::Result<Vec<GeocodeHit>, GeocodeError> {
        debug!(query, "geocoding");
        let resp = self
            .client
            .get(&self.search_url)
            .query(&[
                ("format", "json"),
                ("q", query),
                ("limit", "1"),
                ("addressdetails", "1"),
                ("accept-language", "fr"),
            ])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(GeocodeError::Status(status.as_u16()));
        }

        let places: Vec<Place> = resp
            .json()
            .await
            .map_err(|e| GeocodeError::BadResponse(e.to_string()))?;

        places
            .into_iter()
            .map(|place| {
                let address = place.address.unwrap_or_default();
                Ok(GeocodeHit {
                    latitude: coordinate(&place.lat, "lat")?,
                    longitude: coordinate(&place.lon, "lon")?,
                    state: address.state,
                    city: address.city,
                    town: address.town,
                    village: address.village,
                })
            })
            .collect()
    }
}
