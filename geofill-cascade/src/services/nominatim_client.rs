//! Nominatim geocoder client
//!
//! # API Reference
//! - Endpoint: https://nominatim.openstreetmap.org/search?format=jsonv2&limit=1
//! - Usage policy: at most 1 request/second, identifying User-Agent required

use async_trait::async_trait;
use geofill_common::Coordinate;
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use reqwest::Client;
use serde::Deserialize;
use std::num::NonZeroU32;
use std::time::Duration;
use tracing::debug;

use crate::types::{EvidenceError, GeocodeHit, Geocoder};

const NOMINATIM_API_URL: &str = "https://nominatim.openstreetmap.org";

#[derive(Debug, Deserialize)]
struct Place {
    lat: String,
    lon: String,
    #[serde(default)]
    display_name: String,
}

pub struct NominatimClient {
    http_client: Client,
    base_url: String,
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
}

impl NominatimClient {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, EvidenceError> {
        let http_client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|e| EvidenceError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: NOMINATIM_API_URL.to_string(),
            rate_limiter: RateLimiter::direct(Quota::per_second(NonZeroU32::MIN)),
        })
    }

    /// Override the server (self-hosted instance)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

fn first_hit(places: Vec<Place>) -> Result<Option<GeocodeHit>, EvidenceError> {
    let Some(place) = places.into_iter().next() else {
        return Ok(None);
    };
    let lat: f64 = place
        .lat
        .trim()
        .parse()
        .map_err(|_| EvidenceError::Parse(format!("invalid latitude {:?}", place.lat)))?;
    let lon: f64 = place
        .lon
        .trim()
        .parse()
        .map_err(|_| EvidenceError::Parse(format!("invalid longitude {:?}", place.lon)))?;

    Ok(Some(GeocodeHit {
        coordinate: Coordinate::new(lat, lon),
        display_name: place.display_name,
    }))
}

#[async_trait]
impl Geocoder for NominatimClient {
    fn name(&self) -> &'static str {
        "nominatim"
    }

    async fn geocode(&self, query: &str) -> Result<Option<GeocodeHit>, EvidenceError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(None);
        }

        self.rate_limiter.until_ready().await;
        debug!(query = %query, "Nominatim search");

        let response = self
            .http_client
            .get(format!("{}/search", self.base_url))
            .query(&[("q", query), ("format", "jsonv2"), ("limit", "1")])
            .send()
            .await
            .map_err(|e| EvidenceError::from_request("Nominatim request failed", e))?;

        if !response.status().is_success() {
            return Err(EvidenceError::Api(format!(
                "Nominatim returned {}",
                response.status()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| EvidenceError::from_request("Nominatim response read failed", e))?;
        let places: Vec<Place> = serde_json::from_str(&body)
            .map_err(|e| EvidenceError::Parse(format!("Failed to parse Nominatim response: {}", e)))?;
        first_hit(places)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_hit_parses_string_coordinates() {
        let body = r#"[{"place_id":1,"lat":"48.8582599","lon":"2.2945006",
            "display_name":"Tour Eiffel, 5, Avenue Anatole France, Paris, France","category":"man_made"}]"#;
        let hit = first_hit(serde_json::from_str(body).unwrap()).unwrap().unwrap();
        assert_eq!(hit.coordinate, Coordinate::new(48.8582599, 2.2945006));
        assert!(hit.display_name.starts_with("Tour Eiffel"));
    }

    #[test]
    fn test_no_results() {
        assert!(first_hit(Vec::new()).unwrap().is_none());
    }

    #[test]
    fn test_bad_coordinate_is_parse_error() {
        let places = vec![Place {
            lat: "north".to_string(),
            lon: "1.0".to_string(),
            display_name: String::new(),
        }];
        assert!(matches!(first_hit(places), Err(EvidenceError::Parse(_))));
    }

    #[tokio::test]
    async fn test_blank_query_skips_request() {
        let client = NominatimClient::new("test", Duration::from_secs(1))
            .unwrap()
            .with_base_url("http://127.0.0.1:9");
        assert!(client.geocode("   ").await.unwrap().is_none());
    }
}
