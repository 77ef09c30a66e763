//! Google Cloud Vision client
//!
//! Calls `images:annotate` over REST with the image inlined as base64 and the
//! API key as a query parameter. One client serves all three capabilities
//! (landmark, web and text detection), one feature per request.
//!
//! # API Reference
//! - Endpoint: https://vision.googleapis.com/v1/images:annotate
//! - Errors are reported per image in `responses[0].error`

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use geofill_common::Coordinate;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

use crate::types::{
    EvidenceError, LandmarkCandidate, LandmarkDetector, TextDetector, WebEntityDetector,
};

/// Vision API endpoint
const VISION_API_URL: &str = "https://vision.googleapis.com/v1/images:annotate";

const LANDMARK_MAX_RESULTS: u32 = 5;
const WEB_MAX_RESULTS: u32 = 20;

#[derive(Debug, Default, Deserialize)]
struct BatchAnnotateResponse {
    #[serde(default)]
    responses: Vec<AnnotateImageResponse>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnnotateImageResponse {
    #[serde(default)]
    landmark_annotations: Vec<EntityAnnotation>,
    #[serde(default)]
    text_annotations: Vec<EntityAnnotation>,
    #[serde(default)]
    web_detection: Option<WebDetection>,
    #[serde(default)]
    error: Option<Status>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EntityAnnotation {
    #[serde(default)]
    description: String,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    locations: Vec<LocationInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LocationInfo {
    lat_lng: Option<LatLng>,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    #[serde(default)]
    latitude: f64,
    #[serde(default)]
    longitude: f64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WebDetection {
    #[serde(default)]
    web_entities: Vec<WebEntity>,
    #[serde(default)]
    best_guess_labels: Vec<WebLabel>,
}

#[derive(Debug, Deserialize)]
struct WebEntity {
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WebLabel {
    label: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Status {
    #[serde(default)]
    message: String,
}

/// Vision REST client
///
/// Without an API key every call fails with `NotAvailable`, which the
/// resolvers record as `*_error` events.
pub struct VisionClient {
    http_client: Client,
    api_key: Option<String>,
    endpoint: String,
}

impl VisionClient {
    pub fn new(api_key: Option<String>) -> Result<Self, EvidenceError> {
        let http_client = Client::builder()
            .build()
            .map_err(|e| EvidenceError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            endpoint: VISION_API_URL.to_string(),
        })
    }

    /// Override the endpoint (test servers, proxies)
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    async fn annotate(
        &self,
        image: &[u8],
        feature: &str,
        max_results: u32,
        timeout: Duration,
    ) -> Result<AnnotateImageResponse, EvidenceError> {
        let key = self
            .api_key
            .as_deref()
            .ok_or_else(|| EvidenceError::NotAvailable("vision api key not configured".to_string()))?;

        debug!(feature = feature, bytes = image.len(), "Vision request");

        let body = json!({
            "requests": [{
                "image": { "content": general_purpose::STANDARD.encode(image) },
                "features": [{ "type": feature, "maxResults": max_results }]
            }]
        });

        let response = self
            .http_client
            .post(&self.endpoint)
            .query(&[("key", key)])
            .timeout(timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| EvidenceError::from_request("Vision request failed", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(EvidenceError::Api(format!(
                "Vision API returned {}: {}",
                status,
                text.chars().take(300).collect::<String>()
            )));
        }

        let text = response
            .text()
            .await
            .map_err(|e| EvidenceError::from_request("Vision response read failed", e))?;
        parse_annotate_response(&text)
    }
}

fn parse_annotate_response(body: &str) -> Result<AnnotateImageResponse, EvidenceError> {
    let batch: BatchAnnotateResponse = serde_json::from_str(body)
        .map_err(|e| EvidenceError::Parse(format!("Failed to parse Vision response: {}", e)))?;
    let first = batch.responses.into_iter().next().unwrap_or_default();

    if let Some(error) = &first.error {
        if !error.message.is_empty() {
            return Err(EvidenceError::Api(error.message.clone()));
        }
    }
    Ok(first)
}

fn top_landmark(response: AnnotateImageResponse) -> Option<LandmarkCandidate> {
    let top = response.landmark_annotations.into_iter().next()?;
    let coordinate = top
        .locations
        .iter()
        .find_map(|l| l.lat_lng.as_ref())
        .map(|ll| Coordinate::new(ll.latitude, ll.longitude));

    Some(LandmarkCandidate {
        label: top.description,
        score: top.score,
        coordinate,
    })
}

/// Best-guess labels first, then web entities
fn web_labels(response: AnnotateImageResponse) -> Vec<String> {
    let Some(web) = response.web_detection else {
        return Vec::new();
    };
    web.best_guess_labels
        .into_iter()
        .filter_map(|l| l.label)
        .chain(web.web_entities.into_iter().filter_map(|e| e.description))
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .collect()
}

/// Full text block (the first text annotation)
fn full_text(response: AnnotateImageResponse) -> Option<String> {
    response
        .text_annotations
        .into_iter()
        .next()
        .map(|a| a.description.trim().to_string())
        .filter(|t| !t.is_empty())
}

#[async_trait]
impl LandmarkDetector for VisionClient {
    fn name(&self) -> &'static str {
        "gcv"
    }

    async fn detect_landmark(
        &self,
        image: &[u8],
        timeout: Duration,
    ) -> Result<Option<LandmarkCandidate>, EvidenceError> {
        let response = self
            .annotate(image, "LANDMARK_DETECTION", LANDMARK_MAX_RESULTS, timeout)
            .await?;
        Ok(top_landmark(response))
    }
}

#[async_trait]
impl WebEntityDetector for VisionClient {
    async fn detect_web_labels(
        &self,
        image: &[u8],
        timeout: Duration,
    ) -> Result<Vec<String>, EvidenceError> {
        let response = self
            .annotate(image, "WEB_DETECTION", WEB_MAX_RESULTS, timeout)
            .await?;
        Ok(web_labels(response))
    }
}

#[async_trait]
impl TextDetector for VisionClient {
    async fn detect_text(
        &self,
        image: &[u8],
        timeout: Duration,
    ) -> Result<Option<String>, EvidenceError> {
        let response = self.annotate(image, "TEXT_DETECTION", 1, timeout).await?;
        Ok(full_text(response))
    }
}
