//! Core Types and Trait Definitions for geofill-cascade
//!
//! Defines the collaborator traits the resolution pipeline talks to:
//! - **Vision:** LandmarkDetector, WebEntityDetector, TextDetector
//! - **Geocoding:** KnowledgeBase, Geocoder
//! - **Metadata:** MetadataReader, MetadataWriter
//! - **Fingerprinting:** Fingerprinter
//!
//! Every service failure is expressed as `EvidenceError` so the pipeline can
//! log it and fall through to the next evidence source. Persistence failures
//! use the separate `WriteError`.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use geofill_common::Coordinate;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::gazetteer::hint_tokens;

/// Search radius around the active bias point
pub const DEFAULT_BIAS_RADIUS_KM: f64 = 20.0;

// ============================================================================
// Photos
// ============================================================================

/// Photo enumerated from a folder, in capture order
#[derive(Debug, Clone)]
pub struct Photo {
    /// Path to the image file
    pub path: PathBuf,
    /// Best-available capture timestamp
    pub captured_at: NaiveDateTime,
    /// Coordinate already present in the file's metadata
    pub gps: Option<Coordinate>,
}

impl Photo {
    pub fn file_name(&self) -> String {
        display_name(&self.path)
    }
}

/// Final path component, or the full path when there is none
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// Metadata read from an image file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PhotoMetadata {
    /// Existing GPS coordinate
    pub gps: Option<Coordinate>,
    /// Capture timestamp (DateTimeOriginal, then DateTime)
    pub captured_at: Option<NaiveDateTime>,
}

/// Perceptual fingerprint of an image (64-bit pHash)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint(pub u64);

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

// ============================================================================
// Bias
// ============================================================================

/// Geographic bias active for one photo
///
/// Derived from the folder's hint index (or the global hint). Candidates from
/// any evidence source must fall within `max_km` of `center`.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchBias {
    /// Hint coordinate
    pub center: Coordinate,
    /// Hint place name
    pub hint: String,
    /// Acceptance radius in kilometres
    pub max_km: f64,
    /// Meaningful words of the hint, used to reject same-radius false matches
    pub tokens: Vec<String>,
}

impl SearchBias {
    pub fn new(center: Coordinate, hint: impl Into<String>) -> Self {
        let hint = hint.into();
        Self {
            center,
            tokens: hint_tokens(&hint),
            hint,
            max_km: DEFAULT_BIAS_RADIUS_KM,
        }
    }

    /// Whether `coordinate` lies inside the bias radius
    pub fn admits(&self, coordinate: &Coordinate) -> bool {
        coordinate.within_km(&self.center, self.max_km)
    }
}

/// True when there is no bias or the coordinate is inside it
pub fn within_bias(coordinate: &Coordinate, bias: Option<&SearchBias>) -> bool {
    bias.map_or(true, |b| b.admits(coordinate))
}

// ============================================================================
// Service results
// ============================================================================

/// Top landmark returned by a landmark detector
#[derive(Debug, Clone, PartialEq)]
pub struct LandmarkCandidate {
    pub label: String,
    /// Detector confidence (0.0-1.0)
    pub score: f32,
    pub coordinate: Option<Coordinate>,
}

/// Knowledge-base article with its declared location
#[derive(Debug, Clone, PartialEq)]
pub struct KnowledgePage {
    pub title: String,
    pub summary: String,
    pub coordinate: Option<Coordinate>,
}

/// General-purpose geocoder hit
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodeHit {
    pub coordinate: Coordinate,
    pub display_name: String,
}

/// Which gazetteer strategy produced a match
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GazetteerSource {
    /// Knowledge-base article in a given language edition
    KnowledgeBase { provider: String, lang: String },
    /// General-purpose geocoder
    Geocoder { provider: String },
}

impl fmt::Display for GazetteerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GazetteerSource::KnowledgeBase { provider, lang } => write!(f, "{}-{}", provider, lang),
            GazetteerSource::Geocoder { provider } => write!(f, "{}", provider),
        }
    }
}

/// Place name resolved to a coordinate
#[derive(Debug, Clone, PartialEq)]
pub struct GazetteerMatch {
    pub coordinate: Coordinate,
    /// Article title or query text that matched
    pub label: String,
    pub source: GazetteerSource,
}

// ============================================================================
// Errors
// ============================================================================

/// Evidence source failure
///
/// Always non-fatal: the pipeline records it and moves to the next source.
#[derive(Debug, Error)]
pub enum EvidenceError {
    /// I/O error (file read)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Network communication error
    #[error("Network error: {0}")]
    Network(String),

    /// Request exceeded its timeout
    #[error("Timeout: {0}")]
    Timeout(String),

    /// External API error
    #[error("API error: {0}")]
    Api(String),

    /// Failed to parse response or data
    #[error("Parse error: {0}")]
    Parse(String),

    /// Source not configured or not installed
    #[error("Not available: {0}")]
    NotAvailable(String),

    /// Internal processing error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl EvidenceError {
    /// Classify a reqwest failure, keeping timeouts distinct
    pub fn from_request(context: &str, e: reqwest::Error) -> Self {
        if e.is_timeout() {
            EvidenceError::Timeout(format!("{}: {}", context, e))
        } else {
            EvidenceError::Network(format!("{}: {}", context, e))
        }
    }
}

/// Metadata persistence failure
#[derive(Debug, Error)]
pub enum WriteError {
    /// Writer tool could not be started
    #[error("failed to launch {tool}: {message}")]
    Launch { tool: String, message: String },

    /// Writer tool ran and reported failure
    #[error("{tool} exited with {status}: {stderr}")]
    ToolFailed {
        tool: String,
        status: String,
        stderr: String,
    },

    /// I/O error around the write
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

// ============================================================================
// Collaborator traits
// ============================================================================

/// Landmark recognition capability
#[async_trait]
pub trait LandmarkDetector: Send + Sync {
    /// Provider name used in notes and labels
    fn name(&self) -> &'static str;

    /// Top landmark candidate, or `None` when nothing was recognized
    async fn detect_landmark(
        &self,
        image: &[u8],
        timeout: Duration,
    ) -> Result<Option<LandmarkCandidate>, EvidenceError>;
}

/// Visual web-entity / best-guess capability
#[async_trait]
pub trait WebEntityDetector: Send + Sync {
    /// Candidate labels, best guesses first, in provider order
    async fn detect_web_labels(
        &self,
        image: &[u8],
        timeout: Duration,
    ) -> Result<Vec<String>, EvidenceError>;
}

/// Text detection (OCR) capability
#[async_trait]
pub trait TextDetector: Send + Sync {
    /// Full recognized text, or `None` when the image has no text
    async fn detect_text(
        &self,
        image: &[u8],
        timeout: Duration,
    ) -> Result<Option<String>, EvidenceError>;
}

/// Structured knowledge base with geotagged articles
#[async_trait]
pub trait KnowledgeBase: Send + Sync {
    fn name(&self) -> &'static str;

    /// Article titles matching `query` in language edition `lang`
    async fn search(
        &self,
        query: &str,
        lang: &str,
        limit: usize,
    ) -> Result<Vec<String>, EvidenceError>;

    /// Fetch an article; `None` when it does not exist
    async fn page(&self, title: &str, lang: &str) -> Result<Option<KnowledgePage>, EvidenceError>;
}

/// General-purpose name → coordinate geocoder
#[async_trait]
pub trait Geocoder: Send + Sync {
    fn name(&self) -> &'static str;

    async fn geocode(&self, query: &str) -> Result<Option<GeocodeHit>, EvidenceError>;
}

/// Reads existing GPS and capture time from an image
#[async_trait]
pub trait MetadataReader: Send + Sync {
    async fn read_metadata(&self, path: &Path) -> Result<PhotoMetadata, EvidenceError>;
}

/// Persists a coordinate into an image file
///
/// On success the file's access/modification times are refreshed so
/// downstream indexers pick up the change.
#[async_trait]
pub trait MetadataWriter: Send + Sync {
    /// Writer name recorded in outcome rows
    fn name(&self) -> &'static str;

    /// Whether the writer can be used at all
    async fn is_available(&self) -> bool;

    async fn write_coordinate(
        &self,
        path: &Path,
        coordinate: Coordinate,
        note: Option<&str>,
    ) -> Result<(), WriteError>;
}

/// Computes perceptual fingerprints
#[async_trait]
pub trait Fingerprinter: Send + Sync {
    async fn fingerprint(&self, path: &Path) -> Result<Fingerprint, EvidenceError>;
}

// ============================================================================
// Tests
// ============================================================================
