//! Scripted collaborators for integration tests
//!
//! Image bytes in the test folders are the file name itself, so the vision
//! mock can script responses per photo by name.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use geofill_cascade::types::{
    display_name, EvidenceError, Fingerprint, Fingerprinter, GeocodeHit, Geocoder, KnowledgeBase,
    KnowledgePage, LandmarkCandidate, LandmarkDetector, MetadataReader, MetadataWriter,
    PhotoMetadata, TextDetector, WebEntityDetector, WriteError,
};
use geofill_common::Coordinate;

/// Which vision capability was called
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisionCall {
    Landmark,
    Web,
    Text,
}

/// Vision provider scripted per photo name
#[derive(Default)]
pub struct MockVision {
    landmarks: Mutex<HashMap<String, LandmarkCandidate>>,
    web: Mutex<HashMap<String, Vec<String>>>,
    text: Mutex<HashMap<String, String>>,
    failing: Mutex<HashSet<String>>,
    calls: Mutex<Vec<(String, VisionCall)>>,
}

impl MockVision {
    pub fn landmark(&self, photo: &str, label: &str, score: f32, coordinate: Option<Coordinate>) {
        self.landmarks.lock().unwrap().insert(
            photo.to_string(),
            LandmarkCandidate {
                label: label.to_string(),
                score,
                coordinate,
            },
        );
    }

    pub fn web_labels(&self, photo: &str, labels: &[&str]) {
        self.web
            .lock()
            .unwrap()
            .insert(photo.to_string(), labels.iter().map(|l| l.to_string()).collect());
    }

    pub fn text(&self, photo: &str, text: &str) {
        self.text.lock().unwrap().insert(photo.to_string(), text.to_string());
    }

    /// Every capability fails for this photo
    pub fn fail(&self, photo: &str) {
        self.failing.lock().unwrap().insert(photo.to_string());
    }

    /// Photos for which `kind` was called, in call order
    pub fn calls(&self, kind: VisionCall) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, k)| *k == kind)
            .map(|(photo, _)| photo.clone())
            .collect()
    }

    fn begin(&self, image: &[u8], kind: VisionCall) -> Result<String, EvidenceError> {
        let photo = String::from_utf8_lossy(image).to_string();
        self.calls.lock().unwrap().push((photo.clone(), kind));
        if self.failing.lock().unwrap().contains(&photo) {
            return Err(EvidenceError::Api("scripted failure".to_string()));
        }
        Ok(photo)
    }
}

#[async_trait]
impl LandmarkDetector for MockVision {
    fn name(&self) -> &'static str {
        "gcv"
    }

    async fn detect_landmark(
        &self,
        image: &[u8],
        _timeout: Duration,
    ) -> Result<Option<LandmarkCandidate>, EvidenceError> {
        let photo = self.begin(image, VisionCall::Landmark)?;
        Ok(self.landmarks.lock().unwrap().get(&photo).cloned())
    }
}

#[async_trait]
impl WebEntityDetector for MockVision {
    async fn detect_web_labels(
        &self,
        image: &[u8],
        _timeout: Duration,
    ) -> Result<Vec<String>, EvidenceError> {
        let photo = self.begin(image, VisionCall::Web)?;
        Ok(self.web.lock().unwrap().get(&photo).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl TextDetector for MockVision {
    async fn detect_text(
        &self,
        image: &[u8],
        _timeout: Duration,
    ) -> Result<Option<String>, EvidenceError> {
        let photo = self.begin(image, VisionCall::Text)?;
        Ok(self.text.lock().unwrap().get(&photo).cloned())
    }
}

/// Knowledge base returning an article whenever the query mentions its keyword
#[derive(Default)]
pub struct MockKnowledgeBase {
    articles: Mutex<Vec<(String, KnowledgePage)>>,
    searches: Mutex<Vec<String>>,
}

impl MockKnowledgeBase {
    pub fn article(&self, keyword: &str, title: &str, summary: &str, coordinate: Coordinate) {
        self.articles.lock().unwrap().push((
            keyword.to_lowercase(),
            KnowledgePage {
                title: title.to_string(),
                summary: summary.to_string(),
                coordinate: Some(coordinate),
            },
        ));
    }

    pub fn searches(&self) -> Vec<String> {
        self.searches.lock().unwrap().clone()
    }
}

#[async_trait]
impl KnowledgeBase for MockKnowledgeBase {
    fn name(&self) -> &'static str {
        "wikipedia"
    }

    async fn search(
        &self,
        query: &str,
        _lang: &str,
        limit: usize,
    ) -> Result<Vec<String>, EvidenceError> {
        self.searches.lock().unwrap().push(query.to_string());
        let query = query.to_lowercase();
        Ok(self
            .articles
            .lock()
            .unwrap()
            .iter()
            .filter(|(keyword, _)| query.contains(keyword.as_str()))
            .map(|(_, page)| page.title.clone())
            .take(limit)
            .collect())
    }

    async fn page(&self, title: &str, _lang: &str) -> Result<Option<KnowledgePage>, EvidenceError> {
        Ok(self
            .articles
            .lock()
            .unwrap()
            .iter()
            .find(|(_, page)| page.title == title)
            .map(|(_, page)| page.clone()))
    }
}

/// Geocoder answering queries that contain a registered fragment
#[derive(Default)]
pub struct MockGeocoder {
    places: Mutex<Vec<(String, GeocodeHit)>>,
    queries: Mutex<Vec<String>>,
}

impl MockGeocoder {
    pub fn place(&self, fragment: &str, coordinate: Coordinate, display_name: &str) {
        self.places.lock().unwrap().push((
            fragment.to_lowercase(),
            GeocodeHit {
                coordinate,
                display_name: display_name.to_string(),
            },
        ));
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl Geocoder for MockGeocoder {
    fn name(&self) -> &'static str {
        "nominatim"
    }

    async fn geocode(&self, query: &str) -> Result<Option<GeocodeHit>, EvidenceError> {
        self.queries.lock().unwrap().push(query.to_string());
        let query = query.to_lowercase();
        Ok(self
            .places
            .lock()
            .unwrap()
            .iter()
            .find(|(fragment, _)| query.contains(fragment.as_str()))
            .map(|(_, hit)| hit.clone()))
    }
}

/// Metadata keyed by file name; unknown files fail to read
#[derive(Default)]
pub struct MockReader {
    metadata: Mutex<HashMap<String, PhotoMetadata>>,
}

impl MockReader {
    pub fn set(&self, photo: &str, metadata: PhotoMetadata) {
        self.metadata.lock().unwrap().insert(photo.to_string(), metadata);
    }
}

#[async_trait]
impl MetadataReader for MockReader {
    async fn read_metadata(&self, path: &Path) -> Result<PhotoMetadata, EvidenceError> {
        self.metadata
            .lock()
            .unwrap()
            .get(&display_name(path))
            .cloned()
            .ok_or_else(|| EvidenceError::Parse("no metadata".to_string()))
    }
}

/// A recorded coordinate write
#[derive(Debug, Clone, PartialEq)]
pub struct WriteCall {
    pub path: PathBuf,
    pub coordinate: Coordinate,
    pub note: Option<String>,
}

/// Writer that records calls; can be made unavailable or fail per photo
pub struct MockWriter {
    available: AtomicBool,
    failing: Mutex<HashSet<String>>,
    failing_once: Mutex<HashSet<String>>,
    writes: Mutex<Vec<WriteCall>>,
}

impl Default for MockWriter {
    fn default() -> Self {
        Self {
            available: AtomicBool::new(true),
            failing: Mutex::new(HashSet::new()),
            failing_once: Mutex::new(HashSet::new()),
            writes: Mutex::new(Vec::new()),
        }
    }
}

impl MockWriter {
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn fail_for(&self, photo: &str) {
        self.failing.lock().unwrap().insert(photo.to_string());
    }

    /// Fail only the next write to `photo`
    pub fn fail_once(&self, photo: &str) {
        self.failing_once.lock().unwrap().insert(photo.to_string());
    }

    pub fn writes(&self) -> Vec<WriteCall> {
        self.writes.lock().unwrap().clone()
    }

    pub fn written(&self, photo: &str) -> Option<WriteCall> {
        self.writes()
            .into_iter()
            .find(|w| display_name(&w.path) == photo)
    }
}

#[async_trait]
impl MetadataWriter for MockWriter {
    fn name(&self) -> &'static str {
        "mockwriter"
    }

    async fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    async fn write_coordinate(
        &self,
        path: &Path,
        coordinate: Coordinate,
        note: Option<&str>,
    ) -> Result<(), WriteError> {
        let name = display_name(path);
        let fails_now = self.failing_once.lock().unwrap().remove(&name);
        if fails_now || self.failing.lock().unwrap().contains(&name) {
            return Err(WriteError::ToolFailed {
                tool: "mockwriter".to_string(),
                status: "exit status: 1".to_string(),
                stderr: "scripted failure".to_string(),
            });
        }
        self.writes.lock().unwrap().push(WriteCall {
            path: path.to_path_buf(),
            coordinate,
            note: note.map(str::to_string),
        });
        Ok(())
    }
}

/// Fingerprints keyed by file name; unknown files have none
#[derive(Default)]
pub struct MockFingerprinter {
    fingerprints: Mutex<HashMap<String, u64>>,
}

impl MockFingerprinter {
    pub fn set(&self, photo: &str, fingerprint: u64) {
        self.fingerprints
            .lock()
            .unwrap()
            .insert(photo.to_string(), fingerprint);
    }
}

#[async_trait]
impl Fingerprinter for MockFingerprinter {
    async fn fingerprint(&self, path: &Path) -> Result<Fingerprint, EvidenceError> {
        self.fingerprints
            .lock()
            .unwrap()
            .get(&display_name(path))
            .copied()
            .map(Fingerprint)
            .ok_or_else(|| EvidenceError::NotAvailable("no fingerprint".to_string()))
    }
}
