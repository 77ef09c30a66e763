//! Shared utilities for geofill-cascade integration tests
#![allow(dead_code)]

pub mod log_capture;
pub mod mock_services;

pub use log_capture::{capture_logs, LogCapture};
pub use mock_services::{
    MockFingerprinter, MockGeocoder, MockKnowledgeBase, MockReader, MockVision, MockWriter,
    VisionCall, WriteCall,
};

use chrono::{NaiveDate, NaiveDateTime};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use geofill_cascade::gazetteer::Gazetteer;
use geofill_cascade::pipeline::{standard_chain, ChainSettings, VisionServices};
use geofill_cascade::types::PhotoMetadata;
use geofill_cascade::{OutcomeLedger, PipelineOptions, ResolutionPipeline, Session};
use geofill_common::Coordinate;

pub const PARIS: Coordinate = Coordinate {
    lat: 48.8566,
    lon: 2.3522,
};
pub const EIFFEL_TOWER: Coordinate = Coordinate {
    lat: 48.8584,
    lon: 2.2945,
};
pub const LOUVRE: Coordinate = Coordinate {
    lat: 48.8606,
    lon: 2.3376,
};
pub const MADRID: Coordinate = Coordinate {
    lat: 40.4168,
    lon: -3.7038,
};
pub const MIN_CONFIDENCE: f32 = 0.5;

/// Capture time on a fixed day
pub fn at_hour(hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 5, 1)
        .and_then(|d| d.and_hms_opt(hour, 0, 0))
        .unwrap()
}

/// Temporary photo folders wired to scripted services
pub struct Harness {
    pub dir: TempDir,
    pub vision: Arc<MockVision>,
    pub knowledge_base: Arc<MockKnowledgeBase>,
    pub geocoder: Arc<MockGeocoder>,
    pub reader: Arc<MockReader>,
    pub writer: Arc<MockWriter>,
    pub fingerprinter: Arc<MockFingerprinter>,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
            vision: Arc::new(MockVision::default()),
            knowledge_base: Arc::new(MockKnowledgeBase::default()),
            geocoder: Arc::new(MockGeocoder::default()),
            reader: Arc::new(MockReader::default()),
            writer: Arc::new(MockWriter::default()),
            fingerprinter: Arc::new(MockFingerprinter::default()),
        }
    }

    /// Default single-run folder
    pub fn photos_dir(&self) -> PathBuf {
        self.folder("photos")
    }

    pub fn folder(&self, name: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::create_dir_all(&path).unwrap();
        path
    }

    pub fn report_dir(&self) -> PathBuf {
        self.dir.path().join("reports")
    }

    /// Add a photo to the default folder
    pub fn add_photo(&self, name: &str, hour: u32, gps: Option<Coordinate>) -> PathBuf {
        self.add_photo_in(&self.photos_dir(), name, hour, gps)
    }

    /// Write a photo whose content is its own name and register its metadata
    pub fn add_photo_in(&self, folder: &Path, name: &str, hour: u32, gps: Option<Coordinate>) -> PathBuf {
        let path = folder.join(name);
        std::fs::write(&path, name.as_bytes()).unwrap();
        self.reader.set(
            name,
            PhotoMetadata {
                gps,
                captured_at: Some(at_hour(hour)),
            },
        );
        path
    }

    pub fn gazetteer(&self) -> Arc<Gazetteer> {
        Arc::new(Gazetteer::new(
            self.knowledge_base.clone(),
            self.geocoder.clone(),
        ))
    }

    pub fn session(&self, options: PipelineOptions) -> Session {
        let gazetteer = self.gazetteer();
        let vision = VisionServices {
            landmark: self.vision.clone(),
            web: self.vision.clone(),
            text: self.vision.clone(),
        };
        let settings = ChainSettings {
            min_confidence: MIN_CONFIDENCE,
            vision_timeout: Duration::from_secs(5),
        };
        let pipeline = ResolutionPipeline::new(
            standard_chain(&vision, gazetteer.clone(), &settings),
            self.writer.clone(),
            self.fingerprinter.clone(),
            options,
        );
        Session::new(pipeline, gazetteer, self.reader.clone(), self.report_dir())
    }
}

/// Actions recorded for one photo, as their CSV names
pub fn actions_for(ledger: &OutcomeLedger, path: &Path) -> Vec<&'static str> {
    let file = path.display().to_string();
    ledger.for_file(&file).map(|r| r.action.as_str()).collect()
}

/// Last record for one photo
pub fn final_record<'a>(
    ledger: &'a OutcomeLedger,
    path: &Path,
) -> &'a geofill_cascade::OutcomeRecord {
    let file = path.display().to_string();
    ledger
        .records()
        .iter()
        .filter(|r| r.file == file)
        .last()
        .unwrap_or_else(|| panic!("no records for {}", file))
}
