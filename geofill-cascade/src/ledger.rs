//! Outcome ledger
//!
//! Append-only record of every decision taken for a folder. Each photo yields
//! at least one record; rejections that let the chain continue are recorded
//! too, so a photo can have several rows. The ledger is written out as CSV
//! (`file,action,lat,lon,source`) and summarized per action kind.

use geofill_common::Coordinate;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::path::Path;
use tracing::debug;

/// `file` column of `plan_error` rows
pub const PLAN_ROW_FILE: &str = "(plan)";

/// Kind of outcome event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ActionKind {
    // Plan and index bounds
    PlanError,
    SkipStartIndex,
    SkipEndIndex,
    // Existing GPS
    SkipHasGps,
    ForceOverwriteHasGps,
    // Landmark recognition
    WriteLandmark,
    LandmarkEmpty,
    LandmarkError,
    LandmarkTooFar,
    // Perceptual-hash reuse
    WritePhash,
    SkipPhashTooFar,
    // Web entities
    WriteWeb,
    WebEmpty,
    WebError,
    WebUnresolved,
    // On-image text
    WriteOcr,
    OcrEmpty,
    OcrError,
    OcrUnresolved,
    // Fallbacks
    WritePlanSeed,
    WriteLastKnown,
    SkipLastKnownTooFar,
    WriteHintSeed,
    SkipNoSource,
    // Persistence
    ErrorWrite,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::PlanError => "plan_error",
            ActionKind::SkipStartIndex => "skip_start_index",
            ActionKind::SkipEndIndex => "skip_end_index",
            ActionKind::SkipHasGps => "skip_has_gps",
            ActionKind::ForceOverwriteHasGps => "force_overwrite_has_gps",
            ActionKind::WriteLandmark => "write_landmark",
            ActionKind::LandmarkEmpty => "landmark_empty",
            ActionKind::LandmarkError => "landmark_error",
            ActionKind::LandmarkTooFar => "landmark_too_far",
            ActionKind::WritePhash => "write_phash",
            ActionKind::SkipPhashTooFar => "skip_phash_too_far",
            ActionKind::WriteWeb => "write_web",
            ActionKind::WebEmpty => "web_empty",
            ActionKind::WebError => "web_error",
            ActionKind::WebUnresolved => "web_unresolved",
            ActionKind::WriteOcr => "write_ocr",
            ActionKind::OcrEmpty => "ocr_empty",
            ActionKind::OcrError => "ocr_error",
            ActionKind::OcrUnresolved => "ocr_unresolved",
            ActionKind::WritePlanSeed => "write_hint_seed_file",
            ActionKind::WriteLastKnown => "write_last_known",
            ActionKind::SkipLastKnownTooFar => "skip_last_known_too_far",
            ActionKind::WriteHintSeed => "write_hint_seed",
            ActionKind::SkipNoSource => "skip_no_source",
            ActionKind::ErrorWrite => "error_write",
        }
    }

    /// Whether this action assigns a coordinate to the photo
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            ActionKind::WriteLandmark
                | ActionKind::WritePhash
                | ActionKind::WriteWeb
                | ActionKind::WriteOcr
                | ActionKind::WritePlanSeed
                | ActionKind::WriteLastKnown
                | ActionKind::WriteHintSeed
        )
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One ledger row
#[derive(Debug, Clone, PartialEq)]
pub struct OutcomeRecord {
    pub file: String,
    pub action: ActionKind,
    pub coordinate: Option<Coordinate>,
    pub source: String,
}

/// CSV shape of a record
#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    file: &'a str,
    action: &'static str,
    lat: String,
    lon: String,
    source: &'a str,
}

impl<'a> From<&'a OutcomeRecord> for CsvRow<'a> {
    fn from(record: &'a OutcomeRecord) -> Self {
        let (lat, lon) = match record.coordinate {
            Some(c) => (format!("{:.6}", c.lat), format!("{:.6}", c.lon)),
            None => (String::new(), String::new()),
        };
        Self {
            file: &record.file,
            action: record.action.as_str(),
            lat,
            lon,
            source: &record.source,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct OutcomeLedger {
    records: Vec<OutcomeRecord>,
    counts: BTreeMap<&'static str, usize>,
}

impl OutcomeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(
        &mut self,
        file: impl Into<String>,
        action: ActionKind,
        coordinate: Option<Coordinate>,
        source: impl Into<String>,
    ) {
        let record = OutcomeRecord {
            file: file.into(),
            action,
            coordinate,
            source: source.into(),
        };

        debug!(
            action = %record.action,
            file = %record.file,
            coordinate = ?record.coordinate.map(|c| c.to_string()),
            source = %record.source,
            "Outcome recorded"
        );

        *self.counts.entry(action.as_str()).or_insert(0) += 1;
        self.records.push(record);
    }

    pub fn records(&self) -> &[OutcomeRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Events per action, ordered by action name
    pub fn counts(&self) -> &BTreeMap<&'static str, usize> {
        &self.counts
    }

    pub fn count(&self, action: ActionKind) -> usize {
        self.counts.get(action.as_str()).copied().unwrap_or(0)
    }

    /// Records that assigned a coordinate
    pub fn assigned(&self) -> usize {
        self.records.iter().filter(|r| r.action.is_write()).count()
    }

    /// Action sequence in recording order
    pub fn actions(&self) -> Vec<ActionKind> {
        self.records.iter().map(|r| r.action).collect()
    }

    /// Records for one file
    pub fn for_file<'a>(&'a self, file: &'a str) -> impl Iterator<Item = &'a OutcomeRecord> + 'a {
        self.records.iter().filter(move |r| r.file == file)
    }

    /// Write all records as CSV with a header row
    pub fn write_csv(&self, path: &Path) -> Result<(), csv::Error> {
        let file = File::create(path)?;
        self.write_csv_to(file)
    }

    pub fn write_csv_to<W: std::io::Write>(&self, writer: W) -> Result<(), csv::Error> {
        let mut out = csv::Writer::from_writer(writer);
        for record in &self.records {
            out.serialize(CsvRow::from(record))?;
        }
        if self.records.is_empty() {
            out.write_record(["file", "action", "lat", "lon", "source"])?;
        }
        out.flush()?;
        Ok(())
    }

    /// Human-readable summary
    pub fn summary(&self, files_in_folder: usize) -> String {
        let mut text = format!(
            "Summary:\n  Files in folder: {}\n  Events recorded: {}\n",
            files_in_folder,
            self.records.len()
        );
        for (action, count) in &self.counts {
            text.push_str(&format!("    {:>5}  {}\n", count, action));
        }
        text
    }
}
