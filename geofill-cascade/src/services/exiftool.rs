//! exiftool adapter
//!
//! Reads existing GPS and capture time with `exiftool -j -n`, and writes GPS
//! (EXIF with refs and version id, plus XMP) in place. After a successful
//! write the file's access and modification times are refreshed.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use geofill_common::Coordinate;
use serde_json::Value;
use std::fs::{FileTimes, OpenOptions};
use std::path::Path;
use std::process::Stdio;
use std::time::SystemTime;
use tokio::process::Command;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::types::{EvidenceError, MetadataReader, MetadataWriter, PhotoMetadata, WriteError};

const EXIF_TIMESTAMP_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// Tags requested when reading
const READ_TAGS: &[&str] = &[
    "-GPSLatitude",
    "-GPSLongitude",
    "-GPSLatitudeRef",
    "-GPSLongitudeRef",
    "-DateTimeOriginal",
    "-ModifyDate",
];

pub struct ExifTool {
    program: String,
    available: OnceCell<bool>,
}

impl ExifTool {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            available: OnceCell::new(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// `exiftool -ver` output, when the tool runs
    pub async fn version(&self) -> Option<String> {
        let output = Command::new(&self.program)
            .arg("-ver")
            .stdin(Stdio::null())
            .output()
            .await
            .ok()?;
        if !output.status.success() {
            return None;
        }
        Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

/// Arguments for writing `coordinate` (and an optional note) into `path`
pub fn gps_write_args(path: &Path, coordinate: Coordinate, note: Option<&str>) -> Vec<String> {
    let lat_ref = if coordinate.lat >= 0.0 { "N" } else { "S" };
    let lon_ref = if coordinate.lon >= 0.0 { "E" } else { "W" };

    let mut args = vec![
        "-overwrite_original".to_string(),
        "-P".to_string(),
        "-n".to_string(),
        format!("-GPSLatitude={}", coordinate.lat.abs()),
        format!("-GPSLongitude={}", coordinate.lon.abs()),
        format!("-GPSLatitudeRef={}", lat_ref),
        format!("-GPSLongitudeRef={}", lon_ref),
        "-GPSVersionID=2.3.0.0".to_string(),
        format!("-XMP:GPSLatitude={}", coordinate.lat),
        format!("-XMP:GPSLongitude={}", coordinate.lon),
    ];
    if let Some(note) = note.filter(|n| !n.is_empty()) {
        args.push(format!("-EXIF:UserComment={}", note));
    }
    args.push(path.display().to_string());
    args
}

fn number(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn timestamp(value: Option<&Value>) -> Option<NaiveDateTime> {
    let text = value?.as_str()?.trim();
    // Drop sub-seconds and zone suffixes ("2024:05:01 10:00:00.12+02:00")
    let head: String = text.chars().take(19).collect();
    NaiveDateTime::parse_from_str(&head, EXIF_TIMESTAMP_FORMAT).ok()
}

fn signed(value: f64, reference: Option<&Value>, negative: &str) -> f64 {
    match reference.and_then(Value::as_str) {
        Some(r) if r.trim().eq_ignore_ascii_case(negative) => -value.abs(),
        _ => value,
    }
}

/// Parse `exiftool -j -n` output for a single file
pub fn parse_exif_json(output: &str) -> Result<PhotoMetadata, EvidenceError> {
    let records: Vec<serde_json::Map<String, Value>> = serde_json::from_str(output)
        .map_err(|e| EvidenceError::Parse(format!("Failed to parse exiftool JSON: {}", e)))?;
    let Some(record) = records.into_iter().next() else {
        return Ok(PhotoMetadata::default());
    };

    let gps = match (number(record.get("GPSLatitude")), number(record.get("GPSLongitude"))) {
        (Some(lat), Some(lon)) => {
            let c = Coordinate::new(
                signed(lat, record.get("GPSLatitudeRef"), "S"),
                signed(lon, record.get("GPSLongitudeRef"), "W"),
            );
            c.is_valid().then_some(c)
        }
        _ => None,
    };

    let captured_at =
        timestamp(record.get("DateTimeOriginal")).or_else(|| timestamp(record.get("ModifyDate")));

    Ok(PhotoMetadata { gps, captured_at })
}

/// Set access and modification time to now
pub fn touch(path: &Path) -> std::io::Result<()> {
    let now = SystemTime::now();
    let file = OpenOptions::new().write(true).open(path)?;
    file.set_times(FileTimes::new().set_accessed(now).set_modified(now))
}

#[async_trait]
impl MetadataReader for ExifTool {
    async fn read_metadata(&self, path: &Path) -> Result<PhotoMetadata, EvidenceError> {
        let output = Command::new(&self.program)
            .arg("-j")
            .arg("-n")
            .args(READ_TAGS)
            .arg(path)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| EvidenceError::NotAvailable(format!("Failed to execute {}: {}", self.program, e)))?;

        // exiftool exits non-zero for unreadable files but may still print JSON
        let stdout = String::from_utf8_lossy(&output.stdout);
        if stdout.trim().is_empty() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(EvidenceError::Internal(format!(
                "exiftool produced no output for {}: {}",
                path.display(),
                stderr.trim()
            )));
        }
        parse_exif_json(&stdout)
    }
}

#[async_trait]
impl MetadataWriter for ExifTool {
    fn name(&self) -> &'static str {
        "exiftool"
    }

    async fn is_available(&self) -> bool {
        *self
            .available
            .get_or_init(|| async {
                let version = self.version().await;
                debug!(program = %self.program, version = ?version, "exiftool availability check");
                version.is_some()
            })
            .await
    }

    async fn write_coordinate(
        &self,
        path: &Path,
        coordinate: Coordinate,
        note: Option<&str>,
    ) -> Result<(), WriteError> {
        let output = Command::new(&self.program)
            .args(gps_write_args(path, coordinate, note))
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| WriteError::Launch {
                tool: self.program.clone(),
                message: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(WriteError::ToolFailed {
                tool: self.program.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        if let Err(e) = touch(path) {
            warn!(file = %path.display(), error = %e, "Failed to refresh file times");
        }
        Ok(())
    }
}
