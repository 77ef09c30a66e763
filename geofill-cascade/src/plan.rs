//! Plan file loading
//!
//! Two shapes are accepted:
//! - **single**: `[{"range": [1, 3], "hint": "Place"}, ...]`
//! - **multi**: `[{"name": "Day 1", "path": "...", "tags": [ ...single... ]}, ...]`
//!
//! The shape is detected from the keys of the first element.

use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::error::{CascadeError, CascadeResult};

/// Detected plan shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanKind {
    Single,
    Multi,
    Unknown,
}

/// Detect the plan shape from the first element's keys
pub fn detect_plan_kind(plan: &Value) -> PlanKind {
    let Some(first) = plan.as_array().and_then(|a| a.first()).and_then(Value::as_object) else {
        return PlanKind::Unknown;
    };

    if first.contains_key("name") && first.contains_key("tags") {
        PlanKind::Multi
    } else if first.contains_key("range") && first.contains_key("hint") {
        PlanKind::Single
    } else {
        PlanKind::Unknown
    }
}

/// One folder of a multi-folder plan
#[derive(Debug, Clone, PartialEq)]
pub struct FolderPlan {
    pub name: String,
    pub path: PathBuf,
    /// Single-folder plan for this folder
    pub tags: Value,
}

/// Parsed plan document
#[derive(Debug, Clone, PartialEq)]
pub enum PlanDocument {
    Single(Value),
    Multi(Vec<FolderPlan>),
}

/// Read and parse a plan file as JSON
pub fn read_plan_json(path: &Path) -> CascadeResult<Value> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        CascadeError::Input(format!("cannot read plan {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&content)
        .map_err(|e| CascadeError::Input(format!("invalid JSON in {}: {}", path.display(), e)))
}

/// Classify a plan; non-list, empty and unrecognized plans are fatal
pub fn parse_plan_document(plan: Value, base_path: Option<&Path>) -> CascadeResult<PlanDocument> {
    match plan.as_array() {
        None => {
            return Err(CascadeError::Input(
                "plan root must be a JSON list".to_string(),
            ))
        }
        Some(entries) if entries.is_empty() => {
            return Err(CascadeError::Input("plan is empty".to_string()))
        }
        Some(_) => {}
    }

    match detect_plan_kind(&plan) {
        PlanKind::Single => Ok(PlanDocument::Single(plan)),
        PlanKind::Multi => Ok(PlanDocument::Multi(folder_plans(&plan, base_path)?)),
        PlanKind::Unknown => Err(CascadeError::Input(
            "unrecognized plan format: expected range/hint or name/tags entries".to_string(),
        )),
    }
}

/// Folder entries of a multi-folder plan
///
/// Entries without a name are skipped. An empty path resolves to
/// `<base_path>/<name>`, or `<name>` when no base path is given.
pub fn folder_plans(plan: &Value, base_path: Option<&Path>) -> CascadeResult<Vec<FolderPlan>> {
    let entries = plan
        .as_array()
        .ok_or_else(|| CascadeError::Input("multi-plan root must be a JSON list".to_string()))?;

    let mut folders = Vec::new();
    for (i, entry) in entries.iter().enumerate() {
        let name = entry
            .get("name")
            .and_then(Value::as_str)
            .map(str::trim)
            .unwrap_or_default();
        if name.is_empty() {
            warn!(item = i + 1, "Multi-plan entry without name, skipping");
            continue;
        }

        let explicit = entry
            .get("path")
            .and_then(Value::as_str)
            .map(str::trim)
            .unwrap_or_default();
        let path = if !explicit.is_empty() {
            PathBuf::from(explicit)
        } else {
            match base_path {
                Some(base) => base.join(name),
                None => PathBuf::from(name),
            }
        };

        folders.push(FolderPlan {
            name: name.to_string(),
            path,
            tags: entry.get("tags").cloned().unwrap_or_else(|| Value::Array(Vec::new())),
        });
    }
    Ok(folders)
}

/// Report file name for a folder run
///
/// `result.csv` for single-folder runs, `result_{name}.csv` in multi-folder
/// mode with characters outside `[A-Za-z0-9_.-]` replaced by `_`.
pub fn report_file_name(folder_name: Option<&str>) -> String {
    match folder_name {
        None => "result.csv".to_string(),
        Some(name) => {
            let safe: String = name
                .chars()
                .map(|c| {
                    if c.is_alphanumeric() || c == '_' || c == '.' || c == '-' {
                        c
                    } else {
                        '_'
                    }
                })
                .collect();
            format!("result_{}.csv", safe)
        }
    }
}
