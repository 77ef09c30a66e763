//! Range-hint index
//!
//! A plan is an ordered list of `{"range": [start, end], "hint": "Place"}`
//! entries. Each distinct place name is geocoded once; every photo index
//! covered by a range maps to that place. Later ranges overwrite earlier ones
//! on shared indices.
//!
//! Malformed entries never abort the build. They are returned as
//! [`PlanIssue`]s and end up as `plan_error` rows in the ledger.

use geofill_common::Coordinate;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, info, warn};

use crate::gazetteer::Gazetteer;
use crate::types::SearchBias;

/// One validated plan entry (1-based, inclusive, `start <= end`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeHint {
    pub start: i64,
    pub end: i64,
    pub name: String,
}

/// Geocoded place name
#[derive(Debug, Clone, PartialEq)]
pub struct Hint {
    pub coordinate: Coordinate,
    pub name: String,
}

impl Hint {
    pub fn new(coordinate: Coordinate, name: impl Into<String>) -> Self {
        Self {
            coordinate,
            name: name.into(),
        }
    }

    /// Search bias centred on this hint
    pub fn bias(&self) -> SearchBias {
        SearchBias::new(self.coordinate, self.name.clone())
    }
}

/// Non-fatal plan problem
#[derive(Debug, Clone, PartialEq)]
pub enum PlanIssue {
    /// Plan root is not a JSON list
    InvalidFormat,
    /// `range` is not a two-element list (item numbers are 0-based)
    InvalidRange { item: usize },
    /// Any other entry-level parse failure
    ParseError { item: usize },
    /// Hint name has no geocoder match
    Unresolved { name: String },
    /// Geocoder failed for the hint name
    GeocodeError { name: String, message: String },
}

impl fmt::Display for PlanIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanIssue::InvalidFormat => write!(f, "plan_invalid_format: root must be a list"),
            PlanIssue::InvalidRange { item } => write!(f, "plan_item_{}_invalid_range", item),
            PlanIssue::ParseError { item } => write!(f, "plan_item_{}_parse_error", item),
            PlanIssue::Unresolved { name } => write!(f, "hint_unresolved:{}", name),
            PlanIssue::GeocodeError { name, message } => {
                write!(f, "hint_geocode_error:{}:{}", name, message)
            }
        }
    }
}

/// Integer bound from a JSON value (integers, floats truncated, numeric strings)
fn parse_bound(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn parse_entry(item: usize, entry: &Value) -> Result<RangeHint, PlanIssue> {
    let object = entry.as_object().ok_or(PlanIssue::ParseError { item })?;
    let range = object.get("range").ok_or(PlanIssue::ParseError { item })?;
    let name = match object.get("hint") {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => return Err(PlanIssue::ParseError { item }),
    };

    let bounds = match range.as_array() {
        Some(bounds) if bounds.len() == 2 => bounds,
        _ => return Err(PlanIssue::InvalidRange { item }),
    };
    let start = parse_bound(&bounds[0]).ok_or(PlanIssue::ParseError { item })?;
    let end = parse_bound(&bounds[1]).ok_or(PlanIssue::ParseError { item })?;

    let (start, end) = if start <= end { (start, end) } else { (end, start) };
    Ok(RangeHint { start, end, name })
}

/// Validate plan entries, keeping input order
pub fn parse_range_hints(plan: &Value) -> (Vec<RangeHint>, Vec<PlanIssue>) {
    let Some(entries) = plan.as_array() else {
        return (Vec::new(), vec![PlanIssue::InvalidFormat]);
    };

    let mut ranges = Vec::new();
    let mut issues = Vec::new();
    for (i, entry) in entries.iter().enumerate() {
        match parse_entry(i, entry) {
            Ok(range) => ranges.push(range),
            Err(issue) => {
                warn!(issue = %issue, "Skipping plan entry");
                issues.push(issue);
            }
        }
    }
    (ranges, issues)
}

/// Photo index (1-based) → hint
///
/// Resolved ranges are kept in input order and scanned on lookup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HintIndex {
    ranges: Vec<(RangeHint, Hint)>,
}

impl HintIndex {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Keep ranges whose names were resolved, in input order
    pub fn from_ranges(ranges: &[RangeHint], resolved: &HashMap<String, Coordinate>) -> Self {
        let ranges = ranges
            .iter()
            .filter_map(|range| {
                resolved
                    .get(&range.name)
                    .map(|coordinate| (range.clone(), Hint::new(*coordinate, range.name.clone())))
            })
            .collect();
        Self { ranges }
    }

    /// Parse a plan, geocode each distinct name once and build the index
    pub async fn build(plan: &Value, gazetteer: &Gazetteer) -> (Self, Vec<PlanIssue>) {
        let (ranges, mut issues) = parse_range_hints(plan);

        let mut resolved = HashMap::new();
        let mut attempted = Vec::new();
        for range in &ranges {
            if attempted.contains(&range.name) {
                continue;
            }
            attempted.push(range.name.clone());

            match gazetteer.geocode_hint(&range.name).await {
                Ok(Some(coordinate)) => {
                    debug!(hint = %range.name, coordinate = %coordinate, "Plan hint geocoded");
                    resolved.insert(range.name.clone(), coordinate);
                }
                Ok(None) => {
                    warn!(hint = %range.name, "Plan hint did not resolve");
                    issues.push(PlanIssue::Unresolved {
                        name: range.name.clone(),
                    });
                }
                Err(e) => {
                    warn!(hint = %range.name, error = %e, "Plan hint geocoding failed");
                    issues.push(PlanIssue::GeocodeError {
                        name: range.name.clone(),
                        message: e.to_string(),
                    });
                }
            }
        }

        let index = Self::from_ranges(&ranges, &resolved);
        info!(
            ranges = ranges.len(),
            hints = resolved.len(),
            issues = issues.len(),
            "Hint index built"
        );
        (index, issues)
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Number of resolved ranges
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    /// Hint for `index`; indices outside every range use the hint of the
    /// largest declared index
    pub fn lookup(&self, index: usize) -> Option<&Hint> {
        let key = i64::try_from(index).ok()?;
        self.covering(key).or_else(|| {
            let max_end = self.ranges.iter().map(|(range, _)| range.end).max()?;
            self.covering(max_end)
        })
    }

    /// Later ranges overwrite earlier ones
    fn covering(&self, index: i64) -> Option<&Hint> {
        self.ranges
            .iter()
            .rev()
            .find(|(range, _)| (range.start..=range.end).contains(&index))
            .map(|(_, hint)| hint)
    }
}

/// Geocode a comma-separated global hint list; the first success wins
pub async fn resolve_global_hint(hints: &str, gazetteer: &Gazetteer) -> Option<Hint> {
    for name in hints.split(',').map(str::trim).filter(|n| !n.is_empty()) {
        match gazetteer.geocode_hint(name).await {
            Ok(Some(coordinate)) => {
                info!(hint = %name, coordinate = %coordinate, "Global hint resolved");
                return Some(Hint::new(coordinate, name));
            }
            Ok(None) => warn!(hint = %name, "Global hint did not resolve"),
            Err(e) => warn!(hint = %name, error = %e, "Global hint geocoding failed"),
        }
    }
    None
}
