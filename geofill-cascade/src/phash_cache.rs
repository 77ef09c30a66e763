//! Perceptual-hash result cache
//!
//! Fingerprint → coordinate accepted for an earlier photo. Owned by the
//! session and handed to each folder run, so duplicates are recognized across
//! folders as well. Entries are never removed; a later acceptance for the same
//! fingerprint replaces the earlier one.

use geofill_common::Coordinate;
use std::collections::HashMap;

use crate::types::Fingerprint;

/// Cached resolution for a fingerprint
#[derive(Debug, Clone, PartialEq)]
pub struct CachedResult {
    pub coordinate: Coordinate,
    /// Label of the original resolution (landmark name, matched title...)
    pub label: String,
    /// Where the original coordinate came from
    pub source: String,
}

impl CachedResult {
    pub fn new(coordinate: Coordinate, label: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            coordinate,
            label: label.into(),
            source: source.into(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PhotoHashCache {
    entries: HashMap<Fingerprint, CachedResult>,
}

impl PhotoHashCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, fingerprint: &Fingerprint) -> Option<&CachedResult> {
        self.entries.get(fingerprint)
    }

    pub fn insert(&mut self, fingerprint: Fingerprint, result: CachedResult) {
        self.entries.insert(fingerprint, result);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
