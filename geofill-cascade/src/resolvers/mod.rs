//! Evidence resolvers
//!
//! Each resolver inspects one kind of evidence for a photo and answers with
//! an [`Attempt`]:
//! - **Accept:** a coordinate to write; the chain stops
//! - **Reject:** a recorded failure or out-of-range candidate; the chain continues
//! - **Defer:** nothing to say (no cache hit, no plan...); the chain continues
//!
//! # Chain order
//! 1. **landmark** - landmark recognition on the image
//! 2. **phash_reuse** - coordinate of an earlier photo with the same fingerprint
//! 3. **web_entities** - web-entity labels resolved through the gazetteer
//! 4. **ocr_text** - on-image text lines resolved through the gazetteer
//! 5. **fallbacks** - plan seed, last known position, global hint seed
//!
//! Resolvers never mutate folder state. The pipeline applies the accepted
//! resolution (write, `LastKnown`, cache) itself.

pub mod fallbacks;
pub mod landmark;
pub mod ocr_text;
pub mod phash_reuse;
pub mod web_entities;

pub use fallbacks::{HintSeedResolver, LastKnownResolver, PlanSeedResolver};
pub use landmark::LandmarkResolver;
pub use ocr_text::OcrTextResolver;
pub use phash_reuse::PhashReuseResolver;
pub use web_entities::WebEntityResolver;

use async_trait::async_trait;
use geofill_common::Coordinate;
use std::path::PathBuf;

use crate::hint_index::{Hint, HintIndex};
use crate::ledger::ActionKind;
use crate::phash_cache::{CachedResult, PhotoHashCache};
use crate::types::{Fingerprint, SearchBias};

/// Most recently accepted coordinate in the folder
#[derive(Debug, Clone, PartialEq)]
pub struct LastKnown {
    pub coordinate: Coordinate,
    /// Provenance label (`[exif:IMG_1.jpg]`, `[web:Alhambra]`...)
    pub label: String,
}

/// Bias sources for one folder
#[derive(Debug, Clone, Default)]
pub struct FolderHints {
    pub index: HintIndex,
    /// A plan was supplied for this folder (even if no hint resolved)
    pub has_plan: bool,
    /// Global `--hint`, only consulted without a plan
    pub global: Option<Hint>,
}

impl FolderHints {
    pub fn with_plan(index: HintIndex) -> Self {
        Self {
            index,
            has_plan: true,
            global: None,
        }
    }

    pub fn with_global(global: Option<Hint>) -> Self {
        Self {
            index: HintIndex::empty(),
            has_plan: false,
            global,
        }
    }

    /// Bias for a 1-based photo index
    pub fn bias_for(&self, index: usize) -> Option<SearchBias> {
        if !self.index.is_empty() {
            return self.index.lookup(index).map(Hint::bias);
        }
        if self.has_plan {
            return None;
        }
        self.global.as_ref().map(Hint::bias)
    }
}

/// Per-photo input shared by all resolvers
#[derive(Debug, Clone)]
pub struct PhotoContext {
    /// 1-based position in capture order
    pub index: usize,
    pub path: PathBuf,
    /// Raw image bytes, when readable
    pub image: Option<Vec<u8>>,
    pub fingerprint: Option<Fingerprint>,
    pub bias: Option<SearchBias>,
}

/// Folder state visible to resolvers (read-only)
#[derive(Debug, Clone, Copy)]
pub struct FolderState<'a> {
    pub hints: &'a FolderHints,
    pub last_known: Option<&'a LastKnown>,
    pub cache: &'a PhotoHashCache,
}

/// Accepted coordinate and how to apply it
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub action: ActionKind,
    pub coordinate: Coordinate,
    /// Provenance note, written into the file and the ledger
    pub note: String,
    /// Label carried forward as `LastKnown`
    pub memory_label: String,
    /// Cache entry to store under the photo's fingerprint
    pub cache_entry: Option<CachedResult>,
}

/// Recorded non-acceptance
#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    pub action: ActionKind,
    pub coordinate: Option<Coordinate>,
    pub detail: String,
}

impl Rejection {
    pub fn new(action: ActionKind, detail: impl Into<String>) -> Self {
        Self {
            action,
            coordinate: None,
            detail: detail.into(),
        }
    }

    pub fn too_far(action: ActionKind, coordinate: Coordinate, detail: impl Into<String>) -> Self {
        Self {
            action,
            coordinate: Some(coordinate),
            detail: detail.into(),
        }
    }
}

/// Resolver answer for one photo
#[derive(Debug, Clone, PartialEq)]
pub enum Attempt {
    Accept(Resolution),
    Reject(Rejection),
    Defer,
}

/// One link of the evidence chain
#[async_trait]
pub trait Resolver: Send + Sync {
    /// Short name for logging
    fn name(&self) -> &'static str;

    async fn attempt(&self, photo: &PhotoContext, state: &FolderState<'_>) -> Attempt;
}

/// Order-preserving, case-insensitive deduplication of trimmed labels
pub fn dedup_labels<I>(labels: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = std::collections::HashSet::new();
    labels
        .into_iter()
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty() && seen.insert(l.to_lowercase()))
        .collect()
}
