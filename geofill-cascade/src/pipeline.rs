//! Resolution pipeline
//!
//! Walks a folder's photos in capture order and runs the resolver chain for
//! each one. Photos are processed strictly one at a time: the outcome for
//! photo N (its `LastKnown` update, its cache entry) is visible to photo N+1.
//!
//! Per photo:
//! 1. Outside `start_index..=end_index` → `skip_start_index` / `skip_end_index`
//! 2. Existing GPS → becomes `LastKnown`; `skip_has_gps` unless forced
//! 3. Resolver chain until one accepts; rejections are recorded on the way
//! 4. Accepted coordinate is written (unless dry-run); a write failure
//!    records `error_write`, leaves folder state untouched and resumes the
//!    chain at the next resolver
//! 5. Nothing accepted (or written) → `skip_no_source`

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::gazetteer::Gazetteer;
use crate::ledger::{ActionKind, OutcomeLedger};
use crate::phash_cache::PhotoHashCache;
use crate::resolvers::{
    Attempt, FolderHints, FolderState, HintSeedResolver, LandmarkResolver, LastKnown,
    LastKnownResolver, OcrTextResolver, PhashReuseResolver, PhotoContext, PlanSeedResolver,
    Resolution, Resolver, WebEntityResolver,
};
use crate::types::{
    Fingerprinter, LandmarkDetector, MetadataWriter, Photo, TextDetector, WebEntityDetector,
};

/// Run-level switches
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOptions {
    /// Evaluate everything but never write to files
    pub dry_run: bool,
    /// Re-resolve photos that already carry GPS
    pub force: bool,
    /// First 1-based index to process
    pub start_index: usize,
    /// Last 1-based index to process (inclusive)
    pub end_index: Option<usize>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            force: false,
            start_index: 1,
            end_index: None,
        }
    }
}

/// Vision capabilities used by the standard chain
#[derive(Clone)]
pub struct VisionServices {
    pub landmark: Arc<dyn LandmarkDetector>,
    pub web: Arc<dyn WebEntityDetector>,
    pub text: Arc<dyn TextDetector>,
}

/// Parameters of the standard chain
#[derive(Debug, Clone)]
pub struct ChainSettings {
    pub min_confidence: f32,
    pub vision_timeout: Duration,
}

/// Standard evidence chain in priority order
pub fn standard_chain(
    vision: &VisionServices,
    gazetteer: Arc<Gazetteer>,
    settings: &ChainSettings,
) -> Vec<Box<dyn Resolver>> {
    vec![
        Box::new(LandmarkResolver::new(
            vision.landmark.clone(),
            settings.min_confidence,
            settings.vision_timeout,
        )),
        Box::new(PhashReuseResolver),
        Box::new(WebEntityResolver::new(
            vision.web.clone(),
            gazetteer.clone(),
            settings.vision_timeout,
        )),
        Box::new(OcrTextResolver::new(
            vision.text.clone(),
            gazetteer,
            settings.vision_timeout,
        )),
        Box::new(PlanSeedResolver),
        Box::new(LastKnownResolver),
        Box::new(HintSeedResolver),
    ]
}

pub struct ResolutionPipeline {
    resolvers: Vec<Box<dyn Resolver>>,
    writer: Arc<dyn MetadataWriter>,
    fingerprinter: Arc<dyn Fingerprinter>,
    options: PipelineOptions,
}

impl ResolutionPipeline {
    pub fn new(
        resolvers: Vec<Box<dyn Resolver>>,
        writer: Arc<dyn MetadataWriter>,
        fingerprinter: Arc<dyn Fingerprinter>,
        options: PipelineOptions,
    ) -> Self {
        Self {
            resolvers,
            writer,
            fingerprinter,
            options,
        }
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    pub fn writer(&self) -> &Arc<dyn MetadataWriter> {
        &self.writer
    }

    /// Process one folder's photos (already in capture order)
    ///
    /// `LastKnown` starts from the first photo that carries GPS, falling back
    /// to the global hint when there is no plan.
    pub async fn run_folder(
        &self,
        photos: &[Photo],
        hints: &FolderHints,
        cache: &mut PhotoHashCache,
        ledger: &mut OutcomeLedger,
    ) {
        let mut last_known = initial_last_known(photos, hints);
        if let Some(seed) = &last_known {
            debug!(coordinate = %seed.coordinate, label = %seed.label, "LastKnown seeded");
        }

        for (i, photo) in photos.iter().enumerate() {
            let index = i + 1;
            let file = photo.path.display().to_string();

            if index < self.options.start_index {
                ledger.record(file, ActionKind::SkipStartIndex, None, "");
                continue;
            }
            if self.options.end_index.is_some_and(|end| index > end) {
                ledger.record(file, ActionKind::SkipEndIndex, None, "");
                continue;
            }

            if let Some(gps) = photo.gps {
                let label = format!("[exif:{}]", photo.file_name());
                last_known = Some(LastKnown {
                    coordinate: gps,
                    label: label.clone(),
                });
                if !self.options.force {
                    ledger.record(file, ActionKind::SkipHasGps, Some(gps), label);
                    continue;
                }
                ledger.record(file.clone(), ActionKind::ForceOverwriteHasGps, Some(gps), label);
            }

            let context = self.photo_context(index, photo, hints).await;
            let mut next = 0;
            let mut assigned = false;
            while let Some((resolution, resume_at)) = self
                .evaluate(&context, hints, last_known.as_ref(), cache, next, &file, ledger)
                .await
            {
                if !self.options.dry_run {
                    if let Err(e) = self
                        .writer
                        .write_coordinate(&photo.path, resolution.coordinate, Some(&resolution.note))
                        .await
                    {
                        warn!(file = %file, error = %e, "Failed to write coordinate");
                        ledger.record(
                            file.as_str(),
                            ActionKind::ErrorWrite,
                            Some(resolution.coordinate),
                            format!("{}:{}", self.writer.name(), e),
                        );
                        next = resume_at;
                        continue;
                    }
                }

                self.apply(resolution, &context, &mut last_known, cache, file.clone(), ledger);
                assigned = true;
                break;
            }

            if !assigned {
                ledger.record(file, ActionKind::SkipNoSource, None, "");
            }
        }

        info!(
            photos = photos.len(),
            events = ledger.len(),
            assigned = ledger.assigned(),
            dry_run = self.options.dry_run,
            "Folder processed"
        );
    }

    async fn photo_context(&self, index: usize, photo: &Photo, hints: &FolderHints) -> PhotoContext {
        let image = match tokio::fs::read(&photo.path).await {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                warn!(file = %photo.path.display(), error = %e, "Cannot read image");
                None
            }
        };

        let fingerprint = match self.fingerprinter.fingerprint(&photo.path).await {
            Ok(fp) => Some(fp),
            Err(e) => {
                debug!(file = %photo.path.display(), error = %e, "No fingerprint");
                None
            }
        };

        PhotoContext {
            index,
            path: photo.path.clone(),
            image,
            fingerprint,
            bias: hints.bias_for(index),
        }
    }

    /// Run the chain from resolver `from` until one accepts, recording
    /// rejections
    ///
    /// Returns the resolution with the position of the next resolver, where
    /// the chain resumes if the write fails.
    #[allow(clippy::too_many_arguments)]
    async fn evaluate(
        &self,
        context: &PhotoContext,
        hints: &FolderHints,
        last_known: Option<&LastKnown>,
        cache: &PhotoHashCache,
        from: usize,
        file: &str,
        ledger: &mut OutcomeLedger,
    ) -> Option<(Resolution, usize)> {
        let state = FolderState {
            hints,
            last_known,
            cache,
        };

        for (position, resolver) in self.resolvers.iter().enumerate().skip(from) {
            match resolver.attempt(context, &state).await {
                Attempt::Accept(resolution) => {
                    debug!(
                        resolver = resolver.name(),
                        file = %file,
                        coordinate = %resolution.coordinate,
                        "Resolver accepted"
                    );
                    return Some((resolution, position + 1));
                }
                Attempt::Reject(rejection) => {
                    ledger.record(file, rejection.action, rejection.coordinate, rejection.detail);
                }
                Attempt::Defer => {}
            }
        }
        None
    }

    fn apply(
        &self,
        resolution: Resolution,
        context: &PhotoContext,
        last_known: &mut Option<LastKnown>,
        cache: &mut PhotoHashCache,
        file: String,
        ledger: &mut OutcomeLedger,
    ) {
        *last_known = Some(LastKnown {
            coordinate: resolution.coordinate,
            label: resolution.memory_label,
        });

        if let (Some(entry), Some(fingerprint)) = (resolution.cache_entry, context.fingerprint) {
            cache.insert(fingerprint, entry);
        }

        info!(
            file = %file,
            action = %resolution.action,
            coordinate = %resolution.coordinate,
            "Coordinate assigned"
        );
        ledger.record(
            file,
            resolution.action,
            Some(resolution.coordinate),
            format!("{} [writer:{}]", resolution.note, self.writer.name()),
        );
    }
}

/// First GPS-bearing photo, else the global hint when no plan was given
fn initial_last_known(photos: &[Photo], hints: &FolderHints) -> Option<LastKnown> {
    if let Some(photo) = photos.iter().find(|p| p.gps.is_some()) {
        return photo.gps.map(|gps| LastKnown {
            coordinate: gps,
            label: format!("[seed:{}]", photo.file_name()),
        });
    }
    if hints.has_plan {
        return None;
    }
    hints.global.as_ref().map(|hint| LastKnown {
        coordinate: hint.coordinate,
        label: format!("[seed-hint:{}]", hint.name),
    })
}
