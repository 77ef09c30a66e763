//! Run orchestration
//!
//! A session owns the resolution pipeline and the perceptual-hash cache and
//! runs one or more folders in sequence. Each folder gets its own hint index,
//! `LastKnown` and ledger; the hash cache is shared for the whole session.

use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::CascadeSettings;
use crate::error::{CascadeError, CascadeResult};
use crate::gazetteer::Gazetteer;
use crate::hint_index::{resolve_global_hint, HintIndex, PlanIssue};
use crate::ledger::{ActionKind, OutcomeLedger, PLAN_ROW_FILE};
use crate::phash_cache::PhotoHashCache;
use crate::pipeline::{standard_chain, ResolutionPipeline};
use crate::plan::{report_file_name, FolderPlan};
use crate::resolvers::FolderHints;
use crate::services::{FileScanner, ServiceRegistry};
use crate::types::{display_name, MetadataReader};

/// Result of one folder run
#[derive(Debug, Clone)]
pub struct FolderReport {
    pub folder: PathBuf,
    /// Image files found in the folder
    pub files: usize,
    pub ledger: OutcomeLedger,
    /// Where the CSV was written
    pub report_path: PathBuf,
}

impl FolderReport {
    pub fn summary(&self) -> String {
        format!(
            "Folder: {}\n{}Log saved to {}\n",
            self.folder.display(),
            self.ledger.summary(self.files),
            self.report_path.display()
        )
    }
}

pub struct Session {
    pipeline: ResolutionPipeline,
    gazetteer: Arc<Gazetteer>,
    reader: Arc<dyn MetadataReader>,
    scanner: FileScanner,
    report_dir: PathBuf,
    cache: PhotoHashCache,
}

impl Session {
    pub fn new(
        pipeline: ResolutionPipeline,
        gazetteer: Arc<Gazetteer>,
        reader: Arc<dyn MetadataReader>,
        report_dir: PathBuf,
    ) -> Self {
        Self {
            pipeline,
            gazetteer,
            reader,
            scanner: FileScanner::new(),
            report_dir,
            cache: PhotoHashCache::new(),
        }
    }

    /// Session with the standard resolver chain
    pub fn from_services(services: &ServiceRegistry, settings: &CascadeSettings) -> Self {
        let chain = standard_chain(
            &services.vision,
            services.gazetteer.clone(),
            &settings.chain_settings(),
        );
        let pipeline = ResolutionPipeline::new(
            chain,
            services.writer.clone(),
            services.fingerprinter.clone(),
            settings.options.clone(),
        );
        Self::new(
            pipeline,
            services.gazetteer.clone(),
            services.reader.clone(),
            settings.report_dir.clone(),
        )
    }

    pub fn cache(&self) -> &PhotoHashCache {
        &self.cache
    }

    /// Fail before any processing when files would be written without a writer
    pub async fn ensure_writer_available(&self) -> CascadeResult<()> {
        if self.pipeline.options().dry_run {
            return Ok(());
        }
        let writer = self.pipeline.writer();
        if !writer.is_available().await {
            return Err(CascadeError::Config(format!(
                "{} is not available; install it or use --dry-run",
                writer.name()
            )));
        }
        Ok(())
    }

    /// Run one folder with an optional plan, or else an optional global hint
    pub async fn run_single(
        &mut self,
        root: &Path,
        plan: Option<Value>,
        global_hints: Option<&str>,
    ) -> CascadeResult<FolderReport> {
        self.ensure_writer_available().await?;

        let (hints, issues) = match plan {
            Some(plan) => {
                let (index, issues) = HintIndex::build(&plan, &self.gazetteer).await;
                (FolderHints::with_plan(index), issues)
            }
            None => {
                let global = match global_hints {
                    Some(hints) => resolve_global_hint(hints, &self.gazetteer).await,
                    None => None,
                };
                (FolderHints::with_global(global), Vec::new())
            }
        };

        self.run_folder(root, &hints, &issues, report_file_name(None))
            .await
    }

    /// Run every folder of a multi-folder plan in order
    ///
    /// Missing folders are logged and skipped.
    pub async fn run_multi(&mut self, folders: &[FolderPlan]) -> CascadeResult<Vec<FolderReport>> {
        self.ensure_writer_available().await?;

        let mut reports = Vec::new();
        for folder in folders {
            if !folder.path.is_dir() {
                warn!(
                    folder = %folder.name,
                    path = %folder.path.display(),
                    "Folder not found, skipping"
                );
                continue;
            }

            info!(folder = %folder.name, path = %folder.path.display(), "Processing folder");
            let (index, issues) = HintIndex::build(&folder.tags, &self.gazetteer).await;
            let hints = FolderHints::with_plan(index);
            let report_name = report_file_name(Some(&display_name(&folder.path)));
            let report = self
                .run_folder(&folder.path, &hints, &issues, report_name)
                .await?;
            reports.push(report);
        }
        Ok(reports)
    }

    async fn run_folder(
        &mut self,
        root: &Path,
        hints: &FolderHints,
        issues: &[PlanIssue],
        report_name: String,
    ) -> CascadeResult<FolderReport> {
        let photos = self
            .scanner
            .photos_in_capture_order(root, self.reader.as_ref())
            .await?;
        info!(folder = %root.display(), photos = photos.len(), "Photos enumerated");

        let mut ledger = OutcomeLedger::new();
        for issue in issues {
            ledger.record(PLAN_ROW_FILE, ActionKind::PlanError, None, issue.to_string());
        }

        self.pipeline
            .run_folder(&photos, hints, &mut self.cache, &mut ledger)
            .await;

        std::fs::create_dir_all(&self.report_dir)?;
        let report_path = self.report_dir.join(report_name);
        ledger.write_csv(&report_path)?;

        Ok(FolderReport {
            folder: root.to_path_buf(),
            files: photos.len(),
            ledger,
            report_path,
        })
    }
}
