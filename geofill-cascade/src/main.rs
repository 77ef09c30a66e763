//! geofill-cascade - fill missing GPS coordinates in photo folders
//!
//! Modes:
//! - `geofill-cascade <folder> [--hint "A, B"]`: single folder, optional global hint
//! - `geofill-cascade <folder> --file plan.json`: single folder with a range plan
//! - `geofill-cascade --file multi.json` / `--multi-plan multi.json`: one run per folder
//!
//! Results go to `result.csv` (or `result_<folder>.csv` per folder) in the
//! report directory, and a summary is printed for each folder.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::info;

use geofill_cascade::config::{CascadeSettings, CliOverrides};
use geofill_cascade::plan::{folder_plans, parse_plan_document, read_plan_json, PlanDocument};
use geofill_cascade::services::ServiceRegistry;
use geofill_cascade::{FolderReport, PipelineOptions, Session};
use geofill_common::config::ConfigResolver;
use geofill_common::logging;

/// Command-line arguments for geofill-cascade
#[derive(Parser, Debug)]
#[command(name = "geofill-cascade")]
#[command(about = "Assign GPS coordinates to photos using landmark, web, text and plan evidence")]
#[command(version)]
struct Args {
    /// Folder with photos
    path: Option<PathBuf>,

    /// Comma-separated place names; the first that geocodes biases the run
    #[arg(long)]
    hint: Option<String>,

    /// Plan file (range plan, or multi-folder plan auto-detected)
    #[arg(long)]
    file: Option<PathBuf>,

    /// Multi-folder plan file
    #[arg(long)]
    multi_plan: Option<PathBuf>,

    /// Base directory for multi-folder entries without a path
    #[arg(long)]
    base_path: Option<PathBuf>,

    /// Evaluate without writing to any file
    #[arg(long)]
    dry_run: bool,

    /// First photo (1-based, capture order) to process
    #[arg(long, default_value_t = 1)]
    start_index: usize,

    /// Last photo (inclusive) to process
    #[arg(long)]
    end_index: Option<usize>,

    /// Minimum landmark score (0.0-1.0)
    #[arg(long)]
    min_confidence: Option<f32>,

    /// Vision request timeout in seconds
    #[arg(long)]
    timeout: Option<f64>,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,

    /// exiftool binary
    #[arg(long)]
    exiftool_path: Option<String>,

    /// Re-resolve photos that already have GPS
    #[arg(long)]
    force: bool,

    /// Config file (default: $GEOFILL_CONFIG or <config dir>/geofill/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory for CSV reports
    #[arg(long)]
    report_dir: Option<PathBuf>,

    /// Google Cloud Vision API key
    #[arg(long)]
    vision_api_key: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let toml_config = ConfigResolver::new(args.config.clone())
        .load()
        .context("Failed to load configuration")?;
    logging::init_tracing(&toml_config.logging, args.verbose)?;

    info!(
        "Starting geofill-cascade {} ({}, {} build, {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_PROFILE"),
        env!("BUILD_TIMESTAMP")
    );

    let overrides = CliOverrides {
        vision_api_key: args.vision_api_key.clone(),
        exiftool_path: args.exiftool_path.clone(),
        min_confidence: args.min_confidence,
        timeout_secs: args.timeout,
        report_dir: args.report_dir.clone(),
    };
    let options = PipelineOptions {
        dry_run: args.dry_run,
        force: args.force,
        start_index: args.start_index,
        end_index: args.end_index,
    };
    let settings = CascadeSettings::resolve(&overrides, &toml_config, options)?;
    if settings.options.dry_run {
        info!("Dry run: no files will be modified");
    }

    let services = ServiceRegistry::from_settings(&settings)?;
    let mut session = Session::from_services(&services, &settings);

    let reports = if let Some(multi) = &args.multi_plan {
        let plan = read_plan_json(multi)?;
        let folders = folder_plans(&plan, args.base_path.as_deref())?;
        session.run_multi(&folders).await?
    } else if let Some(file) = &args.file {
        let plan = read_plan_json(file)?;
        match parse_plan_document(plan, args.base_path.as_deref())? {
            PlanDocument::Multi(folders) => session.run_multi(&folders).await?,
            PlanDocument::Single(plan) => {
                let Some(path) = &args.path else {
                    bail!("A folder path is required with a single-folder plan");
                };
                vec![session.run_single(path, Some(plan), None).await?]
            }
        }
    } else {
        let Some(path) = &args.path else {
            bail!("A folder path is required (or --file / --multi-plan)");
        };
        vec![session.run_single(path, None, args.hint.as_deref()).await?]
    };

    print_reports(&reports);
    Ok(())
}

fn print_reports(reports: &[FolderReport]) {
    for report in reports {
        println!("{}", report.summary());
    }
    info!(folders = reports.len(), "Run complete");
}
