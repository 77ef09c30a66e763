//! Run configuration for geofill-cascade
//!
//! Combines command-line overrides with the bootstrap TOML config.
//!
//! Vision API key priority: command line → `GEOFILL_VISION_API_KEY` → TOML.
//! A missing key is not fatal; vision resolvers then record `*_error` events.

use geofill_common::config::TomlConfig;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

use crate::error::{CascadeError, CascadeResult};
use crate::pipeline::{ChainSettings, PipelineOptions};

/// Environment variable holding the vision API key
pub const VISION_API_KEY_ENV_VAR: &str = "GEOFILL_VISION_API_KEY";

/// Values given on the command line that override the TOML config
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub vision_api_key: Option<String>,
    pub exiftool_path: Option<String>,
    pub min_confidence: Option<f32>,
    /// Vision per-call timeout in seconds
    pub timeout_secs: Option<f64>,
    pub report_dir: Option<PathBuf>,
}

/// Fully resolved settings for a run
#[derive(Debug, Clone)]
pub struct CascadeSettings {
    pub vision_api_key: Option<String>,
    pub exiftool_path: String,
    pub user_agent: String,
    pub vision_timeout: Duration,
    pub geocoder_timeout: Duration,
    pub min_confidence: f32,
    pub languages: Vec<String>,
    pub report_dir: PathBuf,
    pub options: PipelineOptions,
}

impl CascadeSettings {
    pub fn resolve(
        cli: &CliOverrides,
        toml: &TomlConfig,
        options: PipelineOptions,
    ) -> CascadeResult<Self> {
        let min_confidence = cli.min_confidence.unwrap_or(toml.min_confidence);
        if !(0.0..=1.0).contains(&min_confidence) {
            return Err(CascadeError::Config(format!(
                "min confidence must be within 0.0-1.0, got {}",
                min_confidence
            )));
        }

        let vision_timeout = positive_secs(cli.timeout_secs.unwrap_or(toml.vision_timeout_secs))?;
        let geocoder_timeout = positive_secs(toml.geocoder_timeout_secs)?;

        if options.start_index == 0 {
            return Err(CascadeError::Config("start index is 1-based".to_string()));
        }
        if let Some(end) = options.end_index {
            if end < options.start_index {
                return Err(CascadeError::Config(format!(
                    "end index {} is before start index {}",
                    end, options.start_index
                )));
            }
        }

        Ok(Self {
            vision_api_key: resolve_vision_api_key(cli.vision_api_key.as_deref(), toml),
            exiftool_path: cli
                .exiftool_path
                .clone()
                .unwrap_or_else(|| toml.exiftool_path.clone()),
            user_agent: toml.user_agent.clone(),
            vision_timeout,
            geocoder_timeout,
            min_confidence,
            languages: toml.knowledge_base_languages.clone(),
            report_dir: cli
                .report_dir
                .clone()
                .or_else(|| toml.report_dir.clone())
                .unwrap_or_else(|| PathBuf::from(".")),
            options,
        })
    }

    pub fn chain_settings(&self) -> ChainSettings {
        ChainSettings {
            min_confidence: self.min_confidence,
            vision_timeout: self.vision_timeout,
        }
    }
}

fn positive_secs(secs: f64) -> CascadeResult<Duration> {
    if !secs.is_finite() || secs <= 0.0 {
        return Err(CascadeError::Config(format!(
            "timeout must be a positive number of seconds, got {}",
            secs
        )));
    }
    Ok(Duration::from_secs_f64(secs))
}

fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

/// Resolve the vision API key
///
/// **Priority:** command line → environment → TOML
pub fn resolve_vision_api_key(cli_key: Option<&str>, toml_config: &TomlConfig) -> Option<String> {
    let env_key = std::env::var(VISION_API_KEY_ENV_VAR).ok();
    let toml_key = toml_config.vision_api_key.as_deref();

    let candidates = [
        ("command line", cli_key),
        ("environment", env_key.as_deref()),
        ("TOML", toml_key),
    ];
    let sources: Vec<&str> = candidates
        .iter()
        .filter(|(_, key)| key.is_some_and(is_valid_key))
        .map(|(source, _)| *source)
        .collect();

    if sources.len() > 1 {
        warn!(
            "Vision API key found in multiple sources: {}. Using {} (highest priority).",
            sources.join(", "),
            sources[0]
        );
    }

    for (source, key) in candidates {
        if let Some(key) = key.filter(|k| is_valid_key(k)) {
            info!("Vision API key loaded from {}", source);
            return Some(key.trim().to_string());
        }
    }
    None
}
