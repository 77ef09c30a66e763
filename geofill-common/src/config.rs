//! Bootstrap configuration loading
//!
//! Configuration file resolution order:
//! 1. Explicit path (command-line `--config`)
//! 2. `GEOFILL_CONFIG` environment variable
//! 3. `<config dir>/geofill/config.toml` (platform config directory)
//!
//! A missing implicit config file is not an error: a warning is logged and
//! built-in defaults are used. A malformed file, or an explicit path that
//! does not exist, is a configuration error.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an alternative config file
pub const CONFIG_ENV_VAR: &str = "GEOFILL_CONFIG";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Google Cloud Vision API key
    #[serde(default)]
    pub vision_api_key: Option<String>,

    /// exiftool binary (name on PATH or absolute path)
    #[serde(default = "default_exiftool_path")]
    pub exiftool_path: String,

    /// User-Agent sent to Wikipedia and Nominatim
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Per-call timeout for vision requests (seconds)
    #[serde(default = "default_vision_timeout")]
    pub vision_timeout_secs: f64,

    /// Per-call timeout for geocoding requests (seconds)
    #[serde(default = "default_geocoder_timeout")]
    pub geocoder_timeout_secs: f64,

    /// Minimum landmark score to accept (0.0-1.0)
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f32,

    /// Wikipedia language editions, queried in order
    #[serde(default = "default_languages")]
    pub knowledge_base_languages: Vec<String>,

    /// Directory receiving CSV reports (default: current directory)
    #[serde(default)]
    pub report_dir: Option<PathBuf>,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            vision_api_key: None,
            exiftool_path: default_exiftool_path(),
            user_agent: default_user_agent(),
            vision_timeout_secs: default_vision_timeout(),
            geocoder_timeout_secs: default_geocoder_timeout(),
            min_confidence: default_min_confidence(),
            knowledge_base_languages: default_languages(),
            report_dir: None,
            logging: LoggingConfig::default(),
        }
    }
}

fn default_exiftool_path() -> String {
    "exiftool".to_string()
}

fn default_user_agent() -> String {
    "geo-filler-gcv-boost".to_string()
}

fn default_vision_timeout() -> f64 {
    20.0
}

fn default_geocoder_timeout() -> f64 {
    15.0
}

fn default_min_confidence() -> f32 {
    0.60
}

fn default_languages() -> Vec<String> {
    vec!["es".to_string(), "en".to_string()]
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Resolves and loads the bootstrap config file
#[derive(Debug, Clone, Default)]
pub struct ConfigResolver {
    explicit_path: Option<PathBuf>,
}

impl ConfigResolver {
    pub fn new(explicit_path: Option<PathBuf>) -> Self {
        Self { explicit_path }
    }

    /// Config file location after applying the resolution order
    pub fn resolve_path(&self) -> Option<PathBuf> {
        if let Some(path) = &self.explicit_path {
            return Some(path.clone());
        }

        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            if !path.trim().is_empty() {
                return Some(PathBuf::from(path));
            }
        }

        dirs::config_dir().map(|d| d.join("geofill").join("config.toml"))
    }

    /// Load configuration, falling back to defaults when no file exists
    pub fn load(&self) -> Result<TomlConfig> {
        let Some(path) = self.resolve_path() else {
            warn!("Could not determine config directory, using built-in defaults");
            return Ok(TomlConfig::default());
        };

        if !path.exists() {
            if self.explicit_path.is_some() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            warn!(
                "Config file not found at {}, using built-in defaults",
                path.display()
            );
            return Ok(TomlConfig::default());
        }

        let config = load_toml_config(&path)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }
}

/// Read and parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML failed ({}): {}", path.display(), e)))?;
    parse_toml_config(&content)
}

/// Parse TOML config text
pub fn parse_toml_config(content: &str) -> Result<TomlConfig> {
    let config: TomlConfig =
        toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))?;

    if !(0.0..=1.0).contains(&config.min_confidence) {
        return Err(Error::Config(format!(
            "min_confidence must be within 0.0-1.0, got {}",
            config.min_confidence
        )));
    }
    if config.vision_timeout_secs <= 0.0 || config.geocoder_timeout_secs <= 0.0 {
        return Err(Error::Config("timeouts must be positive".to_string()));
    }

    Ok(config)
}
