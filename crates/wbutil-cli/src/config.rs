//! Configuration for the `wbutil` binary.
//!
//! The file is TOML. Every key is optional; a missing file yields the
//! defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use wbutil_core::pipeline::DEFAULT_WORKERS;
use wbutil_core::{Error, Result, RetryPolicy};
use wbutil_math::TreeParams;

use crate::cli::Command;

/// Name used for the config directory and in user-facing hints.
pub const PROJECT_NAME: &str = "wbutil";

/// Default tracing filter when neither `RUST_LOG` nor `log_level` is set.
pub const DEFAULT_LOG_LEVEL: &str = "info,wbutil=debug";

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WbutilConfig {
    /// `tracing` filter directive
    pub log_level: String,
    /// Worker pool settings
    pub pipeline: PipelineConfig,
    /// Retry settings for file reads
    pub retry: RetryConfig,
    /// Decision tree stopping criteria
    pub tree: TreeParams,
    /// CSV parsing
    pub csv: CsvConfig,
}

impl Default for WbutilConfig {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            pipeline: PipelineConfig::default(),
            retry: RetryConfig::default(),
            tree: TreeParams::default(),
            csv: CsvConfig::default(),
        }
    }
}

/// Worker pool settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Number of workers
    pub workers: usize,
    /// Queue bound, 0 for unbounded
    pub capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            capacity: 0,
        }
    }
}

/// Retry settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Attempts in total
    pub times: u32,
    /// Pause between attempts, in milliseconds
    pub wait_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            times: 3,
            wait_ms: 100,
        }
    }
}

impl RetryConfig {
    /// Build a [`RetryPolicy`] from these settings.
    pub fn policy<T: Clone>(&self) -> RetryPolicy<T> {
        RetryPolicy::new(self.times).with_wait(Duration::from_millis(self.wait_ms))
    }
}

/// CSV parsing settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvConfig {
    /// Cell separator; must be a single ASCII character
    pub delimiter: char,
}

impl Default for CsvConfig {
    fn default() -> Self {
        Self { delimiter: ',' }
    }
}

impl CsvConfig {
    /// The delimiter as the byte the CSV reader expects.
    pub fn delimiter_byte(&self) -> Result<u8> {
        u8::try_from(self.delimiter)
            .ok()
            .filter(u8::is_ascii)
            .ok_or_else(|| {
                Error::config(format!(
                    "csv.delimiter must be an ASCII character, got {:?}",
                    self.delimiter
                ))
            })
    }
}

impl WbutilConfig {
    /// `<config dir>/wbutil/config.toml`, if the platform has a config dir.
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(PROJECT_NAME).join("config.toml"))
    }

    /// The explicit path if given, otherwise the default path.
    pub fn resolve_config_path(explicit: Option<&str>) -> Option<PathBuf> {
        explicit.map(PathBuf::from).or_else(Self::default_config_path)
    }

    /// Load and validate the configuration, falling back to defaults when
    /// the resolved file does not exist.
    pub fn load(explicit: Option<&str>) -> Result<Self> {
        let Some(path) = Self::resolve_config_path(explicit) else {
            return Ok(Self::default());
        };
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::from_file(&path)
    }

    /// Load and validate a config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::io_with_path(e, path))?;
        Self::from_toml_str(&content)
            .map_err(|e| Error::config(format!("Failed to load {}: {e}", path.display())))
    }

    /// Parse and validate TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Render as pretty TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check values the types alone do not constrain.
    pub fn validate(&self) -> Result<()> {
        if self.pipeline.workers == 0 {
            return Err(Error::config("pipeline.workers must be at least 1"));
        }
        if self.retry.times == 0 {
            return Err(Error::config("retry.times must be at least 1"));
        }
        if self.tree.min_gain.is_nan() || self.tree.min_gain < 0.0 {
            return Err(Error::config("tree.min_gain must be a non-negative number"));
        }
        self.csv.delimiter_byte()?;
        Ok(())
    }
}

/// Load the configuration `command` runs with.
///
/// `config` subcommands fall back to the defaults when the file fails to
/// load, so a broken file can still be located, inspected, or regenerated.
/// The load failure is returned alongside for the caller to report.
pub fn load_for_command(
    explicit: Option<&str>,
    command: &Command,
) -> Result<(WbutilConfig, Option<Error>)> {
    match WbutilConfig::load(explicit) {
        Ok(config) => Ok((config, None)),
        Err(e) if matches!(command, Command::Config { .. }) => {
            Ok((WbutilConfig::default(), Some(e)))
        }
        Err(e) => Err(e),
    }
}
