//! Pipeline configuration loaded from TOML.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::alerts::{AlertRules, BuiltinBreedRisks};
use crate::extractor::DEFAULT_MERGE_WINDOW_HOURS;
use crate::patterns::PatternOptions;

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Record store settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StoreConfig {
    /// SQLite file path; `None` keeps records in memory
    pub path: Option<PathBuf>,
}

/// Top-level pipeline configuration. Every field has a default.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    /// Identity window for duplicate facts, in hours
    pub merge_window_hours: i64,
    pub patterns: PatternOptions,
    pub alerts: AlertRules,
    pub store: StoreConfig,
    /// Optional TOML file replacing the built-in breed-risk table
    pub breed_risk_table: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            merge_window_hours: DEFAULT_MERGE_WINDOW_HOURS,
            patterns: PatternOptions::default(),
            alerts: AlertRules::default(),
            store: StoreConfig::default(),
            breed_risk_table: None,
        }
    }
}

impl PipelineConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(source: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// Reject values that would make the rules meaningless.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.merge_window_hours <= 0 {
            return Err(ConfigError::Invalid("merge_window_hours must be positive".into()));
        }
        if self.patterns.threshold == 0 {
            return Err(ConfigError::Invalid("patterns.threshold must be at least 1".into()));
        }
        if self.patterns.window_days <= 0 {
            return Err(ConfigError::Invalid("patterns.window_days must be positive".into()));
        }
        self.alerts.validate()
    }

    pub fn merge_window(&self) -> chrono::Duration {
        chrono::Duration::hours(self.merge_window_hours)
    }

    /// The configured breed-risk table, or the built-in one.
    pub fn breed_risks(&self) -> ConfigResult<BuiltinBreedRisks> {
        match &self.breed_risk_table {
            Some(path) => BuiltinBreedRisks::from_toml(&std::fs::read_to_string(path)?),
            None => Ok(BuiltinBreedRisks::builtin()),
        }
    }
}
