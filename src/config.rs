//! Process-level configuration for kubeshift
//!
//! Settings are read from environment variables with defaults. Command-line
//! flags override them.
//!
//! # Environment Variables
//!
//! - `KUBESHIFT_MAX_ROUNDS`: Scheduler round limit before a cycle is declared - default: the
//!   pipeline document's `maxRounds`
//! - `KUBESHIFT_QA_SKIP`: Answer every question with its default (true|false) - default: "false"
//! - `KUBESHIFT_QA_CACHE`: YAML file replaying and recording answers - default: unset
//! - `KUBESHIFT_LOG_LEVEL`: Logging level - default: "info"
//! - `KUBESHIFT_TEMPLATES_DIR`: Directory overriding built-in templates - default: unset
//!
//! # Example
//!
//! ```no_run
//! use kubeshift::KubeshiftConfig;
//!
//! let config = KubeshiftConfig::default();
//! config.validate().expect("Invalid configuration");
//! ```

use std::env;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

const DEFAULT_LOG_LEVEL: &str = "info";
const MAX_ROUNDS_LIMIT: usize = 10_000;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration validation failed
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    /// Failed to parse configuration value
    #[error("Failed to parse {field}: {error}")]
    ParseError { field: String, error: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KubeshiftConfig {
    /// Overrides the pipeline document's round limit
    pub max_rounds: Option<usize>,

    /// Never prompt; take defaults
    pub qa_skip: bool,

    /// QA answer cache file
    pub qa_cache: Option<PathBuf>,

    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Template override directory
    pub templates_dir: Option<PathBuf>,
}

impl Default for KubeshiftConfig {
    /// Loads from `KUBESHIFT_*` environment variables, falling back to
    /// defaults for missing or unparsable values.
    fn default() -> Self {
        Self::from_env().unwrap_or_else(|_| Self {
            max_rounds: None,
            qa_skip: false,
            qa_cache: env::var("KUBESHIFT_QA_CACHE").ok().map(PathBuf::from),
            log_level: log_level_from_env(),
            templates_dir: env::var("KUBESHIFT_TEMPLATES_DIR").ok().map(PathBuf::from),
        })
    }
}

fn log_level_from_env() -> String {
    env::var("KUBESHIFT_LOG_LEVEL")
        .unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string())
        .to_lowercase()
}

fn parse_bool(field: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(ConfigError::ParseError {
            field: field.to_string(),
            error: format!("expected a boolean, got '{}'", other),
        }),
    }
}

impl KubeshiftConfig {
    /// Strict variant of [`Default`]: an unparsable value is an error.
    pub fn from_env() -> Result<Self, ConfigError> {
        let max_rounds = match env::var("KUBESHIFT_MAX_ROUNDS") {
            Ok(v) => Some(v.trim().parse::<usize>().map_err(|e| ConfigError::ParseError {
                field: "KUBESHIFT_MAX_ROUNDS".to_string(),
                error: e.to_string(),
            })?),
            Err(_) => None,
        };

        let qa_skip = match env::var("KUBESHIFT_QA_SKIP") {
            Ok(v) => parse_bool("KUBESHIFT_QA_SKIP", &v)?,
            Err(_) => false,
        };

        Ok(Self {
            max_rounds,
            qa_skip,
            qa_cache: env::var("KUBESHIFT_QA_CACHE").ok().map(PathBuf::from),
            log_level: log_level_from_env(),
            templates_dir: env::var("KUBESHIFT_TEMPLATES_DIR").ok().map(PathBuf::from),
        })
    }

    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the round limit is out of range, the log level
    /// is unknown or the template directory does not exist.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(rounds) = self.max_rounds {
            if rounds == 0 {
                return Err(ConfigError::ValidationFailed(
                    "Max rounds must be at least 1".to_string(),
                ));
            }
            if rounds > MAX_ROUNDS_LIMIT {
                return Err(ConfigError::ValidationFailed(format!(
                    "Max rounds cannot exceed {}",
                    MAX_ROUNDS_LIMIT
                )));
            }
        }

        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::ValidationFailed(format!(
                    "Invalid log level: {}. Valid options: trace, debug, info, warn, error",
                    self.log_level
                )))
            }
        }

        if let Some(dir) = &self.templates_dir {
            if !dir.is_dir() {
                return Err(ConfigError::ValidationFailed(format!(
                    "Templates directory does not exist: {}",
                    dir.display()
                )));
            }
        }

        Ok(())
    }
}

impl fmt::Display for KubeshiftConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Kubeshift Configuration:")?;
        match self.max_rounds {
            Some(rounds) => writeln!(f, "  Max Rounds: {}", rounds)?,
            None => writeln!(f, "  Max Rounds: (pipeline default)")?,
        }
        writeln!(f, "  QA Skip: {}", self.qa_skip)?;
        if let Some(ref cache) = self.qa_cache {
            writeln!(f, "  QA Cache: {}", cache.display())?;
        }
        if let Some(ref dir) = self.templates_dir {
            writeln!(f, "  Templates Dir: {}", dir.display())?;
        }
        writeln!(f, "  Log Level: {}", self.log_level)?;
        Ok(())
    }
}
