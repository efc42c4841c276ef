//! Runtime configuration for content generation.
//!
//! Values come from the environment (a `.env` file is loaded by the CLI
//! before this runs). Every value has a default except the API key, which
//! is only required once a Gemini model is built.
//!
//! ## Environment Variables
//!
//! - `CONTENT_GENERATOR_STUDY_BASE` - directory holding the learning projects
//!   (default: `~/study/python`)
//! - `CONTENT_GENERATOR_MODEL` - Gemini model name (default: `gemini-2.5-flash`)
//! - `CONTENT_GENERATOR_TOOL_TIMEOUT_SECS` - per-subprocess timeout (default: 60)
//! - `CONTENT_GENERATOR_MAX_REPAIR_CYCLES` - validation loop bound (default: 3)
//! - `GOOGLE_API_KEY` or `GEMINI_API_KEY`

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const STUDY_BASE_ENV: &str = "CONTENT_GENERATOR_STUDY_BASE";
pub const MODEL_ENV: &str = "CONTENT_GENERATOR_MODEL";
pub const TOOL_TIMEOUT_ENV: &str = "CONTENT_GENERATOR_TOOL_TIMEOUT_SECS";
pub const MAX_REPAIR_CYCLES_ENV: &str = "CONTENT_GENERATOR_MAX_REPAIR_CYCLES";

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_TOOL_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_MAX_REPAIR_CYCLES: usize = 3;

/// Upper bound on `max_repair_cycles`.
pub const MAX_REPAIR_CYCLES_LIMIT: usize = 10;

/// Validation error with context and suggestions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)?;
        if let Some(ref suggestion) = self.suggestion {
            write!(f, ". {}", suggestion)?;
        }
        Ok(())
    }
}

impl std::error::Error for ConfigValidationError {}

impl ConfigValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self { field: field.into(), message: message.into(), suggestion: None }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorConfig {
    pub study_base: PathBuf,
    pub model: String,
    pub tool_timeout_secs: u64,
    pub max_repair_cycles: usize,
    pub api_key: Option<String>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            study_base: default_study_base(&home_dir()),
            model: DEFAULT_MODEL.to_string(),
            tool_timeout_secs: DEFAULT_TOOL_TIMEOUT_SECS,
            max_repair_cycles: DEFAULT_MAX_REPAIR_CYCLES,
            api_key: None,
        }
    }
}

impl GeneratorConfig {
    /// Load and validate configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigValidationError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigValidationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let home = lookup("HOME")
            .or_else(|| lookup("USERPROFILE"))
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        let mut config = Self {
            study_base: default_study_base(&home),
            ..Default::default()
        };

        if let Some(base) = lookup(STUDY_BASE_ENV).filter(|v| !v.is_empty()) {
            config.study_base = PathBuf::from(base);
        }

        if let Some(model) = lookup(MODEL_ENV) {
            config.model = model;
        }

        if let Some(timeout) = lookup(TOOL_TIMEOUT_ENV) {
            config.tool_timeout_secs = timeout.trim().parse().map_err(|e| {
                ConfigValidationError::new(
                    "tool_timeout_secs",
                    format!("Invalid {} '{}': {}", TOOL_TIMEOUT_ENV, timeout, e),
                )
                .with_suggestion("Use a positive number of seconds like 60")
            })?;
        }

        if let Some(cycles) = lookup(MAX_REPAIR_CYCLES_ENV) {
            config.max_repair_cycles = cycles.trim().parse().map_err(|e| {
                ConfigValidationError::new(
                    "max_repair_cycles",
                    format!("Invalid {} '{}': {}", MAX_REPAIR_CYCLES_ENV, cycles, e),
                )
                .with_suggestion("Use a positive integer like 3")
            })?;
        }

        config.api_key = lookup("GOOGLE_API_KEY")
            .filter(|k| !k.is_empty())
            .or_else(|| lookup("GEMINI_API_KEY").filter(|k| !k.is_empty()));

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.model.trim().is_empty() {
            return Err(ConfigValidationError::new("model", "Model name cannot be empty")
                .with_suggestion(format!("Set {} to a Gemini model like {}", MODEL_ENV, DEFAULT_MODEL)));
        }

        if self.tool_timeout_secs == 0 {
            return Err(ConfigValidationError::new(
                "tool_timeout_secs",
                "Tool timeout must be greater than 0",
            )
            .with_suggestion(format!("Set {} to at least 1 (recommended: 60)", TOOL_TIMEOUT_ENV)));
        }

        if self.max_repair_cycles == 0 || self.max_repair_cycles > MAX_REPAIR_CYCLES_LIMIT {
            return Err(ConfigValidationError::new(
                "max_repair_cycles",
                format!(
                    "Repair cycles {} outside the allowed range 1..={}",
                    self.max_repair_cycles, MAX_REPAIR_CYCLES_LIMIT
                ),
            )
            .with_suggestion(format!("Set {} between 1 and {}", MAX_REPAIR_CYCLES_ENV, MAX_REPAIR_CYCLES_LIMIT)));
        }

        if self.study_base.as_os_str().is_empty() {
            return Err(ConfigValidationError::new("study_base", "Study base path cannot be empty")
                .with_suggestion(format!("Set {} to the directory holding the learning projects", STUDY_BASE_ENV)));
        }

        Ok(())
    }

    /// The API key, or an error explaining how to provide one.
    pub fn require_api_key(&self) -> Result<&str, ConfigValidationError> {
        self.api_key.as_deref().ok_or_else(|| {
            ConfigValidationError::new("api_key", "GOOGLE_API_KEY is not set")
                .with_suggestion("Export GOOGLE_API_KEY (or GEMINI_API_KEY) or add it to a .env file")
        })
    }

    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs)
    }

    pub fn with_study_base(mut self, study_base: impl Into<PathBuf>) -> Self {
        self.study_base = study_base.into();
        self
    }

    pub fn with_max_repair_cycles(mut self, cycles: usize) -> Self {
        self.max_repair_cycles = cycles;
        self
    }

    pub fn with_tool_timeout_secs(mut self, secs: u64) -> Self {
        self.tool_timeout_secs = secs;
        self
    }
}

/// The user's home directory from `HOME`, then `USERPROFILE`.
pub fn home_dir() -> PathBuf {
    env::var_os("HOME")
        .or_else(|| env::var_os("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}

fn default_study_base(home: &Path) -> PathBuf {
    home.join("study").join("python")
}
