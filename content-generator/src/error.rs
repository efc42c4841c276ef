//! Error types for the content generator.

use crate::config::ConfigValidationError;
use forge_core::ForgeError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for content generator operations.
pub type Result<T> = std::result::Result<T, GeneratorError>;

#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("Unknown project '{name}'. Available: {available}")]
    UnknownProject { name: String, available: String },

    #[error("Unknown domain '{name}'. Available: {available}")]
    UnknownDomain { name: String, available: String },

    #[error("Path {} is not within any allowed project root", .0.display())]
    PathOutsideRoots(PathBuf),

    /// Carries the full message, e.g. `pyproject.toml not found at ...`.
    #[error("{0}")]
    FileNotFound(String),

    #[error("Invalid TOML in {}: {source}", .path.display())]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Lesson number prefix of '{0}' is too large")]
    LessonNumberOverflow(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Template error: {0}")]
    Template(#[from] minijinja::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigValidationError),
}

impl From<GeneratorError> for ForgeError {
    fn from(err: GeneratorError) -> Self {
        ForgeError::Tool(err.to_string())
    }
}
