//! Error types for policy module.

use thiserror::Error;

/// Result type alias for policy operations.
pub type PolicyResult<T> = Result<T, PolicyError>;

/// Errors that can occur during policy operations.
#[derive(Error, Debug)]
pub enum PolicyError {
    #[error("Policy validation failed: {count} violation(s)\n{summary}")]
    ValidationFailed { count: usize, summary: String },

    #[error("Invalid policy configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Template error: {0}")]
    Template(#[from] site_core::CoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
