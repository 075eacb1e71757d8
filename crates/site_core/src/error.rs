//! Error types for the core module.

use thiserror::Error;

/// Result type alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur while resolving configuration or assembling a template.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Missing configuration value: {key}")]
    MissingConfig { key: String },

    #[error("Invalid configuration value for {key}: {reason}")]
    InvalidConfig { key: String, reason: String },

    #[error("Invalid bucket name '{name}': {reason}")]
    InvalidBucketName { name: String, reason: String },

    #[error("Invalid certificate reference '{arn}': {reason}")]
    InvalidCertificate { arn: String, reason: String },

    #[error("Hosted zone not found for domain: {0}")]
    HostedZoneNotFound(String),

    #[error("Malformed lookup context entry {key}: {reason}")]
    MalformedContext { key: String, reason: String },

    #[error("Duplicate logical id: {0}")]
    DuplicateResource(String),

    #[error("Resource {from} references undeclared resource {to}")]
    UnknownReference { from: String, to: String },

    #[error("Dependency cycle between resources: {0}")]
    DependencyCycle(String),

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl CoreError {
    pub fn missing(key: impl Into<String>) -> Self {
        Self::MissingConfig { key: key.into() }
    }

    pub fn invalid(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Whether the error stems from absent or malformed settings.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Self::MissingConfig { .. }
                | Self::InvalidConfig { .. }
                | Self::InvalidBucketName { .. }
                | Self::Toml(_)
        )
    }

    /// Whether the error stems from an unresolvable external reference.
    pub fn is_lookup(&self) -> bool {
        matches!(
            self,
            Self::InvalidCertificate { .. }
                | Self::HostedZoneNotFound(_)
                | Self::MalformedContext { .. }
        )
    }
}
