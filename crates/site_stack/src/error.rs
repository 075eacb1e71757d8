//! Error types for topology construction.

use thiserror::Error;

/// Result type alias for stack operations.
pub type StackResult<T> = Result<T, StackError>;

/// Errors that can occur while declaring the site topology.
#[derive(Error, Debug)]
pub enum StackError {
    #[error("Viewer certificate aliases must include {0}")]
    MissingAlias(String),

    #[error("Certificate {arn} does not cover {host}")]
    CertificateCoverage { arn: String, host: String },

    #[error("Invalid TTL bounds: min {min}s, default {default}s, max {max}s")]
    InvalidTtl { min: u64, default: u64, max: u64 },

    #[error("Method {0} cannot be cached")]
    UncacheableMethod(String),

    #[error("Invalid country code: {0}")]
    InvalidCountryCode(String),

    #[error("Invalid error response: {0}")]
    InvalidErrorResponse(String),

    #[error("Core error: {0}")]
    Core(#[from] site_core::CoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StackError {
    /// Whether the error points at a bad external reference.
    pub fn is_lookup(&self) -> bool {
        match self {
            StackError::CertificateCoverage { .. } => true,
            StackError::Core(e) => e.is_lookup(),
            _ => false,
        }
    }

    /// Whether the error points at bad settings.
    pub fn is_config(&self) -> bool {
        match self {
            StackError::Core(e) => e.is_config(),
            _ => false,
        }
    }
}
