//! Error types and result aliases for provision operations.
//!
//! Provides a unified error type that covers configuration, input and
//! resolution failures with actionable error messages.

use thiserror::Error;

use crate::types::VersionError;

mod resolution;

pub use resolution::{ConflictChain, MissingRequirement, ResolutionError};

/// Unified error type for all provision operations
#[derive(Error, Debug)]
pub enum ProvisionError {
    // Input errors
    #[error("Malformed resource name '{name}': {reason}")]
    MalformedName { name: String, reason: String },

    #[error("Invalid version '{input}': {source}")]
    InvalidVersion {
        input: String,
        #[source]
        source: VersionError,
    },

    #[error("Invalid applies-to '{input}': {reason}")]
    InvalidAppliesTo { input: String, reason: String },

    // Config errors
    #[error("Failed to parse TOML: {message} at line {line}, column {column}")]
    TomlParse {
        message: String,
        line: usize,
        column: usize,
    },

    #[error("Failed to parse JSON catalog: {message}")]
    JsonParse { message: String },

    #[error("Configuration field '{field}' is invalid: {reason}")]
    ConfigValidation { field: String, reason: String },

    // Resolution errors
    #[error(transparent)]
    Resolution(Box<ResolutionError>),

    // IO errors
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for provision operations
pub type ProvisionResult<T> = Result<T, ProvisionError>;

impl ProvisionError {
    /// Create an IO error from std::io::Error
    pub fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }

    /// Create a malformed name error
    pub fn malformed_name(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedName {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Access the structured resolution failure, if this is one
    pub fn as_resolution(&self) -> Option<&ResolutionError> {
        match self {
            ProvisionError::Resolution(error) => Some(error),
            _ => None,
        }
    }

    /// Check if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ProvisionError::Io { .. })
    }

    /// Get a user-friendly suggestion for fixing this error
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            ProvisionError::MalformedName { .. } => {
                Some("Request features as 'name' or 'name/version' with a single '/'")
            }
            ProvisionError::InvalidVersion { .. } => {
                Some("Versions have up to four numeric segments, e.g. 8.5.5.2")
            }
            ProvisionError::InvalidAppliesTo { .. } => Some(
                "Use the form 'productId; productVersion=1.0+; productEdition=\"BASE,ND\"'",
            ),
            ProvisionError::TomlParse { .. } => Some("Check the catalog manifest syntax"),
            ProvisionError::Resolution(error) => error.suggestion(),
            _ => None,
        }
    }
}

impl From<ResolutionError> for ProvisionError {
    fn from(error: ResolutionError) -> Self {
        ProvisionError::Resolution(Box::new(error))
    }
}
