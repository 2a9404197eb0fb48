//! Error types for simatch.
//!
//! Fatal categories stop the running operation and surface to the caller:
//! version incompatibility, configuration problems, payload validation,
//! unsafe path segments, and upstream collaborator failures. Recoverable
//! conditions (an unusable delimiter during pattern synthesis, an exhausted
//! candidate queue during extraction) are logged where they occur and never
//! reach this type.

use thiserror::Error;

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for simatch
#[derive(Error, Debug)]
pub enum Error {
    /// Persisted model format version differs from the running version.
    /// No forward or backward compatibility is attempted.
    #[error("Unsupported model version {found}, this build reads {running}")]
    UnsupportedModel { found: String, running: String },

    /// Missing required construction argument or unresolved component name.
    /// Pipeline creation aborts; no partial pipeline is returned.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Training payload failed the schema check. Rejected before any
    /// component runs, so there are no side effects to undo.
    #[error("Invalid training payload: {0}")]
    Validation(String),

    /// A scope or knowledge-base identifier containing parent-directory
    /// traversal tokens. Rejected before touching storage.
    #[error("Unsafe path segment in identifier {0:?}")]
    PathSafety(String),

    /// A collaborator call returned a non-success status or was unreachable.
    /// The original status is preserved for the caller.
    #[error("Upstream call failed with status {status}: {message}")]
    Upstream { status: u16, message: String },

    /// A configured rule pattern failed to compile.
    #[error("Invalid regex pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// Filesystem failure while reading or writing model artifacts.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create an upstream error preserving the collaborator's status
    pub fn upstream(status: u16, message: impl Into<String>) -> Self {
        Self::Upstream {
            status,
            message: message.into(),
        }
    }

    /// Check if this error means the persisted model cannot be read
    pub fn is_unsupported_model(&self) -> bool {
        matches!(self, Self::UnsupportedModel { .. })
    }
}
