//! Core Error Types
//!
//! Error types for the eligibility core. Only thiserror and serde so the
//! crate stays free of I/O and runtime dependencies.
//!
//! The service crate wraps these in its own `AppError` alongside storage and
//! provider failures.

use serde::Serialize;
use thiserror::Error;

/// Core error type for the eligibility pipeline.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Scheme name is not part of the catalog
    #[error("Unknown scheme: {0}")]
    UnknownScheme(String),

    /// Catalog violates one of its invariants
    #[error("Invalid catalog: {0}")]
    InvalidCatalog(String),

    /// An action marker was found but could not be parsed
    #[error("Malformed action directive: {0}")]
    MalformedAction(#[from] MalformedAction),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),
}

/// Result type alias for core errors
pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// Create an unknown scheme error
    pub fn unknown_scheme(name: impl Into<String>) -> Self {
        Self::UnknownScheme(name.into())
    }

    /// Create an invalid catalog error
    pub fn invalid_catalog(msg: impl Into<String>) -> Self {
        Self::InvalidCatalog(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }
}

impl From<CoreError> for String {
    fn from(err: CoreError) -> String {
        err.to_string()
    }
}

/// Why an action marker in an assistant reply was rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum MalformedReason {
    #[error("unsupported action `{0}`")]
    UnsupportedAction(String),

    #[error("scheme name is empty")]
    EmptyScheme,

    #[error("missing `{0}` segment")]
    MissingSegment(&'static str),

    #[error("details are not valid JSON: {0}")]
    InvalidJson(String),

    #[error("details must be a JSON object")]
    DetailsNotObject,

    #[error("marker is not closed with `]`")]
    Unterminated,

    /// Well-formed marker sent before every required field was known
    #[error("required fields still missing: {}", .0.join(", "))]
    MissingFields(Vec<String>),
}

/// A marker that looked like an action directive but did not follow the
/// `[ACTION: OPEN_PORTAL | scheme: .. | details: {..}]` shape.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("{reason} in `{raw}`")]
pub struct MalformedAction {
    /// The offending marker text as it appeared in the reply
    pub raw: String,
    pub reason: MalformedReason,
}
