//! Error types for the Field Scribe domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant, so callers can branch on
//! the failure kind (retry a gateway error, show a validation error verbatim).

use thiserror::Error;

/// The top-level error type for all Field Scribe operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Model gateway errors ---
    #[error("Model gateway error: {0}")]
    Gateway(#[from] GatewayError),

    // --- Reply recovery errors ---
    #[error("Extraction failed: {0}")]
    Extraction(#[from] ExtractionFailure),

    // --- Schema errors ---
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    // --- Record store errors ---
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Failures of the external text-completion service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    #[error("Model service unavailable: {0}")]
    Unavailable(String),

    #[error("Rate limited by model service, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Request timed out: {0}")]
    Timeout(String),
}

impl GatewayError {
    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        !matches!(self, Self::Unauthorized(_))
    }
}

/// No structured payload could be recovered from a model reply.
///
/// The raw reply is always attached for diagnosis.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionFailure {
    #[error("no structured payload found in model reply")]
    NoPayload { raw: String },

    #[error("malformed payload in model reply: {reason}")]
    PayloadParse { reason: String, raw: String },
}

impl ExtractionFailure {
    /// The unmodified model reply.
    pub fn raw_text(&self) -> &str {
        match self {
            Self::NoPayload { raw } | Self::PayloadParse { raw, .. } => raw,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("field '{field}' has value '{value}', expected one of [{}]", allowed.join(", "))]
    NotInDomain {
        field: String,
        value: String,
        allowed: Vec<String>,
    },

    #[error("field '{field}' expected {expected}, found {found}")]
    WrongShape {
        field: String,
        expected: String,
        found: String,
    },

    #[error("field '{field}' is not part of the schema")]
    UnknownField { field: String },

    #[error("missing required fields: {}", fields.join(", "))]
    MissingRequired { fields: Vec<String> },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Interaction not found: {0}")]
    NotFound(i64),

    #[error("Merge conflict on interaction {id}: expected version {expected}, stored version is {actual}")]
    Conflict { id: i64, expected: u64, actual: u64 },

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),
}
