//! Error types for the normalization pipeline.
//!
//! - [`DecodeError`] - Upstream spreadsheet container decoding
//! - [`TagError`] - Compact tag expansion errors
//! - [`NormalizeError`] - Engine errors raised by category handlers
//! - [`DeliveryError`] - Re-serialization, outbox and snapshot errors
//! - [`JobError`] - Top-level job orchestration errors
//! - [`ServerError`] - HTTP layer errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use thiserror::Error;

// =============================================================================
// Decode Errors
// =============================================================================

/// Errors while decoding an uploaded document into a raw workbook.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Failed to read file.
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    /// The payload is not an `.xlsx` container.
    #[error("Unsupported document format: {0}")]
    UnsupportedFormat(String),

    /// The container could not be parsed.
    #[error("Invalid spreadsheet: {0}")]
    Xlsx(#[from] calamine::XlsxError),

    /// No sheet carries any data.
    #[error("Workbook contains no data")]
    EmptyWorkbook,
}

// =============================================================================
// Tag Errors
// =============================================================================

/// Errors while expanding a compact tag.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TagError {
    /// The tag resolves to more identifiers than one row may generate.
    #[error("Tag '{tag}' spans {span} identifiers, limit is {limit}")]
    SpanTooLarge { tag: String, span: u64, limit: u64 },
}

// =============================================================================
// Normalization Errors
// =============================================================================

/// Errors raised while normalizing a sheet. Any of these aborts the job.
#[derive(Debug, Error)]
pub enum NormalizeError {
    /// A column the category cannot work without is absent.
    #[error("Sheet '{sheet}' has no '{column}' column")]
    MissingColumn { sheet: String, column: String },

    /// An output sheet already exists with a different header.
    #[error("Output sheet '{sheet}' already has header {existing:?}, cannot extend with {incoming:?}")]
    HeaderConflict {
        sheet: String,
        existing: Vec<String>,
        incoming: Vec<String>,
    },

    /// A compact tag expands past the span limit.
    #[error("Sheet '{sheet}': tag '{tag}' spans {span} identifiers, limit is {limit}")]
    RangeTooLarge {
        sheet: String,
        tag: String,
        span: u64,
        limit: u64,
    },

    /// A canonical row does not match its header length.
    #[error("Row for sheet '{sheet}' has {found} cells, header has {expected}")]
    ShapeMismatch {
        sheet: String,
        expected: usize,
        found: usize,
    },
}

// =============================================================================
// Delivery Errors
// =============================================================================

/// Errors from the delivery and persistence collaborators.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// Workbook re-serialization failed.
    #[error("Failed to write spreadsheet: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    /// Outbox or snapshot IO error.
    #[error("Delivery IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Envelope or snapshot encoding error.
    #[error("Delivery JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// The job has no usable recipient.
    #[error("Invalid recipient: {0}")]
    InvalidRecipient(String),
}

// =============================================================================
// Job Errors (top-level)
// =============================================================================

/// Top-level job errors.
///
/// This is the error type returned by [`crate::transform::pipeline::Orchestrator::transform`].
#[derive(Debug, Error)]
pub enum JobError {
    /// Upstream decoding error.
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Normalization error.
    #[error("Normalize error: {0}")]
    Normalize(#[from] NormalizeError),

    /// Delivery or persistence error.
    #[error("Delivery error: {0}")]
    Delivery(#[from] DeliveryError),
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Job error.
    #[error("Job error: {0}")]
    Job(#[from] JobError),

    /// Invalid request.
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Upload exceeds the configured limit.
    #[error("Upload of {size} bytes exceeds limit of {limit} bytes")]
    PayloadTooLarge { size: usize, limit: usize },

    /// Server internal error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for decoding operations.
pub type DecodeResult<T> = Result<T, DecodeError>;

/// Result type for tag expansion.
pub type TagResult<T> = Result<T, TagError>;

/// Result type for normalization operations.
pub type NormalizeResult<T> = Result<T, NormalizeError>;

/// Result type for delivery operations.
pub type DeliveryResult<T> = Result<T, DeliveryError>;

/// Result type for job operations.
pub type JobResult<T> = Result<T, JobError>;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

impl NormalizeError {
    /// Attach the sheet being normalized to a tag error.
    pub fn from_tag(sheet: &str, err: TagError) -> Self {
        match err {
            TagError::SpanTooLarge { tag, span, limit } => NormalizeError::RangeTooLarge {
                sheet: sheet.to_string(),
                tag,
                span,
                limit,
            },
        }
    }
}
