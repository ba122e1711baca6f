//! Error types for the feedcheck validation pipeline.
//!
//! Data-quality problems (a missing title, a malformed price) are never errors
//! here: they become [`crate::models::FieldIssue`]s inside a
//! [`crate::validation::FeedReport`]. The types below cover the program and I/O
//! failures around the core:
//!
//! - [`CsvError`] - CSV decoding errors
//! - [`SpecError`] - Field specification table errors
//! - [`ExtractError`] - Page fetching errors
//! - [`ConfigError`] - Environment configuration errors
//! - [`PipelineError`] - Top-level orchestration errors
//! - [`ServerError`] - HTTP layer errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use thiserror::Error;

// =============================================================================
// CSV Parsing Errors
// =============================================================================

/// Errors during CSV parsing.
#[derive(Debug, Error)]
pub enum CsvError {
    /// Failed to read file.
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to decode the file content.
    #[error("Failed to decode content: {0}")]
    EncodingError(String),

    /// Invalid CSV row.
    #[error("Line {line}: {message}")]
    ParseError { line: usize, message: String },

    /// Empty file.
    #[error("CSV file is empty")]
    EmptyFile,

    /// No headers found.
    #[error("No headers found in CSV")]
    NoHeaders,
}

// =============================================================================
// Field Specification Errors
// =============================================================================

/// Errors while loading a field specification table.
#[derive(Debug, Error)]
pub enum SpecError {
    /// Failed to read the table file.
    #[error("Failed to read field specification: {0}")]
    IoError(#[from] std::io::Error),

    /// Malformed table (bad JSON, unknown type, invalid pattern).
    #[error("Invalid field specification: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Two entries share a name.
    #[error("Duplicate field specification: {0}")]
    DuplicateField(String),

    /// A conditional rule points at a field the table does not define.
    #[error("Field '{field}' depends on unknown field '{dependency}'")]
    UnknownDependency { field: String, dependency: String },
}

// =============================================================================
// Extraction Errors
// =============================================================================

/// Errors while fetching an external page for extraction.
///
/// A page without recognizable product data is not an error: the extractor
/// falls back to page metadata instead.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The URL cannot be fetched.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    /// Server answered with a non-success status.
    #[error("Unexpected HTTP status {0}")]
    Status(u16),

    /// Timeout.
    #[error("Request timed out")]
    Timeout,
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Errors while reading settings from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A variable is set but cannot be parsed.
    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue { key: String, value: String },
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level pipeline orchestration errors.
///
/// This is the main error type returned by [`crate::pipeline`] entry points.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// CSV parsing error.
    #[error("CSV error: {0}")]
    Csv(#[from] CsvError),

    /// Field specification error.
    #[error("Spec error: {0}")]
    Spec(#[from] SpecError),

    /// Extraction error.
    #[error("Extract error: {0}")]
    Extract(#[from] ExtractError),

    /// JSON input or output error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Input that is neither CSV nor a JSON array of objects.
    #[error("Unsupported input: {0}")]
    UnsupportedInput(String),

    /// Selected record does not exist.
    #[error("Record not found: {0}")]
    RecordNotFound(String),
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Pipeline error.
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Invalid request.
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Server internal error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for CSV operations.
pub type CsvResult<T> = Result<T, CsvError>;

/// Result type for specification loading.
pub type SpecResult<T> = Result<T, SpecError>;

/// Result type for extraction operations.
pub type ExtractResult<T> = Result<T, ExtractError>;

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        // CsvError -> PipelineError
        let csv_err = CsvError::EmptyFile;
        let pipeline_err: PipelineError = csv_err.into();
        assert!(pipeline_err.to_string().contains("empty"));

        // SpecError -> PipelineError
        let spec_err = SpecError::DuplicateField("title".into());
        let pipeline_err: PipelineError = spec_err.into();
        assert!(pipeline_err.to_string().contains("title"));

        // PipelineError -> ServerError
        let server_err: ServerError = PipelineError::RecordNotFound("SKU1".into()).into();
        assert!(server_err.to_string().contains("SKU1"));
    }

    #[test]
    fn test_unknown_dependency_format() {
        let err = SpecError::UnknownDependency {
            field: "mpn".into(),
            dependency: "gtin".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("mpn"));
        assert!(msg.contains("gtin"));
    }

    #[test]
    fn test_csv_parse_error_format() {
        let err = CsvError::ParseError {
            line: 5,
            message: "unterminated quote".into(),
        };
        assert_eq!(err.to_string(), "Line 5: unterminated quote");
    }
}
