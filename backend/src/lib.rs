//! # Feedcheck - product feed validation and schema.org markup
//!
//! Feedcheck checks product feeds (CSV or JSON) against a table of field
//! specifications, reports per-record problems and per-field coverage, turns
//! records into schema.org Product JSON-LD, and reads products back out of
//! existing pages.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  CSV / JSON │────▶│   Parser    │────▶│  Validator  │────▶│   Report    │
//! │  (ISO/UTF8) │     │  (auto-enc) │     │ (spec table)│     │ (JSON/text) │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//!                            │
//!                            ▼
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ Product page│────▶│  Extractor  │     │   Mapper    │────▶ JSON-LD
//! │   (HTML)    │     │  (JSON-LD)  │     │ (schema.org)│
//! └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use feedcheck::{validate_feed, map_record, FieldSpecRegistry, Record};
//!
//! let record = Record::new().with("id", "SKU1").with("title", "Shoe");
//! let report = validate_feed(&[record.clone()], FieldSpecRegistry::builtin());
//! println!("{} errors", report.record_reports[0].errors.len());
//!
//! let markup = map_record(&record);
//! println!("{}", markup.to_json_pretty().unwrap());
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Records, raw values and issues
//! - [`spec`] - Field specification table
//! - [`parser`] - CSV/JSON parsing with auto-detection
//! - [`validation`] - Field, conditional and feed validation
//! - [`report`] - Report export and text summary
//! - [`markup`] - schema.org Product mapping and schema check
//! - [`extract`] - Records from structured data in pages
//! - [`pipeline`] - High-level entry points
//! - [`config`] - Environment settings
//! - [`api`] - HTTP API server

// Core modules
pub mod error;
pub mod models;
pub mod spec;
pub mod config;

// Parsing
pub mod parser;

// Validation
pub mod validation;
pub mod report;

// Markup
pub mod markup;
pub mod extract;

// Orchestration
pub mod pipeline;

// HTTP API
pub mod api;

#[cfg(test)]
mod testing;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    ConfigError, CsvError, ExtractError, PipelineError, PipelineResult, ServerError, SpecError,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{FieldIssue, IssueKind, RawValue, Record, RecordId, Severity};

// =============================================================================
// Re-exports - Specification
// =============================================================================

pub use spec::{Condition, FieldKind, FieldSpec, FieldSpecRegistry, Requirement};

// =============================================================================
// Re-exports - Validation
// =============================================================================

pub use validation::{
    validate_feed, validate_field, FeedReport, FeedValidator, FieldCoverage, FieldValidation,
    RecordReport, ValidationOptions,
};

pub use report::{render_summary, ExportReport};

// =============================================================================
// Re-exports - CSV Parsing
// =============================================================================

pub use parser::{
    decode_content, detect_delimiter, detect_encoding, parse_bytes_auto, parse_csv_file_auto,
    parse_json_records, ParseResult,
};

// =============================================================================
// Re-exports - Markup and extraction
// =============================================================================

pub use markup::{map_record, Availability, MarkupMapper, ProductMarkup};

pub use extract::{extract_records, ExternalDocument};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use pipeline::{
    validate_bytes, validate_file, validate_records, PipelineOptions, RecordSelector, ValidationRun,
};

pub use config::Settings;

// Server
pub mod server {
    pub use crate::api::server::start_server;
}
