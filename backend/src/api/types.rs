//! REST API request and response types.
//!
//! Envelopes use camelCase; the embedded export report keeps its own
//! documented snake_case layout so it can be saved as-is.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::markup::ProductMarkup;
use crate::models::Record;
use crate::pipeline::{format_delimiter, CsvInfo, ValidationRun};
use crate::report::{coverage_rows, report_file_name, CoverageRow, ExportReport};
use crate::spec::{FieldSpec, FieldSpecRegistry};
use crate::validation::ValidationOptions;

// =============================================================================
// Requests
// =============================================================================

/// Body of `POST /api/validate/records`
#[derive(Debug, Clone, Deserialize)]
pub struct ValidateRecordsRequest {
    pub records: Vec<Record>,
    #[serde(default)]
    pub options: ValidationOptions,
}

/// Body of `POST /api/markup`
#[derive(Debug, Clone, Deserialize)]
pub struct MarkupRequest {
    pub record: Record,
}

/// Body of `POST /api/extract`: a page URL to fetch, or HTML to decode.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractRequest {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub html: Option<String>,
    /// Base URL for relative links when `html` is given
    #[serde(default)]
    pub source_url: Option<String>,
}

// =============================================================================
// Responses
// =============================================================================

/// Response to a validation request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResponse {
    /// Unique job identifier
    pub job_id: String,

    /// "ready" (no errors), "warning" (warnings only) or "error"
    pub status: String,

    pub created_at: DateTime<Utc>,

    /// Suggested download name for `report`
    pub report_file: String,

    pub success_rate: f64,

    pub coverage: Vec<CoverageRow>,

    pub report: ExportReport,

    pub csv_info: Option<CsvMetadata>,
}

/// CSV file metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvMetadata {
    pub encoding: String,
    pub delimiter: String,
    pub row_count: usize,
    pub columns: Vec<String>,
}

impl From<CsvInfo> for CsvMetadata {
    fn from(info: CsvInfo) -> Self {
        Self {
            encoding: info.encoding,
            delimiter: format_delimiter(info.delimiter),
            row_count: info.row_count,
            columns: info.headers,
        }
    }
}

impl ValidationResponse {
    pub fn from_run(run: ValidationRun, registry: &FieldSpecRegistry) -> Self {
        let created_at = Utc::now();
        let status = if run.report.records_with_errors > 0 || !run.report.missing_required_fields.is_empty() {
            "error"
        } else if run.report.records_with_warnings > 0 {
            "warning"
        } else {
            "ready"
        };

        Self {
            job_id: Uuid::new_v4().to_string(),
            status: status.to_string(),
            created_at,
            report_file: report_file_name(&created_at),
            success_rate: run.report.success_rate(),
            coverage: coverage_rows(&run.report, registry),
            report: run.export,
            csv_info: run.csv_info.map(CsvMetadata::from),
        }
    }
}

/// Response to a markup request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkupResponse {
    pub markup: ProductMarkup,
    /// `<script type="application/ld+json">` block for the product page
    pub script_tag: String,
    pub missing_core_properties: Vec<&'static str>,
    /// Violations of the markup schema, empty when valid
    pub schema_errors: Vec<String>,
}

impl MarkupResponse {
    pub fn new(markup: ProductMarkup) -> Result<Self, serde_json::Error> {
        Ok(Self {
            script_tag: markup.to_script_tag()?,
            missing_core_properties: markup.missing_core_properties(),
            schema_errors: markup.validate().err().unwrap_or_default(),
            markup,
        })
    }
}

/// Response to an extraction request: the records plus their validation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractResponse {
    pub job_id: String,
    pub records: Vec<Record>,
    pub validation: ValidationResponse,
}

/// Field table as served by `GET /api/specs`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecsResponse<'a> {
    pub total: usize,
    pub required: Vec<&'a str>,
    pub fields: &'a [FieldSpec],
}

impl<'a> From<&'a FieldSpecRegistry> for SpecsResponse<'a> {
    fn from(registry: &'a FieldSpecRegistry) -> Self {
        Self {
            total: registry.len(),
            required: registry.required_fields(),
            fields: registry.all(),
        }
    }
}

/// Create an error response
pub fn error_response(error: &str) -> Value {
    json!({
        "jobId": Uuid::new_v4().to_string(),
        "status": "error",
        "error": error,
        "createdAt": Utc::now(),
    })
}
