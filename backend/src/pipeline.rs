//! High-level pipeline API: input → records → report / markup.
//!
//! Combines parsing, validation, report export, markup generation and page
//! extraction behind a few entry points, logging each step through
//! [`crate::api::logs`].
//!
//! # Example
//!
//! ```rust,ignore
//! use feedcheck::pipeline::{validate_file, PipelineOptions};
//! use std::path::Path;
//!
//! let run = validate_file(Path::new("feed.csv"), &PipelineOptions::default())?;
//! println!("{} of {} products have errors", run.report.records_with_errors, run.report.total_records);
//! ```

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::path::{Path, PathBuf};

use crate::api::logs::{log_info, log_info_indent, log_success, log_warning, log_warning_indent};
use crate::error::{PipelineError, PipelineResult};
use crate::extract::html::{parse_html, PageFetcher};
use crate::extract::{extract_records, ExternalDocument};
use crate::markup::{map_record, ProductMarkup};
use crate::models::Record;
use crate::parser::{parse_bytes_auto, parse_csv_file_auto, parse_json_records, ParseResult};
use crate::report::{ExportReport, DEFAULT_ENTRY_LIMIT};
use crate::spec::FieldSpecRegistry;
use crate::validation::{FeedReport, FeedValidator, ValidationOptions};

/// Options for a validation run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineOptions {
    /// Field specification table replacing the built-in one
    pub spec_path: Option<PathBuf>,

    /// Validation knobs
    pub validation: ValidationOptions,

    /// Maximum error/warning entries in the exported report
    pub report_limit: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            spec_path: None,
            validation: ValidationOptions::default(),
            report_limit: DEFAULT_ENTRY_LIMIT,
        }
    }
}

/// Result of a validation run
#[derive(Debug, Clone, Serialize)]
pub struct ValidationRun {
    /// Records as parsed from the input
    pub records: Vec<Record>,

    /// Full validation report
    pub report: FeedReport,

    /// Export form of the report
    pub export: ExportReport,

    /// CSV parsing metadata, when the input was CSV
    pub csv_info: Option<CsvInfo>,
}

/// CSV file information
#[derive(Debug, Clone, Serialize)]
pub struct CsvInfo {
    pub encoding: String,
    pub delimiter: char,
    pub headers: Vec<String>,
    pub row_count: usize,
}

impl From<&ParseResult> for CsvInfo {
    fn from(parsed: &ParseResult) -> Self {
        Self {
            encoding: parsed.encoding.clone(),
            delimiter: parsed.delimiter,
            headers: parsed.headers.clone(),
            row_count: parsed.records.len(),
        }
    }
}

/// Which record to turn into markup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordSelector {
    /// Zero-based position in the feed
    Index(usize),
    /// Value of the record's `id` field
    Id(String),
}

// =============================================================================
// Validation
// =============================================================================

/// Built-in registry, or the table at `spec_path`.
pub fn load_registry(spec_path: Option<&Path>) -> PipelineResult<Cow<'static, FieldSpecRegistry>> {
    match spec_path {
        None => Ok(Cow::Borrowed(FieldSpecRegistry::builtin())),
        Some(path) => {
            log_info(format!("Loading field specification: {}", path.display()));
            let registry = FieldSpecRegistry::from_path(path)?;
            log_success(format!("{} field specifications loaded", registry.len()));
            Ok(Cow::Owned(registry))
        }
    }
}

/// Read a feed file: `.json` as a JSON array of objects, anything else as CSV.
pub fn read_feed(path: &Path) -> PipelineResult<(Vec<Record>, Option<CsvInfo>)> {
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));

    if is_json {
        log_info("📖 Reading JSON feed...");
        let content = std::fs::read_to_string(path)?;
        let records = parse_json_records(&content)?;
        log_success(format!("Read {} records", records.len()));
        Ok((records, None))
    } else {
        log_info("📖 Reading CSV file...");
        let parsed = parse_csv_file_auto(path)?;
        Ok(log_csv(parsed))
    }
}

fn log_csv(parsed: ParseResult) -> (Vec<Record>, Option<CsvInfo>) {
    log_success(format!("Detected encoding: {}", parsed.encoding));
    log_success(format!("Detected separator: '{}'", format_delimiter(parsed.delimiter)));
    log_success(format!("Read {} rows, {} columns", parsed.records.len(), parsed.headers.len()));
    let info = CsvInfo::from(&parsed);
    (parsed.records, Some(info))
}

/// Validate a feed file.
pub fn validate_file(path: &Path, options: &PipelineOptions) -> PipelineResult<ValidationRun> {
    let (records, csv_info) = read_feed(path)?;
    run_validation(records, csv_info, options)
}

/// Validate CSV bytes (e.g. an upload).
pub fn validate_bytes(bytes: &[u8], options: &PipelineOptions) -> PipelineResult<ValidationRun> {
    log_info("📖 Reading CSV upload...");
    let parsed = parse_bytes_auto(bytes)?;
    let (records, csv_info) = log_csv(parsed);
    run_validation(records, csv_info, options)
}

/// Validate records that are already decoded.
pub fn validate_records(records: Vec<Record>, options: &PipelineOptions) -> PipelineResult<ValidationRun> {
    run_validation(records, None, options)
}

fn run_validation(
    records: Vec<Record>,
    csv_info: Option<CsvInfo>,
    options: &PipelineOptions,
) -> PipelineResult<ValidationRun> {
    let registry = load_registry(options.spec_path.as_deref())?;

    log_info(format!("✔️  Validating {} products against {} fields...", records.len(), registry.len()));
    let report = FeedValidator::new(&registry)
        .with_options(options.validation.clone())
        .validate(&records);
    log_report(&report);

    let export = ExportReport::from_report(&report, options.report_limit);

    Ok(ValidationRun {
        records,
        report,
        export,
        csv_info,
    })
}

fn log_report(report: &FeedReport) {
    if !report.missing_required_fields.is_empty() {
        log_warning(format!("{} required columns missing:", report.missing_required_fields.len()));
        for field in &report.missing_required_fields {
            log_warning_indent(field.clone(), 1);
        }
    }
    if !report.missing_recommended_fields.is_empty() {
        log_info(format!("{} recommended columns missing:", report.missing_recommended_fields.len()));
        for field in &report.missing_recommended_fields {
            log_info_indent(field.clone(), 1);
        }
    }

    if report.records_with_errors == 0 {
        log_success(format!("All {} products passed validation", report.total_records));
    } else {
        log_warning(format!(
            "{} of {} products have errors ({:.1}% success rate)",
            report.records_with_errors,
            report.total_records,
            report.success_rate()
        ));
    }
    if report.records_with_warnings > 0 {
        log_warning(format!("{} products have warnings", report.records_with_warnings));
    }
}

/// Format delimiter for display
pub fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "TAB".to_string(),
        c => c.to_string(),
    }
}

// =============================================================================
// Markup
// =============================================================================

/// Pick one record from a feed.
pub fn select_record<'a>(records: &'a [Record], selector: &RecordSelector) -> PipelineResult<&'a Record> {
    match selector {
        RecordSelector::Index(i) => records
            .get(*i)
            .ok_or_else(|| PipelineError::RecordNotFound(format!("row {} (feed has {} rows)", i, records.len()))),
        RecordSelector::Id(id) => records
            .iter()
            .find(|r| r.text("id").as_deref() == Some(id.as_str()))
            .ok_or_else(|| PipelineError::RecordNotFound(format!("id '{}'", id))),
    }
}

/// Markup for the selected record, with schema problems logged.
pub fn markup_for(records: &[Record], selector: &RecordSelector) -> PipelineResult<ProductMarkup> {
    let record = select_record(records, selector)?;
    let markup = map_record(record);

    let missing = markup.missing_core_properties();
    if missing.is_empty() {
        log_success("Markup includes all core properties");
    } else {
        log_warning(format!("Markup is missing core properties: {}", missing.join(", ")));
    }

    Ok(markup)
}

// =============================================================================
// Extraction
// =============================================================================

/// Records from an HTML page already in memory.
pub fn extract_from_html(html: &str, source_url: Option<&str>) -> Vec<Record> {
    let document = parse_html(html, source_url);
    records_from_document(&document)
}

/// Fetch a product page and extract its records.
pub async fn scrape_records(url: &str) -> PipelineResult<Vec<Record>> {
    log_info(format!("🌐 Fetching {}", url));
    let document = PageFetcher::default().fetch(url).await?;
    Ok(records_from_document(&document))
}

fn records_from_document(document: &ExternalDocument) -> Vec<Record> {
    let products = document.products().len();
    let records = extract_records(document);
    if products == 0 {
        log_warning("No structured product data found, using page metadata");
    } else {
        log_success(format!("Found {} product(s) in structured data", products));
    }
    records
}
