//! Report export.
//!
//! Turns a [`FeedReport`] into the shapes its consumers read:
//!
//! - [`ExportReport`] - downloadable JSON report
//! - [`coverage_rows`] - per-field coverage table
//! - [`render_summary`] - plain-text summary for the terminal
//!
//! # Export format
//!
//! ```json
//! {
//!   "summary": { "total": 2, "errors": 1, "warnings": 0 },
//!   "missing_required_fields": ["seller_url"],
//!   "missing_recommended_fields": [],
//!   "errors": [{ "record_id": "SKU2", "errors": ["'price' must be a number"] }],
//!   "warnings": []
//! }
//! ```

use chrono::{DateTime, TimeZone};
use serde::{Deserialize, Serialize};

use crate::models::FieldIssue;
use crate::spec::FieldSpecRegistry;
use crate::validation::{FeedReport, RecordReport};

/// Maximum error and warning entries written to an export by default.
pub const DEFAULT_ENTRY_LIMIT: usize = 100;

/// Records listed per section in the text summary.
const SUMMARY_RECORD_LIMIT: usize = 50;

// =============================================================================
// Export Report
// =============================================================================

/// Serializable validation report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportReport {
    pub summary: ReportSummary,
    pub missing_required_fields: Vec<String>,
    pub missing_recommended_fields: Vec<String>,
    pub errors: Vec<RecordErrors>,
    pub warnings: Vec<RecordWarnings>,
}

/// Headline counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total: usize,
    pub errors: usize,
    pub warnings: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordErrors {
    pub record_id: String,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordWarnings {
    pub record_id: String,
    pub warnings: Vec<String>,
}

impl ExportReport {
    /// Build an export keeping at most `limit` error and `limit` warning entries.
    pub fn from_report(report: &FeedReport, limit: usize) -> Self {
        Self {
            summary: ReportSummary {
                total: report.total_records,
                errors: report.records_with_errors,
                warnings: report.records_with_warnings,
            },
            missing_required_fields: report.missing_required_fields.iter().cloned().collect(),
            missing_recommended_fields: report.missing_recommended_fields.iter().cloned().collect(),
            errors: report
                .records_with_error_reports()
                .take(limit)
                .map(|r| RecordErrors {
                    record_id: r.record_id.to_string(),
                    errors: r.error_messages(),
                })
                .collect(),
            warnings: report
                .records_with_warning_reports()
                .take(limit)
                .map(|r| RecordWarnings {
                    record_id: r.record_id.to_string(),
                    warnings: r.warning_messages(),
                })
                .collect(),
        }
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl From<&FeedReport> for ExportReport {
    fn from(report: &FeedReport) -> Self {
        Self::from_report(report, DEFAULT_ENTRY_LIMIT)
    }
}

/// `validation_report_YYYYMMDD_HHMMSS.json`
pub fn report_file_name<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("validation_report_{}.json", at.format("%Y%m%d_%H%M%S"))
}

// =============================================================================
// Coverage Table
// =============================================================================

/// How a field is marked in the coverage table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldStatus {
    Required,
    Recommended,
    Optional,
}

/// One row of the coverage table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageRow {
    pub field: String,
    pub filled: usize,
    /// Formatted with one decimal, e.g. `"30.0%"`.
    pub coverage: String,
    pub status: FieldStatus,
}

/// Coverage rows for the fields that appear in the feed.
pub fn coverage_rows(report: &FeedReport, registry: &FieldSpecRegistry) -> Vec<CoverageRow> {
    report
        .field_coverage
        .iter()
        .filter(|c| c.present)
        .map(|c| {
            let status = match registry.get(&c.field_name) {
                Some(spec) if spec.is_required() => FieldStatus::Required,
                Some(spec) if spec.recommended => FieldStatus::Recommended,
                _ => FieldStatus::Optional,
            };
            CoverageRow {
                field: c.field_name.clone(),
                filled: c.filled_count,
                coverage: format!("{:.1}%", c.percentage),
                status,
            }
        })
        .collect()
}

// =============================================================================
// Text Summary
// =============================================================================

/// Human-readable summary: counts, missing columns with their descriptions,
/// then per-record issues.
pub fn render_summary(report: &FeedReport, registry: &FieldSpecRegistry) -> String {
    let mut lines = vec![
        format!("Total products:         {}", report.total_records),
        format!("Products with errors:   {}", report.records_with_errors),
        format!("Products with warnings: {}", report.records_with_warnings),
        format!("Success rate:           {:.1}%", report.success_rate()),
    ];

    lines.extend(missing_section("Missing required fields", &report.missing_required_fields, registry));
    lines.extend(missing_section(
        "Missing recommended fields",
        &report.missing_recommended_fields,
        registry,
    ));

    let with_errors: Vec<&RecordReport> = report.records_with_error_reports().collect();
    lines.extend(issue_section("Errors", &with_errors, |r| &r.errors));

    let with_warnings: Vec<&RecordReport> = report.records_with_warning_reports().collect();
    lines.extend(issue_section("Warnings", &with_warnings, |r| &r.warnings));

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

fn missing_section<'a>(
    title: &str,
    fields: impl IntoIterator<Item = &'a String>,
    registry: &FieldSpecRegistry,
) -> Vec<String> {
    let fields: Vec<&String> = fields.into_iter().collect();
    if fields.is_empty() {
        return Vec::new();
    }

    let mut lines = vec![format!("\n{}:", title)];
    for field in fields {
        let description = registry.get(field).map(|s| s.description.as_str()).unwrap_or("");
        lines.push(format!("  - {}: {}", field, description));
    }
    lines
}

fn issue_section(
    title: &str,
    reports: &[&RecordReport],
    issues: impl Fn(&RecordReport) -> &Vec<FieldIssue>,
) -> Vec<String> {
    if reports.is_empty() {
        return Vec::new();
    }

    let mut lines = vec![format!("\n{} ({} products):", title, reports.len())];
    for r in reports.iter().copied().take(SUMMARY_RECORD_LIMIT) {
        lines.push(format!("  {}", r.record_id));
        for issue in issues(r) {
            lines.push(format!("    - {}", issue));
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Record;
    use crate::testing::sample_record;
    use crate::validation::validate_feed;
    use chrono::Utc;
    use serde_json::json;

    fn mixed_report() -> FeedReport {
        let mut bad = sample_record();
        bad.insert("id", "SKU2");
        bad.insert("price", "USD 79.99");

        let mut warned = sample_record();
        warned.insert("id", "SKU3");
        warned.insert("gtin", "");

        validate_feed(&[sample_record(), bad, warned], FieldSpecRegistry::builtin())
    }

    #[test]
    fn test_export_shape() {
        let export = ExportReport::from(&mixed_report());
        let json = serde_json::to_value(&export).unwrap();

        assert_eq!(json["summary"], json!({"total": 3, "errors": 1, "warnings": 1}));
        assert_eq!(json["missing_required_fields"], json!([]));
        assert_eq!(
            json["errors"],
            json!([{"record_id": "SKU2", "errors": ["'price' must be a number"]}])
        );
        assert_eq!(
            json["warnings"],
            json!([{"record_id": "SKU3", "warnings": ["Recommended field 'gtin' is missing"]}])
        );
    }

    #[test]
    fn test_export_limit() {
        let records: Vec<Record> = (0..5).map(|_| Record::new().with("title", "Shoe")).collect();
        let report = validate_feed(&records, FieldSpecRegistry::builtin());

        let export = ExportReport::from_report(&report, 2);
        assert_eq!(export.summary.errors, 5);
        assert_eq!(export.errors.len(), 2);
        assert_eq!(export.errors[1].record_id, "Row 1");
    }

    #[test]
    fn test_export_lists_missing_columns() {
        let report = validate_feed(&[Record::new().with("title", "Shoe")], FieldSpecRegistry::builtin());
        let export = ExportReport::from(&report);

        assert!(export.missing_required_fields.contains(&"price".to_string()));
        assert_eq!(export.missing_recommended_fields, vec!["gtin"]);
    }

    #[test]
    fn test_report_file_name() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(report_file_name(&at), "validation_report_20240309_140507.json");
    }

    #[test]
    fn test_coverage_rows() {
        let records = vec![
            Record::new().with("id", "A").with("gtin", "123456789012"),
            Record::new().with("id", "B"),
        ];
        let registry = FieldSpecRegistry::builtin();
        let rows = coverage_rows(&validate_feed(&records, registry), registry);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].field, "id");
        assert_eq!(rows[0].coverage, "100.0%");
        assert_eq!(rows[0].status, FieldStatus::Required);
        assert_eq!(rows[1].field, "gtin");
        assert_eq!(rows[1].filled, 1);
        assert_eq!(rows[1].coverage, "50.0%");
        assert_eq!(rows[1].status, FieldStatus::Recommended);
    }

    #[test]
    fn test_render_summary_layout() {
        let text = render_summary(&mixed_report(), FieldSpecRegistry::builtin());

        let expected = [
            "Total products:         3",
            "Products with errors:   1",
            "Products with warnings: 1",
            "Success rate:           66.7%",
            "",
            "Errors (1 products):",
            "  SKU2",
            "    - 'price' must be a number",
            "",
            "Warnings (1 products):",
            "  SKU3",
            "    - Recommended field 'gtin' is missing",
            "",
        ]
        .join("\n");
        assert_eq!(text, expected);
    }

    #[test]
    fn test_render_summary() {
        let registry = FieldSpecRegistry::builtin();
        let report = validate_feed(&[Record::new().with("title", "Shoe")], registry);
        let text = render_summary(&report, registry);

        assert!(text.contains("Total products:         1"));
        assert!(text.contains("Success rate:           0.0%"));
        assert!(text.contains("- seller_url: Seller page (HTTPS preferred)"));
        assert!(text.contains("Row 0"));
        assert!(text.contains("Required field 'price' is missing"));
    }
}
