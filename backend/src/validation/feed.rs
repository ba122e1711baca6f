//! Feed-level validation.
//!
//! Runs the field validator over every record and every specified field and
//! aggregates the results into a [`FeedReport`]: coverage per field, feed-wide
//! missing columns, and one [`RecordReport`] per record.
//!
//! Bad values never abort a run. An empty feed yields an empty report.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::conditional::check_conditional;
use super::field::validate_field;
use crate::models::{FieldIssue, Record, RecordId, Severity};
use crate::spec::FieldSpecRegistry;

// =============================================================================
// Options
// =============================================================================

/// Knobs for a validation run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationOptions {
    /// Only check fields a record declares (the key exists, even if empty).
    /// By default every specified field is checked and undeclared ones count
    /// as missing.
    #[serde(default)]
    pub declared_fields_only: bool,

    /// Report triggered conditional requirements as errors instead of warnings.
    #[serde(default)]
    pub strict_conditionals: bool,
}

// =============================================================================
// Report
// =============================================================================

/// Coverage of one specified field across the feed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldCoverage {
    pub field_name: String,
    /// Some record declares the field.
    pub present: bool,
    /// Records with a non-empty value.
    pub filled_count: usize,
    /// `filled_count / total_records * 100`, 0 for an empty feed.
    pub percentage: f64,
}

/// Issues found in one record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordReport {
    pub record_id: RecordId,
    pub errors: Vec<FieldIssue>,
    pub warnings: Vec<FieldIssue>,
}

impl RecordReport {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn error_messages(&self) -> Vec<String> {
        self.errors.iter().map(|i| i.message.clone()).collect()
    }

    pub fn warning_messages(&self) -> Vec<String> {
        self.warnings.iter().map(|i| i.message.clone()).collect()
    }
}

/// Aggregate result of validating a feed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedReport {
    pub total_records: usize,
    pub records_with_errors: usize,
    pub records_with_warnings: usize,
    /// One entry per specified field, in registry order.
    pub field_coverage: Vec<FieldCoverage>,
    pub missing_required_fields: BTreeSet<String>,
    pub missing_recommended_fields: BTreeSet<String>,
    /// One entry per input record, in input order.
    pub record_reports: Vec<RecordReport>,
}

impl FeedReport {
    fn empty(total_records: usize) -> Self {
        Self {
            total_records,
            records_with_errors: 0,
            records_with_warnings: 0,
            field_coverage: Vec::new(),
            missing_required_fields: BTreeSet::new(),
            missing_recommended_fields: BTreeSet::new(),
            record_reports: Vec::with_capacity(total_records),
        }
    }

    pub fn coverage(&self, field_name: &str) -> Option<&FieldCoverage> {
        self.field_coverage.iter().find(|c| c.field_name == field_name)
    }

    /// Share of records without errors, in percent. 0 for an empty feed.
    pub fn success_rate(&self) -> f64 {
        if self.total_records == 0 {
            return 0.0;
        }
        (self.total_records - self.records_with_errors) as f64 * 100.0 / self.total_records as f64
    }

    /// No errors, no warnings, no missing columns.
    pub fn is_clean(&self) -> bool {
        self.records_with_errors == 0
            && self.records_with_warnings == 0
            && self.missing_required_fields.is_empty()
            && self.missing_recommended_fields.is_empty()
    }

    pub fn records_with_error_reports(&self) -> impl Iterator<Item = &RecordReport> {
        self.record_reports.iter().filter(|r| r.has_errors())
    }

    pub fn records_with_warning_reports(&self) -> impl Iterator<Item = &RecordReport> {
        self.record_reports.iter().filter(|r| r.has_warnings())
    }
}

// =============================================================================
// Validator
// =============================================================================

/// Validates whole feeds against a registry.
#[derive(Debug, Clone)]
pub struct FeedValidator<'a> {
    registry: &'a FieldSpecRegistry,
    options: ValidationOptions,
}

impl<'a> FeedValidator<'a> {
    pub fn new(registry: &'a FieldSpecRegistry) -> Self {
        Self {
            registry,
            options: ValidationOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ValidationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn validate(&self, records: &[Record]) -> FeedReport {
        let mut report = FeedReport::empty(records.len());

        self.coverage_pass(records, &mut report);

        for (index, record) in records.iter().enumerate() {
            let record_report = self.validate_record(index, record);
            if record_report.has_errors() {
                report.records_with_errors += 1;
            }
            if record_report.has_warnings() {
                report.records_with_warnings += 1;
            }
            report.record_reports.push(record_report);
        }

        report
    }

    /// Validate one record; `index` names it when it has no `id`.
    pub fn validate_record(&self, index: usize, record: &Record) -> RecordReport {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        let conditional_severity = if self.options.strict_conditionals {
            Severity::Error
        } else {
            Severity::Warning
        };

        for spec in self.registry.iter() {
            // Conditional rules apply whether or not the field is declared
            let conditional = check_conditional(spec, record, conditional_severity);

            if !self.options.declared_fields_only || record.declares(&spec.name) {
                let outcome = validate_field(&spec.name, record.value(&spec.name), spec);
                errors.extend(outcome.errors);
                warnings.extend(outcome.warnings);
            }

            if let Some(issue) = conditional {
                match issue.severity {
                    Severity::Error => errors.push(issue),
                    Severity::Warning => warnings.push(issue),
                }
            }
        }

        RecordReport {
            record_id: RecordId::for_record(record, index),
            errors,
            warnings,
        }
    }

    fn coverage_pass(&self, records: &[Record], report: &mut FeedReport) {
        let total = records.len();

        for spec in self.registry.iter() {
            let present = records.iter().any(|r| r.declares(&spec.name));
            let filled_count = records.iter().filter(|r| r.value(&spec.name).is_some()).count();
            let percentage = if total == 0 {
                0.0
            } else {
                filled_count as f64 * 100.0 / total as f64
            };

            if !present {
                if spec.is_required() {
                    report.missing_required_fields.insert(spec.name.clone());
                } else if spec.recommended {
                    report.missing_recommended_fields.insert(spec.name.clone());
                }
            }

            report.field_coverage.push(FieldCoverage {
                field_name: spec.name.clone(),
                present,
                filled_count,
                percentage,
            });
        }
    }
}

/// Validate `records` against `registry` with default options.
pub fn validate_feed(records: &[Record], registry: &FieldSpecRegistry) -> FeedReport {
    FeedValidator::new(registry).validate(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::IssueKind;
    use crate::spec::{FieldKind, FieldSpec};
    use crate::testing::sample_record;

    fn builtin() -> &'static FieldSpecRegistry {
        FieldSpecRegistry::builtin()
    }

    #[test]
    fn test_complete_record_is_clean() {
        let report = validate_feed(&[sample_record()], builtin());

        assert_eq!(report.total_records, 1);
        assert_eq!(report.records_with_errors, 0);
        assert_eq!(report.records_with_warnings, 0);
        assert!(report.missing_required_fields.is_empty());
        assert!(report.record_reports[0].errors.is_empty());
        assert_eq!(report.record_reports[0].record_id.to_string(), "SKU1");
        assert_eq!(report.success_rate(), 100.0);
    }

    #[test]
    fn test_title_only_record_lists_every_missing_required_field() {
        let report = validate_feed(&[Record::new().with("title", "Shoe")], builtin());
        let record = &report.record_reports[0];

        let missing: Vec<&str> = record
            .errors
            .iter()
            .filter(|i| i.kind == IssueKind::MissingField)
            .map(|i| i.field_name.as_str())
            .collect();
        for name in [
            "enable_search",
            "enable_checkout",
            "id",
            "link",
            "product_category",
            "material",
            "weight",
            "image_link",
            "price",
            "availability",
            "inventory_quantity",
            "seller_name",
            "seller_url",
            "return_policy",
            "return_window",
        ] {
            assert_eq!(missing.iter().filter(|m| **m == name).count(), 1, "{}", name);
        }
        // `description` is required by the table as well.
        assert_eq!(missing.len(), 16);
        assert_eq!(record.errors.len(), missing.len());
        assert!(missing.contains(&"description"));
        assert!(!missing.contains(&"title"));
        assert_eq!(record.errors[0].message, "Required field 'enable_search' is missing");
        assert_eq!(record.record_id.to_string(), "Row 0");
        assert_eq!(report.records_with_errors, 1);
        assert!(report.missing_required_fields.contains("price"));
    }

    #[test]
    fn test_absent_required_field_yields_single_issue() {
        let mut record = sample_record();
        record.insert("price", "");
        let report = validate_feed(&[record], builtin());

        let price_issues: Vec<_> = report.record_reports[0]
            .errors
            .iter()
            .filter(|i| i.field_name == "price")
            .collect();
        assert_eq!(price_issues.len(), 1);
        assert_eq!(price_issues[0].message, "Required field 'price' is missing");
    }

    #[test]
    fn test_coverage_percentage() {
        let registry = FieldSpecRegistry::new(vec![
            FieldSpec::new("id", FieldKind::String { max_length: None }),
            FieldSpec::new("gtin", FieldKind::String { max_length: None }).recommended(),
        ])
        .unwrap();

        let records: Vec<Record> = (0..10)
            .map(|i| {
                let record = Record::new().with("id", format!("SKU{}", i));
                if i < 3 {
                    record.with("gtin", "123456789012")
                } else {
                    record.with("gtin", "")
                }
            })
            .collect();

        let report = validate_feed(&records, &registry);
        let gtin = report.coverage("gtin").unwrap();
        assert!(gtin.present);
        assert_eq!(gtin.filled_count, 3);
        assert_eq!(gtin.percentage, 30.0);
        assert_eq!(report.coverage("id").unwrap().percentage, 100.0);
        assert!(report.missing_recommended_fields.is_empty());
        assert_eq!(report.records_with_warnings, 7);
    }

    #[test]
    fn test_empty_feed() {
        let report = validate_feed(&[], builtin());

        assert_eq!(report.total_records, 0);
        assert_eq!(report.records_with_errors, 0);
        assert!(report.record_reports.is_empty());
        assert_eq!(report.field_coverage.len(), builtin().len());
        assert!(report.field_coverage.iter().all(|c| c.percentage == 0.0 && !c.present));
        assert_eq!(report.missing_required_fields.len(), builtin().required_fields().len());
        assert!(report.missing_recommended_fields.contains("gtin"));
        assert_eq!(report.success_rate(), 0.0);
    }

    #[test]
    fn test_coverage_covers_registry_not_input_columns() {
        let record = sample_record().with("color", "black");
        let report = validate_feed(&[record], builtin());

        let names: Vec<&str> = report.field_coverage.iter().map(|c| c.field_name.as_str()).collect();
        assert_eq!(names, builtin().names().collect::<Vec<_>>());
        assert!(report.coverage("color").is_none());
    }

    #[test]
    fn test_error_counters_follow_record_reports() {
        let mut bad = sample_record();
        bad.insert("id", "SKU2");
        bad.insert("inventory_quantity", "-1");
        bad.insert("link", "nope");

        let mut warned = sample_record();
        warned.insert("id", "SKU3");
        warned.insert("gtin", "");

        let report = validate_feed(&[sample_record(), bad, warned], builtin());

        assert_eq!(report.records_with_errors, 1);
        assert_eq!(report.records_with_warnings, 1);
        assert_eq!(report.record_reports[1].errors.len(), 2);
        for r in &report.record_reports {
            assert_eq!(r.has_errors(), r.record_id.to_string() == "SKU2");
        }
        assert!((report.success_rate() - 66.666).abs() < 0.01);
    }

    #[test]
    fn test_conditional_rule_defaults_to_warning() {
        let mut record = sample_record();
        record.insert("gtin", "");
        record.insert("mpn", "");
        let report = validate_feed(&[record], builtin());
        let r = &report.record_reports[0];

        assert!(r.errors.is_empty());
        assert_eq!(
            r.warning_messages(),
            vec![
                "Recommended field 'gtin' is missing",
                "'mpn' is required when 'gtin' is missing",
            ]
        );
    }

    #[test]
    fn test_strict_conditionals() {
        let mut record = sample_record();
        record.insert("seller_tos", "");
        let options = ValidationOptions {
            strict_conditionals: true,
            ..Default::default()
        };
        let report = FeedValidator::new(builtin()).with_options(options).validate(&[record]);

        assert_eq!(
            report.record_reports[0].error_messages(),
            vec!["'seller_tos' is required when 'enable_checkout' is 'true'"]
        );
        assert_eq!(report.records_with_errors, 1);
    }

    #[test]
    fn test_declared_fields_only() {
        let options = ValidationOptions {
            declared_fields_only: true,
            ..Default::default()
        };
        let records = [Record::new().with("title", "Shoe").with("price", "USD 10")];
        let report = FeedValidator::new(builtin()).with_options(options).validate(&records);

        assert_eq!(
            report.record_reports[0].error_messages(),
            vec!["'price' must be a number"]
        );
        assert!(report.missing_required_fields.contains("id"));
    }

    #[test]
    fn test_declared_fields_only_still_applies_conditional_rules() {
        let options = ValidationOptions {
            declared_fields_only: true,
            strict_conditionals: true,
        };
        let records = [Record::new().with("enable_checkout", "true").with("id", "SKU1")];
        let report = FeedValidator::new(builtin()).with_options(options).validate(&records);

        assert_eq!(
            report.record_reports[0].error_messages(),
            vec![
                "'mpn' is required when 'gtin' is missing",
                "'seller_privacy_policy' is required when 'enable_checkout' is 'true'",
                "'seller_tos' is required when 'enable_checkout' is 'true'",
            ]
        );
    }

    #[test]
    fn test_malformed_values_do_not_abort() {
        let records = vec![
            Record::new().with("id", "A").with("price", "free"),
            Record::new().with("id", serde_json::json!({"nested": true})),
            Record::new(),
        ];
        let report = validate_feed(&records, builtin());

        assert_eq!(report.total_records, 3);
        assert_eq!(report.record_reports.len(), 3);
        assert_eq!(report.records_with_errors, 3);
        assert_eq!(report.record_reports[2].record_id.to_string(), "Row 2");
    }
}
