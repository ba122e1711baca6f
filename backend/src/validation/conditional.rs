//! Conditional requirements.
//!
//! A field declared `required: {"field_missing": "gtin"}` or
//! `required: {"field_equals": {...}}` only becomes mandatory when its sibling
//! fields say so, which is why it cannot be decided by the single-field
//! validator.

use crate::models::{FieldIssue, IssueKind, Record, Severity};
use crate::spec::{Condition, FieldSpec};

impl Condition {
    /// Whether the rule triggers for this record.
    pub fn holds(&self, record: &Record) -> bool {
        match self {
            Condition::FieldMissing(field) => record.value(field).is_none(),
            Condition::FieldEquals { field, value } => record
                .text(field)
                .is_some_and(|t| t.trim().eq_ignore_ascii_case(value)),
        }
    }
}

/// Report a conditional field whose rule triggered but which has no value.
pub fn check_conditional(spec: &FieldSpec, record: &Record, severity: Severity) -> Option<FieldIssue> {
    let condition = spec.condition()?;
    if record.value(&spec.name).is_some() || !condition.holds(record) {
        return None;
    }

    let message = format!("'{}' is required when {}", spec.name, condition);
    Some(match severity {
        Severity::Error => FieldIssue::error(IssueKind::MissingField, &spec.name, message),
        Severity::Warning => FieldIssue::warning(IssueKind::MissingField, &spec.name, message),
    })
}
