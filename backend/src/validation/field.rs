//! Single-field validation.
//!
//! [`validate_field`] checks one value against one [`FieldSpec`] in three
//! steps: absence, type, pattern. An absent value stops after the first step;
//! otherwise the type and pattern checks both run, so one value can produce
//! two errors.

use url::Url;

use crate::models::{FieldIssue, IssueKind, RawValue};
use crate::spec::{FieldKind, FieldSpec, Requirement};

/// Errors and warnings produced for one field value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldValidation {
    pub errors: Vec<FieldIssue>,
    pub warnings: Vec<FieldIssue>,
}

impl FieldValidation {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }

    pub fn error_messages(&self) -> Vec<&str> {
        self.errors.iter().map(|i| i.message.as_str()).collect()
    }

    pub fn warning_messages(&self) -> Vec<&str> {
        self.warnings.iter().map(|i| i.message.as_str()).collect()
    }
}

/// Validate one field value against its specification.
///
/// `value` is `None` when the field is absent; blank values passed in are
/// treated the same way.
pub fn validate_field(field_name: &str, value: Option<&RawValue>, spec: &FieldSpec) -> FieldValidation {
    let mut result = FieldValidation::default();

    let value = match value.filter(|v| !v.is_blank()) {
        Some(v) => v,
        None => {
            if spec.requirement == Requirement::Required {
                result.errors.push(FieldIssue::error(
                    IssueKind::MissingField,
                    field_name,
                    format!("Required field '{}' is missing", field_name),
                ));
            } else if spec.recommended {
                result.warnings.push(FieldIssue::warning(
                    IssueKind::MissingField,
                    field_name,
                    format!("Recommended field '{}' is missing", field_name),
                ));
            }
            return result;
        }
    };

    let text = value.as_text();

    if let Some(issue) = check_kind(field_name, value, &text, &spec.kind) {
        result.errors.push(issue);
    }

    if let Some(ref pattern) = spec.pattern {
        if !pattern.matches_start(&text) {
            result.errors.push(FieldIssue::error(
                IssueKind::ConstraintViolation,
                field_name,
                format!("'{}' does not match required pattern", field_name),
            ));
        }
    }

    result
}

fn check_kind(field_name: &str, value: &RawValue, text: &str, kind: &FieldKind) -> Option<FieldIssue> {
    match kind {
        FieldKind::String { max_length: Some(max) } if text.chars().count() > *max => {
            Some(FieldIssue::error(
                IssueKind::ConstraintViolation,
                field_name,
                format!("'{}' exceeds max length of {} characters", field_name, max),
            ))
        }
        FieldKind::String { .. } => None,

        FieldKind::Url if !is_valid_url(text) => Some(FieldIssue::error(
            IssueKind::TypeMismatch,
            field_name,
            format!("'{}' is not a valid URL", field_name),
        )),
        FieldKind::Url => None,

        FieldKind::Enum { values } => {
            let lowered = text.to_lowercase();
            if values.iter().any(|v| v.to_lowercase() == lowered) {
                None
            } else {
                Some(FieldIssue::error(
                    IssueKind::ConstraintViolation,
                    field_name,
                    format!("'{}' must be one of: {}", field_name, values.join(", ")),
                ))
            }
        }

        FieldKind::Integer => match parse_integer(value) {
            None => Some(FieldIssue::error(
                IssueKind::TypeMismatch,
                field_name,
                format!("'{}' must be an integer", field_name),
            )),
            Some(n) if n < 0 => Some(FieldIssue::error(
                IssueKind::ConstraintViolation,
                field_name,
                format!("'{}' must be non-negative", field_name),
            )),
            Some(_) => None,
        },

        FieldKind::Number if parse_number(text).is_none() => Some(FieldIssue::error(
            IssueKind::TypeMismatch,
            field_name,
            format!("'{}' must be a number", field_name),
        )),
        FieldKind::Number => None,
    }
}

/// Absolute URL with a scheme and a non-empty host, no embedded whitespace.
pub fn is_valid_url(text: &str) -> bool {
    if text.is_empty() || text.chars().any(char::is_whitespace) {
        return false;
    }
    match Url::parse(text) {
        Ok(url) => url.host_str().is_some_and(|h| !h.is_empty()),
        Err(_) => false,
    }
}

/// Parse as a real number and truncate toward zero.
///
/// `"3.9"` gives 3 and `"-0.5"` gives 0. Non-finite values are rejected.
pub fn parse_integer(value: &RawValue) -> Option<i64> {
    let real = match value {
        RawValue::Number(n) => n.as_f64()?,
        other => other.as_text().trim().parse::<f64>().ok()?,
    };
    if !real.is_finite() {
        return None;
    }
    Some(real.trunc() as i64)
}

/// Parse the first whitespace-separated token as a float.
///
/// The unit or currency is expected after the numeral: `"79.99 USD"` parses,
/// `"USD 79.99"` does not.
pub fn parse_number(text: &str) -> Option<f64> {
    text.split_whitespace().next()?.parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::Pattern;

    fn enum_spec(name: &str, values: &[&str]) -> FieldSpec {
        FieldSpec::new(
            name,
            FieldKind::Enum {
                values: values.iter().map(|v| v.to_string()).collect(),
            },
        )
        .required()
    }

    fn check(spec: &FieldSpec, value: &str) -> FieldValidation {
        validate_field(&spec.name, Some(&RawValue::from(value)), spec)
    }

    #[test]
    fn test_missing_required() {
        let spec = FieldSpec::new("title", FieldKind::String { max_length: Some(150) }).required();
        let result = validate_field("title", None, &spec);

        assert_eq!(result.error_messages(), vec!["Required field 'title' is missing"]);
        assert_eq!(result.errors[0].kind, IssueKind::MissingField);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_missing_required_skips_other_checks() {
        let spec = FieldSpec::new("gtin", FieldKind::Integer)
            .required()
            .with_pattern(Pattern::new(r"^\d{8,14}$").unwrap());

        for value in [None, Some(RawValue::Null), Some(RawValue::from("")), Some(RawValue::from("  "))] {
            let result = validate_field("gtin", value.as_ref(), &spec);
            assert_eq!(result.errors.len(), 1);
            assert_eq!(result.errors[0].kind, IssueKind::MissingField);
        }
    }

    #[test]
    fn test_missing_recommended_is_warning() {
        let spec = FieldSpec::new("gtin", FieldKind::String { max_length: None }).recommended();
        let result = validate_field("gtin", None, &spec);

        assert!(result.errors.is_empty());
        assert_eq!(result.warning_messages(), vec!["Recommended field 'gtin' is missing"]);
    }

    #[test]
    fn test_missing_optional_is_silent() {
        let spec = FieldSpec::new("brand", FieldKind::String { max_length: Some(70) })
            .with_requirement(Requirement::Conditional(None));
        assert!(validate_field("brand", None, &spec).is_clean());
    }

    #[test]
    fn test_string_max_length_counts_characters() {
        let spec = FieldSpec::new("brand", FieldKind::String { max_length: Some(5) });

        assert!(check(&spec, "Café!").is_clean());
        assert_eq!(
            check(&spec, "Cafés!").error_messages(),
            vec!["'brand' exceeds max length of 5 characters"]
        );
    }

    #[test]
    fn test_url() {
        let spec = FieldSpec::new("link", FieldKind::Url);

        assert!(check(&spec, "https://a.com/p").is_clean());
        assert!(check(&spec, "http://example.com:8080/x?y=1").is_clean());

        for bad in ["a.com/p", "not a url", "mailto:me@a.com", "https://a.com/p q", "https://"] {
            assert_eq!(
                check(&spec, bad).error_messages(),
                vec!["'link' is not a valid URL"],
                "{} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_enum_case_insensitive() {
        let spec = enum_spec("enable_search", &["true", "false"]);

        assert!(check(&spec, "TRUE").is_clean());
        assert!(check(&spec, "false").is_clean());
        assert!(validate_field("enable_search", Some(&RawValue::Bool(true)), &spec).is_clean());
    }

    #[test]
    fn test_enum_error_lists_original_values() {
        let spec = enum_spec("availability", &["in_stock", "Out_Of_Stock", "preorder"]);
        let result = check(&spec, "sold");

        assert_eq!(
            result.error_messages(),
            vec!["'availability' must be one of: in_stock, Out_Of_Stock, preorder"]
        );
        assert_eq!(result.errors[0].kind, IssueKind::ConstraintViolation);
    }

    #[test]
    fn test_integer() {
        let spec = FieldSpec::new("inventory_quantity", FieldKind::Integer).required();

        assert!(check(&spec, "3.9").is_clean());
        assert!(check(&spec, "25").is_clean());
        assert!(check(&spec, "-0.5").is_clean());
        assert!(validate_field("inventory_quantity", Some(&RawValue::from(12)), &spec).is_clean());

        assert_eq!(
            check(&spec, "-1").error_messages(),
            vec!["'inventory_quantity' must be non-negative"]
        );
        assert_eq!(
            check(&spec, "abc").error_messages(),
            vec!["'inventory_quantity' must be an integer"]
        );
        assert_eq!(check(&spec, "abc").errors[0].kind, IssueKind::TypeMismatch);
        assert_eq!(
            check(&spec, "inf").error_messages(),
            vec!["'inventory_quantity' must be an integer"]
        );
    }

    #[test]
    fn test_parse_integer_truncates() {
        assert_eq!(parse_integer(&RawValue::from("3.9")), Some(3));
        assert_eq!(parse_integer(&RawValue::from("-1.7")), Some(-1));
        assert_eq!(parse_integer(&RawValue::from(" 42 ")), Some(42));
        assert_eq!(parse_integer(&RawValue::from("NaN")), None);
    }

    #[test]
    fn test_number_requires_leading_numeral() {
        let spec = FieldSpec::new("price", FieldKind::Number).required();

        // The numeral must come first: the unit/currency trails it.
        assert!(check(&spec, "79.99 USD").is_clean());
        assert!(check(&spec, "1.5 lb").is_clean());
        assert!(check(&spec, "12").is_clean());
        assert_eq!(
            check(&spec, "USD 79.99").error_messages(),
            vec!["'price' must be a number"]
        );
    }

    #[test]
    fn test_pattern_and_type_errors_both_reported() {
        let spec = FieldSpec::new("gtin", FieldKind::String { max_length: Some(5) })
            .with_pattern(Pattern::new(r"^\d{8,14}$").unwrap());

        let result = check(&spec, "abcdefgh");
        assert_eq!(
            result.error_messages(),
            vec![
                "'gtin' exceeds max length of 5 characters",
                "'gtin' does not match required pattern",
            ]
        );
    }

    #[test]
    fn test_pattern_on_numeric_value() {
        let spec = FieldSpec::new("gtin", FieldKind::String { max_length: None })
            .with_pattern(Pattern::new(r"^\d{8,14}$").unwrap());

        assert!(validate_field("gtin", Some(&RawValue::from(123456789012_i64)), &spec).is_clean());
        assert_eq!(
            check(&spec, "1234").error_messages(),
            vec!["'gtin' does not match required pattern"]
        );
    }
}
