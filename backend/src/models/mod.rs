//! Domain models shared by the validator, the markup mapper and the extractor.
//!
//! - [`RawValue`] - A field value as it arrives from a feed (text, number, bool, null)
//! - [`Record`] - One product listing: field name → raw value
//! - [`RecordId`] - How a record is named in reports
//! - [`FieldIssue`] - One error or warning about one field of one record

use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Number, Value};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

// =============================================================================
// Raw Value
// =============================================================================

/// A field value as supplied by the input source.
///
/// Objects and arrays coming from JSON input are kept as their JSON text so the
/// type checks can still report on them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum RawValue {
    Null,
    Bool(bool),
    Number(Number),
    Text(String),
}

impl RawValue {
    /// Null, empty and whitespace-only text all count as "no value".
    pub fn is_blank(&self) -> bool {
        match self {
            RawValue::Null => true,
            RawValue::Text(s) => s.trim().is_empty(),
            RawValue::Bool(_) | RawValue::Number(_) => false,
        }
    }

    /// Text form used by every string-based check.
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            RawValue::Null => Cow::Borrowed(""),
            RawValue::Bool(b) => Cow::Owned(b.to_string()),
            RawValue::Number(n) => Cow::Owned(n.to_string()),
            RawValue::Text(s) => Cow::Borrowed(s),
        }
    }
}

impl From<Value> for RawValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => RawValue::Null,
            Value::Bool(b) => RawValue::Bool(b),
            Value::Number(n) => RawValue::Number(n),
            Value::String(s) => RawValue::Text(s),
            other => RawValue::Text(other.to_string()),
        }
    }
}

impl From<RawValue> for Value {
    fn from(value: RawValue) -> Self {
        match value {
            RawValue::Null => Value::Null,
            RawValue::Bool(b) => Value::Bool(b),
            RawValue::Number(n) => Value::Number(n),
            RawValue::Text(s) => Value::String(s),
        }
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Text(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        RawValue::Text(value)
    }
}

impl From<i64> for RawValue {
    fn from(value: i64) -> Self {
        RawValue::Number(value.into())
    }
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        Number::from_f64(value)
            .map(RawValue::Number)
            .unwrap_or(RawValue::Null)
    }
}

impl From<bool> for RawValue {
    fn from(value: bool) -> Self {
        RawValue::Bool(value)
    }
}

// =============================================================================
// Record
// =============================================================================

/// One product listing.
///
/// A key that is present with an empty value is still *declared* (it counts
/// for column presence in coverage) but has no *value*.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: BTreeMap<String, RawValue>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<RawValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<RawValue>) {
        self.fields.insert(name.into(), value.into());
    }

    /// Whether the record carries the key at all, even with an empty value.
    pub fn declares(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// The value exactly as supplied.
    pub fn raw(&self, name: &str) -> Option<&RawValue> {
        self.fields.get(name)
    }

    /// The value with absent, null and blank collapsed to `None`.
    pub fn value(&self, name: &str) -> Option<&RawValue> {
        self.fields.get(name).filter(|v| !v.is_blank())
    }

    /// Text of a non-blank value.
    pub fn text(&self, name: &str) -> Option<Cow<'_, str>> {
        self.value(name).map(RawValue::as_text)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Build a record from a JSON object. Returns `None` for any other JSON type.
    pub fn from_json(value: &Value) -> Option<Self> {
        value.as_object().map(Self::from_map)
    }

    pub fn from_map(map: &Map<String, Value>) -> Self {
        map.iter()
            .map(|(k, v)| (k.clone(), RawValue::from(v.clone())))
            .collect()
    }

    pub fn to_json(&self) -> Value {
        Value::Object(
            self.fields
                .iter()
                .map(|(k, v)| (k.clone(), Value::from(v.clone())))
                .collect(),
        )
    }
}

impl FromIterator<(String, RawValue)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, RawValue)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

// =============================================================================
// Record Identifier
// =============================================================================

/// How a record is labelled in reports.
///
/// Keeping the positional case as its own variant means a record whose `id`
/// is literally `"Row 3"` is never confused with the fourth id-less row.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RecordId {
    /// The record's own non-empty `id` field.
    Declared(String),
    /// Zero-based position in the input.
    Positional(usize),
}

impl RecordId {
    pub fn for_record(record: &Record, index: usize) -> Self {
        match record.text("id") {
            Some(id) => RecordId::Declared(id.into_owned()),
            None => RecordId::Positional(index),
        }
    }

    pub fn is_positional(&self) -> bool {
        matches!(self, RecordId::Positional(_))
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Declared(id) => f.write_str(id),
            RecordId::Positional(index) => write!(f, "Row {}", index),
        }
    }
}

impl Serialize for RecordId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// =============================================================================
// Field Issues
// =============================================================================

/// Error or warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// What went wrong with a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// Required or recommended field has no value.
    MissingField,
    /// Value does not parse as the declared type.
    TypeMismatch,
    /// Length, pattern, range or enum-membership failure.
    ConstraintViolation,
}

/// A single finding about one field of one record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldIssue {
    pub field_name: String,
    pub message: String,
    pub severity: Severity,
    pub kind: IssueKind,
}

impl FieldIssue {
    pub fn error(kind: IssueKind, field_name: &str, message: impl Into<String>) -> Self {
        Self {
            field_name: field_name.to_string(),
            message: message.into(),
            severity: Severity::Error,
            kind,
        }
    }

    pub fn warning(kind: IssueKind, field_name: &str, message: impl Into<String>) -> Self {
        Self {
            field_name: field_name.to_string(),
            message: message.into(),
            severity: Severity::Warning,
            kind,
        }
    }
}

impl fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

// =============================================================================
// Tests
// =============================================================================
