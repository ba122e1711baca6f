//! Field specification registry.
//!
//! Every product-feed field is described by a [`FieldSpec`]: its value type
//! (with the constraints that type supports), whether it is required, and an
//! optional pattern. The built-in table is embedded at compile time from
//! `specs/product-feed.json` and parsed once on first use.
//!
//! # Table format
//!
//! ```json
//! [
//!   { "name": "title", "type": "string", "max_length": 150, "required": true },
//!   { "name": "gtin", "type": "string", "pattern": "^\\d{8,14}$", "recommended": true },
//!   { "name": "mpn", "type": "string", "required": { "field_missing": "gtin" } },
//!   { "name": "availability", "type": "enum", "values": ["in_stock", "out_of_stock"] }
//! ]
//! ```
//!
//! `required` accepts `true`, `false`, `"conditional"` (no rule, never enforced)
//! or a rule object: `{"field_missing": "<field>"}` or
//! `{"field_equals": {"field": "<field>", "value": "<value>"}}`.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use crate::error::{SpecError, SpecResult};

/// Built-in product feed table, parsed on first access.
static BUILTIN: Lazy<FieldSpecRegistry> = Lazy::new(|| {
    FieldSpecRegistry::from_json(include_str!("../../specs/product-feed.json"))
        .expect("Invalid embedded field specification")
});

// =============================================================================
// Field Kind
// =============================================================================

/// Value type of a field, carrying only the constraints relevant to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldKind {
    /// Free text, optionally length-limited (in characters).
    String {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_length: Option<usize>,
    },
    /// Absolute URL with scheme and host.
    Url,
    /// One of a fixed list, compared case-insensitively.
    Enum { values: Vec<String> },
    /// Non-negative whole number (decimals are truncated).
    Integer,
    /// Number with an optional trailing unit, e.g. `79.99 USD`.
    Number,
}

impl FieldKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldKind::String { .. } => "String",
            FieldKind::Url => "URL",
            FieldKind::Enum { .. } => "Enum",
            FieldKind::Integer => "Integer",
            FieldKind::Number => "Number",
        }
    }
}

// =============================================================================
// Requirement
// =============================================================================

/// Sibling-field condition that makes a conditional field required.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    /// Required when the named field has no value.
    FieldMissing(String),
    /// Required when the named field equals `value` (case-insensitive).
    FieldEquals { field: String, value: String },
}

impl Condition {
    /// The sibling field this condition reads.
    pub fn dependency(&self) -> &str {
        match self {
            Condition::FieldMissing(field) => field,
            Condition::FieldEquals { field, .. } => field,
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::FieldMissing(field) => write!(f, "'{}' is missing", field),
            Condition::FieldEquals { field, value } => write!(f, "'{}' is '{}'", field, value),
        }
    }
}

/// Whether a field must be supplied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RequirementDef", into = "RequirementDef")]
pub enum Requirement {
    Required,
    #[default]
    Optional,
    /// Required only when the rule holds; `None` never triggers.
    Conditional(Option<Condition>),
}

/// On-disk spelling of [`Requirement`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RequirementDef {
    Flag(bool),
    Keyword(String),
    Rule(Condition),
}

impl TryFrom<RequirementDef> for Requirement {
    type Error = String;

    fn try_from(def: RequirementDef) -> Result<Self, Self::Error> {
        match def {
            RequirementDef::Flag(true) => Ok(Requirement::Required),
            RequirementDef::Flag(false) => Ok(Requirement::Optional),
            RequirementDef::Keyword(k) if k.eq_ignore_ascii_case("conditional") => {
                Ok(Requirement::Conditional(None))
            }
            RequirementDef::Keyword(k) => Err(format!("unknown requirement '{}'", k)),
            RequirementDef::Rule(condition) => Ok(Requirement::Conditional(Some(condition))),
        }
    }
}

impl From<Requirement> for RequirementDef {
    fn from(requirement: Requirement) -> Self {
        match requirement {
            Requirement::Required => RequirementDef::Flag(true),
            Requirement::Optional => RequirementDef::Flag(false),
            Requirement::Conditional(None) => RequirementDef::Keyword("conditional".to_string()),
            Requirement::Conditional(Some(condition)) => RequirementDef::Rule(condition),
        }
    }
}

// =============================================================================
// Pattern
// =============================================================================

/// Regex that must match at the start of the value.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Pattern {
    source: String,
    regex: Regex,
}

impl Pattern {
    pub fn new(source: impl Into<String>) -> Result<Self, regex::Error> {
        let source = source.into();
        let regex = Regex::new(&format!("^(?:{})", source))?;
        Ok(Self { source, regex })
    }

    pub fn matches_start(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl TryFrom<String> for Pattern {
    type Error = regex::Error;

    fn try_from(source: String) -> Result<Self, Self::Error> {
        Pattern::new(source)
    }
}

impl From<Pattern> for String {
    fn from(pattern: Pattern) -> Self {
        pattern.source
    }
}

// =============================================================================
// Field Spec
// =============================================================================

/// Declarative rule for one feed field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    #[serde(flatten)]
    pub kind: FieldKind,
    #[serde(rename = "required", default)]
    pub requirement: Requirement,
    #[serde(default)]
    pub recommended: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<Pattern>,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<String>,
}

impl FieldSpec {
    /// Optional field of the given kind with no pattern.
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            requirement: Requirement::Optional,
            recommended: false,
            pattern: None,
            description: String::new(),
            example: None,
        }
    }

    pub fn with_requirement(mut self, requirement: Requirement) -> Self {
        self.requirement = requirement;
        self
    }

    pub fn required(self) -> Self {
        self.with_requirement(Requirement::Required)
    }

    pub fn recommended(mut self) -> Self {
        self.recommended = true;
        self
    }

    pub fn with_pattern(mut self, pattern: Pattern) -> Self {
        self.pattern = Some(pattern);
        self
    }

    pub fn is_required(&self) -> bool {
        self.requirement == Requirement::Required
    }

    /// The rule of a conditional field, if it has one.
    pub fn condition(&self) -> Option<&Condition> {
        match &self.requirement {
            Requirement::Conditional(condition) => condition.as_ref(),
            _ => None,
        }
    }
}

// =============================================================================
// Registry
// =============================================================================

/// Ordered, name-indexed set of field specifications.
#[derive(Debug, Clone)]
pub struct FieldSpecRegistry {
    specs: Vec<FieldSpec>,
    index: HashMap<String, usize>,
}

impl FieldSpecRegistry {
    /// The embedded product feed table.
    pub fn builtin() -> &'static FieldSpecRegistry {
        &BUILTIN
    }

    /// Build a registry, rejecting duplicate names and rules that point at
    /// fields outside the table.
    pub fn new(specs: Vec<FieldSpec>) -> SpecResult<Self> {
        let mut index = HashMap::with_capacity(specs.len());
        for (i, spec) in specs.iter().enumerate() {
            if index.insert(spec.name.clone(), i).is_some() {
                return Err(SpecError::DuplicateField(spec.name.clone()));
            }
        }

        for spec in &specs {
            if let Some(condition) = spec.condition() {
                if !index.contains_key(condition.dependency()) {
                    return Err(SpecError::UnknownDependency {
                        field: spec.name.clone(),
                        dependency: condition.dependency().to_string(),
                    });
                }
            }
        }

        Ok(Self { specs, index })
    }

    /// Parse a table from its JSON text.
    pub fn from_json(json: &str) -> SpecResult<Self> {
        let specs: Vec<FieldSpec> = serde_json::from_str(json)?;
        Self::new(specs)
    }

    /// Load a table from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> SpecResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.index.get(name).map(|&i| &self.specs[i])
    }

    /// All specs in declaration order.
    pub fn all(&self) -> &[FieldSpec] {
        &self.specs
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldSpec> {
        self.specs.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.specs.iter().map(|s| s.name.as_str())
    }

    /// Names of unconditionally required fields.
    pub fn required_fields(&self) -> Vec<&str> {
        self.specs
            .iter()
            .filter(|s| s.is_required())
            .map(|s| s.name.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Serialize back to the table format.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.specs)
    }
}
