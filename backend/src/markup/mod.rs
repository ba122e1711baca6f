//! schema.org Product markup.
//!
//! Maps one flat feed [`Record`] into a nested JSON-LD document:
//!
//! ```text
//! Record                          ProductMarkup
//! ──────                          ─────────────
//! id, title, link, gtin, ...  →   sku, name, url, gtin, ...
//! brand                       →   brand { @type: Brand, name }
//! price, availability, link,  →   offers { @type: Offer, price, priceCurrency,
//! seller_name                              availability, url, seller { ... } }
//! product_review_rating/count →   aggregateRating { ratingValue, reviewCount }
//! ```
//!
//! The produced document can be checked against the embedded
//! `schemas/product-markup.json` (JSON Schema Draft 7).
//!
//! # Example
//!
//! ```rust,ignore
//! use feedcheck::{map_record, Record};
//!
//! let record = Record::new().with("title", "Shoe").with("price", "79.99 USD");
//! let markup = map_record(&record);
//! assert_eq!(markup.offers.unwrap().price, "79.99");
//! ```

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::models::Record;
use crate::validation::{parse_integer, parse_number};

/// Value of `@context` on every produced document.
pub const SCHEMA_CONTEXT: &str = "https://schema.org/";

/// Currency used when a price carries no trailing currency token.
pub const DEFAULT_CURRENCY: &str = "USD";

/// Feed field → top-level markup property, in output order.
///
/// `brand` is listed here but is wrapped in a [`BrandMarkup`] object.
pub const MARKUP_FIELD_MAPPING: &[(&str, &str)] = &[
    ("id", "sku"),
    ("title", "name"),
    ("description", "description"),
    ("link", "url"),
    ("brand", "brand"),
    ("gtin", "gtin"),
    ("mpn", "mpn"),
    ("image_link", "image"),
    ("material", "material"),
    ("weight", "weight"),
];

/// Properties a usable Product document should always carry.
pub const CORE_PROPERTIES: &[&str] = &["name", "image", "description"];

static MARKUP_SCHEMA: Lazy<Value> = Lazy::new(|| {
    serde_json::from_str(include_str!("../../schemas/product-markup.json"))
        .expect("Invalid embedded schema")
});

// =============================================================================
// Document Types
// =============================================================================

/// A schema.org `Product` document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductMarkup {
    #[serde(rename = "@context")]
    pub context: String,
    #[serde(rename = "@type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<BrandMarkup>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gtin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mpn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offers: Option<OfferMarkup>,
    #[serde(rename = "aggregateRating", default, skip_serializing_if = "Option::is_none")]
    pub aggregate_rating: Option<RatingMarkup>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrandMarkup {
    #[serde(rename = "@type")]
    pub kind: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfferMarkup {
    #[serde(rename = "@type")]
    pub kind: String,
    pub price: String,
    #[serde(rename = "priceCurrency")]
    pub price_currency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub availability: Option<Availability>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seller: Option<OrganizationMarkup>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrganizationMarkup {
    #[serde(rename = "@type")]
    pub kind: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingMarkup {
    #[serde(rename = "@type")]
    pub kind: String,
    #[serde(rename = "ratingValue")]
    pub rating_value: f64,
    #[serde(rename = "reviewCount", default, skip_serializing_if = "Option::is_none")]
    pub review_count: Option<u64>,
}

impl ProductMarkup {
    /// Empty document carrying only `@context` and `@type`.
    pub fn new() -> Self {
        Self {
            context: SCHEMA_CONTEXT.to_string(),
            kind: "Product".to_string(),
            sku: None,
            name: None,
            description: None,
            url: None,
            brand: None,
            gtin: None,
            mpn: None,
            image: None,
            material: None,
            weight: None,
            offers: None,
            aggregate_rating: None,
        }
    }

    fn set_property(&mut self, property: &str, value: String) {
        match property {
            "sku" => self.sku = Some(value),
            "name" => self.name = Some(value),
            "description" => self.description = Some(value),
            "url" => self.url = Some(value),
            "brand" => self.brand = Some(BrandMarkup::new(value)),
            "gtin" => self.gtin = Some(value),
            "mpn" => self.mpn = Some(value),
            "image" => self.image = Some(value),
            "material" => self.material = Some(value),
            "weight" => self.weight = Some(value),
            _ => {}
        }
    }

    fn has_property(&self, property: &str) -> bool {
        match property {
            "name" => self.name.is_some(),
            "image" => self.image.is_some(),
            "description" => self.description.is_some(),
            _ => false,
        }
    }

    /// Core properties ([`CORE_PROPERTIES`]) the document lacks.
    pub fn missing_core_properties(&self) -> Vec<&'static str> {
        CORE_PROPERTIES
            .iter()
            .copied()
            .filter(|p| !self.has_property(p))
            .collect()
    }

    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// The document wrapped for embedding in an HTML page.
    pub fn to_script_tag(&self) -> Result<String, serde_json::Error> {
        Ok(format!(
            "<script type=\"application/ld+json\">\n{}\n</script>",
            self.to_json_pretty()?
        ))
    }

    /// Check the document against the embedded markup schema.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let value = self.to_value().map_err(|e| vec![e.to_string()])?;
        validate_markup(&value)
    }
}

impl Default for ProductMarkup {
    fn default() -> Self {
        Self::new()
    }
}

impl BrandMarkup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            kind: "Brand".to_string(),
            name: name.into(),
        }
    }
}

impl OrganizationMarkup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            kind: "Organization".to_string(),
            name: name.into(),
        }
    }
}

// =============================================================================
// Availability
// =============================================================================

/// Offer availability, serialized as its schema.org URI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Availability {
    InStock,
    OutOfStock,
    PreOrder,
}

impl Availability {
    pub fn uri(self) -> &'static str {
        match self {
            Availability::InStock => "https://schema.org/InStock",
            Availability::OutOfStock => "https://schema.org/OutOfStock",
            Availability::PreOrder => "https://schema.org/PreOrder",
        }
    }

    /// Value used in feed records.
    pub fn feed_value(self) -> &'static str {
        match self {
            Availability::InStock => "in_stock",
            Availability::OutOfStock => "out_of_stock",
            Availability::PreOrder => "preorder",
        }
    }

    /// Map a feed value case-insensitively. Unrecognized values fall back to
    /// `InStock`; the feed validator reports them separately.
    pub fn from_feed_value(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "out_of_stock" => Availability::OutOfStock,
            "preorder" => Availability::PreOrder,
            _ => Availability::InStock,
        }
    }

    /// Recognize an availability URI or bare name (`InStock`, `http://schema.org/OutOfStock`, ...).
    pub fn from_uri(value: &str) -> Option<Self> {
        let lowered = value.to_lowercase();
        if lowered.contains("instock") {
            Some(Availability::InStock)
        } else if lowered.contains("outofstock") {
            Some(Availability::OutOfStock)
        } else if lowered.contains("preorder") {
            Some(Availability::PreOrder)
        } else {
            None
        }
    }
}

impl fmt::Display for Availability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.uri())
    }
}

impl TryFrom<String> for Availability {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Availability::from_uri(&value).ok_or_else(|| format!("unknown availability '{}'", value))
    }
}

impl From<Availability> for String {
    fn from(value: Availability) -> Self {
        value.uri().to_string()
    }
}

// =============================================================================
// Mapper
// =============================================================================

/// Record → [`ProductMarkup`] mapper.
#[derive(Debug, Clone)]
pub struct MarkupMapper {
    default_currency: String,
}

impl Default for MarkupMapper {
    fn default() -> Self {
        Self {
            default_currency: DEFAULT_CURRENCY.to_string(),
        }
    }
}

impl MarkupMapper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_currency(mut self, currency: impl Into<String>) -> Self {
        self.default_currency = currency.into();
        self
    }

    /// Build the markup document for one record.
    ///
    /// Absent and blank source fields never produce a key.
    pub fn map(&self, record: &Record) -> ProductMarkup {
        let mut markup = ProductMarkup::new();

        for (field, property) in MARKUP_FIELD_MAPPING {
            if let Some(text) = record.text(field) {
                markup.set_property(property, text.into_owned());
            }
        }

        markup.offers = self.map_offer(record);
        markup.aggregate_rating = map_rating(record);
        markup
    }

    fn map_offer(&self, record: &Record) -> Option<OfferMarkup> {
        let price = record.text("price")?;
        let (amount, currency) = split_price(&price);

        Some(OfferMarkup {
            kind: "Offer".to_string(),
            price: amount.to_string(),
            price_currency: currency.unwrap_or(self.default_currency.as_str()).to_string(),
            availability: record
                .text("availability")
                .map(|a| Availability::from_feed_value(&a)),
            url: record.text("link").map(|l| l.into_owned()),
            seller: record
                .text("seller_name")
                .map(|name| OrganizationMarkup::new(name.into_owned())),
        })
    }
}

/// Map a record with the default mapper.
pub fn map_record(record: &Record) -> ProductMarkup {
    MarkupMapper::default().map(record)
}

/// Split `"79.99 USD"` into the amount and the optional currency token.
pub fn split_price(price: &str) -> (&str, Option<&str>) {
    let mut tokens = price.split_whitespace();
    let amount = tokens.next().unwrap_or(price);
    (amount, tokens.next())
}

fn map_rating(record: &Record) -> Option<RatingMarkup> {
    let rating_value = record
        .text("product_review_rating")
        .and_then(|r| parse_number(&r))
        .filter(|r| r.is_finite())?;

    let review_count = record
        .value("product_review_count")
        .and_then(parse_integer)
        .and_then(|c| u64::try_from(c).ok());

    Some(RatingMarkup {
        kind: "AggregateRating".to_string(),
        rating_value,
        review_count,
    })
}

// =============================================================================
// Schema Validation
// =============================================================================

/// Validate a JSON-LD document against the embedded Product schema.
///
/// Returns every violation as a message.
pub fn validate_markup(document: &Value) -> Result<(), Vec<String>> {
    let validator = jsonschema::draft7::new(&MARKUP_SCHEMA)
        .map_err(|e| vec![format!("Invalid markup schema: {}", e)])?;

    let errors: Vec<String> = validator
        .iter_errors(document)
        .map(|e| e.to_string())
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Quick check against the embedded Product schema.
pub fn is_valid_markup(document: &Value) -> bool {
    jsonschema::draft7::is_valid(&MARKUP_SCHEMA, document)
}
