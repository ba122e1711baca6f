//! External product data extraction.
//!
//! Turns already-decoded page data into flat feed [`Record`]s, the inverse of
//! [`crate::markup`]:
//!
//! ```text
//! ExternalDocument
//!   structured_data ── Product objects ──→ one Record per product
//!   metadata        ── (no product)    ──→ one fallback Record
//! ```
//!
//! Products are found in top-level objects, arrays and `@graph` containers.
//! The fallback record only carries title, description, link and image, so it
//! will usually fail validation; that is left to the report.
//!
//! Fetching and HTML decoding live in [`html`].

pub mod html;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::markup::{split_price, Availability, DEFAULT_CURRENCY, MARKUP_FIELD_MAPPING};
use crate::models::{RawValue, Record};

// =============================================================================
// Input Document
// =============================================================================

/// Generic page metadata used when no structured product is found.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageMetadata {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub canonical_url: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

/// A decoded external page: its JSON-LD blocks plus metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExternalDocument {
    #[serde(default)]
    pub source_url: Option<String>,
    #[serde(default)]
    pub structured_data: Vec<Value>,
    #[serde(default)]
    pub metadata: PageMetadata,
}

impl ExternalDocument {
    pub fn new(source_url: Option<String>) -> Self {
        Self {
            source_url,
            ..Default::default()
        }
    }

    /// Document made of a single structured-data block.
    pub fn from_structured(value: Value) -> Self {
        Self {
            structured_data: vec![value],
            ..Default::default()
        }
    }

    pub fn with_metadata(mut self, metadata: PageMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// All Product objects across the structured-data blocks.
    pub fn products(&self) -> Vec<&Value> {
        let mut products = Vec::new();
        for block in &self.structured_data {
            collect_products(block, &mut products);
        }
        products
    }
}

// =============================================================================
// Extraction
// =============================================================================

/// Extract one record per recognized product, or a single fallback record
/// built from page metadata.
pub fn extract_records(document: &ExternalDocument) -> Vec<Record> {
    let products = document.products();
    if products.is_empty() {
        return vec![fallback_record(document)];
    }
    products.into_iter().map(extract_product).collect()
}

/// Flatten one schema.org Product object into a feed record.
pub fn extract_product(product: &Value) -> Record {
    let mut record = Record::new();

    for (field, property) in MARKUP_FIELD_MAPPING {
        let value = match product.get(property) {
            Some(v) => v,
            None => continue,
        };
        let extracted = match *property {
            "weight" => weight_value(value),
            "image" => image_value(value),
            _ => scalar_value(value),
        };
        if let Some(v) = extracted {
            record.insert(*field, v);
        }
    }

    if let Some(offer) = product.get("offers").and_then(first_object) {
        extract_offer(offer, &mut record);
    }

    if let Some(rating) = product.get("aggregateRating").filter(|r| r.is_object()) {
        if let Some(v) = rating.get("ratingValue").and_then(scalar_value) {
            record.insert("product_review_rating", v);
        }
        let count = rating.get("reviewCount").or_else(|| rating.get("ratingCount"));
        if let Some(v) = count.and_then(scalar_value) {
            record.insert("product_review_count", v);
        }
    }

    record
}

fn extract_offer(offer: &Value, record: &mut Record) {
    let price = offer
        .get("price")
        .or_else(|| offer.get("lowPrice"))
        .and_then(scalar_value);
    if let Some(price) = price {
        let price = price.as_text();
        let (amount, inline_currency) = split_price(&price);
        let currency = offer
            .get("priceCurrency")
            .and_then(scalar_value)
            .map(|c| c.as_text().into_owned())
            .or_else(|| inline_currency.map(str::to_string))
            .unwrap_or_else(|| DEFAULT_CURRENCY.to_string());
        record.insert("price", format!("{} {}", amount, currency));
    }

    let availability = offer
        .get("availability")
        .and_then(Value::as_str)
        .and_then(Availability::from_uri);
    if let Some(availability) = availability {
        record.insert("availability", availability.feed_value());
    }

    if let Some(seller) = offer.get("seller").and_then(scalar_value) {
        record.insert("seller_name", seller);
    }

    if record.value("link").is_none() {
        if let Some(url) = offer.get("url").and_then(scalar_value) {
            record.insert("link", url);
        }
    }
}

/// Minimal record from page metadata: title, description, link, image.
pub fn fallback_record(document: &ExternalDocument) -> Record {
    let meta = &document.metadata;
    let link = meta.canonical_url.as_ref().or(document.source_url.as_ref());

    let mut record = Record::new();
    for (field, value) in [
        ("title", meta.title.as_ref()),
        ("description", meta.description.as_ref()),
        ("link", link),
        ("image_link", meta.image.as_ref()),
    ] {
        if let Some(v) = value.map(|v| v.trim()).filter(|v| !v.is_empty()) {
            record.insert(field, v);
        }
    }
    record
}

// =============================================================================
// JSON-LD Helpers
// =============================================================================

fn collect_products<'a>(value: &'a Value, out: &mut Vec<&'a Value>) {
    match value {
        Value::Array(items) => {
            for item in items {
                collect_products(item, out);
            }
        }
        Value::Object(map) => {
            if is_product(value) {
                out.push(value);
            } else if let Some(graph) = map.get("@graph") {
                collect_products(graph, out);
            }
        }
        _ => {}
    }
}

/// Whether `@type` names `Product`, alone or among several types.
///
/// Prefixed forms such as `schema:Product` or `http://schema.org/Product`
/// are accepted.
pub fn is_product(value: &Value) -> bool {
    match value.get("@type") {
        Some(Value::String(t)) => names_product(t),
        Some(Value::Array(types)) => types.iter().filter_map(Value::as_str).any(names_product),
        _ => false,
    }
}

fn names_product(type_name: &str) -> bool {
    type_name.rsplit(|c: char| matches!(c, '/' | ':' | '#')).next() == Some("Product")
}

fn first_object(value: &Value) -> Option<&Value> {
    match value {
        Value::Array(items) => items.iter().find(|i| i.is_object()),
        Value::Object(_) => Some(value),
        _ => None,
    }
}

/// Reduce a JSON-LD value to one feed value.
///
/// Objects give their `name` (or `url` when unnamed), arrays their first
/// usable item. Blank strings count as absent.
fn scalar_value(value: &Value) -> Option<RawValue> {
    match value {
        Value::Null => None,
        Value::Bool(b) => Some(RawValue::Bool(*b)),
        Value::Number(n) => Some(RawValue::Number(n.clone())),
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| RawValue::from(trimmed))
        }
        Value::Array(items) => items.iter().find_map(scalar_value),
        Value::Object(map) => map
            .get("name")
            .or_else(|| map.get("url"))
            .and_then(scalar_value),
    }
}

/// `ImageObject`s give their `url` or `contentUrl` rather than their caption.
fn image_value(value: &Value) -> Option<RawValue> {
    match value {
        Value::Array(items) => items.iter().find_map(image_value),
        Value::Object(map) => map
            .get("url")
            .or_else(|| map.get("contentUrl"))
            .and_then(image_value),
        _ => scalar_value(value),
    }
}

/// `QuantitativeValue` weights become `"<value> <unitText>"`.
fn weight_value(value: &Value) -> Option<RawValue> {
    let Value::Object(map) = value else {
        return scalar_value(value);
    };
    let amount = map.get("value").and_then(scalar_value)?;
    let unit = map
        .get("unitText")
        .or_else(|| map.get("unitCode"))
        .and_then(scalar_value);
    Some(match unit {
        Some(unit) => RawValue::from(format!("{} {}", amount.as_text(), unit.as_text())),
        None => amount,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::map_record;
    use crate::spec::FieldSpecRegistry;
    use crate::testing::sample_record;
    use crate::validation::validate_feed;
    use serde_json::json;

    fn product() -> Value {
        json!({
            "@context": "https://schema.org/",
            "@type": "Product",
            "name": "Trail Shoe",
            "description": "Waterproof",
            "url": "https://shop.example/p/1",
            "image": ["https://shop.example/1.jpg", "https://shop.example/2.jpg"],
            "sku": "TS-1",
            "gtin": 123456789012_u64,
            "brand": { "@type": "Brand", "name": "Acme" },
            "offers": [{
                "@type": "Offer",
                "price": 79.99,
                "priceCurrency": "EUR",
                "availability": "http://schema.org/OutOfStock",
                "seller": { "@type": "Organization", "name": "Example Store" }
            }],
            "aggregateRating": { "@type": "AggregateRating", "ratingValue": 4.6, "reviewCount": 87 }
        })
    }

    #[test]
    fn test_image_object_gives_its_url() {
        let record = extract_product(&json!({
            "@type": "Product",
            "image": {"@type": "ImageObject", "name": "Front view", "url": "https://shop.example/1.jpg"}
        }));
        assert_eq!(record.text("image_link").as_deref(), Some("https://shop.example/1.jpg"));

        let record = extract_product(&json!({
            "@type": "Product",
            "image": [
                {"@type": "ImageObject", "caption": "Side"},
                {"@type": "ImageObject", "name": "Back", "contentUrl": "https://shop.example/2.jpg"}
            ]
        }));
        assert_eq!(record.text("image_link").as_deref(), Some("https://shop.example/2.jpg"));
    }

    #[test]
    fn test_extract_product() {
        let record = extract_product(&product());

        assert_eq!(record.text("title").as_deref(), Some("Trail Shoe"));
        assert_eq!(record.text("link").as_deref(), Some("https://shop.example/p/1"));
        assert_eq!(record.text("image_link").as_deref(), Some("https://shop.example/1.jpg"));
        assert_eq!(record.text("id").as_deref(), Some("TS-1"));
        assert_eq!(record.text("gtin").as_deref(), Some("123456789012"));
        assert_eq!(record.text("brand").as_deref(), Some("Acme"));
        assert_eq!(record.text("price").as_deref(), Some("79.99 EUR"));
        assert_eq!(record.text("availability").as_deref(), Some("out_of_stock"));
        assert_eq!(record.text("seller_name").as_deref(), Some("Example Store"));
        assert_eq!(record.text("product_review_rating").as_deref(), Some("4.6"));
        assert_eq!(record.text("product_review_count").as_deref(), Some("87"));
        assert!(!record.declares("mpn"));
    }

    #[test]
    fn test_price_without_currency_defaults_to_usd() {
        let record = extract_product(&json!({
            "@type": "Product",
            "offers": { "@type": "AggregateOffer", "lowPrice": "19.00" }
        }));
        assert_eq!(record.text("price").as_deref(), Some("19.00 USD"));
        assert!(!record.declares("availability"));
    }

    #[test]
    fn test_unknown_availability_is_omitted() {
        let record = extract_product(&json!({
            "@type": "Product",
            "offers": { "price": "5", "priceCurrency": "USD", "availability": "https://schema.org/Discontinued" }
        }));
        assert!(!record.declares("availability"));
    }

    #[test]
    fn test_weight_quantitative_value() {
        let record = extract_product(&json!({
            "@type": "Product",
            "weight": { "@type": "QuantitativeValue", "value": 1.5, "unitText": "lb" }
        }));
        assert_eq!(record.text("weight").as_deref(), Some("1.5 lb"));
    }

    #[test]
    fn test_products_in_arrays_and_graphs() {
        let document = ExternalDocument {
            structured_data: vec![
                json!({"@type": "WebSite", "name": "Shop"}),
                json!([{"@type": "Product", "name": "A"}, {"@type": "BreadcrumbList"}]),
                json!({"@graph": [{"@type": ["Product", "IndividualProduct"], "name": "B"}]}),
                json!({"@type": "schema:Product", "name": "C"}),
            ],
            ..Default::default()
        };

        let titles: Vec<String> = extract_records(&document)
            .iter()
            .filter_map(|r| r.text("title").map(|t| t.into_owned()))
            .collect();
        assert_eq!(titles, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_product_type_matching() {
        assert!(is_product(&json!({"@type": "http://schema.org/Product"})));
        assert!(!is_product(&json!({"@type": "ProductGroup"})));
        assert!(!is_product(&json!({"name": "Product"})));
    }

    #[test]
    fn test_fallback_record() {
        let document = ExternalDocument::new(Some("https://shop.example/p/1?ref=x".into()))
            .with_metadata(PageMetadata {
                title: Some("Trail Shoe | Shop".into()),
                description: Some("  ".into()),
                canonical_url: None,
                image: Some("https://shop.example/og.jpg".into()),
            });

        let records = extract_records(&document);
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.text("title").as_deref(), Some("Trail Shoe | Shop"));
        assert_eq!(record.text("link").as_deref(), Some("https://shop.example/p/1?ref=x"));
        assert_eq!(record.text("image_link").as_deref(), Some("https://shop.example/og.jpg"));
        assert!(!record.declares("description"));
    }

    #[test]
    fn test_fallback_record_fails_validation() {
        let document = ExternalDocument::new(Some("https://shop.example/".into()));
        let records = extract_records(&document);
        let report = validate_feed(&records, FieldSpecRegistry::builtin());

        assert_eq!(report.total_records, 1);
        assert_eq!(report.records_with_errors, 1);
    }

    #[test]
    fn test_round_trip_through_markup() {
        let original = sample_record();
        let markup = map_record(&original).to_value().unwrap();
        let records = extract_records(&ExternalDocument::from_structured(markup));

        assert_eq!(records.len(), 1);
        let recovered = &records[0];
        for field in [
            "id",
            "title",
            "description",
            "link",
            "brand",
            "gtin",
            "mpn",
            "image_link",
            "material",
            "weight",
            "price",
            "availability",
            "seller_name",
        ] {
            assert_eq!(recovered.text(field), original.text(field), "{}", field);
        }
        assert_eq!(recovered.text("price").as_deref(), Some("79.99 USD"));
    }
}
