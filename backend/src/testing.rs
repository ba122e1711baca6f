//! Shared fixtures for unit tests.

use crate::models::Record;

/// A record that satisfies every rule of the built-in table.
pub(crate) fn sample_record() -> Record {
    Record::new()
        .with("enable_search", "true")
        .with("enable_checkout", "true")
        .with("id", "SKU1")
        .with("gtin", "123456789012")
        .with("mpn", "SHOE-1")
        .with("title", "Shoe")
        .with("description", "Waterproof trail shoe with cushioned sole")
        .with("link", "https://a.com/p")
        .with("condition", "new")
        .with("product_category", "Apparel & Accessories > Shoes")
        .with("brand", "Acme")
        .with("material", "Leather")
        .with("weight", "1.5 lb")
        .with("image_link", "https://a.com/p.jpg")
        .with("price", "79.99 USD")
        .with("availability", "in_stock")
        .with("inventory_quantity", "25")
        .with("seller_name", "Example Store")
        .with("seller_url", "https://a.com/store")
        .with("seller_privacy_policy", "https://a.com/privacy")
        .with("seller_tos", "https://a.com/terms")
        .with("return_policy", "https://a.com/returns")
        .with("return_window", "30")
}
