//! # Catalog Types
//!
//! Product catalog types for the storefront.
//! Products are read from the remote API (`GET /products`).

use crate::money::Amount;
use serde::{Deserialize, Deserializer, Serialize};

/// Opaque product identifier.
///
/// The API hands out both numeric and string ids; both are kept in their
/// canonical string form so `5` and `"5"` name the same product.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ProductId(String);

impl ProductId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ProductId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ProductId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<u64> for ProductId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl std::fmt::Display for ProductId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ProductId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Number(u64),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(s) => ProductId(s),
            RawId::Number(n) => ProductId::from(n),
        })
    }
}

/// A purchasable variant of a product (size, tier)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    pub label: String,
    /// Overrides the product price when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Amount>,
}

/// A product in the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(alias = "_id")]
    pub id: ProductId,

    pub title: String,

    #[serde(default)]
    pub description: String,

    pub price: Amount,

    #[serde(default, alias = "image", skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    /// Units available; `None` when the API does not track stock
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock: Option<u32>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variants: Vec<Variant>,
}

impl Product {
    pub fn new(id: impl Into<ProductId>, title: impl Into<String>, price: Amount) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            price,
            image_url: None,
            category: None,
            stock: None,
            variants: Vec::new(),
        }
    }

    /// Builder: set description
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    /// Builder: set image URL
    pub fn with_image(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self
    }

    /// Builder: set category
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Builder: set stock
    pub fn with_stock(mut self, stock: u32) -> Self {
        self.stock = Some(stock);
        self
    }

    /// Builder: add a variant
    pub fn with_variant(mut self, variant: Variant) -> Self {
        self.variants.push(variant);
        self
    }

    pub fn in_stock(&self) -> bool {
        self.stock.map(|s| s > 0).unwrap_or(true)
    }

    pub fn variant(&self, label: &str) -> Option<&Variant> {
        self.variants.iter().find(|v| v.label == label)
    }
}

/// Product fields sent by the admin when creating or editing a product
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductDraft {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Amount,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock: Option<u32>,
}

/// Product catalog as fetched from the API
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductCatalog {
    pub products: Vec<Product>,
}

impl ProductCatalog {
    pub fn new(products: Vec<Product>) -> Self {
        Self { products }
    }

    /// Find a product by ID
    pub fn get(&self, id: &ProductId) -> Option<&Product> {
        self.products.iter().find(|p| &p.id == id)
    }

    /// Products in a category (case-insensitive)
    pub fn in_category<'a>(&'a self, category: &'a str) -> impl Iterator<Item = &'a Product> {
        self.products.iter().filter(move |p| {
            p.category
                .as_deref()
                .map(|c| c.eq_ignore_ascii_case(category))
                .unwrap_or(false)
        })
    }

    /// Case-insensitive search over title and description
    pub fn search(&self, query: &str) -> Vec<&Product> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return self.products.iter().collect();
        }
        self.products
            .iter()
            .filter(|p| {
                p.title.to_lowercase().contains(&needle)
                    || p.description.to_lowercase().contains(&needle)
            })
            .collect()
    }

    /// Distinct categories in catalog order
    pub fn categories(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for category in self.products.iter().filter_map(|p| p.category.as_deref()) {
            if !seen.contains(&category) {
                seen.push(category);
            }
        }
        seen
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn catalog() -> ProductCatalog {
        ProductCatalog::new(vec![
            Product::new(1u64, "Remera Negra", Decimal::from(1000)).with_category("Ropa"),
            Product::new(2u64, "Taza", Decimal::from(2500))
                .with_description("Taza de cerámica negra")
                .with_category("Hogar"),
            Product::new(3u64, "Buzo", Decimal::from(9000)).with_category("ropa"),
        ])
    }

    #[test]
    fn test_product_id_accepts_numbers_and_strings() {
        let from_number: ProductId = serde_json::from_str("5").unwrap();
        let from_text: ProductId = serde_json::from_str("\"5\"").unwrap();
        assert_eq!(from_number, from_text);
        assert_eq!(serde_json::to_string(&from_number).unwrap(), "\"5\"");
    }

    #[test]
    fn test_product_from_api_json() {
        let json = r#"{"_id": 7, "title": "Gorra", "price": 1999.5, "image": "https://img/g.png", "stock": 0}"#;
        let product: Product = serde_json::from_str(json).unwrap();

        assert_eq!(product.id, ProductId::from(7u64));
        assert_eq!(product.price, Decimal::new(19995, 1));
        assert_eq!(product.image_url.as_deref(), Some("https://img/g.png"));
        assert!(!product.in_stock());
    }

    #[test]
    fn test_search_and_categories() {
        let catalog = catalog();

        assert_eq!(catalog.search("negra").len(), 2);
        assert_eq!(catalog.search("  ").len(), 3);
        assert_eq!(catalog.in_category("ROPA").count(), 2);
        assert_eq!(catalog.categories(), vec!["Ropa", "Hogar", "ropa"]);
        assert!(catalog.get(&ProductId::from("2")).is_some());
    }
}
