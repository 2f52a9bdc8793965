//! # Cart Store
//!
//! The authoritative set of line items for one storefront session.
//!
//! Every mutation replaces the current snapshot with a new `Cart`; snapshots
//! handed out earlier are never touched, so an order draft taken before
//! payment still reflects what the shopper bought after the cart is cleared.

use crate::catalog::{Product, ProductId};
use crate::error::{FieldError, ShopError, ShopResult};
use crate::money::Amount;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

fn default_quantity() -> u32 {
    1
}

/// A line item in the cart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: ProductId,

    /// Product title (denormalized for display)
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,

    pub unit_price: Amount,

    #[serde(default = "default_quantity")]
    pub quantity: u32,

    /// Size or tier chosen by the shopper
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant_label: Option<String>,
}

impl LineItem {
    pub fn new(product_id: impl Into<ProductId>, title: impl Into<String>, unit_price: Amount) -> Self {
        Self {
            product_id: product_id.into(),
            title: title.into(),
            image_url: None,
            unit_price,
            quantity: 1,
            variant_label: None,
        }
    }

    /// Create a line item from a catalog product, optionally for a variant
    pub fn from_product(product: &Product, variant: Option<&str>) -> Self {
        let chosen = variant.and_then(|label| product.variant(label));
        Self {
            product_id: product.id.clone(),
            title: product.title.clone(),
            image_url: product.image_url.clone(),
            unit_price: chosen.and_then(|v| v.price).unwrap_or(product.price),
            quantity: 1,
            variant_label: chosen.map(|v| v.label.clone()),
        }
    }

    /// Builder: set quantity (clamped to at least 1)
    pub fn with_quantity(mut self, quantity: u32) -> Self {
        self.quantity = quantity.max(1);
        self
    }

    /// Builder: set variant label
    pub fn with_variant(mut self, label: impl Into<String>) -> Self {
        self.variant_label = Some(label.into());
        self
    }

    /// Builder: set image URL
    pub fn with_image(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self
    }

    /// Price of this line (unit price times quantity)
    pub fn total(&self) -> Amount {
        self.unit_price * Amount::from(self.quantity)
    }
}

/// An immutable snapshot of the cart contents, in insertion order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    items: Vec<LineItem>,
}

impl Cart {
    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn get(&self, product_id: &ProductId) -> Option<&LineItem> {
        self.items.iter().find(|i| &i.product_id == product_id)
    }

    pub fn contains(&self, product_id: &ProductId) -> bool {
        self.get(product_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total number of units across all lines
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    /// Rebuild a cart from persisted items, dropping repeated ids and
    /// negative prices and clamping zero quantities.
    pub fn from_items(items: Vec<LineItem>) -> Self {
        let mut cart = Cart::default();
        for mut item in items {
            if cart.contains(&item.product_id) || item.unit_price < Amount::ZERO {
                continue;
            }
            item.quantity = item.quantity.max(1);
            cart.items.push(item);
        }
        cart
    }
}

/// Holds the current cart snapshot and applies mutations to it
#[derive(Debug, Default)]
pub struct CartStore {
    current: Arc<Cart>,
}

impl CartStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a previously persisted cart
    pub fn rehydrate(cart: Cart) -> Self {
        Self {
            current: Arc::new(Cart::from_items(cart.items)),
        }
    }

    /// The current snapshot
    pub fn snapshot(&self) -> Arc<Cart> {
        Arc::clone(&self.current)
    }

    fn replace(&mut self, items: Vec<LineItem>) -> Arc<Cart> {
        self.current = Arc::new(Cart { items });
        self.snapshot()
    }

    /// Append an item.
    ///
    /// A second add of the same product is refused with
    /// [`ShopError::DuplicateItem`] and leaves the cart unchanged; quantities
    /// are not merged. A negative unit price is refused with a
    /// `unit_price` field error.
    pub fn add(&mut self, item: LineItem) -> ShopResult<Arc<Cart>> {
        if item.unit_price < Amount::ZERO {
            debug!(product_id = %item.product_id, price = %item.unit_price, "negative price rejected");
            return Err(ShopError::Validation(vec![FieldError::invalid(
                "unit_price",
                format!("price of {} must not be negative", item.title),
            )]));
        }
        if self.current.contains(&item.product_id) {
            debug!(product_id = %item.product_id, "duplicate add rejected");
            return Err(ShopError::DuplicateItem {
                product_id: item.product_id,
            });
        }
        let quantity = item.quantity;
        let mut items = self.current.items.clone();
        items.push(item.with_quantity(quantity));
        Ok(self.replace(items))
    }

    /// Set the quantity of a line. A quantity below 1 removes the line;
    /// unknown ids are ignored.
    pub fn update_quantity(&mut self, product_id: &ProductId, quantity: u32) -> Arc<Cart> {
        if !self.current.contains(product_id) {
            return self.snapshot();
        }
        if quantity < 1 {
            return self.remove(product_id);
        }
        let items = self
            .current
            .items
            .iter()
            .map(|item| {
                if &item.product_id == product_id {
                    LineItem {
                        quantity,
                        ..item.clone()
                    }
                } else {
                    item.clone()
                }
            })
            .collect();
        self.replace(items)
    }

    pub fn increment(&mut self, product_id: &ProductId) -> Arc<Cart> {
        match self.current.get(product_id) {
            Some(item) => {
                let next = item.quantity.saturating_add(1);
                self.update_quantity(product_id, next)
            }
            None => self.snapshot(),
        }
    }

    /// Decrement by one; a quantity-1 line is removed.
    pub fn decrement(&mut self, product_id: &ProductId) -> Arc<Cart> {
        match self.current.get(product_id) {
            Some(item) => {
                let next = item.quantity.saturating_sub(1);
                self.update_quantity(product_id, next)
            }
            None => self.snapshot(),
        }
    }

    pub fn remove(&mut self, product_id: &ProductId) -> Arc<Cart> {
        if !self.current.contains(product_id) {
            return self.snapshot();
        }
        let items = self
            .current
            .items
            .iter()
            .filter(|i| &i.product_id != product_id)
            .cloned()
            .collect();
        self.replace(items)
    }

    pub fn clear(&mut self) -> Arc<Cart> {
        self.replace(Vec::new())
    }
}
