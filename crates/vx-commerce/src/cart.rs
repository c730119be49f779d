//! Shopping cart and price quotes

use crate::error::{CommerceError, CommerceResult};
use crate::records::{OrderItem, Product, StoreProfile};
use serde::{Deserialize, Serialize};
use vx_gateway::DocumentId;

/// One line in the cart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    /// Product this line refers to
    pub product_id: DocumentId,
    /// Product name at the time it was added
    pub name: String,
    /// Price per unit
    pub unit_price: f64,
    /// Units in the cart
    pub quantity: u32,
    /// Cover image URL
    pub image: Option<String>,
    /// Stock seen when the line was last touched
    pub available: u32,
}

impl CartItem {
    /// Line total
    #[inline]
    #[must_use]
    pub fn total(&self) -> f64 {
        self.unit_price * f64::from(self.quantity)
    }
}

impl From<&CartItem> for OrderItem {
    fn from(item: &CartItem) -> Self {
        Self {
            product_id: item.product_id.clone(),
            name: item.name.clone(),
            unit_price: item.unit_price,
            quantity: item.quantity,
            image: item.image.clone(),
        }
    }
}

/// Client-side cart; lines keep insertion order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    /// Create empty cart
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `quantity` units, merging with an existing line
    ///
    /// # Errors
    /// - `Validation` for inactive products or a zero quantity
    /// - `OutOfStock` when the merged quantity exceeds stock
    pub fn add(&mut self, product: &Product, quantity: u32) -> CommerceResult<()> {
        if quantity == 0 {
            return Err(CommerceError::invalid("quantity must be at least 1"));
        }
        if !product.is_active {
            return Err(CommerceError::invalid(format!("{} is not available", product.name)));
        }

        let existing = self.position(&product.id).map_or(0, |i| self.items[i].quantity);
        let wanted = existing.saturating_add(quantity);
        if !product.has_stock(wanted) {
            return Err(CommerceError::OutOfStock {
                product: product.name.clone(),
                available: product.stock,
            });
        }

        match self.position(&product.id) {
            Some(i) => {
                let line = &mut self.items[i];
                line.quantity = wanted;
                line.unit_price = product.price;
                line.available = product.stock;
            }
            None => self.items.push(CartItem {
                product_id: product.id.clone(),
                name: product.name.clone(),
                unit_price: product.price,
                quantity,
                image: product.cover().map(str::to_string),
                available: product.stock,
            }),
        }
        Ok(())
    }

    /// Set a line's quantity; zero removes the line
    ///
    /// # Errors
    /// - `NotFound` if the product is not in the cart
    /// - `OutOfStock` above the last seen stock
    pub fn set_quantity(&mut self, product_id: &DocumentId, quantity: u32) -> CommerceResult<()> {
        let index = self
            .position(product_id)
            .ok_or_else(|| CommerceError::not_found("cart item", product_id.as_str()))?;
        if quantity == 0 {
            self.items.remove(index);
            return Ok(());
        }
        let line = &mut self.items[index];
        if quantity > line.available {
            return Err(CommerceError::OutOfStock {
                product: line.name.clone(),
                available: line.available,
            });
        }
        line.quantity = quantity;
        Ok(())
    }

    /// Remove a line; returns whether it existed
    pub fn remove(&mut self, product_id: &DocumentId) -> bool {
        let before = self.items.len();
        self.items.retain(|item| &item.product_id != product_id);
        before != self.items.len()
    }

    /// Empty the cart
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Lines in insertion order
    #[inline]
    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    /// Check if the cart has no lines
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Units across all lines
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }

    /// Sum of line totals
    #[must_use]
    pub fn subtotal(&self) -> f64 {
        self.items.iter().map(CartItem::total).sum()
    }

    fn position(&self, product_id: &DocumentId) -> Option<usize> {
        self.items.iter().position(|item| &item.product_id == product_id)
    }
}

/// Price breakdown for a cart
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OrderQuote {
    /// Sum of line totals
    pub subtotal: f64,
    /// Rupees off, at most the subtotal
    pub discount: f64,
    /// Delivery charge after the free-delivery threshold
    pub delivery_fee: f64,
    /// Amount payable
    pub total: f64,
}

/// Quote a cart
///
/// The discount is clamped to the subtotal; delivery is charged on the
/// discounted amount and waived at or above the free delivery threshold.
#[must_use]
pub fn quote(cart: &Cart, profile: &StoreProfile, discount: f64) -> OrderQuote {
    let subtotal = round2(cart.subtotal());
    let discount = round2(discount.clamp(0.0, subtotal));
    let discounted = subtotal - discount;
    let delivery_fee = if cart.is_empty() {
        0.0
    } else {
        profile.delivery_fee_for(discounted)
    };
    OrderQuote {
        subtotal,
        discount,
        delivery_fee,
        total: round2(discounted + delivery_fee),
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
