//! Catalog products

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use vx_binding::Record;
use vx_gateway::DocumentId;

/// A product in the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Store-assigned id
    pub id: DocumentId,
    /// Display name
    pub name: String,
    /// Long description
    #[serde(default)]
    pub description: String,
    /// Selling price in rupees
    pub price: f64,
    /// Struck-through price, when discounted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_price: Option<f64>,
    /// Category slug
    pub category: String,
    /// Image URLs, first is the cover
    #[serde(default)]
    pub images: Vec<String>,
    /// Optional video URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    /// Units on hand
    #[serde(default)]
    pub stock: u32,
    /// Hidden from customers when false
    #[serde(default = "super::enabled")]
    pub is_active: bool,
    /// Creation time
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl Product {
    /// Check if at least `quantity` units are available
    #[inline]
    #[must_use]
    pub fn has_stock(&self, quantity: u32) -> bool {
        self.stock >= quantity
    }

    /// Percentage off the original price, rounded down
    #[must_use]
    pub fn discount_percent(&self) -> Option<u32> {
        let original = self.original_price?;
        if original <= self.price || original <= 0.0 {
            return None;
        }
        Some((((original - self.price) / original) * 100.0).floor() as u32)
    }

    /// Cover image
    #[inline]
    #[must_use]
    pub fn cover(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }
}

impl Record for Product {
    const COLLECTION: &'static str = "products";

    fn id(&self) -> &DocumentId {
        &self.id
    }
}

/// Fields for a new product; id and timestamp are assigned on write
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    /// Display name
    pub name: String,
    /// Long description
    #[serde(default)]
    pub description: String,
    /// Selling price
    pub price: f64,
    /// Struck-through price
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_price: Option<f64>,
    /// Category slug
    pub category: String,
    /// Image URLs
    #[serde(default)]
    pub images: Vec<String>,
    /// Video URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    /// Units on hand
    #[serde(default)]
    pub stock: u32,
    /// Visible to customers
    #[serde(default = "super::enabled")]
    pub is_active: bool,
}

impl NewProduct {
    /// Create product draft
    pub fn new(name: impl Into<String>, price: f64, category: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            price,
            original_price: None,
            category: category.into(),
            images: Vec::new(),
            video_url: None,
            stock: 0,
            is_active: true,
        }
    }

    /// Builder: set description
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Builder: add image URL
    #[must_use]
    pub fn with_image(mut self, url: impl Into<String>) -> Self {
        self.images.push(url.into());
        self
    }

    /// Builder: set video URL
    #[must_use]
    pub fn with_video(mut self, url: impl Into<String>) -> Self {
        self.video_url = Some(url.into());
        self
    }

    /// Builder: set stock
    #[must_use]
    pub fn with_stock(mut self, stock: u32) -> Self {
        self.stock = stock;
        self
    }

    /// Builder: set original price
    #[must_use]
    pub fn with_original_price(mut self, price: f64) -> Self {
        self.original_price = Some(price);
        self
    }
}

/// Partial product update
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPatch {
    /// New name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// New price
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    /// New list price
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_price: Option<f64>,
    /// New category
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Replacement image URLs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
    /// New video URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    /// New stock count
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stock: Option<u32>,
    /// Show or hide in the storefront
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}
