//! Public product catalog

use super::{create_record, delete_record, patch_record};
use crate::error::CommerceResult;
use crate::media::{ensure_kind, MediaKind};
use crate::records::{NewProduct, Product, ProductPatch};
use crate::CommerceError;
use chrono::Utc;
use serde::Serialize;
use vx_binding::{Binder, BindingState, Gate, LiveBinding, Record};
use vx_gateway::{Direction, DocumentId, QueryDescriptor};

/// Which products a catalog shows
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogFilter {
    /// Only this category
    pub category: Option<String>,
    /// Hide products switched off by an admin
    pub active_only: bool,
}

impl CatalogFilter {
    /// Everything, including inactive products
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// What customers see
    #[must_use]
    pub fn storefront() -> Self {
        Self {
            category: None,
            active_only: true,
        }
    }

    /// Builder: restrict to a category
    #[must_use]
    pub fn in_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Query for this filter, newest first
    #[must_use]
    pub fn descriptor(&self) -> QueryDescriptor {
        let mut query = QueryDescriptor::collection(Product::COLLECTION);
        if let Some(category) = &self.category {
            query = query.where_eq("category", category.as_str());
        }
        if self.active_only {
            query = query.where_eq("isActive", true);
        }
        query.order_by("createdAt", Direction::Descending)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StampedProduct<'a> {
    #[serde(flatten)]
    product: &'a NewProduct,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    created_at: chrono::DateTime<Utc>,
}

/// Live product list with catalog mutators
#[derive(Debug)]
pub struct ProductCatalog {
    binder: Binder,
    live: LiveBinding<Vec<Product>>,
}

impl ProductCatalog {
    /// Open the catalog
    #[must_use]
    pub fn open(binder: &Binder, filter: &CatalogFilter) -> Self {
        tracing::debug!("Opening product catalog {:?}", filter);
        Self {
            binder: binder.clone(),
            live: binder.live_collection(filter.descriptor(), Gate::Public),
        }
    }

    /// Latest state
    #[must_use]
    pub fn state(&self) -> BindingState<Vec<Product>> {
        self.live.state()
    }

    /// Latest products, empty until loaded
    #[must_use]
    pub fn products(&self) -> Vec<Product> {
        self.live.data().unwrap_or_default()
    }

    /// Underlying binding
    #[must_use]
    pub fn binding(&self) -> &LiveBinding<Vec<Product>> {
        &self.live
    }

    /// Add a product
    ///
    /// # Errors
    /// - `Validation` for a blank name, a non-positive price or a bad media URL
    /// - `Gateway` if the write fails
    pub async fn add(&self, product: NewProduct) -> CommerceResult<DocumentId> {
        validate_product(&product)?;
        tracing::info!("Adding product {}", product.name);
        let stamped = StampedProduct {
            product: &product,
            created_at: Utc::now(),
        };
        create_record::<Product>(self.binder.gateway().as_ref(), &stamped).await
    }

    /// Update fields of a product
    ///
    /// # Errors
    /// - `Validation` for bad values or an empty patch
    /// - `Gateway` if the write fails, including an unknown id
    pub async fn update(&self, id: &DocumentId, patch: ProductPatch) -> CommerceResult<()> {
        validate_patch(&patch)?;
        patch_record::<Product>(self.binder.gateway().as_ref(), id, &patch).await
    }

    /// Delete a product
    ///
    /// # Errors
    /// - `Gateway` if the delete fails
    pub async fn delete(&self, id: &DocumentId) -> CommerceResult<()> {
        delete_record::<Product>(self.binder.gateway().as_ref(), id).await
    }

    /// Close the channel
    pub fn close(&self) {
        self.live.dispose();
    }
}

fn validate_price(price: f64) -> CommerceResult<()> {
    if price.is_finite() && price > 0.0 {
        Ok(())
    } else {
        Err(CommerceError::invalid(format!("price must be positive, got {price}")))
    }
}

fn validate_media(images: &[String], video: Option<&str>) -> CommerceResult<()> {
    for url in images {
        ensure_kind(url, MediaKind::Image)?;
    }
    if let Some(url) = video {
        ensure_kind(url, MediaKind::Video)?;
    }
    Ok(())
}

fn validate_product(product: &NewProduct) -> CommerceResult<()> {
    if product.name.trim().is_empty() {
        return Err(CommerceError::invalid("product name is required"));
    }
    if product.category.trim().is_empty() {
        return Err(CommerceError::invalid("category is required"));
    }
    validate_price(product.price)?;
    validate_media(&product.images, product.video_url.as_deref())
}

fn validate_patch(patch: &ProductPatch) -> CommerceResult<()> {
    if patch.name.as_deref().is_some_and(|name| name.trim().is_empty()) {
        return Err(CommerceError::invalid("product name is required"));
    }
    if let Some(price) = patch.price {
        validate_price(price)?;
    }
    validate_media(
        patch.images.as_deref().unwrap_or_default(),
        patch.video_url.as_deref(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use vx_gateway::{Filter, FilterOp};

    #[test]
    fn storefront_descriptor() {
        let query = CatalogFilter::storefront().in_category("grocery").descriptor();
        assert_eq!(query.collection, "products");
        assert_eq!(query.filters.len(), 2);
        assert_eq!(
            query.filters[1],
            Filter {
                field: "isActive".into(),
                op: FilterOp::Eq,
                value: true.into(),
            }
        );
        assert_eq!(query.order_by.first().map(|o| o.direction), Some(Direction::Descending));
    }

    #[test]
    fn product_checks() {
        let ok = NewProduct::new("Rice", 100.0, "grocery").with_image("https://cdn.example.com/r.png");
        assert!(validate_product(&ok).is_ok());

        let bad_price = NewProduct::new("Rice", 0.0, "grocery");
        assert!(validate_product(&bad_price).is_err());

        let bad_image = ok.clone().with_image("https://cdn.example.com/r.mp4");
        assert!(matches!(validate_product(&bad_image), Err(CommerceError::Media(_))));

        let bad_video = ok.with_video("https://cdn.example.com/r.png");
        assert!(matches!(validate_product(&bad_video), Err(CommerceError::Media(_))));
    }
}
