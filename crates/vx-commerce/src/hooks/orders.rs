//! Order tracking and the admin order board

use super::{fetch_record, patch_record, require_principal};
use crate::error::{CommerceError, CommerceResult};
use crate::records::{Order, OrderStatus, PaymentStatus};
use chrono::{DateTime, Utc};
use serde::Serialize;
use vx_binding::{Binder, BindingState, Gate, LiveBinding, OnMissing, Record};
use vx_gateway::{Direction, DocumentId, DocumentRef, QueryDescriptor};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OrderUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<OrderStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    payment_status: Option<PaymentStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tracking_number: Option<String>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    updated_at: DateTime<Utc>,
}

impl OrderUpdate {
    fn now() -> Self {
        Self {
            status: None,
            payment_status: None,
            tracking_number: None,
            updated_at: Utc::now(),
        }
    }
}

/// Customer view of one order
///
/// Public; an unknown order id settles in `NotFound` and the channel closes,
/// so an order created later under that id is not picked up.
#[derive(Debug)]
pub struct OrderTracker {
    live: LiveBinding<Order>,
}

impl OrderTracker {
    /// Follow one order by id
    #[must_use]
    pub fn open(binder: &Binder, order_id: &DocumentId) -> Self {
        let reference = DocumentRef::new(Order::COLLECTION, order_id.clone());
        tracing::debug!("Tracking {}", reference);
        Self {
            live: binder.live_document(reference, Gate::Public, OnMissing::Close),
        }
    }

    /// Current binding state
    #[must_use]
    pub fn state(&self) -> BindingState<Order> {
        self.live.state()
    }

    /// Latest order snapshot, if any
    #[must_use]
    pub fn order(&self) -> Option<Order> {
        self.live.data()
    }

    /// Underlying live binding
    #[must_use]
    pub fn binding(&self) -> &LiveBinding<Order> {
        &self.live
    }

    /// Stop tracking
    pub fn close(&self) {
        self.live.dispose();
    }
}

/// Which orders the board shows
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderFilter {
    /// Only orders in this status
    pub status: Option<OrderStatus>,
    /// Only orders placed by this user
    pub user_id: Option<String>,
}

impl OrderFilter {
    /// Query for this filter, newest first
    #[must_use]
    pub fn descriptor(&self) -> QueryDescriptor {
        let mut query = QueryDescriptor::collection(Order::COLLECTION);
        if let Some(status) = self.status {
            query = query.where_eq("status", status.as_str());
        }
        if let Some(user_id) = &self.user_id {
            query = query.where_eq("userId", user_id.as_str());
        }
        query.order_by("createdAt", Direction::Descending)
    }
}

/// Admin list of orders with fulfilment mutators
#[derive(Debug)]
pub struct OrderBoard {
    binder: Binder,
    live: LiveBinding<Vec<Order>>,
}

impl OrderBoard {
    /// Open the board; stays unauthenticated until someone signs in
    #[must_use]
    pub fn open(binder: &Binder, filter: &OrderFilter) -> Self {
        Self {
            binder: binder.clone(),
            live: binder.live_collection(filter.descriptor(), Gate::Authenticated),
        }
    }

    /// Current binding state
    #[must_use]
    pub fn state(&self) -> BindingState<Vec<Order>> {
        self.live.state()
    }

    /// Orders in the latest snapshot, newest first
    #[must_use]
    pub fn orders(&self) -> Vec<Order> {
        self.live.data().unwrap_or_default()
    }

    /// Underlying live binding
    #[must_use]
    pub fn binding(&self) -> &LiveBinding<Vec<Order>> {
        &self.live
    }

    /// Move an order along its lifecycle
    ///
    /// The stored status is read first; only a single forward step or a
    /// cancellation before shipping is written.
    ///
    /// # Errors
    /// - `Unauthenticated` when nobody is signed in
    /// - `NotFound` for an unknown order
    /// - `IllegalTransition` otherwise refused
    /// - `Gateway` if the write fails
    pub async fn update_status(&self, id: &DocumentId, to: OrderStatus) -> CommerceResult<()> {
        require_principal(&self.binder)?;
        let gateway = self.binder.gateway().as_ref();
        let order: Order = fetch_record(gateway, id, "order").await?;
        if !order.status.can_transition_to(to) {
            return Err(CommerceError::IllegalTransition {
                from: order.status,
                to,
            });
        }
        tracing::info!("Order {}: {} -> {}", id, order.status, to);
        let update = OrderUpdate {
            status: Some(to),
            ..OrderUpdate::now()
        };
        patch_record::<Order>(gateway, id, &update).await
    }

    /// Record payment state
    ///
    /// # Errors
    /// - `Unauthenticated` or `Gateway`
    pub async fn set_payment_status(&self, id: &DocumentId, status: PaymentStatus) -> CommerceResult<()> {
        require_principal(&self.binder)?;
        let update = OrderUpdate {
            payment_status: Some(status),
            ..OrderUpdate::now()
        };
        patch_record::<Order>(self.binder.gateway().as_ref(), id, &update).await
    }

    /// Attach a courier tracking number
    ///
    /// # Errors
    /// - `Unauthenticated`, `Validation` for a blank number, or `Gateway`
    pub async fn set_tracking(&self, id: &DocumentId, tracking_number: &str) -> CommerceResult<()> {
        require_principal(&self.binder)?;
        let tracking_number = tracking_number.trim();
        if tracking_number.is_empty() {
            return Err(CommerceError::invalid("tracking number is required"));
        }
        let update = OrderUpdate {
            tracking_number: Some(tracking_number.to_string()),
            ..OrderUpdate::now()
        };
        patch_record::<Order>(self.binder.gateway().as_ref(), id, &update).await
    }

    /// Stop listening
    pub fn close(&self) {
        self.live.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_descriptor() {
        let filter = OrderFilter {
            status: Some(OrderStatus::Shipped),
            user_id: Some("u1".into()),
        };
        let query = filter.descriptor();
        assert_eq!(query.filters.len(), 2);
        assert_eq!(query.filters[0].value, serde_json::json!("shipped"));
        assert_eq!(query.filters[1].field, "userId");
        assert!(query.validate().is_ok());
    }
}
