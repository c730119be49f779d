//! Order placement

use crate::cart::{quote, Cart, OrderQuote};
use crate::config::PaymentConfig;
use crate::discount::CouponValidation;
use crate::error::{CommerceError, CommerceResult, PaymentError};
use crate::hooks::coupons::{redeem_coupon, validate_code_remote};
use crate::hooks::create_record;
use crate::payment::{build_payment_links, is_valid_vpa, PaymentIntent, PaymentLink};
use crate::records::{
    CustomerDetails, NewOrder, Order, OrderItem, OrderStatus, PaymentMethod, PaymentStatus,
    StoreProfile,
};
use chrono::Utc;
use std::sync::Arc;
use vx_gateway::{DocumentGateway, DocumentId};

/// What the customer submits at checkout
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutRequest {
    /// Delivery contact
    pub customer: CustomerDetails,
    /// How the customer pays
    pub payment_method: PaymentMethod,
    /// Coupon code typed at checkout
    pub coupon_code: Option<String>,
    /// Signed-in customer, if any
    pub user_id: Option<String>,
}

/// Result of a placed order
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedOrder {
    /// Store-assigned order id
    pub order_id: DocumentId,
    /// Price breakdown written with the order
    pub quote: OrderQuote,
    /// Coupon outcome, when a code was given
    pub coupon: Option<CouponValidation>,
    /// One link per configured wallet; empty for cash on delivery
    pub payment_links: Vec<PaymentLink>,
}

/// Places orders against the store
#[derive(Debug, Clone)]
pub struct Checkout {
    gateway: Arc<dyn DocumentGateway>,
    payment: PaymentConfig,
}

impl Checkout {
    /// Create checkout over a gateway
    #[must_use]
    pub fn new(gateway: Arc<dyn DocumentGateway>, payment: PaymentConfig) -> Self {
        Self { gateway, payment }
    }

    /// Price a cart, applying a coupon code if given
    ///
    /// An invalid code is not an error here: the quote carries no discount
    /// and the validation explains why.
    ///
    /// # Errors
    /// - `Gateway` if the coupon lookup fails
    pub async fn preview(
        &self,
        cart: &Cart,
        profile: &StoreProfile,
        coupon_code: Option<&str>,
    ) -> CommerceResult<(OrderQuote, Option<CouponValidation>)> {
        let validation = match coupon_code.map(str::trim).filter(|c| !c.is_empty()) {
            Some(code) => Some(
                validate_code_remote(self.gateway.as_ref(), code, cart.subtotal(), Utc::now()).await?,
            ),
            None => None,
        };
        let discount = validation
            .as_ref()
            .filter(|v| v.valid)
            .map_or(0.0, |v| v.discount);
        Ok((quote(cart, profile, discount), validation))
    }

    /// Validate, write the order, redeem the coupon and build payment links
    ///
    /// # Errors
    /// - `Validation` for an empty cart, bad customer details or a disabled method
    /// - `StoreClosed` when the store is not accepting orders
    /// - `CouponRejected` for an invalid coupon code
    /// - `Payment` if the store's UPI id is unusable
    /// - `Gateway` if the order cannot be written
    pub async fn place_order(
        &self,
        cart: &Cart,
        profile: &StoreProfile,
        request: CheckoutRequest,
    ) -> CommerceResult<PlacedOrder> {
        if cart.is_empty() {
            return Err(CommerceError::invalid("cart is empty"));
        }
        if !profile.accepting_orders {
            return Err(CommerceError::StoreClosed);
        }
        if let Some(problem) = request.customer.problem() {
            return Err(CommerceError::invalid(problem));
        }
        match request.payment_method {
            PaymentMethod::CashOnDelivery if !profile.cod_enabled => {
                return Err(CommerceError::invalid("cash on delivery is not available"));
            }
            PaymentMethod::Upi if !is_valid_vpa(&profile.upi_id) => {
                return Err(PaymentError::InvalidVpa(profile.upi_id.clone()).into());
            }
            _ => {}
        }

        let (quote, coupon) = self
            .preview(cart, profile, request.coupon_code.as_deref())
            .await?;
        if let Some(validation) = coupon.as_ref().filter(|v| !v.valid) {
            return Err(CommerceError::CouponRejected(validation.message.clone()));
        }
        let applied = coupon.as_ref().and_then(|v| v.coupon.as_ref());

        let order = NewOrder {
            user_id: request.user_id,
            customer: request.customer,
            items: cart.items().iter().map(OrderItem::from).collect(),
            subtotal: quote.subtotal,
            discount: quote.discount,
            delivery_fee: quote.delivery_fee,
            total: quote.total,
            coupon_code: applied.map(|c| c.code.clone()),
            payment_method: request.payment_method,
            payment_status: PaymentStatus::Pending,
            status: OrderStatus::Pending,
            created_at: Utc::now(),
        };
        let order_id = create_record::<Order>(self.gateway.as_ref(), &order).await?;
        tracing::info!("Order {} placed: {} items, total {}", order_id, cart.item_count(), quote.total);

        if let Some(applied) = applied {
            // The order is already written; a failed redemption must not undo it
            if let Err(err) = redeem_coupon(self.gateway.as_ref(), &applied.id).await {
                tracing::warn!("Coupon {} not redeemed for order {}: {}", applied.code, order_id, err);
            }
        }

        let payment_links = match order.payment_method {
            // Nothing to collect when the discount and free delivery cover everything
            PaymentMethod::Upi if quote.total > 0.0 => {
                let intent = PaymentIntent::new(
                    profile.upi_id.as_str(),
                    profile.upi_payee_name.as_str(),
                    quote.total,
                    order_id.as_str(),
                )
                .with_currency(self.payment.currency.as_str());
                build_payment_links(&intent, &self.payment.providers)?
            }
            PaymentMethod::Upi | PaymentMethod::CashOnDelivery => Vec::new(),
        };

        Ok(PlacedOrder {
            order_id,
            quote,
            coupon,
            payment_links,
        })
    }
}
