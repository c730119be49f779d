//! UPI payment intent links
//!
//! Pure link construction: one deep link per wallet for the same intent.
//! Nothing here talks to a network or tracks settlement.

use crate::error::PaymentError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use url::form_urlencoded;

static VPA: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9._-]{2,256}@[A-Za-z][A-Za-z0-9]{1,64}$").ok());

/// Currency accepted over UPI
pub const UPI_CURRENCY: &str = "INR";

/// Wallet a link targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpiProvider {
    /// Any UPI app registered for `upi://`
    Generic,
    /// Google Pay
    GooglePay,
    /// PhonePe
    PhonePe,
    /// Paytm
    Paytm,
}

impl UpiProvider {
    /// Every supported provider, generic first
    pub const ALL: [Self; 4] = [Self::Generic, Self::GooglePay, Self::PhonePe, Self::Paytm];

    /// Scheme and path the query string is appended to
    #[must_use]
    pub fn base(self) -> &'static str {
        match self {
            Self::Generic => "upi://pay",
            Self::GooglePay => "tez://upi/pay",
            Self::PhonePe => "phonepe://pay",
            Self::Paytm => "paytmmp://pay",
        }
    }

    /// Display name
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Generic => "UPI",
            Self::GooglePay => "Google Pay",
            Self::PhonePe => "PhonePe",
            Self::Paytm => "Paytm",
        }
    }
}

impl fmt::Display for UpiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Everything needed to request a payment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentIntent {
    /// Payee virtual payment address, `handle@psp`
    pub payee_vpa: String,
    /// Payee name shown by the wallet
    pub payee_name: String,
    /// Amount in rupees
    pub amount: f64,
    /// Order the payment is for
    pub order_id: String,
    /// ISO currency code
    pub currency: String,
}

impl PaymentIntent {
    /// Create an INR intent
    pub fn new(
        payee_vpa: impl Into<String>,
        payee_name: impl Into<String>,
        amount: f64,
        order_id: impl Into<String>,
    ) -> Self {
        Self {
            payee_vpa: payee_vpa.into(),
            payee_name: payee_name.into(),
            amount,
            order_id: order_id.into(),
            currency: UPI_CURRENCY.to_string(),
        }
    }

    /// Builder: set currency
    #[must_use]
    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    /// Check the intent can be turned into links
    ///
    /// # Errors
    /// - `InvalidVpa`, `InvalidAmount`, `Missing` or `UnsupportedCurrency`
    pub fn validate(&self) -> Result<(), PaymentError> {
        if !is_valid_vpa(&self.payee_vpa) {
            return Err(PaymentError::InvalidVpa(self.payee_vpa.clone()));
        }
        if self.payee_name.trim().is_empty() {
            return Err(PaymentError::Missing("payee name"));
        }
        if !self.amount.is_finite() || self.amount <= 0.0 {
            return Err(PaymentError::InvalidAmount(self.amount.to_string()));
        }
        if self.order_id.trim().is_empty() {
            return Err(PaymentError::Missing("order id"));
        }
        if !self.currency.eq_ignore_ascii_case(UPI_CURRENCY) {
            return Err(PaymentError::UnsupportedCurrency(self.currency.clone()));
        }
        Ok(())
    }

    /// Encoded query shared by every provider
    fn query(&self) -> String {
        let note = format!("Order {}", self.order_id.trim());
        let encoded = form_urlencoded::Serializer::new(String::new())
            .append_pair("pa", self.payee_vpa.trim())
            .append_pair("pn", self.payee_name.trim())
            .append_pair("am", &format!("{:.2}", self.amount))
            .append_pair("cu", &self.currency.to_ascii_uppercase())
            .append_pair("tn", &note)
            .append_pair("tr", self.order_id.trim())
            .finish();
        // Wallets expect %20; form encoding already escapes a literal '+'
        encoded.replace('+', "%20")
    }
}

/// A deep link for one provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentLink {
    /// Wallet the link opens
    pub provider: UpiProvider,
    /// Deep link
    pub uri: String,
}

/// Check `handle@psp` syntax
#[must_use]
pub fn is_valid_vpa(vpa: &str) -> bool {
    VPA.as_ref().is_some_and(|re| re.is_match(vpa.trim()))
}

/// Build one link per provider, in the order given
///
/// # Errors
/// - Any validation failure of the intent
pub fn build_payment_links(
    intent: &PaymentIntent,
    providers: &[UpiProvider],
) -> Result<Vec<PaymentLink>, PaymentError> {
    intent.validate()?;
    let query = intent.query();
    let links: Vec<PaymentLink> = providers
        .iter()
        .map(|&provider| PaymentLink {
            provider,
            uri: format!("{}?{}", provider.base(), query),
        })
        .collect();
    tracing::debug!("Built {} payment links for order {}", links.len(), intent.order_id);
    Ok(links)
}
