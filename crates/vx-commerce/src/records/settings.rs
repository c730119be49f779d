//! Store-wide settings singleton

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use vx_binding::Record;
use vx_gateway::DocumentId;

/// Editable store profile
///
/// This is also the default record written when the settings document is
/// first accessed and does not exist yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoreProfile {
    /// Display name
    pub store_name: String,
    /// Short line under the name
    pub tagline: String,
    /// Customer support phone
    pub contact_phone: String,
    /// Customer support email
    pub contact_email: String,
    /// Store address
    pub address: String,
    /// Payee address for UPI links
    pub upi_id: String,
    /// Payee name shown by wallets
    pub upi_payee_name: String,
    /// Flat delivery charge
    pub delivery_fee: f64,
    /// Orders at or above this subtotal ship free
    #[serde(skip_serializing_if = "Option::is_none")]
    pub free_delivery_threshold: Option<f64>,
    /// Whether cash on delivery is offered
    pub cod_enabled: bool,
    /// Whether checkout is open
    pub accepting_orders: bool,
}

impl Default for StoreProfile {
    fn default() -> Self {
        Self {
            store_name: "Venkat Express".into(),
            tagline: "Groceries and parcels, delivered".into(),
            contact_phone: String::new(),
            contact_email: String::new(),
            address: String::new(),
            upi_id: "venkatexpress@upi".into(),
            upi_payee_name: "Venkat Express".into(),
            delivery_fee: 40.0,
            free_delivery_threshold: Some(499.0),
            cod_enabled: true,
            accepting_orders: true,
        }
    }
}

impl StoreProfile {
    /// Delivery charge for a discounted subtotal
    #[must_use]
    pub fn delivery_fee_for(&self, amount: f64) -> f64 {
        match self.free_delivery_threshold {
            Some(threshold) if amount >= threshold => 0.0,
            _ => self.delivery_fee.max(0.0),
        }
    }
}

/// The settings document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSettings {
    /// Settings document id
    pub id: DocumentId,
    /// Editable store fields
    #[serde(flatten)]
    pub profile: StoreProfile,
    /// Last update time
    #[serde(
        default,
        with = "chrono::serde::ts_milliseconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Record for StoreSettings {
    const COLLECTION: &'static str = "settings";

    fn id(&self) -> &DocumentId {
        &self.id
    }
}

/// Partial settings update
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    /// New store name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_name: Option<String>,
    /// New tagline
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tagline: Option<String>,
    /// New support phone
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_phone: Option<String>,
    /// New support email
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_email: Option<String>,
    /// New address
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// New UPI payee address
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upi_id: Option<String>,
    /// New UPI payee name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upi_payee_name: Option<String>,
    /// New delivery fee
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_fee: Option<f64>,
    /// New free-delivery threshold
    #[serde(skip_serializing_if = "Option::is_none")]
    pub free_delivery_threshold: Option<f64>,
    /// Enable or disable cash on delivery
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cod_enabled: Option<bool>,
    /// Open or close checkout
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accepting_orders: Option<bool>,
}
