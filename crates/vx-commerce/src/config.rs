//! Storefront configuration
//!
//! Loaded from TOML; every section and field is optional and falls back to
//! the defaults below.
//!
//! ```toml
//! [search]
//! debounce_ms = 300
//! window = 50
//! max_results = 5
//!
//! [payment]
//! currency = "INR"
//! providers = ["generic", "google_pay", "phone_pe", "paytm"]
//!
//! [settings]
//! document_id = "store"
//!
//! [settings.defaults]
//! storeName = "Venkat Express"
//! ```

use crate::error::ConfigError;
use crate::payment::{UpiProvider, UPI_CURRENCY};
use crate::records::StoreProfile;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use vx_binding::DebounceConfig;

/// Search suggestion tuning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Quiet period in milliseconds
    pub debounce_ms: u64,
    /// Raw records fetched per search subscription
    pub window: usize,
    /// Suggestions shown after filtering
    pub max_results: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 300,
            window: 50,
            max_results: 5,
        }
    }
}

impl SearchConfig {
    /// Controller timing for these settings
    #[must_use]
    pub fn debounce(&self) -> DebounceConfig {
        DebounceConfig::new(Duration::from_millis(self.debounce_ms), self.max_results)
    }
}

/// Payment link settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaymentConfig {
    /// Only `INR` is accepted
    pub currency: String,
    /// Wallets to build links for, in display order
    pub providers: Vec<UpiProvider>,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            currency: UPI_CURRENCY.to_string(),
            providers: UpiProvider::ALL.to_vec(),
        }
    }
}

/// Settings singleton location and bootstrap record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsConfig {
    /// Id of the settings document
    pub document_id: String,
    /// Written once if the document does not exist
    pub defaults: StoreProfile,
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            document_id: "store".to_string(),
            defaults: StoreProfile::default(),
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorefrontConfig {
    /// Search suggestion timing
    pub search: SearchConfig,
    /// UPI link settings
    pub payment: PaymentConfig,
    /// Settings document and defaults
    pub settings: SettingsConfig,
}

impl StorefrontConfig {
    /// Load from a TOML file
    ///
    /// # Errors
    /// - `Io` if the file cannot be read
    /// - `Parse` / `Invalid` as for [`Self::from_toml_str`]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::io_error(path, e))?;
        let config = Self::from_toml_str(&text)?;
        tracing::info!("Loaded storefront config from {}", path.display());
        Ok(config)
    }

    /// Parse TOML text
    ///
    /// # Errors
    /// - `Parse` for malformed TOML
    /// - `Invalid` for values that parse but cannot be used
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges
    ///
    /// # Errors
    /// - `Invalid` naming the first bad value
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.search.window == 0 {
            return Err(ConfigError::Invalid("search.window must be positive".into()));
        }
        if self.search.max_results == 0 {
            return Err(ConfigError::Invalid("search.max_results must be positive".into()));
        }
        if self.payment.providers.is_empty() {
            return Err(ConfigError::Invalid("payment.providers must not be empty".into()));
        }
        if !self.payment.currency.eq_ignore_ascii_case(UPI_CURRENCY) {
            return Err(ConfigError::Invalid(format!(
                "payment.currency {} is not supported",
                self.payment.currency
            )));
        }
        if self.settings.document_id.trim().is_empty() {
            return Err(ConfigError::Invalid("settings.document_id must not be empty".into()));
        }
        Ok(())
    }

    /// Builder: set search tuning
    #[must_use]
    pub fn with_search(mut self, search: SearchConfig) -> Self {
        self.search = search;
        self
    }

    /// Builder: set payment providers
    #[must_use]
    pub fn with_providers(mut self, providers: Vec<UpiProvider>) -> Self {
        self.payment.providers = providers;
        self
    }

    /// Builder: set settings defaults
    #[must_use]
    pub fn with_default_settings(mut self, defaults: StoreProfile) -> Self {
        self.settings.defaults = defaults;
        self
    }
}
