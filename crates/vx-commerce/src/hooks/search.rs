//! Product search suggestions
//!
//! Fetches a bounded window of products and filters it client-side by
//! case-insensitive name substring. There is no ranking and products past
//! the window are never suggested.

use crate::config::SearchConfig;
use crate::records::Product;
use tokio::sync::watch;
use vx_binding::{Binder, DebouncedQuery, QueryPhase, Record, SuggestionState};
use vx_gateway::QueryDescriptor;

/// Debounced suggestions for a search box
#[derive(Debug)]
pub struct SearchSuggestions {
    query: DebouncedQuery<Product>,
}

impl SearchSuggestions {
    /// Create the suggestion controller
    #[must_use]
    pub fn new(binder: &Binder, config: &SearchConfig) -> Self {
        let window = config.window;
        let query = DebouncedQuery::new(
            binder.clone(),
            move |_needle: &str| QueryDescriptor::collection(Product::COLLECTION).limit(window),
            |product: &Product, needle: &str| {
                product.is_active && product.name.to_lowercase().contains(needle)
            },
            config.debounce(),
        );
        Self { query }
    }

    /// Feed the search box text
    pub fn set_query(&self, text: &str) {
        self.query.set_query(text);
    }

    /// Clear input and drop the subscription
    pub fn clear(&self) {
        self.query.clear();
    }

    /// Latest suggestions
    #[must_use]
    pub fn state(&self) -> SuggestionState<Product> {
        self.query.state()
    }

    /// Current matches, empty unless some were delivered
    #[must_use]
    pub fn suggestions(&self) -> Vec<Product> {
        self.state().matches().map(<[Product]>::to_vec).unwrap_or_default()
    }

    /// Receiver for suggestion changes
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<SuggestionState<Product>> {
        self.query.watch()
    }

    /// Current controller phase
    #[must_use]
    pub fn phase(&self) -> QueryPhase {
        self.query.phase()
    }
}
