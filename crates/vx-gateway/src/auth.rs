//! Authentication state provider
//!
//! The provider is external: this crate only needs "who is signed in right
//! now" and a push notification when that changes.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// Authenticated identity of the current session
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Principal {
    /// Stable user identifier
    pub uid: String,
    /// Email, when the provider has one
    pub email: Option<String>,
}

impl Principal {
    /// Create new principal
    #[inline]
    #[must_use]
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            email: None,
        }
    }

    /// With email
    #[inline]
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

/// Source of the current principal
#[cfg_attr(test, mockall::automock)]
pub trait AuthProvider: Send + Sync + std::fmt::Debug {
    /// Current principal, if any
    fn current(&self) -> Option<Principal>;

    /// Receiver notified on every sign-in and sign-out
    fn watch(&self) -> watch::Receiver<Option<Principal>>;
}

/// In-process auth provider driven by explicit sign-in/sign-out calls
#[derive(Debug)]
pub struct MemoryAuth {
    state: watch::Sender<Option<Principal>>,
    // Serializes sign-in/out so watchers see changes in call order
    transitions: Mutex<()>,
}

impl MemoryAuth {
    /// Create provider with nobody signed in
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        let (state, _) = watch::channel(None);
        Self {
            state,
            transitions: Mutex::new(()),
        }
    }

    /// Create provider with a principal already signed in
    #[inline]
    #[must_use]
    pub fn signed_in(principal: Principal) -> Self {
        let auth = Self::new();
        auth.sign_in(principal);
        auth
    }

    /// Sign a principal in, replacing any current one
    pub fn sign_in(&self, principal: Principal) {
        let _guard = self.transitions.lock();
        tracing::info!("Principal signed in: {}", principal.uid);
        self.state.send_replace(Some(principal));
    }

    /// Sign the current principal out
    pub fn sign_out(&self) {
        let _guard = self.transitions.lock();
        if let Some(previous) = self.state.send_replace(None) {
            tracing::info!("Principal signed out: {}", previous.uid);
        }
    }
}

impl Default for MemoryAuth {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthProvider for MemoryAuth {
    fn current(&self) -> Option<Principal> {
        self.state.borrow().clone()
    }

    fn watch(&self) -> watch::Receiver<Option<Principal>> {
        self.state.subscribe()
    }
}
