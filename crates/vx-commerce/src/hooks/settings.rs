//! Store settings singleton

use super::{patch_record, require_principal};
use crate::config::SettingsConfig;
use crate::error::{CommerceError, CommerceResult};
use crate::records::{SettingsPatch, StoreProfile, StoreSettings};
use chrono::{DateTime, Utc};
use serde::Serialize;
use vx_binding::{Binder, BindingState, Gate, LiveBinding, OnMissing, Record};
use vx_gateway::{to_fields, DocumentId, DocumentRef};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StampedPatch<'a> {
    #[serde(flatten)]
    patch: &'a SettingsPatch,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    updated_at: DateTime<Utc>,
}

/// Live settings document
///
/// The admin view bootstraps: if the document is missing on first signed-in
/// access, the configured defaults are written once and then delivered, so it
/// never reports a missing document.
#[derive(Debug)]
pub struct SettingsStore {
    binder: Binder,
    id: DocumentId,
    live: LiveBinding<StoreSettings>,
}

impl SettingsStore {
    /// Open the admin view, bootstrapping defaults
    ///
    /// # Errors
    /// - `Gateway` if the defaults cannot be encoded
    pub fn open(binder: &Binder, config: &SettingsConfig) -> CommerceResult<Self> {
        let defaults = to_fields(&config.defaults)?;
        Ok(Self::bind(
            binder,
            config,
            Gate::Authenticated,
            OnMissing::Initialize(defaults),
        ))
    }

    /// Open a public read-only view; a missing document reads as NotFound
    #[must_use]
    pub fn read_only(binder: &Binder, config: &SettingsConfig) -> Self {
        Self::bind(binder, config, Gate::Public, OnMissing::Report)
    }

    fn bind(binder: &Binder, config: &SettingsConfig, gate: Gate, on_missing: OnMissing) -> Self {
        let id = DocumentId::from(config.document_id.as_str());
        let reference = DocumentRef::new(StoreSettings::COLLECTION, id.clone());
        Self {
            binder: binder.clone(),
            id,
            live: binder.live_document(reference, gate, on_missing),
        }
    }

    /// Current binding state
    #[must_use]
    pub fn state(&self) -> BindingState<StoreSettings> {
        self.live.state()
    }

    /// Latest settings, if loaded
    #[must_use]
    pub fn settings(&self) -> Option<StoreSettings> {
        self.live.data()
    }

    /// Latest profile, or the built-in defaults until loaded
    #[must_use]
    pub fn profile(&self) -> StoreProfile {
        self.settings().map(|s| s.profile).unwrap_or_default()
    }

    /// Underlying live binding
    #[must_use]
    pub fn binding(&self) -> &LiveBinding<StoreSettings> {
        &self.live
    }

    /// Update settings fields
    ///
    /// # Errors
    /// - `Unauthenticated` when nobody is signed in
    /// - `Validation` for an empty patch or bad values
    /// - `Gateway` if the write fails
    pub async fn update(&self, patch: SettingsPatch) -> CommerceResult<()> {
        let principal = require_principal(&self.binder)?;
        if to_fields(&patch)?.is_empty() {
            return Err(CommerceError::invalid("nothing to update"));
        }
        if patch.delivery_fee.is_some_and(|fee| !fee.is_finite() || fee < 0.0) {
            return Err(CommerceError::invalid("delivery fee cannot be negative"));
        }
        if let Some(upi) = &patch.upi_id {
            if !crate::payment::is_valid_vpa(upi) {
                return Err(CommerceError::invalid(format!("invalid UPI id {upi}")));
            }
        }
        tracing::info!("Settings updated by {}", principal.uid);
        let stamped = StampedPatch {
            patch: &patch,
            updated_at: Utc::now(),
        };
        patch_record::<StoreSettings>(self.binder.gateway().as_ref(), &self.id, &stamped).await
    }

    /// Stop listening
    pub fn close(&self) {
        self.live.dispose();
    }
}
