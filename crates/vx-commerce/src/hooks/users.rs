//! User directory for admins

use super::{patch_record, require_principal};
use crate::error::{CommerceError, CommerceResult};
use crate::records::{Role, UserProfile};
use serde::Serialize;
use vx_binding::{Binder, BindingState, Gate, LiveBinding, Record};
use vx_gateway::{Direction, DocumentId, QueryDescriptor};

#[derive(Serialize)]
struct RoleUpdate {
    role: Role,
}

/// Live list of registered users
#[derive(Debug)]
pub struct UserDirectory {
    binder: Binder,
    live: LiveBinding<Vec<UserProfile>>,
}

impl UserDirectory {
    /// Open the user list; stays unauthenticated until someone signs in
    #[must_use]
    pub fn open(binder: &Binder) -> Self {
        let query = QueryDescriptor::collection(UserProfile::COLLECTION)
            .order_by("createdAt", Direction::Descending);
        Self {
            binder: binder.clone(),
            live: binder.live_collection(query, Gate::Authenticated),
        }
    }

    /// Current binding state
    #[must_use]
    pub fn state(&self) -> BindingState<Vec<UserProfile>> {
        self.live.state()
    }

    /// Users in the latest snapshot
    #[must_use]
    pub fn users(&self) -> Vec<UserProfile> {
        self.live.data().unwrap_or_default()
    }

    /// Users with the admin role
    #[must_use]
    pub fn admins(&self) -> Vec<UserProfile> {
        self.users().into_iter().filter(UserProfile::is_admin).collect()
    }

    /// Underlying live binding
    #[must_use]
    pub fn binding(&self) -> &LiveBinding<Vec<UserProfile>> {
        &self.live
    }

    /// Change a user's role
    ///
    /// Admins cannot demote themselves.
    ///
    /// # Errors
    /// - `Unauthenticated`, `Validation` or `Gateway`
    pub async fn set_role(&self, uid: &DocumentId, role: Role) -> CommerceResult<()> {
        let principal = require_principal(&self.binder)?;
        if principal.uid == uid.as_str() && role != Role::Admin {
            return Err(CommerceError::invalid("you cannot remove your own admin role"));
        }
        tracing::info!("{} sets role of {} to {:?}", principal.uid, uid, role);
        patch_record::<UserProfile>(self.binder.gateway().as_ref(), uid, &RoleUpdate { role }).await
    }

    /// Stop listening
    pub fn close(&self) {
        self.live.dispose();
    }
}
