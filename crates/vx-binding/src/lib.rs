//! VX Binding - live collection bindings
//!
//! Binds in-memory, observable result sets to remote collections and
//! documents, kept current by push updates:
//! - [`Binder`]: opens one channel per binding, maps documents to typed
//!   [`Record`]s and republishes every full snapshot
//! - [`Subscription`]: the channel as a resource; dispose is idempotent and
//!   silences callbacks synchronously
//! - [`LiveBinding`]: the loading / ready / unauthenticated / not-found /
//!   failed contract consumers render from
//! - [`DebouncedQuery`]: interactive search that waits for input to settle
//!   before replacing its subscription
//!
//! Snapshots *replace* state. There is no diffing anywhere in this crate and
//! consumers must not merge one snapshot into another.
//!
//! # Example
//!
//! ```rust,ignore
//! use vx_binding::{Binder, Gate};
//! use vx_gateway::{MemoryGateway, QueryDescriptor};
//! use std::sync::Arc;
//!
//! # async fn example() {
//! let binder = Binder::new(Arc::new(MemoryGateway::new()));
//! let products = binder.live_collection::<Product>(
//!     QueryDescriptor::collection("products"),
//!     Gate::Public,
//! );
//!
//! let state = products.wait_until(|s| !s.is_loading()).await;
//! println!("{}", state.label());
//! # }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod binder;
pub mod debounce;
pub mod error;
pub mod record;
pub mod sink;
pub mod state;
pub mod subscription;

pub use binder::{Binder, Gate, OnMissing};
pub use debounce::{DebounceConfig, DebouncedQuery, QueryPhase, SuggestionState, DEFAULT_QUIET_PERIOD};
pub use error::BindError;
pub use record::{decode_collection, decode_document, Record};
pub use sink::{FnSink, SnapshotSink};
pub use state::{BindingState, LiveBinding};
pub use subscription::{Subscription, SubscriptionId};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with bindings
    pub use crate::{
        BindError, Binder, BindingState, DebouncedQuery, Gate, LiveBinding, OnMissing, Record,
        SnapshotSink, Subscription, SuggestionState,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
