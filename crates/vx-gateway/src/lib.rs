//! VX Gateway - remote collaborators of the storefront data layer
//!
//! The binding layer talks to three external services through the traits in
//! this crate:
//! - [`DocumentGateway`]: collection-oriented document store with live queries
//! - [`AuthProvider`]: "current principal or none", with push notifications
//! - [`MediaUploader`]: file in, durable URL out
//!
//! In-process implementations ([`MemoryGateway`], [`MemoryAuth`],
//! [`MemoryMediaStore`]) back the tests and the demo binary.
//!
//! # Example
//!
//! ```rust,ignore
//! use vx_gateway::{DocumentGateway, ListenTarget, MemoryGateway, QueryDescriptor};
//! use futures::StreamExt;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let gateway = MemoryGateway::new();
//! let target = ListenTarget::Query(QueryDescriptor::collection("products").limit(50));
//! let mut channel = gateway.listen(&target)?;
//!
//! while let Some(snapshot) = channel.next().await {
//!     println!("{} products", snapshot?.len());
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod auth;
pub mod document;
pub mod error;
pub mod gateway;
pub mod media;
pub mod memory;
pub mod query;

pub use auth::{AuthProvider, MemoryAuth, Principal};
pub use document::{to_fields, Document, DocumentId, DocumentRef, Fields};
pub use error::{GatewayError, GatewayResult, UploadError};
pub use gateway::{DocumentGateway, SnapshotStream};
pub use media::{MediaUploader, MemoryMediaStore, ResourceType};
pub use memory::{GatewayStats, MemoryGateway};
pub use query::{Direction, Filter, FilterOp, ListenTarget, OrderBy, QueryDescriptor, RawSnapshot};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
