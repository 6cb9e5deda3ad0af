//! # Sync Framework
//!
//! Core abstractions for pulling external identity systems into the xavyo
//! identity graph as resources, entitlements, and grants.
//!
//! The host drives a [`ResourceSyncer`](traits::ResourceSyncer) one page at
//! a time: every `list` or `grants` call advances one upstream page and
//! hands back an opaque continuation token, and the host keeps calling with
//! that token until it comes back empty. Pagination state lives in the
//! token ([`pagination::Bag`]); anything a syncer accumulates across calls
//! lives on the syncer instance itself.
//!
//! ## Crate Organization
//!
//! - [`error`] - Error types with transient/permanent classification
//! - [`pagination`] - Continuation token codec (`Bag`, `PageState`)
//! - [`resource`] - Resource/entitlement/grant model
//! - [`traits`] - Syncer and connector capability traits

pub mod error;
pub mod pagination;
pub mod resource;
pub mod traits;

/// Prelude module for convenient imports.
///
/// ```
/// use xavyo_sync::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{SyncError, SyncResult};

    pub use crate::pagination::{parse_page_token, Bag, PageState};

    pub use crate::resource::{
        entitlement_id, parse_entitlement_id, Entitlement, EntitlementPurpose, Grant, Resource,
        ResourceId, ResourceTrait, ResourceType,
    };

    pub use crate::traits::{Connector, ConnectorMetadata, ProvisioningOp, ResourceSyncer};
}

// Re-export async_trait for syncer implementors
pub use async_trait::async_trait;
