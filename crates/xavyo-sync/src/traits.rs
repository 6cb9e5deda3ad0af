//! Sync framework traits
//!
//! Capability-based trait definitions for resource syncers. The host drives
//! a syncer by calling `list` and `grants` repeatedly, feeding back each
//! returned continuation token, until it receives an empty token.

use async_trait::async_trait;

use crate::error::SyncResult;
use crate::resource::{Entitlement, Grant, Resource, ResourceId, ResourceType};

/// Descriptive metadata about a connector.
#[derive(Debug, Clone)]
pub struct ConnectorMetadata {
    /// Human readable connector name.
    pub display_name: String,
    /// Short description of what the connector syncs.
    pub description: String,
}

/// One resource type's sync surface.
///
/// A syncer may keep per-pass state between calls (the role syncer
/// accumulates role membership maps across phases), which is why `grants`
/// takes `&mut self`. The host must route every call for one resource
/// type's pass to the same syncer instance; a recreated instance restarts
/// the pass from the beginning, redoing pages but corrupting nothing.
#[async_trait]
pub trait ResourceSyncer: Send + Sync {
    /// The resource type this syncer produces.
    fn resource_type(&self) -> &ResourceType;

    /// List one page of resources.
    ///
    /// Returns the page and a continuation token; an empty token means the
    /// listing is complete.
    async fn list(
        &self,
        parent: Option<&ResourceId>,
        token: &str,
    ) -> SyncResult<(Vec<Resource>, String)>;

    /// Entitlements defined on one resource.
    async fn entitlements(&self, resource: &Resource) -> SyncResult<Vec<Entitlement>>;

    /// Compute one page of grants for one resource.
    ///
    /// Returns the grants and a continuation token; an empty token means the
    /// computation is complete.
    async fn grants(
        &mut self,
        resource: &Resource,
        token: &str,
    ) -> SyncResult<(Vec<Grant>, String)>;
}

/// Capability for provisioning entitlements in the upstream system.
#[async_trait]
pub trait ProvisioningOp: ResourceSyncer {
    /// Grant an entitlement to a principal upstream.
    ///
    /// Must fail with `UnsupportedPrincipal` before making any upstream
    /// mutation when the principal type cannot receive the entitlement.
    async fn grant(&self, entitlement: &Entitlement, principal: &ResourceId) -> SyncResult<()>;

    /// Revoke a previously issued grant upstream.
    async fn revoke(&self, grant: &Grant) -> SyncResult<()>;
}

/// A connector bundling the resource syncers for one upstream system.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Metadata about this connector.
    fn metadata(&self) -> ConnectorMetadata;

    /// Verify that the configured credentials are valid and sufficiently
    /// privileged.
    async fn validate(&self) -> SyncResult<()>;

    /// Fresh syncers for every resource type this connector exposes.
    fn resource_syncers(&self) -> Vec<Box<dyn ResourceSyncer>>;
}
