//! Identity-graph resource model.
//!
//! Resources, entitlements, and grants are the output records the host
//! consumes. Builders here are pure constructors with no side effects; the
//! sync engine treats the model as opaque.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{SyncError, SyncResult};

/// Trait kind carried by a resource type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceTrait {
    /// A human or service account.
    User,
    /// A collection of users (team, schedule).
    Group,
    /// A role assignable to users.
    Role,
}

/// A type of resource exposed by a connector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceType {
    /// Stable identifier, e.g. `user`, `team`.
    pub id: String,
    /// Human readable name.
    pub display_name: String,
    /// Traits describing how the host should treat this type.
    pub traits: Vec<ResourceTrait>,
}

impl ResourceType {
    /// Create a resource type.
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        traits: Vec<ResourceTrait>,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            traits,
        }
    }
}

/// Fully qualified identifier of one resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceId {
    /// The resource type id.
    pub resource_type: String,
    /// The resource id within that type.
    pub resource: String,
}

impl ResourceId {
    /// Create a resource id.
    pub fn new(resource_type: impl Into<String>, resource: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            resource: resource.into(),
        }
    }
}

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.resource_type, self.resource)
    }
}

/// One synced resource with its descriptive profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    /// Fully qualified identifier.
    pub id: ResourceId,
    /// Human readable name.
    pub display_name: String,
    /// Trait kind of this resource.
    pub resource_trait: ResourceTrait,
    /// Free-form descriptive attributes.
    pub profile: Map<String, Value>,
}

impl Resource {
    /// Create a resource of the given type.
    pub fn new(
        resource_type: &ResourceType,
        resource_id: impl Into<String>,
        display_name: impl Into<String>,
        resource_trait: ResourceTrait,
    ) -> Self {
        Self {
            id: ResourceId::new(resource_type.id.clone(), resource_id),
            display_name: display_name.into(),
            resource_trait,
            profile: Map::new(),
        }
    }

    /// Attach a profile, replacing any existing one.
    #[must_use]
    pub fn with_profile(mut self, profile: Map<String, Value>) -> Self {
        self.profile = profile;
        self
    }

    /// Read a string value out of the profile.
    pub fn profile_string(&self, key: &str) -> SyncResult<&str> {
        self.profile
            .get(key)
            .and_then(Value::as_str)
            .ok_or_else(|| SyncError::MissingProfileValue {
                key: key.to_string(),
            })
    }

    /// Read a string array out of the profile.
    pub fn profile_string_array(&self, key: &str) -> SyncResult<Vec<String>> {
        let values = self.profile.get(key).and_then(Value::as_array).ok_or_else(|| {
            SyncError::MissingProfileValue {
                key: key.to_string(),
            }
        })?;

        Ok(values
            .iter()
            .filter_map(Value::as_str)
            .map(String::from)
            .collect())
    }
}

/// How an entitlement relates principals to a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntitlementPurpose {
    /// Membership-style assignment.
    Assignment,
    /// Capability within the resource.
    Permission,
}

/// An entitlement on a resource that principals can be granted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entitlement {
    /// Composite id `<resource_type>:<resource_id>:<slug>`.
    pub id: String,
    /// The resource this entitlement belongs to.
    pub resource: ResourceId,
    /// Entitlement slug, unique within the resource.
    pub slug: String,
    /// Whether this is an assignment or a permission.
    pub purpose: EntitlementPurpose,
    /// Human readable name.
    pub display_name: String,
    /// Human readable description.
    pub description: String,
    /// Resource type ids this entitlement can be granted to.
    pub grantable_to: Vec<String>,
}

impl Entitlement {
    fn new(
        resource: &Resource,
        slug: impl Into<String>,
        purpose: EntitlementPurpose,
        display_name: impl Into<String>,
        description: impl Into<String>,
        grantable_to: Vec<String>,
    ) -> Self {
        let slug = slug.into();
        Self {
            id: entitlement_id(&resource.id, &slug),
            resource: resource.id.clone(),
            slug,
            purpose,
            display_name: display_name.into(),
            description: description.into(),
            grantable_to,
        }
    }

    /// Create an assignment entitlement.
    pub fn assignment(
        resource: &Resource,
        slug: impl Into<String>,
        display_name: impl Into<String>,
        description: impl Into<String>,
        grantable_to: Vec<String>,
    ) -> Self {
        Self::new(
            resource,
            slug,
            EntitlementPurpose::Assignment,
            display_name,
            description,
            grantable_to,
        )
    }

    /// Create a permission entitlement.
    pub fn permission(
        resource: &Resource,
        slug: impl Into<String>,
        display_name: impl Into<String>,
        description: impl Into<String>,
        grantable_to: Vec<String>,
    ) -> Self {
        Self::new(
            resource,
            slug,
            EntitlementPurpose::Permission,
            display_name,
            description,
            grantable_to,
        )
    }
}

/// Build the composite entitlement id for a resource and slug.
pub fn entitlement_id(resource: &ResourceId, slug: &str) -> String {
    format!("{}:{}:{}", resource.resource_type, resource.resource, slug)
}

/// Split a composite entitlement id into its resource type, resource id, and
/// entitlement id parts. Any arity other than three is a [`SyncError::MalformedId`].
pub fn parse_entitlement_id(id: &str) -> SyncResult<(&str, &str, &str)> {
    let mut parts = id.split(':');

    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(resource_type), Some(resource), Some(slug), None) => {
            Ok((resource_type, resource, slug))
        }
        _ => Err(SyncError::MalformedId { id: id.to_string() }),
    }
}

/// A resolved relationship between a principal and an entitlement on a
/// resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grant {
    /// Composite id of the granted entitlement.
    pub entitlement_id: String,
    /// The resource the entitlement belongs to.
    pub resource: ResourceId,
    /// Slug of the granted entitlement.
    pub slug: String,
    /// The principal receiving the grant.
    pub principal: ResourceId,
    /// Entitlement ids the host should expand this grant through
    /// (group-of-groups membership).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub expandable: Vec<String>,
}

impl Grant {
    /// Create a grant of `slug` on `resource` to `principal`.
    pub fn new(resource: &Resource, slug: impl Into<String>, principal: ResourceId) -> Self {
        let slug = slug.into();
        Self {
            entitlement_id: entitlement_id(&resource.id, &slug),
            resource: resource.id.clone(),
            slug,
            principal,
            expandable: Vec::new(),
        }
    }

    /// Mark this grant as expandable through the given entitlement ids.
    #[must_use]
    pub fn with_expandable(mut self, entitlement_ids: Vec<String>) -> Self {
        self.expandable = entitlement_ids;
        self
    }
}
