//! User resource synchronization.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Map};
use tracing::instrument;
use xavyo_sync::error::{SyncError, SyncResult};
use xavyo_sync::pagination::{parse_page_token, PageState};
use xavyo_sync::resource::{
    Entitlement, Grant, Resource, ResourceId, ResourceTrait, ResourceType,
};
use xavyo_sync::traits::ResourceSyncer;

use crate::client::{PagerDutyApi, User};

/// The `user` resource type.
pub fn user_resource_type() -> ResourceType {
    ResourceType::new("user", "User", vec![ResourceTrait::User])
}

/// Build a user resource from an upstream user record.
pub(crate) fn user_resource(user: &User) -> Resource {
    let mut names = user.name.splitn(2, ' ');
    let first_name = names.next().unwrap_or_default();
    let last_name = names.next().unwrap_or_default();

    let mut profile = Map::new();
    profile.insert("first_name".to_string(), json!(first_name));
    profile.insert("last_name".to_string(), json!(last_name));
    profile.insert("login".to_string(), json!(user.email));
    profile.insert("user_id".to_string(), json!(user.id));
    profile.insert("email".to_string(), json!(user.email));

    Resource::new(&user_resource_type(), &user.id, &user.name, ResourceTrait::User)
        .with_profile(profile)
}

/// Syncer for the primary user listing. Users define no entitlements and
/// receive grants through teams, roles, and schedules instead.
pub struct UserSyncer {
    client: Arc<dyn PagerDutyApi>,
    resource_type: ResourceType,
    page_size: u32,
}

impl UserSyncer {
    /// Create a user syncer.
    pub fn new(client: Arc<dyn PagerDutyApi>, page_size: u32) -> Self {
        Self {
            client,
            resource_type: user_resource_type(),
            page_size,
        }
    }
}

#[async_trait]
impl ResourceSyncer for UserSyncer {
    fn resource_type(&self) -> &ResourceType {
        &self.resource_type
    }

    #[instrument(skip(self))]
    async fn list(
        &self,
        _parent: Option<&ResourceId>,
        token: &str,
    ) -> SyncResult<(Vec<Resource>, String)> {
        let (mut bag, offset) = parse_page_token(token, PageState::new(&self.resource_type.id, ""))?;

        let page = self
            .client
            .list_users(offset, self.page_size)
            .await
            .map_err(|e| SyncError::upstream("list_users", e))?;

        let resources = page.items.iter().map(user_resource).collect();

        let next_token = if page.more {
            bag.next_token((offset + self.page_size).to_string())?
        } else {
            String::new()
        };

        Ok((resources, next_token))
    }

    async fn entitlements(&self, _resource: &Resource) -> SyncResult<Vec<Entitlement>> {
        Ok(Vec::new())
    }

    async fn grants(
        &mut self,
        _resource: &Resource,
        _token: &str,
    ) -> SyncResult<(Vec<Grant>, String)> {
        Ok((Vec::new(), String::new()))
    }
}
