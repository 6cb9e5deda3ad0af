//! Team resource synchronization and membership provisioning.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Map};
use tracing::instrument;
use xavyo_sync::error::{SyncError, SyncResult};
use xavyo_sync::pagination::{parse_page_token, PageState};
use xavyo_sync::resource::{
    parse_entitlement_id, Entitlement, Grant, Resource, ResourceId, ResourceTrait, ResourceType,
};
use xavyo_sync::traits::{ProvisioningOp, ResourceSyncer};

use crate::client::{PagerDutyApi, Team};
use crate::text::title_case;
use crate::users::user_resource;

pub(crate) const TEAM_ROLE_MEMBER: &str = "member";
const TEAM_ROLE_OBSERVER: &str = "observer";
const TEAM_ROLE_RESPONDER: &str = "responder";
const TEAM_ROLE_MANAGER: &str = "manager";

/// Roles a user can hold on a team, `member` being the implicit membership
/// assignment.
const TEAM_ACCESS_ROLES: &[&str] = &[
    TEAM_ROLE_MEMBER,
    TEAM_ROLE_OBSERVER,
    TEAM_ROLE_RESPONDER,
    TEAM_ROLE_MANAGER,
];

/// The `team` resource type.
pub fn team_resource_type() -> ResourceType {
    ResourceType::new("team", "Team", vec![ResourceTrait::Group])
}

/// Build a group resource from an upstream team record.
pub(crate) fn team_resource(team: &Team) -> Resource {
    let mut profile = Map::new();
    profile.insert("team_id".to_string(), json!(team.id));
    profile.insert("team_name".to_string(), json!(team.name));

    Resource::new(&team_resource_type(), &team.id, &team.name, ResourceTrait::Group)
        .with_profile(profile)
}

/// Syncer for teams and their memberships.
pub struct TeamSyncer {
    client: Arc<dyn PagerDutyApi>,
    resource_type: ResourceType,
    page_size: u32,
}

impl TeamSyncer {
    /// Create a team syncer.
    pub fn new(client: Arc<dyn PagerDutyApi>, page_size: u32) -> Self {
        Self {
            client,
            resource_type: team_resource_type(),
            page_size,
        }
    }
}

#[async_trait]
impl ResourceSyncer for TeamSyncer {
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
            .list_teams(offset, self.page_size)
            .await
            .map_err(|e| SyncError::upstream("list_teams", e))?;

        let resources = page.items.iter().map(team_resource).collect();

        let next_token = if page.more {
            bag.next_token((offset + self.page_size).to_string())?
        } else {
            String::new()
        };

        Ok((resources, next_token))
    }

    async fn entitlements(&self, resource: &Resource) -> SyncResult<Vec<Entitlement>> {
        let grantable_to = vec![crate::users::user_resource_type().id];

        let entitlements = TEAM_ACCESS_ROLES
            .iter()
            .map(|role| {
                let display_name =
                    format!("{} Team {}", resource.display_name, title_case(role));
                let description = format!("Team {} role in PagerDuty", resource.display_name);

                if *role == TEAM_ROLE_MEMBER {
                    Entitlement::assignment(
                        resource,
                        *role,
                        display_name,
                        description,
                        grantable_to.clone(),
                    )
                } else {
                    Entitlement::permission(
                        resource,
                        *role,
                        display_name,
                        description,
                        grantable_to.clone(),
                    )
                }
            })
            .collect();

        Ok(entitlements)
    }

    /// One membership page per call. Every membership record yields two
    /// grants: the member's role and the `member` assignment.
    #[instrument(skip(self, resource), fields(team = %resource.id))]
    async fn grants(
        &mut self,
        resource: &Resource,
        token: &str,
    ) -> SyncResult<(Vec<Grant>, String)> {
        let team_id = resource.profile_string("team_id")?.to_string();

        let seed = PageState::new(&resource.id.resource_type, &resource.id.resource);
        let (mut bag, offset) = parse_page_token(token, seed)?;

        let page = self
            .client
            .list_team_members(&team_id, offset, self.page_size)
            .await
            .map_err(|e| SyncError::upstream("list_team_members", e))?;

        let mut grants = Vec::with_capacity(page.items.len() * 2);
        for member in &page.items {
            if !TEAM_ACCESS_ROLES.contains(&member.role.as_str()) {
                return Err(SyncError::UnsupportedRole {
                    role: member.role.clone(),
                });
            }

            let user = self
                .client
                .get_user(&member.user.id)
                .await
                .map_err(|e| SyncError::upstream("get_user", e))?;
            let principal = user_resource(&user).id;

            grants.push(Grant::new(resource, member.role.clone(), principal.clone()));
            grants.push(Grant::new(resource, TEAM_ROLE_MEMBER, principal));
        }

        let next_token = if page.more {
            bag.next_token((offset + self.page_size).to_string())?
        } else {
            String::new()
        };

        Ok((grants, next_token))
    }
}

#[async_trait]
impl ProvisioningOp for TeamSyncer {
    #[instrument(skip(self, entitlement), fields(entitlement = %entitlement.id))]
    async fn grant(&self, entitlement: &Entitlement, principal: &ResourceId) -> SyncResult<()> {
        // Principal check comes first: no upstream mutation on a bad target.
        if principal.resource_type != "user" {
            return Err(SyncError::UnsupportedPrincipal {
                principal_type: principal.resource_type.clone(),
            });
        }

        let (_, team_id, role) = parse_entitlement_id(&entitlement.id)?;

        if !TEAM_ACCESS_ROLES.contains(&role) {
            return Err(SyncError::UnsupportedRole {
                role: role.to_string(),
            });
        }

        self.client
            .add_team_member(team_id, &principal.resource, role)
            .await
            .map_err(|e| SyncError::upstream("add_team_member", e))
    }

    #[instrument(skip(self, grant), fields(entitlement = %grant.entitlement_id))]
    async fn revoke(&self, grant: &Grant) -> SyncResult<()> {
        if grant.principal.resource_type != "user" {
            return Err(SyncError::UnsupportedPrincipal {
                principal_type: grant.principal.resource_type.clone(),
            });
        }

        let (_, team_id, _) = parse_entitlement_id(&grant.entitlement_id)?;

        self.client
            .remove_team_member(team_id, &grant.principal.resource)
            .await
            .map_err(|e| SyncError::upstream("remove_team_member", e))
    }
}
