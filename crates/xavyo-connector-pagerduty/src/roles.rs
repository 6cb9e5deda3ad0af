//! Role resource synchronization.
//!
//! Role grants cannot be read from a single upstream listing: account-level
//! roles live on the user records and team-level roles live on the team
//! membership records. The grants pass therefore aggregates three
//! independently paginated listings (teams, team memberships, users) into
//! role → member-id maps before projecting the requested role into grants.
//!
//! The pass is resumable. Each `grants` call advances exactly one upstream
//! page and suspends with a continuation token; the accumulated maps and
//! phase flags live on the syncer instance, so the host must route every
//! call of one pass to the same instance. A recreated instance restarts the
//! pass from the first phase, redoing pages but corrupting nothing.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Map};
use tracing::{debug, instrument};
use xavyo_sync::error::{SyncError, SyncResult};
use xavyo_sync::pagination::{parse_page_token, Bag, PageState};
use xavyo_sync::resource::{
    Entitlement, Grant, Resource, ResourceId, ResourceTrait, ResourceType,
};
use xavyo_sync::traits::ResourceSyncer;

use crate::client::PagerDutyApi;
use crate::text::title_case;
use crate::users::{user_resource, user_resource_type};

const ROLE_MEMBER: &str = "member";

const TEAM_ROLE_KIND: &str = "team";
const USER_ROLE_KIND: &str = "user";

/// Account-level roles: display name → role resource id. The ids match the
/// keys synthesized from the raw `role` field on user records.
const USER_ACCESS_ROLES: &[(&str, &str)] = &[
    ("owner", "user-owner"),
    ("admin", "user-admin"),
    ("observer", "user-observer"),
    ("responder", "user-limited_user"),
    ("manager", "user-user"),
    ("restricted_access", "user-restricted_access"),
];

/// Team-level roles: display name → role resource id. The ids match the
/// keys synthesized from the `role` field on team membership records.
const TEAM_ACCESS_ROLES: &[(&str, &str)] = &[
    ("observer", "team-observer"),
    ("responder", "team-responder"),
    ("manager", "team-manager"),
];

/// The `role` resource type.
pub fn role_resource_type() -> ResourceType {
    ResourceType::new("role", "Role", vec![ResourceTrait::Role])
}

/// Build a role resource. The role id doubles as the accumulator key looked
/// up when the grants pass completes.
fn role_resource(role_id: &str, role_name: &str, role_kind: &str) -> Resource {
    let display_name = title_case(&format!("{role_kind}-{role_name}"));

    let mut profile = Map::new();
    profile.insert("role_id".to_string(), json!(role_id));
    profile.insert("role_name".to_string(), json!(display_name));

    Resource::new(&role_resource_type(), role_id, &display_name, ResourceTrait::Role)
        .with_profile(profile)
}

/// Progress of one grants pass.
///
/// Phase flags are monotonic for the lifetime of a pass; the member maps
/// grow across calls and are only read once all three flags are set. None of
/// this state is encoded in the continuation token.
#[derive(Debug, Default)]
pub struct GrantsProgress {
    /// All team pages consumed.
    pub teams_mapped: bool,
    /// All membership pages of all teams consumed.
    pub team_members_mapped: bool,
    /// All user pages consumed.
    pub users_mapped: bool,

    /// Team ids accumulated by the first phase.
    pub team_ids: Vec<String>,
    /// Index of the team whose memberships are currently being paged.
    pub team_index: usize,

    /// `team-<role>` → member user ids.
    pub team_member_roles: BTreeMap<String, BTreeSet<String>>,
    /// `user-<role>` → user ids.
    pub user_roles: BTreeMap<String, BTreeSet<String>>,
}

impl GrantsProgress {
    /// Member ids for a role id, preferring the account-level map over the
    /// team-level map.
    fn members_of(&self, role_id: &str) -> Option<&BTreeSet<String>> {
        self.user_roles
            .get(role_id)
            .or_else(|| self.team_member_roles.get(role_id))
    }
}

/// Syncer for roles and their membership grants.
pub struct RoleSyncer {
    client: Arc<dyn PagerDutyApi>,
    resource_type: ResourceType,
    page_size: u32,
    progress: GrantsProgress,
}

impl RoleSyncer {
    /// Create a role syncer. One instance covers one grants pass.
    pub fn new(client: Arc<dyn PagerDutyApi>, page_size: u32) -> Self {
        Self {
            client,
            resource_type: role_resource_type(),
            page_size,
            progress: GrantsProgress::default(),
        }
    }

    /// Progress of the current grants pass.
    pub fn progress(&self) -> &GrantsProgress {
        &self.progress
    }

    fn suspend(bag: &mut Bag, offset: u32) -> SyncResult<(Vec<Grant>, String)> {
        let token = bag.next_token(offset.to_string())?;
        Ok((Vec::new(), token))
    }
}

#[async_trait]
impl ResourceSyncer for RoleSyncer {
    fn resource_type(&self) -> &ResourceType {
        &self.resource_type
    }

    /// All known roles are static; the listing never paginates.
    async fn list(
        &self,
        _parent: Option<&ResourceId>,
        _token: &str,
    ) -> SyncResult<(Vec<Resource>, String)> {
        let mut resources = Vec::with_capacity(USER_ACCESS_ROLES.len() + TEAM_ACCESS_ROLES.len());

        for (role_name, role_id) in USER_ACCESS_ROLES {
            resources.push(role_resource(role_id, role_name, USER_ROLE_KIND));
        }

        for (role_name, role_id) in TEAM_ACCESS_ROLES {
            resources.push(role_resource(role_id, role_name, TEAM_ROLE_KIND));
        }

        Ok((resources, String::new()))
    }

    async fn entitlements(&self, resource: &Resource) -> SyncResult<Vec<Entitlement>> {
        Ok(vec![Entitlement::assignment(
            resource,
            ROLE_MEMBER,
            format!("{} role", resource.display_name),
            format!("{} PagerDuty role", resource.display_name),
            vec![user_resource_type().id],
        )])
    }

    /// Advance the grants pass by one upstream page.
    ///
    /// Phases run strictly in order: teams, team memberships, users. Every
    /// call fetches one page and suspends with a continuation token, except
    /// the final user page, which completes the aggregation and projects the
    /// requested role into grants within the same call.
    #[instrument(skip(self, resource), fields(role = %resource.id))]
    async fn grants(
        &mut self,
        resource: &Resource,
        token: &str,
    ) -> SyncResult<(Vec<Grant>, String)> {
        let seed = PageState::new(&resource.id.resource_type, &resource.id.resource);
        let (mut bag, offset) = parse_page_token(token, seed)?;

        if !self.progress.teams_mapped {
            let page = self
                .client
                .list_teams(offset, self.page_size)
                .await
                .map_err(|e| SyncError::upstream("list_teams", e))?;

            self.progress
                .team_ids
                .extend(page.items.into_iter().map(|t| t.id));

            if page.more {
                return Self::suspend(&mut bag, offset + self.page_size);
            }

            self.progress.teams_mapped = true;
            if self.progress.team_ids.is_empty() {
                // No teams: the membership phase has nothing to page.
                self.progress.team_members_mapped = true;
            }
            debug!(teams = self.progress.team_ids.len(), "teams enumerated");
            return Self::suspend(&mut bag, 0);
        }

        if !self.progress.team_members_mapped {
            let team_id = self.progress.team_ids[self.progress.team_index].clone();
            let page = self
                .client
                .list_team_members(&team_id, offset, self.page_size)
                .await
                .map_err(|e| SyncError::upstream("list_team_members", e))?;

            for member in page.items {
                let key = format!("team-{}", member.role);
                self.progress
                    .team_member_roles
                    .entry(key)
                    .or_default()
                    .insert(member.user.id);
            }

            if page.more {
                return Self::suspend(&mut bag, offset + self.page_size);
            }

            self.progress.team_index += 1;
            if self.progress.team_index < self.progress.team_ids.len() {
                // Next team's memberships resume at offset 0 on the next
                // call rather than looping here, keeping one call's work
                // bounded to one page fetch.
                return Self::suspend(&mut bag, 0);
            }

            self.progress.team_members_mapped = true;
            debug!("team memberships enumerated");
            return Self::suspend(&mut bag, 0);
        }

        if !self.progress.users_mapped {
            let page = self
                .client
                .list_users(offset, self.page_size)
                .await
                .map_err(|e| SyncError::upstream("list_users", e))?;

            for user in page.items {
                let key = format!("user-{}", user.role);
                self.progress
                    .user_roles
                    .entry(key)
                    .or_default()
                    .insert(user.id);
            }

            if page.more {
                return Self::suspend(&mut bag, offset + self.page_size);
            }

            self.progress.users_mapped = true;
            debug!("users enumerated");
        }

        // Aggregation complete: project the requested role into grants. A
        // role absent from both maps yields zero grants, not an error.
        let role_id = resource.profile_string("role_id")?;

        let mut grants = Vec::new();
        if let Some(member_ids) = self.progress.members_of(role_id) {
            for member_id in member_ids {
                let user = self
                    .client
                    .get_user(member_id)
                    .await
                    .map_err(|e| SyncError::upstream("get_user", e))?;

                grants.push(Grant::new(resource, ROLE_MEMBER, user_resource(&user).id));
            }
        }

        Ok((grants, String::new()))
    }
}
