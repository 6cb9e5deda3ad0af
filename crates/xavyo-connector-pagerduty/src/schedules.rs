//! Schedule resource synchronization.
//!
//! Schedules carry two entitlement kinds populated by independent paths in
//! one grants call: `member` comes from the user and team ids stored on the
//! schedule's profile at list time, and `on-call` comes from a live query of
//! who is on call in the next hour.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, SecondsFormat, Utc};
use serde_json::{json, Map, Value};
use tracing::instrument;
use xavyo_sync::error::{SyncError, SyncResult};
use xavyo_sync::pagination::{parse_page_token, PageState};
use xavyo_sync::resource::{
    entitlement_id, Entitlement, Grant, Resource, ResourceId, ResourceTrait, ResourceType,
};
use xavyo_sync::traits::ResourceSyncer;

use crate::client::{PagerDutyApi, Reference, Schedule};
use crate::teams::{team_resource_type, TEAM_ROLE_MEMBER};
use crate::text::title_case;
use crate::users::user_resource_type;

const SCHEDULE_MEMBER: &str = "member";
const SCHEDULE_ON_CALL: &str = "on-call";

/// How far ahead of now the on-call query looks. PagerDuty only accepts UTC
/// timestamps here.
const ON_CALL_LOOKAHEAD_HOURS: i64 = 1;

/// The `schedule` resource type.
pub fn schedule_resource_type() -> ResourceType {
    ResourceType::new("schedule", "Schedule", vec![ResourceTrait::Group])
}

fn reference_ids(references: &[Reference]) -> Value {
    json!(references.iter().map(|r| r.id.clone()).collect::<Vec<_>>())
}

/// Build a group resource from an upstream schedule record. The member and
/// team ids are stored on the profile so the grants call can read them back
/// without refetching the schedule.
pub(crate) fn schedule_resource(schedule: &Schedule) -> Resource {
    let display_name = title_case(&format!("{}-{}", schedule.schedule_type, schedule.name));

    let mut profile = Map::new();
    profile.insert("schedule_id".to_string(), json!(schedule.id));
    profile.insert("schedule_name".to_string(), json!(display_name));
    profile.insert("schedule_users".to_string(), reference_ids(&schedule.users));
    profile.insert("schedule_teams".to_string(), reference_ids(&schedule.teams));

    Resource::new(
        &schedule_resource_type(),
        &schedule.id,
        &display_name,
        ResourceTrait::Group,
    )
    .with_profile(profile)
}

/// Syncer for schedules, their members, and their current on-call users.
pub struct ScheduleSyncer {
    client: Arc<dyn PagerDutyApi>,
    resource_type: ResourceType,
    page_size: u32,
}

impl ScheduleSyncer {
    /// Create a schedule syncer.
    pub fn new(client: Arc<dyn PagerDutyApi>, page_size: u32) -> Self {
        Self {
            client,
            resource_type: schedule_resource_type(),
            page_size,
        }
    }
}

#[async_trait]
impl ResourceSyncer for ScheduleSyncer {
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
            .list_schedules(offset, self.page_size)
            .await
            .map_err(|e| SyncError::upstream("list_schedules", e))?;

        let resources = page.items.iter().map(schedule_resource).collect();

        let next_token = if page.more {
            bag.next_token((offset + self.page_size).to_string())?
        } else {
            String::new()
        };

        Ok((resources, next_token))
    }

    async fn entitlements(&self, resource: &Resource) -> SyncResult<Vec<Entitlement>> {
        let user_type = user_resource_type().id;
        let team_type = team_resource_type().id;

        Ok(vec![
            Entitlement::assignment(
                resource,
                SCHEDULE_MEMBER,
                format!("{} schedule {}", resource.display_name, SCHEDULE_MEMBER),
                format!(
                    "{} PagerDuty schedule {}",
                    resource.display_name, SCHEDULE_MEMBER
                ),
                vec![user_type.clone(), team_type],
            ),
            Entitlement::assignment(
                resource,
                SCHEDULE_ON_CALL,
                format!("{} schedule {}", resource.display_name, SCHEDULE_ON_CALL),
                format!(
                    "{} PagerDuty schedule {}",
                    resource.display_name, SCHEDULE_ON_CALL
                ),
                vec![user_type],
            ),
        ])
    }

    /// Not token-paginated: membership grants come from the profile, on-call
    /// grants from a live one-hour lookahead query, both in this one call.
    #[instrument(skip(self, resource), fields(schedule = %resource.id))]
    async fn grants(
        &mut self,
        resource: &Resource,
        _token: &str,
    ) -> SyncResult<(Vec<Grant>, String)> {
        let user_ids = resource.profile_string_array("schedule_users")?;
        let team_ids = resource.profile_string_array("schedule_teams")?;

        let user_type = user_resource_type().id;
        let team_type = team_resource_type().id;

        let mut grants = Vec::new();

        for user_id in user_ids {
            grants.push(Grant::new(
                resource,
                SCHEDULE_MEMBER,
                ResourceId::new(&user_type, user_id),
            ));
        }

        for team_id in team_ids {
            let team = ResourceId::new(&team_type, &team_id);
            let expand_through = entitlement_id(&team, TEAM_ROLE_MEMBER);
            grants.push(
                Grant::new(resource, SCHEDULE_MEMBER, team).with_expandable(vec![expand_through]),
            );
        }

        let now = Utc::now();
        let until = now + Duration::hours(ON_CALL_LOOKAHEAD_HOURS);

        let on_call = self
            .client
            .list_on_call_users(
                &resource.id.resource,
                &now.to_rfc3339_opts(SecondsFormat::Secs, true),
                &until.to_rfc3339_opts(SecondsFormat::Secs, true),
            )
            .await
            .map_err(|e| SyncError::upstream("list_on_call_users", e))?;

        for user in on_call {
            grants.push(Grant::new(
                resource,
                SCHEDULE_ON_CALL,
                ResourceId::new(&user_type, user.id),
            ));
        }

        Ok((grants, String::new()))
    }
}
