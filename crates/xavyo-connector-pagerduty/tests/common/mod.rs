//! Common test utilities for xavyo-connector-pagerduty integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use xavyo_connector_pagerduty::{
    ApiError, Page, PagerDutyApi, Reference, Schedule, Team, TeamMember, User,
};

/// An on-call shift used by the mock to answer window queries.
#[derive(Debug, Clone)]
pub struct Shift {
    pub user: User,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// In-memory [`PagerDutyApi`] implementation with honest offset pagination,
/// one-shot failure injection, and call recording.
#[derive(Default)]
pub struct MockApi {
    users: Vec<User>,
    teams: Vec<Team>,
    members: HashMap<String, Vec<TeamMember>>,
    schedules: Vec<Schedule>,
    shifts: HashMap<String, Vec<Shift>>,

    /// Operation name that should fail on its next invocation.
    fail_next: Mutex<Option<String>>,
    /// Every operation invoked, in order.
    pub calls: Mutex<Vec<String>>,
    /// Team membership mutations, as `add`/`remove` records.
    pub mutations: Mutex<Vec<String>>,
    /// `(since, until)` windows received by on-call queries.
    pub on_call_windows: Mutex<Vec<(String, String)>>,
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users(mut self, users: Vec<User>) -> Self {
        self.users = users;
        self
    }

    pub fn with_teams(mut self, teams: Vec<Team>) -> Self {
        self.teams = teams;
        self
    }

    pub fn with_members(mut self, team_id: &str, members: Vec<TeamMember>) -> Self {
        self.members.insert(team_id.to_string(), members);
        self
    }

    pub fn with_schedules(mut self, schedules: Vec<Schedule>) -> Self {
        self.schedules = schedules;
        self
    }

    pub fn with_shifts(mut self, schedule_id: &str, shifts: Vec<Shift>) -> Self {
        self.shifts.insert(schedule_id.to_string(), shifts);
        self
    }

    /// Make the named operation fail on its next invocation.
    pub fn fail_next(&self, operation: &str) {
        *self.fail_next.lock().unwrap() = Some(operation.to_string());
    }

    /// Number of recorded invocations of one operation.
    pub fn call_count(&self, operation: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.as_str() == operation)
            .count()
    }

    fn record(&self, operation: &str) -> Result<(), ApiError> {
        self.calls.lock().unwrap().push(operation.to_string());

        let mut fail = self.fail_next.lock().unwrap();
        if fail.as_deref() == Some(operation) {
            *fail = None;
            return Err(ApiError::Api {
                status: 503,
                message: format!("injected failure for {operation}"),
            });
        }

        Ok(())
    }
}

/// Slice one page out of a listing, honoring offset and limit.
fn page_of<T: Clone>(items: &[T], offset: u32, limit: u32) -> Page<T> {
    let offset = offset as usize;
    let end = (offset + limit as usize).min(items.len());
    let page = if offset >= items.len() {
        Vec::new()
    } else {
        items[offset..end].to_vec()
    };

    Page {
        items: page,
        more: end < items.len(),
    }
}

#[async_trait]
impl PagerDutyApi for MockApi {
    async fn list_users(&self, offset: u32, limit: u32) -> Result<Page<User>, ApiError> {
        self.record("list_users")?;
        Ok(page_of(&self.users, offset, limit))
    }

    async fn list_teams(&self, offset: u32, limit: u32) -> Result<Page<Team>, ApiError> {
        self.record("list_teams")?;
        Ok(page_of(&self.teams, offset, limit))
    }

    async fn list_team_members(
        &self,
        team_id: &str,
        offset: u32,
        limit: u32,
    ) -> Result<Page<TeamMember>, ApiError> {
        self.record("list_team_members")?;
        let members = self.members.get(team_id).cloned().unwrap_or_default();
        Ok(page_of(&members, offset, limit))
    }

    async fn list_schedules(&self, offset: u32, limit: u32) -> Result<Page<Schedule>, ApiError> {
        self.record("list_schedules")?;
        Ok(page_of(&self.schedules, offset, limit))
    }

    async fn get_user(&self, id: &str) -> Result<User, ApiError> {
        self.record("get_user")?;
        self.users
            .iter()
            .find(|u| u.id == id)
            .cloned()
            .ok_or_else(|| ApiError::Api {
                status: 404,
                message: format!("user {id} not found"),
            })
    }

    async fn get_current_user(&self) -> Result<User, ApiError> {
        self.record("get_current_user")?;
        self.users.first().cloned().ok_or_else(|| ApiError::Api {
            status: 404,
            message: "no current user".to_string(),
        })
    }

    async fn list_on_call_users(
        &self,
        schedule_id: &str,
        since: &str,
        until: &str,
    ) -> Result<Vec<User>, ApiError> {
        self.record("list_on_call_users")?;
        self.on_call_windows
            .lock()
            .unwrap()
            .push((since.to_string(), until.to_string()));

        let since: DateTime<Utc> = since.parse().map_err(|_| ApiError::Api {
            status: 400,
            message: "bad since".to_string(),
        })?;
        let until: DateTime<Utc> = until.parse().map_err(|_| ApiError::Api {
            status: 400,
            message: "bad until".to_string(),
        })?;

        let on_call = self
            .shifts
            .get(schedule_id)
            .map(|shifts| {
                shifts
                    .iter()
                    .filter(|s| s.end > since && s.start < until)
                    .map(|s| s.user.clone())
                    .collect()
            })
            .unwrap_or_default();

        Ok(on_call)
    }

    async fn add_team_member(
        &self,
        team_id: &str,
        user_id: &str,
        role: &str,
    ) -> Result<(), ApiError> {
        self.record("add_team_member")?;
        self.mutations
            .lock()
            .unwrap()
            .push(format!("add:{team_id}:{user_id}:{role}"));
        Ok(())
    }

    async fn remove_team_member(&self, team_id: &str, user_id: &str) -> Result<(), ApiError> {
        self.record("remove_team_member")?;
        self.mutations
            .lock()
            .unwrap()
            .push(format!("remove:{team_id}:{user_id}"));
        Ok(())
    }
}

// Fixture factories

pub fn user(id: &str, name: &str, role: &str) -> User {
    User {
        id: id.to_string(),
        name: name.to_string(),
        email: format!("{}@example.com", id.to_lowercase()),
        role: role.to_string(),
    }
}

pub fn team(id: &str, name: &str) -> Team {
    Team {
        id: id.to_string(),
        name: name.to_string(),
        description: None,
    }
}

pub fn member(user_id: &str, role: &str) -> TeamMember {
    TeamMember {
        user: Reference {
            id: user_id.to_string(),
            ref_type: "user_reference".to_string(),
            summary: None,
        },
        role: role.to_string(),
    }
}

pub fn schedule(id: &str, name: &str, user_ids: &[&str], team_ids: &[&str]) -> Schedule {
    Schedule {
        id: id.to_string(),
        name: name.to_string(),
        schedule_type: "schedule".to_string(),
        users: user_ids
            .iter()
            .map(|id| Reference {
                id: (*id).to_string(),
                ref_type: "user_reference".to_string(),
                summary: None,
            })
            .collect(),
        teams: team_ids
            .iter()
            .map(|id| Reference {
                id: (*id).to_string(),
                ref_type: "team_reference".to_string(),
                summary: None,
            })
            .collect(),
    }
}
