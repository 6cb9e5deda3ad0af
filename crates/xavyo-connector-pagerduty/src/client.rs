//! PagerDuty REST API client.
//!
//! The [`PagerDutyApi`] trait is the upstream boundary consumed by the
//! resource syncers; [`RestClient`] is the production implementation with
//! offset pagination, token auth, and bounded retry on transient statuses.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, instrument, warn};
use xavyo_sync::error::SyncResult;

use crate::config::{PagerDutyConfig, PagerDutyCredentials};

/// Error returned by the REST client.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success response from the API.
    #[error("API error: status {status} - {message}")]
    Api { status: u16, message: String },

    /// Transient statuses kept coming back until the retry budget ran out.
    #[error("retries exhausted after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },
}

impl ApiError {
    /// Build an API error from a response body, decoding PagerDuty's
    /// `{"error": {"message": ...}}` envelope when present.
    pub(crate) fn from_body(status: u16, body: &str) -> Self {
        #[derive(Deserialize)]
        struct Envelope {
            error: EnvelopeBody,
        }

        #[derive(Deserialize)]
        struct EnvelopeBody {
            message: String,
        }

        let message = serde_json::from_str::<Envelope>(body)
            .map(|e| e.error.message)
            .unwrap_or_else(|_| body.to_string());

        ApiError::Api { status, message }
    }
}

/// A PagerDuty user record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Upstream user id.
    pub id: String,
    /// Full name.
    pub name: String,
    /// Primary email address.
    #[serde(default)]
    pub email: String,
    /// Account-level role, e.g. `admin`, `limited_user`.
    #[serde(default)]
    pub role: String,
}

/// A PagerDuty team record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    /// Upstream team id.
    pub id: String,
    /// Team name.
    pub name: String,
    /// Team description.
    #[serde(default)]
    pub description: Option<String>,
}

/// A reference to another API object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reference {
    /// Referenced object id.
    pub id: String,
    /// Referenced object type, e.g. `user_reference`.
    #[serde(rename = "type", default)]
    pub ref_type: String,
    /// Short description of the referenced object.
    #[serde(default)]
    pub summary: Option<String>,
}

/// One team membership record: the member and their role on the team.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamMember {
    /// The member.
    pub user: Reference,
    /// The member's role on the team, e.g. `manager`.
    pub role: String,
}

/// A PagerDuty schedule record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schedule {
    /// Upstream schedule id.
    pub id: String,
    /// Schedule name.
    pub name: String,
    /// Schedule type, e.g. `schedule`.
    #[serde(rename = "type", default)]
    pub schedule_type: String,
    /// Users rotating through the schedule.
    #[serde(default)]
    pub users: Vec<Reference>,
    /// Teams associated with the schedule.
    #[serde(default)]
    pub teams: Vec<Reference>,
}

/// One page of an offset-paginated listing.
#[derive(Debug, Clone)]
pub struct Page<T> {
    /// Records in this page.
    pub items: Vec<T>,
    /// Whether more records exist past this page.
    pub more: bool,
}

/// Upstream listing and mutation calls consumed by the resource syncers.
///
/// All listings are offset paginated and surface PagerDuty's `more` flag
/// unchanged; the deadline for each call is the implementation's request
/// timeout.
#[async_trait]
pub trait PagerDutyApi: Send + Sync {
    /// List users a page at a time.
    async fn list_users(&self, offset: u32, limit: u32) -> Result<Page<User>, ApiError>;

    /// List teams a page at a time.
    async fn list_teams(&self, offset: u32, limit: u32) -> Result<Page<Team>, ApiError>;

    /// List one team's memberships a page at a time.
    async fn list_team_members(
        &self,
        team_id: &str,
        offset: u32,
        limit: u32,
    ) -> Result<Page<TeamMember>, ApiError>;

    /// List schedules a page at a time.
    async fn list_schedules(&self, offset: u32, limit: u32) -> Result<Page<Schedule>, ApiError>;

    /// Fetch one user by id.
    async fn get_user(&self, id: &str) -> Result<User, ApiError>;

    /// Fetch the user the access token belongs to.
    async fn get_current_user(&self) -> Result<User, ApiError>;

    /// List the users on call for a schedule within an RFC3339 window.
    async fn list_on_call_users(
        &self,
        schedule_id: &str,
        since: &str,
        until: &str,
    ) -> Result<Vec<User>, ApiError>;

    /// Add a user to a team with the given role.
    async fn add_team_member(
        &self,
        team_id: &str,
        user_id: &str,
        role: &str,
    ) -> Result<(), ApiError>;

    /// Remove a user from a team.
    async fn remove_team_member(&self, team_id: &str, user_id: &str) -> Result<(), ApiError>;
}

#[derive(Deserialize)]
struct UsersResponse {
    users: Vec<User>,
    #[serde(default)]
    more: bool,
}

#[derive(Deserialize)]
struct TeamsResponse {
    teams: Vec<Team>,
    #[serde(default)]
    more: bool,
}

#[derive(Deserialize)]
struct MembersResponse {
    members: Vec<TeamMember>,
    #[serde(default)]
    more: bool,
}

#[derive(Deserialize)]
struct SchedulesResponse {
    schedules: Vec<Schedule>,
    #[serde(default)]
    more: bool,
}

#[derive(Deserialize)]
struct UserResponse {
    user: User,
}

#[derive(Deserialize)]
struct OnCallUsersResponse {
    users: Vec<User>,
}

/// PagerDuty REST API client.
#[derive(Debug)]
pub struct RestClient {
    http: reqwest::Client,
    api_base: String,
    token: SecretString,
    max_retries: u32,
}

impl RestClient {
    /// Create a new client from configuration and credentials.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` when the configuration fails
    /// validation or the HTTP client cannot be created.
    pub fn new(config: &PagerDutyConfig, credentials: PagerDutyCredentials) -> SyncResult<Self> {
        config.validate()?;

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                xavyo_sync::error::SyncError::invalid_configuration(format!(
                    "failed to create HTTP client: {e}"
                ))
            })?;

        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            token: credentials.token,
            max_retries: 5,
        })
    }

    /// Performs a request with token auth and bounded retry on 429/5xx.
    async fn execute(
        &self,
        method: Method,
        url: &str,
        query: &[(&str, String)],
        body: Option<serde_json::Value>,
    ) -> Result<reqwest::Response, ApiError> {
        let mut retries = 0;
        let mut delay = Duration::from_secs(1);

        loop {
            let mut request = self
                .http
                .request(method.clone(), url)
                .header(
                    header::AUTHORIZATION,
                    format!("Token token={}", self.token.expose_secret()),
                )
                .header(header::ACCEPT, "application/vnd.pagerduty+json;version=2");

            if !query.is_empty() {
                request = request.query(query);
            }

            if let Some(ref b) = body {
                request = request.json(b);
            }

            let response = request.send().await?;
            let status = response.status();

            if matches!(
                status,
                StatusCode::TOO_MANY_REQUESTS
                    | StatusCode::BAD_GATEWAY
                    | StatusCode::SERVICE_UNAVAILABLE
                    | StatusCode::GATEWAY_TIMEOUT
            ) {
                if retries >= self.max_retries {
                    return Err(ApiError::RetriesExhausted { attempts: retries });
                }

                let wait = retry_after(&response).unwrap_or(delay);
                retries += 1;
                warn!(
                    "transient status {}, retry {}/{} after {:?}",
                    status, retries, self.max_retries, wait
                );
                tokio::time::sleep(wait).await;
                delay *= 2;
                continue;
            }

            if status.is_success() {
                return Ok(response);
            }

            let body_text = response.text().await.unwrap_or_default();
            return Err(ApiError::from_body(status.as_u16(), &body_text));
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        debug!("GET {}", url);
        let response = self.execute(Method::GET, url, query, None).await?;
        response.json().await.map_err(ApiError::from)
    }

    fn paging_query(offset: u32, limit: u32) -> [(&'static str, String); 2] {
        [("limit", limit.to_string()), ("offset", offset.to_string())]
    }
}

/// Parse a Retry-After header as a whole number of seconds.
fn retry_after(response: &reqwest::Response) -> Option<Duration> {
    response
        .headers()
        .get(header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

#[async_trait]
impl PagerDutyApi for RestClient {
    #[instrument(skip(self))]
    async fn list_users(&self, offset: u32, limit: u32) -> Result<Page<User>, ApiError> {
        let response: UsersResponse = self
            .get_json(
                &format!("{}/users", self.api_base),
                &Self::paging_query(offset, limit),
            )
            .await?;

        Ok(Page {
            items: response.users,
            more: response.more,
        })
    }

    #[instrument(skip(self))]
    async fn list_teams(&self, offset: u32, limit: u32) -> Result<Page<Team>, ApiError> {
        let response: TeamsResponse = self
            .get_json(
                &format!("{}/teams", self.api_base),
                &Self::paging_query(offset, limit),
            )
            .await?;

        Ok(Page {
            items: response.teams,
            more: response.more,
        })
    }

    #[instrument(skip(self))]
    async fn list_team_members(
        &self,
        team_id: &str,
        offset: u32,
        limit: u32,
    ) -> Result<Page<TeamMember>, ApiError> {
        let response: MembersResponse = self
            .get_json(
                &format!("{}/teams/{}/members", self.api_base, team_id),
                &Self::paging_query(offset, limit),
            )
            .await?;

        Ok(Page {
            items: response.members,
            more: response.more,
        })
    }

    #[instrument(skip(self))]
    async fn list_schedules(&self, offset: u32, limit: u32) -> Result<Page<Schedule>, ApiError> {
        let response: SchedulesResponse = self
            .get_json(
                &format!("{}/schedules", self.api_base),
                &Self::paging_query(offset, limit),
            )
            .await?;

        Ok(Page {
            items: response.schedules,
            more: response.more,
        })
    }

    #[instrument(skip(self))]
    async fn get_user(&self, id: &str) -> Result<User, ApiError> {
        let response: UserResponse = self
            .get_json(&format!("{}/users/{}", self.api_base, id), &[])
            .await?;

        Ok(response.user)
    }

    #[instrument(skip(self))]
    async fn get_current_user(&self) -> Result<User, ApiError> {
        let response: UserResponse = self
            .get_json(&format!("{}/users/me", self.api_base), &[])
            .await?;

        Ok(response.user)
    }

    #[instrument(skip(self))]
    async fn list_on_call_users(
        &self,
        schedule_id: &str,
        since: &str,
        until: &str,
    ) -> Result<Vec<User>, ApiError> {
        let response: OnCallUsersResponse = self
            .get_json(
                &format!("{}/schedules/{}/users", self.api_base, schedule_id),
                &[("since", since.to_string()), ("until", until.to_string())],
            )
            .await?;

        Ok(response.users)
    }

    #[instrument(skip(self))]
    async fn add_team_member(
        &self,
        team_id: &str,
        user_id: &str,
        role: &str,
    ) -> Result<(), ApiError> {
        self.execute(
            Method::PUT,
            &format!("{}/teams/{}/users/{}", self.api_base, team_id, user_id),
            &[],
            Some(json!({ "role": role })),
        )
        .await?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn remove_team_member(&self, team_id: &str, user_id: &str) -> Result<(), ApiError> {
        self.execute(
            Method::DELETE,
            &format!("{}/teams/{}/users/{}", self.api_base, team_id, user_id),
            &[],
            None,
        )
        .await?;

        Ok(())
    }
}
