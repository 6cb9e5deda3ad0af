//! PagerDuty Connector for xavyo
//!
//! This crate implements the xavyo-sync traits for PagerDuty, pulling users,
//! teams, schedules, and roles into the identity graph as resources,
//! entitlements, and grants.
//!
//! # Features
//!
//! - Offset-paginated user, team, and schedule listings, resumable through
//!   opaque continuation tokens
//! - Role grant aggregation across teams, team memberships, and users, one
//!   upstream page per call
//! - Schedule membership and live on-call grants
//! - Team membership provisioning (grant/revoke)
//!
//! # Example
//!
//! ```no_run
//! use xavyo_sync::traits::{Connector, ResourceSyncer};
//! use xavyo_connector_pagerduty::{PagerDuty, PagerDutyConfig, PagerDutyCredentials};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = PagerDutyConfig::default();
//! let credentials = PagerDutyCredentials::new("your-access-token");
//!
//! let connector = PagerDuty::new(&config, credentials)?;
//! connector.validate().await?;
//!
//! for syncer in connector.resource_syncers() {
//!     let (resources, _token) = syncer.list(None, "").await?;
//!     println!("{}: {} resources", syncer.resource_type().id, resources.len());
//! }
//! # Ok(())
//! # }
//! ```

mod client;
mod config;
mod connector;
mod roles;
mod schedules;
mod teams;
mod text;
mod users;

// Re-exports
pub use client::{ApiError, Page, PagerDutyApi, Reference, RestClient, Schedule, Team, TeamMember, User};
pub use config::{PagerDutyConfig, PagerDutyCredentials, DEFAULT_API_BASE, DEFAULT_PAGE_SIZE};
pub use connector::PagerDuty;
pub use roles::{role_resource_type, GrantsProgress, RoleSyncer};
pub use schedules::{schedule_resource_type, ScheduleSyncer};
pub use teams::{team_resource_type, TeamSyncer};
pub use users::{user_resource_type, UserSyncer};
