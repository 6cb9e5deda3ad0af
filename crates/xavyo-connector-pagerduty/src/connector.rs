//! The PagerDuty connector.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::instrument;
use xavyo_sync::error::{SyncError, SyncResult};
use xavyo_sync::traits::{Connector, ConnectorMetadata, ResourceSyncer};

use crate::client::{PagerDutyApi, RestClient};
use crate::config::{PagerDutyConfig, PagerDutyCredentials};
use crate::roles::RoleSyncer;
use crate::schedules::ScheduleSyncer;
use crate::teams::TeamSyncer;
use crate::users::UserSyncer;

/// A user-scoped token with this role cannot read the account.
const RESTRICTED_ROLE: &str = "restricted_access";

/// Connector syncing PagerDuty users, teams, schedules, and roles into the
/// identity graph.
pub struct PagerDuty {
    client: Arc<dyn PagerDutyApi>,
    page_size: u32,
}

impl PagerDuty {
    /// Create a connector backed by the REST client.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` when the configuration is invalid.
    pub fn new(config: &PagerDutyConfig, credentials: PagerDutyCredentials) -> SyncResult<Self> {
        let client = RestClient::new(config, credentials)?;

        Ok(Self {
            client: Arc::new(client),
            page_size: config.page_size,
        })
    }

    /// Create a connector over an existing API implementation.
    pub fn with_client(client: Arc<dyn PagerDutyApi>, page_size: u32) -> Self {
        Self { client, page_size }
    }
}

#[async_trait]
impl Connector for PagerDuty {
    fn metadata(&self) -> ConnectorMetadata {
        ConnectorMetadata {
            display_name: "PagerDuty".to_string(),
            description: "Connector syncing PagerDuty users, teams, and their roles to the identity graph".to_string(),
        }
    }

    /// Verify the access token can list users and is not a restricted one.
    #[instrument(skip(self))]
    async fn validate(&self) -> SyncResult<()> {
        self.client
            .list_users(0, 1)
            .await
            .map_err(|_| SyncError::permission_denied("provided access token is invalid"))?;

        // A user-scoped token also reports the holder's role; restricted
        // tokens cannot see the full account.
        if let Ok(user) = self.client.get_current_user().await {
            if user.role == RESTRICTED_ROLE {
                return Err(SyncError::permission_denied(
                    "provided access token must be an admin token",
                ));
            }
        }

        Ok(())
    }

    fn resource_syncers(&self) -> Vec<Box<dyn ResourceSyncer>> {
        vec![
            Box::new(TeamSyncer::new(self.client.clone(), self.page_size)),
            Box::new(UserSyncer::new(self.client.clone(), self.page_size)),
            Box::new(RoleSyncer::new(self.client.clone(), self.page_size)),
            Box::new(ScheduleSyncer::new(self.client.clone(), self.page_size)),
        ]
    }
}
