//! Configuration for the PagerDuty connector.

use std::time::Duration;

use secrecy::SecretString;
use xavyo_sync::error::{SyncError, SyncResult};

/// Default PagerDuty REST API base URL.
pub const DEFAULT_API_BASE: &str = "https://api.pagerduty.com";

/// Default number of records requested per upstream page.
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// PagerDuty caps the `limit` query parameter at 100.
const MAX_PAGE_SIZE: u32 = 100;

/// Connector configuration.
#[derive(Debug, Clone)]
pub struct PagerDutyConfig {
    /// REST API base URL.
    pub api_base: String,
    /// Records requested per upstream page.
    pub page_size: u32,
    /// Deadline applied to each upstream round trip.
    pub timeout: Duration,
}

impl Default for PagerDutyConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            timeout: Duration::from_secs(30),
        }
    }
}

impl PagerDutyConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` when a field is out of range.
    pub fn validate(&self) -> SyncResult<()> {
        if self.api_base.is_empty() {
            return Err(SyncError::invalid_configuration("api_base must not be empty"));
        }

        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(SyncError::invalid_configuration(format!(
                "page_size must be between 1 and {MAX_PAGE_SIZE}, got {}",
                self.page_size
            )));
        }

        Ok(())
    }
}

/// API credentials.
#[derive(Debug, Clone)]
pub struct PagerDutyCredentials {
    /// REST API access token.
    pub token: SecretString,
}

impl PagerDutyCredentials {
    /// Create credentials from an access token.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into().into(),
        }
    }
}
