use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct Settings {
    pub account: AccountSettings,
    pub service: ServiceSettings,
    pub migration: MigrationSettings,
    pub log_level: String,
}

#[derive(Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct AccountSettings {
    /// Handle or email used to create the session
    pub identifier: String,
    /// App password; when absent the CLI falls back to the keyring
    pub password: Option<String>,
}

impl fmt::Debug for AccountSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountSettings")
            .field("identifier", &self.identifier)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ServiceSettings {
    /// PDS base URL, without the `/xrpc` path
    pub url: String,
    pub rate_limited_status: u16,
    pub unauthenticated_status: u16,
}

impl ServiceSettings {
    pub fn status_map(&self) -> StatusMap {
        StatusMap {
            rate_limited: self.rate_limited_status,
            unauthenticated: self.unauthenticated_status,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct MigrationSettings {
    pub identifier_suffix: String,
    pub inter_item_delay_secs: u64,
    pub rate_limit_pause_secs: u64,
    /// Pause every N items; 0 disables the periodic throttle
    pub periodic_throttle_every: usize,
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub source_column: String,
}

impl MigrationSettings {
    pub fn pacing(&self) -> Pacing {
        Pacing {
            inter_item_delay: Duration::from_secs(self.inter_item_delay_secs),
            rate_limit_pause: Duration::from_secs(self.rate_limit_pause_secs),
            periodic_throttle_every: self.periodic_throttle_every,
        }
    }
}

/// Status codes the remote API uses for the two transient conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusMap {
    pub rate_limited: u16,
    pub unauthenticated: u16,
}

impl Default for StatusMap {
    fn default() -> Self {
        Self {
            rate_limited: 429,
            unauthenticated: 401,
        }
    }
}

/// Timers used by the migration loop.
///
/// The reactive rate-limit pause and the periodic throttle share a
/// duration by default but are applied independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    pub inter_item_delay: Duration,
    pub rate_limit_pause: Duration,
    pub periodic_throttle_every: usize,
}

impl Pacing {
    /// Whether the item at 1-based `index` is followed by the periodic pause.
    pub fn is_throttle_point(&self, index: usize) -> bool {
        self.periodic_throttle_every > 0 && index % self.periodic_throttle_every == 0
    }
}

impl Default for Pacing {
    fn default() -> Self {
        MigrationSettings::default().pacing()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            account: AccountSettings::default(),
            service: ServiceSettings::default(),
            migration: MigrationSettings::default(),
            log_level: "info".to_string(),
        }
    }
}

impl Default for ServiceSettings {
    fn default() -> Self {
        let statuses = StatusMap::default();
        Self {
            url: "https://bsky.social".to_string(),
            rate_limited_status: statuses.rate_limited,
            unauthenticated_status: statuses.unauthenticated,
        }
    }
}

impl Default for MigrationSettings {
    fn default() -> Self {
        Self {
            identifier_suffix: ".bsky.social".to_string(),
            inter_item_delay_secs: 1,
            rate_limit_pause_secs: 600,
            periodic_throttle_every: 3000,
            input_path: PathBuf::from("twitter_handles.csv"),
            output_path: PathBuf::from("follow_results.csv"),
            source_column: "Handle".to_string(),
        }
    }
}
