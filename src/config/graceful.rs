// ABOUTME: Graceful drain configuration.
// ABOUTME: Timeout, poll cadence and management endpoints of the outgoing instance.

use serde::Deserialize;
use std::time::Duration;

/// Cookie the proxy inspects to keep pinned sessions on the old slot.
pub const DEFAULT_SLOT_COOKIE: &str = "X-Server-Slot";

#[derive(Debug, Clone, Deserialize)]
pub struct GracefulConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Upper bound on the whole drain phase.
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,

    #[serde(default = "default_poll_interval", with = "humantime_serde")]
    pub poll_interval: Duration,

    /// Per-call timeout for the management endpoints.
    #[serde(default = "default_request_timeout", with = "humantime_serde")]
    pub request_timeout: Duration,

    #[serde(default = "default_cookie")]
    pub cookie: String,

    #[serde(default = "default_active_users_path")]
    pub active_users_path: String,

    #[serde(default = "default_new_version_path")]
    pub new_version_path: String,
}

impl Default for GracefulConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            timeout: default_timeout(),
            poll_interval: default_poll_interval(),
            request_timeout: default_request_timeout(),
            cookie: default_cookie(),
            active_users_path: default_active_users_path(),
            new_version_path: default_new_version_path(),
        }
    }
}

fn default_timeout() -> Duration {
    Duration::from_secs(300)
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(10)
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(3)
}

fn default_cookie() -> String {
    DEFAULT_SLOT_COOKIE.to_string()
}

fn default_active_users_path() -> String {
    "/active-users".to_string()
}

fn default_new_version_path() -> String {
    "/new-version".to_string()
}
