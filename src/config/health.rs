// ABOUTME: Health gate configuration for a freshly started slot.
// ABOUTME: Bounded attempts with fixed spacing and a per-probe timeout.

use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct HealthConfig {
    /// Path probed on the slot's application port. Any HTTP response passes.
    #[serde(default = "default_path")]
    pub path: String,

    #[serde(default = "default_attempts")]
    pub attempts: u32,

    #[serde(default = "default_interval", with = "humantime_serde")]
    pub interval: Duration,

    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            path: default_path(),
            attempts: default_attempts(),
            interval: default_interval(),
            timeout: default_timeout(),
        }
    }
}

fn default_path() -> String {
    "/".to_string()
}

fn default_attempts() -> u32 {
    30
}

fn default_interval() -> Duration {
    Duration::from_secs(2)
}

fn default_timeout() -> Duration {
    Duration::from_secs(3)
}
