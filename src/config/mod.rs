// ABOUTME: Configuration types and parsing for slotswap.yml.
// ABOUTME: Handles discovery, YAML parsing, defaults and cross-field validation.

mod build_step;
mod deserialize;
mod graceful;
mod health;
mod init;
mod server;
mod slots;

pub use build_step::BuildConfig;
pub use graceful::{DEFAULT_SLOT_COOKIE, GracefulConfig};
pub use health::HealthConfig;
pub use init::init_config;
pub use server::ServerConfig;
pub use slots::{SlotPorts, SlotsConfig};

use crate::error::{Error, Result};
use crate::types::AppName;
use deserialize::{deserialize_app_name, deserialize_servers};
use nonempty::NonEmpty;
use serde::Deserialize;
use std::path::Path;

pub const CONFIG_FILENAME: &str = "slotswap.yml";
pub const CONFIG_FILENAME_ALT: &str = "slotswap.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".slotswap/config.yml";

/// Reverse proxy fronting the two slots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProxyKind {
    #[default]
    Caddy,
    /// No managed proxy; traffic switching is left to the operator.
    None,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(deserialize_with = "deserialize_app_name")]
    pub app: AppName,

    pub domain: String,

    #[serde(default = "default_https")]
    pub https: bool,

    #[serde(default)]
    pub proxy: ProxyKind,

    #[serde(deserialize_with = "deserialize_servers")]
    pub servers: NonEmpty<ServerConfig>,

    #[serde(default)]
    pub slots: SlotsConfig,

    #[serde(default)]
    pub health: HealthConfig,

    #[serde(default)]
    pub graceful: GracefulConfig,

    #[serde(default)]
    pub build: Option<BuildConfig>,
}

fn default_https() -> bool {
    true
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn discover(dir: &Path) -> Result<Self> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        candidates
            .iter()
            .find(|path| path.exists())
            .map(|path| Self::load(path))
            .unwrap_or_else(|| Err(Error::ConfigNotFound(dir.to_path_buf())))
    }

    /// Cross-field rules serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.domain.trim().is_empty() {
            return Err(Error::InvalidConfig("domain cannot be empty".to_string()));
        }

        if self.slots.blue.port == self.slots.green.port {
            return Err(Error::InvalidConfig(format!(
                "blue and green must use different ports (both are {})",
                self.slots.blue.port
            )));
        }

        if self.health.attempts == 0 {
            return Err(Error::InvalidConfig(
                "health.attempts must be at least 1".to_string(),
            ));
        }

        if self.graceful.enabled {
            if self.proxy == ProxyKind::None {
                return Err(Error::InvalidConfig(
                    "graceful draining needs a managed proxy (proxy: caddy)".to_string(),
                ));
            }
            if self.graceful.poll_interval.is_zero() {
                return Err(Error::InvalidConfig(
                    "graceful.poll_interval must be greater than zero".to_string(),
                ));
            }
        }

        if let Some(build) = &self.build
            && build.command.is_empty()
        {
            return Err(Error::InvalidConfig(
                "build.command needs at least a program name".to_string(),
            ));
        }

        Ok(())
    }

    pub fn template() -> Self {
        Config {
            app: AppName::new("my-app").expect("template app name is valid"),
            domain: "app.example.com".to_string(),
            https: true,
            proxy: ProxyKind::Caddy,
            servers: NonEmpty::new(ServerConfig {
                host: "server.example.com".to_string(),
                port: 22,
                user: Some("root".to_string()),
                key: None,
                trust_first_connection: true,
            }),
            slots: SlotsConfig::default(),
            health: HealthConfig::default(),
            graceful: GracefulConfig::default(),
            build: Some(BuildConfig {
                command: vec![
                    "./mvnw".to_string(),
                    "-DskipTests".to_string(),
                    "package".to_string(),
                ],
                artifact: "target/quarkus-app".into(),
            }),
        }
    }
}
