// ABOUTME: Target server entries for SSH connections.
// ABOUTME: Parses "host", "user@host", "host:port" and "user@host:port" shorthands.

use crate::ssh::SessionConfig;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Administrative login used for systemctl and proxy changes.
    #[serde(default)]
    pub user: Option<String>,
    /// Private key for both the admin login and the artifact sync.
    #[serde(default)]
    pub key: Option<PathBuf>,
    #[serde(default = "default_trust_first_connection")]
    pub trust_first_connection: bool,
}

fn default_port() -> u16 {
    22
}

fn default_trust_first_connection() -> bool {
    true
}

impl ServerConfig {
    pub fn parse(s: &str) -> Result<Self, String> {
        let s = s.trim();
        if s.is_empty() {
            return Err("server address cannot be empty".to_string());
        }

        let (user, rest) = match s.split_once('@') {
            Some((user, rest)) => (Some(user), rest),
            None => (None, s),
        };

        let (host, port) = match rest.rsplit_once(':') {
            Some((host, port)) => {
                let port = port
                    .parse::<u16>()
                    .map_err(|_| format!("invalid port: {}", port))?;
                (host, port)
            }
            None => (rest, default_port()),
        };

        if host.is_empty() {
            return Err("hostname cannot be empty".to_string());
        }

        Ok(ServerConfig {
            host: host.to_string(),
            port,
            user: user.map(str::to_string),
            key: None,
            trust_first_connection: true,
        })
    }

    /// Administrative login, defaulting to root.
    pub fn admin_user(&self) -> &str {
        self.user.as_deref().unwrap_or("root")
    }

    /// SSH settings for the administrative session.
    pub fn ssh_session_config(&self) -> SessionConfig {
        let mut config = SessionConfig::new(&self.host, self.admin_user())
            .port(self.port)
            .trust_on_first_use(self.trust_first_connection);
        if let Some(key) = &self.key {
            config = config.key_path(key);
        }
        config
    }
}
