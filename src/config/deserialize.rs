// ABOUTME: Custom serde deserializers for config types.
// ABOUTME: Handles app names and server lists.

use nonempty::NonEmpty;
use serde::Deserialize;

use super::ServerConfig;
use crate::types::AppName;

pub fn deserialize_app_name<'de, D>(deserializer: D) -> Result<AppName, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    AppName::new(&s).map_err(serde::de::Error::custom)
}

pub fn deserialize_servers<'de, D>(deserializer: D) -> Result<NonEmpty<ServerConfig>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let values: Vec<ServerEntry> = Vec::deserialize(deserializer)?;
    let servers = values
        .into_iter()
        .map(ServerEntry::into_server_config)
        .collect::<Result<Vec<_>, _>>()
        .map_err(serde::de::Error::custom)?;

    NonEmpty::from_vec(servers)
        .ok_or_else(|| serde::de::Error::custom("at least one server is required"))
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ServerEntry {
    Simple(String),
    Detailed(ServerConfig),
}

impl ServerEntry {
    fn into_server_config(self) -> Result<ServerConfig, String> {
        match self {
            ServerEntry::Simple(s) => ServerConfig::parse(&s),
            ServerEntry::Detailed(c) => Ok(c),
        }
    }
}
