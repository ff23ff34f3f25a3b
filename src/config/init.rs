// ABOUTME: Config scaffolding for new projects.
// ABOUTME: Writes a commented slotswap.yml template.

use std::path::Path;

use crate::error::{Error, Result};
use crate::types::AppName;

use super::{CONFIG_FILENAME, Config};

pub fn init_config(dir: &Path, app: Option<&str>, domain: Option<&str>, force: bool) -> Result<()> {
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        return Err(Error::AlreadyExists(config_path));
    }

    let mut config = Config::template();

    if let Some(a) = app {
        config.app = AppName::new(a).map_err(|e| Error::InvalidConfig(e.to_string()))?;
    }

    if let Some(d) = domain {
        config.domain = d.to_string();
    }

    std::fs::write(&config_path, generate_template_yaml(&config))?;

    Ok(())
}

fn generate_template_yaml(config: &Config) -> String {
    let server = config.servers.first();
    format!(
        r#"app: {app}
domain: {domain}
https: true
proxy: caddy
servers:
  - host: {host}
    port: {port}
    user: {user}
# slots:
#   blue: {{ port: 8080 }}
#   green: {{ port: 8081 }}
# health:
#   path: /
#   attempts: 30
#   interval: 2s
#   timeout: 3s
# graceful:
#   enabled: true
#   timeout: 300s
#   poll_interval: 10s
build:
  command: ["./mvnw", "-DskipTests", "package"]
  artifact: target/quarkus-app
"#,
        app = config.app,
        domain = config.domain,
        host = server.host,
        port = server.port,
        user = server.admin_user(),
    )
}
