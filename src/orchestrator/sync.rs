// ABOUTME: Ships the artifact directory into a slot directory on the target server.
// ABOUTME: Uses rsync over ssh as the application user.

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use crate::config::ServerConfig;
use crate::error::{Error, Result};
use crate::types::{AppName, Slot};

/// Copies an artifact directory into a slot directory on a server.
#[async_trait]
pub trait ArtifactSync: Send + Sync {
    async fn sync(
        &self,
        artifact: &Path,
        server: &ServerConfig,
        app: &AppName,
        slot: Slot,
    ) -> Result<()>;
}

/// `rsync -az --delete` over ssh.
#[derive(Debug, Clone, Default)]
pub struct RsyncSync;

impl RsyncSync {
    /// Arguments passed to `rsync`. The artifact's contents (not the
    /// directory itself) land in the slot directory.
    pub fn args(artifact: &Path, server: &ServerConfig, app: &AppName, slot: Slot) -> Vec<String> {
        let mut ssh = format!("ssh -p {}", server.port);
        if let Some(key) = &server.key {
            ssh.push_str(&format!(" -i {}", key.display()));
        }
        ssh.push_str(" -o StrictHostKeyChecking=accept-new");

        let mut source = artifact.display().to_string();
        if !source.ends_with('/') {
            source.push('/');
        }

        vec![
            "-az".to_string(),
            "--delete".to_string(),
            "-e".to_string(),
            ssh,
            source,
            format!("{}@{}:{}/", app, server.host, app.slot_dir(slot)),
        ]
    }
}

#[async_trait]
impl ArtifactSync for RsyncSync {
    async fn sync(
        &self,
        artifact: &Path,
        server: &ServerConfig,
        app: &AppName,
        slot: Slot,
    ) -> Result<()> {
        let args = Self::args(artifact, server, app, slot);
        tracing::debug!("rsync {}", args.join(" "));

        let status = Command::new("rsync")
            .args(&args)
            .stdin(Stdio::null())
            .status()
            .await?;
        if status.success() {
            Ok(())
        } else {
            Err(Error::StepFailed {
                step: "sync",
                command: format!("rsync {}", args.join(" ")),
                status: status.code().unwrap_or(1),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn targets_inactive_slot_dir_as_app_user() {
        let mut server = ServerConfig::parse("root@shop.example.com:2222").unwrap();
        server.key = Some("/keys/deploy".into());
        let app = AppName::new("shop").unwrap();

        let args = RsyncSync::args(Path::new("target/quarkus-app"), &server, &app, Slot::Green);

        assert_eq!(args[0], "-az");
        assert_eq!(args[1], "--delete");
        assert_eq!(
            args[3],
            "ssh -p 2222 -i /keys/deploy -o StrictHostKeyChecking=accept-new"
        );
        assert_eq!(args[4], "target/quarkus-app/");
        assert_eq!(args[5], "shop@shop.example.com:/home/shop/app-green/");
    }
}
