// ABOUTME: Local build step producing the deployable artifact directory.
// ABOUTME: Runs the configured command with inherited stdio in the project directory.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use crate::config::BuildConfig;
use crate::error::{Error, Result};

/// Produces the directory that gets synced into a slot.
#[async_trait]
pub trait ArtifactBuilder: Send + Sync {
    async fn build(&self) -> Result<PathBuf>;
}

/// Runs a local command, then checks the artifact directory exists.
#[derive(Debug, Clone)]
pub struct CommandBuilder {
    command: Vec<String>,
    artifact: PathBuf,
    workdir: PathBuf,
}

impl CommandBuilder {
    pub fn new(config: &BuildConfig, workdir: impl Into<PathBuf>) -> Self {
        Self {
            command: config.command.clone(),
            artifact: config.artifact.clone(),
            workdir: workdir.into(),
        }
    }

    fn artifact_path(&self) -> PathBuf {
        if self.artifact.is_absolute() {
            self.artifact.clone()
        } else {
            self.workdir.join(&self.artifact)
        }
    }
}

#[async_trait]
impl ArtifactBuilder for CommandBuilder {
    async fn build(&self) -> Result<PathBuf> {
        let (program, args) = self.command.split_first().ok_or(Error::NoBuildStep)?;
        let shown = self.command.join(" ");
        tracing::debug!("Building with `{}` in {}", shown, self.workdir.display());

        let status = Command::new(program)
            .args(args)
            .current_dir(&self.workdir)
            .stdin(Stdio::null())
            .status()
            .await?;
        if !status.success() {
            return Err(Error::StepFailed {
                step: "build",
                command: shown,
                status: status.code().unwrap_or(1),
            });
        }

        let artifact = self.artifact_path();
        if !is_dir(&artifact).await {
            return Err(Error::ArtifactMissing(artifact));
        }
        Ok(artifact)
    }
}

async fn is_dir(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|meta| meta.is_dir())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder(command: &[&str], artifact: &str, workdir: &Path) -> CommandBuilder {
        CommandBuilder::new(
            &BuildConfig {
                command: command.iter().map(|s| s.to_string()).collect(),
                artifact: artifact.into(),
            },
            workdir,
        )
    }

    #[tokio::test]
    async fn successful_build_returns_artifact_dir() {
        let dir = tempfile::tempdir().unwrap();
        let built = builder(&["mkdir", "-p", "out/app"], "out/app", dir.path())
            .build()
            .await
            .unwrap();
        assert_eq!(built, dir.path().join("out/app"));
    }

    #[tokio::test]
    async fn failing_build_keeps_its_status() {
        let dir = tempfile::tempdir().unwrap();
        let err = builder(&["sh", "-c", "exit 7"], "out", dir.path())
            .build()
            .await
            .unwrap_err();
        assert_eq!(err.exit_code(), 7);
        assert!(err.to_string().contains("build `sh -c exit 7` failed"));
    }

    #[tokio::test]
    async fn missing_artifact_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = builder(&["true"], "nowhere", dir.path())
            .build()
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ArtifactMissing(_)));
    }
}
