// ABOUTME: Application-wide error types for slotswap.
// ABOUTME: Uses thiserror and maps every failure onto the process exit-code contract.

use crate::deploy::DeployError;
use crate::host::HostError;
use std::path::PathBuf;
use thiserror::Error;

/// Generic failure (configuration, transport, local I/O).
pub const EXIT_FAILURE: i32 = 1;
/// Another deploy holds the lock.
pub const EXIT_LOCK_HELD: i32 = 2;
/// The new slot never became healthy, or its process died.
pub const EXIT_UNHEALTHY: i32 = 3;
/// The operator interrupted the run (SIGINT convention).
pub const EXIT_INTERRUPTED: i32 = 130;

#[derive(Debug, Error)]
pub enum Error {
    #[error("file already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("configuration file not found in {0}")]
    ConfigNotFound(PathBuf),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("server {0} is not in the configuration")]
    UnknownServer(String),

    #[error("no build step configured (add a `build` section)")]
    NoBuildStep,

    #[error("build artifact {0} does not exist")]
    ArtifactMissing(PathBuf),

    #[error("{step} `{command}` failed with status {status}")]
    StepFailed {
        step: &'static str,
        command: String,
        status: i32,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("SSH error: {0}")]
    Ssh(#[from] crate::ssh::Error),

    #[error(transparent)]
    Host(#[from] HostError),

    #[error(transparent)]
    Deploy(#[from] DeployError),
}

impl Error {
    /// Process exit code for this failure.
    ///
    /// Statuses of failed local steps and remote commands are passed through
    /// unchanged so callers see the same code the underlying tool returned.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::StepFailed { status, .. } if *status != 0 => *status,
            Error::Host(e) => host_exit_code(e),
            Error::Deploy(e) => e.exit_code(),
            _ => EXIT_FAILURE,
        }
    }
}

pub(crate) fn host_exit_code(error: &HostError) -> i32 {
    error
        .exit_status()
        .and_then(|status| i32::try_from(status).ok())
        .filter(|status| *status != 0)
        .unwrap_or(EXIT_FAILURE)
}

pub type Result<T> = std::result::Result<T, Error>;
