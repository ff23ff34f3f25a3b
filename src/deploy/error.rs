// ABOUTME: Error types for swap and drain operations.
// ABOUTME: Covers lock contention, failed health gates, host step failures and interruption.

use std::time::Duration;

use crate::error::{EXIT_FAILURE, EXIT_INTERRUPTED, EXIT_LOCK_HELD, EXIT_UNHEALTHY, host_exit_code};
use crate::host::HostError;
use crate::types::Slot;

use super::lock::LockInfo;

/// Errors that can occur during swap state transitions.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    /// Another deploy holds the lock directory.
    #[error(
        "deploy lock {path} is already held{}; if no deploy is running, clear it with `slotswap unlock`",
        holder_note(.holder)
    )]
    LockHeld {
        path: String,
        holder: Option<LockInfo>,
    },

    /// The lock could not be managed.
    #[error("deploy lock error: {0}")]
    Lock(String),

    /// The marker changed between artifact sync and lock acquisition.
    #[error("active slot changed from {expected} to {found} while syncing; deploy again")]
    ActiveChanged { expected: Slot, found: Slot },

    /// The new service's process died while being health checked.
    #[error("{unit} is not running (health check attempt {attempt})")]
    ProcessExited { unit: String, attempt: u32 },

    /// The new service never answered over HTTP.
    #[error("{unit} did not answer on port {port} after {attempts} attempts ({elapsed:?})")]
    HealthCheckFailed {
        unit: String,
        port: u16,
        attempts: u32,
        elapsed: Duration,
    },

    /// A required host primitive failed.
    #[error("{step} failed: {source}")]
    Host {
        step: &'static str,
        #[source]
        source: HostError,
    },

    /// The operator interrupted the run.
    #[error("interrupted")]
    Interrupted,
}

fn holder_note(holder: &Option<LockInfo>) -> String {
    match holder {
        Some(info) if info.is_stale() => format!(
            " by {} (pid {}) since {}, which looks abandoned",
            info.holder, info.pid, info.started_at
        ),
        Some(info) => format!(
            " by {} (pid {}) since {}",
            info.holder, info.pid, info.started_at
        ),
        None => String::new(),
    }
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployErrorKind {
    LockHeld,
    Lock,
    ActiveChanged,
    Unhealthy,
    Host,
    Interrupted,
}

impl DeployError {
    /// Wrap a host failure with the step it happened in.
    pub fn host(step: &'static str) -> impl FnOnce(HostError) -> DeployError {
        move |source| DeployError::Host { step, source }
    }

    pub fn kind(&self) -> DeployErrorKind {
        match self {
            DeployError::LockHeld { .. } => DeployErrorKind::LockHeld,
            DeployError::Lock(_) => DeployErrorKind::Lock,
            DeployError::ActiveChanged { .. } => DeployErrorKind::ActiveChanged,
            DeployError::ProcessExited { .. } | DeployError::HealthCheckFailed { .. } => {
                DeployErrorKind::Unhealthy
            }
            DeployError::Host { .. } => DeployErrorKind::Host,
            DeployError::Interrupted => DeployErrorKind::Interrupted,
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            DeployError::LockHeld { .. } => EXIT_LOCK_HELD,
            DeployError::ProcessExited { .. } | DeployError::HealthCheckFailed { .. } => {
                EXIT_UNHEALTHY
            }
            DeployError::Host { source, .. } => host_exit_code(source),
            DeployError::Interrupted => EXIT_INTERRUPTED,
            DeployError::Lock(_) | DeployError::ActiveChanged { .. } => EXIT_FAILURE,
        }
    }
}
