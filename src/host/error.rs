// ABOUTME: Host primitive error types with SNAFU pattern.
// ABOUTME: Separates a failed remote command from a failed transport or probe.

use snafu::Snafu;

/// Failure of a single host primitive.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum HostError {
    #[snafu(display("`{command}` exited with status {status}: {}", stderr.trim()))]
    CommandFailed {
        command: String,
        status: u32,
        stderr: String,
    },

    #[snafu(display("host transport failed: {source}"))]
    Transport { source: crate::ssh::Error },

    #[snafu(display("{action} {path} failed: {source}"))]
    LocalIo {
        action: &'static str,
        path: String,
        source: std::io::Error,
    },

    #[snafu(display("no HTTP response from port {port}: {reason}"))]
    Unreachable { port: u16, reason: String },
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostErrorKind {
    /// The command ran and returned a non-zero status.
    CommandFailed,
    /// The command could not be delivered (SSH, process spawn, local I/O).
    Transport,
    /// An HTTP probe got no response.
    Unreachable,
}

impl HostError {
    pub fn kind(&self) -> HostErrorKind {
        match self {
            HostError::CommandFailed { .. } => HostErrorKind::CommandFailed,
            HostError::Transport { .. } | HostError::LocalIo { .. } => HostErrorKind::Transport,
            HostError::Unreachable { .. } => HostErrorKind::Unreachable,
        }
    }

    /// Exit status of the failed command, if one ran.
    pub fn exit_status(&self) -> Option<u32> {
        match self {
            HostError::CommandFailed { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<crate::ssh::Error> for HostError {
    fn from(source: crate::ssh::Error) -> Self {
        HostError::Transport { source }
    }
}
