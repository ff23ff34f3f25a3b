// ABOUTME: Typed contract for the host-level primitives the controller needs.
// ABOUTME: Implemented over SSH, directly on the host, and by test fakes.

mod error;
mod local;
mod ssh;

pub use error::{HostError, HostErrorKind};
pub use local::LocalHost;
pub use ssh::SshHost;

use async_trait::async_trait;
use std::fmt;
use std::time::Duration;

/// systemctl verbs the controller issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitAction {
    Start,
    Stop,
    Enable,
    Disable,
    Reload,
}

impl UnitAction {
    pub fn as_str(self) -> &'static str {
        match self {
            UnitAction::Start => "start",
            UnitAction::Stop => "stop",
            UnitAction::Enable => "enable",
            UnitAction::Disable => "disable",
            UnitAction::Reload => "reload",
        }
    }
}

impl fmt::Display for UnitAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// A request against a port on the host's loopback interface.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    pub method: HttpMethod,
    pub port: u16,
    pub path: String,
    /// JSON body, sent with `Content-Type: application/json`.
    pub body: Option<String>,
    pub timeout: Duration,
}

impl HttpProbe {
    pub fn get(port: u16, path: impl Into<String>, timeout: Duration) -> Self {
        Self {
            method: HttpMethod::Get,
            port,
            path: path.into(),
            body: None,
            timeout,
        }
    }

    pub fn post_json(port: u16, path: impl Into<String>, body: String, timeout: Duration) -> Self {
        Self {
            method: HttpMethod::Post,
            port,
            path: path.into(),
            body: Some(body),
            timeout,
        }
    }

    pub fn url(&self) -> String {
        format!("http://localhost:{}{}", self.port, self.path)
    }
}

/// Any HTTP response, whatever its status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

impl HttpReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Host primitives consumed by the swap and drain controllers.
///
/// Every method is a single, explicit operation with its own failure
/// contract, so the state machine can run against a recording fake.
#[async_trait]
pub trait HostOps: Send + Sync {
    /// Read a small text file. `None` when it is missing or unreadable.
    async fn read_file(&self, path: &str) -> Result<Option<String>, HostError>;

    /// Replace a file atomically (write a sibling temp file, then rename).
    async fn write_file(&self, path: &str, contents: &str) -> Result<(), HostError>;

    /// Create a directory only if it does not exist.
    /// Returns `false` when it already existed.
    async fn create_dir_exclusive(&self, path: &str) -> Result<bool, HostError>;

    /// Remove a file or directory tree; missing paths are not an error.
    async fn remove_all(&self, path: &str) -> Result<(), HostError>;

    /// Run `systemctl <action> <unit>`.
    async fn unit(&self, action: UnitAction, unit: &str) -> Result<(), HostError>;

    /// Whether the unit's process is currently running.
    async fn is_active(&self, unit: &str) -> Result<bool, HostError>;

    /// Issue an HTTP request to a local port.
    async fn http(&self, probe: &HttpProbe) -> Result<HttpReply, HostError>;
}

/// Quote a string for POSIX `sh`.
pub(crate) fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "'\\''"))
}
