// ABOUTME: Opens host connections for each configured server.
// ABOUTME: The SSH connector yields an SshHost owning its session.

use async_trait::async_trait;

use crate::config::ServerConfig;
use crate::error::Result;
use crate::host::{HostOps, SshHost};

#[async_trait]
pub trait HostConnector: Send + Sync {
    type Host: HostOps;

    async fn connect(&self, server: &ServerConfig) -> Result<Self::Host>;

    /// Close a connection. Failures are reported as warnings by the caller.
    async fn disconnect(&self, host: Self::Host) -> Result<()>;
}

#[derive(Debug, Clone, Default)]
pub struct SshConnector;

#[async_trait]
impl HostConnector for SshConnector {
    type Host = SshHost;

    async fn connect(&self, server: &ServerConfig) -> Result<SshHost> {
        let config = server.ssh_session_config();
        tracing::debug!("Connecting to {}", config.destination());
        Ok(SshHost::connect(config).await?)
    }

    async fn disconnect(&self, host: SshHost) -> Result<()> {
        Ok(host.disconnect().await?)
    }
}
