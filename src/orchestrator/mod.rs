// ABOUTME: Client-side deploy sequence: build, read the active slot, sync, swap.
// ABOUTME: Servers are handled one at a time and the first failure stops the run.

mod build;
mod connect;
mod sync;

pub use build::{ArtifactBuilder, CommandBuilder};
pub use connect::{HostConnector, SshConnector};
pub use sync::{ArtifactSync, RsyncSync};

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::{Config, ServerConfig};
use crate::deploy::{SwapEvent, SwapMode, SwapPlan, SwapReport, Signals, run_swap};
use crate::diagnostics::{Diagnostics, Warning};
use crate::error::Result;
use crate::host::HostOps;
use crate::types::Slot;

/// Progress of a deploy across servers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum DeployEvent {
    Built { artifact: PathBuf },
    Connected { server: String },
    Synced { server: String, slot: Slot },
    #[serde(untagged)]
    Swap(SwapEvent),
}

/// Per-server results of a completed deploy.
#[derive(Debug, Clone, Serialize)]
pub struct DeployReport {
    pub servers: Vec<ServerReport>,
    pub warnings: Vec<Warning>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServerReport {
    pub server: String,
    #[serde(flatten)]
    pub swap: SwapReport,
}

/// Sequences a deploy for every configured server.
pub struct Orchestrator<B, S> {
    config: Config,
    mode: SwapMode,
    builder: B,
    sync: S,
}

impl<B: ArtifactBuilder, S: ArtifactSync> Orchestrator<B, S> {
    pub fn new(config: Config, builder: B, sync: S) -> Self {
        let mode = if config.graceful.enabled {
            SwapMode::Graceful
        } else {
            SwapMode::Immediate
        };
        Self {
            config,
            mode,
            builder,
            sync,
        }
    }

    pub fn mode(mut self, mode: SwapMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Build once, then deploy to each server in order.
    ///
    /// `signals` is called once per server so each swap gets fresh
    /// operator and interrupt signals.
    pub async fn run<C, F, O>(&self, connector: &C, mut signals: F, observe: O) -> Result<DeployReport>
    where
        C: HostConnector,
        F: FnMut(&ServerConfig) -> Signals,
        O: Fn(DeployEvent),
    {
        let artifact = self.builder.build().await?;
        observe(DeployEvent::Built {
            artifact: artifact.clone(),
        });

        let mut diagnostics = Diagnostics::default();
        let mut servers = Vec::with_capacity(self.config.servers.len());

        for server in &self.config.servers {
            let host = connector.connect(server).await?;
            observe(DeployEvent::Connected {
                server: server.host.clone(),
            });

            let result = self
                .deploy_server(&host, server, &artifact, signals(server), &observe)
                .await;

            if let Err(e) = connector.disconnect(host).await {
                diagnostics.warn(Warning::ssh_disconnect(format!(
                    "failed to disconnect from {}: {}",
                    server.host, e
                )));
            }

            servers.push(ServerReport {
                server: server.host.clone(),
                swap: result?,
            });
        }

        Ok(DeployReport {
            servers,
            warnings: diagnostics.into_warnings(),
        })
    }

    /// Sync the artifact into the inactive slot of one server and swap to it.
    pub async fn deploy_server<H, O>(
        &self,
        host: &H,
        server: &ServerConfig,
        artifact: &Path,
        signals: Signals,
        observe: O,
    ) -> Result<SwapReport>
    where
        H: HostOps + ?Sized,
        O: Fn(DeployEvent),
    {
        let plan = SwapPlan::from_config(&self.config);
        let active = plan.marker().read(host).await?;
        let target = active.other();
        tracing::debug!("{}: active slot {}, syncing into {}", server.host, active, target);

        self.sync
            .sync(artifact, server, &self.config.app, target)
            .await?;
        observe(DeployEvent::Synced {
            server: server.host.clone(),
            slot: target,
        });

        let report = run_swap(
            host,
            plan.expecting_active(active),
            self.mode,
            signals,
            |event| observe(DeployEvent::Swap(event)),
        )
        .await?;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deploy::SwapEvent;

    #[test]
    fn swap_events_serialize_flat() {
        let event = DeployEvent::Swap(SwapEvent::Committed {
            active: Slot::Green,
        });
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"step":"committed","active":"green"}"#);
    }

    #[test]
    fn deploy_events_are_tagged_by_step() {
        let event = DeployEvent::Synced {
            server: "shop.example.com".to_string(),
            slot: Slot::Blue,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(
            json,
            r#"{"step":"synced","server":"shop.example.com","slot":"blue"}"#
        );
    }
}
