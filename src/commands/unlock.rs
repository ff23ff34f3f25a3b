// ABOUTME: Unlock command: removes a stuck deploy lock on every server.
// ABOUTME: Prints who held each removed lock, when the owner file was readable.

use slotswap::config::Config;
use slotswap::deploy::{DeployLock, SwapPlan};
use slotswap::error::Result;
use slotswap::orchestrator::{HostConnector, SshConnector};
use slotswap::output::Output;

pub async fn unlock(config: Config, output: Output) -> Result<()> {
    let lock_path = SwapPlan::from_config(&config).lock_path();
    let connector = SshConnector;

    for server in &config.servers {
        let host = connector.connect(server).await?;
        let result = DeployLock::force_release(&host, &lock_path).await;
        if let Err(e) = connector.disconnect(host).await {
            tracing::warn!("Failed to disconnect from {}: {}", server.host, e);
        }

        match result? {
            Some(holder) => output.progress(&format!(
                "{}: removed lock held by {} (pid {}) since {}",
                server.host, holder.holder, holder.pid, holder.started_at
            )),
            None => output.progress(&format!("{}: {} removed", server.host, lock_path)),
        }
    }

    output.success("Deploy lock cleared");
    Ok(())
}
