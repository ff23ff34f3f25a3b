// ABOUTME: Status command: active slot, slot services and lock holder per server.
// ABOUTME: Connects to each server in turn and prints one record per server.

use serde::Serialize;
use slotswap::config::Config;
use slotswap::deploy::{DeployLock, LockInfo, SwapPlan};
use slotswap::error::Result;
use slotswap::host::HostOps;
use slotswap::orchestrator::{HostConnector, SshConnector};
use slotswap::output::{Output, OutputMode};
use slotswap::types::Slot;

#[derive(Debug, Serialize)]
struct ServerStatus {
    server: String,
    active: Slot,
    running: Vec<SlotService>,
    #[serde(skip_serializing_if = "Option::is_none")]
    lock: Option<LockInfo>,
}

#[derive(Debug, Serialize)]
struct SlotService {
    slot: Slot,
    unit: String,
    port: u16,
    running: bool,
}

async fn server_status<H: HostOps + ?Sized>(
    host: &H,
    config: &Config,
    server: &str,
) -> Result<ServerStatus> {
    let plan = SwapPlan::from_config(config);
    let active = plan.marker().read(host).await?;

    let mut running = Vec::with_capacity(Slot::ALL.len());
    for slot in Slot::ALL {
        let unit = config.app.unit(slot);
        let is_running = host.is_active(&unit).await?;
        running.push(SlotService {
            slot,
            port: config.slots.get(slot).port,
            unit,
            running: is_running,
        });
    }

    let lock = DeployLock::inspect(host, &plan.lock_path()).await?;
    Ok(ServerStatus {
        server: server.to_string(),
        active,
        running,
        lock,
    })
}

pub async fn status(config: Config, output: Output) -> Result<()> {
    let connector = SshConnector;
    for server in &config.servers {
        let host = connector.connect(server).await?;
        let result = server_status(&host, &config, &server.host).await;
        if let Err(e) = connector.disconnect(host).await {
            tracing::warn!("Failed to disconnect from {}: {}", server.host, e);
        }
        print_status(&output, &result?);
    }
    Ok(())
}

fn print_status(output: &Output, status: &ServerStatus) {
    if output.mode() == OutputMode::Json {
        output.step("", status);
        return;
    }

    println!("{}: active slot {}", status.server, status.active);
    for service in &status.running {
        println!(
            "  {:<5} {} (port {}): {}",
            service.slot,
            service.unit,
            service.port,
            if service.running { "running" } else { "stopped" }
        );
    }
    if let Some(lock) = &status.lock {
        let note = if lock.is_stale() { ", possibly abandoned" } else { "" };
        println!(
            "  deploy in progress: {} (pid {}) since {}{}",
            lock.holder, lock.pid, lock.started_at, note
        );
    }
}
