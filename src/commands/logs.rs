// ABOUTME: Logs command: tails the journal of the service in the active slot.
// ABOUTME: Reads the marker first so the unit always matches the slot serving traffic.

use slotswap::config::{Config, ServerConfig};
use slotswap::deploy::SwapPlan;
use slotswap::error::{EXIT_FAILURE, Error, Result};
use slotswap::host::SshHost;
use slotswap::orchestrator::{HostConnector, SshConnector};
use slotswap::output::Output;

/// `journalctl` invocation for one unit.
fn journal_command(unit: &str, lines: u32, follow: bool) -> String {
    let mut command = format!("journalctl -u {unit} -n {lines} --no-pager");
    if follow {
        command.push_str(" -f");
    }
    command
}

/// The named server, or the first configured one.
fn select_server<'a>(config: &'a Config, name: Option<&str>) -> Result<&'a ServerConfig> {
    match name {
        None => Ok(config.servers.first()),
        Some(name) => config
            .servers
            .iter()
            .find(|server| server.host == name)
            .ok_or_else(|| Error::UnknownServer(name.to_string())),
    }
}

pub async fn logs(
    config: Config,
    server: Option<String>,
    lines: u32,
    follow: bool,
    output: Output,
) -> Result<()> {
    let server = select_server(&config, server.as_deref())?;
    let connector = SshConnector;

    let host = connector.connect(server).await?;
    let result = tail(&host, &config, server, lines, follow, &output).await;
    if let Err(e) = connector.disconnect(host).await {
        tracing::warn!("Failed to disconnect from {}: {}", server.host, e);
    }
    result
}

async fn tail(
    host: &SshHost,
    config: &Config,
    server: &ServerConfig,
    lines: u32,
    follow: bool,
    output: &Output,
) -> Result<()> {
    let active = SwapPlan::from_config(config).marker().read(host).await?;
    let unit = config.app.unit(active);
    output.progress(&format!("{}: {} ({} slot)", server.host, unit, active));

    let command = journal_command(&unit, lines, follow);
    let status = host
        .stream(&command, &mut tokio::io::stdout(), &mut tokio::io::stderr())
        .await?;
    if status != 0 {
        return Err(Error::StepFailed {
            step: "logs",
            command,
            status: i32::try_from(status).unwrap_or(EXIT_FAILURE),
        });
    }
    Ok(())
}
