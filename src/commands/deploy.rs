// ABOUTME: Deploy command implementation.
// ABOUTME: Builds once, then syncs and swaps each configured server in order.

use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use slotswap::config::Config;
use slotswap::deploy::SwapMode;
use slotswap::error::{Error, Result};
use slotswap::orchestrator::{CommandBuilder, DeployEvent, Orchestrator, RsyncSync, SshConnector};
use slotswap::output::{Output, OutputMode};

use super::operator::OperatorConsole;
use super::progress::describe_deploy;

/// Deploy to all configured servers.
pub async fn deploy(
    config: Config,
    mode: Option<SwapMode>,
    workdir: &Path,
    mut output: Output,
) -> Result<()> {
    let build = config.build.as_ref().ok_or(Error::NoBuildStep)?;
    let builder = CommandBuilder::new(build, workdir);

    output.start_timer();
    output.progress(&format!(
        "Deploying {} to {} server(s)",
        config.app,
        config.servers.len()
    ));

    let mut orchestrator = Orchestrator::new(config, builder, RsyncSync);
    if let Some(mode) = mode {
        orchestrator = orchestrator.mode(mode);
    }

    let interactive = output.mode() == OutputMode::Normal;
    let console: Mutex<Option<Arc<OperatorConsole>>> = Mutex::new(None);

    let result = orchestrator
        .run(
            &SshConnector,
            |server| {
                output.progress(&format!("Deploying to {}", server.host));
                let (operator, signals) = OperatorConsole::new(interactive);
                *console.lock() = Some(operator);
                signals
            },
            |event| {
                if let DeployEvent::Swap(swap_event) = &event
                    && let Some(operator) = console.lock().as_ref()
                {
                    operator.on_event(swap_event);
                }
                output.step(&describe_deploy(&event), &event);
            },
        )
        .await;
    console.lock().take();

    let report = result?;
    output.warnings(&report.warnings);
    for server in &report.servers {
        output.warnings(&server.swap.warnings);
    }

    let active = report
        .servers
        .first()
        .map(|server| server.swap.active.to_string())
        .unwrap_or_default();
    output.success(&format!(
        "Deployed {} to {} server(s); active slot is {}",
        orchestrator.config().app,
        report.servers.len(),
        active
    ));
    Ok(())
}
