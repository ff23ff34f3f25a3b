// ABOUTME: Swap command: runs the controller on the host it is invoked on.
// ABOUTME: Slot directories must already hold the new artifact.

use slotswap::config::{GracefulConfig, HealthConfig, ProxyKind, SlotPorts, SlotsConfig};
use slotswap::deploy::{SwapMode, SwapPlan, run_swap};
use slotswap::error::{Error, Result};
use slotswap::host::LocalHost;
use slotswap::output::{Output, OutputMode};
use slotswap::proxy::{ProxyConfigurator, Site};
use slotswap::types::AppName;

use super::operator::OperatorConsole;
use super::progress::describe_swap;
use crate::cli::{ProxyArg, SwapArgs};

/// Turn command-line arguments into a swap plan.
pub fn plan_from_args(args: &SwapArgs) -> Result<(SwapPlan, SwapMode)> {
    let app = AppName::new(&args.app).map_err(|e| Error::InvalidConfig(e.to_string()))?;
    if args.domain.trim().is_empty() {
        return Err(Error::InvalidConfig("--domain cannot be empty".to_string()));
    }
    if args.blue_port == args.green_port {
        return Err(Error::InvalidConfig(
            "blue and green must use different ports".to_string(),
        ));
    }
    if args.health_attempts == 0 {
        return Err(Error::InvalidConfig(
            "--health-attempts must be at least 1".to_string(),
        ));
    }

    let proxy = match args.proxy {
        ProxyArg::Caddy => ProxyKind::Caddy,
        ProxyArg::None => ProxyKind::None,
    };
    if args.graceful && proxy == ProxyKind::None {
        return Err(Error::InvalidConfig(
            "--graceful needs a managed proxy".to_string(),
        ));
    }
    if args.graceful && args.poll_interval.is_zero() {
        return Err(Error::InvalidConfig(
            "--poll-interval must be greater than zero".to_string(),
        ));
    }

    let plan = SwapPlan {
        app,
        slots: SlotsConfig {
            blue: SlotPorts::new(args.blue_port),
            green: SlotPorts::new(args.green_port),
        },
        health: HealthConfig {
            path: args.health_path.clone(),
            attempts: args.health_attempts,
            ..HealthConfig::default()
        },
        graceful: GracefulConfig {
            enabled: args.graceful,
            timeout: args.drain_timeout,
            poll_interval: args.poll_interval,
            ..GracefulConfig::default()
        },
        proxy: ProxyConfigurator::new(
            proxy,
            Site {
                domain: args.domain.clone(),
                https: !args.no_https,
            },
        ),
        expected_active: None,
    };
    let mode = if args.graceful {
        SwapMode::Graceful
    } else {
        SwapMode::Immediate
    };
    Ok((plan, mode))
}

pub async fn swap(args: SwapArgs, mut output: Output) -> Result<()> {
    let (plan, mode) = plan_from_args(&args)?;
    output.start_timer();

    let (operator, signals) = OperatorConsole::new(output.mode() == OutputMode::Normal);
    let report = run_swap(&LocalHost::new(), plan, mode, signals, |event| {
        operator.on_event(&event);
        output.step(&describe_swap(&event), &event);
    })
    .await?;

    output.warnings(&report.warnings);
    output.success(&format!(
        "Swapped {} from {} to {}",
        args.app, report.previous, report.active
    ));
    Ok(())
}
