// ABOUTME: Runs a complete swap under the deploy lock.
// ABOUTME: Sequences the type-state transitions for immediate and graceful modes.

use parking_lot::Mutex;
use serde::Serialize;
use tokio::time::Instant;

use crate::diagnostics::Diagnostics;
use crate::host::{HostOps, UnitAction};
use crate::proxy::Routes;
use crate::types::Slot;

use super::drain::DrainOutcome;
use super::error::DeployError;
use super::lock::DeployLock;
use super::signal::{Signal, Signals};
use super::state::Committed;
use super::swap::{Swap, SwapPlan, SwapReport};

/// How traffic leaves the old slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SwapMode {
    /// Switch all traffic as soon as the new slot is healthy.
    #[default]
    Immediate,
    /// Split traffic and drain pinned sessions before switching.
    Graceful,
}

/// Progress notifications emitted as a swap advances.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum SwapEvent {
    Locked { active: Slot, target: Slot },
    Started { unit: String },
    Healthy { unit: String, port: u16 },
    RolledBack { unit: String },
    TrafficSplit { pinned: Slot },
    Drained { drain: DrainOutcome },
    CutOver { port: u16 },
    Committed { active: Slot },
}

/// Run one swap against `host`.
///
/// The lock is held for the whole run and released on every exit path.
/// `signals.interrupt` aborts whatever step is in progress and yields
/// [`DeployError::Interrupted`] once the lock is released. A graceful run
/// that fails or is interrupted after splitting traffic routes everything
/// back to the old slot and stops the new one before releasing the lock.
pub async fn run_swap<H, O>(
    host: &H,
    plan: SwapPlan,
    mode: SwapMode,
    signals: Signals,
    observe: O,
) -> Result<SwapReport, DeployError>
where
    H: HostOps + ?Sized,
    O: Fn(SwapEvent),
{
    let started = Instant::now();
    let mode = if mode == SwapMode::Graceful && !plan.proxy.is_managed() {
        tracing::warn!("Graceful mode needs a managed proxy; switching immediately");
        SwapMode::Immediate
    } else {
        mode
    };

    let Signals { force, interrupt } = signals;
    let lock_path = plan.lock_path();
    let app = plan.app.clone();
    let mut diagnostics = Diagnostics::default();

    let committed = DeployLock::with_lock(host, &lock_path, &app, &mut diagnostics, |lock| async move {
        let fallback = plan.clone();
        let split_from = Mutex::new(None);

        let result = tokio::select! {
            result = swap_steps(host, plan, &lock, mode, force, &observe, &split_from) => result,
            () = interrupt => {
                tracing::warn!("Interrupted, releasing deploy lock");
                Err(DeployError::Interrupted)
            }
        };

        let split = split_from.lock().take();
        if let (Err(_), Some(active)) = (&result, split) {
            restore_old_slot(host, &fallback, active).await;
            observe(SwapEvent::RolledBack {
                unit: fallback.app.unit(active.other()),
            });
        }
        result
    })
    .await?;

    let mut report = committed.finish(started.elapsed());
    report.warnings.extend(diagnostics.into_warnings());
    Ok(report)
}

async fn swap_steps<H, O>(
    host: &H,
    plan: SwapPlan,
    lock: &DeployLock,
    mode: SwapMode,
    force: Signal,
    observe: &O,
    split_from: &Mutex<Option<Slot>>,
) -> Result<Swap<Committed>, DeployError>
where
    H: HostOps + ?Sized,
    O: Fn(SwapEvent),
{
    let swap = Swap::begin(plan, lock, host).await?;
    observe(SwapEvent::Locked {
        active: swap.active(),
        target: swap.inactive(),
    });

    let swap = swap.stop_stale(host).await.start(host).await?;
    observe(SwapEvent::Started {
        unit: swap.inactive_unit(),
    });

    let healthy = match swap.health_check(host).await {
        Ok(healthy) => healthy,
        Err((swap, error)) => {
            let unit = swap.inactive_unit();
            let _rolled_back = swap.rollback(host).await;
            observe(SwapEvent::RolledBack { unit });
            return Err(error);
        }
    };
    observe(SwapEvent::Healthy {
        unit: healthy.inactive_unit(),
        port: healthy.inactive_ports().port,
    });

    let cut = match mode {
        SwapMode::Immediate => healthy.cutover(host).await?,
        SwapMode::Graceful => {
            // Set before the split is written: a failed reload may leave it live.
            *split_from.lock() = Some(healthy.active());
            let splitting = healthy.split_traffic(host).await?;
            observe(SwapEvent::TrafficSplit {
                pinned: splitting.active(),
            });

            let drained = splitting.drain(host, force).await;
            if let Some(drain) = drained.drain {
                observe(SwapEvent::Drained { drain });
            }
            let cut = drained.cutover(host).await?;
            *split_from.lock() = None;
            cut
        }
    };
    observe(SwapEvent::CutOver {
        port: cut.inactive_ports().port,
    });

    let committed = cut.stop_old(host).await.commit(host).await?;
    observe(SwapEvent::Committed {
        active: committed.inactive(),
    });
    Ok(committed)
}

/// Send all traffic back to `active` and stop the other slot's service.
///
/// Failures are logged; the run is already failing.
async fn restore_old_slot<H: HostOps + ?Sized>(host: &H, plan: &SwapPlan, active: Slot) {
    let routes = Routes::Single {
        port: plan.slots.get(active).port,
    };
    match plan.proxy.apply(host, &routes).await {
        Ok(_) => tracing::debug!("Routed all traffic back to {}", active),
        Err(e) => tracing::warn!("Failed to route all traffic back to {}: {}", active, e),
    }

    let unit = plan.app.unit(active.other());
    if let Err(e) = host.unit(UnitAction::Stop, &unit).await {
        tracing::warn!("Failed to stop {}: {}", unit, e);
    }
}
