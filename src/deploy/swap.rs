// ABOUTME: Generic swap struct parameterized by state marker.
// ABOUTME: Holds the plan, the slot roles read under the lock, and warnings collected so far.

use std::marker::PhantomData;
use std::time::Duration;

use serde::Serialize;

use crate::config::{Config, GracefulConfig, HealthConfig, SlotPorts, SlotsConfig};
use crate::diagnostics::{Diagnostics, Warning};
use crate::host::HostOps;
use crate::proxy::ProxyConfigurator;
use crate::types::{AppName, Slot};

use super::drain::DrainOutcome;
use super::lock::DeployLock;
use super::marker::ActiveSlotMarker;
use super::state::{Committed, Locked};
use super::DeployError;

/// Everything a swap needs to know about the app, independent of run state.
#[derive(Debug, Clone)]
pub struct SwapPlan {
    pub app: AppName,
    pub slots: SlotsConfig,
    pub health: HealthConfig,
    pub graceful: GracefulConfig,
    pub proxy: ProxyConfigurator,
    /// Slot the caller saw as active before syncing into the other one.
    /// The swap refuses to run if the marker has changed since.
    pub expected_active: Option<Slot>,
}

impl SwapPlan {
    pub fn from_config(config: &Config) -> Self {
        Self {
            app: config.app.clone(),
            slots: config.slots,
            health: config.health.clone(),
            graceful: config.graceful.clone(),
            proxy: ProxyConfigurator::from_config(config),
            expected_active: None,
        }
    }

    pub fn expecting_active(mut self, slot: Slot) -> Self {
        self.expected_active = Some(slot);
        self
    }

    pub fn marker(&self) -> ActiveSlotMarker {
        ActiveSlotMarker::new(format!("{}/active", self.app.home_dir()))
    }

    pub fn lock_path(&self) -> String {
        format!("{}/deploy.lock", self.app.home_dir())
    }
}

/// A swap in progress, parameterized by its current state.
#[derive(Debug)]
pub struct Swap<S> {
    pub(crate) plan: SwapPlan,
    pub(crate) active: Slot,
    pub(crate) drain: Option<DrainOutcome>,
    pub(crate) diagnostics: Diagnostics,
    pub(crate) _state: PhantomData<S>,
}

impl Swap<Locked> {
    /// Start a swap under a held lock by reading the active slot.
    pub async fn begin<H: HostOps + ?Sized>(
        plan: SwapPlan,
        _lock: &DeployLock,
        host: &H,
    ) -> Result<Self, DeployError> {
        let active = plan
            .marker()
            .read(host)
            .await
            .map_err(DeployError::host("read active slot"))?;
        if let Some(expected) = plan.expected_active
            && expected != active
        {
            return Err(DeployError::ActiveChanged { expected, found: active });
        }
        tracing::debug!("Active slot is {}, deploying to {}", active, active.other());

        Ok(Swap {
            plan,
            active,
            drain: None,
            diagnostics: Diagnostics::default(),
            _state: PhantomData,
        })
    }
}

impl<S> Swap<S> {
    pub fn plan(&self) -> &SwapPlan {
        &self.plan
    }

    /// Slot serving traffic when the swap began.
    pub fn active(&self) -> Slot {
        self.active
    }

    /// Slot being deployed.
    pub fn inactive(&self) -> Slot {
        self.active.other()
    }

    pub fn active_ports(&self) -> SlotPorts {
        self.plan.slots.get(self.active)
    }

    pub fn inactive_ports(&self) -> SlotPorts {
        self.plan.slots.get(self.inactive())
    }

    pub fn active_unit(&self) -> String {
        self.plan.app.unit(self.active)
    }

    pub fn inactive_unit(&self) -> String {
        self.plan.app.unit(self.inactive())
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }
}

impl Swap<Committed> {
    /// Consume the swap and summarize it.
    pub fn finish(self, elapsed: Duration) -> SwapReport {
        SwapReport {
            previous: self.active,
            active: self.active.other(),
            drain: self.drain,
            elapsed,
            warnings: self.diagnostics.into_warnings(),
        }
    }
}

/// Outcome of a committed swap.
#[derive(Debug, Clone, Serialize)]
pub struct SwapReport {
    pub previous: Slot,
    pub active: Slot,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drain: Option<DrainOutcome>,
    #[serde(with = "humantime_serde")]
    pub elapsed: Duration,
    pub warnings: Vec<Warning>,
}
