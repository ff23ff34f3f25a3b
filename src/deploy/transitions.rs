// ABOUTME: State transition methods for the swap state machine.
// ABOUTME: Each method consumes self and returns the next state on success.

use std::marker::PhantomData;

use tokio::time::Instant;

use crate::diagnostics::Warning;
use crate::host::{HostOps, HttpProbe, UnitAction};
use crate::proxy::Routes;

use super::drain::{DrainSettings, drain_sessions};
use super::error::DeployError;
use super::signal::Signal;
use super::state::{
    Committed, CutOver, Drained, Healthy, Locked, OldStopped, ReadyForCutover, RolledBack,
    Splitting, StaleCleared, Started,
};
use super::swap::Swap;

/// Result type for transitions that may need rollback on failure.
pub type TransitionResult<T, S> = Result<Swap<T>, (Swap<S>, DeployError)>;

impl<S> Swap<S> {
    fn transition<T>(self) -> Swap<T> {
        Swap {
            plan: self.plan,
            active: self.active,
            drain: self.drain,
            diagnostics: self.diagnostics,
            _state: PhantomData,
        }
    }

    /// Stop a slot's service, recording a failure as a warning.
    async fn stop_tolerant<H: HostOps + ?Sized>(&mut self, host: &H, unit: &str) {
        if let Err(e) = host.unit(UnitAction::Stop, unit).await {
            self.diagnostics
                .warn(Warning::service_stop(format!("failed to stop {}: {}", unit, e)));
        }
    }
}

// =============================================================================
// Locked -> StaleCleared -> Started
// =============================================================================

impl Swap<Locked> {
    /// Stop whatever a previous, abandoned run left in the inactive slot.
    ///
    /// Errors are ignored: the unit is usually not running at all.
    #[must_use = "swap state must be used"]
    pub async fn stop_stale<H: HostOps + ?Sized>(self, host: &H) -> Swap<StaleCleared> {
        let unit = self.inactive_unit();
        if let Err(e) = host.unit(UnitAction::Stop, &unit).await {
            tracing::debug!("Ignoring failure to stop stale {}: {}", unit, e);
        }
        self.transition()
    }
}

impl Swap<StaleCleared> {
    /// # Errors
    ///
    /// Returns `DeployError::Host` if `systemctl start` fails.
    #[must_use = "swap state must be used"]
    pub async fn start<H: HostOps + ?Sized>(self, host: &H) -> Result<Swap<Started>, DeployError> {
        let unit = self.inactive_unit();
        tracing::debug!("Starting {}", unit);
        host.unit(UnitAction::Start, &unit)
            .await
            .map_err(DeployError::host("start inactive slot"))?;
        Ok(self.transition())
    }
}

// =============================================================================
// Started -> Healthy | RolledBack
// =============================================================================

impl Swap<Started> {
    /// Wait for the new service to answer HTTP.
    ///
    /// Each attempt checks process liveness first; a dead process ends the
    /// check immediately instead of burning the remaining attempts. Any HTTP
    /// response counts as healthy.
    ///
    /// # Errors
    ///
    /// Returns `(self, error)` on failure so the caller can roll back.
    #[must_use = "swap state must be used"]
    pub async fn health_check<H: HostOps + ?Sized>(
        self,
        host: &H,
    ) -> TransitionResult<Healthy, Started> {
        let health = &self.plan.health;
        let unit = self.inactive_unit();
        let port = self.inactive_ports().port;
        let probe = HttpProbe::get(port, health.path.as_str(), health.timeout);
        let started = Instant::now();

        for attempt in 1..=health.attempts {
            match host.is_active(&unit).await {
                Ok(true) => {}
                Ok(false) => {
                    return Err((self, DeployError::ProcessExited { unit, attempt }));
                }
                Err(e) => tracing::debug!("Could not query {} state: {}", unit, e),
            }

            match host.http(&probe).await {
                Ok(reply) => {
                    tracing::debug!(
                        "{} answered with HTTP {} on attempt {}",
                        unit,
                        reply.status,
                        attempt
                    );
                    return Ok(self.transition());
                }
                Err(e) => tracing::debug!("Health attempt {}/{}: {}", attempt, health.attempts, e),
            }

            if attempt < health.attempts {
                tokio::time::sleep(health.interval).await;
            }
        }

        let attempts = health.attempts;
        Err((
            self,
            DeployError::HealthCheckFailed {
                unit,
                port,
                attempts,
                elapsed: started.elapsed(),
            },
        ))
    }

    /// Stop the unhealthy new service. Marker and proxy were never touched.
    #[must_use = "swap state must be used"]
    pub async fn rollback<H: HostOps + ?Sized>(mut self, host: &H) -> Swap<RolledBack> {
        let unit = self.inactive_unit();
        tracing::debug!("Rolling back: stopping {}", unit);
        self.stop_tolerant(host, &unit).await;
        self.transition()
    }
}

// =============================================================================
// Healthy -> Splitting -> Drained
// =============================================================================

impl Swap<Healthy> {
    /// Keep sessions pinned to the old slot there; send everyone else to the new slot.
    ///
    /// # Errors
    ///
    /// Returns `DeployError::Host` if the proxy config cannot be written or reloaded.
    #[must_use = "swap state must be used"]
    pub async fn split_traffic<H: HostOps + ?Sized>(
        self,
        host: &H,
    ) -> Result<Swap<Splitting>, DeployError> {
        let routes = Routes::Split {
            cookie: self.plan.graceful.cookie.clone(),
            pinned_slot: self.active,
            pinned_port: self.active_ports().port,
            fallback_port: self.inactive_ports().port,
        };
        self.plan
            .proxy
            .apply(host, &routes)
            .await
            .map_err(DeployError::host("split traffic"))?;
        Ok(self.transition())
    }
}

impl Swap<Splitting> {
    /// Ask the old instance to migrate its sessions and wait for them to leave.
    #[must_use = "swap state must be used"]
    pub async fn drain<H: HostOps + ?Sized>(mut self, host: &H, force: Signal) -> Swap<Drained> {
        let settings = DrainSettings::new(&self.plan.graceful, self.active_ports());
        let outcome = drain_sessions(host, &settings, force, &mut self.diagnostics).await;
        self.drain = Some(outcome);
        self.transition()
    }
}

// =============================================================================
// Healthy | Drained -> CutOver -> OldStopped -> Committed
// =============================================================================

impl<S: ReadyForCutover> Swap<S> {
    /// Route all traffic to the new slot.
    ///
    /// # Errors
    ///
    /// Returns `DeployError::Host` if the proxy config cannot be written or reloaded.
    #[must_use = "swap state must be used"]
    pub async fn cutover<H: HostOps + ?Sized>(self, host: &H) -> Result<Swap<CutOver>, DeployError> {
        let routes = Routes::Single {
            port: self.inactive_ports().port,
        };
        self.plan
            .proxy
            .apply(host, &routes)
            .await
            .map_err(DeployError::host("cut over"))?;
        Ok(self.transition())
    }
}

impl Swap<CutOver> {
    /// Stop the old service. Failure is tolerated; traffic already moved.
    #[must_use = "swap state must be used"]
    pub async fn stop_old<H: HostOps + ?Sized>(mut self, host: &H) -> Swap<OldStopped> {
        let unit = self.active_unit();
        tracing::debug!("Stopping {}", unit);
        self.stop_tolerant(host, &unit).await;
        self.transition()
    }
}

impl Swap<OldStopped> {
    /// Flip boot-time enablement and write the marker, the commit point.
    ///
    /// # Errors
    ///
    /// Returns `DeployError::Host` if a required command fails; the marker
    /// then still names the old slot.
    #[must_use = "swap state must be used"]
    pub async fn commit<H: HostOps + ?Sized>(self, host: &H) -> Result<Swap<Committed>, DeployError> {
        host.unit(UnitAction::Enable, &self.inactive_unit())
            .await
            .map_err(DeployError::host("enable new slot"))?;
        host.unit(UnitAction::Disable, &self.active_unit())
            .await
            .map_err(DeployError::host("disable old slot"))?;
        self.plan
            .marker()
            .write(host, self.inactive())
            .await
            .map_err(DeployError::host("write active slot marker"))?;

        tracing::debug!("{} is now the active slot", self.inactive());
        Ok(self.transition())
    }
}
