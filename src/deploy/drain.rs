// ABOUTME: Graceful drain of the outgoing instance.
// ABOUTME: Notifies it, then races pinned-session polling against operator force and the deadline.

use std::time::Duration;

use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::config::{GracefulConfig, SlotPorts};
use crate::diagnostics::{Diagnostics, Warning};
use crate::host::{HostOps, HttpProbe};

use super::signal::Signal;

/// How a drain ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DrainOutcome {
    /// No pinned sessions left on the old slot.
    Drained,
    /// The operator ended the drain.
    Forced,
    /// The deadline passed. `remaining` is the last count read, if any.
    TimedOut { remaining: Option<u32> },
}

/// Drain parameters for one outgoing slot.
#[derive(Debug, Clone)]
pub struct DrainSettings {
    pub port: u16,
    pub timeout: Duration,
    pub poll_interval: Duration,
    pub request_timeout: Duration,
    pub active_users_path: String,
    pub new_version_path: String,
}

impl DrainSettings {
    pub fn new(graceful: &GracefulConfig, old: SlotPorts) -> Self {
        Self {
            port: old.management(),
            timeout: graceful.timeout,
            poll_interval: graceful.poll_interval,
            request_timeout: graceful.request_timeout,
            active_users_path: graceful.active_users_path.clone(),
            new_version_path: graceful.new_version_path.clone(),
        }
    }
}

#[derive(Serialize)]
struct NewVersionRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    deadline: Option<String>,
}

#[derive(Deserialize)]
struct ActiveUsers {
    count: u32,
}

/// What ended the race.
enum Finish {
    Drained,
    Forced,
    Deadline,
}

/// Drain pinned sessions from the outgoing instance.
///
/// Never fails: an unreachable instance is reported through `diagnostics`
/// and counted as drained.
pub async fn drain_sessions<H: HostOps + ?Sized>(
    host: &H,
    settings: &DrainSettings,
    force: Signal,
    diagnostics: &mut Diagnostics,
) -> DrainOutcome {
    let deadline_at = Instant::now() + settings.timeout;
    let deadline = TimeDelta::from_std(settings.timeout)
        .ok()
        .and_then(|budget| Utc::now().checked_add_signed(budget));

    notify_new_version(host, settings, deadline, diagnostics).await;

    let mut last_count = None;
    let finish = tokio::select! {
        biased;
        () = poll_until_drained(host, settings, diagnostics, &mut last_count) => Finish::Drained,
        () = force => Finish::Forced,
        () = tokio::time::sleep_until(deadline_at) => Finish::Deadline,
    };

    match finish {
        Finish::Drained => {
            tracing::debug!("All pinned sessions left port {}", settings.port);
            DrainOutcome::Drained
        }
        Finish::Forced => {
            tracing::info!("Drain ended by operator");
            DrainOutcome::Forced
        }
        Finish::Deadline => {
            let remaining = last_count
                .map(|count| count.to_string())
                .unwrap_or_else(|| "an unknown number of".to_string());
            diagnostics.warn(Warning::drain_timeout(format!(
                "drain deadline of {:?} reached with {} pinned session(s) on port {}",
                settings.timeout, remaining, settings.port
            )));
            DrainOutcome::TimedOut {
                remaining: last_count,
            }
        }
    }
}

async fn notify_new_version<H: HostOps + ?Sized>(
    host: &H,
    settings: &DrainSettings,
    deadline: Option<DateTime<Utc>>,
    diagnostics: &mut Diagnostics,
) {
    let request = NewVersionRequest {
        deadline: deadline.map(|d| d.to_rfc3339_opts(SecondsFormat::Secs, true)),
    };
    let body = match serde_json::to_string(&request) {
        Ok(body) => body,
        Err(e) => {
            diagnostics.warn(Warning::drain_notify(format!(
                "could not encode drain request: {}",
                e
            )));
            return;
        }
    };

    let probe = HttpProbe::post_json(
        settings.port,
        settings.new_version_path.as_str(),
        body,
        settings.request_timeout,
    );
    match host.http(&probe).await {
        Ok(reply) if reply.is_success() => {
            tracing::debug!("Old instance on port {} accepted drain request", settings.port);
        }
        Ok(reply) => diagnostics.warn(Warning::drain_notify(format!(
            "{} returned HTTP {}; sessions will not be told about the new version",
            probe.url(),
            reply.status
        ))),
        Err(e) => diagnostics.warn(Warning::drain_notify(format!(
            "could not notify old instance: {}",
            e
        ))),
    }
}

/// Poll until the pinned count reaches zero. Only returns then.
async fn poll_until_drained<H: HostOps + ?Sized>(
    host: &H,
    settings: &DrainSettings,
    diagnostics: &mut Diagnostics,
    last_count: &mut Option<u32>,
) {
    loop {
        tokio::time::sleep(settings.poll_interval).await;

        // The deadline arm of the race ends a query still in flight at the deadline.
        let per_call = settings.request_timeout;
        let count = match tokio::time::timeout(per_call, active_users(host, settings, per_call)).await
        {
            Ok(Ok(count)) => count,
            Ok(Err(reason)) => {
                diagnostics.warn(Warning::drain_count(format!(
                    "pinned session count unavailable ({}); treating as 0",
                    reason
                )));
                0
            }
            Err(_) => {
                diagnostics.warn(Warning::drain_count(format!(
                    "pinned session count timed out after {:?}; treating as 0",
                    per_call
                )));
                0
            }
        };

        *last_count = Some(count);
        tracing::debug!("{} pinned session(s) on port {}", count, settings.port);
        if count == 0 {
            return;
        }
    }
}

async fn active_users<H: HostOps + ?Sized>(
    host: &H,
    settings: &DrainSettings,
    timeout: Duration,
) -> Result<u32, String> {
    let probe = HttpProbe::get(settings.port, settings.active_users_path.as_str(), timeout);
    let reply = host.http(&probe).await.map_err(|e| e.to_string())?;
    if !reply.is_success() {
        return Err(format!("{} returned HTTP {}", probe.url(), reply.status));
    }
    parse_count(&reply.body)
}

fn parse_count(body: &str) -> Result<u32, String> {
    serde_json::from_str::<ActiveUsers>(body)
        .map(|users| users.count)
        .map_err(|e| format!("unexpected body {:?}: {}", body.trim(), e))
}
