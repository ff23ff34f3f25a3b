// ABOUTME: Integration tests for the swap controller against an in-memory host.
// ABOUTME: Covers immediate swaps, failed health gates, lock contention and commit ordering.

mod support;

use std::cell::RefCell;

use slotswap::config::ProxyKind;
use slotswap::deploy::{
    DeployError, DeployErrorKind, DeployLock, SwapEvent, SwapMode, Signals, run_swap,
};
use slotswap::diagnostics::WarningKind;
use slotswap::error::{EXIT_LOCK_HELD, EXIT_UNHEALTHY, Error};
use slotswap::host::UnitAction;
use slotswap::proxy::{ProxyConfigurator, Site};
use slotswap::types::{AppName, Slot};
use support::fake_host::{Call, FakeHost, Response};
use support::{CADDYFILE, LOCK, MARKER, plan};

/// Blue active and running, green answers once started.
fn blue_active() -> FakeHost {
    FakeHost::new()
        .with_file(MARKER, "blue\n")
        .with_running("shop-blue")
        .respond(8081, "/", vec![Response::ok("ok")])
}

#[tokio::test(start_paused = true)]
async fn immediate_swap_moves_traffic_and_commits() {
    support::init_tracing();
    let host = blue_active();
    let events = RefCell::new(Vec::new());

    let report = run_swap(&host, plan(), SwapMode::Immediate, Signals::none(), |e| {
        events.borrow_mut().push(e)
    })
    .await
    .unwrap();

    assert_eq!(report.previous, Slot::Blue);
    assert_eq!(report.active, Slot::Green);
    assert!(report.drain.is_none());
    assert!(report.warnings.is_empty());

    assert_eq!(host.file(MARKER).as_deref(), Some("green\n"));
    assert_eq!(
        host.file(CADDYFILE).as_deref(),
        Some("shop.example.com {\n    reverse_proxy localhost:8081\n}\n")
    );
    assert!(host.is_running("shop-green"));
    assert!(!host.is_running("shop-blue"));
    assert!(!host.has_dir(LOCK));

    assert_eq!(
        host.unit_calls(),
        vec![
            (UnitAction::Stop, "shop-green".to_string()),
            (UnitAction::Start, "shop-green".to_string()),
            (UnitAction::Reload, "caddy".to_string()),
            (UnitAction::Stop, "shop-blue".to_string()),
            (UnitAction::Enable, "shop-green".to_string()),
            (UnitAction::Disable, "shop-blue".to_string()),
        ]
    );

    let events = events.into_inner();
    assert_eq!(
        events.first(),
        Some(&SwapEvent::Locked {
            active: Slot::Blue,
            target: Slot::Green
        })
    );
    assert_eq!(
        events.last(),
        Some(&SwapEvent::Committed {
            active: Slot::Green
        })
    );
}

#[tokio::test(start_paused = true)]
async fn missing_marker_means_blue_is_active() {
    let host = FakeHost::new().respond(8081, "/", vec![Response::ok("")]);

    let report = run_swap(&host, plan(), SwapMode::Immediate, Signals::none(), |_| {})
        .await
        .unwrap();

    assert_eq!(report.previous, Slot::Blue);
    assert_eq!(host.file(MARKER).as_deref(), Some("green\n"));
}

#[tokio::test(start_paused = true)]
async fn swap_back_to_blue_from_green() {
    let host = FakeHost::new()
        .with_file(MARKER, "green\n")
        .with_running("shop-green")
        .respond(8080, "/", vec![Response::ok("")]);

    let report = run_swap(&host, plan(), SwapMode::Immediate, Signals::none(), |_| {})
        .await
        .unwrap();

    assert_eq!(report.active, Slot::Blue);
    assert_eq!(host.file(MARKER).as_deref(), Some("blue\n"));
    assert!(host.file(CADDYFILE).unwrap().contains("localhost:8080"));
}

#[tokio::test(start_paused = true)]
async fn any_http_status_counts_as_healthy() {
    let host = FakeHost::new()
        .with_file(MARKER, "blue\n")
        .respond(8081, "/", vec![Response::Reply(503, String::new())]);

    let report = run_swap(&host, plan(), SwapMode::Immediate, Signals::none(), |_| {}).await;

    assert_eq!(report.unwrap().active, Slot::Green);
}

#[tokio::test(start_paused = true)]
async fn health_retries_until_the_new_slot_answers() {
    let host = FakeHost::new().with_file(MARKER, "blue\n").respond(
        8081,
        "/",
        vec![Response::Unreachable, Response::Unreachable, Response::ok("")],
    );

    run_swap(&host, plan(), SwapMode::Immediate, Signals::none(), |_| {})
        .await
        .unwrap();

    assert_eq!(host.requests_to(8081, "/").len(), 3);
}

#[tokio::test(start_paused = true)]
async fn unhealthy_slot_is_rolled_back_without_touching_traffic() {
    let host = FakeHost::new()
        .with_file(MARKER, "blue\n")
        .with_running("shop-blue");
    let events = RefCell::new(Vec::new());

    let err = run_swap(&host, plan(), SwapMode::Immediate, Signals::none(), |e| {
        events.borrow_mut().push(e)
    })
    .await
    .unwrap_err();

    assert!(matches!(
        err,
        DeployError::HealthCheckFailed { attempts: 3, .. }
    ));
    assert_eq!(err.exit_code(), EXIT_UNHEALTHY);
    assert_eq!(host.requests_to(8081, "/").len(), 3);

    assert_eq!(host.file(MARKER).as_deref(), Some("blue\n"));
    assert!(host.writes_to(CADDYFILE).is_empty());
    assert!(host.is_running("shop-blue"));
    assert!(!host.is_running("shop-green"));
    assert!(!host.has_dir(LOCK));
    assert!(
        events.borrow().contains(&SwapEvent::RolledBack {
            unit: "shop-green".to_string()
        })
    );
}

#[tokio::test(start_paused = true)]
async fn dead_process_ends_health_check_early() {
    let host = FakeHost::new()
        .with_file(MARKER, "blue\n")
        .crashing("shop-green")
        .respond(8081, "/", vec![Response::ok("")]);

    let err = run_swap(&host, plan(), SwapMode::Immediate, Signals::none(), |_| {})
        .await
        .unwrap_err();

    assert!(matches!(err, DeployError::ProcessExited { attempt: 1, .. }));
    assert_eq!(err.kind(), DeployErrorKind::Unhealthy);
    assert!(host.requests_to(8081, "/").is_empty());
    assert_eq!(host.file(MARKER).as_deref(), Some("blue\n"));
}

#[tokio::test(start_paused = true)]
async fn held_lock_fails_without_mutating_the_host() {
    let host = blue_active().with_dir(LOCK);

    let err = run_swap(&host, plan(), SwapMode::Immediate, Signals::none(), |_| {})
        .await
        .unwrap_err();

    assert_eq!(err.kind(), DeployErrorKind::LockHeld);
    assert_eq!(err.exit_code(), EXIT_LOCK_HELD);
    assert_eq!(Error::from(err).exit_code(), EXIT_LOCK_HELD);
    assert!(host.unit_calls().is_empty());
    assert!(host.writes_to(MARKER).is_empty());
    assert!(host.has_dir(LOCK), "someone else's lock must stay");
}

#[tokio::test(start_paused = true)]
async fn held_lock_error_names_the_holder() {
    let host = FakeHost::new().with_file(MARKER, "blue\n");
    let app = AppName::new("shop").unwrap();
    let held = DeployLock::acquire(&host, LOCK, &app).await.unwrap();

    let err = run_swap(&host, plan(), SwapMode::Immediate, Signals::none(), |_| {})
        .await
        .unwrap_err();

    let DeployError::LockHeld { holder, path } = &err else {
        panic!("expected LockHeld, got {err:?}");
    };
    assert_eq!(path, LOCK);
    assert_eq!(holder.as_ref().unwrap().pid, std::process::id());
    assert!(err.to_string().contains("slotswap unlock"));

    held.release(&host).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn changed_active_slot_is_rejected_before_starting() {
    let host = blue_active();
    let plan = plan().expecting_active(Slot::Green);

    let err = run_swap(&host, plan, SwapMode::Immediate, Signals::none(), |_| {})
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        DeployError::ActiveChanged {
            expected: Slot::Green,
            found: Slot::Blue
        }
    ));
    assert!(host.unit_calls().is_empty());
    assert!(!host.has_dir(LOCK));
}

#[tokio::test(start_paused = true)]
async fn failed_start_passes_the_systemctl_status_through() {
    let host = blue_active().failing_unit(UnitAction::Start, "shop-green", 5);

    let err = run_swap(&host, plan(), SwapMode::Immediate, Signals::none(), |_| {})
        .await
        .unwrap_err();

    assert_eq!(err.kind(), DeployErrorKind::Host);
    assert_eq!(err.exit_code(), 5);
    assert!(!host.has_dir(LOCK));
}

#[tokio::test(start_paused = true)]
async fn stale_stop_failure_is_ignored() {
    let host = blue_active().failing_unit(UnitAction::Stop, "shop-green", 5);

    let report = run_swap(&host, plan(), SwapMode::Immediate, Signals::none(), |_| {}).await;

    assert_eq!(report.unwrap().active, Slot::Green);
}

#[tokio::test(start_paused = true)]
async fn old_service_stop_failure_is_a_warning() {
    let host = blue_active().failing_unit(UnitAction::Stop, "shop-blue", 1);

    let report = run_swap(&host, plan(), SwapMode::Immediate, Signals::none(), |_| {})
        .await
        .unwrap();

    assert_eq!(report.warnings.len(), 1);
    assert!(report.warnings[0].message.contains("shop-blue"));
    assert_eq!(host.file(MARKER).as_deref(), Some("green\n"));
}

#[tokio::test(start_paused = true)]
async fn enable_failure_leaves_the_marker_on_the_old_slot() {
    let host = blue_active().failing_unit(UnitAction::Enable, "shop-green", 1);

    let err = run_swap(&host, plan(), SwapMode::Immediate, Signals::none(), |_| {})
        .await
        .unwrap_err();

    assert_eq!(err.kind(), DeployErrorKind::Host);
    assert_eq!(host.file(MARKER).as_deref(), Some("blue\n"));
    assert!(!host.has_dir(LOCK));
}

#[tokio::test(start_paused = true)]
async fn marker_is_written_after_enablement_flips() {
    let host = blue_active();

    run_swap(&host, plan(), SwapMode::Immediate, Signals::none(), |_| {})
        .await
        .unwrap();

    let disable = host
        .position(|c| *c == Call::Unit(UnitAction::Disable, "shop-blue".to_string()))
        .unwrap();
    let marker = host
        .position(|c| matches!(c, Call::Write { path, .. } if path == MARKER))
        .unwrap();
    let release = host
        .position(|c| *c == Call::Remove(LOCK.to_string()))
        .unwrap();
    assert!(disable < marker);
    assert!(marker < release);
}

#[tokio::test(start_paused = true)]
async fn unmanaged_proxy_leaves_routing_alone() {
    let host = blue_active();
    let mut plan = plan();
    plan.proxy = ProxyConfigurator::new(
        ProxyKind::None,
        Site {
            domain: "shop.example.com".to_string(),
            https: true,
        },
    );

    let report = run_swap(&host, plan, SwapMode::Graceful, Signals::none(), |_| {})
        .await
        .unwrap();

    assert!(report.drain.is_none(), "graceful falls back to immediate");
    assert!(host.writes_to(CADDYFILE).is_empty());
    assert!(
        !host
            .unit_calls()
            .contains(&(UnitAction::Reload, "caddy".to_string()))
    );
    assert_eq!(host.file(MARKER).as_deref(), Some("green\n"));
}

#[tokio::test(start_paused = true)]
async fn proxy_reload_failure_keeps_the_old_marker() {
    let host = blue_active().failing_unit(UnitAction::Reload, "caddy", 1);

    let err = run_swap(&host, plan(), SwapMode::Immediate, Signals::none(), |_| {})
        .await
        .unwrap_err();

    assert!(err.to_string().contains("cut over"));
    assert_eq!(host.file(MARKER).as_deref(), Some("blue\n"));
    assert!(host.is_running("shop-blue"));
}

#[tokio::test(start_paused = true)]
async fn second_swap_after_a_commit_goes_the_other_way() {
    let host = FakeHost::new()
        .with_file(MARKER, "blue\n")
        .respond(8081, "/", vec![Response::ok("")])
        .respond(8080, "/", vec![Response::ok("")]);

    let first = run_swap(&host, plan(), SwapMode::Immediate, Signals::none(), |_| {})
        .await
        .unwrap();
    let second = run_swap(&host, plan(), SwapMode::Immediate, Signals::none(), |_| {})
        .await
        .unwrap();

    assert_eq!(first.active, Slot::Green);
    assert_eq!(second.active, Slot::Blue);
    assert_eq!(host.file(MARKER).as_deref(), Some("blue\n"));
}

#[tokio::test(start_paused = true)]
async fn lock_left_behind_is_reported_with_the_committed_swap() {
    let host = blue_active().failing_remove(LOCK);

    let report = run_swap(&host, plan(), SwapMode::Immediate, Signals::none(), |_| {})
        .await
        .unwrap();

    assert_eq!(report.active, Slot::Green);
    assert_eq!(report.warnings.len(), 1);
    assert_eq!(report.warnings[0].kind, WarningKind::LockRelease);
    assert!(host.has_dir(LOCK));
}
