// ABOUTME: Integration tests for the management API over real HTTP.
// ABOUTME: The drain client talks to a served registry through LocalHost.

mod support;

use std::sync::Arc;
use std::time::Duration;

use slotswap::config::{GracefulConfig, SlotPorts};
use slotswap::deploy::{DrainOutcome, DrainSettings, Signal, drain_sessions};
use slotswap::diagnostics::{Diagnostics, WarningKind};
use slotswap::host::{HostOps, HttpProbe, LocalHost};
use slotswap::management;
use slotswap::registry::{
    InMemorySessionRegistry, SessionEvent, SessionHandle, SessionRegistry, SessionState,
};
use slotswap::types::{SessionId, Slot};
use tokio::net::TcpListener;
use tokio::time::Instant;

async fn serve(registry: Arc<InMemorySessionRegistry>) -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(management::serve(listener, registry));
    port
}

fn settings(port: u16) -> DrainSettings {
    settings_with_deadline(port, Duration::from_secs(10))
}

fn settings_with_deadline(port: u16, timeout: Duration) -> DrainSettings {
    let graceful = GracefulConfig {
        timeout,
        poll_interval: Duration::from_millis(50),
        request_timeout: Duration::from_secs(2),
        ..GracefulConfig::default()
    };
    DrainSettings::new(&graceful, SlotPorts::new(port))
}

#[tokio::test]
async fn active_users_reports_pinned_sessions_only() {
    support::init_tracing();
    let registry = Arc::new(InMemorySessionRegistry::new(Slot::Blue));
    for id in ["a", "b", "c"] {
        let (handle, _events) = SessionHandle::channel(SessionId::new(id));
        registry.register(handle).unwrap();
    }
    registry.pin(&SessionId::new("a")).unwrap();
    registry.pin(&SessionId::new("b")).unwrap();
    let port = serve(registry).await;

    let reply = LocalHost::new()
        .http(&HttpProbe::get(port, "/active-users", Duration::from_secs(2)))
        .await
        .unwrap();

    assert_eq!(reply.status, 200);
    let body: serde_json::Value = serde_json::from_str(&reply.body).unwrap();
    assert_eq!(body["count"], 2);
}

#[tokio::test]
async fn new_version_accepts_an_empty_body() {
    let registry = Arc::new(InMemorySessionRegistry::new(Slot::Green));
    let (handle, mut events) = SessionHandle::channel(SessionId::new("s1"));
    registry.register(handle).unwrap();
    let port = serve(registry.clone()).await;

    let reply = LocalHost::new()
        .http(&HttpProbe::post_json(
            port,
            "/new-version",
            String::new(),
            Duration::from_secs(2),
        ))
        .await
        .unwrap();

    assert_eq!(reply.status, 204);
    let snapshot = registry.snapshot(&SessionId::new("s1")).unwrap();
    assert!(matches!(snapshot.state, SessionState::Migrating { .. }));
    let mut migrated = false;
    while let Ok(event) = events.try_recv() {
        migrated |= matches!(event, SessionEvent::Migrate { .. });
    }
    assert!(migrated);
}

#[tokio::test]
async fn drain_completes_once_pinned_users_upgrade() {
    let registry = Arc::new(InMemorySessionRegistry::new(Slot::Blue));
    let id = SessionId::new("pinned");
    let (handle, mut events) = SessionHandle::channel(id.clone());
    registry.register(handle).unwrap();
    registry.pin(&id).unwrap();
    let port = serve(registry.clone()).await;

    // The user accepts the upgrade as soon as they hear about it.
    let client = registry.clone();
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            if let SessionEvent::DrainNotice { deadline } = event {
                assert!(deadline.is_some());
                client.self_migrate(&id).unwrap();
            }
        }
    });

    let mut diagnostics = Diagnostics::default();
    let outcome = drain_sessions(
        &LocalHost::new(),
        &settings(port),
        Signal::never(),
        &mut diagnostics,
    )
    .await;

    assert_eq!(outcome, DrainOutcome::Drained);
    assert!(!diagnostics.has_warnings(), "{:?}", diagnostics.warnings());
    assert_eq!(registry.pinned_count(), 0);
}

#[tokio::test]
async fn drain_against_a_stopped_instance_fails_open() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let mut diagnostics = Diagnostics::default();
    let outcome = drain_sessions(
        &LocalHost::new(),
        &settings(port),
        Signal::never(),
        &mut diagnostics,
    )
    .await;

    assert_eq!(outcome, DrainOutcome::Drained);
    assert_eq!(diagnostics.warnings().len(), 2);
}

#[tokio::test]
async fn user_who_never_upgrades_holds_the_drain_until_the_deadline() {
    let registry = Arc::new(InMemorySessionRegistry::new(Slot::Blue));
    let upgrades = SessionId::new("upgrades");
    let stays = SessionId::new("stays");
    let mut channels = Vec::new();
    for id in [&upgrades, &stays] {
        let (handle, events) = SessionHandle::channel(id.clone());
        registry.register(handle).unwrap();
        registry.pin(id).unwrap();
        channels.push(events);
    }
    let port = serve(registry.clone()).await;

    // One user upgrades a third of the way into the drain; the other never answers.
    let client = registry.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        client.self_migrate(&upgrades).unwrap();
    });

    let mut diagnostics = Diagnostics::default();
    let started = Instant::now();
    let outcome = drain_sessions(
        &LocalHost::new(),
        &settings_with_deadline(port, Duration::from_millis(600)),
        Signal::never(),
        &mut diagnostics,
    )
    .await;

    assert_eq!(outcome, DrainOutcome::TimedOut { remaining: Some(1) });
    assert!(started.elapsed() >= Duration::from_millis(600));
    assert_eq!(registry.pinned_count(), 1);
    assert_eq!(diagnostics.count(WarningKind::DrainTimeout), 1);
    assert_eq!(diagnostics.count(WarningKind::DrainCountUnavailable), 0);

    for events in &mut channels {
        let mut noticed = false;
        while let Ok(event) = events.try_recv() {
            noticed |= matches!(event, SessionEvent::DrainNotice { .. });
        }
        assert!(noticed, "every pinned session is offered the upgrade");
    }
}
