// ABOUTME: Test support utilities.
// ABOUTME: Provides the in-memory host fake and a ready-made swap plan.

use std::sync::Once;
use std::time::Duration;

use slotswap::config::{
    GracefulConfig, HealthConfig, ProxyKind, SlotsConfig,
};
use slotswap::deploy::SwapPlan;
use slotswap::proxy::{ProxyConfigurator, Site};
use slotswap::types::AppName;

// Each test binary only uses some of these items, so allow dead_code.
#[allow(dead_code)]
pub mod fake_host;

#[allow(dead_code)]
pub const MARKER: &str = "/home/shop/active";
#[allow(dead_code)]
pub const LOCK: &str = "/home/shop/deploy.lock";
#[allow(dead_code)]
pub const CADDYFILE: &str = "/etc/caddy/Caddyfile";

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests. Safe to call multiple times.
#[allow(dead_code)]
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        let filter = EnvFilter::from_default_env()
            .add_directive("slotswap=debug".parse().unwrap());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// Plan for app `shop` on blue 8080 / green 8081 behind Caddy.
///
/// Health: 3 attempts, 1s apart. Drain: 60s deadline, polled every 5s.
#[allow(dead_code)]
pub fn plan() -> SwapPlan {
    SwapPlan {
        app: AppName::new("shop").unwrap(),
        slots: SlotsConfig::default(),
        health: HealthConfig {
            path: "/".to_string(),
            attempts: 3,
            interval: Duration::from_secs(1),
            timeout: Duration::from_secs(1),
        },
        graceful: GracefulConfig {
            enabled: true,
            timeout: Duration::from_secs(60),
            poll_interval: Duration::from_secs(5),
            request_timeout: Duration::from_secs(2),
            ..GracefulConfig::default()
        },
        proxy: ProxyConfigurator::new(
            ProxyKind::Caddy,
            Site {
                domain: "shop.example.com".to_string(),
                https: true,
            },
        ),
        expected_active: None,
    }
}
