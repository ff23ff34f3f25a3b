// ABOUTME: Reverse proxy routing for the two slots.
// ABOUTME: Renders single-upstream or cookie-split rules, writes them atomically and reloads.

mod caddy;

pub use caddy::render_caddyfile;

use crate::config::{Config, ProxyKind};
use crate::host::{HostError, HostOps, UnitAction};
use crate::types::Slot;

pub const CADDYFILE_PATH: &str = "/etc/caddy/Caddyfile";
pub const CADDY_UNIT: &str = "caddy";

/// Where traffic goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Routes {
    /// Everything to one port.
    Single { port: u16 },
    /// Requests carrying `cookie=<pinned_slot>` stay on `pinned_port`;
    /// everything else goes to `fallback_port`.
    Split {
        cookie: String,
        pinned_slot: Slot,
        pinned_port: u16,
        fallback_port: u16,
    },
}

/// Public address the proxy serves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Site {
    pub domain: String,
    pub https: bool,
}

impl Site {
    /// Caddy site address; a bare domain enables automatic HTTPS.
    pub fn address(&self) -> String {
        if self.https {
            self.domain.clone()
        } else {
            format!("http://{}", self.domain)
        }
    }
}

/// Applies routing changes to the host's proxy.
#[derive(Debug, Clone)]
pub struct ProxyConfigurator {
    kind: ProxyKind,
    site: Site,
    path: String,
    unit: String,
}

impl ProxyConfigurator {
    pub fn new(kind: ProxyKind, site: Site) -> Self {
        Self {
            kind,
            site,
            path: CADDYFILE_PATH.to_string(),
            unit: CADDY_UNIT.to_string(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.proxy,
            Site {
                domain: config.domain.clone(),
                https: config.https,
            },
        )
    }

    pub fn is_managed(&self) -> bool {
        self.kind != ProxyKind::None
    }

    pub fn config_path(&self) -> &str {
        &self.path
    }

    /// Rendered config, or `None` when no proxy is managed.
    pub fn render(&self, routes: &Routes) -> Option<String> {
        match self.kind {
            ProxyKind::Caddy => Some(render_caddyfile(&self.site, routes)),
            ProxyKind::None => None,
        }
    }

    /// Write the routes and reload the proxy.
    ///
    /// Rendering is deterministic, so re-applying the same routes after a
    /// crash yields the same file.
    pub async fn apply<H: HostOps + ?Sized>(
        &self,
        host: &H,
        routes: &Routes,
    ) -> Result<(), HostError> {
        let Some(contents) = self.render(routes) else {
            tracing::debug!("No managed proxy, skipping route change");
            return Ok(());
        };

        tracing::debug!("Writing proxy routes to {}: {:?}", self.path, routes);
        host.write_file(&self.path, &contents).await?;
        host.unit(UnitAction::Reload, &self.unit).await
    }
}
