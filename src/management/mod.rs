//! Management API exposed by each application instance.
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/active-users` | Pinned sessions still on this instance |
//! | POST | `/new-version` | Announce a new version and start draining |

mod handlers;

pub use handlers::{ActiveUsers, NewVersionRequest, active_users, new_version, parse_deadline};

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tokio::net::TcpListener;

use crate::registry::SessionRegistry;

pub const ACTIVE_USERS_PATH: &str = "/active-users";
pub const NEW_VERSION_PATH: &str = "/new-version";

/// Shared state for management handlers.
#[derive(Clone)]
pub struct ManagementState {
    pub registry: Arc<dyn SessionRegistry>,
}

/// Build the management router.
pub fn router(registry: Arc<dyn SessionRegistry>) -> Router {
    Router::new()
        .route(ACTIVE_USERS_PATH, get(handlers::active_users))
        .route(NEW_VERSION_PATH, post(handlers::new_version))
        .with_state(ManagementState { registry })
}

/// Serve the management API until the returned future is dropped.
pub async fn serve(listener: TcpListener, registry: Arc<dyn SessionRegistry>) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        tracing::debug!("Management API listening on {}", addr);
    }
    axum::serve(listener, router(registry)).await
}
