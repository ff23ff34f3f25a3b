// ABOUTME: Handlers for the management endpoints.
// ABOUTME: The drain request body is optional and never rejected.

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ManagementState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveUsers {
    pub count: usize,
}

#[derive(Debug, Default, Deserialize)]
pub struct NewVersionRequest {
    #[serde(default)]
    pub deadline: Option<String>,
}

/// GET /active-users
pub async fn active_users(State(state): State<ManagementState>) -> Json<ActiveUsers> {
    Json(ActiveUsers {
        count: state.registry.pinned_count(),
    })
}

/// POST /new-version
pub async fn new_version(State(state): State<ManagementState>, body: Bytes) -> StatusCode {
    let request = if body.iter().all(u8::is_ascii_whitespace) {
        NewVersionRequest::default()
    } else {
        serde_json::from_slice(&body).unwrap_or_else(|e| {
            tracing::warn!("Ignoring malformed drain request: {}", e);
            NewVersionRequest::default()
        })
    };

    let deadline = request.deadline.as_deref().and_then(parse_deadline);
    state.registry.on_drain_requested(deadline);
    StatusCode::NO_CONTENT
}

/// Parse an RFC3339 timestamp. Blank or invalid input means no deadline.
pub fn parse_deadline(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    match DateTime::parse_from_rfc3339(value) {
        Ok(deadline) => Some(deadline.with_timezone(&Utc)),
        Err(e) => {
            tracing::warn!("Ignoring unparseable deadline {:?}: {}", value, e);
            None
        }
    }
}
