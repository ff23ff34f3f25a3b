// ABOUTME: Session-side types: migration reasons, lifecycle states and pushed events.
// ABOUTME: A session is reached only through its event channel.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc;

use crate::types::SessionId;

/// Cookie telling the next instance why a session arrived.
pub const MIGRATION_COOKIE: &str = "MIGRATION_TYPE";

/// Why a session moved (or will move) to the new slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationReason {
    #[default]
    None,
    /// Moved without asking; the session was not pinned.
    Auto,
    /// The user chose to upgrade.
    User,
    /// Pinned session moved when the old slot went away.
    Forced,
}

impl MigrationReason {
    /// Value stored in [`MIGRATION_COOKIE`].
    pub fn cookie_value(self) -> Option<&'static str> {
        match self {
            MigrationReason::None => None,
            MigrationReason::Auto => Some("AUTO"),
            MigrationReason::User => Some("USER"),
            MigrationReason::Forced => Some("FORCED"),
        }
    }

    pub fn from_cookie(value: &str) -> Option<Self> {
        match value.trim() {
            "AUTO" => Some(MigrationReason::Auto),
            "USER" => Some(MigrationReason::User),
            "FORCED" => Some(MigrationReason::Forced),
            _ => None,
        }
    }

    /// Message shown to a session arriving for this reason.
    pub fn greeting(self) -> &'static str {
        match self {
            MigrationReason::Auto => {
                "Hello old user! You were automatically upgraded to a new version."
            }
            MigrationReason::User => "Welcome to the new version!",
            MigrationReason::Forced => "Sorry, we had to migrate you forcefully.",
            MigrationReason::None => "Hello user, you were just brought to a new version.",
        }
    }
}

/// Where a session is in the drain protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unpinned,
    Pinned,
    /// Pinned and told about the new version; the user picks when to move.
    AwaitingUserChoice { deadline: Option<DateTime<Utc>> },
    /// Told to reload onto the new slot.
    Migrating { reason: MigrationReason },
}

impl SessionState {
    /// Counted by the drain poll.
    pub fn is_pinned(&self) -> bool {
        matches!(
            self,
            SessionState::Pinned | SessionState::AwaitingUserChoice { .. }
        )
    }
}

/// Instructions pushed to a session's client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    SetCookie { name: String, value: String },
    ClearCookie { name: String },
    /// A new version is live; offer an upgrade before `deadline`.
    DrainNotice { deadline: Option<DateTime<Utc>> },
    /// Reload now so the proxy routes to the new slot.
    Migrate { reason: MigrationReason },
    /// Greeting for a session that just came over from the old slot.
    Arrived {
        reason: MigrationReason,
        message: String,
    },
    /// Confirmation shown after pinning.
    Pinned { message: String },
}

/// A client session as seen by the registry.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    id: SessionId,
    arrived_via: Option<String>,
    events: mpsc::UnboundedSender<SessionEvent>,
}

impl SessionHandle {
    pub fn new(id: SessionId, events: mpsc::UnboundedSender<SessionEvent>) -> Self {
        Self {
            id,
            arrived_via: None,
            events,
        }
    }

    /// Handle plus the receiving end of its event channel.
    pub fn channel(id: SessionId) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(id, tx), rx)
    }

    /// Record the migration cookie the client presented on attach.
    pub fn with_migration_cookie(mut self, value: Option<&str>) -> Self {
        self.arrived_via = value
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string);
        self
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub(crate) fn arrived_via(&self) -> Option<&str> {
        self.arrived_via.as_deref()
    }

    /// Push an event. A closed channel means the client is gone; ignore it.
    pub(crate) fn send(&self, event: SessionEvent) {
        if self.events.send(event).is_err() {
            tracing::debug!("Session {} no longer listening", self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookie_values_roundtrip() {
        for reason in [
            MigrationReason::Auto,
            MigrationReason::User,
            MigrationReason::Forced,
        ] {
            let value = reason.cookie_value().unwrap();
            assert_eq!(MigrationReason::from_cookie(value), Some(reason));
        }
        assert_eq!(MigrationReason::None.cookie_value(), None);
        assert_eq!(MigrationReason::from_cookie("SOMETHING"), None);
    }

    #[test]
    fn blank_migration_cookie_is_ignored() {
        let (handle, _rx) = SessionHandle::channel(SessionId::new("s1"));
        let handle = handle.with_migration_cookie(Some("  "));
        assert!(handle.arrived_via().is_none());
    }

    #[test]
    fn awaiting_choice_still_counts_as_pinned() {
        assert!(SessionState::Pinned.is_pinned());
        assert!(SessionState::AwaitingUserChoice { deadline: None }.is_pinned());
        assert!(!SessionState::Unpinned.is_pinned());
        assert!(
            !SessionState::Migrating {
                reason: MigrationReason::User
            }
            .is_pinned()
        );
    }
}
