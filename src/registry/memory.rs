// ABOUTME: In-process session registry backed by a lock-protected map.
// ABOUTME: Shared via Arc between the hosting app and the management API.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::config::DEFAULT_SLOT_COOKIE;
use crate::types::{SessionId, Slot};

use super::error::{RegistryError, Result};
use super::session::{MIGRATION_COOKIE, MigrationReason, SessionEvent, SessionHandle, SessionState};
use super::{SessionRegistry, SessionSnapshot};

struct Entry {
    handle: SessionHandle,
    state: SessionState,
    reason: MigrationReason,
}

impl Entry {
    fn set_cookie(&self, name: &str, value: &str) {
        self.handle.send(SessionEvent::SetCookie {
            name: name.to_string(),
            value: value.to_string(),
        });
    }

    fn clear_cookie(&self, name: &str) {
        self.handle.send(SessionEvent::ClearCookie {
            name: name.to_string(),
        });
    }

    fn set_reason(&mut self, reason: MigrationReason) {
        if let Some(value) = reason.cookie_value() {
            self.set_cookie(MIGRATION_COOKIE, value);
        }
        self.reason = reason;
    }
}

/// Sessions attached to one application instance.
pub struct InMemorySessionRegistry {
    slot: Slot,
    slot_cookie: String,
    sessions: RwLock<HashMap<SessionId, Entry>>,
}

impl InMemorySessionRegistry {
    pub fn new(slot: Slot) -> Self {
        Self::with_cookie(slot, DEFAULT_SLOT_COOKIE)
    }

    /// Use a custom name for the cookie the proxy matches pinned sessions on.
    pub fn with_cookie(slot: Slot, slot_cookie: impl Into<String>) -> Self {
        Self {
            slot,
            slot_cookie: slot_cookie.into(),
            sessions: RwLock::new(HashMap::new()),
        }
    }
}

impl std::fmt::Debug for InMemorySessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemorySessionRegistry")
            .field("slot", &self.slot)
            .field("sessions", &self.sessions.read().len())
            .finish()
    }
}

impl SessionRegistry for InMemorySessionRegistry {
    fn slot(&self) -> Slot {
        self.slot
    }

    fn register(&self, session: SessionHandle) -> Result<()> {
        let mut sessions = self.sessions.write();
        let id = session.id().clone();
        if sessions.contains_key(&id) {
            return Err(RegistryError::AlreadyRegistered(id));
        }

        let entry = Entry {
            handle: session,
            state: SessionState::Unpinned,
            reason: MigrationReason::None,
        };

        if let Some(cookie) = entry.handle.arrived_via() {
            let reason = MigrationReason::from_cookie(cookie).unwrap_or_default();
            tracing::debug!("Session {} arrived on {} ({:?})", id, self.slot, reason);
            entry.handle.send(SessionEvent::Arrived {
                reason,
                message: reason.greeting().to_string(),
            });
            entry.clear_cookie(MIGRATION_COOKIE);
        }

        sessions.insert(id, entry);
        Ok(())
    }

    fn unregister(&self, id: &SessionId) -> bool {
        self.sessions.write().remove(id).is_some()
    }

    fn pin(&self, id: &SessionId) -> Result<()> {
        let mut sessions = self.sessions.write();
        let entry = sessions
            .get_mut(id)
            .ok_or_else(|| RegistryError::UnknownSession(id.clone()))?;

        match entry.state {
            SessionState::Pinned | SessionState::AwaitingUserChoice { .. } => Ok(()),
            SessionState::Migrating { .. } => Err(RegistryError::Migrating(id.clone())),
            SessionState::Unpinned => {
                entry.set_cookie(&self.slot_cookie, self.slot.as_str());
                // Overwritten with USER if the session later upgrades on its own.
                entry.set_reason(MigrationReason::Forced);
                entry.state = SessionState::Pinned;
                entry.handle.send(SessionEvent::Pinned {
                    message: format!(
                        "Now you are fixed to {}. On a new version, you'll have a chance to choose your upgrade time.",
                        self.slot
                    ),
                });
                Ok(())
            }
        }
    }

    fn self_migrate(&self, id: &SessionId) -> Result<()> {
        let mut sessions = self.sessions.write();
        let entry = sessions
            .get_mut(id)
            .ok_or_else(|| RegistryError::UnknownSession(id.clone()))?;

        if matches!(entry.state, SessionState::Migrating { .. }) {
            return Ok(());
        }

        entry.clear_cookie(&self.slot_cookie);
        entry.set_reason(MigrationReason::User);
        entry.state = SessionState::Migrating {
            reason: MigrationReason::User,
        };
        entry.handle.send(SessionEvent::Migrate {
            reason: MigrationReason::User,
        });
        Ok(())
    }

    fn count(&self) -> usize {
        self.sessions.read().len()
    }

    fn pinned_count(&self) -> usize {
        self.sessions
            .read()
            .values()
            .filter(|entry| entry.state.is_pinned())
            .count()
    }

    fn snapshot(&self, id: &SessionId) -> Option<SessionSnapshot> {
        self.sessions.read().get(id).map(|entry| SessionSnapshot {
            state: entry.state,
            reason: entry.reason,
        })
    }

    fn on_drain_requested(&self, deadline: Option<DateTime<Utc>>) {
        let mut sessions = self.sessions.write();
        tracing::info!(
            "New version announced; draining {} session(s) from {}",
            sessions.len(),
            self.slot
        );

        for entry in sessions.values_mut() {
            match entry.state {
                SessionState::Pinned | SessionState::AwaitingUserChoice { .. } => {
                    entry.state = SessionState::AwaitingUserChoice { deadline };
                    entry.handle.send(SessionEvent::DrainNotice { deadline });
                }
                SessionState::Unpinned => {
                    entry.set_reason(MigrationReason::Auto);
                    entry.state = SessionState::Migrating {
                        reason: MigrationReason::Auto,
                    };
                    entry.handle.send(SessionEvent::Migrate {
                        reason: MigrationReason::Auto,
                    });
                }
                SessionState::Migrating { .. } => {}
            }
        }
    }
}
