// ABOUTME: Session registry run inside each application instance.
// ABOUTME: Tracks attached and pinned sessions and pushes migration instructions to them.

mod error;
mod memory;
mod session;

pub use error::{RegistryError, Result};
pub use memory::InMemorySessionRegistry;
pub use session::{MIGRATION_COOKIE, MigrationReason, SessionEvent, SessionHandle, SessionState};

use chrono::{DateTime, Utc};

use crate::types::{SessionId, Slot};

/// State of one registered session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub state: SessionState,
    /// Last value written to the migration cookie.
    pub reason: MigrationReason,
}

/// Registry of sessions attached to this instance.
///
/// Completed writes are visible to the next read from any thread.
pub trait SessionRegistry: Send + Sync {
    /// Slot this instance serves.
    fn slot(&self) -> Slot;

    /// Track a newly attached session, greeting it if it just migrated here.
    fn register(&self, session: SessionHandle) -> Result<()>;

    /// Forget a detached session. Returns whether it was registered.
    fn unregister(&self, id: &SessionId) -> bool;

    /// Keep the session on this slot across the next deploy.
    ///
    /// Idempotent. Rejected for unknown and already-migrating sessions.
    fn pin(&self, id: &SessionId) -> Result<()>;

    /// The user chose to move to the new version now.
    fn self_migrate(&self, id: &SessionId) -> Result<()>;

    fn count(&self) -> usize;

    /// Sessions that still hold this slot open.
    fn pinned_count(&self) -> usize;

    fn snapshot(&self, id: &SessionId) -> Option<SessionSnapshot>;

    /// A new version is live elsewhere.
    ///
    /// Pinned sessions are offered an upgrade before `deadline`; all others
    /// are told to migrate right away.
    fn on_drain_requested(&self, deadline: Option<DateTime<Utc>>);
}
