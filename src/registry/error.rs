// ABOUTME: Error types for session registry operations.
// ABOUTME: Rejections of operations on unknown, duplicate or already-departing sessions.

use crate::types::SessionId;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("session {0} is not registered")]
    UnknownSession(SessionId),

    #[error("session {0} is already registered")]
    AlreadyRegistered(SessionId),

    #[error("session {0} is migrating and cannot be pinned")]
    Migrating(SessionId),
}

pub type Result<T> = std::result::Result<T, RegistryError>;
