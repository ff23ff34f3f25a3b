// ABOUTME: Validated domain types shared by the controller, orchestrator and registry.
// ABOUTME: Slot identities, application names and session identifiers.

mod app_name;
mod session_id;
mod slot;

pub use app_name::{AppName, AppNameError};
pub use session_id::SessionId;
pub use slot::{ParseSlotError, Slot};
