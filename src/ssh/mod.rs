// ABOUTME: SSH transport used to drive the target host from the operator's machine.
// ABOUTME: Agent or key-file authentication with known_hosts verification.

mod client;
mod error;

pub use client::{CommandOutput, Session, SessionConfig};
pub use error::{Error, Result};
