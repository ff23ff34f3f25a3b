// ABOUTME: Library root for slotswap - exposes the swap controller and its collaborators.
// ABOUTME: The main binary is in main.rs.

pub mod config;
pub mod deploy;
pub mod diagnostics;
pub mod error;
pub mod host;
pub mod management;
pub mod orchestrator;
pub mod output;
pub mod proxy;
pub mod registry;
pub mod ssh;
pub mod types;
