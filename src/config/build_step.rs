// ABOUTME: Local build step configuration.
// ABOUTME: The command producing the artifact and the directory that gets shipped.

use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
pub struct BuildConfig {
    /// Program and arguments, run in the project directory.
    pub command: Vec<String>,
    /// Directory whose contents are synced into the slot directory.
    pub artifact: PathBuf,
}
