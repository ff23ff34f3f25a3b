// ABOUTME: The active-slot marker file, sole source of truth for which slot serves traffic.
// ABOUTME: Missing, blank or unrecognised contents read as blue.

use crate::host::{HostError, HostOps};
use crate::types::Slot;

#[derive(Debug, Clone)]
pub struct ActiveSlotMarker {
    path: String,
}

impl ActiveSlotMarker {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Current active slot. Never cached: every call reads the host.
    pub async fn read<H: HostOps + ?Sized>(&self, host: &H) -> Result<Slot, HostError> {
        let contents = host.read_file(&self.path).await?;
        Ok(parse_marker(&self.path, contents.as_deref()))
    }

    /// Atomically record `slot` as active.
    pub async fn write<H: HostOps + ?Sized>(&self, host: &H, slot: Slot) -> Result<(), HostError> {
        host.write_file(&self.path, &format!("{slot}\n")).await
    }
}

fn parse_marker(path: &str, contents: Option<&str>) -> Slot {
    match contents.map(str::trim) {
        None | Some("") => Slot::default(),
        Some(value) => value.parse().unwrap_or_else(|_| {
            tracing::warn!(
                "Marker {} contains {:?}, treating {} as active",
                path,
                value,
                Slot::default()
            );
            Slot::default()
        }),
    }
}
