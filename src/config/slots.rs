// ABOUTME: Per-slot port assignments.
// ABOUTME: Blue listens on 8080 and green on 8081 unless configured otherwise.

use crate::types::Slot;
use serde::Deserialize;

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
pub struct SlotPorts {
    pub port: u16,
    /// Port serving the management endpoints; the application port if unset.
    #[serde(default)]
    pub management_port: Option<u16>,
}

impl SlotPorts {
    pub fn new(port: u16) -> Self {
        Self {
            port,
            management_port: None,
        }
    }

    pub fn management(&self) -> u16 {
        self.management_port.unwrap_or(self.port)
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
pub struct SlotsConfig {
    #[serde(default = "default_blue")]
    pub blue: SlotPorts,
    #[serde(default = "default_green")]
    pub green: SlotPorts,
}

impl Default for SlotsConfig {
    fn default() -> Self {
        Self {
            blue: default_blue(),
            green: default_green(),
        }
    }
}

impl SlotsConfig {
    pub fn get(&self, slot: Slot) -> SlotPorts {
        match slot {
            Slot::Blue => self.blue,
            Slot::Green => self.green,
        }
    }
}

fn default_blue() -> SlotPorts {
    SlotPorts::new(8080)
}

fn default_green() -> SlotPorts {
    SlotPorts::new(8081)
}
