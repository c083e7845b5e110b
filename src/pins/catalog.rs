use serde::{Deserialize, Serialize};

use super::PinId;

/// ESP32-C3 header, left column then right column
pub const ESP32C3_LAYOUT: [&str; 16] = [
    "5V", "GND", "3V3", "4", "3", "2", "1", "0",
    "5", "6", "7", "8", "9", "10", "20", "21",
];

const POWER_LABELS: [&str; 3] = ["5V", "GND", "3V3"];

/// A pin as printed on the board
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PhysicalPin {
    pub label: String,
    pub is_power_pin: bool,
}

impl PhysicalPin {
    pub fn new(label: &str) -> Self {
        let label = label.trim().to_string();
        let is_power_pin = if POWER_LABELS.iter().any(|p| p.eq_ignore_ascii_case(&label)) {
            true
        } else if label.parse::<PinId>().is_err() {
            log::warn!("Pin label '{}' is not a GPIO number, treating it as not configurable", label);
            true
        } else {
            false
        };
        Self { label, is_power_pin }
    }

    /// GPIO number for configurable pins
    pub fn gpio(&self) -> Option<PinId> {
        if self.is_power_pin {
            None
        } else {
            self.label.parse().ok()
        }
    }
}

/// Fixed physical layout of the board, built once at startup
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PinCatalog {
    pins: Vec<PhysicalPin>,
}

impl PinCatalog {
    /// Labels that do not parse as a GPIO number are treated as power rails.
    pub fn from_labels<S: AsRef<str>>(labels: &[S]) -> Self {
        Self {
            pins: labels.iter().map(|l| PhysicalPin::new(l.as_ref())).collect(),
        }
    }

    pub fn esp32c3() -> Self {
        Self::from_labels(&ESP32C3_LAYOUT)
    }

    pub fn list_pins(&self) -> &[PhysicalPin] {
        &self.pins
    }

    /// GPIO numbers of every configurable pin, in layout order
    pub fn logical_ids(&self) -> Vec<PinId> {
        self.pins.iter().filter_map(PhysicalPin::gpio).collect()
    }
}

impl Default for PinCatalog {
    fn default() -> Self {
        Self::esp32c3()
    }
}
