pub mod board;
pub mod catalog;
pub mod designation;
pub mod values;

pub use board::{LogicalPin, PinBoard};
pub use catalog::{PhysicalPin, PinCatalog};
pub use values::BatchReport;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;

/// GPIO number as reported by the firmware
pub type PinId = u8;

/// Capability assigned to an available pin
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum Designation {
    #[default]
    Unassigned,
    Pwm,
    Digital,
    FastLed,
}

impl Designation {
    /// Range a scalar value must fall in, `None` when the designation has no settable value
    pub fn value_range(&self) -> Option<RangeInclusive<i32>> {
        match self {
            Designation::Pwm => Some(0..=100),
            Designation::Digital => Some(0..=1),
            Designation::Unassigned | Designation::FastLed => None,
        }
    }

    pub fn accepts_value(&self) -> bool {
        self.value_range().is_some()
    }

    /// Value a pin carries right after being given this designation
    pub fn default_value(&self) -> Option<PinValue> {
        self.value_range().map(|_| PinValue::Level(0))
    }

    /// Clamp a device-reported level into this designation's range
    pub fn clamp(&self, raw: i64) -> Option<u8> {
        self.value_range().map(|range| {
            raw.clamp(i64::from(*range.start()), i64::from(*range.end())) as u8
        })
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "none" | "unassigned" => Some(Designation::Unassigned),
            "pwm" => Some(Designation::Pwm),
            "digital" => Some(Designation::Digital),
            "fastled" | "fast_led" => Some(Designation::FastLed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Designation::Unassigned => "None",
            Designation::Pwm => "PWM",
            Designation::Digital => "Digital",
            Designation::FastLed => "FastLED",
        }
    }
}

impl fmt::Display for Designation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether this system may touch a pin at all
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum Availability {
    Available,
    /// Claimed by the firmware, never edited or pushed
    Reserved,
    /// Not reported by the device
    #[default]
    Unknown,
}

impl fmt::Display for Availability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Availability::Available => "available",
            Availability::Reserved => "reserved",
            Availability::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Colour shown on an addressable LED strip
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// Live or pending value of a pin
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PinValue {
    /// PWM duty (0-100) or digital level (0/1)
    Level(u8),
    /// FastLED strip colour, read-only
    Color(Rgb),
}

impl PinValue {
    pub fn level(&self) -> Option<u8> {
        match self {
            PinValue::Level(v) => Some(*v),
            PinValue::Color(_) => None,
        }
    }
}

impl fmt::Display for PinValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PinValue::Level(v) => write!(f, "{}", v),
            PinValue::Color(c) => write!(f, "rgb({}, {}, {})", c.r, c.g, c.b),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PinError {
    #[error("Unknown pin {0}")]
    InvalidPin(PinId),

    #[error("Pin {id} is not available ({availability})")]
    PinNotAvailable { id: PinId, availability: Availability },

    #[error("Pin {id} has designation {designation}, which has no settable value")]
    UnsupportedDesignation { id: PinId, designation: Designation },

    #[error("Value {value} is out of range for {designation} pin {id}")]
    ValueOutOfRange { id: PinId, value: i32, designation: Designation },
}

pub type Result<T> = std::result::Result<T, PinError>;
