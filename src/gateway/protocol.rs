//! Wire representation of the `pinDesignation` and `pinValues` resources
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::pins::{PinId, Rgb};

/// Entry of `fastLedPins`: older firmware sends bare ids, newer sends strip details
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum FastLedEntry {
    Id(PinId),
    Strip {
        pin: PinId,
        #[serde(rename = "type", default)]
        strip_type: Option<String>,
        #[serde(rename = "numLeds", default)]
        num_leds: Option<u16>,
    },
}

impl FastLedEntry {
    pub fn pin(&self) -> PinId {
        match self {
            FastLedEntry::Id(id) => *id,
            FastLedEntry::Strip { pin, .. } => *pin,
        }
    }
}

/// `GET /pinDesignation` response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct DesignationReport {
    pub pwm_pins: Vec<PinId>,
    pub digital_pins: Vec<PinId>,
    #[serde(default)]
    pub fast_led_pins: Vec<FastLedEntry>,
    pub reserved_pins: Vec<PinId>,
    pub available_pins: Vec<PinId>,
}

/// `GET /pinValues` response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ValuesReport {
    #[serde(alias = "pwmPins")]
    pub pwm: BTreeMap<PinId, i64>,
    #[serde(alias = "digitalPins")]
    pub digital: BTreeMap<PinId, i64>,
    #[serde(default, alias = "fastLedPins")]
    pub fast_led: BTreeMap<PinId, Rgb>,
}

/// `POST /pinDesignation` body
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct DesignationPayload {
    pub pwm_pins: Vec<PinId>,
    pub digital_pins: Vec<PinId>,
}

/// `POST /pinValues` body
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ValuesPayload {
    pub pwm: BTreeMap<PinId, u8>,
    pub digital: BTreeMap<PinId, u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_designation_report_with_strip_objects() {
        let json = r#"{
            "pwmPins": [1, 2],
            "digitalPins": [3, 4],
            "fastLedPins": [{"pin": 5, "type": "WS2812", "numLeds": 60}],
            "reservedPins": [7, 8],
            "availablePins": [0, 1, 2, 3, 4, 5, 6]
        }"#;
        let report: DesignationReport = serde_json::from_str(json).unwrap();
        assert_eq!(report.pwm_pins, vec![1, 2]);
        assert_eq!(report.fast_led_pins[0].pin(), 5);
        match &report.fast_led_pins[0] {
            FastLedEntry::Strip { strip_type, num_leds, .. } => {
                assert_eq!(strip_type.as_deref(), Some("WS2812"));
                assert_eq!(*num_leds, Some(60));
            }
            other => panic!("unexpected entry {:?}", other),
        }
    }

    #[test]
    fn test_designation_report_missing_key_is_rejected() {
        let json = r#"{"pwmPins": [], "digitalPins": [], "availablePins": []}"#;
        assert!(serde_json::from_str::<DesignationReport>(json).is_err());
    }

    #[test]
    fn test_values_report_accepts_aliases() {
        let json = r#"{"pwmPins": {"5": 50}, "digitalPins": {"3": 1},
                       "fastLed": {"8": {"r": 255, "g": 100, "b": 50}}}"#;
        let report: ValuesReport = serde_json::from_str(json).unwrap();
        assert_eq!(report.pwm.get(&5), Some(&50));
        assert_eq!(report.digital.get(&3), Some(&1));
        assert_eq!(report.fast_led.get(&8), Some(&Rgb { r: 255, g: 100, b: 50 }));
    }

    #[test]
    fn test_values_payload_uses_string_keys() {
        let mut payload = ValuesPayload::default();
        payload.pwm.insert(5, 50);
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json, serde_json::json!({"pwm": {"5": 50}, "digital": {}}));
    }
}
