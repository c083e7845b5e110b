//! Pin value model: live and pending values, range-checked by designation.
use std::collections::BTreeMap;

use super::{Designation, PinBoard, PinError, PinId, PinValue, Result};
use crate::gateway::protocol::{DesignationPayload, ValuesPayload, ValuesReport};

/// Per-pin outcome of a batch edit
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub designation: Designation,
    pub value: i32,
    pub outcomes: BTreeMap<PinId, Result<()>>,
}

impl BatchReport {
    pub fn applied(&self) -> Vec<PinId> {
        self.outcomes
            .iter()
            .filter(|(_, r)| r.is_ok())
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn skipped(&self) -> Vec<(PinId, &PinError)> {
        self.outcomes
            .iter()
            .filter_map(|(id, r)| r.as_ref().err().map(|e| (*id, e)))
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.outcomes.values().all(|r| r.is_ok())
    }
}

impl PinBoard {
    /// Load device-reported values, clamped into each pin's designation range.
    /// Must run after the designation snapshot has been loaded.
    pub fn load_values(&mut self, report: &ValuesReport) {
        self.apply_values_report(report, false);
    }

    /// Same as `load_values` but keeps unconfirmed local value edits
    pub fn merge_values(&mut self, report: &ValuesReport) {
        self.apply_values_report(report, true);
    }

    fn apply_values_report(&mut self, report: &ValuesReport, preserve_edits: bool) {
        for pin in self.pins.values_mut() {
            if preserve_edits && pin.value_edit.is_some() {
                continue;
            }
            if pin.is_reserved() {
                pin.value = None;
                continue;
            }

            let reported = match pin.designation {
                Designation::Pwm => report.pwm.get(&pin.id),
                Designation::Digital => report.digital.get(&pin.id),
                Designation::FastLed => {
                    pin.value = report.fast_led.get(&pin.id).copied().map(PinValue::Color);
                    continue;
                }
                Designation::Unassigned => {
                    pin.value = None;
                    continue;
                }
            };

            pin.value = match reported {
                Some(raw) => pin.designation.clamp(*raw).map(PinValue::Level),
                None => {
                    log::debug!("No {} value reported for pin {}", pin.designation, pin.id);
                    pin.designation.default_value()
                }
            };
        }
    }

    /// Set the value of an available PWM or Digital pin
    pub fn set_value(&mut self, id: PinId, raw: i32) -> Result<()> {
        let revision = self.revision + 1;
        let pin = self.editable_mut(id)?;
        let range = pin
            .designation
            .value_range()
            .ok_or(PinError::UnsupportedDesignation {
                id,
                designation: pin.designation,
            })?;
        if !range.contains(&raw) {
            return Err(PinError::ValueOutOfRange {
                id,
                value: raw,
                designation: pin.designation,
            });
        }
        pin.value = Some(PinValue::Level(raw as u8));
        pin.value_edit = Some(revision);
        self.revision = revision;
        Ok(())
    }

    /// Give every available pin `designation` and, when it has a settable
    /// value, `raw`. Pins that cannot take the value are left untouched and
    /// reported individually.
    pub fn apply_to_all(&mut self, designation: Designation, raw: i32) -> BatchReport {
        let mut outcomes = BTreeMap::new();

        for id in self.available_ids() {
            let outcome = match designation.value_range() {
                Some(range) if !range.contains(&raw) => Err(PinError::ValueOutOfRange {
                    id,
                    value: raw,
                    designation,
                }),
                Some(_) => self
                    .set_designation(id, designation)
                    .and_then(|_| self.set_value(id, raw)),
                None => self.set_designation(id, designation),
            };
            if let Err(e) = &outcome {
                log::debug!("Batch edit skipped pin {}: {}", id, e);
            }
            outcomes.insert(id, outcome);
        }

        let report = BatchReport {
            designation,
            value: raw,
            outcomes,
        };
        self.batch_skipped = report.skipped().into_iter().map(|(id, _)| id).collect();
        report
    }

    /// Value push body: available PWM and Digital pins only
    pub fn values_payload(&self) -> ValuesPayload {
        let mut payload = ValuesPayload::default();
        for pin in self
            .pins
            .values()
            .filter(|p| p.is_available() && p.designation.accepts_value())
        {
            let Some(level) = pin.value.and_then(|v| v.level()) else {
                continue;
            };
            match pin.designation {
                Designation::Pwm => {
                    payload.pwm.insert(pin.id, level);
                }
                Designation::Digital => {
                    payload.digital.insert(pin.id, level);
                }
                Designation::FastLed | Designation::Unassigned => {}
            }
        }
        payload
    }

    /// Value push body for a device that was last sent `designation`.
    ///
    /// Pins whose family differs from the one in `designation` are left out
    /// and returned as held back; their values wait for the next push.
    pub fn values_payload_for(&self, designation: &DesignationPayload) -> (ValuesPayload, Vec<PinId>) {
        let mut payload = self.values_payload();
        let mut held_back = Vec::new();
        payload.pwm.retain(|id, _| {
            let sent = designation.pwm_pins.contains(id);
            if !sent {
                held_back.push(*id);
            }
            sent
        });
        payload.digital.retain(|id, _| {
            let sent = designation.digital_pins.contains(id);
            if !sent {
                held_back.push(*id);
            }
            sent
        });
        held_back.sort_unstable();
        (payload, held_back)
    }
}
