//! Pin designation model: which capability each pin currently has.
//!
//! Device-reported sets may overlap. The device gives no conflict signal, so a
//! fixed precedence decides: PWM over Digital over FastLED. Reserved membership
//! is an availability fact and always makes the pin immutable.
use std::collections::{BTreeMap, BTreeSet};

use super::board::StripInfo;
use super::{Availability, Designation, LogicalPin, PinBoard, PinId, Result};
use crate::gateway::protocol::{DesignationPayload, DesignationReport, FastLedEntry};

/// Availability and designation the device reports for one pin
#[derive(Debug, Clone, PartialEq, Eq)]
struct ReportedPin {
    availability: Availability,
    designation: Designation,
    strip: Option<StripInfo>,
}

fn resolve_report(report: &DesignationReport) -> BTreeMap<PinId, ReportedPin> {
    let mut designations: BTreeMap<PinId, Designation> = BTreeMap::new();
    let mut strips: BTreeMap<PinId, StripInfo> = BTreeMap::new();

    // Lowest precedence first so higher sets overwrite.
    for entry in &report.fast_led_pins {
        designations.insert(entry.pin(), Designation::FastLed);
        if let FastLedEntry::Strip { pin, strip_type, num_leds } = entry {
            strips.insert(
                *pin,
                StripInfo {
                    strip_type: strip_type.clone(),
                    num_leds: *num_leds,
                },
            );
        }
    }
    for (pins, designation) in [
        (&report.digital_pins, Designation::Digital),
        (&report.pwm_pins, Designation::Pwm),
    ] {
        for id in pins {
            if let Some(previous) = designations.insert(*id, designation) {
                log::debug!(
                    "Pin {} reported as both {} and {}, keeping {}",
                    id, previous, designation, designation
                );
            }
        }
    }

    let reserved: BTreeSet<PinId> = report.reserved_pins.iter().copied().collect();
    let available: BTreeSet<PinId> = report.available_pins.iter().copied().collect();

    let mut ids: BTreeSet<PinId> = designations.keys().copied().collect();
    ids.extend(&reserved);
    ids.extend(&available);

    ids.into_iter()
        .map(|id| {
            let availability = if reserved.contains(&id) {
                Availability::Reserved
            } else if available.contains(&id) {
                Availability::Available
            } else {
                Availability::Unknown
            };
            let designation = if availability == Availability::Reserved {
                Designation::Unassigned
            } else {
                designations.get(&id).copied().unwrap_or_default()
            };
            let strip = if designation == Designation::FastLed {
                strips.remove(&id)
            } else {
                None
            };
            (id, ReportedPin { availability, designation, strip })
        })
        .collect()
}

impl PinBoard {
    /// Replace every pin's availability and designation with the device's report.
    ///
    /// Pins missing from all reported sets become `Unknown`/`Unassigned`; ids
    /// the device reports but the board did not know are added. Values are reset
    /// to the designation default and must be loaded afterwards.
    pub fn load_from_snapshot(&mut self, report: &DesignationReport) {
        self.apply_designation_report(report, false);
    }

    /// Same as `load_from_snapshot` but keeps unconfirmed local designation edits
    /// on pins that are still available.
    pub fn merge_from_snapshot(&mut self, report: &DesignationReport) {
        self.apply_designation_report(report, true);
    }

    fn apply_designation_report(&mut self, report: &DesignationReport, preserve_edits: bool) {
        let mut reported = resolve_report(report);

        for id in reported.keys() {
            self.pins.entry(*id).or_insert_with(|| LogicalPin::new(*id));
        }

        for pin in self.pins.values_mut() {
            let remote = reported.remove(&pin.id).unwrap_or(ReportedPin {
                availability: Availability::Unknown,
                designation: Designation::Unassigned,
                strip: None,
            });
            pin.availability = remote.availability;

            if !preserve_edits || !pin.is_available() {
                if pin.is_dirty() {
                    log::warn!(
                        "Discarding unconfirmed edit on pin {} (now {})",
                        pin.id, pin.availability
                    );
                }
                pin.discard_edits();
            }

            if pin.designation_edit.is_some() {
                log::debug!("Keeping local designation {} on pin {}", pin.designation, pin.id);
                continue;
            }

            if pin.designation != remote.designation || !preserve_edits {
                // A pending value was validated against the old designation.
                if pin.value_edit.take().is_some() {
                    log::warn!(
                        "Discarding unconfirmed value on pin {}: device changed it from {} to {}",
                        pin.id, pin.designation, remote.designation
                    );
                }
                pin.designation = remote.designation;
                pin.value = if pin.is_reserved() {
                    None
                } else {
                    pin.designation.default_value()
                };
            }
            pin.strip = remote.strip;
        }

        if !preserve_edits {
            self.batch_skipped.clear();
        }
    }

    /// Assign a capability to an available pin, resetting its value to that
    /// capability's default.
    pub fn set_designation(&mut self, id: PinId, designation: Designation) -> Result<()> {
        let revision = self.revision + 1;
        let pin = self.editable_mut(id)?;
        pin.designation = designation;
        pin.value = designation.default_value();
        if designation != Designation::FastLed {
            pin.strip = None;
        }
        pin.designation_edit = Some(revision);
        pin.value_edit = Some(revision);
        self.revision = revision;
        Ok(())
    }

    /// Designation push body: available PWM and Digital pins only
    pub fn designation_payload(&self) -> DesignationPayload {
        let mut payload = DesignationPayload::default();
        for pin in self.pins.values().filter(|p| p.is_available()) {
            match pin.designation {
                Designation::Pwm => payload.pwm_pins.push(pin.id),
                Designation::Digital => payload.digital_pins.push(pin.id),
                Designation::FastLed | Designation::Unassigned => {}
            }
        }
        payload
    }
}
