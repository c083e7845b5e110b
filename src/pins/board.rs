use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{Availability, Designation, PinError, PinId, PinValue, Result};

/// FastLED strip details reported alongside a designation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StripInfo {
    pub strip_type: Option<String>,
    pub num_leds: Option<u16>,
}

/// Configuration and value state of one configurable pin
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogicalPin {
    pub id: PinId,
    pub availability: Availability,
    pub designation: Designation,
    pub value: Option<PinValue>,
    pub strip: Option<StripInfo>,
    /// Revision of the unconfirmed designation edit, if any
    #[serde(skip)]
    pub(crate) designation_edit: Option<u64>,
    /// Revision of the unconfirmed value edit, if any
    #[serde(skip)]
    pub(crate) value_edit: Option<u64>,
}

impl LogicalPin {
    pub fn new(id: PinId) -> Self {
        Self {
            id,
            availability: Availability::Unknown,
            designation: Designation::Unassigned,
            value: None,
            strip: None,
            designation_edit: None,
            value_edit: None,
        }
    }

    pub fn is_available(&self) -> bool {
        self.availability == Availability::Available
    }

    pub fn is_reserved(&self) -> bool {
        self.availability == Availability::Reserved
    }

    /// Role shown to users; reserved pins read as "Reserved" whatever the device lists
    pub fn role_label(&self) -> &'static str {
        if self.is_reserved() {
            "Reserved"
        } else {
            self.designation.as_str()
        }
    }

    /// True while the pin carries a local edit the device has not confirmed
    pub fn is_dirty(&self) -> bool {
        self.designation_edit.is_some() || self.value_edit.is_some()
    }

    pub(crate) fn discard_edits(&mut self) {
        self.designation_edit = None;
        self.value_edit = None;
    }
}

/// In-memory model of every logical pin of one device.
///
/// The designation model (`designation.rs`) and the value model (`values.rs`)
/// both operate on this storage so that a designation change can reclamp the
/// paired value in the same step.
#[derive(Debug, Clone, Default)]
pub struct PinBoard {
    pub(crate) pins: BTreeMap<PinId, LogicalPin>,
    /// Monotonic counter stamped on every local edit
    pub(crate) revision: u64,
    /// Ids skipped by the latest batch edit not yet pushed
    pub(crate) batch_skipped: Vec<PinId>,
}

impl PinBoard {
    /// Board with every known id in the `Unknown` state
    pub fn new<I: IntoIterator<Item = PinId>>(ids: I) -> Self {
        Self {
            pins: ids.into_iter().map(|id| (id, LogicalPin::new(id))).collect(),
            revision: 0,
            batch_skipped: Vec::new(),
        }
    }

    pub fn pin(&self, id: PinId) -> Option<&LogicalPin> {
        self.pins.get(&id)
    }

    pub fn pins(&self) -> impl Iterator<Item = &LogicalPin> {
        self.pins.values()
    }

    pub fn ids(&self) -> Vec<PinId> {
        self.pins.keys().copied().collect()
    }

    pub fn available_ids(&self) -> Vec<PinId> {
        self.pins
            .values()
            .filter(|p| p.is_available())
            .map(|p| p.id)
            .collect()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn has_pending_edits(&self) -> bool {
        self.pins.values().any(LogicalPin::is_dirty)
    }

    /// Ids carrying edits the device has not confirmed
    pub fn unconfirmed_ids(&self) -> Vec<PinId> {
        self.pins
            .values()
            .filter(|p| p.is_dirty())
            .map(|p| p.id)
            .collect()
    }

    pub fn batch_skipped(&self) -> &[PinId] {
        &self.batch_skipped
    }

    /// Look up a pin that local edits may target
    pub(crate) fn editable_mut(&mut self, id: PinId) -> Result<&mut LogicalPin> {
        let pin = self.pins.get_mut(&id).ok_or(PinError::InvalidPin(id))?;
        if !pin.is_available() {
            return Err(PinError::PinNotAvailable {
                id,
                availability: pin.availability,
            });
        }
        Ok(pin)
    }

    /// Clear designation edits stamped at or before `revision`
    pub fn confirm_designations(&mut self, revision: u64) {
        for pin in self.pins.values_mut() {
            if pin.designation_edit.is_some_and(|r| r <= revision) {
                pin.designation_edit = None;
            }
        }
    }

    /// Clear value edits stamped at or before `revision`, except on the
    /// `held_back` pins whose values were not sent
    pub fn confirm_values(&mut self, revision: u64, held_back: &[PinId]) {
        for pin in self.pins.values_mut() {
            if held_back.contains(&pin.id) {
                continue;
            }
            if pin.value_edit.is_some_and(|r| r <= revision) {
                pin.value_edit = None;
            }
        }
        self.batch_skipped.clear();
    }
}
