//! Reachability scope: the live set of slots and labs reachable from a
//! structural position on the vessel.
//!
//! The scope is externally mutable state. Docking adds containers and
//! units, undocking removes them, and either can happen between any two
//! engine calls; the lifecycle engine tolerates these changes and
//! re-validates compatibility at commit time rather than trusting a stale
//! guard result. This module only stores the current set; it never
//! generates structural events itself.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{LabError, LabResult};
use crate::lab::{LabId, ProcessingUnit};
use crate::record::ExperimentRecord;
use crate::slot::{SlotId, StorageSlot};

/// The set of storage slots and processing units currently reachable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Vessel {
    name: String,
    slots: Vec<StorageSlot>,
    labs: Vec<ProcessingUnit>,
}

impl Vessel {
    /// Create an empty scope.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            slots: Vec::new(),
            labs: Vec::new(),
        }
    }

    /// Display name of the structure.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Attach a storage slot (construction or docking), returning its id.
    pub fn attach_slot(&mut self, slot: StorageSlot) -> SlotId {
        let id = slot.id();
        debug!(vessel = %self.name, slot = %id, "scope: attach slot");
        self.slots.push(slot);
        id
    }

    /// Attach a processing unit (construction or docking), returning its id.
    pub fn attach_lab(&mut self, lab: ProcessingUnit) -> LabId {
        let id = lab.id();
        debug!(vessel = %self.name, lab = %id, "scope: attach lab");
        self.labs.push(lab);
        id
    }

    /// Detach a slot (undocking). Whatever it holds leaves with it.
    pub fn detach_slot(&mut self, id: SlotId) -> Option<StorageSlot> {
        let idx = self.slots.iter().position(|s| s.id() == id)?;
        debug!(vessel = %self.name, slot = %id, "scope: detach slot");
        Some(self.slots.remove(idx))
    }

    /// Detach a lab (undocking). Installed records leave with it.
    pub fn detach_lab(&mut self, id: LabId) -> Option<ProcessingUnit> {
        let idx = self.labs.iter().position(|l| l.id() == id)?;
        debug!(vessel = %self.name, lab = %id, "scope: detach lab");
        Some(self.labs.remove(idx))
    }

    /// Look up a slot by id.
    pub fn slot(&self, id: SlotId) -> LabResult<&StorageSlot> {
        self.slots
            .iter()
            .find(|s| s.id() == id)
            .ok_or(LabError::UnknownSlot(id))
    }

    /// Mutable slot lookup.
    pub fn slot_mut(&mut self, id: SlotId) -> LabResult<&mut StorageSlot> {
        self.slots
            .iter_mut()
            .find(|s| s.id() == id)
            .ok_or(LabError::UnknownSlot(id))
    }

    /// Look up a lab by id.
    pub fn lab(&self, id: LabId) -> LabResult<&ProcessingUnit> {
        self.labs
            .iter()
            .find(|l| l.id() == id)
            .ok_or(LabError::UnknownLab(id))
    }

    /// Mutable lab lookup.
    pub fn lab_mut(&mut self, id: LabId) -> LabResult<&mut ProcessingUnit> {
        self.labs
            .iter_mut()
            .find(|l| l.id() == id)
            .ok_or(LabError::UnknownLab(id))
    }

    /// All reachable slots, in attachment order.
    pub fn slots(&self) -> impl Iterator<Item = &StorageSlot> {
        self.slots.iter()
    }

    /// All reachable labs, in attachment order.
    pub fn labs(&self) -> impl Iterator<Item = &ProcessingUnit> {
        self.labs.iter()
    }

    /// Labs whose equipment and free capacity accept the given record,
    /// in attachment order (the order the selection protocol presents).
    pub fn qualifying_labs(&self, record: &ExperimentRecord) -> Vec<LabId> {
        self.labs
            .iter()
            .filter(|l| l.accepts(record))
            .map(ProcessingUnit::id)
            .collect()
    }

    /// Total mass all experiment records contribute to the structure.
    pub fn total_experiment_mass(&self) -> f64 {
        let slot_mass: f64 = self.slots.iter().map(StorageSlot::mass_contribution).sum();
        let lab_mass: f64 = self.labs.iter().map(ProcessingUnit::mass_contribution).sum();
        slot_mass + lab_mass
    }
}
