//! Container persistence over structured key/value trees.
//!
//! The host's save system hands each container a tree node
//! (`serde_json::Value` here). An occupied container writes its record as
//! a named `"experiment"` sub-node and omits it when empty, so absence is
//! the absence of the node, not a sentinel value.
//!
//! Loading is deliberately forgiving: a missing or malformed record
//! sub-node resolves to an empty container rather than an error. Corrupt
//! content loses one record, never the save.

use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::error::{LabError, LabResult};
use crate::lab::{LabId, ProcessingUnit};
use crate::record::{ExperimentRecord, ExperimentType};
use crate::slot::{SlotId, StorageSlot};
use crate::vessel::Vessel;

/// Name of the record sub-node inside a container node.
pub const EXPERIMENT_NODE: &str = "experiment";

/// Serialize a storage slot to its tree node.
///
/// The occupant appears as the [`EXPERIMENT_NODE`] sub-node iff present.
pub fn save_slot(slot: &StorageSlot) -> LabResult<Value> {
    serde_json::to_value(slot)
        .map_err(|e| LabError::InvalidForState(format!("slot serialization failed: {e}")))
}

/// Reconstruct a storage slot from its tree node.
///
/// A malformed record sub-node loads as an empty slot; everything else in
/// the node must be well-formed.
pub fn load_slot(node: &Value) -> LabResult<StorageSlot> {
    #[derive(Deserialize)]
    struct Shell {
        id: SlotId,
        category: String,
        #[serde(rename = "experiment", default)]
        occupant: Option<Value>,
    }

    let shell: Shell = serde_json::from_value(node.clone())
        .map_err(|e| LabError::InvalidForState(format!("slot node is malformed: {e}")))?;

    let mut slot = StorageSlot::new(shell.category);
    slot.restore_identity(shell.id);
    if let Some(sub) = shell.occupant {
        match serde_json::from_value::<ExperimentRecord>(sub) {
            Ok(record) => slot.put_back(record),
            Err(e) => {
                // Resolve to empty instead of failing the whole load.
                warn!(slot = %shell.id, error = %e, "persist: dropping malformed record node");
            }
        }
    }
    Ok(slot)
}

/// Serialize a processing unit, installed records included.
pub fn save_lab(lab: &ProcessingUnit) -> LabResult<Value> {
    serde_json::to_value(lab)
        .map_err(|e| LabError::InvalidForState(format!("lab serialization failed: {e}")))
}

/// Reconstruct a processing unit from its tree node.
///
/// Malformed installed-record entries are dropped, matching the slot
/// policy; the unit itself must be well-formed.
pub fn load_lab(node: &Value) -> LabResult<ProcessingUnit> {
    #[derive(Deserialize)]
    struct Shell {
        id: LabId,
        abbreviation: String,
        equipment: Vec<ExperimentType>,
        capacity: usize,
        #[serde(default)]
        installed: Vec<Value>,
    }

    let shell: Shell = serde_json::from_value(node.clone())
        .map_err(|e| LabError::InvalidForState(format!("lab node is malformed: {e}")))?;

    let mut lab =
        ProcessingUnit::new(shell.abbreviation, shell.equipment).with_capacity(shell.capacity);
    lab.restore_identity(shell.id);
    for sub in shell.installed {
        match serde_json::from_value::<ExperimentRecord>(sub) {
            Ok(record) => lab.restore_installed(record),
            Err(e) => {
                warn!(lab = %shell.id, error = %e, "persist: dropping malformed record node");
            }
        }
    }
    Ok(lab)
}

/// Serialize a whole reachability scope (structure snapshot).
pub fn save_vessel(vessel: &Vessel) -> LabResult<Value> {
    serde_json::to_value(vessel)
        .map_err(|e| LabError::InvalidForState(format!("vessel serialization failed: {e}")))
}

/// Reconstruct a reachability scope from a structure snapshot.
///
/// Each container loads through the forgiving [`load_slot`] / [`load_lab`]
/// paths, so a corrupt record sub-node anywhere in the snapshot loses that
/// one record, never the save.
pub fn load_vessel(node: &Value) -> LabResult<Vessel> {
    #[derive(Deserialize)]
    struct Shell {
        name: String,
        #[serde(default)]
        slots: Vec<Value>,
        #[serde(default)]
        labs: Vec<Value>,
    }

    let shell: Shell = serde_json::from_value(node.clone())
        .map_err(|e| LabError::InvalidForState(format!("vessel snapshot is malformed: {e}")))?;

    let mut vessel = Vessel::new(shell.name);
    for slot_node in &shell.slots {
        vessel.attach_slot(load_slot(slot_node)?);
    }
    for lab_node in &shell.labs {
        vessel.attach_lab(load_lab(lab_node)?);
    }
    Ok(vessel)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RecordState;
    use serde_json::json;

    #[test]
    fn test_empty_slot_omits_experiment_node() {
        let slot = StorageSlot::new("OMS");
        let node = save_slot(&slot).unwrap();
        assert!(node.get(EXPERIMENT_NODE).is_none());

        let back = load_slot(&node).unwrap();
        assert!(back.is_empty());
        assert_eq!(back.id(), slot.id());
    }

    #[test]
    fn test_occupied_slot_round_trip() {
        let mut slot = StorageSlot::new("OMS");
        slot.store(ExperimentRecord::new("CFE", "OMS", "CFE", 0.2))
            .unwrap();

        let node = save_slot(&slot).unwrap();
        assert!(node.get(EXPERIMENT_NODE).is_some());

        let back = load_slot(&node).unwrap();
        let record = back.peek().unwrap();
        assert_eq!(record.id(), "CFE");
        assert_eq!(record.experiment_type().as_str(), "OMS");
        assert_eq!(record.abbreviation(), "CFE");
        assert_eq!(record.state(), RecordState::Stored);
    }

    #[test]
    fn test_malformed_record_node_loads_as_empty() {
        let slot = StorageSlot::new("OMS");
        let mut node = save_slot(&slot).unwrap();
        if let Value::Object(map) = &mut node {
            map.insert(
                EXPERIMENT_NODE.to_string(),
                json!({"id": "CFE", "mass": "not a number"}),
            );
        }
        let back = load_slot(&node).unwrap();
        assert!(back.is_empty());
    }

    #[test]
    fn test_malformed_slot_node_is_an_error() {
        let err = load_slot(&json!({"category": 12})).unwrap_err();
        assert!(matches!(err, LabError::InvalidForState(_)));
    }

    #[test]
    fn test_lab_load_drops_malformed_installed_entry() {
        use crate::record::ExperimentType;

        let mut lab = ProcessingUnit::new("MSL", [ExperimentType::from("MIS1")]).with_capacity(2);
        lab.install(ExperimentRecord::new("NE.MIS1", "MIS1", "MIS1", 0.3))
            .unwrap();

        let mut node = save_lab(&lab).unwrap();
        if let Some(installed) = node.get_mut("installed").and_then(Value::as_array_mut) {
            installed.push(json!({"id": "NE.MIS2", "mass": "not a number"}));
        }

        let back = load_lab(&node).unwrap();
        assert_eq!(back.installed().len(), 1);
        assert!(back.find("NE.MIS1").is_some());
    }

    #[test]
    fn test_vessel_load_tolerates_corrupt_record_nodes() {
        use crate::record::ExperimentType;

        let mut vessel = Vessel::new("Station");
        vessel.attach_slot(StorageSlot::new("OMS"));
        let lab = vessel.attach_lab(ProcessingUnit::new("MSL", [ExperimentType::from("MIS1")]));
        vessel
            .lab_mut(lab)
            .unwrap()
            .install(ExperimentRecord::new("NE.MIS1", "MIS1", "MIS1", 0.3))
            .unwrap();

        let mut snapshot = save_vessel(&vessel).unwrap();
        snapshot["slots"][0][EXPERIMENT_NODE] = json!(["not", "a", "record"]);

        let restored = load_vessel(&snapshot).unwrap();
        assert!(restored.slots().all(StorageSlot::is_empty));
        // The lab's record survives; only the corrupt one is lost.
        assert!(restored.lab(lab).unwrap().find("NE.MIS1").is_some());
    }

    #[test]
    fn test_lab_round_trip_keeps_installed_state() {
        use crate::catalog::AlwaysComplete;
        use crate::record::ExperimentType;

        let mut lab = ProcessingUnit::new("MSL", [ExperimentType::from("MIS1")]);
        lab.install(ExperimentRecord::new("NE.MIS1", "MIS1", "MIS1", 0.3))
            .unwrap();
        lab.finalize_result("NE.MIS1", &AlwaysComplete).unwrap();

        let node = save_lab(&lab).unwrap();
        let back = load_lab(&node).unwrap();
        assert!(back.find("NE.MIS1").unwrap().is_finalized());
        assert_eq!(back.id(), lab.id());
    }
}
