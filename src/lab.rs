//! Processing unit ("lab"): runs installed, compatible experiment records.
//!
//! A unit declares the experiment types its equipment supports and a
//! bounded capacity. Compatibility is a pure predicate ([`ProcessingUnit::accepts`]);
//! installation takes ownership of a record the caller already detached
//! from its previous owner, and finalization is the irreversible last step
//! of the lifecycle, gated by the run-completion collaborator.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};
use uuid::Uuid;

use crate::catalog::RunStatus;
use crate::error::{LabError, LabResult};
use crate::record::{ExperimentRecord, ExperimentType, RecordState, Rejected};

/// Stable identity of a processing unit within a reachability scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabId(Uuid);

impl LabId {
    /// Allocate a fresh id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for LabId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A unit capable of hosting installed experiment records, gated by an
/// equipment-compatibility predicate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingUnit {
    id: LabId,
    abbreviation: String,
    equipment: Vec<ExperimentType>,
    capacity: usize,
    #[serde(default)]
    installed: Vec<ExperimentRecord>,
}

impl ProcessingUnit {
    /// Create a unit with capacity 1 supporting the given experiment types.
    pub fn new(
        abbreviation: impl Into<String>,
        equipment: impl IntoIterator<Item = ExperimentType>,
    ) -> Self {
        Self {
            id: LabId::new(),
            abbreviation: abbreviation.into(),
            equipment: equipment.into_iter().collect(),
            capacity: 1,
            installed: Vec::new(),
        }
    }

    /// Raise the install capacity (capacity is always at least 1).
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    /// This unit's id.
    pub fn id(&self) -> LabId {
        self.id
    }

    /// Short display label for the unit.
    pub fn abbreviation(&self) -> &str {
        &self.abbreviation
    }

    /// Records currently installed in this unit, finalized ones included.
    pub fn installed(&self) -> &[ExperimentRecord] {
        &self.installed
    }

    /// Look up an installed record by experiment id.
    pub fn find(&self, record_id: &str) -> Option<&ExperimentRecord> {
        self.installed.iter().find(|r| r.id() == record_id)
    }

    /// Mass the installed records contribute to the host structure.
    pub fn mass_contribution(&self) -> f64 {
        self.installed.iter().map(ExperimentRecord::mass).sum()
    }

    /// Pure compatibility predicate: equipment supports the record's type
    /// and a capacity slot is free. Never mutates.
    pub fn accepts(&self, record: &ExperimentRecord) -> bool {
        self.installed.len() < self.capacity && self.equipment.contains(record.experiment_type())
    }

    /// Take ownership of a record and transition it to `Installed`.
    ///
    /// The caller must already have detached the record from its previous
    /// owner; this never implicitly removes a record from elsewhere. A
    /// refused record is handed back inside the rejection so the caller can
    /// roll the detach back.
    pub fn install(&mut self, mut record: ExperimentRecord) -> Result<(), Rejected> {
        if !self.accepts(&record) {
            let error = LabError::IncompatibleEquipment(record.experiment_type().to_string());
            return Err(Rejected { record, error });
        }
        record.mark_installed();
        info!(lab = %self.abbreviation, id = record.id(), "lab: install");
        self.installed.push(record);
        Ok(())
    }

    /// Irreversibly finalize the results of an installed record.
    ///
    /// Legal only on a record this unit owns, in state `Installed`, whose
    /// data collection the run-completion collaborator reports as done.
    pub fn finalize_result(&mut self, record_id: &str, run: &dyn RunStatus) -> LabResult<()> {
        let record = self
            .installed
            .iter_mut()
            .find(|r| r.id() == record_id)
            .ok_or_else(|| {
                LabError::InvalidForState(format!(
                    "record '{record_id}' is not installed in lab {}",
                    self.abbreviation
                ))
            })?;
        match record.state() {
            RecordState::Installed => {}
            other => {
                return Err(LabError::InvalidForState(format!(
                    "finalize requires an installed record, found state '{other}'"
                )))
            }
        }
        if !run.is_complete(record) {
            return Err(LabError::InvalidForState(format!(
                "experiment '{}' has not finished its data collection",
                record.abbreviation()
            )));
        }
        record.mark_finalized();
        info!(lab = %self.abbreviation, id = record_id, "lab: finalized");
        Ok(())
    }

    /// Remove a non-finalized installed record, discarding its content.
    pub(crate) fn discard(&mut self, record_id: &str) -> LabResult<ExperimentRecord> {
        let idx = self
            .installed
            .iter()
            .position(|r| r.id() == record_id)
            .ok_or_else(|| {
                LabError::InvalidForState(format!(
                    "record '{record_id}' is not installed in lab {}",
                    self.abbreviation
                ))
            })?;
        if self.installed.get(idx).is_some_and(ExperimentRecord::is_finalized) {
            return Err(LabError::InvalidForState(
                "finalized results cannot be discarded".to_string(),
            ));
        }
        debug!(lab = %self.abbreviation, id = record_id, "lab: discard");
        Ok(self.installed.remove(idx))
    }

    /// Reassign the persisted identity during a load.
    pub(crate) fn restore_identity(&mut self, id: LabId) {
        self.id = id;
    }

    /// Re-seat a record from a snapshot without touching its state.
    pub(crate) fn restore_installed(&mut self, record: ExperimentRecord) {
        self.installed.push(record);
    }
}
