//! Storage slot: a container holding at most one experiment record.
//!
//! Slots mediate add/remove and expose the occupant for querying and
//! transfer. The occupancy invariant is structural: an occupied slot always
//! holds exactly one record, an empty slot holds none, and there is no
//! "present but absent" middle ground.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;
use uuid::Uuid;

use crate::error::LabError;
use crate::record::{ExperimentRecord, Rejected};

/// Stable identity of a storage slot within a reachability scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlotId(Uuid);

impl SlotId {
    /// Allocate a fresh id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SlotId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A container that holds zero or one [`ExperimentRecord`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSlot {
    id: SlotId,
    /// Experiment family this container was built for; restricts which
    /// definitions the catalog offers at record-creation time.
    category: String,
    #[serde(rename = "experiment", skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    occupant: Option<ExperimentRecord>,
}

impl StorageSlot {
    /// Create an empty slot for the given experiment family.
    pub fn new(category: impl Into<String>) -> Self {
        Self {
            id: SlotId::new(),
            category: category.into(),
            occupant: None,
        }
    }

    /// This slot's id.
    pub fn id(&self) -> SlotId {
        self.id
    }

    /// Experiment family the slot was built for.
    pub fn category(&self) -> &str {
        &self.category
    }

    /// True iff the slot holds no record.
    pub fn is_empty(&self) -> bool {
        self.occupant.is_none()
    }

    /// Read-only access to the current occupant. Never mutates.
    pub fn peek(&self) -> Option<&ExperimentRecord> {
        self.occupant.as_ref()
    }

    /// Mass this slot currently contributes to the host structure.
    pub fn mass_contribution(&self) -> f64 {
        self.occupant.as_ref().map_or(0.0, ExperimentRecord::mass)
    }

    /// Take ownership of a record, transitioning it to `Stored`.
    ///
    /// Refuses with [`LabError::AlreadyOccupied`] when the slot is not
    /// empty; the record is handed back unchanged inside the rejection.
    pub fn store(&mut self, mut record: ExperimentRecord) -> Result<(), Rejected> {
        if self.occupant.is_some() {
            return Err(Rejected {
                record,
                error: LabError::AlreadyOccupied,
            });
        }
        record.mark_stored();
        debug!(slot = %self.id, id = record.id(), mass = record.mass(), "slot: store");
        self.occupant = Some(record);
        Ok(())
    }

    /// Give up the current occupant, resetting the slot to empty.
    ///
    /// Safe to call on an already-empty slot; the mass contribution follows
    /// the record out.
    pub fn take(&mut self) -> Option<ExperimentRecord> {
        let record = self.occupant.take();
        if let Some(r) = &record {
            debug!(slot = %self.id, id = r.id(), "slot: take");
        }
        record
    }

    /// Rollback path: return a record taken from this slot during a failed
    /// two-step transfer. Leaves the record's state untouched.
    pub(crate) fn put_back(&mut self, record: ExperimentRecord) {
        debug_assert!(self.occupant.is_none(), "rollback into occupied slot");
        self.occupant = Some(record);
    }

    /// Reassign the persisted identity during a load.
    pub(crate) fn restore_identity(&mut self, id: SlotId) {
        self.id = id;
    }
}
