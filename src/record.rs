//! Experiment record data entity.
//!
//! An [`ExperimentRecord`] is the state of one experiment instance as it
//! moves through the vessel: identity, matching type, display abbreviation,
//! mass contribution, and lifecycle state.
//!
//! # Lifecycle
//!
//! ```text
//! Stored ──install──> Installed ──finalize──> Finalized (terminal)
//!   │ ▲
//!   └─┘ move between storage slots
//! ```
//!
//! "Absent" is not a record state: an empty container simply holds no
//! record (`Option::None`). This replaces the empty-string id sentinel some
//! legacy content formats use, so absence is representable without a magic
//! string.
//!
//! # Ownership
//!
//! A record is owned by exactly one container at a time. Transfers move the
//! value out of one container and into the next; the two steps of a transfer
//! are committed together, and a failed second step hands the record back
//! (see [`Rejected`]) so the first step can be rolled back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::LabError;

/// Category used to match a record against processing-unit equipment.
///
/// Types are opaque labels ("FLEX", "MIS1", ...); two records match the same
/// equipment iff their types compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExperimentType(String);

impl ExperimentType {
    /// Create a type from any string-like label.
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    /// The raw label.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ExperimentType {
    fn from(label: &str) -> Self {
        Self(label.to_string())
    }
}

impl fmt::Display for ExperimentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle state of a record that exists inside some container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordState {
    /// Held by a storage slot, not yet installed.
    Stored,
    /// Installed into a processing unit and (potentially) running.
    Installed,
    /// Results finalized. Terminal: no operation may move or reset the
    /// record past this point.
    Finalized,
}

impl fmt::Display for RecordState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordState::Stored => f.write_str("stored"),
            RecordState::Installed => f.write_str("installed"),
            RecordState::Finalized => f.write_str("finalized"),
        }
    }
}

/// One experiment instance and its lifecycle state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentRecord {
    id: String,
    experiment_type: ExperimentType,
    abbreviation: String,
    mass: f64,
    state: RecordState,
    /// Set once, when the record enters `Finalized`.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    finalized_at: Option<DateTime<Utc>>,
}

impl ExperimentRecord {
    /// Create a fresh record in state [`RecordState::Stored`].
    ///
    /// Records only exist inside containers, so creation and first storage
    /// coincide.
    pub fn new(
        id: impl Into<String>,
        experiment_type: impl Into<ExperimentType>,
        abbreviation: impl Into<String>,
        mass: f64,
    ) -> Self {
        Self {
            id: id.into(),
            experiment_type: experiment_type.into(),
            abbreviation: abbreviation.into(),
            mass,
            state: RecordState::Stored,
            finalized_at: None,
        }
    }

    /// Stable identifier of the experiment definition.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Matching category for equipment compatibility.
    pub fn experiment_type(&self) -> &ExperimentType {
        &self.experiment_type
    }

    /// Short display label, carried through persistence unchanged.
    pub fn abbreviation(&self) -> &str {
        &self.abbreviation
    }

    /// Mass contributed to whichever container currently owns the record.
    pub fn mass(&self) -> f64 {
        self.mass
    }

    /// Current lifecycle state.
    pub fn state(&self) -> RecordState {
        self.state
    }

    /// Timestamp of finalization, if the record has reached `Finalized`.
    pub fn finalized_at(&self) -> Option<DateTime<Utc>> {
        self.finalized_at
    }

    /// True once the record has entered its terminal state.
    pub fn is_finalized(&self) -> bool {
        self.state == RecordState::Finalized
    }

    pub(crate) fn mark_stored(&mut self) {
        self.state = RecordState::Stored;
    }

    pub(crate) fn mark_installed(&mut self) {
        self.state = RecordState::Installed;
    }

    pub(crate) fn mark_finalized(&mut self) {
        self.state = RecordState::Finalized;
        self.finalized_at = Some(Utc::now());
    }
}

/// A record handed back by a container that refused to accept it.
///
/// Returned by the attach half of a transfer so the caller can restore the
/// record to its previous owner; a record is never left owned by nothing.
#[derive(Debug)]
pub struct Rejected {
    /// The record, unchanged, returned to the caller.
    pub record: ExperimentRecord,
    /// Why the container refused it.
    pub error: LabError,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_is_stored() {
        let rec = ExperimentRecord::new("NE.CFE", "OMS", "CFE", 0.5);
        assert_eq!(rec.state(), RecordState::Stored);
        assert_eq!(rec.id(), "NE.CFE");
        assert_eq!(rec.abbreviation(), "CFE");
        assert!(rec.finalized_at().is_none());
    }

    #[test]
    fn test_finalize_stamps_timestamp() {
        let mut rec = ExperimentRecord::new("NE.FLEX", "FLEX", "FLEX", 0.3);
        rec.mark_installed();
        rec.mark_finalized();
        assert!(rec.is_finalized());
        assert!(rec.finalized_at().is_some());
    }

    #[test]
    fn test_record_serde_round_trip() {
        let rec = ExperimentRecord::new("NE.CFE", "OMS", "CFE", 0.5);
        let json = serde_json::to_value(&rec).unwrap();
        let back: ExperimentRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, rec);
        assert_eq!(back.state(), RecordState::Stored);
    }

    #[test]
    fn test_experiment_type_matching() {
        let a = ExperimentType::from("MIS1");
        let b = ExperimentType::new("MIS1".to_string());
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "MIS1");
    }
}
