//! Custom error types for the lifecycle core.
//!
//! This module defines the primary error type, `LabError`, for the entire
//! crate. Using the `thiserror` crate, it provides a centralized and
//! consistent way to report every way a lifecycle operation can be refused.
//!
//! Every variant is recoverable: a failed operation leaves the record and
//! its owning container exactly as they were before the call. There are no
//! fatal errors internal to this crate; even malformed persisted data
//! resolves to an empty container rather than an unrecoverable fault.

use thiserror::Error;

use crate::lab::LabId;
use crate::slot::SlotId;

/// Convenience alias for results using the crate error type.
pub type LabResult<T> = std::result::Result<T, LabError>;

/// Reasons a lifecycle operation can be refused.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LabError {
    /// A store was attempted on a slot that already holds a record.
    #[error("Storage slot is already occupied")]
    AlreadyOccupied,

    /// An install was attempted against a unit whose equipment rejects the
    /// record's experiment type, or whose capacity is exhausted.
    #[error("Processing unit equipment is incompatible with experiment type '{0}'")]
    IncompatibleEquipment(String),

    /// An install was attempted with zero qualifying units in the current
    /// reachability scope.
    #[error("No reachable processing unit accepts experiment type '{0}'")]
    NoCompatibleUnit(String),

    /// A move was attempted against an occupied destination slot.
    #[error("Target storage slot is occupied")]
    TargetOccupied,

    /// An operation was attempted outside its guard, e.g. finalizing a
    /// stored record or moving a finalized one.
    #[error("Operation not valid in the current state: {0}")]
    InvalidForState(String),

    /// An operation was attempted on a record with an outstanding install
    /// decision.
    #[error("An install decision is still pending for this record")]
    DecisionPending,

    /// A slot id did not resolve in the current reachability scope.
    #[error("Storage slot {0} is not reachable from here")]
    UnknownSlot(SlotId),

    /// A lab id did not resolve in the current reachability scope.
    #[error("Processing unit {0} is not reachable from here")]
    UnknownLab(LabId),
}
