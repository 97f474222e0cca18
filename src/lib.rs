//! Experiment sample lifecycle coordination for modular orbital research
//! vessels.
//!
//! This library tracks one experiment record as it moves between the
//! physical containers and processing units of a vessel: created empty,
//! populated from the definition catalog, optionally relocated, installed
//! into a compatible lab, run, and irreversibly finalized.
//!
//! # Architecture
//!
//! ```text
//! StorageSlot ──store/take──┐
//!                           ├── LifecycleEngine ──install──> ProcessingUnit
//! Vessel (reachability) ────┘         │                            │
//!                              selection protocol             finalize
//! ```
//!
//! - [`record`]: the experiment record entity and its state machine states
//! - [`slot`]: containers holding at most one stored record
//! - [`lab`]: processing units gated by equipment compatibility
//! - [`vessel`]: the externally-mutable reachability scope
//! - [`engine`]: guards, transitions, and the install selection protocol
//! - [`persist`]: key/value-tree save and load for containers
//! - [`catalog`]: collaborator interfaces (definitions, run completion)
//! - [`appearance`]: cosmetic texture-name lookup, presentation only

pub mod appearance;
pub mod catalog;
pub mod engine;
pub mod error;
pub mod lab;
pub mod persist;
pub mod record;
pub mod slot;
pub mod vessel;

pub use catalog::{BuiltinCatalog, ExperimentCatalog, ExperimentDefinition, RunStatus};
pub use engine::{InstallOutcome, LifecycleEngine, LifecycleEvent};
pub use error::{LabError, LabResult};
pub use lab::{LabId, ProcessingUnit};
pub use record::{ExperimentRecord, ExperimentType, RecordState};
pub use slot::{SlotId, StorageSlot};
pub use vessel::Vessel;
