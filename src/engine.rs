//! Lifecycle engine: guard predicates, transitions, and the selection
//! protocol for ambiguous install targets.
//!
//! Every mutating operation is gated by an on-demand guard; there is no
//! polling loop re-evaluating availability on a tick. Transfers are
//! committed as one atomic detach + attach: if the attach half fails, the
//! detach is rolled back before the call returns, so no external execution
//! ever observes a record owned by nothing.
//!
//! # Selection protocol
//!
//! When more than one processing unit qualifies for an install, the engine
//! does not pick one. It returns the qualifying set
//! ([`InstallOutcome::DecisionRequired`]) and suspends: the record stays in
//! its slot, other operations against it fail with
//! [`LabError::DecisionPending`], and the transition completes only through
//! [`LifecycleEngine::resolve_install`] or
//! [`LifecycleEngine::cancel_install`]. Because the reachability scope can
//! change while a decision is outstanding, compatibility is re-validated at
//! resolve time; a stale choice fails with [`LabError::NoCompatibleUnit`]
//! instead of trusting the earlier guard.

use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::catalog::RunStatus;
use crate::error::{LabError, LabResult};
use crate::lab::LabId;
use crate::record::{ExperimentRecord, RecordState};
use crate::slot::{SlotId, StorageSlot};
use crate::vessel::Vessel;

/// Result of a successful `install` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    /// Exactly one unit qualified; the transfer is already committed.
    Installed(LabId),
    /// Several units qualify; the record stays stored until the caller
    /// resolves or cancels the decision. Candidates are listed in
    /// attachment order.
    DecisionRequired(Vec<LabId>),
}

/// State-change notifications for the presentation layer.
///
/// Purely observational: display refresh, label text, action availability.
/// Nothing feeds back into the state machine.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LifecycleEvent {
    /// A record entered a storage slot.
    Stored {
        /// Receiving slot.
        slot: SlotId,
        /// Experiment id.
        id: String,
    },
    /// A record relocated between storage slots.
    Moved {
        /// Source slot.
        from: SlotId,
        /// Destination slot.
        to: SlotId,
        /// Experiment id.
        id: String,
    },
    /// Multiple units qualify; a selection is awaited.
    DecisionRequested {
        /// Slot holding the suspended record.
        slot: SlotId,
        /// Qualifying units, attachment order.
        candidates: Vec<LabId>,
    },
    /// A pending selection was abandoned; nothing changed.
    DecisionCancelled {
        /// Slot whose decision was dropped.
        slot: SlotId,
    },
    /// A record was installed into a processing unit.
    Installed {
        /// Slot the record left.
        slot: SlotId,
        /// Unit that now owns the record.
        lab: LabId,
        /// Experiment id.
        id: String,
    },
    /// A record's results were irreversibly finalized.
    Finalized {
        /// Owning unit.
        lab: LabId,
        /// Experiment id.
        id: String,
    },
    /// A record's content was discarded.
    Discarded {
        /// Experiment id.
        id: String,
    },
}

/// An outstanding selection-protocol decision for one stored record.
#[derive(Debug, Clone)]
struct PendingInstall {
    record_id: String,
    candidates: Vec<LabId>,
}

type Observer = Box<dyn Fn(&LifecycleEvent)>;

/// Transition function and guards for the experiment-record lifecycle.
#[derive(Default)]
pub struct LifecycleEngine {
    pending: HashMap<SlotId, PendingInstall>,
    observers: Vec<Observer>,
}

impl LifecycleEngine {
    /// Create an engine with no outstanding decisions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a state-change observer (presentation layer).
    pub fn subscribe(&mut self, observer: impl Fn(&LifecycleEvent) + 'static) {
        self.observers.push(Box::new(observer));
    }

    fn emit(&self, event: &LifecycleEvent) {
        debug!(?event, "engine: event");
        for observer in &self.observers {
            observer(event);
        }
    }

    /// True iff a selection decision is outstanding for this slot's record.
    pub fn has_pending(&self, slot: SlotId) -> bool {
        self.pending.contains_key(&slot)
    }

    /// Candidates of the outstanding decision for this slot, if any.
    pub fn pending_candidates(&self, slot: SlotId) -> Option<&[LabId]> {
        self.pending.get(&slot).map(|p| p.candidates.as_slice())
    }

    // ------------------------------------------------------------------
    // Guards, evaluated on demand at call time
    // ------------------------------------------------------------------

    /// A record may be created into this slot: the slot is empty.
    pub fn can_add(&self, vessel: &Vessel, slot: SlotId) -> bool {
        !self.has_pending(slot) && vessel.slot(slot).map_or(false, StorageSlot::is_empty)
    }

    /// The record may relocate: it is stored (not installed, not
    /// finalized) and the scope holds at least one other slot.
    pub fn can_move(&self, vessel: &Vessel, slot: SlotId) -> bool {
        !self.has_pending(slot)
            && self.occupant_state(vessel, slot) == Some(RecordState::Stored)
            && vessel.slots().any(|s| s.id() != slot)
    }

    /// The record may be installed: it is stored and at least one
    /// reachable unit accepts it.
    pub fn can_install(&self, vessel: &Vessel, slot: SlotId) -> bool {
        if self.has_pending(slot) || self.occupant_state(vessel, slot) != Some(RecordState::Stored)
        {
            return false;
        }
        vessel
            .slot(slot)
            .ok()
            .and_then(|s| s.peek())
            .is_some_and(|record| !vessel.qualifying_labs(record).is_empty())
    }

    /// The record may be finalized: it is installed in this unit and the
    /// run-completion collaborator reports its data collection done.
    ///
    /// This is the authoritative finalize guard; it deliberately does not
    /// look at install candidates.
    pub fn can_finalize(
        &self,
        vessel: &Vessel,
        lab: LabId,
        record_id: &str,
        run: &dyn RunStatus,
    ) -> bool {
        vessel
            .lab(lab)
            .ok()
            .and_then(|l| l.find(record_id))
            .is_some_and(|r| r.state() == RecordState::Installed && run.is_complete(r))
    }

    fn occupant_state(&self, vessel: &Vessel, slot: SlotId) -> Option<RecordState> {
        vessel
            .slot(slot)
            .ok()
            .and_then(|s| s.peek())
            .map(ExperimentRecord::state)
    }

    // ------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------

    /// Create a record into an empty slot.
    pub fn add_record(
        &mut self,
        vessel: &mut Vessel,
        slot: SlotId,
        record: ExperimentRecord,
    ) -> LabResult<()> {
        self.ensure_no_decision(slot)?;
        let id = record.id().to_string();
        vessel
            .slot_mut(slot)?
            .store(record)
            .map_err(|rejected| rejected.error)?;
        self.emit(&LifecycleEvent::Stored { slot, id });
        Ok(())
    }

    /// Install a stored record into a compatible processing unit.
    ///
    /// With exactly one qualifying unit the transfer commits immediately;
    /// with several, a decision is registered and the record stays put.
    /// With none, this fails with [`LabError::NoCompatibleUnit`] and the
    /// slot is bit-identical to before the attempt.
    pub fn install(&mut self, vessel: &mut Vessel, slot: SlotId) -> LabResult<InstallOutcome> {
        self.ensure_no_decision(slot)?;
        let (record_id, experiment_type, candidates) = {
            let record = vessel
                .slot(slot)?
                .peek()
                .ok_or_else(|| LabError::InvalidForState("install on an empty slot".to_string()))?;
            if record.state() != RecordState::Stored {
                return Err(LabError::InvalidForState(format!(
                    "install requires a stored record, found state '{}'",
                    record.state()
                )));
            }
            (
                record.id().to_string(),
                record.experiment_type().to_string(),
                vessel.qualifying_labs(record),
            )
        };

        match candidates.as_slice() {
            [] => {
                info!(slot = %slot, id = %record_id, "install: no compatible unit in scope");
                Err(LabError::NoCompatibleUnit(experiment_type))
            }
            [only] => {
                let lab = *only;
                self.commit_install(vessel, slot, lab)?;
                Ok(InstallOutcome::Installed(lab))
            }
            _ => {
                self.pending.insert(
                    slot,
                    PendingInstall {
                        record_id,
                        candidates: candidates.clone(),
                    },
                );
                self.emit(&LifecycleEvent::DecisionRequested {
                    slot,
                    candidates: candidates.clone(),
                });
                Ok(InstallOutcome::DecisionRequired(candidates))
            }
        }
    }

    /// Complete a pending install with the chosen unit.
    ///
    /// Compatibility is re-validated here: the scope may have changed
    /// while the decision was outstanding, and a choice that no longer
    /// qualifies fails with [`LabError::NoCompatibleUnit`]. The pending
    /// decision is consumed either way; the record stays stored on
    /// failure and a fresh `install` may be attempted.
    pub fn resolve_install(
        &mut self,
        vessel: &mut Vessel,
        slot: SlotId,
        choice: LabId,
    ) -> LabResult<()> {
        let pending = self
            .pending
            .remove(&slot)
            .ok_or_else(|| LabError::InvalidForState("no install decision pending".to_string()))?;
        if !pending.candidates.contains(&choice) {
            return Err(LabError::InvalidForState(
                "chosen unit was not among the offered candidates".to_string(),
            ));
        }

        let (still_accepts, experiment_type) = {
            let record = vessel.slot(slot)?.peek().ok_or_else(|| {
                LabError::InvalidForState("suspended record is no longer in its slot".to_string())
            })?;
            if record.id() != pending.record_id {
                return Err(LabError::InvalidForState(
                    "slot occupant changed while the decision was pending".to_string(),
                ));
            }
            let accepts = vessel.lab(choice).map_or(false, |lab| lab.accepts(record));
            (accepts, record.experiment_type().to_string())
        };
        if !still_accepts {
            warn!(slot = %slot, lab = %choice, "resolve: choice went stale, scope changed");
            return Err(LabError::NoCompatibleUnit(experiment_type));
        }

        self.commit_install(vessel, slot, choice)
    }

    /// Abandon a pending install decision. Leaves all state unchanged.
    pub fn cancel_install(&mut self, slot: SlotId) -> LabResult<()> {
        if self.pending.remove(&slot).is_none() {
            return Err(LabError::InvalidForState(
                "no install decision pending".to_string(),
            ));
        }
        self.emit(&LifecycleEvent::DecisionCancelled { slot });
        Ok(())
    }

    /// Atomic detach + attach. Rolls the detach back if the attach fails.
    fn commit_install(&mut self, vessel: &mut Vessel, slot: SlotId, lab: LabId) -> LabResult<()> {
        let record = vessel
            .slot_mut(slot)?
            .take()
            .ok_or_else(|| LabError::InvalidForState("install on an empty slot".to_string()))?;
        let record_id = record.id().to_string();
        let experiment_type = record.experiment_type().to_string();

        let target = match vessel.lab_mut(lab) {
            Ok(target) => target,
            Err(_) => {
                // Unit left the scope between guard and commit.
                vessel.slot_mut(slot)?.put_back(record);
                return Err(LabError::NoCompatibleUnit(experiment_type));
            }
        };
        match target.install(record) {
            Ok(()) => {
                self.emit(&LifecycleEvent::Installed {
                    slot,
                    lab,
                    id: record_id,
                });
                Ok(())
            }
            Err(rejected) => {
                vessel.slot_mut(slot)?.put_back(rejected.record);
                Err(rejected.error)
            }
        }
    }

    /// Relocate a stored record between storage slots.
    pub fn move_record(&mut self, vessel: &mut Vessel, from: SlotId, to: SlotId) -> LabResult<()> {
        self.ensure_no_decision(from)?;
        {
            let source = vessel.slot(from)?;
            let record = source.peek().ok_or_else(|| {
                LabError::InvalidForState("move on an empty slot".to_string())
            })?;
            if record.state() != RecordState::Stored {
                return Err(LabError::InvalidForState(format!(
                    "move requires a stored record, found state '{}'",
                    record.state()
                )));
            }
            if !vessel.slot(to)?.is_empty() {
                return Err(LabError::TargetOccupied);
            }
        }

        let record = vessel
            .slot_mut(from)?
            .take()
            .ok_or_else(|| LabError::InvalidForState("move on an empty slot".to_string()))?;
        let id = record.id().to_string();
        match vessel.slot_mut(to)?.store(record) {
            Ok(()) => {
                self.emit(&LifecycleEvent::Moved { from, to, id });
                Ok(())
            }
            Err(rejected) => {
                vessel.slot_mut(from)?.put_back(rejected.record);
                Err(rejected.error)
            }
        }
    }

    /// Discard a stored record's content, emptying the slot.
    ///
    /// An explicit, irreversible abandonment, distinct from `move`. Legal
    /// on any non-finalized record without an outstanding decision; a
    /// no-op on an already-empty slot.
    pub fn discard(&mut self, vessel: &mut Vessel, slot: SlotId) -> LabResult<()> {
        self.ensure_no_decision(slot)?;
        {
            let target = vessel.slot(slot)?;
            match target.peek() {
                None => return Ok(()),
                Some(record) if record.is_finalized() => {
                    return Err(LabError::InvalidForState(
                        "finalized results cannot be discarded".to_string(),
                    ))
                }
                Some(_) => {}
            }
        }
        if let Some(record) = vessel.slot_mut(slot)?.take() {
            info!(slot = %slot, id = record.id(), "engine: discarded experiment content");
            self.emit(&LifecycleEvent::Discarded {
                id: record.id().to_string(),
            });
        }
        Ok(())
    }

    /// Discard a non-finalized record installed in a processing unit.
    pub fn discard_installed(
        &mut self,
        vessel: &mut Vessel,
        lab: LabId,
        record_id: &str,
    ) -> LabResult<()> {
        let record = vessel.lab_mut(lab)?.discard(record_id)?;
        self.emit(&LifecycleEvent::Discarded {
            id: record.id().to_string(),
        });
        Ok(())
    }

    /// Irreversibly finalize an installed record's results.
    pub fn finalize(
        &mut self,
        vessel: &mut Vessel,
        lab: LabId,
        record_id: &str,
        run: &dyn RunStatus,
    ) -> LabResult<()> {
        vessel.lab_mut(lab)?.finalize_result(record_id, run)?;
        self.emit(&LifecycleEvent::Finalized {
            lab,
            id: record_id.to_string(),
        });
        Ok(())
    }

    fn ensure_no_decision(&self, slot: SlotId) -> LabResult<()> {
        if self.has_pending(slot) {
            return Err(LabError::DecisionPending);
        }
        Ok(())
    }
}
