//! Scenario tests for the experiment lifecycle on a small station.

use orbitsci::catalog::{AlwaysComplete, NeverComplete, OMS};
use orbitsci::{
    ExperimentRecord, ExperimentType, InstallOutcome, LabError, LifecycleEngine, ProcessingUnit,
    RecordState, StorageSlot, Vessel,
};

fn station_with_slot() -> (Vessel, LifecycleEngine, orbitsci::SlotId) {
    let mut vessel = Vessel::new("Test Station");
    let slot = vessel.attach_slot(StorageSlot::new(OMS));
    (vessel, LifecycleEngine::new(), slot)
}

#[test]
fn single_candidate_install_transfers_without_decision() {
    let (mut vessel, mut engine, slot) = station_with_slot();
    let lab = vessel.attach_lab(ProcessingUnit::new("MPL", [ExperimentType::from("FLEX")]));

    engine
        .add_record(
            &mut vessel,
            slot,
            ExperimentRecord::new("NE.FLEX", "FLEX", "FLEX", 0.2),
        )
        .unwrap();

    let outcome = engine.install(&mut vessel, slot).unwrap();
    assert_eq!(outcome, InstallOutcome::Installed(lab));
    assert!(vessel.slot(slot).unwrap().is_empty());
    assert_eq!(
        vessel.lab(lab).unwrap().find("NE.FLEX").unwrap().state(),
        RecordState::Installed
    );
    assert!(!engine.has_pending(slot));
}

#[test]
fn multi_candidate_install_suspends_until_choice() {
    let (mut vessel, mut engine, slot) = station_with_slot();
    let _a = vessel.attach_lab(ProcessingUnit::new("MSL-A", [ExperimentType::from("MIS1")]));
    let b = vessel.attach_lab(ProcessingUnit::new("MSL-B", [ExperimentType::from("MIS1")]));

    engine
        .add_record(
            &mut vessel,
            slot,
            ExperimentRecord::new("NE.MIS1", "MIS1", "MIS1", 0.3),
        )
        .unwrap();

    let outcome = engine.install(&mut vessel, slot).unwrap();
    let candidates = match outcome {
        InstallOutcome::DecisionRequired(c) => c,
        other => panic!("expected a decision, got {other:?}"),
    };
    assert_eq!(candidates.len(), 2);

    // Choosing B lands the record in B only.
    engine.resolve_install(&mut vessel, slot, b).unwrap();
    assert!(vessel.slot(slot).unwrap().is_empty());
    assert_eq!(vessel.lab(b).unwrap().installed().len(), 1);
    assert_eq!(vessel.lab(_a).unwrap().installed().len(), 0);
    assert_eq!(
        vessel.lab(b).unwrap().find("NE.MIS1").unwrap().state(),
        RecordState::Installed
    );
}

#[test]
fn cancelled_decision_keeps_record_stored() {
    let (mut vessel, mut engine, slot) = station_with_slot();
    vessel.attach_lab(ProcessingUnit::new("MSL-A", [ExperimentType::from("MIS1")]));
    vessel.attach_lab(ProcessingUnit::new("MSL-B", [ExperimentType::from("MIS1")]));

    engine
        .add_record(
            &mut vessel,
            slot,
            ExperimentRecord::new("NE.MIS1", "MIS1", "MIS1", 0.3),
        )
        .unwrap();
    engine.install(&mut vessel, slot).unwrap();
    engine.cancel_install(slot).unwrap();

    let record = vessel.slot(slot).unwrap().peek().unwrap();
    assert_eq!(record.state(), RecordState::Stored);
    assert_eq!(record.id(), "NE.MIS1");
    for lab in vessel.labs() {
        assert!(lab.installed().is_empty());
    }
}

#[test]
fn install_retry_after_no_compatible_unit_is_safe() {
    let (mut vessel, mut engine, slot) = station_with_slot();
    // Only an incompatible lab is reachable.
    vessel.attach_lab(ProcessingUnit::new("MPL", [ExperimentType::from("FLEX")]));

    engine
        .add_record(
            &mut vessel,
            slot,
            ExperimentRecord::new("NE.MIS1", "MIS1", "MIS1", 0.3),
        )
        .unwrap();

    for _ in 0..3 {
        assert_eq!(
            engine.install(&mut vessel, slot).unwrap_err(),
            LabError::NoCompatibleUnit("MIS1".to_string())
        );
        let record = vessel.slot(slot).unwrap().peek().unwrap();
        assert_eq!(record.state(), RecordState::Stored);
        assert_eq!(record.id(), "NE.MIS1");
    }

    // Docking a compatible lab makes the same call succeed.
    let msl = vessel.attach_lab(ProcessingUnit::new("MSL", [ExperimentType::from("MIS1")]));
    assert_eq!(
        engine.install(&mut vessel, slot).unwrap(),
        InstallOutcome::Installed(msl)
    );
}

#[test]
fn mass_contribution_is_conserved_across_moves() {
    let (mut vessel, mut engine, slot_a) = station_with_slot();
    let slot_b = vessel.attach_slot(StorageSlot::new(OMS));

    engine
        .add_record(
            &mut vessel,
            slot_a,
            ExperimentRecord::new("NE.CVB", "CVB", "CVB", 0.5),
        )
        .unwrap();

    let total_before = vessel.total_experiment_mass();
    assert!((vessel.slot(slot_a).unwrap().mass_contribution() - 0.5).abs() < 1e-12);
    assert_eq!(vessel.slot(slot_b).unwrap().mass_contribution(), 0.0);

    engine.move_record(&mut vessel, slot_a, slot_b).unwrap();

    assert!((vessel.total_experiment_mass() - total_before).abs() < 1e-12);
    assert_eq!(vessel.slot(slot_a).unwrap().mass_contribution(), 0.0);
    assert!((vessel.slot(slot_b).unwrap().mass_contribution() - 0.5).abs() < 1e-12);
}

#[test]
fn finalized_record_is_terminal() {
    let (mut vessel, mut engine, slot) = station_with_slot();
    let lab = vessel.attach_lab(ProcessingUnit::new("MSL", [ExperimentType::from("MIS1")]));

    engine
        .add_record(
            &mut vessel,
            slot,
            ExperimentRecord::new("NE.MIS1", "MIS1", "MIS1", 0.3),
        )
        .unwrap();
    engine.install(&mut vessel, slot).unwrap();

    // Not finished yet: the run-completion collaborator says no.
    assert!(matches!(
        engine
            .finalize(&mut vessel, lab, "NE.MIS1", &NeverComplete)
            .unwrap_err(),
        LabError::InvalidForState(_)
    ));

    engine
        .finalize(&mut vessel, lab, "NE.MIS1", &AlwaysComplete)
        .unwrap();
    assert!(vessel.lab(lab).unwrap().find("NE.MIS1").unwrap().is_finalized());

    // Every further operation is refused.
    assert!(matches!(
        engine
            .finalize(&mut vessel, lab, "NE.MIS1", &AlwaysComplete)
            .unwrap_err(),
        LabError::InvalidForState(_)
    ));
    assert!(matches!(
        engine
            .discard_installed(&mut vessel, lab, "NE.MIS1")
            .unwrap_err(),
        LabError::InvalidForState(_)
    ));
}

#[test]
fn discard_empties_slot_and_forgets_content() {
    let (mut vessel, mut engine, slot) = station_with_slot();
    engine
        .add_record(
            &mut vessel,
            slot,
            ExperimentRecord::new("NE.CCF", "CCF", "CCF", 0.2),
        )
        .unwrap();

    engine.discard(&mut vessel, slot).unwrap();
    assert!(vessel.slot(slot).unwrap().is_empty());
    assert!(vessel.slot(slot).unwrap().peek().is_none());
    assert_eq!(vessel.total_experiment_mass(), 0.0);

    // Discard on an already-empty slot is a safe no-op.
    engine.discard(&mut vessel, slot).unwrap();
}

#[test]
fn undocking_shrinks_scope_between_guard_and_commit() {
    let (mut vessel, mut engine, slot) = station_with_slot();
    let a = vessel.attach_lab(ProcessingUnit::new("MSL-A", [ExperimentType::from("MIS1")]));
    let b = vessel.attach_lab(ProcessingUnit::new("MSL-B", [ExperimentType::from("MIS1")]));

    engine
        .add_record(
            &mut vessel,
            slot,
            ExperimentRecord::new("NE.MIS1", "MIS1", "MIS1", 0.3),
        )
        .unwrap();
    engine.install(&mut vessel, slot).unwrap();

    // The chosen lab undocks during the decision; the resolve fails and
    // the record stays stored.
    vessel.detach_lab(b).unwrap();
    assert_eq!(
        engine.resolve_install(&mut vessel, slot, b).unwrap_err(),
        LabError::NoCompatibleUnit("MIS1".to_string())
    );
    assert_eq!(
        vessel.slot(slot).unwrap().peek().unwrap().state(),
        RecordState::Stored
    );

    // A fresh attempt with one remaining lab commits directly.
    assert_eq!(
        engine.install(&mut vessel, slot).unwrap(),
        InstallOutcome::Installed(a)
    );
}
