//! End-to-end lifecycle walkthrough on a small demo station.
//!
//! Builds a vessel with two containers and two labs, mints an experiment
//! from the catalog, and drives it store → install (with a selection
//! decision) → finalize, printing every lifecycle event.

use anyhow::{anyhow, Result};
use clap::Parser;
use tracing::info;

use orbitsci::catalog::{AlwaysComplete, OMS};
use orbitsci::{
    BuiltinCatalog, ExperimentCatalog, ExperimentType, InstallOutcome, LifecycleEngine,
    ProcessingUnit, StorageSlot, Vessel,
};

#[derive(Parser, Debug)]
#[command(name = "labdemo", about = "Drive one experiment through its lifecycle")]
struct Args {
    /// Abbreviation of the experiment to run (from the built-in catalog).
    #[arg(long, default_value = "MIS1")]
    experiment: String,

    /// Number of compatible labs to put in reach.
    #[arg(long, default_value_t = 2)]
    labs: usize,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();

    let definition = BuiltinCatalog
        .available(OMS)
        .into_iter()
        .find(|d| d.abbreviation == args.experiment)
        .ok_or_else(|| anyhow!("no OMS experiment named '{}'", args.experiment))?;

    let mut vessel = Vessel::new("Demo Station");
    let slot = vessel.attach_slot(StorageSlot::new(OMS));
    vessel.attach_slot(StorageSlot::new(OMS));
    for n in 0..args.labs.max(1) {
        vessel.attach_lab(ProcessingUnit::new(
            format!("MSL-{n}"),
            [definition.experiment_type.clone(), ExperimentType::from("CFE")],
        ));
    }

    let mut engine = LifecycleEngine::new();
    engine.subscribe(|event| info!(?event, "lifecycle"));

    engine.add_record(&mut vessel, slot, definition.instantiate())?;

    let lab = match engine.install(&mut vessel, slot)? {
        InstallOutcome::Installed(lab) => lab,
        InstallOutcome::DecisionRequired(candidates) => {
            info!(count = candidates.len(), "multiple labs qualify, picking the last");
            let choice = *candidates
                .last()
                .ok_or_else(|| anyhow!("empty candidate set"))?;
            engine.resolve_install(&mut vessel, slot, choice)?;
            choice
        }
    };

    engine.finalize(&mut vessel, lab, &definition.id, &AlwaysComplete)?;

    let snapshot = orbitsci::persist::save_vessel(&vessel)?;
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}
