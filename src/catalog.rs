//! Collaborator interfaces: experiment definitions and run completion.
//!
//! The catalog answers "which experiments can be created into a container
//! of this family?" and is consumed only at record-creation time. The
//! run-completion collaborator answers "has this installed experiment
//! finished collecting data?" and gates finalization. Both are traits so
//! the lifecycle core never depends on the content set; a built-in catalog
//! covering the stock material-science experiments is provided.

use serde::{Deserialize, Serialize};

use crate::record::{ExperimentRecord, ExperimentType};

/// Experiment family for the material-science container line.
pub const OMS: &str = "OMS";
/// Experiment family for the miniature in-capsule container line.
pub const KEMINI: &str = "KEMINI";

/// A creatable experiment definition: the template a record is minted from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentDefinition {
    /// Stable definition id, carried onto minted records.
    pub id: String,
    /// Equipment-matching type.
    pub experiment_type: ExperimentType,
    /// Short display label.
    pub abbreviation: String,
    /// Mass a minted record contributes to its container.
    pub mass: f64,
    /// Container family this definition belongs to.
    pub family: String,
}

impl ExperimentDefinition {
    /// Mint a fresh record from this definition.
    pub fn instantiate(&self) -> ExperimentRecord {
        ExperimentRecord::new(
            self.id.clone(),
            self.experiment_type.clone(),
            self.abbreviation.clone(),
            self.mass,
        )
    }
}

/// Source of installable experiment definitions, keyed by container family.
pub trait ExperimentCatalog {
    /// All definitions creatable into a container of the given family.
    fn available(&self, family: &str) -> Vec<ExperimentDefinition>;
}

/// The stock definition set.
#[derive(Debug, Default, Clone)]
pub struct BuiltinCatalog;

impl BuiltinCatalog {
    fn definitions() -> Vec<ExperimentDefinition> {
        fn def(id: &str, ty: &str, abbrev: &str, mass: f64, family: &str) -> ExperimentDefinition {
            ExperimentDefinition {
                id: format!("NE.{id}"),
                experiment_type: ExperimentType::from(ty),
                abbreviation: abbrev.to_string(),
                mass,
                family: family.to_string(),
            }
        }
        vec![
            def("FLEX", "FLEX", "FLEX", 0.2, OMS),
            def("CFI", "CFI", "CFI", 0.2, OMS),
            def("CCF", "CCF", "CCF", 0.2, OMS),
            def("CFE", "CFE", "CFE", 0.2, OMS),
            def("MIS1", "MIS1", "MIS1", 0.3, OMS),
            def("MIS2", "MIS2", "MIS2", 0.3, OMS),
            def("MIS3", "MIS3", "MIS3", 0.3, OMS),
            def("MEE1", "MEE1", "MEE1", 0.4, OMS),
            def("MEE2", "MEE2", "MEE2", 0.4, OMS),
            def("CVB", "CVB", "CVB", 0.2, OMS),
            def("PACE", "PACE", "PACE", 0.1, KEMINI),
            def("ADUM", "ADUM", "ADUM", 0.1, KEMINI),
            def("SpiU", "SpiU", "SpiU", 0.1, KEMINI),
        ]
    }
}

impl ExperimentCatalog for BuiltinCatalog {
    fn available(&self, family: &str) -> Vec<ExperimentDefinition> {
        Self::definitions()
            .into_iter()
            .filter(|d| d.family == family)
            .collect()
    }
}

/// Reports whether an installed experiment has finished its data
/// collection. Supplied by the experiment-run collaborator; this crate
/// only consumes the verdict.
pub trait RunStatus {
    /// True iff the record's data-collection work is finished.
    fn is_complete(&self, record: &ExperimentRecord) -> bool;
}

impl<F> RunStatus for F
where
    F: Fn(&ExperimentRecord) -> bool,
{
    fn is_complete(&self, record: &ExperimentRecord) -> bool {
        self(record)
    }
}

/// Test/demo collaborator that reports every run as finished.
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysComplete;

impl RunStatus for AlwaysComplete {
    fn is_complete(&self, _record: &ExperimentRecord) -> bool {
        true
    }
}

/// Test/demo collaborator that reports every run as still in progress.
#[derive(Debug, Default, Clone, Copy)]
pub struct NeverComplete;

impl RunStatus for NeverComplete {
    fn is_complete(&self, _record: &ExperimentRecord) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog_families() {
        let catalog = BuiltinCatalog;
        let oms = catalog.available(OMS);
        assert!(oms.iter().any(|d| d.abbreviation == "CFE"));
        assert!(oms.iter().all(|d| d.family == OMS));

        let kemini = catalog.available(KEMINI);
        assert!(kemini.iter().any(|d| d.abbreviation == "PACE"));
        assert!(!kemini.iter().any(|d| d.abbreviation == "CFE"));
    }

    #[test]
    fn test_unknown_family_is_empty() {
        assert!(BuiltinCatalog.available("GREENHOUSE").is_empty());
    }

    #[test]
    fn test_instantiate_carries_definition_fields() {
        let catalog = BuiltinCatalog;
        let defs = catalog.available(OMS);
        let cfe = defs.iter().find(|d| d.abbreviation == "CFE").unwrap();
        let record = cfe.instantiate();
        assert_eq!(record.id(), "NE.CFE");
        assert_eq!(record.experiment_type().as_str(), "CFE");
        assert!((record.mass() - 0.2).abs() < f64::EPSILON);
    }

    #[test]
    fn test_closure_run_status() {
        let record = ExperimentRecord::new("NE.FLEX", "FLEX", "FLEX", 0.2);
        let done = |r: &ExperimentRecord| r.id() == "NE.FLEX";
        assert!(done.is_complete(&record));
    }
}
