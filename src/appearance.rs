//! Cosmetic container appearance lookup.
//!
//! Presentation-only helper mapping an experiment type to the texture name
//! the renderer should show on the container shell. Results are memoized
//! per lookup instance; nothing here bears on lifecycle correctness.

use once_cell::sync::Lazy;
use std::collections::HashMap;
use tracing::debug;

static TEXTURE_NAMES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("", "ExperimentContainerTexture"),
        ("FLEX", "FlexContainerTexture"),
        ("CFI", "CfiContainerTexture"),
        ("CCF", "CcfContainerTexture"),
        ("CFE", "CfeContainerTexture"),
        ("MIS1", "Msi1ContainerTexture"),
        ("MIS2", "Msi2ContainerTexture"),
        ("MIS3", "Msi3ContainerTexture"),
        ("MEE1", "Mee1ContainerTexture"),
        ("MEE2", "Mee2ContainerTexture"),
        ("CVB", "CvbContainerTexture"),
        ("PACE", "PACEContainerTexture"),
        ("ADUM", "AdumContainerTexture"),
        ("SpiU", "SpiuContainerTexture"),
    ])
});

/// Memoizing texture-name lookup keyed by experiment type.
#[derive(Debug, Default)]
pub struct TextureLookup {
    cache: HashMap<String, &'static str>,
}

impl TextureLookup {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Texture name for the given experiment type, if one is registered.
    pub fn texture_for(&mut self, experiment_type: &str) -> Option<&'static str> {
        if let Some(name) = self.cache.get(experiment_type) {
            return Some(name);
        }
        let name = TEXTURE_NAMES.get(experiment_type).copied()?;
        debug!(experiment_type, texture = name, "appearance: caching texture name");
        self.cache.insert(experiment_type.to_string(), name);
        Some(name)
    }
}
