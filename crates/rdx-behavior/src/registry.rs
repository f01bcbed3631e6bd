use std::collections::BTreeMap;

use thiserror::Error;

use crate::probe::{BehaviorProbe, ClosureShiftProbe, ResultUnwrapOrProbe, VecPopProbe};
use crate::symbol::{locate_public_symbol, SymbolNotFound};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SynthesisError {
    #[error(transparent)]
    MissingFunction(#[from] SymbolNotFound),
    #[error("Unsupported family for behavior checks: {0}")]
    UnsupportedFamily(String),
    #[error("no behavior parameter for family '{0}' in prompt")]
    MissingParameter(String),
}

/// Family tag -> probe.
#[derive(Default)]
pub struct ProbeRegistry {
    probes: BTreeMap<String, Box<dyn BehaviorProbe>>,
}

impl ProbeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the three built-in families.
    pub fn with_builtin() -> Result<Self, regex::Error> {
        let mut registry = Self::new();
        registry.register(Box::new(ClosureShiftProbe::new()?));
        registry.register(Box::new(ResultUnwrapOrProbe::new()?));
        registry.register(Box::new(VecPopProbe::new()?));
        Ok(registry)
    }

    /// Add a probe; a later registration for the same family replaces the earlier one.
    pub fn register(&mut self, probe: Box<dyn BehaviorProbe>) {
        self.probes.insert(probe.family().to_string(), probe);
    }

    pub fn supports(&self, family: &str) -> bool {
        self.probes.contains_key(family)
    }

    pub fn families(&self) -> impl Iterator<Item = &str> {
        self.probes.keys().map(String::as_str)
    }

    /// Build the executable check for `source`.
    ///
    /// Symbol lookup happens first, so a source with no function reports
    /// `MissingFunction` regardless of family.
    pub fn synthesize(&self, family: &str, source: &str, prompt: &str) -> Result<String, SynthesisError> {
        let symbol = locate_public_symbol(source)?;
        let probe = self
            .probes
            .get(family)
            .ok_or_else(|| SynthesisError::UnsupportedFamily(family.to_string()))?;
        let param = probe
            .extract(prompt)
            .ok_or_else(|| SynthesisError::MissingParameter(family.to_string()))?;
        Ok(probe.render(source, &symbol, param))
    }
}

impl std::fmt::Debug for ProbeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.families()).finish()
    }
}
