//! Registry pattern for dynamic integrator management
//!
//! Each integrator is self-describing, providing its own name, aliases and
//! convergence order. The registry queries this metadata to build lookup
//! tables for name resolution and instantiation. All integrators are
//! zero-sized types, so handing out a fresh box per request costs nothing.

use super::Integrator;
use crate::error::ConfigError;
use std::collections::{HashMap, HashSet};

/// Name of the integrator used when none is configured
pub const DEFAULT_INTEGRATOR: &str = "dormand_prince_853";

pub struct IntegratorRegistry {
    /// Maps names (canonical and aliases) to integrator instances
    integrators: HashMap<String, Box<dyn Integrator>>,
}

impl IntegratorRegistry {
    /// Create an empty registry without any pre-registered integrators.
    pub fn new() -> Self {
        Self {
            integrators: HashMap::new(),
        }
    }

    /// Register all built-in integrators.
    pub fn with_standard_integrators(mut self) -> Self {
        use super::{CashKarp, Dop853, DormandPrince};

        self.register_integrator(Box::new(Dop853));
        self.register_integrator(Box::new(DormandPrince));
        self.register_integrator(Box::new(CashKarp));

        self
    }

    pub fn with_integrator(mut self, integrator: Box<dyn Integrator>) -> Self {
        self.register_integrator(integrator);
        self
    }

    pub fn register_integrator(&mut self, integrator: Box<dyn Integrator>) {
        for alias in integrator.aliases() {
            self.integrators
                .insert(alias.to_string(), integrator.clone_box());
        }
        self.integrators
            .insert(integrator.name().to_string(), integrator);
    }

    pub fn create(&self, name: &str) -> Result<Box<dyn Integrator>, ConfigError> {
        self.integrators
            .get(name)
            .map(|integrator| integrator.clone_box())
            .ok_or_else(|| {
                let alias_names: Vec<String> =
                    self.list_aliases().into_iter().map(|(alias, _)| alias).collect();
                ConfigError::UnknownIntegrator(format!(
                    "Unknown integrator: '{}'. Available integrators: {}. Aliases: {}",
                    name,
                    self.list_available().join(", "),
                    alias_names.join(", ")
                ))
            })
    }

    pub fn list_available(&self) -> Vec<String> {
        let canonical_names: HashSet<&str> = self
            .integrators
            .values()
            .map(|integrator| integrator.name())
            .collect();

        let mut names: Vec<String> = canonical_names.into_iter().map(String::from).collect();
        names.sort();
        names
    }

    /// `(alias, canonical name)` pairs, sorted by alias
    pub fn list_aliases(&self) -> Vec<(String, String)> {
        let mut aliases: Vec<(String, String)> = self
            .integrators
            .iter()
            .filter(|(key, integrator)| key.as_str() != integrator.name())
            .map(|(key, integrator)| (key.clone(), integrator.name().to_string()))
            .collect();

        aliases.sort_by(|a, b| a.0.cmp(&b.0));
        aliases
    }
}

impl Default for IntegratorRegistry {
    fn default() -> Self {
        Self::new().with_standard_integrators()
    }
}
