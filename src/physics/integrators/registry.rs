//! Registry pattern for dynamic integrator management
//!
//! The registry serves as a discovery and factory mechanism for integration
//! schemes. Each scheme is self-describing, providing its own name, aliases,
//! and convergence order; the registry queries a probe instance during
//! registration to build the lookup table for name resolution.
//!
//! Unlike a registry of stateless objects, integrators here carry per-atom
//! agent arenas, so the registry stores constructor functions and builds a
//! fresh instance per `create` call.

use super::{Gear4, Integrator, VelocityVerlet, Verlet};
use crate::physics::math::Scalar;
use std::collections::HashMap;

/// Builds one integrator with the given time step.
pub type IntegratorConstructor = fn(Scalar) -> Box<dyn Integrator>;

/// Registry for runtime integrator registration
pub struct IntegratorRegistry {
    /// Maps names (canonical and aliases) to constructors
    constructors: HashMap<String, IntegratorConstructor>,
}

impl IntegratorRegistry {
    /// Create an empty registry without any pre-registered integrators.
    pub fn new() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    /// Register all standard integrators.
    ///
    /// Returns self for method chaining.
    pub fn with_standard_integrators(mut self) -> Self {
        self.register_integrator(|dt| Box::new(VelocityVerlet::new(dt)));
        self.register_integrator(|dt| Box::new(Verlet::new(dt)));
        self.register_integrator(|dt| Box::new(Gear4::new(dt)));
        self
    }

    /// Register a single integrator constructor.
    ///
    /// Returns self for method chaining.
    pub fn with_integrator(mut self, constructor: IntegratorConstructor) -> Self {
        self.register_integrator(constructor);
        self
    }

    pub fn register_integrator(&mut self, constructor: IntegratorConstructor) {
        // A probe instance supplies the metadata; the time step is irrelevant.
        let probe = constructor(1.0);

        self.constructors
            .insert(probe.name().to_string(), constructor);
        for alias in probe.aliases() {
            self.constructors.insert(alias.to_string(), constructor);
        }
    }

    pub fn create(&self, name: &str, dt: Scalar) -> Result<Box<dyn Integrator>, String> {
        self.constructors
            .get(name)
            .map(|constructor| constructor(dt))
            .ok_or_else(|| {
                let available = self.list_available();
                let aliases = self.list_aliases();
                let alias_names: Vec<String> = aliases.iter().map(|(a, _)| a.clone()).collect();
                format!(
                    "Unknown integrator: '{}'. Available integrators: {}. Aliases: {}",
                    name,
                    available.join(", "),
                    alias_names.join(", ")
                )
            })
    }

    pub fn list_available(&self) -> Vec<String> {
        let mut canonical_names = std::collections::HashSet::new();

        for constructor in self.constructors.values() {
            canonical_names.insert(constructor(1.0).name().to_string());
        }

        let mut names: Vec<String> = canonical_names.into_iter().collect();
        names.sort();
        names
    }

    pub fn list_aliases(&self) -> Vec<(String, String)> {
        let mut aliases: Vec<(String, String)> = Vec::new();

        for (key, constructor) in &self.constructors {
            let canonical_name = constructor(1.0).name();
            if key != canonical_name {
                aliases.push((key.clone(), canonical_name.to_string()));
            }
        }

        aliases.sort_by(|a, b| a.0.cmp(&b.0));
        aliases
    }
}

impl Default for IntegratorRegistry {
    fn default() -> Self {
        Self::new().with_standard_integrators()
    }
}
