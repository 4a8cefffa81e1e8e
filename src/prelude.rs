//! moldrift prelude module
//!
//! This module re-exports the most commonly used types and traits across
//! the engine to reduce import boilerplate.

// External crate re-exports
pub use rand::Rng;

// Internal re-exports - Config
pub use crate::config::SimulationConfig;

// Internal re-exports - Control
pub use crate::control::{
    Action, Activity, ActivitySeries, Controller, RunState, SeriesHandle, Task,
};

// Internal re-exports - Errors
pub use crate::error::{ConstraintError, ControlError, PotentialError, SimError};

// Internal re-exports - Resources
pub use crate::resources::SharedRng;

// Internal re-exports - Physics
pub use crate::physics::constraints::{BondConstraints, ConstraintSolver, Convergence};
pub use crate::physics::integrators::registry::IntegratorRegistry;
pub use crate::physics::integrators::{Gear4, Integrator, VelocityVerlet, Verlet};
pub use crate::physics::math::{Scalar, Vector};
pub use crate::physics::potential::{
    ForceAccumulator, HarmonicBond, HarmonicWell, LennardJones, Potential,
};
pub use crate::physics::run::IntegrationRun;
pub use crate::physics::system::{cubic_lattice, AgentStore, MdSystem, SpeciesId};
