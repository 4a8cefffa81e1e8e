//! Time-integration schemes for molecular dynamics
//!
//! An integrator advances the whole system by one time step, delegating
//! force evaluation to a [`Potential`] collaborator and, where the scheme
//! supports it, projecting constrained molecules back onto their rigid-bond
//! manifold. Schemes carry per-atom auxiliary state (cached forces,
//! derivative histories) in [`AgentStore`](crate::physics::system::AgentStore)
//! arenas keyed by atom index, revalidated against the system topology on
//! every call.

use crate::error::SimError;
use crate::physics::math::{Scalar, Vector};
use crate::physics::potential::Potential;
use crate::physics::system::MdSystem;

pub mod gear4;
pub mod registry;
pub mod velocity_verlet;
pub mod verlet;

pub use gear4::Gear4;
pub use velocity_verlet::VelocityVerlet;
pub use verlet::Verlet;

/// Energy/virial bookkeeping from the most recent force walk, for pressure
/// and conservation diagnostics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepSample {
    pub potential_energy: Scalar,
    pub virial: Scalar,
}

/// Cached net force on one atom; the minimal agent for single-step schemes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ForceAgent {
    pub force: Vector,
}

/// Base trait for all integration schemes
pub trait Integrator: Send {
    /// (Re)derive any per-atom history from the forces at the current
    /// configuration. Must be called before the first `step` and after any
    /// external mutation of positions or velocities; skipping it costs a
    /// one-step transient for multi-step schemes.
    fn reset(&mut self, system: &mut MdSystem, potential: &dyn Potential)
        -> Result<(), SimError>;

    /// Advance the system by one time interval.
    fn step(&mut self, system: &mut MdSystem, potential: &dyn Potential)
        -> Result<(), SimError>;

    fn timestep(&self) -> Scalar;

    fn set_timestep(&mut self, dt: Scalar);

    /// Get the canonical name of this integrator
    fn name(&self) -> &'static str;

    /// Alternative names accepted by the registry
    fn aliases(&self) -> Vec<&'static str> {
        Vec::new()
    }

    /// Get the order of this integrator
    fn convergence_order(&self) -> usize;

    /// Whether the scheme can run systems that declare rigid bonds.
    fn supports_constraints(&self) -> bool {
        false
    }

    /// Energy/virial sample from the most recent force evaluation.
    fn last_sample(&self) -> Option<StepSample> {
        None
    }
}
