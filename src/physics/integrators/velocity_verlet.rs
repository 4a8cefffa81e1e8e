//! Velocity Verlet integration method
//!
//! The workhorse second-order symplectic scheme: half-kick with the cached
//! forces, drift, force recomputation, second half-kick with the new
//! forces. For molecules with rigid bonds the drift is followed by a SHAKE
//! position projection (against the pre-drift directions) and the second
//! half-kick by a RATTLE velocity projection, which together keep both the
//! bond lengths and the bond length-rates on the constraint manifold.

use super::{ForceAgent, Integrator, StepSample};
use crate::error::SimError;
use crate::physics::constraints::ConstraintSolver;
use crate::physics::math::{Scalar, Vector};
use crate::physics::potential::{ForceAccumulator, Potential};
use crate::physics::system::{AgentStore, MdSystem};

pub struct VelocityVerlet {
    dt: Scalar,
    agents: AgentStore<ForceAgent>,
    accumulator: ForceAccumulator,
    solver: ConstraintSolver,
    // Pre-drift positions, the SHAKE reference directions.
    reference: Vec<Vector>,
    sample: Option<StepSample>,
}

impl VelocityVerlet {
    pub fn new(dt: Scalar) -> Self {
        Self {
            dt,
            agents: AgentStore::new(),
            accumulator: ForceAccumulator::new(),
            solver: ConstraintSolver::default(),
            reference: Vec::new(),
            sample: None,
        }
    }

    pub fn with_constraint_solver(mut self, solver: ConstraintSolver) -> Self {
        self.solver = solver;
        self
    }

    fn gather_forces(
        &mut self,
        system: &MdSystem,
        potential: &dyn Potential,
    ) -> Result<(), SimError> {
        self.accumulator.reset(system.atom_count());
        potential.compute(system, &mut self.accumulator)?;
        for (agent, force) in self
            .agents
            .as_mut_slice()
            .iter_mut()
            .zip(self.accumulator.forces())
        {
            agent.force = *force;
        }
        self.sample = Some(StepSample {
            potential_energy: self.accumulator.potential_energy(),
            virial: self.accumulator.virial(),
        });
        Ok(())
    }

    fn project_positions(&mut self, system: &mut MdSystem, dt: Scalar) -> Result<(), SimError> {
        for m in 0..system.molecule_count() {
            let molecule = *system.molecule(m);
            let Some(constraints) = system.constraints_for(molecule.species()).cloned() else {
                continue;
            };
            let range = molecule.atoms();
            let (positions, velocities, masses) = system.molecule_state_mut(m);
            let _ = self.solver.relax_positions(
                m,
                positions,
                velocities,
                masses,
                &self.reference[range],
                &constraints,
                dt,
            )?;
        }
        Ok(())
    }

    fn project_velocities(&mut self, system: &mut MdSystem) -> Result<(), SimError> {
        for m in 0..system.molecule_count() {
            let molecule = *system.molecule(m);
            let Some(constraints) = system.constraints_for(molecule.species()).cloned() else {
                continue;
            };
            let (positions, velocities, masses) = system.molecule_state_mut(m);
            let _ = self
                .solver
                .relax_velocities(m, positions, velocities, masses, &constraints)?;
        }
        Ok(())
    }
}

impl Integrator for VelocityVerlet {
    fn reset(
        &mut self,
        system: &mut MdSystem,
        potential: &dyn Potential,
    ) -> Result<(), SimError> {
        self.agents.sync(system);
        self.gather_forces(system, potential)
    }

    fn step(&mut self, system: &mut MdSystem, potential: &dyn Potential) -> Result<(), SimError> {
        // A topology change invalidates the cached forces; re-prime them at
        // the current configuration before touching any velocity.
        if self.agents.sync(system) {
            self.gather_forces(system, potential)?;
        }

        let dt = self.dt;
        let half_dt = 0.5 * dt;
        let constrained = system.has_constraints();

        if constrained {
            self.reference.clear();
            self.reference.extend_from_slice(system.positions());
        }

        // First half-kick with the forces from the previous step, then drift.
        {
            let (positions, velocities, masses) = system.state_mut();
            for i in 0..positions.len() {
                velocities[i] += self.agents.get(i).force * (half_dt / masses[i]);
                positions[i] += velocities[i] * dt;
            }
        }

        if constrained {
            self.project_positions(system, dt)?;
        }

        self.gather_forces(system, potential)?;

        // Second half-kick with the fresh forces.
        {
            let (_, velocities, masses) = system.state_mut();
            for i in 0..velocities.len() {
                velocities[i] += self.agents.get(i).force * (half_dt / masses[i]);
            }
        }

        if constrained {
            self.project_velocities(system)?;
        }
        Ok(())
    }

    fn timestep(&self) -> Scalar {
        self.dt
    }

    fn set_timestep(&mut self, dt: Scalar) {
        self.dt = dt;
    }

    fn name(&self) -> &'static str {
        "velocity_verlet"
    }

    fn aliases(&self) -> Vec<&'static str> {
        vec!["vv", "rattle"]
    }

    fn convergence_order(&self) -> usize {
        2
    }

    fn supports_constraints(&self) -> bool {
        true
    }

    fn last_sample(&self) -> Option<StepSample> {
        self.sample
    }
}
