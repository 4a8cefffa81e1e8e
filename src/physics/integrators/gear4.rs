//! Gear 4th-order predictor-corrector integration method
//!
//! A 5-value Gear scheme applied to position and velocity as a pair of
//! first-order systems. Each atom carries four scaled derivatives of each;
//! a step Taylor-extrapolates the whole ladder, re-evaluates forces at the
//! predicted configuration, and feeds the residual between the recomputed
//! and predicted first derivatives back through fixed corrector weights.
//!
//! `reset` must re-derive the ladder from the current configuration before
//! the first step (zeroth-order consistency); starting from a stale or
//! zeroed ladder costs a one-step transient.

use super::{Integrator, StepSample};
use crate::error::{ConstraintError, SimError};
use crate::physics::math::{Scalar, Vector};
use crate::physics::potential::{ForceAccumulator, Potential};
use crate::physics::system::{AgentStore, MdSystem};

/// Corrector weights for the 5-value Gear scheme on a first-order system.
/// The first-derivative weight is 1 and is applied implicitly by replacing
/// the predicted derivative with the recomputed one.
const GEAR0: Scalar = 251.0 / 720.0;
const GEAR2: Scalar = 11.0 / 12.0;
const GEAR3: Scalar = 1.0 / 3.0;
const GEAR4: Scalar = 1.0 / 24.0;

/// Nordsieck ladder for one atom: derivatives 1..=4 of position and of
/// velocity, unscaled (the step-size powers live in the coefficients).
#[derive(Debug, Clone, Copy, Default)]
struct GearAgent {
    dr: [Vector; 4],
    dv: [Vector; 4],
}

pub struct Gear4 {
    dt: Scalar,
    agents: AgentStore<GearAgent>,
    accumulator: ForceAccumulator,
    sample: Option<StepSample>,
}

impl Gear4 {
    pub fn new(dt: Scalar) -> Self {
        Self {
            dt,
            agents: AgentStore::new(),
            accumulator: ForceAccumulator::new(),
            sample: None,
        }
    }

    /// Taylor factors p_k = dt^k / k!.
    fn taylor_factors(&self) -> [Scalar; 4] {
        let p1 = self.dt;
        let p2 = p1 * self.dt / 2.0;
        let p3 = p2 * self.dt / 3.0;
        let p4 = p3 * self.dt / 4.0;
        [p1, p2, p3, p4]
    }

    fn gather_forces(
        &mut self,
        system: &MdSystem,
        potential: &dyn Potential,
    ) -> Result<(), SimError> {
        self.accumulator.reset(system.atom_count());
        potential.compute(system, &mut self.accumulator)?;
        self.sample = Some(StepSample {
            potential_energy: self.accumulator.potential_energy(),
            virial: self.accumulator.virial(),
        });
        Ok(())
    }

    /// Derive a zeroth-consistent ladder from the current configuration:
    /// the position ladder gets the velocity and the acceleration (its
    /// first two derivatives are known exactly), the velocity ladder gets
    /// the acceleration; everything the physics cannot supply is cleared.
    fn prime(
        &mut self,
        system: &mut MdSystem,
        potential: &dyn Potential,
    ) -> Result<(), SimError> {
        self.gather_forces(system, potential)?;
        let forces = self.accumulator.forces();
        let masses = system.masses();
        let velocities = system.velocities();
        for (i, agent) in self.agents.as_mut_slice().iter_mut().enumerate() {
            let acceleration = forces[i] / masses[i];
            *agent = GearAgent::default();
            agent.dr[0] = velocities[i];
            agent.dr[1] = acceleration;
            agent.dv[0] = acceleration;
        }
        Ok(())
    }

    fn predict(&mut self, system: &mut MdSystem) {
        let [p1, p2, p3, p4] = self.taylor_factors();
        let (positions, velocities, _) = system.state_mut();
        for (i, agent) in self.agents.as_mut_slice().iter_mut().enumerate() {
            positions[i] +=
                agent.dr[0] * p1 + agent.dr[1] * p2 + agent.dr[2] * p3 + agent.dr[3] * p4;
            agent.dr[0] += agent.dr[1] * p1 + agent.dr[2] * p2 + agent.dr[3] * p3;
            agent.dr[1] += agent.dr[2] * p1 + agent.dr[3] * p2;
            agent.dr[2] += agent.dr[3] * p1;

            velocities[i] +=
                agent.dv[0] * p1 + agent.dv[1] * p2 + agent.dv[2] * p3 + agent.dv[3] * p4;
            agent.dv[0] += agent.dv[1] * p1 + agent.dv[2] * p2 + agent.dv[3] * p3;
            agent.dv[1] += agent.dv[2] * p1 + agent.dv[3] * p2;
            agent.dv[2] += agent.dv[3] * p1;
        }
    }

    fn correct(&mut self, system: &mut MdSystem) {
        let [p1, p2, p3, p4] = self.taylor_factors();
        let c0 = GEAR0 * p1;
        let c2 = GEAR2 * p1 / p2;
        let c3 = GEAR3 * p1 / p3;
        let c4 = GEAR4 * p1 / p4;

        let (positions, velocities, masses) = system.state_mut();
        let forces = self.accumulator.forces();
        for (i, agent) in self.agents.as_mut_slice().iter_mut().enumerate() {
            // dr/dt is the (predicted) velocity.
            let rate = velocities[i];
            let residual_r = rate - agent.dr[0];
            positions[i] += residual_r * c0;
            agent.dr[0] = rate;
            agent.dr[1] += residual_r * c2;
            agent.dr[2] += residual_r * c3;
            agent.dr[3] += residual_r * c4;

            // dv/dt is the recomputed acceleration.
            let acceleration = forces[i] / masses[i];
            let residual_v = acceleration - agent.dv[0];
            velocities[i] += residual_v * c0;
            agent.dv[0] = acceleration;
            agent.dv[1] += residual_v * c2;
            agent.dv[2] += residual_v * c3;
            agent.dv[3] += residual_v * c4;
        }
    }
}

impl Integrator for Gear4 {
    fn reset(
        &mut self,
        system: &mut MdSystem,
        potential: &dyn Potential,
    ) -> Result<(), SimError> {
        if system.has_constraints() {
            return Err(ConstraintError::UnsupportedScheme { integrator: "gear4" }.into());
        }
        self.agents.sync(system);
        self.prime(system, potential)
    }

    fn step(&mut self, system: &mut MdSystem, potential: &dyn Potential) -> Result<(), SimError> {
        if self.agents.sync(system) {
            self.prime(system, potential)?;
        }

        self.predict(system);
        self.gather_forces(system, potential)?;
        self.correct(system);
        Ok(())
    }

    fn timestep(&self) -> Scalar {
        self.dt
    }

    fn set_timestep(&mut self, dt: Scalar) {
        self.dt = dt;
    }

    fn name(&self) -> &'static str {
        "gear4"
    }

    fn aliases(&self) -> Vec<&'static str> {
        vec!["gear"]
    }

    fn convergence_order(&self) -> usize {
        4
    }

    fn last_sample(&self) -> Option<StepSample> {
        self.sample
    }
}
