//! The activity that drives an integrator.
//!
//! `IntegrationRun` owns the system, the potential, and the scheme; its run
//! loop polls the controller between steps, so pause and halt take effect
//! with one-step granularity and every completed step leaves the per-atom
//! state fully flushed. Physics failures propagate out of `perform`
//! untouched; the scheduler never retries them.

use crate::control::{Activity, Controller};
use crate::error::SimError;
use crate::physics::integrators::{Integrator, StepSample};
use crate::physics::math::Scalar;
use crate::physics::potential::Potential;
use crate::physics::system::MdSystem;
use std::sync::Arc;

pub struct IntegrationRun {
    controller: Arc<Controller>,
    system: MdSystem,
    potential: Box<dyn Potential>,
    integrator: Box<dyn Integrator>,
    max_steps: Option<u64>,
    steps_completed: u64,
    current_time: Scalar,
    primed: bool,
}

impl IntegrationRun {
    pub fn new(
        system: MdSystem,
        potential: Box<dyn Potential>,
        integrator: Box<dyn Integrator>,
    ) -> Self {
        Self {
            controller: Arc::new(Controller::new()),
            system,
            potential,
            integrator,
            max_steps: None,
            steps_completed: 0,
            current_time: 0.0,
            primed: false,
        }
    }

    /// Stop on its own after `steps` time steps (halting earlier still
    /// works; a later `perform` picks up where the halt landed).
    pub fn with_max_steps(mut self, steps: u64) -> Self {
        self.max_steps = Some(steps);
        self
    }

    pub fn set_max_steps(&mut self, steps: Option<u64>) {
        self.max_steps = steps;
    }

    pub fn steps_completed(&self) -> u64 {
        self.steps_completed
    }

    /// Simulation clock: steps taken times the step interval.
    pub fn current_time(&self) -> Scalar {
        self.current_time
    }

    pub fn system(&self) -> &MdSystem {
        &self.system
    }

    /// Direct system access for setup between runs. Only meaningful while
    /// the run loop is idle; the control protocol guarantees no other
    /// thread touches simulation state while the loop is live.
    pub fn system_mut(&mut self) -> &mut MdSystem {
        &mut self.system
    }

    pub fn integrator(&self) -> &dyn Integrator {
        self.integrator.as_ref()
    }

    pub fn last_sample(&self) -> Option<StepSample> {
        self.integrator.last_sample()
    }

    /// Tear down the run so the next `perform` starts from step zero with a
    /// freshly primed integrator.
    pub fn rewind_counters(&mut self) {
        self.steps_completed = 0;
        self.current_time = 0.0;
        self.primed = false;
    }
}

impl Activity for IntegrationRun {
    fn controller(&self) -> &Arc<Controller> {
        &self.controller
    }

    fn label(&self) -> &str {
        "integration"
    }

    fn run(&mut self) -> Result<(), SimError> {
        if !self.primed {
            self.integrator
                .reset(&mut self.system, self.potential.as_ref())?;
            self.primed = true;
        }

        while self.controller.keep_going() {
            if let Some(max_steps) = self.max_steps {
                if self.steps_completed >= max_steps {
                    break;
                }
            }
            self.integrator
                .step(&mut self.system, self.potential.as_ref())?;
            self.steps_completed += 1;
            self.current_time += self.integrator.timestep();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::integrators::VelocityVerlet;
    use crate::physics::math::Vector;
    use crate::physics::potential::HarmonicWell;
    use crate::physics::system::SpeciesId;

    fn oscillator_run(steps: u64, dt: Scalar) -> IntegrationRun {
        let mut system = MdSystem::new();
        system.add_molecule(SpeciesId(0), &[Vector::new(1.0, 0.0, 0.0)], &[1.0]);
        IntegrationRun::new(
            system,
            Box::new(HarmonicWell::new(1.0, Vector::ZERO)),
            Box::new(VelocityVerlet::new(dt)),
        )
        .with_max_steps(steps)
    }

    #[test]
    fn test_run_advances_clock_to_max_steps() {
        let mut run = oscillator_run(100, 0.01);
        run.perform().unwrap();

        assert_eq!(run.steps_completed(), 100);
        assert!((run.current_time() - 1.0).abs() < 1e-12);
        assert!(!run.controller().is_active());
    }

    #[test]
    fn test_repeat_perform_is_a_no_op_at_max_steps() {
        let mut run = oscillator_run(10, 0.01);
        run.perform().unwrap();
        let position = run.system().positions()[0];

        run.perform().unwrap();
        assert_eq!(run.steps_completed(), 10);
        assert_eq!(run.system().positions()[0], position);
    }

    #[test]
    fn test_rewind_counters_restarts_from_zero() {
        let mut run = oscillator_run(10, 0.01);
        run.perform().unwrap();

        run.rewind_counters();
        assert_eq!(run.steps_completed(), 0);

        run.perform().unwrap();
        assert_eq!(run.steps_completed(), 10);
        assert!((run.current_time() - 0.1).abs() < 1e-12);
    }
}
