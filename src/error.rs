//! Error taxonomy for the simulation engine
//!
//! Contract violations, constraint-solver failures, and potential-evaluation
//! failures are separate kinds so callers can assert on the contract rather
//! than on the absence of a crash. Non-convergence of the constraint solver
//! is deliberately NOT an error; see `physics::constraints::Convergence`.

use std::fmt;

/// Umbrella error for anything that can escape a running activity.
#[derive(Debug, Clone, PartialEq)]
pub enum SimError {
    Control(ControlError),
    Constraint(ConstraintError),
    Potential(PotentialError),
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimError::Control(e) => write!(f, "control protocol violation: {e}"),
            SimError::Constraint(e) => write!(f, "constraint solve failed: {e}"),
            SimError::Potential(e) => write!(f, "potential evaluation failed: {e}"),
        }
    }
}

impl std::error::Error for SimError {}

impl From<ControlError> for SimError {
    fn from(e: ControlError) -> Self {
        SimError::Control(e)
    }
}

impl From<ConstraintError> for SimError {
    fn from(e: ConstraintError) -> Self {
        SimError::Constraint(e)
    }
}

impl From<PotentialError> for SimError {
    fn from(e: PotentialError) -> Self {
        SimError::Potential(e)
    }
}

/// Violations of the activity lifecycle contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlError {
    /// `perform()` was called while the activity was already active.
    AlreadyActive,
    /// An operation that requires an idle activity (e.g. series reset)
    /// was called while the run loop was live.
    Busy,
}

impl fmt::Display for ControlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlError::AlreadyActive => write!(f, "activity is already active"),
            ControlError::Busy => write!(f, "operation requires an idle activity"),
        }
    }
}

impl std::error::Error for ControlError {}

/// Fatal constraint-solver failures.
///
/// Exceeding the sweep limit is not fatal and not represented here.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConstraintError {
    /// The geometry no longer supports a well-defined correction: for the
    /// position solve, the trial separation has become near-perpendicular
    /// to the reference direction; for the velocity solve, the separation
    /// has left the constraint manifold entirely.
    DegenerateGeometry {
        molecule: usize,
        atom_a: usize,
        atom_b: usize,
        /// Diagnostic ratio that tripped the guard.
        measure: f64,
    },
    /// An integrator that cannot solve constraints was asked to run a
    /// system that declares them.
    UnsupportedScheme { integrator: &'static str },
}

impl fmt::Display for ConstraintError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstraintError::DegenerateGeometry {
                molecule,
                atom_a,
                atom_b,
                measure,
            } => write!(
                f,
                "degenerate geometry on bond ({atom_a}, {atom_b}) of molecule {molecule} \
                 (measure {measure:.3e})"
            ),
            ConstraintError::UnsupportedScheme { integrator } => write!(
                f,
                "integrator '{integrator}' does not support rigid-bond constraints"
            ),
        }
    }
}

impl std::error::Error for ConstraintError {}

/// Failures reported by a potential-calculation collaborator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PotentialError {
    /// Two atoms overlapped closely enough to produce a non-finite energy.
    Overlap { atom_a: usize, atom_b: usize, r2: f64 },
}

impl fmt::Display for PotentialError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PotentialError::Overlap { atom_a, atom_b, r2 } => {
                write!(f, "atoms {atom_a} and {atom_b} overlap (r2 = {r2:.3e})")
            }
        }
    }
}

impl std::error::Error for PotentialError {}
