//! Rigid-bond constraints and the SHAKE/RATTLE projection solvers.
//!
//! `BondConstraints` is an immutable per-species description of which atom
//! pairs inside a molecule are held at fixed length. The solver projects
//! unconstrained trial positions (SHAKE) or velocities (RATTLE) back onto
//! the fixed-length manifold by iterative relaxation over the bonds,
//! sweeping until a full pass applies no correction.
//!
//! Exceeding the sweep budget is survivable: the solver logs a warning and
//! reports `Convergence::Incomplete`, leaving whatever partial correction it
//! reached. Geometry that makes the correction ill-defined is not: both
//! solvers abort with `ConstraintError::DegenerateGeometry`.

use crate::error::ConstraintError;
use crate::physics::math::{Scalar, Vector};
use crate::physics::system::SpeciesId;
use log::warn;
use std::collections::HashMap;
use std::sync::Arc;

/// One rigid bond between two atoms of a molecule, by molecule-local index.
#[derive(Debug, Clone, Copy)]
pub struct BondConstraint {
    pub a: usize,
    pub b: usize,
    pub length: Scalar,
    pub length_sq: Scalar,
}

/// The full rigid-bond topology of one molecule type. Built once from the
/// species definition, read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct BondConstraints {
    bonds: Vec<BondConstraint>,
    atom_span: usize,
}

impl BondConstraints {
    /// Build from `(atom_a, atom_b, target_length)` triples, indices local
    /// to the molecule.
    pub fn new(bonds: impl IntoIterator<Item = (usize, usize, Scalar)>) -> Self {
        let bonds: Vec<BondConstraint> = bonds
            .into_iter()
            .map(|(a, b, length)| {
                assert!(a != b, "a bond needs two distinct atoms");
                assert!(length > 0.0, "bond length must be positive");
                BondConstraint {
                    a,
                    b,
                    length,
                    length_sq: length * length,
                }
            })
            .collect();
        let atom_span = bonds
            .iter()
            .map(|bond| bond.a.max(bond.b) + 1)
            .max()
            .unwrap_or(0);
        Self { bonds, atom_span }
    }

    pub fn bonds(&self) -> &[BondConstraint] {
        &self.bonds
    }

    pub fn len(&self) -> usize {
        self.bonds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bonds.is_empty()
    }

    /// Number of molecule-local atom slots the bond indices address.
    pub fn atom_span(&self) -> usize {
        self.atom_span
    }
}

/// Species-to-constraints association, owned by the simulation box.
#[derive(Debug, Clone, Default)]
pub struct ConstraintTable {
    by_species: HashMap<SpeciesId, Arc<BondConstraints>>,
}

impl ConstraintTable {
    pub fn register(&mut self, species: SpeciesId, constraints: BondConstraints) {
        self.by_species.insert(species, Arc::new(constraints));
    }

    pub fn constraints_for(&self, species: SpeciesId) -> Option<&Arc<BondConstraints>> {
        self.by_species.get(&species)
    }
}

/// Outcome of one relaxation solve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Convergence {
    Converged { sweeps: usize },
    /// The sweep budget ran out; the state carries the partial correction.
    Incomplete { sweeps: usize, worst_violation: Scalar },
}

impl Convergence {
    pub fn converged(&self) -> bool {
        matches!(self, Convergence::Converged { .. })
    }

    pub fn sweeps(&self) -> usize {
        match self {
            Convergence::Converged { sweeps } => *sweeps,
            Convergence::Incomplete { sweeps, .. } => *sweeps,
        }
    }
}

/// Minimum value of (dr . dr_ref) / L^2 below which the SHAKE corrector
/// denominator is considered ill-defined.
const MIN_DIRECTIONAL_OVERLAP: Scalar = 1e-6;

/// Relative deviation of |dr|^2 from L^2 beyond which a velocity projection
/// is meaningless: the configuration has left the constraint manifold.
const MAX_MANIFOLD_DEVIATION: Scalar = 0.5;

/// Iterative SHAKE/RATTLE relaxation with reusable sweep scratch.
#[derive(Debug, Clone)]
pub struct ConstraintSolver {
    tolerance: Scalar,
    max_sweeps: usize,
    // Two bitmask buffers, swapped each sweep: a bond is revisited only if
    // one of its endpoints was corrected in the previous sweep.
    moved_now: Vec<bool>,
    moved_next: Vec<bool>,
}

impl Default for ConstraintSolver {
    fn default() -> Self {
        Self::new(1e-10, 200)
    }
}

impl ConstraintSolver {
    pub fn new(tolerance: Scalar, max_sweeps: usize) -> Self {
        assert!(tolerance > 0.0, "tolerance must be positive");
        assert!(max_sweeps > 0, "at least one sweep");
        Self {
            tolerance,
            max_sweeps,
            moved_now: Vec::new(),
            moved_next: Vec::new(),
        }
    }

    pub fn tolerance(&self) -> Scalar {
        self.tolerance
    }

    fn start_sweeps(&mut self, atom_count: usize) {
        self.moved_now.clear();
        self.moved_now.resize(atom_count, true);
        self.moved_next.clear();
        self.moved_next.resize(atom_count, false);
    }

    fn next_sweep(&mut self) {
        std::mem::swap(&mut self.moved_now, &mut self.moved_next);
        self.moved_next.iter_mut().for_each(|m| *m = false);
    }

    /// SHAKE: project trial positions back onto the bond-length manifold.
    ///
    /// `reference` holds the molecule's positions from before the position
    /// update; its separations supply the correction directions. Position
    /// corrections carry the implied velocity corrections (scaled by 1/dt)
    /// so bond-relative velocities stay consistent with the moved endpoints.
    pub fn relax_positions(
        &mut self,
        molecule: usize,
        positions: &mut [Vector],
        velocities: &mut [Vector],
        masses: &[Scalar],
        reference: &[Vector],
        constraints: &BondConstraints,
        dt: Scalar,
    ) -> Result<Convergence, ConstraintError> {
        debug_assert!(constraints.atom_span() <= positions.len());
        self.start_sweeps(positions.len());

        let inv_dt = if dt > 0.0 { 1.0 / dt } else { 0.0 };
        let mut sweeps = 0;
        let mut worst: Scalar = 0.0;

        while sweeps < self.max_sweeps {
            let mut corrected = false;
            worst = 0.0;

            for bond in constraints.bonds() {
                if !(self.moved_now[bond.a] || self.moved_now[bond.b]) {
                    continue;
                }
                let dr = positions[bond.b] - positions[bond.a];
                let diff = bond.length_sq - dr.length_squared();
                let violation = diff.abs() / bond.length_sq;
                worst = worst.max(violation);
                if violation < 2.0 * self.tolerance {
                    continue;
                }

                let dr_ref = reference[bond.b] - reference[bond.a];
                let overlap = dr.dot(dr_ref);
                if overlap / bond.length_sq < MIN_DIRECTIONAL_OVERLAP {
                    return Err(ConstraintError::DegenerateGeometry {
                        molecule,
                        atom_a: bond.a,
                        atom_b: bond.b,
                        measure: overlap / bond.length_sq,
                    });
                }

                let reduced = 1.0 / masses[bond.a] + 1.0 / masses[bond.b];
                let g = diff / (2.0 * reduced * overlap);

                positions[bond.a] -= dr_ref * (g / masses[bond.a]);
                positions[bond.b] += dr_ref * (g / masses[bond.b]);
                velocities[bond.a] -= dr_ref * (g * inv_dt / masses[bond.a]);
                velocities[bond.b] += dr_ref * (g * inv_dt / masses[bond.b]);

                self.moved_next[bond.a] = true;
                self.moved_next[bond.b] = true;
                corrected = true;
            }

            sweeps += 1;
            if !corrected {
                return Ok(Convergence::Converged { sweeps });
            }
            self.next_sweep();
        }

        warn!(
            "SHAKE on molecule {molecule} stopped after {sweeps} sweeps \
             (worst |dL2|/L2 = {worst:.3e})"
        );
        Ok(Convergence::Incomplete {
            sweeps,
            worst_violation: worst,
        })
    }

    /// RATTLE: project velocities so that every constrained bond has zero
    /// length-rate. Positions are read-only and assumed to already satisfy
    /// the constraints (up to tolerance).
    pub fn relax_velocities(
        &mut self,
        molecule: usize,
        positions: &[Vector],
        velocities: &mut [Vector],
        masses: &[Scalar],
        constraints: &BondConstraints,
    ) -> Result<Convergence, ConstraintError> {
        debug_assert!(constraints.atom_span() <= positions.len());
        self.start_sweeps(positions.len());

        let mut sweeps = 0;
        let mut worst: Scalar = 0.0;

        while sweeps < self.max_sweeps {
            let mut corrected = false;
            worst = 0.0;

            for bond in constraints.bonds() {
                if !(self.moved_now[bond.a] || self.moved_now[bond.b]) {
                    continue;
                }
                let dr = positions[bond.b] - positions[bond.a];
                let deviation = (dr.length_squared() - bond.length_sq).abs() / bond.length_sq;
                if deviation > MAX_MANIFOLD_DEVIATION {
                    return Err(ConstraintError::DegenerateGeometry {
                        molecule,
                        atom_a: bond.a,
                        atom_b: bond.b,
                        measure: deviation,
                    });
                }

                let dv = velocities[bond.b] - velocities[bond.a];
                let rate = dr.dot(dv);
                let violation = rate.abs() / bond.length_sq;
                worst = worst.max(violation);
                if violation < self.tolerance {
                    continue;
                }

                let reduced = 1.0 / masses[bond.a] + 1.0 / masses[bond.b];
                let g = -rate / (reduced * bond.length_sq);

                velocities[bond.a] -= dr * (g / masses[bond.a]);
                velocities[bond.b] += dr * (g / masses[bond.b]);

                self.moved_next[bond.a] = true;
                self.moved_next[bond.b] = true;
                corrected = true;
            }

            sweeps += 1;
            if !corrected {
                return Ok(Convergence::Converged { sweeps });
            }
            self.next_sweep();
        }

        warn!(
            "RATTLE on molecule {molecule} stopped after {sweeps} sweeps \
             (worst |dr.dv|/L2 = {worst:.3e})"
        );
        Ok(Convergence::Incomplete {
            sweeps,
            worst_violation: worst,
        })
    }
}
