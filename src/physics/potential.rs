//! Potential-calculation seam between the integrators and the physics.
//!
//! Integrators never walk pairs themselves: they hand a `ForceAccumulator`
//! to a `Potential`, reset it before the walk, and read summed forces,
//! potential energy, and the scalar virial afterwards. Anything that can
//! enumerate interactions (all-pairs, neighbor-list pruned, many-body) can
//! sit behind this trait.

use crate::error::PotentialError;
use crate::physics::math::{Scalar, Vector};
use crate::physics::system::MdSystem;

/// Force/energy sums for one configuration.
#[derive(Debug, Clone, Default)]
pub struct ForceAccumulator {
    forces: Vec<Vector>,
    potential_energy: Scalar,
    virial: Scalar,
}

impl ForceAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Zero all sums and size the force array for `atom_count` atoms.
    /// Callers must reset before every walk.
    pub fn reset(&mut self, atom_count: usize) {
        self.forces.clear();
        self.forces.resize(atom_count, Vector::ZERO);
        self.potential_energy = 0.0;
        self.virial = 0.0;
    }

    /// Accumulate an equal-and-opposite pair force. `dr` is the separation
    /// `r_j - r_i` and `force_on_j` the force the pair exerts on atom `j`.
    /// The pair's virial contribution `dr . f` is tracked for pressure.
    pub fn add_pair(&mut self, i: usize, j: usize, dr: Vector, force_on_j: Vector) {
        self.forces[j] += force_on_j;
        self.forces[i] -= force_on_j;
        self.virial += dr.dot(force_on_j);
    }

    /// Accumulate an external (single-atom) force; no virial bookkeeping.
    pub fn add_external(&mut self, atom: usize, force: Vector) {
        self.forces[atom] += force;
    }

    pub fn add_energy(&mut self, energy: Scalar) {
        self.potential_energy += energy;
    }

    pub fn force(&self, atom: usize) -> Vector {
        self.forces[atom]
    }

    pub fn forces(&self) -> &[Vector] {
        &self.forces
    }

    pub fn potential_energy(&self) -> Scalar {
        self.potential_energy
    }

    pub fn virial(&self) -> Scalar {
        self.virial
    }
}

/// A potential-energy surface the integrators can ask for forces.
pub trait Potential: Send + Sync {
    /// Walk the system's interactions, accumulating into `acc`. The caller
    /// resets the accumulator; implementations only add.
    fn compute(&self, system: &MdSystem, acc: &mut ForceAccumulator)
        -> Result<(), PotentialError>;
}

/// Truncated-and-shifted Lennard-Jones pair potential over all
/// intermolecular atom pairs.
#[derive(Debug, Clone)]
pub struct LennardJones {
    epsilon: Scalar,
    sigma: Scalar,
    cutoff: Scalar,
    /// Energy shift so u(cutoff) = 0.
    shift: Scalar,
}

impl LennardJones {
    pub fn new(epsilon: Scalar, sigma: Scalar, cutoff: Scalar) -> Self {
        let sr6 = (sigma / cutoff).powi(6);
        let shift = 4.0 * epsilon * (sr6 * sr6 - sr6);
        Self {
            epsilon,
            sigma,
            cutoff,
            shift,
        }
    }

    /// Reduced-unit fluid: epsilon = sigma = 1, cutoff 2.5 sigma.
    pub fn reduced() -> Self {
        Self::new(1.0, 1.0, 2.5)
    }

    /// Argon parameters in eV / Angstrom units.
    pub fn argon() -> Self {
        Self::new(0.0104, 3.4, 8.5)
    }

    pub fn sigma(&self) -> Scalar {
        self.sigma
    }
}

impl Potential for LennardJones {
    fn compute(
        &self,
        system: &MdSystem,
        acc: &mut ForceAccumulator,
    ) -> Result<(), PotentialError> {
        let positions = system.positions();
        let cutoff_sq = self.cutoff * self.cutoff;
        let overlap_sq = 1e-12 * self.sigma * self.sigma;

        // Molecule id per atom, to skip intramolecular pairs (those are the
        // business of bonds and constraints, not the pair potential).
        let mut molecule_of = vec![0usize; positions.len()];
        for (m, molecule) in system.molecules().iter().enumerate() {
            for atom in molecule.atoms() {
                molecule_of[atom] = m;
            }
        }

        for i in 0..positions.len() {
            for j in (i + 1)..positions.len() {
                if molecule_of[i] == molecule_of[j] {
                    continue;
                }
                let dr = positions[j] - positions[i];
                let r2 = dr.length_squared();
                if r2 >= cutoff_sq {
                    continue;
                }
                if r2 < overlap_sq {
                    return Err(PotentialError::Overlap {
                        atom_a: i,
                        atom_b: j,
                        r2,
                    });
                }
                let sr2 = self.sigma * self.sigma / r2;
                let sr6 = sr2 * sr2 * sr2;
                let sr12 = sr6 * sr6;
                // f(r)/r, so the vector force is dr * f_over_r.
                let f_over_r = 24.0 * self.epsilon * (2.0 * sr12 - sr6) / r2;
                acc.add_pair(i, j, dr, dr * f_over_r);
                acc.add_energy(4.0 * self.epsilon * (sr12 - sr6) - self.shift);
            }
        }
        Ok(())
    }
}

/// Harmonic springs along each molecule's chain of consecutive atoms,
/// the soft counterpart of a rigid-bond constraint.
#[derive(Debug, Clone, Copy)]
pub struct HarmonicBond {
    pub k: Scalar,
    pub r0: Scalar,
}

impl HarmonicBond {
    pub fn new(k: Scalar, r0: Scalar) -> Self {
        Self { k, r0 }
    }
}

impl Potential for HarmonicBond {
    fn compute(
        &self,
        system: &MdSystem,
        acc: &mut ForceAccumulator,
    ) -> Result<(), PotentialError> {
        let positions = system.positions();
        for molecule in system.molecules() {
            let atoms = molecule.atoms();
            for i in atoms.start..atoms.end.saturating_sub(1) {
                let j = i + 1;
                let dr = positions[j] - positions[i];
                let r = dr.length();
                if r == 0.0 {
                    return Err(PotentialError::Overlap {
                        atom_a: i,
                        atom_b: j,
                        r2: 0.0,
                    });
                }
                let stretch = r - self.r0;
                // Restoring force on j points back toward i when stretched.
                acc.add_pair(i, j, dr, dr * (-self.k * stretch / r));
                acc.add_energy(0.5 * self.k * stretch * stretch);
            }
        }
        Ok(())
    }
}

/// Isotropic harmonic well pinning every atom toward a center; handy as a
/// closed-form test field.
#[derive(Debug, Clone, Copy)]
pub struct HarmonicWell {
    pub k: Scalar,
    pub center: Vector,
}

impl HarmonicWell {
    pub fn new(k: Scalar, center: Vector) -> Self {
        Self { k, center }
    }
}

impl Potential for HarmonicWell {
    fn compute(
        &self,
        system: &MdSystem,
        acc: &mut ForceAccumulator,
    ) -> Result<(), PotentialError> {
        for (i, r) in system.positions().iter().enumerate() {
            let offset = *r - self.center;
            acc.add_external(i, offset * -self.k);
            acc.add_energy(0.5 * self.k * offset.length_squared());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::system::SpeciesId;

    fn pair_system(separation: Scalar) -> MdSystem {
        let mut system = MdSystem::new();
        system.add_molecule(SpeciesId(0), &[Vector::ZERO], &[1.0]);
        system.add_molecule(
            SpeciesId(0),
            &[Vector::new(separation, 0.0, 0.0)],
            &[1.0],
        );
        system
    }

    #[test]
    fn test_lj_forces_are_equal_and_opposite() {
        let lj = LennardJones::reduced();
        let system = pair_system(1.2);
        let mut acc = ForceAccumulator::new();
        acc.reset(system.atom_count());

        lj.compute(&system, &mut acc).unwrap();

        assert!((acc.force(0) + acc.force(1)).length() < 1e-14);
        // Past the minimum at 2^(1/6) sigma ~ 1.122, the pair attracts.
        assert!(acc.force(1).x < 0.0);
    }

    #[test]
    fn test_lj_minimum_energy_position() {
        let lj = LennardJones::reduced();
        let r_min = 2.0f64.powf(1.0 / 6.0);
        let system = pair_system(r_min);
        let mut acc = ForceAccumulator::new();
        acc.reset(system.atom_count());

        lj.compute(&system, &mut acc).unwrap();

        assert!(
            acc.force(1).length() < 1e-12,
            "Force at the LJ minimum should vanish, got {:?}",
            acc.force(1)
        );
    }

    #[test]
    fn test_lj_overlap_is_an_error() {
        let lj = LennardJones::reduced();
        let system = pair_system(1e-9);
        let mut acc = ForceAccumulator::new();
        acc.reset(system.atom_count());

        assert!(matches!(
            lj.compute(&system, &mut acc),
            Err(PotentialError::Overlap { .. })
        ));
    }

    #[test]
    fn test_lj_skips_intramolecular_pairs() {
        let lj = LennardJones::reduced();
        let mut system = MdSystem::new();
        system.add_molecule(
            SpeciesId(0),
            &[Vector::ZERO, Vector::new(1.1, 0.0, 0.0)],
            &[1.0, 1.0],
        );
        let mut acc = ForceAccumulator::new();
        acc.reset(system.atom_count());

        lj.compute(&system, &mut acc).unwrap();

        assert_eq!(acc.force(0), Vector::ZERO);
        assert_eq!(acc.potential_energy(), 0.0);
    }

    #[test]
    fn test_harmonic_bond_restoring_force() {
        let bond = HarmonicBond::new(10.0, 1.0);
        let mut system = MdSystem::new();
        system.add_molecule(
            SpeciesId(0),
            &[Vector::ZERO, Vector::new(1.5, 0.0, 0.0)],
            &[1.0, 1.0],
        );
        let mut acc = ForceAccumulator::new();
        acc.reset(system.atom_count());

        bond.compute(&system, &mut acc).unwrap();

        // Stretched by 0.5: magnitude k * stretch, pulling j toward i.
        assert!((acc.force(1).x + 5.0).abs() < 1e-12);
        assert!((acc.potential_energy() - 1.25).abs() < 1e-12);
    }

    #[test]
    fn test_harmonic_well_pins_to_center() {
        let well = HarmonicWell::new(2.0, Vector::ZERO);
        let system = pair_system(3.0);
        let mut acc = ForceAccumulator::new();
        acc.reset(system.atom_count());

        well.compute(&system, &mut acc).unwrap();

        assert_eq!(acc.force(0), Vector::ZERO);
        assert!((acc.force(1).x + 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_accumulator_virial_tracks_pair_work() {
        let mut acc = ForceAccumulator::new();
        acc.reset(2);
        let dr = Vector::new(2.0, 0.0, 0.0);
        acc.add_pair(0, 1, dr, Vector::new(3.0, 0.0, 0.0));
        assert!((acc.virial() - 6.0).abs() < 1e-14);
    }
}
