//! Simulation state: atoms, molecules, and per-atom integrator agents.
//!
//! Atom state is stored struct-of-arrays and indexed by a dense atom index.
//! Molecules are contiguous ranges of atoms tagged with a species; rigid-bond
//! topology is looked up per species through the `ConstraintTable` owned
//! here. Any structural mutation bumps a topology revision so that agent
//! arenas never survive a topology change.

use crate::physics::constraints::{BondConstraints, ConstraintTable};
use crate::physics::math::{maxwell_boltzmann_velocity, Scalar, Vector};
use crate::resources::SharedRng;
use std::ops::Range;
use std::sync::Arc;

/// Identifies a molecule type for constraint lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpeciesId(pub u32);

/// A contiguous run of atoms belonging to one molecule.
#[derive(Debug, Clone, Copy)]
pub struct Molecule {
    species: SpeciesId,
    first_atom: usize,
    atom_count: usize,
}

impl Molecule {
    pub fn species(&self) -> SpeciesId {
        self.species
    }

    pub fn atoms(&self) -> Range<usize> {
        self.first_atom..self.first_atom + self.atom_count
    }

    pub fn atom_count(&self) -> usize {
        self.atom_count
    }
}

/// The simulated collection of atoms.
#[derive(Debug, Clone, Default)]
pub struct MdSystem {
    positions: Vec<Vector>,
    velocities: Vec<Vector>,
    masses: Vec<Scalar>,
    molecules: Vec<Molecule>,
    constraints: ConstraintTable,
    topology_revision: u64,
}

impl MdSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn atom_count(&self) -> usize {
        self.positions.len()
    }

    pub fn molecule_count(&self) -> usize {
        self.molecules.len()
    }

    /// Bumped by every structural mutation; agent arenas key off this.
    pub fn topology_revision(&self) -> u64 {
        self.topology_revision
    }

    /// Append a molecule. Atom positions and masses must be the same length;
    /// velocities start at zero. Returns the molecule index.
    pub fn add_molecule(
        &mut self,
        species: SpeciesId,
        positions: &[Vector],
        masses: &[Scalar],
    ) -> usize {
        assert_eq!(
            positions.len(),
            masses.len(),
            "one mass per atom position"
        );
        let first_atom = self.positions.len();
        self.positions.extend_from_slice(positions);
        self.velocities
            .extend(std::iter::repeat(Vector::ZERO).take(positions.len()));
        self.masses.extend_from_slice(masses);
        self.molecules.push(Molecule {
            species,
            first_atom,
            atom_count: positions.len(),
        });
        self.topology_revision += 1;
        self.molecules.len() - 1
    }

    /// Remove a molecule and compact the atom arrays. Later molecules shift
    /// down; all atom indices from the removed range onward are invalidated,
    /// which the topology revision records.
    pub fn remove_molecule(&mut self, index: usize) {
        let removed = self.molecules.remove(index);
        let range = removed.atoms();
        self.positions.drain(range.clone());
        self.velocities.drain(range.clone());
        self.masses.drain(range.clone());
        for molecule in &mut self.molecules[index..] {
            molecule.first_atom -= removed.atom_count;
        }
        self.topology_revision += 1;
    }

    pub fn molecules(&self) -> &[Molecule] {
        &self.molecules
    }

    pub fn molecule(&self, index: usize) -> &Molecule {
        &self.molecules[index]
    }

    pub fn positions(&self) -> &[Vector] {
        &self.positions
    }

    pub fn positions_mut(&mut self) -> &mut [Vector] {
        &mut self.positions
    }

    pub fn velocities(&self) -> &[Vector] {
        &self.velocities
    }

    pub fn velocities_mut(&mut self) -> &mut [Vector] {
        &mut self.velocities
    }

    pub fn masses(&self) -> &[Scalar] {
        &self.masses
    }

    /// Simultaneous mutable views of all positions and velocities plus the
    /// masses, for in-place integration sweeps.
    pub fn state_mut(&mut self) -> (&mut [Vector], &mut [Vector], &[Scalar]) {
        (&mut self.positions, &mut self.velocities, &self.masses)
    }

    /// Mutable position and velocity views plus masses for one molecule,
    /// for in-place constraint projection.
    pub fn molecule_state_mut(
        &mut self,
        index: usize,
    ) -> (&mut [Vector], &mut [Vector], &[Scalar]) {
        let range = self.molecules[index].atoms();
        (
            &mut self.positions[range.clone()],
            &mut self.velocities[range.clone()],
            &self.masses[range],
        )
    }

    /// Register the rigid-bond topology for a species. Constraint sets are
    /// immutable once registered.
    pub fn set_constraints(&mut self, species: SpeciesId, constraints: BondConstraints) {
        self.constraints.register(species, constraints);
    }

    pub fn constraints_for(&self, species: SpeciesId) -> Option<&Arc<BondConstraints>> {
        self.constraints.constraints_for(species)
    }

    /// True if any molecule in the box declares rigid bonds.
    pub fn has_constraints(&self) -> bool {
        self.molecules
            .iter()
            .any(|m| self.constraints.constraints_for(m.species).is_some())
    }

    /// Assign Maxwell-Boltzmann velocities at the given temperature and
    /// remove the net momentum so the box does not drift.
    pub fn initialize_velocities(&mut self, temperature: Scalar, rng: &mut SharedRng) {
        for i in 0..self.velocities.len() {
            self.velocities[i] = maxwell_boltzmann_velocity(temperature, self.masses[i], rng);
        }
        self.remove_net_momentum();
    }

    /// Subtract the center-of-mass velocity from every atom.
    pub fn remove_net_momentum(&mut self) {
        let total_mass: Scalar = self.masses.iter().sum();
        if total_mass == 0.0 {
            return;
        }
        let drift = self.total_momentum() / total_mass;
        for v in &mut self.velocities {
            *v -= drift;
        }
    }

    pub fn kinetic_energy(&self) -> Scalar {
        self.velocities
            .iter()
            .zip(&self.masses)
            .map(|(v, m)| 0.5 * m * v.length_squared())
            .sum()
    }

    /// Instantaneous temperature from equipartition, k_B = 1.
    pub fn temperature(&self) -> Scalar {
        if self.positions.is_empty() {
            return 0.0;
        }
        2.0 * self.kinetic_energy() / (3.0 * self.positions.len() as Scalar)
    }

    pub fn total_momentum(&self) -> Vector {
        self.velocities
            .iter()
            .zip(&self.masses)
            .map(|(v, m)| *v * *m)
            .sum()
    }

    pub fn center_of_mass(&self) -> Vector {
        let total_mass: Scalar = self.masses.iter().sum();
        if total_mass == 0.0 {
            return Vector::ZERO;
        }
        self.positions
            .iter()
            .zip(&self.masses)
            .map(|(r, m)| *r * *m)
            .sum::<Vector>()
            / total_mass
    }
}

/// Place `count` points on a jittered simple-cubic lattice, for seeding
/// demo fluids.
pub fn cubic_lattice(
    count: usize,
    spacing: Scalar,
    jitter: Scalar,
    rng: &mut SharedRng,
) -> Vec<Vector> {
    use rand::Rng;

    let per_side = (count as Scalar).cbrt().ceil() as usize;
    let mut points = Vec::with_capacity(count);
    'fill: for ix in 0..per_side {
        for iy in 0..per_side {
            for iz in 0..per_side {
                if points.len() == count {
                    break 'fill;
                }
                let cell = Vector::new(ix as Scalar, iy as Scalar, iz as Scalar) * spacing;
                let offset = Vector::new(
                    rng.random_range(-jitter..=jitter),
                    rng.random_range(-jitter..=jitter),
                    rng.random_range(-jitter..=jitter),
                );
                points.push(cell + offset);
            }
        }
    }
    points
}

/// Dense per-atom auxiliary storage for an integration scheme.
///
/// Agents are keyed by atom index and rebuilt from `Default` whenever the
/// system's topology revision moves, so no agent is ever read across an
/// add/remove of atoms.
#[derive(Debug, Clone)]
pub struct AgentStore<A> {
    agents: Vec<A>,
    revision: Option<u64>,
}

impl<A: Default + Clone> AgentStore<A> {
    pub fn new() -> Self {
        Self {
            agents: Vec::new(),
            revision: None,
        }
    }

    /// Bring the arena in line with the system. Returns true when the store
    /// was rebuilt, in which case any derivative history it held is gone and
    /// the caller must re-prime it.
    pub fn sync(&mut self, system: &MdSystem) -> bool {
        if self.revision == Some(system.topology_revision()) {
            return false;
        }
        self.agents.clear();
        self.agents.resize(system.atom_count(), A::default());
        self.revision = Some(system.topology_revision());
        true
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn get(&self, atom: usize) -> &A {
        &self.agents[atom]
    }

    pub fn get_mut(&mut self, atom: usize) -> &mut A {
        &mut self.agents[atom]
    }

    pub fn as_slice(&self) -> &[A] {
        &self.agents
    }

    pub fn as_mut_slice(&mut self) -> &mut [A] {
        &mut self.agents
    }
}

impl<A: Default + Clone> Default for AgentStore<A> {
    fn default() -> Self {
        Self::new()
    }
}
