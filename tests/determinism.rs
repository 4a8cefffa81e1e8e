//! Integration tests for reproducibility of seeded runs.

use moldrift::physics::math::random_unit_vector;
use moldrift::prelude::*;

fn seeded_system(seed: u64) -> MdSystem {
    let mut rng = SharedRng::from_seed(seed);
    let species = SpeciesId(0);
    let mut system = MdSystem::new();
    for center in cubic_lattice(8, 2.2, 0.05, &mut rng) {
        let axis = random_unit_vector(&mut rng);
        system.add_molecule(
            species,
            &[center - axis * 0.5, center + axis * 0.5],
            &[1.0, 1.0],
        );
    }
    system.set_constraints(species, BondConstraints::new([(0, 1, 1.0)]));
    system.initialize_velocities(1.5, &mut rng);
    system
}

fn run_trajectory(seed: u64, steps: u64) -> MdSystem {
    let mut run = IntegrationRun::new(
        seeded_system(seed),
        Box::new(LennardJones::reduced()),
        Box::new(VelocityVerlet::new(0.002)),
    )
    .with_max_steps(steps);
    run.perform().unwrap();
    run.system().clone()
}

#[test]
fn test_same_seed_reproduces_initial_state() {
    let a = seeded_system(42);
    let b = seeded_system(42);

    assert_eq!(a.positions(), b.positions());
    assert_eq!(a.velocities(), b.velocities());
}

#[test]
fn test_different_seeds_differ() {
    let a = seeded_system(42);
    let b = seeded_system(43);

    assert_ne!(a.positions(), b.positions());
}

#[test]
fn test_same_seed_reproduces_trajectory() {
    let a = run_trajectory(7, 200);
    let b = run_trajectory(7, 200);

    assert_eq!(a.positions(), b.positions());
    assert_eq!(a.velocities(), b.velocities());
}

#[test]
fn test_velocity_initialization_temperature_scale() {
    // Not a strict equipartition check (64 atoms is a small sample), but
    // the sampled temperature should land in the right neighborhood and
    // scale with the requested one.
    let mut system = seeded_system(3);
    let cold = system.temperature();

    let mut rng = SharedRng::from_seed(3);
    system.initialize_velocities(6.0, &mut rng);
    let hot = system.temperature();

    assert!(cold > 0.3 && cold < 4.0, "cold temperature {cold}");
    assert!(hot > cold, "reheating should raise the temperature");
    assert!(system.total_momentum().length() < 1e-10);
}
