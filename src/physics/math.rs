use crate::resources::SharedRng;
use rand::Rng;
use rand_distr::StandardNormal;

/// Scalar type for physics calculations (f64 for precision)
pub type Scalar = f64;

/// 3D vector type for positions, velocities, and forces
pub type Vector = glam::DVec3;

/// Draw one velocity component from the Maxwell-Boltzmann distribution
/// at the given temperature (k_B = 1 reduced units).
///
/// Each Cartesian component is Gaussian with sigma = sqrt(T/m).
pub fn maxwell_boltzmann_component(
    temperature: Scalar,
    mass: Scalar,
    rng: &mut SharedRng,
) -> Scalar {
    let sigma = (temperature / mass).sqrt();
    let n: Scalar = rng.sample(StandardNormal);
    sigma * n
}

/// Draw a full Maxwell-Boltzmann velocity vector.
pub fn maxwell_boltzmann_velocity(
    temperature: Scalar,
    mass: Scalar,
    rng: &mut SharedRng,
) -> Vector {
    Vector::new(
        maxwell_boltzmann_component(temperature, mass, rng),
        maxwell_boltzmann_component(temperature, mass, rng),
        maxwell_boltzmann_component(temperature, mass, rng),
    )
}

/// Random unit vector, uniform over the sphere.
pub fn random_unit_vector(rng: &mut SharedRng) -> Vector {
    let theta: Scalar = rng.random_range(0.0..=2.0 * std::f64::consts::PI);
    let phi = Scalar::acos(rng.random_range(-1.0..=1.0));

    Vector::new(phi.sin() * theta.cos(), phi.sin() * theta.sin(), phi.cos())
}
