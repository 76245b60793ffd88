//! Momentum conservation without external forces.
//!
//! Pressure, cohesion and curvature forces are pairwise antisymmetric, so
//! without gravity and wall contacts the only momentum leak is the
//! `1 / rho_j` denominator of the viscosity term: a pair with unequal
//! densities exchanges slightly unequal viscous impulses. Once particles
//! move, an absolute near-zero drift bound is therefore out of reach near
//! free surfaces, where neighbour densities differ the most. These tests
//! pin the leak instead: per step relative to the impulse actually
//! exchanged, and over a run relative to the momentum scale of the initial
//! velocity field.

use glam::Vec3;
use kernel::{Aabb, Scene, Simulation};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

fn zero_gravity_scene() -> Scene {
    Scene {
        // Generous bounds: nothing must ever reach a wall, so the collision
        // stage stays inactive for the whole run.
        bounds: Aabb::new(Vec3::splat(-2.0), Vec3::splat(3.0)),
        gravity: Vec3::ZERO,
        particle_radius: 0.025,
        ..Scene::default()
    }
}

/// Cubic cluster centered at (0.5, 0.5, 0.5).
fn add_cluster(sim: &mut Simulation, half_extent: i32) {
    let d = sim.parameters().particle_diameter;
    let mut points = Vec::new();
    for z in -half_extent..=half_extent {
        for y in -half_extent..=half_extent {
            for x in -half_extent..=half_extent {
                points.push(Vec3::splat(0.5) + Vec3::new(x as f32, y as f32, z as f32) * d);
            }
        }
    }
    sim.add_liquid_particles(&points);
}

fn total_momentum(sim: &Simulation) -> Vec3 {
    let m = sim.parameters().particle_mass;
    sim.fluid_velocities().iter().map(|v| *v * m).sum()
}

/// Per-step momentum drift is a vanishing fraction of the impulse the
/// particles exchange in that step.
#[test]
fn momentum_drift_is_tiny_against_exchanged_impulse() {
    let mut sim = Simulation::new(&zero_gravity_scene()).unwrap();
    add_cluster(&mut sim, 2);
    let dt = 2.0e-4_f32;

    let mut previous = total_momentum(&sim);
    for step in 0..100 {
        sim.update(dt);

        let exchanged: f32 = sim.fluid_forces().iter().map(|f| f.length()).sum::<f32>() * dt;
        let current = total_momentum(&sim);
        let drift = (current - previous).length();
        assert!(
            drift <= 0.02 * exchanged + 1.0e-12,
            "step {step}: drift {drift:.3e} vs exchanged impulse {exchanged:.3e}"
        );
        previous = current;
    }

    // The cluster never came near a wall, so no collision response fired.
    for p in sim.fluid_positions() {
        assert!(
            p.distance(Vec3::splat(0.5)) < 1.5,
            "particle escaped the cluster region: {p}"
        );
    }
}

/// A random Gaussian velocity field keeps its total momentum to within 10%
/// of the field's own momentum scale (`m * Nf * sigma`) over 100 steps.
///
/// This is a deliberately weaker bound than "zero": the viscous `1 / rho_j`
/// denominator leaks momentum on every unequal-density pair, so only a
/// scale-relative bound is meaningful here.
#[test]
fn random_velocity_field_momentum_drift_is_small() {
    let mut sim = Simulation::new(&zero_gravity_scene()).unwrap();
    add_cluster(&mut sim, 2);
    let n = sim.fluid_count();
    let m = sim.parameters().particle_mass;

    // Box-Muller Gaussian components, sigma = 0.1 m/s.
    let sigma = 0.1_f32;
    let mut rng = Pcg32::seed_from_u64(23);
    let mut gaussian = || {
        let u: f32 = rng.gen_range(1.0e-7..1.0);
        let v: f32 = rng.gen_range(0.0..std::f32::consts::TAU);
        sigma * (-2.0 * u.ln()).sqrt() * v.cos()
    };
    for vel in sim.fluid_velocities_mut() {
        *vel = Vec3::new(gaussian(), gaussian(), gaussian());
    }

    let initial = total_momentum(&sim);
    for _ in 0..100 {
        sim.update(2.0e-4);
    }
    let drift = (total_momentum(&sim) - initial).length();

    let scale = m * n as f32 * sigma;
    eprintln!("momentum drift {drift:.2e} vs field scale {scale:.2e}");
    assert!(
        drift < 0.1 * scale,
        "momentum drift {drift} exceeds 10% of the initial field scale {scale}"
    );

    for p in sim.fluid_positions() {
        assert!(p.distance(Vec3::splat(0.5)) < 1.5);
    }
}
