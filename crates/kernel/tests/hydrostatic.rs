//! Hydrostatic pool test.
//!
//! A pool filling the lower half of a small box settles under gravity. The
//! run checks confinement, the hydrostatic density and pressure gradients,
//! and that the bulk density stays near the rest density.

use glam::Vec3;
use kernel::{Aabb, Scene, Shape, Simulation};

#[test]
fn pool_settles_with_hydrostatic_gradient() {
    let bounds = Aabb::new(Vec3::splat(-0.1), Vec3::splat(0.1));
    let rest_density = 1000.0_f32;
    let scene = Scene {
        bounds,
        gravity: Vec3::new(0.0, -9.81, 0.0),
        rest_density,
        particle_radius: 0.01,
        liquids: vec![Shape::Box(Aabb::new(
            bounds.min,
            Vec3::new(bounds.max.x, 0.0, bounds.max.z),
        ))],
        ..Scene::default()
    };
    let mut sim = Simulation::new(&scene).unwrap();
    eprintln!("fluid particles: {}", sim.fluid_count());
    assert!(sim.fluid_count() > 500);

    let dt = sim.max_timestep();
    let steps = 300;
    for step in 0..steps {
        sim.update(dt);
        if step % 50 == 0 {
            let v_max = sim
                .fluid_velocities()
                .iter()
                .map(|v| v.length())
                .fold(0.0_f32, f32::max);
            eprintln!("step {step}: v_max = {v_max:.3}");
        }
    }

    // --- The pool has settled: no net vertical motion remains. ---
    let mean_vy = sim.fluid_velocities().iter().map(|v| v.y).sum::<f32>()
        / sim.fluid_count() as f32;
    eprintln!("mean vertical velocity = {mean_vy:.4}");
    assert!(
        mean_vy.abs() < 0.05,
        "mean vertical velocity {mean_vy:.4} exceeds 0.05 m/s after settling"
    );

    // --- Confinement: the collision stage guarantees the box, exactly. ---
    let eps = 1.0e-5;
    for p in sim.fluid_positions() {
        assert!(
            p.cmpge(bounds.min - Vec3::splat(eps)).all()
                && p.cmple(bounds.max + Vec3::splat(eps)).all(),
            "particle left the world box: {p}"
        );
    }

    // --- Hydrostatic gradients: compare bottom and top height quartiles. ---
    let mut by_height: Vec<(f32, f32, f32)> = sim
        .fluid_positions()
        .iter()
        .zip(sim.fluid_densities())
        .zip(sim.fluid_pressures())
        .map(|((p, rho), pr)| (p.y, *rho, *pr))
        .collect();
    by_height.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap());

    let quarter = by_height.len() / 4;
    let bottom_rho: f32 =
        by_height[..quarter].iter().map(|v| v.1).sum::<f32>() / quarter as f32;
    let top_rho: f32 =
        by_height[by_height.len() - quarter..].iter().map(|v| v.1).sum::<f32>() / quarter as f32;
    let bottom_p: f32 =
        by_height[..quarter].iter().map(|v| v.2).sum::<f32>() / quarter as f32;
    let top_p: f32 =
        by_height[by_height.len() - quarter..].iter().map(|v| v.2).sum::<f32>() / quarter as f32;

    eprintln!("bottom/top density: {bottom_rho:.1} / {top_rho:.1}");
    eprintln!("bottom/top pressure: {bottom_p:.1} / {top_p:.1}");
    assert!(
        bottom_rho > top_rho,
        "bottom density ({bottom_rho:.1}) should exceed top ({top_rho:.1})"
    );
    assert!(
        bottom_p > top_p,
        "bottom pressure ({bottom_p:.1}) should exceed top ({top_p:.1})"
    );

    // --- Bulk density: particles in a band below the free surface and away
    // from the walls keep a tight spread around the rest density. The 5%
    // tails are dropped so a stray surface splash cannot dominate. ---
    let mut interior: Vec<f32> = sim
        .fluid_positions()
        .iter()
        .zip(sim.fluid_densities())
        .filter(|(p, _)| {
            p.y < -0.035
                && p.y > -0.055
                && p.x.abs() < 0.06
                && p.z.abs() < 0.06
        })
        .map(|(_, rho)| *rho)
        .collect();
    assert!(!interior.is_empty(), "expected interior particles below the surface");
    interior.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let tail = interior.len() / 20;
    let interior = &interior[tail..interior.len() - tail];

    let mean = interior.iter().sum::<f32>() / interior.len() as f32;
    let std = (interior.iter().map(|r| (r - mean).powi(2)).sum::<f32>()
        / interior.len() as f32)
        .sqrt();
    eprintln!("interior density: mean {mean:.1}, std {std:.1} ({} samples)", interior.len());
    assert!(
        (mean - rest_density).abs() < 0.15 * rest_density,
        "interior mean density {mean:.1} strays from rest density"
    );
    assert!(
        std < 0.1 * rest_density,
        "interior density spread {std:.1} exceeds 10% of the rest density"
    );
}
