//! Boundary generator coverage and relaxation tests.

use glam::Vec3;
use kernel::boundary;
use kernel::{Aabb, TriMesh};

/// Every point of the box surface lies within `sqrt(3) * d` of a sample.
#[test]
fn box_surface_coverage() {
    let bounds = Aabb::new(Vec3::ZERO, Vec3::ONE);
    let r_p = 0.05_f32;
    let d = 2.0 * r_p;
    let samples = boundary::box_surface(&bounds, r_p, false);
    assert_eq!(samples.len(), 602);

    let max_gap = 3.0_f32.sqrt() * d + 1.0e-5;
    let mut worst = 0.0_f32;
    // Probe a dense grid on each face.
    let probes = 40;
    for a in 0..=probes {
        for b in 0..=probes {
            let u = a as f32 / probes as f32;
            let v = b as f32 / probes as f32;
            let face_points = [
                Vec3::new(0.0, u, v),
                Vec3::new(1.0, u, v),
                Vec3::new(u, 0.0, v),
                Vec3::new(u, 1.0, v),
                Vec3::new(u, v, 0.0),
                Vec3::new(u, v, 1.0),
            ];
            for p in face_points {
                let nearest = samples
                    .positions
                    .iter()
                    .map(|s| s.distance(p))
                    .fold(f32::INFINITY, f32::min);
                worst = worst.max(nearest);
                assert!(
                    nearest <= max_gap,
                    "surface point {p} is {nearest} from the nearest sample (max {max_gap})"
                );
            }
        }
    }
    eprintln!("worst surface gap = {worst:.4} (bound {max_gap:.4})");
}

/// An eleventh relaxation sweep barely moves the converged distribution.
#[test]
fn mesh_relaxation_is_nearly_idempotent() {
    let mesh = TriMesh::box_mesh(&Aabb::new(Vec3::ZERO, Vec3::ONE));
    let r_p = 0.05_f32;
    let cells = 64;

    let ten = boundary::mesh_surface_with(&mesh, r_p, cells, 10);
    let eleven = boundary::mesh_surface_with(&mesh, r_p, cells, 11);
    assert_eq!(ten.len(), eleven.len(), "seeding is deterministic");

    // Average neighbour spacing for N samples over area A.
    let n = ten.len() as f32;
    let spacing = (mesh.total_area() / n).sqrt();

    let mut worst = 0.0_f32;
    for (a, b) in ten.positions.iter().zip(&eleven.positions) {
        worst = worst.max(a.distance(*b));
    }
    eprintln!(
        "extra sweep moved samples by at most {worst:.5} (spacing {spacing:.5})"
    );
    assert!(
        worst <= 0.1 * spacing,
        "extra sweep moved a sample by {worst}, more than 10% of spacing {spacing}"
    );
}

/// Mesh sample normals agree with the cube's outward face normals away from
/// edges.
#[test]
fn mesh_normals_point_outward() {
    let mesh = TriMesh::box_mesh(&Aabb::new(Vec3::ZERO, Vec3::ONE));
    let samples = boundary::mesh_surface_with(&mesh, 0.05, 64, 10);

    let mut checked = 0;
    for (p, n) in samples.positions.iter().zip(&samples.normals) {
        // Only judge samples close to the top face and away from its edges.
        if (p.y - 1.0).abs() < 0.02
            && p.x > 0.2
            && p.x < 0.8
            && p.z > 0.2
            && p.z < 0.8
        {
            assert!(
                n.y > 0.7,
                "top-face sample at {p} has normal {n}, expected roughly +y"
            );
            checked += 1;
        }
    }
    assert!(checked > 10, "expected plenty of top-face samples, got {checked}");
}
