//! Lattice fills: turn liquid primitives into particle positions.
//!
//! All fills emit points of the global lattice `{ (x, y, z) * spacing }`
//! rather than a lattice anchored to the primitive, so adjacent primitives
//! tile without seams.

use glam::Vec3;

use crate::aabb::Aabb;
use crate::mesh::TriMesh;

/// Lattice index range covering `[min, max]`: `ceil(min/d) ..= floor(max/d)`.
#[inline]
fn lattice_range(min: f32, max: f32, spacing: f32) -> (i32, i32) {
    ((min / spacing).ceil() as i32, (max / spacing).floor() as i32)
}

/// Fill an axis-aligned box with lattice points.
pub fn fill_box(bounds: &Aabb, spacing: f32, out: &mut Vec<Vec3>) {
    let (x0, x1) = lattice_range(bounds.min.x, bounds.max.x, spacing);
    let (y0, y1) = lattice_range(bounds.min.y, bounds.max.y, spacing);
    let (z0, z1) = lattice_range(bounds.min.z, bounds.max.z, spacing);
    for z in z0..=z1 {
        for y in y0..=y1 {
            for x in x0..=x1 {
                out.push(Vec3::new(x as f32, y as f32, z as f32) * spacing);
            }
        }
    }
}

/// Fill a sphere with lattice points (accepts `|p - c|^2 <= r^2`).
pub fn fill_sphere(center: Vec3, radius: f32, spacing: f32, out: &mut Vec<Vec3>) {
    let (x0, x1) = lattice_range(center.x - radius, center.x + radius, spacing);
    let (y0, y1) = lattice_range(center.y - radius, center.y + radius, spacing);
    let (z0, z1) = lattice_range(center.z - radius, center.z + radius, spacing);
    let radius_sq = radius * radius;
    for z in z0..=z1 {
        for y in y0..=y1 {
            for x in x0..=x1 {
                let p = Vec3::new(x as f32, y as f32, z as f32) * spacing;
                if (p - center).length_squared() <= radius_sq {
                    out.push(p);
                }
            }
        }
    }
}

/// Fill the interior of a closed mesh with lattice points (even-odd parity
/// along axis-parallel rays).
pub fn fill_mesh(mesh: &TriMesh, spacing: f32, out: &mut Vec<Vec3>) {
    let bounds = mesh.bounds();
    let (x0, x1) = lattice_range(bounds.min.x, bounds.max.x, spacing);
    let (y0, y1) = lattice_range(bounds.min.y, bounds.max.y, spacing);
    let (z0, z1) = lattice_range(bounds.min.z, bounds.max.z, spacing);

    let mut crossings = Vec::new();
    for z in z0..=z1 {
        for y in y0..=y1 {
            mesh.ray_crossings_x(y as f32 * spacing, z as f32 * spacing, &mut crossings);
            let mut ahead = 0;
            for x in x0..=x1 {
                let wx = x as f32 * spacing;
                while ahead < crossings.len() && crossings[ahead] < wx {
                    ahead += 1;
                }
                if ahead % 2 == 1 {
                    out.push(Vec3::new(wx, y as f32 * spacing, z as f32 * spacing));
                }
            }
        }
    }
}
