//! Signed distance fields on uniform voxel grids.
//!
//! The field stores one scalar per voxel, laid out lexicographically with x
//! fastest. Sampling works in continuous voxel coordinates (see
//! [`SdfGrid::to_voxel_space`]); out-of-range samples clamp to the nearest
//! valid voxel. The gradient is returned in voxel units -- divide by the
//! cell size for world units, or normalise it when only the direction
//! matters (as the surface reprojection does).

use glam::Vec3;
use rayon::prelude::*;

use crate::aabb::Aabb;
use crate::mesh::{closest_point_on_triangle, TriMesh};

/// Dense scalar voxel grid with trilinear sampling.
#[derive(Debug, Clone)]
pub struct SdfGrid {
    origin: Vec3,
    cell_size: f32,
    size: [usize; 3],
    values: Vec<f32>,
}

impl SdfGrid {
    /// Create a grid of `size` voxels with every value set to `f32::MAX`.
    pub fn new(origin: Vec3, cell_size: f32, size: [usize; 3]) -> Self {
        Self {
            origin,
            cell_size,
            size,
            values: vec![f32::MAX; size[0] * size[1] * size[2]],
        }
    }

    /// Create a grid from existing values (length must match `size`).
    pub fn with_values(
        origin: Vec3,
        cell_size: f32,
        size: [usize; 3],
        values: Vec<f32>,
    ) -> Result<Self, String> {
        let expected = size[0] * size[1] * size[2];
        if values.len() != expected {
            return Err(format!(
                "value count {} does not match grid size {}x{}x{}",
                values.len(),
                size[0],
                size[1],
                size[2]
            ));
        }
        Ok(Self { origin, cell_size, size, values })
    }

    /// Voxel counts per axis.
    pub fn size(&self) -> [usize; 3] {
        self.size
    }

    /// Voxel edge length in world units.
    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// World origin (position of voxel `(0, 0, 0)`).
    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    #[inline]
    fn index(&self, x: usize, y: usize, z: usize) -> usize {
        x + self.size[0] * (y + self.size[1] * z)
    }

    /// Value stored at integer voxel coordinates.
    #[inline]
    pub fn value(&self, x: usize, y: usize, z: usize) -> f32 {
        self.values[self.index(x, y, z)]
    }

    /// Map a world-space point to continuous voxel coordinates.
    #[inline]
    pub fn to_voxel_space(&self, p: Vec3) -> Vec3 {
        (p - self.origin) / self.cell_size
    }

    /// Trilinearly interpolated value at continuous voxel coordinates `q`,
    /// clamped to the grid.
    pub fn trilinear(&self, q: Vec3) -> f32 {
        let cx = q.x.clamp(0.0, (self.size[0] - 1) as f32);
        let cy = q.y.clamp(0.0, (self.size[1] - 1) as f32);
        let cz = q.z.clamp(0.0, (self.size[2] - 1) as f32);
        let x0 = cx.floor() as usize;
        let y0 = cy.floor() as usize;
        let z0 = cz.floor() as usize;
        let x1 = (x0 + 1).min(self.size[0] - 1);
        let y1 = (y0 + 1).min(self.size[1] - 1);
        let z1 = (z0 + 1).min(self.size[2] - 1);
        let fx = cx - x0 as f32;
        let fy = cy - y0 as f32;
        let fz = cz - z0 as f32;

        let c00 = self.value(x0, y0, z0) * (1.0 - fx) + self.value(x1, y0, z0) * fx;
        let c10 = self.value(x0, y1, z0) * (1.0 - fx) + self.value(x1, y1, z0) * fx;
        let c01 = self.value(x0, y0, z1) * (1.0 - fx) + self.value(x1, y0, z1) * fx;
        let c11 = self.value(x0, y1, z1) * (1.0 - fx) + self.value(x1, y1, z1) * fx;

        let c0 = c00 * (1.0 - fy) + c10 * fy;
        let c1 = c01 * (1.0 - fy) + c11 * fy;
        c0 * (1.0 - fz) + c1 * fz
    }

    /// Finite-difference gradient at continuous voxel coordinates `q`, in
    /// voxel units: central differences in the interior, forward/backward at
    /// the borders.
    pub fn gradient(&self, q: Vec3) -> Vec3 {
        Vec3::new(
            self.gradient_axis(q, 0),
            self.gradient_axis(q, 1),
            self.gradient_axis(q, 2),
        )
    }

    fn gradient_axis(&self, q: Vec3, axis: usize) -> f32 {
        let max = (self.size[axis] - 1) as f32;
        let lo = (q[axis] - 1.0).max(0.0);
        let hi = (q[axis] + 1.0).min(max);
        let span = hi - lo;
        if span <= 0.0 {
            return 0.0;
        }
        let mut a = q;
        let mut b = q;
        a[axis] = lo;
        b[axis] = hi;
        (self.trilinear(b) - self.trilinear(a)) / span
    }

    /// Build a signed distance field over `mesh`'s bounding box expanded by
    /// 10% per side, with `cells` voxels along the major axis.
    ///
    /// Every voxel holds the unsigned distance to its nearest triangle,
    /// negated inside the closed mesh (even-odd parity along axis-parallel
    /// rays). Brute force over all triangles per voxel, pruned by triangle
    /// bounding boxes and parallelised per z-slice; it runs once at setup,
    /// where the exact-but-slow evaluation is affordable.
    pub fn from_mesh(mesh: &TriMesh, cells: usize) -> Self {
        let bounds = mesh.bounds();
        let bounds = bounds.expanded(bounds.extents() * 0.1);
        let cell_size = bounds.extents()[bounds.major_axis()] / cells as f32;
        let e = bounds.extents();
        let size = [
            (e.x / cell_size).ceil().max(1.0) as usize,
            (e.y / cell_size).ceil().max(1.0) as usize,
            (e.z / cell_size).ceil().max(1.0) as usize,
        ];
        let mut grid = Self::new(bounds.min, cell_size, size);

        // Per-triangle bounds let the inner loop skip triangles that cannot
        // beat the best distance found so far.
        let tri_bounds: Vec<Aabb> = (0..mesh.triangle_count())
            .map(|t| {
                let [a, b, c] = mesh.triangle(t);
                Aabb::new(a.min(b).min(c), a.max(b).max(c))
            })
            .collect();

        let origin = bounds.min;
        let (sx, sy) = (size[0], size[1]);
        grid.values
            .par_chunks_mut(sx * sy)
            .enumerate()
            .for_each(|(z, slice)| {
                let wz = origin.z + z as f32 * cell_size;
                let mut crossings = Vec::new();
                for y in 0..sy {
                    let wy = origin.y + y as f32 * cell_size;
                    mesh.ray_crossings_x(wy, wz, &mut crossings);
                    let mut ahead = 0;
                    for x in 0..sx {
                        let p = Vec3::new(origin.x + x as f32 * cell_size, wy, wz);
                        while ahead < crossings.len() && crossings[ahead] < p.x {
                            ahead += 1;
                        }
                        let inside = ahead % 2 == 1;

                        let mut best_sq = f32::MAX;
                        for (t, tb) in tri_bounds.iter().enumerate() {
                            if distance_sq_to_aabb(p, tb) >= best_sq {
                                continue;
                            }
                            let [a, b, c] = mesh.triangle(t);
                            let q = closest_point_on_triangle(p, a, b, c);
                            best_sq = best_sq.min((p - q).length_squared());
                        }
                        let d = best_sq.sqrt();
                        slice[x + sx * y] = if inside { -d } else { d };
                    }
                }
            });

        tracing::debug!(
            "built {}x{}x{} SDF over {} triangles (cell size {:.4})",
            size[0],
            size[1],
            size[2],
            mesh.triangle_count(),
            cell_size
        );
        grid
    }
}

/// Squared distance from `p` to the box (zero inside).
fn distance_sq_to_aabb(p: Vec3, bounds: &Aabb) -> f32 {
    let clamped = p.clamp(bounds.min, bounds.max);
    (p - clamped).length_squared()
}
