//! Indexed triangle meshes and the geometric queries the generators need.

use glam::Vec3;

use crate::aabb::Aabb;

/// Indexed triangle mesh. Vertices are shared; each triangle is a triple of
/// vertex indices.
#[derive(Debug, Clone)]
pub struct TriMesh {
    vertices: Vec<Vec3>,
    triangles: Vec<[u32; 3]>,
}

impl TriMesh {
    /// Create a mesh, validating that every index refers to a vertex.
    pub fn new(vertices: Vec<Vec3>, triangles: Vec<[u32; 3]>) -> Result<Self, String> {
        let n = vertices.len() as u32;
        for (t, tri) in triangles.iter().enumerate() {
            if tri.iter().any(|&i| i >= n) {
                return Err(format!(
                    "triangle {t} references vertex out of range (mesh has {n} vertices)"
                ));
            }
        }
        Ok(Self { vertices, triangles })
    }

    /// Vertex positions.
    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    /// Number of triangles.
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Corner positions of triangle `t`.
    #[inline]
    pub fn triangle(&self, t: usize) -> [Vec3; 3] {
        let [a, b, c] = self.triangles[t];
        [
            self.vertices[a as usize],
            self.vertices[b as usize],
            self.vertices[c as usize],
        ]
    }

    /// Area of triangle `t`.
    pub fn triangle_area(&self, t: usize) -> f32 {
        let [a, b, c] = self.triangle(t);
        0.5 * (b - a).cross(c - a).length()
    }

    /// Sum of all triangle areas.
    pub fn total_area(&self) -> f32 {
        (0..self.triangle_count()).map(|t| self.triangle_area(t)).sum()
    }

    /// Bounding box of all vertices (degenerate box at the origin for an
    /// empty mesh).
    pub fn bounds(&self) -> Aabb {
        Aabb::from_points(self.vertices.iter().copied())
            .unwrap_or(Aabb::new(Vec3::ZERO, Vec3::ZERO))
    }

    /// Closed box mesh (12 triangles) for `bounds`, wound outward.
    pub fn box_mesh(bounds: &Aabb) -> Self {
        let (lo, hi) = (bounds.min, bounds.max);
        let vertices = vec![
            Vec3::new(lo.x, lo.y, lo.z),
            Vec3::new(hi.x, lo.y, lo.z),
            Vec3::new(hi.x, hi.y, lo.z),
            Vec3::new(lo.x, hi.y, lo.z),
            Vec3::new(lo.x, lo.y, hi.z),
            Vec3::new(hi.x, lo.y, hi.z),
            Vec3::new(hi.x, hi.y, hi.z),
            Vec3::new(lo.x, hi.y, hi.z),
        ];
        let triangles = vec![
            // z = min
            [0, 2, 1],
            [0, 3, 2],
            // z = max
            [4, 5, 6],
            [4, 6, 7],
            // y = min
            [0, 1, 5],
            [0, 5, 4],
            // y = max
            [3, 6, 2],
            [3, 7, 6],
            // x = min
            [0, 4, 7],
            [0, 7, 3],
            // x = max
            [1, 2, 6],
            [1, 6, 5],
        ];
        Self { vertices, triangles }
    }

    /// Intersections of the axis-parallel line `{(x, y, z) : x in R}` with
    /// the mesh, as sorted x coordinates. Used for even-odd inside tests.
    ///
    /// Rays through a shared triangle edge would be reported by both
    /// triangles (or, with unlucky rounding, by neither); on-edge hits are
    /// therefore classified with a tolerance and the coincident duplicates
    /// collapsed afterwards.
    pub(crate) fn ray_crossings_x(&self, y: f32, z: f32, out: &mut Vec<f32>) {
        out.clear();
        for t in 0..self.triangle_count() {
            let [a, b, c] = self.triangle(t);
            // Signed areas of the yz-projected sub-triangles; the point is
            // inside when all three share a sign.
            let d0 = (b.y - a.y) * (z - a.z) - (b.z - a.z) * (y - a.y);
            let d1 = (c.y - b.y) * (z - b.z) - (c.z - b.z) * (y - b.y);
            let d2 = (a.y - c.y) * (z - c.z) - (a.z - c.z) * (y - c.y);
            let area = d0 + d1 + d2;
            if area.abs() < 1.0e-12 {
                // Triangle is edge-on to the ray.
                continue;
            }
            let eps = 1.0e-5 * area.abs();
            let has_neg = d0 < -eps || d1 < -eps || d2 < -eps;
            let has_pos = d0 > eps || d1 > eps || d2 > eps;
            if has_neg && has_pos {
                continue;
            }
            // Barycentric interpolation of the crossing's x coordinate.
            out.push((d1 * a.x + d2 * b.x + d0 * c.x) / area);
        }
        out.sort_by(|p, q| p.partial_cmp(q).unwrap());
        out.dedup_by(|p, q| (*p - *q).abs() <= 1.0e-6 * (1.0 + p.abs()));
    }
}

/// Closest point to `p` on the triangle `(a, b, c)` (Voronoi-region walk).
pub(crate) fn closest_point_on_triangle(p: Vec3, a: Vec3, b: Vec3, c: Vec3) -> Vec3 {
    let ab = b - a;
    let ac = c - a;
    let ap = p - a;
    let d1 = ab.dot(ap);
    let d2 = ac.dot(ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return a;
    }

    let bp = p - b;
    let d3 = ab.dot(bp);
    let d4 = ac.dot(bp);
    if d3 >= 0.0 && d4 <= d3 {
        return b;
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        return a + ab * (d1 / (d1 - d3));
    }

    let cp = p - c;
    let d5 = ab.dot(cp);
    let d6 = ac.dot(cp);
    if d6 >= 0.0 && d5 <= d6 {
        return c;
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        return a + ac * (d2 / (d2 - d6));
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        return b + (c - b) * ((d4 - d3) / ((d4 - d3) + (d5 - d6)));
    }

    let denom = 1.0 / (va + vb + vc);
    a + ab * (vb * denom) + ac * (vc * denom)
}
