//! Uniform hash grid for neighbour search.
//!
//! Particles are binned into fixed-size cells by a two-pass counting sort.
//! Unlike a sorted-index indirection, the grid reorders the *caller's*
//! particle arrays so that particles become contiguous per cell: `update`
//! returns a [`Permutation`] which the caller applies to every parallel
//! array through a `swap(i, j)` callback. Queries then enumerate raw index
//! ranges without pointer chasing.
//!
//! The cell size must equal the query radius (the simulator uses the kernel
//! radius `h` for both); only then does the 3x3x3 cell neighbourhood cover
//! the full query ball.

use glam::Vec3;

use crate::aabb::Aabb;

/// Uniform grid over a fixed axis-aligned domain.
pub struct Grid {
    origin: Vec3,
    cell_size: f32,
    dims: [usize; 3],
    /// Per-cell start offsets into the (reordered) particle arrays, with a
    /// trailing total-count entry; monotonically non-decreasing.
    cell_start: Vec<u32>,
}

/// Reordering produced by [`Grid::update`], to be applied to the caller's
/// particle arrays.
pub struct Permutation {
    /// `dest[i]` is the slot the particle currently at `i` must move to.
    dest: Vec<u32>,
}

impl Permutation {
    /// Apply the permutation by invoking `swap(i, j)` exactly once per
    /// transposition (cycle walk). The caller swaps all of its parallel
    /// arrays inside the callback.
    pub fn apply<F: FnMut(usize, usize)>(mut self, mut swap: F) {
        for i in 0..self.dest.len() {
            while self.dest[i] as usize != i {
                let j = self.dest[i] as usize;
                swap(i, j);
                self.dest.swap(i, j);
            }
        }
    }
}

impl Grid {
    /// Create a grid covering `bounds` with the given cell size.
    ///
    /// Cell counts are `ceil(extent / cell_size)` per axis, at least one.
    pub fn new(bounds: &Aabb, cell_size: f32) -> Self {
        debug_assert!(cell_size > 0.0, "cell_size must be positive");
        let e = bounds.extents();
        let dims = [
            (e.x / cell_size).ceil().max(1.0) as usize,
            (e.y / cell_size).ceil().max(1.0) as usize,
            (e.z / cell_size).ceil().max(1.0) as usize,
        ];
        let cells = dims[0] * dims[1] * dims[2];
        Self {
            origin: bounds.min,
            cell_size,
            dims,
            cell_start: vec![0; cells + 1],
        }
    }

    /// Cell size (equal to the supported query radius).
    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Integer cell coordinates of `p`, clamped to the grid.
    #[inline]
    fn cell_coords(&self, p: Vec3) -> [usize; 3] {
        let q = (p - self.origin) / self.cell_size;
        [
            (q.x.floor().max(0.0) as usize).min(self.dims[0] - 1),
            (q.y.floor().max(0.0) as usize).min(self.dims[1] - 1),
            (q.z.floor().max(0.0) as usize).min(self.dims[2] - 1),
        ]
    }

    /// Linear cell index with x fastest.
    #[inline]
    fn cell_index(&self, c: [usize; 3]) -> usize {
        c[0] + self.dims[0] * (c[1] + self.dims[1] * c[2])
    }

    /// Rebuild the grid over `positions` and return the permutation that
    /// makes the particle arrays contiguous per cell.
    ///
    /// The grid's cell ranges refer to the *reordered* layout, so the caller
    /// must apply the permutation to its arrays before querying.
    pub fn update(&mut self, positions: &[Vec3]) -> Permutation {
        let n = positions.len();
        let cells = self.cell_start.len() - 1;

        // Pass 1: per-cell occupancy, then prefix-sum into start offsets.
        let mut cell_of = vec![0u32; n];
        self.cell_start.fill(0);
        for (i, &p) in positions.iter().enumerate() {
            let c = self.cell_index(self.cell_coords(p)) as u32;
            cell_of[i] = c;
            self.cell_start[c as usize + 1] += 1;
        }
        for c in 0..cells {
            self.cell_start[c + 1] += self.cell_start[c];
        }

        // Pass 2: scatter indices to their sorted slots.
        let mut write_head: Vec<u32> = self.cell_start[..cells].to_vec();
        let mut dest = vec![0u32; n];
        for i in 0..n {
            let c = cell_of[i] as usize;
            dest[i] = write_head[c];
            write_head[c] += 1;
        }

        Permutation { dest }
    }

    /// Visit every candidate index whose cell intersects the ball of
    /// `radius` around `p`.
    ///
    /// Candidates beyond `radius` may be reported; the caller filters by
    /// distance. `radius` must not exceed the cell size or the 27-cell
    /// neighbourhood no longer covers the ball.
    pub fn lookup<F: FnMut(usize)>(&self, p: Vec3, radius: f32, mut visit: F) {
        debug_assert!(
            radius <= self.cell_size,
            "query radius {radius} exceeds cell size {}",
            self.cell_size
        );
        let c = self.cell_coords(p);
        for dz in -1i64..=1 {
            let z = c[2] as i64 + dz;
            if z < 0 || z >= self.dims[2] as i64 {
                continue;
            }
            for dy in -1i64..=1 {
                let y = c[1] as i64 + dy;
                if y < 0 || y >= self.dims[1] as i64 {
                    continue;
                }
                for dx in -1i64..=1 {
                    let x = c[0] as i64 + dx;
                    if x < 0 || x >= self.dims[0] as i64 {
                        continue;
                    }
                    let cell = self.cell_index([x as usize, y as usize, z as usize]);
                    let start = self.cell_start[cell] as usize;
                    let end = self.cell_start[cell + 1] as usize;
                    for j in start..end {
                        visit(j);
                    }
                }
            }
        }
    }
}
