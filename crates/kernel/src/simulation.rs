//! The weakly-compressible SPH simulator.
//!
//! Owns the fluid particle state in struct-of-arrays layout and advances it
//! through the fixed six-stage pipeline: grid reorder, density/pressure,
//! surface normals, force accumulation, semi-implicit Euler integration and
//! world-box collision. Per-particle stages are data-parallel; the grid
//! reorder and collision stages run serially.

use std::f32::consts::PI;
use std::sync::Mutex;

use glam::Vec3;
use rayon::prelude::*;

use crate::aabb::Aabb;
use crate::boundary::{self, BoundaryParticles};
use crate::grid::Grid;
use crate::kernels::Kernels;
use crate::scene::{Scene, Shape};
use crate::voxelizer;

/// Tait exponent for water.
const WCSPH_GAMMA: f32 = 7.0;
/// Numerical speed of sound (m/s) for the state equation.
const WCSPH_SPEED_OF_SOUND: f32 = 10.0;
/// Artificial viscosity entering the acoustic timestep bound.
const WCSPH_VISCOSITY: f32 = 5.0e-3;
/// Coefficient of the Laplacian viscosity force.
const VISCOSITY_COEFF: f32 = 5.0e-4;
/// Surface tension coefficient (cohesion and curvature terms).
const SURFACE_TENSION_COEFF: f32 = 2.0;
/// Wall restitution coefficient.
const RESTITUTION: f32 = 0.5;
/// Hard upper bound on the timestep (seconds).
const TIMESTEP_CAP: f32 = 1.0e-3;
/// Pairs closer than this (squared) are skipped by the force loop.
const MIN_PAIR_DISTANCE_SQ: f32 = 1.0e-5;
/// Neighbour densities below this skip the viscosity contribution.
const MIN_NEIGHBOUR_DENSITY: f32 = 1.0e-4;
/// Per-component displacement applied to exactly coincident neighbours.
const COINCIDENT_NUDGE: f32 = 1.0e-5;

/// Derived simulation parameters, fixed at construction.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct Parameters {
    /// Particle radius `r_p`.
    pub particle_radius: f32,
    /// Particle diameter `2 r_p`; also the rest spacing of the lattice fills.
    pub particle_diameter: f32,
    /// Kernel radius `h = 4 r_p`; equals the grid cell size.
    pub kernel_radius: f32,
    /// Expected neighbour count inside one kernel support at rest spacing.
    pub kernel_support_particles: usize,
    /// Particle mass `rho_0 d^3`.
    pub particle_mass: f32,
    /// Rest density `rho_0`.
    pub rest_density: f32,
}

/// WCSPH fluid simulator over a fixed world box.
pub struct Simulation {
    params: Parameters,
    kernel_radius_sq: f32,
    particle_mass_sq: f32,
    /// Tait stiffness `B = rho_0 c_s^2 / gamma`.
    tait_b: f32,
    max_timestep: f32,
    gravity: Vec3,
    bounds: Aabb,
    kernels: Kernels,

    // Fluid state, one entry per particle. Positions and velocities persist
    // across steps (and are permuted together by the grid reorder); normals,
    // forces, densities and pressures are overwritten every step.
    positions: Vec<Vec3>,
    velocities: Vec<Vec3>,
    normals: Vec<Vec3>,
    forces: Vec<Vec3>,
    densities: Vec<f32>,
    pressures: Vec<f32>,
    grid: Grid,

    boundary: BoundaryParticles,
    boundary_grid: Option<Grid>,
    boundary_forces: bool,

    time: f32,
}

impl Simulation {
    /// Build a simulation from a scene description.
    ///
    /// Derives all parameters from the particle radius, samples the world
    /// box with boundary particles, voxelizes every liquid primitive and
    /// samples every solid primitive. Fails on non-positive particle radius
    /// or rest density, degenerate world bounds, or an unsupported solid
    /// primitive, leaving no partial state behind.
    pub fn new(scene: &Scene) -> Result<Self, String> {
        if !(scene.particle_radius > 0.0) {
            return Err(format!(
                "particle radius must be positive, got {}",
                scene.particle_radius
            ));
        }
        if !(scene.rest_density > 0.0) {
            return Err(format!(
                "rest density must be positive, got {}",
                scene.rest_density
            ));
        }
        if !scene.bounds.is_valid() {
            return Err(format!(
                "world bounds must have positive extent, got {:?}..{:?}",
                scene.bounds.min, scene.bounds.max
            ));
        }

        let particle_radius = scene.particle_radius;
        let particle_diameter = 2.0 * particle_radius;
        let kernel_radius = 4.0 * particle_radius;
        let kernel_support_particles =
            ((4.0 / 3.0 * PI * kernel_radius.powi(3)) / particle_diameter.powi(3)).ceil() as usize;
        let particle_mass = scene.rest_density * particle_diameter.powi(3);

        let params = Parameters {
            particle_radius,
            particle_diameter,
            kernel_radius,
            kernel_support_particles,
            particle_mass,
            rest_density: scene.rest_density,
        };

        let tait_b = scene.rest_density * WCSPH_SPEED_OF_SOUND * WCSPH_SPEED_OF_SOUND / WCSPH_GAMMA;
        let acoustic = 0.4 * kernel_radius / (WCSPH_SPEED_OF_SOUND * (1.0 + 0.6 * WCSPH_VISCOSITY));
        let body_force = 0.25 * kernel_radius / (particle_mass * scene.gravity.length());
        let max_timestep = body_force.min(acoustic).min(TIMESTEP_CAP);

        tracing::debug!(
            particle_radius,
            kernel_radius,
            kernel_support_particles,
            particle_mass,
            tait_b,
            max_timestep,
            "derived simulation parameters"
        );

        let mut sim = Self {
            params,
            kernel_radius_sq: kernel_radius * kernel_radius,
            particle_mass_sq: particle_mass * particle_mass,
            tait_b,
            max_timestep,
            gravity: scene.gravity,
            bounds: scene.bounds,
            kernels: Kernels::new(kernel_radius),
            positions: Vec::new(),
            velocities: Vec::new(),
            normals: Vec::new(),
            forces: Vec::new(),
            densities: Vec::new(),
            pressures: Vec::new(),
            grid: Grid::new(&scene.bounds, kernel_radius),
            boundary: BoundaryParticles::new(),
            boundary_grid: None,
            boundary_forces: scene.boundary_forces,
            time: 0.0,
        };

        // World box walls, normals facing the fluid.
        sim.add_boundary_particles(boundary::box_surface(&scene.bounds, particle_radius, false));
        for shape in &scene.liquids {
            sim.add_liquid_shape(shape);
        }
        for shape in &scene.solids {
            sim.add_solid_shape(shape)?;
        }

        tracing::info!(
            "scene built: {} fluid particles, {} boundary particles",
            sim.fluid_count(),
            sim.boundary_count()
        );
        Ok(sim)
    }

    /// Voxelize a liquid primitive into fluid particles at rest.
    ///
    /// Must not be called between steps of a fixed-length recording; particle
    /// counts may only change outside the step loop.
    pub fn add_liquid_shape(&mut self, shape: &Shape) {
        let spacing = self.params.particle_diameter;
        let mut points = Vec::new();
        match shape {
            Shape::Box(bounds) => voxelizer::fill_box(bounds, spacing, &mut points),
            Shape::Sphere { center, radius } => {
                voxelizer::fill_sphere(*center, *radius, spacing, &mut points)
            }
            Shape::Mesh(mesh) => voxelizer::fill_mesh(mesh, spacing, &mut points),
        }
        self.add_liquid_particles(&points);
    }

    /// Bulk-append fluid particles at rest.
    pub fn add_liquid_particles(&mut self, points: &[Vec3]) {
        self.positions.extend_from_slice(points);
        let n = self.positions.len();
        self.velocities.resize(n, Vec3::ZERO);
        self.normals.resize(n, Vec3::ZERO);
        self.forces.resize(n, Vec3::ZERO);
        self.densities.resize(n, 0.0);
        self.pressures.resize(n, 0.0);
    }

    /// Sample a solid primitive with boundary particles, normals facing the
    /// fluid.
    pub fn add_solid_shape(&mut self, shape: &Shape) -> Result<(), String> {
        let r_p = self.params.particle_radius;
        let samples = match shape {
            Shape::Box(bounds) => boundary::box_surface(bounds, r_p, true),
            Shape::Sphere { .. } => {
                return Err("solid sphere primitives are not supported; supply a triangle mesh"
                    .to_string())
            }
            Shape::Mesh(mesh) => boundary::mesh_surface(mesh, r_p),
        };
        self.add_boundary_particles(samples);
        Ok(())
    }

    /// Bulk-append boundary particles.
    pub fn add_boundary_particles(&mut self, samples: BoundaryParticles) {
        self.boundary.extend(samples);
        if self.boundary_forces {
            // Keep the static boundary set queryable: rebuild its grid and
            // reorder positions and normals in lock-step.
            let mut grid = Grid::new(&self.bounds, self.params.kernel_radius);
            let permutation = grid.update(&self.boundary.positions);
            let positions = &mut self.boundary.positions;
            let normals = &mut self.boundary.normals;
            permutation.apply(|i, j| {
                positions.swap(i, j);
                normals.swap(i, j);
            });
            self.boundary_grid = Some(grid);
        }
    }

    /// Advance the simulation by `dt` seconds.
    ///
    /// `dt` greater than [`max_timestep`](Self::max_timestep) is clamped to
    /// it. An empty fluid set is a well-defined no-op.
    pub fn update(&mut self, dt: f32) {
        let dt = dt.min(self.max_timestep);
        self.time += dt;

        self.reorder_by_grid();
        self.compute_density_and_pressure();
        self.compute_normals();
        self.compute_forces();
        self.integrate(dt);
        self.collide_with_bounds();
    }

    /// Stage 1: rebuild the grid and permute positions and velocities into
    /// cell order. The remaining per-particle arrays are overwritten before
    /// they are read again, so they are not permuted.
    fn reorder_by_grid(&mut self) {
        let _span = tracing::trace_span!("grid_update").entered();
        let permutation = self.grid.update(&self.positions);
        let positions = &mut self.positions;
        let velocities = &mut self.velocities;
        permutation.apply(|i, j| {
            positions.swap(i, j);
            velocities.swap(i, j);
        });
    }

    /// Stage 2: SPH density summation (self-contribution included) and Tait
    /// pressure. Negative pressures are deliberately not clamped.
    fn compute_density_and_pressure(&mut self) {
        let _span = tracing::trace_span!("density_pressure").entered();
        let positions = &self.positions;
        let grid = &self.grid;
        let kernels = self.kernels;
        let h = self.params.kernel_radius;
        let h_sq = self.kernel_radius_sq;
        let mass = self.params.particle_mass;
        let rest_density = self.params.rest_density;
        let tait_b = self.tait_b;
        let boundary_grid = self.boundary_grid.as_ref();
        let boundary_positions = &self.boundary.positions;

        let densities = &mut self.densities;
        let pressures = &mut self.pressures;
        densities
            .par_iter_mut()
            .zip(pressures.par_iter_mut())
            .enumerate()
            .for_each(|(i, (density, pressure))| {
                let p_i = positions[i];
                let mut sum = 0.0_f32;
                grid.lookup(p_i, h, |j| {
                    let r_sq = (p_i - positions[j]).length_squared();
                    if r_sq < h_sq {
                        sum += kernels.poly6(r_sq);
                    }
                });
                if let Some(bgrid) = boundary_grid {
                    bgrid.lookup(p_i, h, |b| {
                        let r_sq = (p_i - boundary_positions[b]).length_squared();
                        if r_sq < h_sq {
                            sum += kernels.poly6(r_sq);
                        }
                    });
                }
                let rho = sum * mass * kernels.poly6_constant;
                let t = rho / rest_density;
                let t2 = t * t;
                let t4 = t2 * t2;
                *density = rho;
                *pressure = tait_b * (t4 * t2 * t - 1.0);
            });
    }

    /// Stage 3: surface-normal estimate `n_i = h m K_pg sum_j grad W / rho_j`.
    fn compute_normals(&mut self) {
        let _span = tracing::trace_span!("normals").entered();
        let positions = &self.positions;
        let densities = &self.densities;
        let grid = &self.grid;
        let kernels = self.kernels;
        let h = self.params.kernel_radius;
        let h_sq = self.kernel_radius_sq;
        let scale = h * self.params.particle_mass * kernels.poly6_grad_constant;

        self.normals.par_iter_mut().enumerate().for_each(|(i, normal)| {
            let p_i = positions[i];
            let mut sum = Vec3::ZERO;
            grid.lookup(p_i, h, |j| {
                let r = p_i - positions[j];
                let r_sq = r.length_squared();
                if r_sq < h_sq {
                    sum += kernels.poly6_grad(r, r_sq) / densities[j];
                }
            });
            *normal = sum * scale;
        });
    }

    /// Stage 4: pressure, viscosity, cohesion, curvature and gravity forces.
    ///
    /// Exactly coincident neighbours cannot exert a direction-dependent
    /// force; they are pushed apart by a deterministic nudge applied after
    /// the parallel loop so the stage stays free of cross-particle writes.
    fn compute_forces(&mut self) {
        let _span = tracing::trace_span!("forces").entered();
        let positions = &self.positions;
        let velocities = &self.velocities;
        let normals = &self.normals;
        let densities = &self.densities;
        let pressures = &self.pressures;
        let grid = &self.grid;
        let kernels = self.kernels;
        let h = self.params.kernel_radius;
        let h_sq = self.kernel_radius_sq;
        let mass = self.params.particle_mass;
        let mass_sq = self.particle_mass_sq;
        let rest_density = self.params.rest_density;
        let gravity = self.gravity;
        let boundary_grid = self.boundary_grid.as_ref();
        let boundary_positions = &self.boundary.positions;

        let nudges: Mutex<Vec<usize>> = Mutex::new(Vec::new());

        self.forces.par_iter_mut().enumerate().for_each(|(i, force)| {
            let p_i = positions[i];
            let v_i = velocities[i];
            let n_i = normals[i];
            let density_i = densities[i];
            let p_over_rho_sq_i = pressures[i] / (density_i * density_i);

            let mut f_pressure = Vec3::ZERO;
            let mut f_viscosity = Vec3::ZERO;
            let mut f_cohesion = Vec3::ZERO;
            let mut f_curvature = Vec3::ZERO;

            grid.lookup(p_i, h, |j| {
                if j == i {
                    return;
                }
                let r = p_i - positions[j];
                let r_sq = r.length_squared();
                if r_sq >= h_sq {
                    return;
                }
                if r_sq > MIN_PAIR_DISTANCE_SQ {
                    let r_norm = r_sq.sqrt();
                    let density_j = densities[j];

                    // Symmetric WCSPH pressure gradient.
                    let p_over_rho_sq_j = pressures[j] / (density_j * density_j);
                    f_pressure -=
                        kernels.spiky_grad(r, r_norm) * (p_over_rho_sq_i + p_over_rho_sq_j);

                    if density_j > MIN_NEIGHBOUR_DENSITY {
                        f_viscosity -=
                            (v_i - velocities[j]) * (kernels.viscosity_laplace(r_norm) / density_j);
                    }

                    // Akinci surface tension: pairwise cohesion plus the
                    // normal-difference curvature term, both with the
                    // symmetric density correction factor.
                    let correction = 2.0 * rest_density / (density_i + density_j);
                    f_cohesion += (r / r_norm) * (correction * kernels.surface_tension(r_norm));
                    f_curvature += (n_i - normals[j]) * correction;
                } else if r_sq == 0.0 && j > i {
                    nudges.lock().unwrap().push(j);
                }
            });

            f_pressure *= mass_sq * kernels.spiky_grad_constant;
            f_viscosity *= VISCOSITY_COEFF * mass * kernels.viscosity_laplace_constant;
            f_cohesion *= -SURFACE_TENSION_COEFF * mass_sq * kernels.surface_tension_constant;
            f_curvature *= -SURFACE_TENSION_COEFF * mass;

            let mut f = f_pressure + f_viscosity + f_cohesion + f_curvature + gravity * mass;

            if let Some(bgrid) = boundary_grid {
                // Mirrored-pressure repulsion from the static boundary set;
                // the fluid-side pressure is clamped so walls never attract.
                let p_clamped = pressures[i].max(0.0);
                let fluid_term = p_clamped / (density_i * density_i);
                let wall_term = p_clamped / (rest_density * rest_density);
                let mut f_boundary = Vec3::ZERO;
                bgrid.lookup(p_i, h, |b| {
                    let r = p_i - boundary_positions[b];
                    let r_sq = r.length_squared();
                    if r_sq < h_sq && r_sq > MIN_PAIR_DISTANCE_SQ {
                        f_boundary -= kernels.spiky_grad(r, r_sq.sqrt()) * (fluid_term + wall_term);
                    }
                });
                f += f_boundary * mass_sq * kernels.spiky_grad_constant;
            }

            *force = f;
        });

        let mut nudges = nudges.into_inner().unwrap();
        if !nudges.is_empty() {
            nudges.sort_unstable();
            nudges.dedup();
            for j in nudges {
                self.positions[j] += Vec3::splat(COINCIDENT_NUDGE);
            }
        }
    }

    /// Stage 5: semi-implicit Euler.
    fn integrate(&mut self, dt: f32) {
        let _span = tracing::trace_span!("integrate").entered();
        let inv_mass = 1.0 / self.params.particle_mass;
        let forces = &self.forces;
        self.positions
            .par_iter_mut()
            .zip(self.velocities.par_iter_mut())
            .zip(forces.par_iter())
            .for_each(|((p, v), f)| {
                *v += *f * (inv_mass * dt);
                *p += *v * dt;
            });
    }

    /// Stage 6: project penetrating particles back onto the world box and
    /// reflect the normal velocity component with restitution.
    fn collide_with_bounds(&mut self) {
        let _span = tracing::trace_span!("collide").entered();
        fn resolve(position: &mut Vec3, velocity: &mut Vec3, normal: Vec3, depth: f32) {
            *position += normal * depth;
            *velocity -= (1.0 + RESTITUTION) * velocity.dot(normal) * normal;
        }

        let min = self.bounds.min;
        let max = self.bounds.max;
        for i in 0..self.positions.len() {
            if self.positions[i].x < min.x {
                let depth = min.x - self.positions[i].x;
                resolve(&mut self.positions[i], &mut self.velocities[i], Vec3::X, depth);
            }
            if self.positions[i].x > max.x {
                let depth = self.positions[i].x - max.x;
                resolve(&mut self.positions[i], &mut self.velocities[i], Vec3::NEG_X, depth);
            }
            if self.positions[i].y < min.y {
                let depth = min.y - self.positions[i].y;
                resolve(&mut self.positions[i], &mut self.velocities[i], Vec3::Y, depth);
            }
            if self.positions[i].y > max.y {
                let depth = self.positions[i].y - max.y;
                resolve(&mut self.positions[i], &mut self.velocities[i], Vec3::NEG_Y, depth);
            }
            if self.positions[i].z < min.z {
                let depth = min.z - self.positions[i].z;
                resolve(&mut self.positions[i], &mut self.velocities[i], Vec3::Z, depth);
            }
            if self.positions[i].z > max.z {
                let depth = self.positions[i].z - max.z;
                resolve(&mut self.positions[i], &mut self.velocities[i], Vec3::NEG_Z, depth);
            }
        }
    }

    /// Derived parameter block.
    pub fn parameters(&self) -> Parameters {
        self.params
    }

    /// Largest timestep `update` will accept.
    pub fn max_timestep(&self) -> f32 {
        self.max_timestep
    }

    /// World box.
    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    /// Simulated time in seconds.
    pub fn time(&self) -> f32 {
        self.time
    }

    /// Number of fluid particles.
    pub fn fluid_count(&self) -> usize {
        self.positions.len()
    }

    /// Number of boundary particles.
    pub fn boundary_count(&self) -> usize {
        self.boundary.len()
    }

    /// Fluid positions. The slice is tightly packed, i.e. readable as a 3xN
    /// column-major float matrix.
    pub fn fluid_positions(&self) -> &[Vec3] {
        &self.positions
    }

    /// Fluid velocities.
    pub fn fluid_velocities(&self) -> &[Vec3] {
        &self.velocities
    }

    /// Mutable fluid velocities, for host-side initial conditions. Lengths
    /// never change through this view.
    pub fn fluid_velocities_mut(&mut self) -> &mut [Vec3] {
        &mut self.velocities
    }

    /// Per-particle densities from the most recent step.
    pub fn fluid_densities(&self) -> &[f32] {
        &self.densities
    }

    /// Per-particle pressures from the most recent step.
    pub fn fluid_pressures(&self) -> &[f32] {
        &self.pressures
    }

    /// Per-particle forces from the most recent step.
    pub fn fluid_forces(&self) -> &[Vec3] {
        &self.forces
    }

    /// Boundary positions; tightly packed like
    /// [`fluid_positions`](Self::fluid_positions).
    pub fn boundary_positions(&self) -> &[Vec3] {
        &self.boundary.positions
    }

    /// Boundary normals, unit length, facing the fluid.
    pub fn boundary_normals(&self) -> &[Vec3] {
        &self.boundary.normals
    }
}
