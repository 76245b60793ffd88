//! Scene model consumed by the simulator.
//!
//! A [`Scene`] is the structured setup object: the world box, the few
//! user-tunable physical parameters, and the liquid/solid primitives to turn
//! into particles. Meshes arrive pre-loaded; file parsing and mesh I/O live
//! in the orchestration layer.

use glam::Vec3;

use crate::aabb::Aabb;
use crate::mesh::TriMesh;

/// Geometric primitive usable as either a liquid or a solid.
#[derive(Debug, Clone)]
pub enum Shape {
    /// Axis-aligned box.
    Box(Aabb),
    /// Sphere.
    Sphere {
        /// Center position.
        center: Vec3,
        /// Radius.
        radius: f32,
    },
    /// Closed triangle mesh.
    Mesh(TriMesh),
}

/// Complete scene description.
#[derive(Debug, Clone)]
pub struct Scene {
    /// World box; fluid never leaves it.
    pub bounds: Aabb,
    /// Gravitational acceleration.
    pub gravity: Vec3,
    /// Fluid rest density (kg/m^3).
    pub rest_density: f32,
    /// Particle radius; every derived parameter follows from it.
    pub particle_radius: f32,
    /// Let boundary particles participate in the density and pressure sums.
    pub boundary_forces: bool,
    /// Primitives filled with fluid particles.
    pub liquids: Vec<Shape>,
    /// Primitives sampled with boundary particles.
    pub solids: Vec<Shape>,
}

impl Default for Scene {
    fn default() -> Self {
        Self {
            bounds: Aabb::new(Vec3::splat(-1.0), Vec3::splat(1.0)),
            gravity: Vec3::new(0.0, -9.81, 0.0),
            rest_density: 1000.0,
            particle_radius: 0.01,
            boundary_forces: false,
            liquids: Vec::new(),
            solids: Vec::new(),
        }
    }
}
