//! WCSPH Fluid Simulation Kernel
//!
//! This crate provides the core of a weakly-compressible SPH fluid
//! simulator: the per-step physics pipeline plus the generators that turn
//! scene primitives into particles. It is compute-focused and performs no
//! I/O; scene files, mesh loading and lifecycle management live in the
//! orchestration layer.
//!
//! # Modules
//! - [`kernels`] -- Poly6 / spiky / viscosity / surface-tension smoothing kernels.
//! - [`grid`] -- Uniform hash grid with counting-sort reordering.
//! - [`sdf`] -- Signed-distance voxel grids and the mesh-to-SDF builder.
//! - [`mesh`] -- Indexed triangle meshes and geometric queries.
//! - [`boundary`] -- Boundary particle generators for boxes and meshes.
//! - [`voxelizer`] -- Lattice fills for liquid primitives.
//! - [`scene`] -- The structured scene description consumed at construction.
//! - [`simulation`] -- The simulator owning particle state and the step pipeline.

#![warn(missing_docs)]

pub mod aabb;
pub mod boundary;
pub mod grid;
pub mod kernels;
pub mod mesh;
pub mod scene;
pub mod sdf;
pub mod simulation;
pub mod voxelizer;

pub use aabb::Aabb;
pub use boundary::BoundaryParticles;
pub use grid::Grid;
pub use kernels::Kernels;
pub use mesh::TriMesh;
pub use scene::{Scene, Shape};
pub use sdf::SdfGrid;
pub use simulation::{Parameters, Simulation};
