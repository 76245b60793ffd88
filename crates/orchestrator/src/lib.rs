//! Orchestration Layer
//!
//! This crate wires scene description files to the simulation kernel:
//! - JSON scene files with validation ([`config`])
//! - OBJ mesh loading ([`loader`])
//! - scene construction and the full setup pipeline ([`build_scene`],
//!   [`create_simulation`])
//! - background-thread lifecycle management ([`runner`])

#![warn(missing_docs)]

pub mod config;
pub mod loader;
pub mod runner;

pub use config::SceneConfig;
pub use runner::SimulationRunner;

use std::path::Path;

use glam::Vec3;
use kernel::{Aabb, Scene, Shape, Simulation};

use config::{PrimitiveConfig, PrimitiveKind};

/// Resolve a scene file into the kernel's scene model, loading referenced
/// meshes relative to `base_dir`.
pub fn build_scene(config: &SceneConfig, base_dir: &Path) -> Result<Scene, String> {
    let mut scene = Scene {
        bounds: Aabb::new(Vec3::from(config.world.min), Vec3::from(config.world.max)),
        gravity: Vec3::from(config.gravity),
        rest_density: config.rest_density,
        particle_radius: config.particle_radius,
        boundary_forces: config.boundary_forces,
        liquids: Vec::new(),
        solids: Vec::new(),
    };

    for primitive in &config.primitives {
        let shape = match primitive {
            PrimitiveConfig::Box { min, max, .. } => {
                Shape::Box(Aabb::new(Vec3::from(*min), Vec3::from(*max)))
            }
            PrimitiveConfig::Sphere { center, radius, .. } => Shape::Sphere {
                center: Vec3::from(*center),
                radius: *radius,
            },
            PrimitiveConfig::Mesh { file, .. } => {
                let path = base_dir.join(file);
                let path = path
                    .to_str()
                    .ok_or_else(|| format!("invalid mesh path: {file}"))?;
                tracing::info!("loading mesh {path}");
                let mesh = loader::load_obj(path)?;
                tracing::info!("loaded {} triangles", mesh.triangle_count());
                Shape::Mesh(mesh)
            }
        };
        match primitive.kind() {
            PrimitiveKind::Liquid => scene.liquids.push(shape),
            PrimitiveKind::Solid => scene.solids.push(shape),
        }
    }
    Ok(scene)
}

/// Create a simulation from a scene file.
///
/// Loads and validates the file, loads referenced meshes (paths relative to
/// the scene file's directory) and constructs the simulator.
pub fn create_simulation(config_path: &str) -> Result<Simulation, String> {
    tracing::info!("creating simulation from scene file: {config_path}");
    let config = SceneConfig::load(config_path)?;
    tracing::info!("scene file loaded: {}", config.name);

    let base_dir = Path::new(config_path)
        .parent()
        .unwrap_or_else(|| Path::new("."));
    let scene = build_scene(&config, base_dir)?;
    let simulation = Simulation::new(&scene)?;
    tracing::info!(
        "simulation ready: {} fluid particles, {} boundary particles",
        simulation.fluid_count(),
        simulation.boundary_count()
    );
    Ok(simulation)
}

/// Create a simulation from a scene file and wrap it in a
/// [`SimulationRunner`] honouring the file's stopping criteria.
pub fn create_runner(config_path: &str) -> Result<SimulationRunner, String> {
    let config = SceneConfig::load(config_path)?;
    let base_dir = Path::new(config_path)
        .parent()
        .unwrap_or_else(|| Path::new("."));
    let scene = build_scene(&config, base_dir)?;
    let simulation = Simulation::new(&scene)?;
    Ok(SimulationRunner::new(
        simulation,
        config.max_timesteps,
        config.max_time,
    ))
}
