//! Scene file parsing and validation.

use serde::{Deserialize, Serialize};
use std::fs;

/// A scene description file (JSON).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneConfig {
    /// Human-readable scene name.
    pub name: String,
    /// World box bounds.
    pub world: WorldConfig,
    /// Particle radius (meters).
    #[serde(default = "default_particle_radius")]
    pub particle_radius: f32,
    /// Fluid rest density (kg/m^3).
    #[serde(default = "default_rest_density")]
    pub rest_density: f32,
    /// Gravity vector (m/s^2).
    #[serde(default = "default_gravity")]
    pub gravity: [f32; 3],
    /// Let boundary particles participate in the force sums.
    #[serde(default)]
    pub boundary_forces: bool,
    /// Liquid and solid primitives.
    #[serde(default)]
    pub primitives: Vec<PrimitiveConfig>,
    /// Stop after this many timesteps.
    pub max_timesteps: Option<u64>,
    /// Stop after this much simulated time (seconds).
    pub max_time: Option<f64>,
}

/// World bounding box.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldConfig {
    /// Minimum corner [x, y, z].
    pub min: [f32; 3],
    /// Maximum corner [x, y, z].
    pub max: [f32; 3],
}

/// Whether a primitive is filled with fluid or sampled as a boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveKind {
    /// Filled with fluid particles.
    Liquid,
    /// Sampled with boundary particles.
    Solid,
}

/// A primitive entry in the scene file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "lowercase")]
pub enum PrimitiveConfig {
    /// Axis-aligned box.
    Box {
        /// Liquid or solid.
        kind: PrimitiveKind,
        /// Minimum corner.
        min: [f32; 3],
        /// Maximum corner.
        max: [f32; 3],
    },
    /// Sphere.
    Sphere {
        /// Liquid or solid.
        kind: PrimitiveKind,
        /// Center position.
        center: [f32; 3],
        /// Radius.
        radius: f32,
    },
    /// Triangle mesh referenced by file path (relative to the scene file).
    Mesh {
        /// Liquid or solid.
        kind: PrimitiveKind,
        /// OBJ file path.
        file: String,
    },
}

impl PrimitiveConfig {
    /// Liquid/solid tag of this primitive.
    pub fn kind(&self) -> PrimitiveKind {
        match self {
            PrimitiveConfig::Box { kind, .. }
            | PrimitiveConfig::Sphere { kind, .. }
            | PrimitiveConfig::Mesh { kind, .. } => *kind,
        }
    }
}

fn default_particle_radius() -> f32 {
    0.01
}

fn default_rest_density() -> f32 {
    1000.0
}

fn default_gravity() -> [f32; 3] {
    [0.0, -9.81, 0.0]
}

impl SceneConfig {
    /// Load and validate a scene file.
    pub fn load(path: &str) -> Result<Self, String> {
        let contents = fs::read_to_string(path)
            .map_err(|e| format!("failed to read scene file {path}: {e}"))?;
        let config: SceneConfig = serde_json::from_str(&contents)
            .map_err(|e| format!("failed to parse scene JSON: {e}"))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration, returning the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        for axis in 0..3 {
            if self.world.min[axis] >= self.world.max[axis] {
                return Err(format!(
                    "world bounds must be ordered per axis, got min {:?} max {:?}",
                    self.world.min, self.world.max
                ));
            }
        }
        if self.particle_radius <= 0.0 {
            return Err("particle radius must be positive".to_string());
        }
        if self.rest_density <= 0.0 {
            return Err("rest density must be positive".to_string());
        }
        for (i, prim) in self.primitives.iter().enumerate() {
            match prim {
                PrimitiveConfig::Box { min, max, .. } => {
                    for axis in 0..3 {
                        if min[axis] >= max[axis] {
                            return Err(format!("primitive {i}: box bounds must be ordered"));
                        }
                    }
                }
                PrimitiveConfig::Sphere { radius, .. } => {
                    if *radius <= 0.0 {
                        return Err(format!("primitive {i}: sphere radius must be positive"));
                    }
                }
                PrimitiveConfig::Mesh { file, .. } => {
                    if file.is_empty() {
                        return Err(format!("primitive {i}: mesh file path is empty"));
                    }
                }
            }
        }
        if let Some(max_timesteps) = self.max_timesteps {
            if max_timesteps == 0 {
                return Err("max_timesteps must be at least 1".to_string());
            }
        }
        if let Some(max_time) = self.max_time {
            if max_time <= 0.0 {
                return Err("max_time must be positive".to_string());
            }
        }
        Ok(())
    }
}
