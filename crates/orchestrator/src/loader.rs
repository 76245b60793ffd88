//! OBJ mesh loading.

use glam::Vec3;
use kernel::TriMesh;

/// Load an OBJ file into a single triangle mesh.
///
/// Faces are triangulated on load and all models in the file are merged.
pub fn load_obj(path: &str) -> Result<TriMesh, String> {
    let (models, _materials) = tobj::load_obj(
        path,
        &tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        },
    )
    .map_err(|e| format!("failed to load OBJ file {path}: {e}"))?;

    let mut vertices = Vec::new();
    let mut triangles = Vec::new();
    for model in models {
        let mesh = model.mesh;
        let base = vertices.len() as u32;
        for v in mesh.positions.chunks_exact(3) {
            vertices.push(Vec3::new(v[0], v[1], v[2]));
        }
        for tri in mesh.indices.chunks_exact(3) {
            triangles.push([base + tri[0], base + tri[1], base + tri[2]]);
        }
    }
    if triangles.is_empty() {
        return Err(format!("OBJ file {path} contains no triangles"));
    }
    TriMesh::new(vertices, triangles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const CUBE_OBJ: &str = "\
v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nv 0 0 1\nv 1 0 1\nv 1 1 1\nv 0 1 1\n\
f 1 3 2\nf 1 4 3\nf 5 6 7\nf 5 7 8\nf 1 2 6\nf 1 6 5\nf 4 7 3\nf 4 8 7\n\
f 1 5 8\nf 1 8 4\nf 2 3 7\nf 2 7 6\n";

    #[test]
    fn loads_a_cube() {
        let path = std::env::temp_dir().join("sph_loader_cube_test.obj");
        fs::write(&path, CUBE_OBJ).unwrap();

        let mesh = load_obj(path.to_str().unwrap()).unwrap();
        assert_eq!(mesh.vertices().len(), 8);
        assert_eq!(mesh.triangle_count(), 12);
        assert!((mesh.total_area() - 6.0).abs() < 1.0e-4);

        fs::remove_file(&path).ok();
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(load_obj("/nonexistent/mesh.obj").is_err());
    }
}
