//! End-to-end scene setup: JSON file + OBJ mesh to a stepping simulation.

use std::fs;
use std::path::PathBuf;

const CUBE_OBJ: &str = "\
v 0.305 0.505 0.305\nv 0.695 0.505 0.305\nv 0.695 0.895 0.305\nv 0.305 0.895 0.305\n\
v 0.305 0.505 0.695\nv 0.695 0.505 0.695\nv 0.695 0.895 0.695\nv 0.305 0.895 0.695\n\
f 1 3 2\nf 1 4 3\nf 5 6 7\nf 5 7 8\nf 1 2 6\nf 1 6 5\nf 4 7 3\nf 4 8 7\n\
f 1 5 8\nf 1 8 4\nf 2 3 7\nf 2 7 6\n";

fn write_scene_files(dir: &str) -> PathBuf {
    let base = std::env::temp_dir().join(dir);
    fs::create_dir_all(&base).unwrap();
    fs::write(base.join("liquid.obj"), CUBE_OBJ).unwrap();

    // A liquid mesh volume falling onto a solid box obstacle.
    let scene = r#"{
        "name": "mesh drop over box obstacle",
        "world": { "min": [0, 0, 0], "max": [1, 1, 1] },
        "particle_radius": 0.025,
        "primitives": [
            { "shape": "mesh", "kind": "liquid", "file": "liquid.obj" },
            { "shape": "box", "kind": "solid", "min": [0.4, 0.0, 0.4], "max": [0.6, 0.2, 0.6] }
        ],
        "max_timesteps": 3
    }"#;
    fs::write(base.join("scene.json"), scene).unwrap();
    base
}

#[test]
fn scene_file_builds_a_simulation() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let base = write_scene_files("sph_scene_setup_test");
    let scene_path = base.join("scene.json");

    let mut sim = orchestrator::create_simulation(scene_path.to_str().unwrap()).unwrap();

    // The liquid mesh voxelized: a 0.39-sided cube at spacing 0.05 holds
    // 7^3 lattice points.
    assert_eq!(sim.fluid_count(), 343);

    // The solid box added samples beyond the world walls.
    let world_only = {
        let scene = r#"{
            "name": "empty",
            "world": { "min": [0, 0, 0], "max": [1, 1, 1] },
            "particle_radius": 0.025
        }"#;
        fs::write(base.join("empty.json"), scene).unwrap();
        orchestrator::create_simulation(base.join("empty.json").to_str().unwrap())
            .unwrap()
            .boundary_count()
    };
    assert!(
        sim.boundary_count() > world_only,
        "obstacle should add boundary samples beyond the world box ({} vs {world_only})",
        sim.boundary_count()
    );

    // A few steps keep everything finite and confined.
    for _ in 0..3 {
        sim.update(sim.max_timestep());
    }
    for p in sim.fluid_positions() {
        assert!(sim.bounds().contains(*p));
        assert!(p.is_finite());
    }

    fs::remove_dir_all(&base).ok();
}

#[test]
fn runner_honours_scene_stopping_criteria() {
    let base = write_scene_files("sph_scene_runner_test");
    let scene_path = base.join("scene.json");

    let runner = orchestrator::create_runner(scene_path.to_str().unwrap()).unwrap();
    runner.start();
    let deadline = std::time::Instant::now() + std::time::Duration::from_secs(60);
    while runner.state() != orchestrator::runner::RunnerState::Finished {
        assert!(std::time::Instant::now() < deadline, "runner did not stop");
        std::thread::sleep(std::time::Duration::from_millis(10));
    }
    assert_eq!(runner.timestep_count(), 3);
    runner.join().unwrap();

    fs::remove_dir_all(&base).ok();
}
