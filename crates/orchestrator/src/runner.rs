//! Simulation runner with lifecycle management.
//!
//! Runs a [`kernel::Simulation`] in a background thread at its maximum
//! timestep, with start / pause / resume control and optional stopping
//! criteria.

use kernel::Simulation;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Instant;

/// Runner lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerState {
    /// Created but not yet started.
    Created,
    /// Actively stepping.
    Running,
    /// Paused; resume to continue.
    Paused,
    /// Reached a stopping criterion or was dropped.
    Finished,
}

/// State shared between the runner thread and the control handle.
struct SharedState {
    state: RunnerState,
    sim_time: f64,
    timestep_count: u64,
}

/// Handle controlling a simulation running on a background thread.
pub struct SimulationRunner {
    shared: Arc<Mutex<SharedState>>,
    thread_handle: Option<thread::JoinHandle<()>>,
}

impl SimulationRunner {
    /// Spawn the runner thread. Stepping begins once [`start`](Self::start)
    /// is called.
    pub fn new(
        simulation: Simulation,
        max_timesteps: Option<u64>,
        max_time: Option<f64>,
    ) -> Self {
        let shared = Arc::new(Mutex::new(SharedState {
            state: RunnerState::Created,
            sim_time: 0.0,
            timestep_count: 0,
        }));

        let shared_clone = Arc::clone(&shared);
        let thread_handle = thread::spawn(move || {
            run_simulation_loop(simulation, shared_clone, max_timesteps, max_time);
        });

        Self {
            shared,
            thread_handle: Some(thread_handle),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> RunnerState {
        self.shared.lock().unwrap().state
    }

    /// Simulated time in seconds.
    pub fn sim_time(&self) -> f64 {
        self.shared.lock().unwrap().sim_time
    }

    /// Number of executed timesteps.
    pub fn timestep_count(&self) -> u64 {
        self.shared.lock().unwrap().timestep_count
    }

    /// Begin stepping (from `Created`).
    pub fn start(&self) {
        let mut shared = self.shared.lock().unwrap();
        if shared.state == RunnerState::Created {
            shared.state = RunnerState::Running;
        }
    }

    /// Pause stepping.
    pub fn pause(&self) {
        let mut shared = self.shared.lock().unwrap();
        if shared.state == RunnerState::Running {
            shared.state = RunnerState::Paused;
        }
    }

    /// Resume stepping after a pause.
    pub fn resume(&self) {
        let mut shared = self.shared.lock().unwrap();
        if shared.state == RunnerState::Paused {
            shared.state = RunnerState::Running;
        }
    }

    /// Wait for the runner thread to finish.
    pub fn join(mut self) -> Result<(), String> {
        if let Some(handle) = self.thread_handle.take() {
            handle.join().map_err(|_| "runner thread panicked".to_string())?;
        }
        Ok(())
    }
}

impl Drop for SimulationRunner {
    fn drop(&mut self) {
        // Signal the thread to exit; it checks the state every iteration.
        if let Ok(mut shared) = self.shared.lock() {
            if shared.state != RunnerState::Finished {
                shared.state = RunnerState::Finished;
            }
        }
    }
}

fn run_simulation_loop(
    mut simulation: Simulation,
    shared: Arc<Mutex<SharedState>>,
    max_timesteps: Option<u64>,
    max_time: Option<f64>,
) {
    let dt = simulation.max_timestep();
    let started = Instant::now();
    let mut sim_time = 0.0_f64;
    let mut timestep_count = 0_u64;

    loop {
        let state = shared.lock().unwrap().state;
        match state {
            RunnerState::Created | RunnerState::Paused => {
                thread::sleep(std::time::Duration::from_millis(10));
                continue;
            }
            RunnerState::Finished => break,
            RunnerState::Running => {}
        }

        simulation.update(dt);
        sim_time += dt as f64;
        timestep_count += 1;

        let mut done = false;
        if let Some(max) = max_timesteps {
            done |= timestep_count >= max;
        }
        if let Some(max) = max_time {
            done |= sim_time >= max;
        }

        {
            let mut guard = shared.lock().unwrap();
            guard.sim_time = sim_time;
            guard.timestep_count = timestep_count;
            if done {
                guard.state = RunnerState::Finished;
            }
        }
        if done {
            break;
        }
    }

    let elapsed = started.elapsed().as_secs_f64();
    tracing::info!(
        "runner finished: {timestep_count} steps, {sim_time:.4}s simulated in {elapsed:.2}s wall"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use kernel::{Aabb, Scene, Shape};

    fn small_simulation() -> Simulation {
        let scene = Scene {
            bounds: Aabb::new(Vec3::ZERO, Vec3::ONE),
            particle_radius: 0.05,
            liquids: vec![Shape::Box(Aabb::new(
                Vec3::splat(0.3),
                Vec3::splat(0.7),
            ))],
            ..Scene::default()
        };
        Simulation::new(&scene).unwrap()
    }

    #[test]
    fn runs_to_the_step_limit() {
        let runner = SimulationRunner::new(small_simulation(), Some(5), None);
        assert_eq!(runner.state(), RunnerState::Created);
        runner.start();

        // The thread stops itself at the limit.
        let deadline = Instant::now() + std::time::Duration::from_secs(30);
        while runner.state() != RunnerState::Finished {
            assert!(Instant::now() < deadline, "runner did not finish in time");
            thread::sleep(std::time::Duration::from_millis(5));
        }
        assert_eq!(runner.timestep_count(), 5);
        assert!(runner.sim_time() > 0.0);
        runner.join().unwrap();
    }

    #[test]
    fn pause_halts_progress() {
        let runner = SimulationRunner::new(small_simulation(), Some(100_000), None);
        runner.start();
        thread::sleep(std::time::Duration::from_millis(50));
        runner.pause();
        // Allow the in-flight step to land, then verify no further progress.
        thread::sleep(std::time::Duration::from_millis(30));
        let frozen = runner.timestep_count();
        thread::sleep(std::time::Duration::from_millis(50));
        assert_eq!(runner.timestep_count(), frozen);

        runner.resume();
        thread::sleep(std::time::Duration::from_millis(30));
        assert!(runner.timestep_count() >= frozen);
        // Dropping the runner signals the thread to exit.
    }
}
