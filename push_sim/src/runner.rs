//! Scenario runner - executes arena scenarios headlessly.
//!
//! A run builds a World from the configuration, lays the scenario out from a
//! `ChaCha8Rng` seeded with the run seed, then drives a [`Session`] frame by
//! frame until the requested number of world steps has been taken. After
//! every frame the runner checks the arena invariants: charge within
//! capacity, robot poses finite and inside the arena.

use crate::config::SimConfig;
use crate::exporter::{SimExport, SimFrame};
use crate::scenarios::ScenarioId;
use crate::session::Session;

use push_core::{World, WorldError};
use push_env::{PhysicsEngine, Pose};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, warn};

/// Results from running a scenario.
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    /// Scenario that was run
    pub scenario: ScenarioId,

    /// Seed used
    pub seed: u64,

    /// Whether the run finished with every invariant intact
    pub passed: bool,

    /// Total world steps executed
    pub total_steps: u64,

    /// Final simulation time in seconds
    pub final_time_secs: f64,

    /// Number of robots in the arena
    pub robot_count: usize,

    /// Failure message if any
    pub failure_reason: Option<String>,

    /// Metrics collected during run
    pub metrics: ScenarioMetrics,
}

/// Metrics collected during scenario execution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScenarioMetrics {
    /// Frames advanced
    pub frames: u64,

    /// Robot-frames on which the bumper was pressed
    pub bumper_contacts: u64,

    /// Mean charge as a fraction of capacity at the end of the run
    pub mean_charge_fraction: f64,

    /// Lowest charge seen on any robot at the end of the run
    pub min_charge: f64,

    /// Robots with no charge left at the end of the run
    pub depleted_robots: usize,

    /// Largest distance any box travelled from its start position
    pub max_box_displacement: f64,
}

/// Runs arena scenarios.
pub struct ScenarioRunner {
    /// Layout seed
    seed: u64,

    config: SimConfig,
}

impl ScenarioRunner {
    /// Creates a new scenario runner with the default configuration.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            config: SimConfig::default(),
        }
    }

    pub fn with_config(mut self, config: SimConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the number of world steps per run.
    pub fn with_steps(mut self, steps: u64) -> Self {
        self.config.run.steps = steps;
        self
    }

    /// Sets the timestep.
    pub fn with_dt(mut self, dt: f64) -> Self {
        self.config.run.dt = dt;
        self
    }

    /// Sets the number of world steps per frame.
    pub fn with_skip(mut self, skip: u32) -> Self {
        self.config.run.skip = skip;
        self
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Runs a scenario and returns the result.
    pub fn run(&self, scenario: ScenarioId) -> ScenarioResult {
        self.execute(scenario, None)
    }

    /// Runs a scenario, recording one frame per session frame.
    pub fn run_recorded(&self, scenario: ScenarioId) -> (ScenarioResult, SimExport) {
        let mut export = SimExport::new(scenario.name(), self.seed, self.config.run.dt);
        let result = self.execute(scenario, Some(&mut export));
        export.finalize(result.passed, result.failure_reason.clone());
        (result, export)
    }

    fn execute(&self, scenario: ScenarioId, export: Option<&mut SimExport>) -> ScenarioResult {
        info!("Starting scenario: {} (seed={})", scenario.name(), self.seed);

        let mut metrics = ScenarioMetrics::default();
        let outcome = self.drive(scenario, &mut metrics, export);

        let (passed, failure_reason, total_steps, final_time_secs, robot_count) = match outcome {
            Ok(summary) => (
                summary.violation.is_none(),
                summary.violation,
                summary.steps,
                summary.time,
                summary.robots,
            ),
            Err(e) => {
                warn!("Scenario {} aborted: {}", scenario, e);
                (false, Some(e.to_string()), 0, 0.0, 0)
            }
        };

        ScenarioResult {
            scenario,
            seed: self.seed,
            passed,
            total_steps,
            final_time_secs,
            robot_count,
            failure_reason,
            metrics,
        }
    }

    fn drive(
        &self,
        scenario: ScenarioId,
        metrics: &mut ScenarioMetrics,
        mut export: Option<&mut SimExport>,
    ) -> Result<RunSummary, WorldError> {
        let run = self.config.run;

        let mut world = World::new(self.config.world.clone())?;
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        scenario.populate(&mut world, &self.config, &mut rng)?;

        let box_starts: Vec<Pose> = world
            .boxes()
            .iter()
            .map(|b| world.box_pose(b.id()))
            .collect::<Result<_, _>>()?;

        let mut session = Session::new(world, run.dt);
        let skip = run.skip.max(1);

        if let Some(export) = export.as_deref_mut() {
            let lights = session.take_light_redraw();
            export.add_frame(SimFrame::capture(session.world(), lights)?);
        }

        let mut violation = None;
        while session.world().steps() < run.steps {
            let remaining = run.steps - session.world().steps();
            session.set_skip(skip.min(u32::try_from(remaining).unwrap_or(u32::MAX)));

            scenario.on_frame(session.world_mut(), run.steps);
            let report = session.advance_frame()?;
            metrics.frames += 1;

            let world = session.world();
            let pressed = world.robots().iter().filter(|r| r.last_bumper()).count();
            metrics.bumper_contacts += pressed as u64;

            if let Some(export) = export.as_deref_mut() {
                export.add_frame(SimFrame::capture(world, report.redraw_lights)?);
            }

            if let Some(reason) = check_invariants(world)? {
                warn!("Scenario {} failed at step {}: {}", scenario, world.steps(), reason);
                violation = Some(reason);
                break;
            }

            if metrics.frames % 100 == 0 {
                debug!(
                    "  t={:.1}s | step={} | mean charge={:.3}",
                    world.time(),
                    world.steps(),
                    mean_charge_fraction(world)
                );
            }
        }

        let world = session.world();
        metrics.mean_charge_fraction = mean_charge_fraction(world);
        metrics.min_charge = world
            .robots()
            .iter()
            .map(|r| r.charge())
            .fold(f64::INFINITY, f64::min);
        if !metrics.min_charge.is_finite() {
            metrics.min_charge = 0.0;
        }
        metrics.depleted_robots = world.robots().iter().filter(|r| r.is_depleted()).count();

        for (b, start) in world.boxes().iter().zip(&box_starts) {
            let pose = world.box_pose(b.id())?;
            let moved = ((pose.x - start.x).powi(2) + (pose.y - start.y).powi(2)).sqrt();
            metrics.max_box_displacement = metrics.max_box_displacement.max(moved);
        }

        info!(
            "Scenario {} finished: {} steps, mean charge {:.3}, {} depleted",
            scenario,
            world.steps(),
            metrics.mean_charge_fraction,
            metrics.depleted_robots
        );

        Ok(RunSummary {
            violation,
            steps: world.steps(),
            time: world.time(),
            robots: world.robots().len(),
        })
    }
}

struct RunSummary {
    violation: Option<String>,
    steps: u64,
    time: f64,
    robots: usize,
}

fn mean_charge_fraction<E: PhysicsEngine>(world: &World<E>) -> f64 {
    let robots = world.robots();
    if robots.is_empty() {
        return 0.0;
    }
    let total: f64 = robots
        .iter()
        .map(|r| if r.charge_max() > 0.0 { r.charge() / r.charge_max() } else { 0.0 })
        .sum();
    total / robots.len() as f64
}

/// Returns a description of the first broken invariant, if any.
fn check_invariants<E: PhysicsEngine>(world: &World<E>) -> Result<Option<String>, WorldError> {
    for robot in world.robots() {
        if !(0.0..=robot.charge_max()).contains(&robot.charge()) {
            return Ok(Some(format!(
                "{} charge {} outside [0, {}]",
                robot.id(),
                robot.charge(),
                robot.charge_max()
            )));
        }

        let pose = world.robot_pose(robot.id())?;
        if !pose.is_finite() {
            return Ok(Some(format!("{} pose is not finite", robot.id())));
        }
        if pose.x < 0.0 || pose.x > world.width() || pose.y < 0.0 || pose.y > world.height() {
            return Ok(Some(format!(
                "{} escaped the arena at ({:.2}, {:.2})",
                robot.id(),
                pose.x,
                pose.y
            )));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_forage_scenario() {
        let result = ScenarioRunner::new(42).with_steps(50).run(ScenarioId::Forage);

        assert!(result.passed, "{:?}", result.failure_reason);
        assert_eq!(result.total_steps, 50);
        assert_eq!(result.robot_count, 4);
        assert_eq!(result.metrics.frames, 50);
        assert_relative_eq!(result.final_time_secs, 5.0, epsilon = 1e-9);
    }

    #[test]
    fn test_skip_groups_steps_into_frames() {
        let result = ScenarioRunner::new(42)
            .with_steps(50)
            .with_skip(8)
            .run(ScenarioId::Forage);

        assert!(result.passed);
        assert_eq!(result.total_steps, 50);
        // 6 full frames of 8 and a final frame of 2
        assert_eq!(result.metrics.frames, 7);
    }

    #[test]
    fn test_blackout_scenario() {
        let result = ScenarioRunner::new(7).with_steps(40).run(ScenarioId::Blackout);
        assert!(result.passed, "{:?}", result.failure_reason);
    }

    #[test]
    fn test_starved_scenario_stays_in_bounds() {
        let result = ScenarioRunner::new(3).with_steps(40).run(ScenarioId::Starved);

        assert!(result.passed, "{:?}", result.failure_reason);
        assert!(result.metrics.min_charge >= 0.0);
    }

    #[test]
    fn test_invalid_timestep_fails_run() {
        let result = ScenarioRunner::new(1)
            .with_steps(5)
            .with_dt(-0.1)
            .run(ScenarioId::Forage);

        assert!(!result.passed);
        assert!(result.failure_reason.is_some());
    }

    #[test]
    fn test_recorded_run_exports_frames() {
        let (result, export) = ScenarioRunner::new(42)
            .with_steps(20)
            .with_skip(5)
            .run_recorded(ScenarioId::Blackout);

        assert!(result.passed);
        // initial frame plus one per session frame
        assert_eq!(export.frames.len(), 5);
        assert!(export.frames[0].lights.is_some());
        assert!(export.frames[1].lights.is_none());
        assert!(export.passed);
    }

    #[test]
    fn test_same_seed_same_metrics() {
        let a = ScenarioRunner::new(9).with_steps(60).run(ScenarioId::Crowd);
        let b = ScenarioRunner::new(9).with_steps(60).run(ScenarioId::Crowd);
        assert_eq!(a.metrics, b.metrics);
    }
}
