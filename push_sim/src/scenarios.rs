//! Built-in arena scenarios.
//!
//! A scenario lays out lights, boxes and robots from a seeded RNG, and may
//! edit the world between frames (the blackout scenario switches its lights
//! off half way through).

use crate::config::SimConfig;
use push_core::{BoxShape, BoxSpec, DepletionPolicy, Light, RobotSpec, World, WorldError};
use push_env::PhysicsEngine;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScenarioId {
    /// A few robots foraging under a light grid among boxes
    Forage,

    /// Lights go dark half way through the run
    Blackout,

    /// Many robots and boxes in a crowded arena
    Crowd,

    /// Robots start empty and crawl toward a single light
    Starved,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::Forage,
            ScenarioId::Blackout,
            ScenarioId::Crowd,
            ScenarioId::Starved,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::Forage => "forage",
            ScenarioId::Blackout => "blackout",
            ScenarioId::Crowd => "crowd",
            ScenarioId::Starved => "starved",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::Forage => "4 robots, 2x2 light grid, 3 boxes",
            ScenarioId::Blackout => "4 robots under a 3x3 grid that goes dark at half time",
            ScenarioId::Crowd => "24 robots and 16 boxes, 4x4 light grid",
            ScenarioId::Starved => "6 empty robots throttled to 30%, one light in a corner",
        }
    }

    fn robot_count(&self) -> usize {
        match self {
            ScenarioId::Forage | ScenarioId::Blackout => 4,
            ScenarioId::Crowd => 24,
            ScenarioId::Starved => 6,
        }
    }

    fn box_count(&self) -> usize {
        match self {
            ScenarioId::Forage => 3,
            ScenarioId::Blackout => 2,
            ScenarioId::Crowd => 16,
            ScenarioId::Starved => 0,
        }
    }

    /// Populates `world` from the scenario layout.
    ///
    /// Robots are placed inside the robot ring and boxes inside the box
    /// ring, rejecting spots that overlap anything already placed.
    pub fn populate<E: PhysicsEngine>(
        &self,
        world: &mut World<E>,
        config: &SimConfig,
        rng: &mut ChaCha8Rng,
    ) -> Result<(), WorldError> {
        match self {
            ScenarioId::Forage => {
                world.add_light_grid(2, 2, 0.5, 40.0);
            }
            ScenarioId::Blackout => {
                world.add_light_grid(3, 3, 0.5, 25.0);
            }
            ScenarioId::Crowd => {
                world.add_light_grid(4, 4, 1.0, 30.0);
            }
            ScenarioId::Starved => {
                let inset = world.config().robot_boundary_inset + 1.0;
                let (x, y) = (world.width() - inset, world.height() - inset);
                world.add_light(Light::new(x, y, 0.5, 60.0));
            }
        }

        let mut placer = Placer::new(world);

        for _ in 0..self.box_count() {
            let shape = if rng.gen_bool(0.5) { BoxShape::Rect } else { BoxShape::Hex };
            let size: f64 = rng.gen_range(0.4..0.9);
            let footprint = size * std::f64::consts::FRAC_1_SQRT_2;
            let inset = world.config().box_boundary_inset;
            let Some((x, y)) = placer.place(rng, footprint, inset) else {
                debug!("No room for another box in {}", self);
                break;
            };
            let angle = rng.gen_range(0.0..std::f64::consts::TAU);
            world.add_box(BoxSpec::new(shape, size, x, y, angle))?;
        }

        let mut params = config.robot.params;
        if *self == ScenarioId::Starved {
            params.charge = 0.0;
            params.depletion = DepletionPolicy::Throttle(0.3);
        }

        for _ in 0..self.robot_count() {
            let inset = world.config().robot_boundary_inset;
            let Some((x, y)) = placer.place(rng, params.size / 2.0, inset) else {
                debug!("No room for another robot in {}", self);
                break;
            };
            let angle = rng.gen_range(0.0..std::f64::consts::TAU);
            world.add_robot(
                RobotSpec::new(x, y, angle)
                    .with_params(params)
                    .with_policy(config.robot.policy.build()),
            )?;
        }

        info!(
            "Scenario {}: {} lights, {} boxes, {} robots",
            self,
            world.lights().len(),
            world.boxes().len(),
            world.robots().len()
        );
        Ok(())
    }

    /// Applies between-frame world edits. `total_steps` is the run length.
    pub fn on_frame<E: PhysicsEngine>(&self, world: &mut World<E>, total_steps: u64) {
        if *self == ScenarioId::Blackout && world.steps() >= total_steps / 2 {
            let lit: Vec<usize> = (0..world.lights().len())
                .filter(|&i| world.lights()[i].intensity() > 0.0)
                .collect();
            if !lit.is_empty() {
                info!("Blackout at step {}", world.steps());
            }
            for i in lit {
                world.set_light_intensity(i, 0.0);
            }
        }
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "forage" => Ok(ScenarioId::Forage),
            "blackout" | "dark" => Ok(ScenarioId::Blackout),
            "crowd" | "crowded" => Ok(ScenarioId::Crowd),
            "starved" | "starve" => Ok(ScenarioId::Starved),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}

/// Rejection sampler for non-overlapping circular footprints.
struct Placer {
    width: f64,
    height: f64,
    placed: Vec<(f64, f64, f64)>,
}

impl Placer {
    const ATTEMPTS: usize = 200;
    const CLEARANCE: f64 = 0.1;

    fn new<E: PhysicsEngine>(world: &World<E>) -> Self {
        Self {
            width: world.width(),
            height: world.height(),
            placed: Vec::new(),
        }
    }

    fn place(&mut self, rng: &mut ChaCha8Rng, radius: f64, inset: f64) -> Option<(f64, f64)> {
        let margin = inset + radius + Self::CLEARANCE;
        if 2.0 * margin >= self.width || 2.0 * margin >= self.height {
            return None;
        }

        for _ in 0..Self::ATTEMPTS {
            let x = rng.gen_range(margin..self.width - margin);
            let y = rng.gen_range(margin..self.height - margin);
            let clear = self.placed.iter().all(|(px, py, pr)| {
                let min = pr + radius + Self::CLEARANCE;
                (px - x).powi(2) + (py - y).powi(2) >= min * min
            });
            if clear {
                self.placed.push((x, y, radius));
                return Some((x, y));
            }
        }
        None
    }
}
