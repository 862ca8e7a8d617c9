//! Robot control policies.
//!
//! A robot's base type only knows how to sense and actuate. What it *does*
//! with those primitives is decided by a [`Policy`], called once per world
//! step after the energy balance has been applied. What happens when the
//! battery runs flat is decided separately by the robot's
//! [`DepletionPolicy`].

use nalgebra::Vector2;
use push_env::Velocity;
use serde::{Deserialize, Serialize};

/// Everything a policy may look at when choosing a command.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    /// Stored energy after this step's balance
    pub charge: f64,

    pub charge_max: f64,

    /// Rate of change of charge computed this step
    pub charge_delta: f64,

    /// Raw light intensity at the robot's position
    pub light: f64,

    /// Light field gradient in the robot's own frame (+x is forward)
    pub gradient: Vector2<f64>,

    /// Bumper touching another body
    pub bumper: bool,
}

impl Observation {
    /// Charge as a fraction of capacity, in [0, 1].
    pub fn charge_fraction(&self) -> f64 {
        if self.charge_max > 0.0 {
            (self.charge / self.charge_max).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

/// Decision logic for a robot.
///
/// Returned commands are robot-frame velocities `(vx, vy, va)`: `vx` forward,
/// `vy` to the left, `va` counter-clockwise.
pub trait Policy: Send {
    /// Short name for logs and exports.
    fn name(&self) -> &'static str;

    /// Chooses this step's motion command.
    fn decide(&mut self, obs: &Observation) -> Velocity;
}

/// Never moves.
#[derive(Debug, Clone, Copy, Default)]
pub struct Idle;

impl Policy for Idle {
    fn name(&self) -> &'static str {
        "idle"
    }

    fn decide(&mut self, _obs: &Observation) -> Velocity {
        Velocity::ZERO
    }
}

/// Always issues the same command.
#[derive(Debug, Clone, Copy)]
pub struct Constant(pub Velocity);

impl Policy for Constant {
    fn name(&self) -> &'static str {
        "constant"
    }

    fn decide(&mut self, _obs: &Observation) -> Velocity {
        self.0
    }
}

/// Light-foraging behaviour.
///
/// - bumper pressed: reverse and turn for `backoff_steps` steps
/// - charge below `hunger * charge_max`: translate up the light gradient
///   at `cruise_speed` while turning to face it
/// - otherwise: wander forward at half speed on a slow constant turn
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Phototaxis {
    /// Translational speed when foraging (m/s)
    pub cruise_speed: f64,

    /// Proportional gain on heading error (1/s)
    pub turn_gain: f64,

    /// Charge fraction below which the robot seeks light
    pub hunger: f64,

    /// Turn rate while wandering (rad/s)
    pub wander_rate: f64,

    /// Steps spent backing off after a bump
    pub backoff_steps: u32,

    #[serde(skip)]
    pub backoff_remaining: u32,
}

impl Default for Phototaxis {
    fn default() -> Self {
        Self {
            cruise_speed: 0.5,
            turn_gain: 2.0,
            hunger: 0.8,
            wander_rate: 0.3,
            backoff_steps: 10,
            backoff_remaining: 0,
        }
    }
}

impl Phototaxis {
    const MIN_GRADIENT: f64 = 1e-9;

    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true while the robot is reversing away from a bump.
    pub fn is_backing_off(&self) -> bool {
        self.backoff_remaining > 0
    }
}

impl Policy for Phototaxis {
    fn name(&self) -> &'static str {
        "phototaxis"
    }

    fn decide(&mut self, obs: &Observation) -> Velocity {
        if obs.bumper {
            self.backoff_remaining = self.backoff_steps;
        }

        if self.backoff_remaining > 0 {
            self.backoff_remaining -= 1;
            return Velocity::new(-0.5 * self.cruise_speed, 0.0, std::f64::consts::FRAC_PI_2);
        }

        let norm = obs.gradient.norm();
        if obs.charge_fraction() < self.hunger && norm > Self::MIN_GRADIENT {
            let dir = obs.gradient / norm;
            let heading_error = dir.y.atan2(dir.x);
            return Velocity::new(
                self.cruise_speed * dir.x,
                self.cruise_speed * dir.y,
                self.turn_gain * heading_error,
            );
        }

        Velocity::new(0.5 * self.cruise_speed, 0.0, self.wander_rate)
    }
}

/// Serializable policy selection, used by configuration files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PolicyKind {
    Idle,
    Constant { vx: f64, vy: f64, va: f64 },
    Phototaxis(Phototaxis),
}

impl Default for PolicyKind {
    fn default() -> Self {
        PolicyKind::Phototaxis(Phototaxis::default())
    }
}

impl PolicyKind {
    /// Instantiates the selected policy.
    pub fn build(&self) -> Box<dyn Policy> {
        match self {
            PolicyKind::Idle => Box::new(Idle),
            PolicyKind::Constant { vx, vy, va } => Box::new(Constant(Velocity::new(*vx, *vy, *va))),
            PolicyKind::Phototaxis(p) => Box::new(*p),
        }
    }
}

/// What a robot does while its charge is zero.
///
/// The policy is evaluated after the step's energy balance. A robot that
/// gathers enough light to rise above zero resumes normal behaviour on the
/// next step.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepletionPolicy {
    /// Command zero velocity; the policy is not consulted
    #[default]
    Freeze,

    /// Issue no command at all; the motor keeps its last target and the
    /// policy is not consulted
    Drift,

    /// Consult the policy but scale its command by the factor (clamped to [0, 1])
    Throttle(f64),
}

impl DepletionPolicy {
    /// Resolves the command to issue for a depleted robot.
    ///
    /// `None` means "do not actuate". `decide` is only invoked for
    /// `Throttle`.
    pub fn resolve(&self, decide: impl FnOnce() -> Velocity) -> Option<Velocity> {
        match self {
            DepletionPolicy::Freeze => Some(Velocity::ZERO),
            DepletionPolicy::Drift => None,
            DepletionPolicy::Throttle(factor) => Some(decide().scaled(factor.clamp(0.0, 1.0))),
        }
    }
}
