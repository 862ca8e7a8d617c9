//! Light-foraging robots.
//!
//! A robot owns an energy store, reads two sensors (ambient light at its
//! position and a bumper), and drives a single planar motor joint. Robots
//! do not hold a reference to their World: each step the World lends them a
//! [`RobotIo`] view over the light list and the physics engine.
//!
//! # Per-step update
//!
//! ```text
//! sense ──► energy balance ──► policy / depletion hook ──► actuate
//!   │             │                       │                    │
//!   light,     charge_delta,          Observation ──►       set_speed
//!   bumper     clamp to [0, max]      Velocity              (motor target)
//! ```

use crate::light::{self, Light};
use crate::policy::{DepletionPolicy, Idle, Observation, Policy};
use nalgebra::{Rotation2, Vector2};
use push_env::{
    BodyHandle, JointHandle, MotorLimits, PhysicsEngine, PhysicsError, Pose, Velocity,
};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Index of a robot within its World.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RobotId(pub usize);

impl std::fmt::Display for RobotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "robot#{}", self.0)
    }
}

/// Physical and energetic parameters of a robot, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RobotParams {
    /// Body diameter (m)
    pub size: f64,

    /// Initial stored energy (J)
    pub charge: f64,

    /// Storage capacity (J)
    pub charge_max: f64,

    /// Fraction of sensed light turned into charge
    pub input_efficiency: f64,

    /// Cost per second of being alive
    pub output_metabolic: f64,

    /// Cost per second per unit of commanded speed
    pub output_efficiency: f64,

    /// Behaviour while charge is zero
    pub depletion: DepletionPolicy,

    /// Motor joint limits
    pub motor: MotorLimits,
}

impl Default for RobotParams {
    fn default() -> Self {
        Self {
            size: 0.5,
            charge: 100.0,
            charge_max: 100.0,
            input_efficiency: 0.1,
            output_metabolic: 0.01,
            output_efficiency: 0.1,
            depletion: DepletionPolicy::Freeze,
            motor: MotorLimits::default(),
        }
    }
}

/// Everything needed to add a robot to a World.
pub struct RobotSpec {
    pub pose: Pose,
    pub params: RobotParams,
    pub policy: Box<dyn Policy>,
}

impl RobotSpec {
    /// Robot at (x, y) facing `angle`, default parameters, idle policy.
    pub fn new(x: f64, y: f64, angle: f64) -> Self {
        Self {
            pose: Pose::new(x, y, angle),
            params: RobotParams::default(),
            policy: Box::new(Idle),
        }
    }

    pub fn with_params(mut self, params: RobotParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_policy(mut self, policy: Box<dyn Policy>) -> Self {
        self.policy = policy;
        self
    }
}

impl std::fmt::Debug for RobotSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RobotSpec")
            .field("pose", &self.pose)
            .field("params", &self.params)
            .field("policy", &self.policy.name())
            .finish()
    }
}

/// Physics handles owned by a robot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RobotHandles {
    /// Locomotion body
    pub body: BodyHandle,

    /// Bumper sub-body welded to `body`
    pub bumper: BodyHandle,

    /// Motor joint between the ground and `body`
    pub joint: JointHandle,
}

/// Borrowed view of the World handed to a robot during its update.
///
/// Grants read access to the light field and mediated access to the
/// physics engine. Built by the World; robots never see the World itself.
pub struct RobotIo<'a, E: PhysicsEngine> {
    lights: &'a [Light],
    engine: &'a mut E,
}

impl<'a, E: PhysicsEngine> RobotIo<'a, E> {
    pub(crate) fn new(lights: &'a [Light], engine: &'a mut E) -> Self {
        Self { lights, engine }
    }

    /// Field intensity at an arbitrary point.
    pub fn light_intensity_at(&self, x: f64, y: f64) -> f64 {
        light::intensity_at(self.lights, x, y)
    }

    /// Field gradient at an arbitrary point.
    pub fn light_gradient_at(&self, x: f64, y: f64) -> Vector2<f64> {
        light::gradient_at(self.lights, x, y)
    }

    pub fn pose(&self, body: BodyHandle) -> Result<Pose, PhysicsError> {
        self.engine.body_pose(body)
    }

    fn in_contact(&self, body: BodyHandle) -> Result<bool, PhysicsError> {
        self.engine.body_in_contact(body)
    }

    fn drive(&mut self, joint: JointHandle, velocity: Velocity) -> Result<(), PhysicsError> {
        self.engine.set_motor_velocity(joint, velocity)
    }
}

/// An energy-foraging agent.
pub struct Robot {
    id: RobotId,
    size: f64,

    charge: f64,
    charge_max: f64,

    /// Last computed rate of change of charge (diagnostic)
    charge_delta: f64,

    input_efficiency: f64,
    output_metabolic: f64,
    output_efficiency: f64,

    depletion: DepletionPolicy,
    handles: RobotHandles,

    /// Robot-frame command currently held by the motor
    commanded: Velocity,

    /// Sensor readings from the most recent update
    last_light: f64,
    last_bumper: bool,

    policy: Box<dyn Policy>,
}

impl Robot {
    pub(crate) fn new(
        id: RobotId,
        params: &RobotParams,
        handles: RobotHandles,
        policy: Box<dyn Policy>,
    ) -> Self {
        let charge_max = params.charge_max.max(0.0);
        Self {
            id,
            size: params.size,
            charge: params.charge.clamp(0.0, charge_max),
            charge_max,
            charge_delta: 0.0,
            input_efficiency: params.input_efficiency,
            output_metabolic: params.output_metabolic,
            output_efficiency: params.output_efficiency,
            depletion: params.depletion,
            handles,
            commanded: Velocity::ZERO,
            last_light: 0.0,
            last_bumper: false,
            policy,
        }
    }

    pub fn id(&self) -> RobotId {
        self.id
    }

    pub fn size(&self) -> f64 {
        self.size
    }

    pub fn charge(&self) -> f64 {
        self.charge
    }

    pub fn charge_max(&self) -> f64 {
        self.charge_max
    }

    pub fn charge_delta(&self) -> f64 {
        self.charge_delta
    }

    pub fn input_efficiency(&self) -> f64 {
        self.input_efficiency
    }

    pub fn output_metabolic(&self) -> f64 {
        self.output_metabolic
    }

    pub fn output_efficiency(&self) -> f64 {
        self.output_efficiency
    }

    pub fn depletion(&self) -> DepletionPolicy {
        self.depletion
    }

    pub fn handles(&self) -> RobotHandles {
        self.handles
    }

    /// Robot-frame velocity most recently sent to the motor.
    pub fn commanded(&self) -> Velocity {
        self.commanded
    }

    /// Light intensity seen during the last update.
    pub fn last_light(&self) -> f64 {
        self.last_light
    }

    /// Bumper state seen during the last update.
    pub fn last_bumper(&self) -> bool {
        self.last_bumper
    }

    pub fn policy_name(&self) -> &'static str {
        self.policy.name()
    }

    /// True when no charge is left.
    pub fn is_depleted(&self) -> bool {
        self.charge <= 0.0
    }

    /// Ambient light intensity at the robot's current position.
    pub fn light_intensity<E: PhysicsEngine>(
        &self,
        io: &RobotIo<'_, E>,
    ) -> Result<f64, PhysicsError> {
        let pose = io.pose(self.handles.body)?;
        Ok(io.light_intensity_at(pose.x, pose.y))
    }

    /// True if the bumper is touching another body.
    pub fn bumper_pressed<E: PhysicsEngine>(
        &self,
        io: &RobotIo<'_, E>,
    ) -> Result<bool, PhysicsError> {
        io.in_contact(self.handles.bumper)
    }

    /// Sets the motor target to the robot-frame velocity `(x, y, a)`.
    ///
    /// Calls before the next physics step overwrite each other.
    pub fn set_speed<E: PhysicsEngine>(
        &mut self,
        io: &mut RobotIo<'_, E>,
        x: f64,
        y: f64,
        a: f64,
    ) -> Result<(), PhysicsError> {
        let heading = io.pose(self.handles.body)?.angle;
        let command = Velocity::new(x, y, a);
        io.drive(self.handles.joint, command.rotated(heading))?;
        self.commanded = command;
        Ok(())
    }

    /// Runs one sense / energy / decide / actuate cycle.
    pub fn update<E: PhysicsEngine>(
        &mut self,
        io: &mut RobotIo<'_, E>,
        timestep: f64,
    ) -> Result<(), PhysicsError> {
        let light = self.light_intensity(io)?;
        let bumper = self.bumper_pressed(io)?;
        self.last_light = light;
        self.last_bumper = bumper;

        self.apply_energy_balance(light, timestep);

        let pose = io.pose(self.handles.body)?;
        let world_gradient = io.light_gradient_at(pose.x, pose.y);
        let obs = Observation {
            charge: self.charge,
            charge_max: self.charge_max,
            charge_delta: self.charge_delta,
            light,
            gradient: Rotation2::new(-pose.angle) * world_gradient,
            bumper,
        };

        let command = if self.is_depleted() {
            let policy = &mut self.policy;
            self.depletion.resolve(|| policy.decide(&obs))
        } else {
            Some(self.policy.decide(&obs))
        };

        if let Some(cmd) = command {
            self.set_speed(io, cmd.vx, cmd.vy, cmd.va)?;
        }

        trace!(
            "{} light={:.3} bumper={} charge={:.3} delta={:.4}",
            self.id,
            light,
            bumper,
            self.charge,
            self.charge_delta
        );
        Ok(())
    }

    /// Applies one step of the energy balance and returns the rate used.
    ///
    /// Motion cost uses the command held by the motor during the physics
    /// advance that just finished.
    fn apply_energy_balance(&mut self, sensed: f64, timestep: f64) -> f64 {
        self.charge_delta = self.input_efficiency * sensed
            - self.output_metabolic
            - self.output_efficiency * self.commanded.magnitude();

        self.charge = (self.charge + self.charge_delta * timestep).clamp(0.0, self.charge_max);
        self.charge_delta
    }
}

impl std::fmt::Debug for Robot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Robot")
            .field("id", &self.id)
            .field("charge", &self.charge)
            .field("charge_max", &self.charge_max)
            .field("charge_delta", &self.charge_delta)
            .field("commanded", &self.commanded)
            .field("policy", &self.policy.name())
            .finish()
    }
}
