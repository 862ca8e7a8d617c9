//! Core physics engine trait consumed by the Push world.

use crate::error::PhysicsError;
use crate::types::{
    BodyDesc, BodyHandle, FixtureDesc, JointHandle, MotorLimits, Pose, SolverIterations, Velocity,
};

/// The central interface to the rigid-body physics service.
///
/// The Push world treats the engine as a black box: it creates bodies,
/// fixtures and joints during setup, advances the engine once per step and
/// queries poses and contacts at sense time. Nothing else in the simulation
/// touches engine state.
///
/// # Implementations
///
/// - **Production**: `RapierEngine` - wraps `rapier2d-f64` built with
///   `enhanced-determinism`
///
/// # Determinism
///
/// Implementations must be deterministic: the same sequence of calls on a
/// freshly constructed engine must yield bit-identical poses.
pub trait PhysicsEngine {
    /// Advances every body by exactly `dt` seconds. A zero `dt` is a no-op.
    ///
    /// # Errors
    /// * `InvalidParameter` - `dt` is negative or not finite
    /// * `Diverged` - the solver produced a non-finite body state
    fn step(&mut self, dt: f64, iterations: SolverIterations) -> Result<(), PhysicsError>;

    /// Creates a rigid body with no fixtures attached.
    fn create_body(&mut self, desc: &BodyDesc) -> BodyHandle;

    /// Attaches a fixture carrying a shape and a collision filter to `body`.
    fn attach_fixture(
        &mut self,
        body: BodyHandle,
        fixture: &FixtureDesc,
    ) -> Result<(), PhysicsError>;

    /// Creates a velocity-driven motor joint between `anchor` and `body`.
    ///
    /// The joint leaves both translational axes and the rotation free and
    /// drives each of them toward a target velocity expressed in the
    /// anchor's frame.
    fn create_motor_joint(
        &mut self,
        anchor: BodyHandle,
        body: BodyHandle,
        limits: MotorLimits,
    ) -> Result<JointHandle, PhysicsError>;

    /// Rigidly welds `child` to `parent` at their current relative pose.
    ///
    /// Contacts between the two welded bodies are disabled.
    fn create_weld_joint(
        &mut self,
        parent: BodyHandle,
        child: BodyHandle,
    ) -> Result<JointHandle, PhysicsError>;

    /// Sets the target velocity of a motor joint.
    ///
    /// Repeated calls before the next `step` overwrite each other.
    fn set_motor_velocity(
        &mut self,
        joint: JointHandle,
        velocity: Velocity,
    ) -> Result<(), PhysicsError>;

    /// Returns a body's current pose.
    fn body_pose(&self, body: BodyHandle) -> Result<Pose, PhysicsError>;

    /// Returns a body's current velocity.
    fn body_velocity(&self, body: BodyHandle) -> Result<Velocity, PhysicsError>;

    /// Returns true if any fixture of `body` is currently touching another body.
    fn body_in_contact(&self, body: BodyHandle) -> Result<bool, PhysicsError>;

    /// Returns the engine's static ground body (joint anchor).
    fn ground(&self) -> BodyHandle;

    /// Returns the number of bodies created so far, ground included.
    fn body_count(&self) -> usize;
}
