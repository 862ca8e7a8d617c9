//! Production implementation of PhysicsEngine using rapier2d.

use crate::engine::PhysicsEngine;
use crate::error::PhysicsError;
use crate::types::{
    BodyDesc, BodyHandle, BodyKind, FixtureDesc, JointHandle, MotorLimits, Pose, Shape,
    SolverIterations, Velocity,
};
use nalgebra::Vector2;
use rapier2d_f64::prelude::*;
use std::num::NonZeroUsize;
use tracing::{debug, trace};

/// Bookkeeping for a joint created through the engine interface.
#[derive(Debug, Clone, Copy)]
struct JointSlot {
    handle: ImpulseJointHandle,

    /// Driven body, woken up whenever the motor target changes
    driven: RigidBodyHandle,

    /// Velocity gain for motor joints, `None` for welds
    motor_gain: Option<f64>,
}

/// Physics engine backed by rapier2d (f64, enhanced determinism).
///
/// This is the "real" implementation used by the simulator. Body and joint
/// handles handed out to callers are dense indices into local tables that
/// map onto rapier's generational handles.
pub struct RapierEngine {
    gravity: Vector<Real>,
    integration_params: IntegrationParameters,
    pipeline: PhysicsPipeline,
    island_manager: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    rigid_body_set: RigidBodySet,
    collider_set: ColliderSet,
    impulse_joint_set: ImpulseJointSet,
    multibody_joint_set: MultibodyJointSet,
    ccd_solver: CCDSolver,

    /// BodyHandle index -> rapier handle
    bodies: Vec<RigidBodyHandle>,

    /// JointHandle index -> rapier joint
    joints: Vec<JointSlot>,

    /// Static anchor for motor joints
    ground: BodyHandle,
}

impl RapierEngine {
    /// Creates a new engine with the given gravity vector.
    pub fn new(gravity: Vector2<f64>) -> Self {
        let mut engine = Self {
            gravity,
            integration_params: IntegrationParameters::default(),
            pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            bodies: Vec::new(),
            joints: Vec::new(),
            ground: BodyHandle(0),
        };

        engine.ground = engine.create_body(&BodyDesc::fixed(Pose::default()));
        engine
    }

    /// Creates an engine with zero gravity (top-down arena).
    pub fn top_down() -> Self {
        Self::new(Vector2::zeros())
    }

    fn rapier_body(&self, body: BodyHandle) -> Result<&RigidBody, PhysicsError> {
        self.bodies
            .get(body.index())
            .and_then(|h| self.rigid_body_set.get(*h))
            .ok_or_else(|| PhysicsError::unknown_body(body))
    }

    fn rapier_handle(&self, body: BodyHandle) -> Result<RigidBodyHandle, PhysicsError> {
        self.bodies
            .get(body.index())
            .copied()
            .ok_or_else(|| PhysicsError::unknown_body(body))
    }

    fn push_joint(&mut self, slot: JointSlot) -> JointHandle {
        let handle = JointHandle(self.joints.len() as u32);
        self.joints.push(slot);
        handle
    }

    fn collider_for(shape: &Shape) -> Result<ColliderBuilder, PhysicsError> {
        match shape {
            Shape::Circle { radius } => {
                if !(*radius > 0.0) {
                    return Err(PhysicsError::DegenerateShape(format!("circle radius {}", radius)));
                }
                Ok(ColliderBuilder::ball(*radius))
            }
            Shape::Rect { half_width, half_height } => {
                if !(*half_width > 0.0 && *half_height > 0.0) {
                    return Err(PhysicsError::DegenerateShape(format!(
                        "rect half extents {}x{}",
                        half_width, half_height
                    )));
                }
                Ok(ColliderBuilder::cuboid(*half_width, *half_height))
            }
            Shape::Polygon { vertices } => {
                if vertices.len() < 3 {
                    return Err(PhysicsError::DegenerateShape(format!(
                        "polygon with {} vertices",
                        vertices.len()
                    )));
                }
                ColliderBuilder::convex_hull(vertices).ok_or_else(|| {
                    PhysicsError::DegenerateShape("polygon has no convex hull".to_string())
                })
            }
        }
    }
}

impl Default for RapierEngine {
    fn default() -> Self {
        Self::top_down()
    }
}

impl PhysicsEngine for RapierEngine {
    fn step(&mut self, dt: f64, iterations: SolverIterations) -> Result<(), PhysicsError> {
        if !(dt >= 0.0 && dt.is_finite()) {
            return Err(PhysicsError::invalid(format!("timestep must be non-negative, got {}", dt)));
        }
        if dt == 0.0 {
            return Ok(());
        }

        self.integration_params.dt = dt;
        self.integration_params.num_solver_iterations = NonZeroUsize::new(iterations.velocity)
            .ok_or_else(|| PhysicsError::invalid("velocity iterations must be non-zero"))?;
        self.integration_params.num_internal_pgs_iterations = iterations.position.max(1);

        self.pipeline.step(
            &self.gravity,
            &self.integration_params,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            None,
            &(),
            &(),
        );

        for (index, handle) in self.bodies.iter().enumerate() {
            if let Some(rb) = self.rigid_body_set.get(*handle) {
                let t = rb.translation();
                if !(t.x.is_finite() && t.y.is_finite() && rb.rotation().angle().is_finite()) {
                    return Err(PhysicsError::Diverged(format!("body#{} left finite space", index)));
                }
            }
        }

        trace!("rapier step dt={} bodies={}", dt, self.bodies.len());
        Ok(())
    }

    fn create_body(&mut self, desc: &BodyDesc) -> BodyHandle {
        let builder = match desc.kind {
            BodyKind::Static => RigidBodyBuilder::fixed(),
            BodyKind::Dynamic => RigidBodyBuilder::dynamic(),
        };

        let rb = builder
            .translation(vector![desc.pose.x, desc.pose.y])
            .rotation(desc.pose.angle)
            .linear_damping(desc.linear_damping)
            .angular_damping(desc.angular_damping)
            .can_sleep(desc.can_sleep)
            .build();

        let rapier_handle = self.rigid_body_set.insert(rb);
        let handle = BodyHandle(self.bodies.len() as u32);
        self.bodies.push(rapier_handle);

        debug!("Created {:?} {} at ({:.2}, {:.2})", desc.kind, handle, desc.pose.x, desc.pose.y);
        handle
    }

    fn attach_fixture(
        &mut self,
        body: BodyHandle,
        fixture: &FixtureDesc,
    ) -> Result<(), PhysicsError> {
        let parent = self.rapier_handle(body)?;

        let groups = InteractionGroups::new(
            Group::from_bits_truncate(fixture.filter.category),
            Group::from_bits_truncate(fixture.filter.mask),
        );

        let collider = Self::collider_for(&fixture.shape)?
            .density(fixture.density)
            .friction(fixture.friction)
            .restitution(fixture.restitution)
            .sensor(fixture.sensor)
            .collision_groups(groups)
            .build();

        self.collider_set
            .insert_with_parent(collider, parent, &mut self.rigid_body_set);
        Ok(())
    }

    fn create_motor_joint(
        &mut self,
        anchor: BodyHandle,
        body: BodyHandle,
        limits: MotorLimits,
    ) -> Result<JointHandle, PhysicsError> {
        if !(limits.gain > 0.0) {
            return Err(PhysicsError::invalid(format!(
                "motor gain must be positive, got {}",
                limits.gain
            )));
        }

        let anchor_handle = self.rapier_handle(anchor)?;
        let body_handle = self.rapier_handle(body)?;

        // Anchor point only: the joint frame keeps the anchor's orientation so
        // the translational motor axes stay aligned with the anchor's axes.
        let anchor_iso = *self.rapier_body(anchor)?.position();
        let body_origin = Point::from(self.rapier_body(body)?.translation().clone_owned());
        let local_anchor = anchor_iso.inverse_transform_point(&body_origin);

        let joint = GenericJointBuilder::new(JointAxesMask::empty())
            .local_anchor1(local_anchor)
            .local_anchor2(Point::origin())
            .contacts_enabled(false)
            .motor_velocity(JointAxis::LinX, 0.0, limits.gain)
            .motor_velocity(JointAxis::LinY, 0.0, limits.gain)
            .motor_velocity(JointAxis::AngX, 0.0, limits.gain)
            .motor_max_force(JointAxis::LinX, limits.max_force)
            .motor_max_force(JointAxis::LinY, limits.max_force)
            .motor_max_force(JointAxis::AngX, limits.max_torque)
            .build();

        let handle = self
            .impulse_joint_set
            .insert(anchor_handle, body_handle, joint, true);

        let joint_handle = self.push_joint(JointSlot {
            handle,
            driven: body_handle,
            motor_gain: Some(limits.gain),
        });

        debug!("Created motor {} between {} and {}", joint_handle, anchor, body);
        Ok(joint_handle)
    }

    fn create_weld_joint(
        &mut self,
        parent: BodyHandle,
        child: BodyHandle,
    ) -> Result<JointHandle, PhysicsError> {
        let parent_handle = self.rapier_handle(parent)?;
        let child_handle = self.rapier_handle(child)?;

        let parent_iso = *self.rapier_body(parent)?.position();
        let child_iso = *self.rapier_body(child)?.position();
        let relative = parent_iso.inv_mul(&child_iso);

        let joint = FixedJointBuilder::new()
            .local_frame1(relative)
            .local_frame2(Isometry::identity())
            .contacts_enabled(false)
            .build();

        let handle = self
            .impulse_joint_set
            .insert(parent_handle, child_handle, joint, true);

        let joint_handle = self.push_joint(JointSlot {
            handle,
            driven: child_handle,
            motor_gain: None,
        });

        debug!("Created weld {} between {} and {}", joint_handle, parent, child);
        Ok(joint_handle)
    }

    fn set_motor_velocity(
        &mut self,
        joint: JointHandle,
        velocity: Velocity,
    ) -> Result<(), PhysicsError> {
        let slot = *self
            .joints
            .get(joint.index())
            .ok_or_else(|| PhysicsError::unknown_joint(joint))?;

        let gain = slot
            .motor_gain
            .ok_or_else(|| PhysicsError::invalid(format!("{} is not a motor joint", joint)))?;

        let data = self
            .impulse_joint_set
            .get_mut(slot.handle)
            .ok_or_else(|| PhysicsError::unknown_joint(joint))?;

        data.data
            .set_motor_velocity(JointAxis::LinX, velocity.vx, gain)
            .set_motor_velocity(JointAxis::LinY, velocity.vy, gain)
            .set_motor_velocity(JointAxis::AngX, velocity.va, gain);

        if let Some(rb) = self.rigid_body_set.get_mut(slot.driven) {
            rb.wake_up(true);
        }

        Ok(())
    }

    fn body_pose(&self, body: BodyHandle) -> Result<Pose, PhysicsError> {
        let rb = self.rapier_body(body)?;
        let t = rb.translation();
        Ok(Pose::new(t.x, t.y, rb.rotation().angle()))
    }

    fn body_velocity(&self, body: BodyHandle) -> Result<Velocity, PhysicsError> {
        let rb = self.rapier_body(body)?;
        let v = rb.linvel();
        Ok(Velocity::new(v.x, v.y, rb.angvel()))
    }

    fn body_in_contact(&self, body: BodyHandle) -> Result<bool, PhysicsError> {
        let rb = self.rapier_body(body)?;

        for &collider in rb.colliders() {
            let touching = self
                .narrow_phase
                .contact_pairs_with(collider)
                .any(|pair| pair.has_any_active_contact);
            if touching {
                return Ok(true);
            }

            let overlapping = self
                .narrow_phase
                .intersection_pairs_with(collider)
                .any(|(_, _, intersecting)| intersecting);
            if overlapping {
                return Ok(true);
            }
        }

        Ok(false)
    }

    fn ground(&self) -> BodyHandle {
        self.ground
    }

    fn body_count(&self) -> usize {
        self.bodies.len()
    }
}
