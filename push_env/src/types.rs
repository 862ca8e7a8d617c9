//! Common types for the physics engine abstraction.

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// Opaque handle to a rigid body owned by a physics engine.
///
/// Handles are dense indices assigned in creation order, so they stay
/// valid for the lifetime of the engine (bodies are never removed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BodyHandle(pub u32);

impl BodyHandle {
    /// Returns the handle as a slot index.
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for BodyHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "body#{}", self.0)
    }
}

/// Opaque handle to a joint owned by a physics engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JointHandle(pub u32);

impl JointHandle {
    /// Returns the handle as a slot index.
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for JointHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "joint#{}", self.0)
    }
}

/// Position and orientation of a body in the arena plane.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    pub x: f64,
    pub y: f64,
    /// Heading in radians, counter-clockwise from +x
    pub angle: f64,
}

impl Pose {
    pub fn new(x: f64, y: f64, angle: f64) -> Self {
        Self { x, y, angle }
    }

    /// Returns true if every component is finite.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.angle.is_finite()
    }
}

/// Planar velocity: two translational axes plus rotation.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Velocity {
    /// Linear velocity along x (m/s)
    pub vx: f64,

    /// Linear velocity along y (m/s)
    pub vy: f64,

    /// Angular velocity (rad/s)
    pub va: f64,
}

impl Velocity {
    pub const ZERO: Velocity = Velocity { vx: 0.0, vy: 0.0, va: 0.0 };

    pub fn new(vx: f64, vy: f64, va: f64) -> Self {
        Self { vx, vy, va }
    }

    /// Euclidean norm over all three axes.
    pub fn magnitude(&self) -> f64 {
        (self.vx * self.vx + self.vy * self.vy + self.va * self.va).sqrt()
    }

    /// Multiplies every axis by `factor`.
    pub fn scaled(&self, factor: f64) -> Self {
        Self::new(self.vx * factor, self.vy * factor, self.va * factor)
    }

    /// Rotates the translational part by `angle` radians (body frame to world frame).
    pub fn rotated(&self, angle: f64) -> Self {
        let (s, c) = angle.sin_cos();
        Self::new(c * self.vx - s * self.vy, s * self.vx + c * self.vy, self.va)
    }
}

/// How the solver treats a body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BodyKind {
    /// Never moves (walls, ground anchor)
    Static,

    /// Fully simulated
    Dynamic,
}

/// Description of a rigid body to create.
#[derive(Debug, Clone, PartialEq)]
pub struct BodyDesc {
    pub kind: BodyKind,
    pub pose: Pose,
    pub linear_damping: f64,
    pub angular_damping: f64,
    /// Whether the solver may put the body to sleep when it comes to rest
    pub can_sleep: bool,
}

impl BodyDesc {
    /// A static body at the given pose.
    pub fn fixed(pose: Pose) -> Self {
        Self {
            kind: BodyKind::Static,
            pose,
            linear_damping: 0.0,
            angular_damping: 0.0,
            can_sleep: true,
        }
    }

    /// A dynamic body at the given pose.
    pub fn dynamic(pose: Pose) -> Self {
        Self {
            kind: BodyKind::Dynamic,
            pose,
            linear_damping: 0.0,
            angular_damping: 0.0,
            can_sleep: true,
        }
    }

    /// Sets linear and angular damping.
    pub fn with_damping(mut self, linear: f64, angular: f64) -> Self {
        self.linear_damping = linear;
        self.angular_damping = angular;
        self
    }

    /// Sets whether the body may sleep.
    pub fn with_sleep(mut self, can_sleep: bool) -> Self {
        self.can_sleep = can_sleep;
        self
    }
}

/// Collision geometry, expressed in the body's local frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    Circle { radius: f64 },
    Rect { half_width: f64, half_height: f64 },
    /// Convex polygon; the hull of the given points is used
    Polygon { vertices: Vec<Point2<f64>> },
}

impl Shape {
    /// Regular polygon with `sides` vertices on a circle of `radius`.
    pub fn regular_polygon(sides: usize, radius: f64) -> Self {
        let vertices = (0..sides)
            .map(|i| {
                let theta = std::f64::consts::TAU * i as f64 / sides as f64;
                Point2::new(radius * theta.cos(), radius * theta.sin())
            })
            .collect();
        Shape::Polygon { vertices }
    }
}

/// Per-fixture collision filter.
///
/// Two fixtures interact only if each one's category is in the other's mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CollisionFilter {
    /// Category bits this fixture belongs to
    pub category: u32,

    /// Categories this fixture is willing to touch
    pub mask: u32,
}

impl CollisionFilter {
    pub fn new(category: u32, mask: u32) -> Self {
        Self { category, mask }
    }

    /// Returns true if fixtures with these two filters may collide.
    pub fn interacts_with(&self, other: &CollisionFilter) -> bool {
        (self.category & other.mask) != 0 && (other.category & self.mask) != 0
    }
}

impl Default for CollisionFilter {
    fn default() -> Self {
        Self {
            category: 0x1,
            mask: u32::MAX,
        }
    }
}

/// Description of a fixture (collider) attached to a body.
#[derive(Debug, Clone, PartialEq)]
pub struct FixtureDesc {
    pub shape: Shape,
    pub filter: CollisionFilter,
    pub density: f64,
    pub friction: f64,
    pub restitution: f64,
    /// Sensors report overlaps but produce no contact forces
    pub sensor: bool,
}

impl FixtureDesc {
    /// A solid fixture with unit density and default friction.
    pub fn new(shape: Shape, filter: CollisionFilter) -> Self {
        Self {
            shape,
            filter,
            density: 1.0,
            friction: 0.5,
            restitution: 0.0,
            sensor: false,
        }
    }

    pub fn with_density(mut self, density: f64) -> Self {
        self.density = density;
        self
    }
}

/// Limits for a velocity-driven planar motor joint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotorLimits {
    /// Maximum force applied along each translational axis
    pub max_force: f64,

    /// Maximum torque applied about the rotational axis
    pub max_torque: f64,

    /// Velocity tracking gain; high enough that the motor, not body
    /// damping, sets the achieved velocity
    pub gain: f64,
}

impl Default for MotorLimits {
    fn default() -> Self {
        Self {
            max_force: 100.0,
            max_torque: 50.0,
            gain: 100.0,
        }
    }
}

/// Solver iteration counts used for every step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolverIterations {
    pub velocity: usize,
    pub position: usize,
}

impl Default for SolverIterations {
    fn default() -> Self {
        Self {
            velocity: 8,
            position: 3,
        }
    }
}
