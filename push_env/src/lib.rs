//! Push Physics Abstraction Layer
//!
//! This crate provides the boundary between the Push arena simulation and
//! the rigid-body physics engine it runs on. The simulation core only ever
//! talks to [`PhysicsEngine`], so the engine can be swapped without touching
//! world or robot logic.
//!
//! # Core Concept: Engine as a Black Box
//!
//! The core uses exactly five kinds of engine interaction:
//! - Create bodies and attach fixtures carrying a shape and a collision filter
//! - Create joints (a planar velocity motor, and a weld)
//! - Set a motor's target velocity
//! - Advance the engine by a fixed timestep
//! - Query poses, velocities and contacts
//!
//! # Example
//!
//! ```ignore
//! use push_env::{BodyDesc, PhysicsEngine, Pose, RapierEngine, SolverIterations};
//!
//! let mut engine = RapierEngine::top_down();
//! let body = engine.create_body(&BodyDesc::dynamic(Pose::new(1.0, 1.0, 0.0)));
//! engine.step(0.1, SolverIterations::default())?;
//! let pose = engine.body_pose(body)?;
//! ```

mod engine;
mod error;
mod rapier_impl;
mod types;

pub use engine::PhysicsEngine;
pub use error::PhysicsError;
pub use rapier_impl::RapierEngine;
pub use types::{
    BodyDesc, BodyHandle, BodyKind, CollisionFilter, FixtureDesc, JointHandle, MotorLimits, Pose,
    Shape, SolverIterations, Velocity,
};
