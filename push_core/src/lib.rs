//! Push Core - light-foraging robots and pushable boxes in a 2D arena
//!
//! This library coordinates three concerns on top of a black-box physics engine:
//! 1. **World orchestration**: fixed-timestep physics advance followed by robot updates
//! 2. **Energy model**: robots harvest ambient light, pay to live and to move
//! 3. **Collision policy**: a category matrix decides what robots and boxes may cross

pub mod category;
pub mod entity;
pub mod error;
pub mod light;
pub mod observer;
pub mod policy;
pub mod robot;
pub mod world;

// Re-export key types for convenience
pub use category::{CollisionMatrix, EntityCategory};
pub use entity::{BoxId, BoxShape, BoxSpec, PushBox};
pub use error::WorldError;
pub use light::{Light, LightId};
pub use observer::{WorldChange, WorldObserver};
pub use policy::{Constant, DepletionPolicy, Idle, Observation, Phototaxis, Policy, PolicyKind};
pub use robot::{Robot, RobotHandles, RobotId, RobotIo, RobotParams, RobotSpec};
pub use world::{World, WorldConfig};
