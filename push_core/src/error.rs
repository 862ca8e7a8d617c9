//! Errors raised by World operations.

use push_env::PhysicsError;
use thiserror::Error;

/// Errors raised by World construction, registration and stepping.
///
/// Any error from `World::step` leaves the simulation in an undefined state
/// and should be treated as fatal.
#[derive(Debug, Error)]
pub enum WorldError {
    #[error("Physics engine error: {0}")]
    Physics(#[from] PhysicsError),

    #[error("Unknown robot: {0}")]
    UnknownRobot(usize),

    #[error("Unknown box: {0}")]
    UnknownBox(usize),

    #[error("Invalid world configuration: {0}")]
    InvalidConfig(String),
}
