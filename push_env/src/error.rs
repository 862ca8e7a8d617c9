//! Error types for the physics engine abstraction.

use thiserror::Error;

/// Errors that can occur when talking to a physics engine.
///
/// None of these are recoverable inside a simulation step; callers are
/// expected to abort the run when one surfaces from `step`.
#[derive(Debug, Error)]
pub enum PhysicsError {
    /// Shape could not be turned into a collider (e.g. collinear hull points)
    #[error("Degenerate shape: {0}")]
    DegenerateShape(String),

    /// Body handle does not belong to this engine
    #[error("Unknown body: {0}")]
    UnknownBody(String),

    /// Joint handle does not belong to this engine
    #[error("Unknown joint: {0}")]
    UnknownJoint(String),

    /// Caller passed a parameter the engine cannot use
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Solver produced non-finite body state
    #[error("Solver diverged: {0}")]
    Diverged(String),
}

impl PhysicsError {
    /// Creates an unknown-body error.
    pub fn unknown_body(body: impl std::fmt::Display) -> Self {
        Self::UnknownBody(body.to_string())
    }

    /// Creates an unknown-joint error.
    pub fn unknown_joint(joint: impl std::fmt::Display) -> Self {
        Self::UnknownJoint(joint.to_string())
    }

    /// Creates an invalid-parameter error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }
}
