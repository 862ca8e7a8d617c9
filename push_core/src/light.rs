//! Point light sources and ambient light field evaluation.
//!
//! Each light contributes `intensity / (1 + d²)` at a sample point, where
//! `d` is the 3D distance from the point on the arena plane to the light
//! hanging `z` above it. The field is the plain sum over all lights.

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

/// Index of a light within its World.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LightId(pub usize);

impl std::fmt::Display for LightId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "light#{}", self.0)
    }
}

/// A point energy source positioned above the arena plane.
///
/// Position and height are fixed at construction. Intensity can only be
/// changed through `World::set_light_intensity`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Light {
    x: f64,
    y: f64,

    /// Height above the arena plane
    z: f64,

    /// Non-negative emitted intensity
    intensity: f64,
}

impl Light {
    /// Creates a light. Negative intensities are clamped to zero.
    pub fn new(x: f64, y: f64, z: f64, intensity: f64) -> Self {
        Self {
            x,
            y,
            z,
            intensity: intensity.max(0.0),
        }
    }

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn y(&self) -> f64 {
        self.y
    }

    /// Height above the plane.
    pub fn z(&self) -> f64 {
        self.z
    }

    pub fn intensity(&self) -> f64 {
        self.intensity
    }

    pub(crate) fn set_intensity(&mut self, intensity: f64) {
        self.intensity = intensity.max(0.0);
    }

    /// Squared 3D distance from the plane point (x, y) to this light.
    pub fn distance_squared(&self, x: f64, y: f64) -> f64 {
        let dx = x - self.x;
        let dy = y - self.y;
        dx * dx + dy * dy + self.z * self.z
    }

    /// This light's contribution to the field at (x, y).
    pub fn contribution_at(&self, x: f64, y: f64) -> f64 {
        self.intensity / (1.0 + self.distance_squared(x, y))
    }

    /// Gradient of this light's contribution with respect to (x, y).
    pub fn gradient_at(&self, x: f64, y: f64) -> Vector2<f64> {
        let denom = 1.0 + self.distance_squared(x, y);
        let scale = -2.0 * self.intensity / (denom * denom);
        Vector2::new(scale * (x - self.x), scale * (y - self.y))
    }
}

/// Total light intensity at (x, y). Zero when `lights` is empty.
pub fn intensity_at(lights: &[Light], x: f64, y: f64) -> f64 {
    lights.iter().map(|light| light.contribution_at(x, y)).sum()
}

/// Gradient of the total field at (x, y); points toward brighter light.
pub fn gradient_at(lights: &[Light], x: f64, y: f64) -> Vector2<f64> {
    lights
        .iter()
        .fold(Vector2::zeros(), |acc, light| acc + light.gradient_at(x, y))
}

/// Cell-centered grid positions covering a `width` x `height` arena.
///
/// Row-major: y outer, x inner. Empty when either count is zero.
pub fn grid_positions(width: f64, height: f64, xcount: usize, ycount: usize) -> Vec<(f64, f64)> {
    if xcount == 0 || ycount == 0 {
        return Vec::new();
    }

    let dx = width / xcount as f64;
    let dy = height / ycount as f64;

    let mut positions = Vec::with_capacity(xcount * ycount);
    for j in 0..ycount {
        for i in 0..xcount {
            positions.push(((i as f64 + 0.5) * dx, (j as f64 + 0.5) * dy));
        }
    }
    positions
}
