//! Pushable boxes.

use push_env::{BodyHandle, Pose, Shape};
use serde::{Deserialize, Serialize};

/// Index of a box within its World.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BoxId(pub usize);

impl std::fmt::Display for BoxId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "box#{}", self.0)
    }
}

/// Outline of a box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoxShape {
    /// Square with side `size`
    Rect,

    /// Regular hexagon with circumscribed diameter `size`
    Hex,
}

impl BoxShape {
    /// Collision geometry for a box of this outline.
    pub fn to_shape(&self, size: f64) -> Shape {
        let half = size / 2.0;
        match self {
            BoxShape::Rect => Shape::Rect {
                half_width: half,
                half_height: half,
            },
            BoxShape::Hex => Shape::regular_polygon(6, half),
        }
    }
}

/// Construction parameters for a box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoxSpec {
    pub shape: BoxShape,
    pub size: f64,
    pub pose: Pose,
}

impl BoxSpec {
    pub fn new(shape: BoxShape, size: f64, x: f64, y: f64, angle: f64) -> Self {
        Self {
            shape,
            size,
            pose: Pose::new(x, y, angle),
        }
    }
}

/// A passive, pushable box. All behaviour lives in the physics engine.
#[derive(Debug, Clone)]
pub struct PushBox {
    id: BoxId,
    shape: BoxShape,
    size: f64,
    body: BodyHandle,
}

impl PushBox {
    pub(crate) fn new(id: BoxId, shape: BoxShape, size: f64, body: BodyHandle) -> Self {
        Self { id, shape, size, body }
    }

    pub fn id(&self) -> BoxId {
        self.id
    }

    pub fn shape(&self) -> BoxShape {
        self.shape
    }

    pub fn size(&self) -> f64 {
        self.size
    }

    /// Handle of the box's physics body.
    pub fn body(&self) -> BodyHandle {
        self.body
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_shape_half_extents() {
        assert_eq!(
            BoxShape::Rect.to_shape(2.0),
            Shape::Rect {
                half_width: 1.0,
                half_height: 1.0
            }
        );
    }

    #[test]
    fn test_hex_shape_has_six_vertices() {
        match BoxShape::Hex.to_shape(1.0) {
            Shape::Polygon { vertices } => assert_eq!(vertices.len(), 6),
            other => panic!("expected hexagon, got {:?}", other),
        }
    }
}
