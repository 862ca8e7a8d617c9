//! Collision categories and the category/mask matrix.
//!
//! Every fixture in the arena belongs to exactly one [`EntityCategory`]. The
//! [`CollisionMatrix`] decides which pairs of categories may touch and is
//! turned into per-fixture filters when bodies are created, so changing what
//! robots or boxes can cross never requires touching shape code.

use push_env::CollisionFilter;
use serde::{Deserialize, Serialize};

/// Collision category of a fixture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityCategory {
    /// Outer wall ring that holds boxes
    BoxBoundary,

    /// Inner wall ring that holds robots
    RobotBoundary,

    Robot,

    Box,
}

impl EntityCategory {
    pub const ALL: [EntityCategory; 4] = [
        EntityCategory::BoxBoundary,
        EntityCategory::RobotBoundary,
        EntityCategory::Robot,
        EntityCategory::Box,
    ];

    /// Category bit used in collision filters.
    pub fn bits(&self) -> u32 {
        match self {
            EntityCategory::BoxBoundary => 0x1,
            EntityCategory::RobotBoundary => 0x2,
            EntityCategory::Robot => 0x4,
            EntityCategory::Box => 0x8,
        }
    }
}

/// Which categories each category is willing to collide with.
///
/// Pairs collide only when both sides list each other, matching how the
/// engine evaluates filters. Use [`CollisionMatrix::enable`] and
/// [`CollisionMatrix::disable`] to edit pairs symmetrically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionMatrix {
    pub box_boundary: u32,
    pub robot_boundary: u32,
    pub robot: u32,
    #[serde(rename = "box")]
    pub box_mask: u32,
}

impl Default for CollisionMatrix {
    /// Boxes stop at the box ring, robots stop at the robot ring, and all
    /// robots and boxes collide with each other.
    fn default() -> Self {
        let robot = EntityCategory::Robot.bits();
        let boxes = EntityCategory::Box.bits();

        Self {
            box_boundary: boxes,
            robot_boundary: robot,
            robot: EntityCategory::RobotBoundary.bits() | robot | boxes,
            box_mask: EntityCategory::BoxBoundary.bits() | robot | boxes,
        }
    }
}

impl CollisionMatrix {
    /// A matrix in which nothing collides.
    pub fn empty() -> Self {
        Self {
            box_boundary: 0,
            robot_boundary: 0,
            robot: 0,
            box_mask: 0,
        }
    }

    /// Mask for a category.
    pub fn mask(&self, category: EntityCategory) -> u32 {
        match category {
            EntityCategory::BoxBoundary => self.box_boundary,
            EntityCategory::RobotBoundary => self.robot_boundary,
            EntityCategory::Robot => self.robot,
            EntityCategory::Box => self.box_mask,
        }
    }

    fn mask_mut(&mut self, category: EntityCategory) -> &mut u32 {
        match category {
            EntityCategory::BoxBoundary => &mut self.box_boundary,
            EntityCategory::RobotBoundary => &mut self.robot_boundary,
            EntityCategory::Robot => &mut self.robot,
            EntityCategory::Box => &mut self.box_mask,
        }
    }

    /// Allows `a` and `b` to collide.
    pub fn enable(mut self, a: EntityCategory, b: EntityCategory) -> Self {
        *self.mask_mut(a) |= b.bits();
        *self.mask_mut(b) |= a.bits();
        self
    }

    /// Prevents `a` and `b` from colliding.
    pub fn disable(mut self, a: EntityCategory, b: EntityCategory) -> Self {
        *self.mask_mut(a) &= !b.bits();
        *self.mask_mut(b) &= !a.bits();
        self
    }

    /// Returns true if fixtures of these categories collide.
    pub fn collides(&self, a: EntityCategory, b: EntityCategory) -> bool {
        self.filter(a).interacts_with(&self.filter(b))
    }

    /// Engine-level filter for a fixture of `category`.
    pub fn filter(&self, category: EntityCategory) -> CollisionFilter {
        CollisionFilter::new(category.bits(), self.mask(category))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use EntityCategory::*;

    #[test]
    fn test_default_matrix_separates_rings() {
        let m = CollisionMatrix::default();

        assert!(m.collides(Box, BoxBoundary));
        assert!(!m.collides(Box, RobotBoundary));
        assert!(m.collides(Robot, RobotBoundary));
        assert!(!m.collides(Robot, BoxBoundary));

        assert!(m.collides(Robot, Robot));
        assert!(m.collides(Robot, Box));
        assert!(m.collides(Box, Box));
        assert!(!m.collides(BoxBoundary, RobotBoundary));
    }

    #[test]
    fn test_matrix_is_symmetric() {
        let m = CollisionMatrix::default().disable(Robot, Box);
        for a in EntityCategory::ALL {
            for b in EntityCategory::ALL {
                assert_eq!(m.collides(a, b), m.collides(b, a), "{:?} vs {:?}", a, b);
            }
        }
        assert!(!m.collides(Robot, Box));
    }

    #[test]
    fn test_enable_lets_robots_hit_box_ring() {
        let m = CollisionMatrix::default().enable(Robot, BoxBoundary);
        assert!(m.collides(Robot, BoxBoundary));
        assert!(m.collides(Box, BoxBoundary));
    }

    #[test]
    fn test_empty_matrix() {
        let m = CollisionMatrix::empty();
        assert!(EntityCategory::ALL
            .iter()
            .all(|a| EntityCategory::ALL.iter().all(|b| !m.collides(*a, *b))));
    }

    #[test]
    fn test_category_bits_are_distinct() {
        let combined = EntityCategory::ALL.iter().fold(0, |acc, c| acc | c.bits());
        assert_eq!(combined, 0xF);
    }
}
