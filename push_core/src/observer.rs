//! Change notifications emitted by a World.
//!
//! Front ends that cache derived data (a rasterised light field, a render
//! list) register an observer instead of wrapping the World's mutators.
//! The World invokes every observer after each successful mutation.

use crate::entity::BoxId;
use crate::light::LightId;
use crate::robot::RobotId;

/// A mutation that has just been applied to a World.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WorldChange {
    LightAdded(LightId),

    /// `count` lights appended starting at `first`
    LightGridAdded { first: LightId, count: usize },

    LightIntensityChanged { light: LightId, intensity: f64 },

    RobotAdded(RobotId),

    BoxAdded(BoxId),
}

impl WorldChange {
    /// Returns true if the light field may have changed.
    pub fn affects_lights(&self) -> bool {
        matches!(
            self,
            WorldChange::LightAdded(_)
                | WorldChange::LightGridAdded { .. }
                | WorldChange::LightIntensityChanged { .. }
        )
    }
}

/// Receives World change notifications.
///
/// Any `FnMut(&WorldChange) + Send` closure is an observer.
pub trait WorldObserver: Send {
    fn on_change(&mut self, change: &WorldChange);
}

impl<F> WorldObserver for F
where
    F: FnMut(&WorldChange) + Send,
{
    fn on_change(&mut self, change: &WorldChange) {
        self(change)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_light_changes_flagged() {
        assert!(WorldChange::LightAdded(LightId(0)).affects_lights());
        assert!(WorldChange::LightGridAdded {
            first: LightId(0),
            count: 4
        }
        .affects_lights());
        assert!(WorldChange::LightIntensityChanged {
            light: LightId(2),
            intensity: 1.0
        }
        .affects_lights());
        assert!(!WorldChange::RobotAdded(RobotId(0)).affects_lights());
        assert!(!WorldChange::BoxAdded(BoxId(0)).affects_lights());
    }

    #[test]
    fn test_closure_is_observer() {
        let mut seen = Vec::new();
        {
            let mut observer = |change: &WorldChange| seen.push(*change);
            observer.on_change(&WorldChange::RobotAdded(RobotId(3)));
        }
        assert_eq!(seen, vec![WorldChange::RobotAdded(RobotId(3))]);
    }
}
