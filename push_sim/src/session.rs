//! Interactive session control without a window.
//!
//! A [`Session`] owns a World and decides, frame by frame, how many world
//! steps to run: none while paused, exactly one after a single-step request,
//! and `skip` per frame otherwise. It also tracks whether the light field
//! needs redrawing, using a [`WorldObserver`](push_core::WorldObserver)
//! registered on the World. Each session carries its own flags, so several
//! sessions can run side by side.

use push_core::{World, WorldChange, WorldError};
use push_env::{PhysicsEngine, RapierEngine};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// A control input from the front end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    TogglePause,

    /// Run one step on the next frame, then stay paused
    Step,

    /// Steps per frame
    Skip(u32),

    Quit,
}

impl SessionCommand {
    /// Maps a keypress to a command: `p` pause, `s` step, `1`-`9` skip, `q` quit.
    pub fn from_key(key: char) -> Option<Self> {
        match key {
            'p' | ' ' => Some(SessionCommand::TogglePause),
            's' | '.' => Some(SessionCommand::Step),
            'q' => Some(SessionCommand::Quit),
            digit => digit.to_digit(10).filter(|d| *d > 0).map(SessionCommand::Skip),
        }
    }
}

/// What happened during one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameReport {
    /// World steps run this frame
    pub steps_taken: u32,

    /// The light field changed since the last frame
    pub redraw_lights: bool,
}

/// A World plus pause / single-step / frame-skip gating.
pub struct Session<E: PhysicsEngine = RapierEngine> {
    world: World<E>,
    timestep: f64,

    paused: bool,
    step_requested: bool,
    skip: u32,
    quit: bool,

    lights_dirty: Arc<AtomicBool>,
}

impl<E: PhysicsEngine> Session<E> {
    /// Wraps `world`, stepping it by `timestep` seconds per world step.
    ///
    /// The light field starts dirty so the first frame draws it.
    pub fn new(mut world: World<E>, timestep: f64) -> Self {
        let lights_dirty = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&lights_dirty);
        world.add_observer(Box::new(move |change: &WorldChange| {
            if change.affects_lights() {
                flag.store(true, Ordering::Relaxed);
            }
        }));

        Self {
            world,
            timestep,
            paused: false,
            step_requested: false,
            skip: 1,
            quit: false,
            lights_dirty,
        }
    }

    /// Starts the session paused.
    pub fn paused(mut self) -> Self {
        self.paused = true;
        self
    }

    pub fn with_skip(mut self, skip: u32) -> Self {
        self.set_skip(skip);
        self
    }

    pub fn world(&self) -> &World<E> {
        &self.world
    }

    /// Mutable access for light edits and entity registration.
    pub fn world_mut(&mut self) -> &mut World<E> {
        &mut self.world
    }

    pub fn timestep(&self) -> f64 {
        self.timestep
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn skip(&self) -> u32 {
        self.skip
    }

    pub fn is_quit(&self) -> bool {
        self.quit
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
        self.step_requested = false;
    }

    pub fn toggle_pause(&mut self) {
        if self.paused {
            self.resume();
        } else {
            self.pause();
        }
        debug!("Session {}", if self.paused { "paused" } else { "resumed" });
    }

    /// Requests a single step. Pauses the session if it was running.
    pub fn request_step(&mut self) {
        self.paused = true;
        self.step_requested = true;
    }

    /// Sets the number of world steps per frame (at least 1).
    pub fn set_skip(&mut self, skip: u32) {
        self.skip = skip.max(1);
    }

    pub fn request_quit(&mut self) {
        self.quit = true;
    }

    pub fn apply(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::TogglePause => self.toggle_pause(),
            SessionCommand::Step => self.request_step(),
            SessionCommand::Skip(n) => self.set_skip(n),
            SessionCommand::Quit => self.request_quit(),
        }
    }

    /// Returns and clears the light-redraw flag.
    pub fn take_light_redraw(&mut self) -> bool {
        self.lights_dirty.swap(false, Ordering::Relaxed)
    }

    /// Runs one frame's worth of world steps.
    pub fn advance_frame(&mut self) -> Result<FrameReport, WorldError> {
        let steps = if self.quit {
            0
        } else if self.paused {
            u32::from(std::mem::take(&mut self.step_requested))
        } else {
            self.skip
        };

        for _ in 0..steps {
            self.world.step(self.timestep)?;
        }

        Ok(FrameReport {
            steps_taken: steps,
            redraw_lights: self.take_light_redraw(),
        })
    }

    /// Advances frames until the world has run `target_steps` steps in total
    /// or the session is quit. Returns the number of frames run.
    pub fn run_until(&mut self, target_steps: u64) -> Result<u64, WorldError> {
        let mut frames = 0;
        while !self.quit && !self.paused && self.world.steps() < target_steps {
            self.advance_frame()?;
            frames += 1;
        }
        info!("Session ran {} frames, world at step {}", frames, self.world.steps());
        Ok(frames)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use push_core::{Light, RobotSpec, WorldConfig};

    fn session() -> Session {
        let mut world = World::new(WorldConfig::default()).unwrap();
        world.add_robot(RobotSpec::new(5.0, 5.0, 0.0)).unwrap();
        Session::new(world, 0.1)
    }

    #[test]
    fn test_running_session_steps_skip_per_frame() {
        let mut s = session().with_skip(3);

        let report = s.advance_frame().unwrap();
        assert_eq!(report.steps_taken, 3);
        assert_eq!(s.world().steps(), 3);

        s.advance_frame().unwrap();
        assert_eq!(s.world().steps(), 6);
    }

    #[test]
    fn test_paused_session_does_not_step() {
        let mut s = session().paused();
        for _ in 0..5 {
            assert_eq!(s.advance_frame().unwrap().steps_taken, 0);
        }
        assert_eq!(s.world().steps(), 0);
    }

    #[test]
    fn test_single_step_while_paused() {
        let mut s = session().with_skip(5).paused();

        s.request_step();
        assert_eq!(s.advance_frame().unwrap().steps_taken, 1);
        assert_eq!(s.advance_frame().unwrap().steps_taken, 0);
        assert_eq!(s.world().steps(), 1);
        assert!(s.is_paused());
    }

    #[test]
    fn test_step_request_pauses_running_session() {
        let mut s = session();
        s.apply(SessionCommand::Step);
        assert!(s.is_paused());
        assert_eq!(s.advance_frame().unwrap().steps_taken, 1);
    }

    #[test]
    fn test_toggle_and_quit() {
        let mut s = session();
        s.apply(SessionCommand::TogglePause);
        assert!(s.is_paused());
        s.apply(SessionCommand::TogglePause);
        assert!(!s.is_paused());

        s.apply(SessionCommand::Quit);
        assert_eq!(s.advance_frame().unwrap().steps_taken, 0);
    }

    #[test]
    fn test_skip_is_at_least_one() {
        let mut s = session();
        s.set_skip(0);
        assert_eq!(s.skip(), 1);
    }

    #[test]
    fn test_light_redraw_tracking() {
        let mut s = session();

        assert!(s.take_light_redraw(), "first frame draws the field");
        assert!(!s.take_light_redraw());

        s.advance_frame().unwrap();
        assert!(!s.take_light_redraw(), "stepping alone does not dirty lights");

        s.world_mut().add_light(Light::new(1.0, 1.0, 0.0, 5.0));
        assert!(s.advance_frame().unwrap().redraw_lights);

        s.world_mut().set_light_intensity(0, 9.0);
        assert!(s.take_light_redraw());

        s.world_mut().set_light_intensity(42, 9.0);
        assert!(!s.take_light_redraw(), "ignored edits do not dirty lights");
    }

    #[test]
    fn test_key_mapping() {
        assert_eq!(SessionCommand::from_key('p'), Some(SessionCommand::TogglePause));
        assert_eq!(SessionCommand::from_key('s'), Some(SessionCommand::Step));
        assert_eq!(SessionCommand::from_key('4'), Some(SessionCommand::Skip(4)));
        assert_eq!(SessionCommand::from_key('0'), None);
        assert_eq!(SessionCommand::from_key('x'), None);
    }

    #[test]
    fn test_independent_sessions() {
        let mut a = session();
        let mut b = session().paused();

        a.advance_frame().unwrap();
        b.advance_frame().unwrap();

        assert_eq!(a.world().steps(), 1);
        assert_eq!(b.world().steps(), 0);
    }

    #[test]
    fn test_run_until_reaches_target() {
        let mut s = session().with_skip(4);
        let frames = s.run_until(10).unwrap();
        assert_eq!(frames, 3);
        assert_eq!(s.world().steps(), 12);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn test_running_frames_take_skip_steps(skip in 1u32..12, frames in 1u64..6) {
            let mut s = session().with_skip(skip);
            for _ in 0..frames {
                prop_assert_eq!(s.advance_frame().unwrap().steps_taken, skip);
            }
            prop_assert_eq!(s.world().steps(), u64::from(skip) * frames);
        }
    }
}
