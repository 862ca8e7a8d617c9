//! The arena: physics engine, boundary rings, lights, boxes and robots.
//!
//! A World exclusively owns its physics engine and every entity registered
//! in it. Entities are addressed by index ([`LightId`], [`BoxId`],
//! [`RobotId`]); nothing is ever removed, so an id stays valid for the
//! World's lifetime.
//!
//! # Step Order
//!
//! ```text
//! step(dt)
//!   ├─ engine.step(dt, iterations)     all bodies advance
//!   ├─ steps += 1
//!   └─ for robot in robots (registration order)
//!        └─ robot.update(RobotIo { lights, engine }, dt)
//! ```
//!
//! # Boundary Rings
//!
//! Two rings of four static walls are built in the constructor. The outer
//! ring carries the box-boundary category and the inner ring the
//! robot-boundary category, so with the default [`CollisionMatrix`] boxes
//! roam the whole arena while robots are held inside the inner ring.

use crate::category::{CollisionMatrix, EntityCategory};
use crate::entity::{BoxId, BoxSpec, PushBox};
use crate::error::WorldError;
use crate::light::{self, Light, LightId};
use crate::observer::{WorldChange, WorldObserver};
use crate::robot::{Robot, RobotHandles, RobotId, RobotIo, RobotSpec};
use nalgebra::Vector2;
use push_env::{
    BodyDesc, BodyHandle, FixtureDesc, PhysicsEngine, Pose, RapierEngine, Shape, SolverIterations,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

/// Bumper radius relative to the robot body radius
const BUMPER_SCALE: f64 = 1.1;

/// Bumper density relative to the robot body
const BUMPER_DENSITY: f64 = 0.1;

/// Construction parameters for a World.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Arena width (m)
    pub width: f64,

    /// Arena height (m)
    pub height: f64,

    /// Gravity vector; zero for a top-down arena
    pub gravity: [f64; 2],

    /// Distance of the box ring's inner faces from the arena edge
    pub box_boundary_inset: f64,

    /// Distance of the robot ring's inner faces from the arena edge
    pub robot_boundary_inset: f64,

    /// Thickness of every boundary wall
    pub wall_thickness: f64,

    /// Which categories collide
    pub collisions: CollisionMatrix,

    /// Solver iterations used for every step
    pub iterations: SolverIterations,

    /// Linear damping on boxes, standing in for floor friction
    pub box_linear_damping: f64,

    /// Angular damping on boxes
    pub box_angular_damping: f64,

    /// Linear damping on robots; the motor joint already holds them, so
    /// this is zero unless a sluggish robot is wanted
    pub robot_linear_damping: f64,

    /// Angular damping on robots
    pub robot_angular_damping: f64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: 10.0,
            height: 10.0,
            gravity: [0.0, 0.0],
            box_boundary_inset: 0.0,
            robot_boundary_inset: 1.0,
            wall_thickness: 0.5,
            collisions: CollisionMatrix::default(),
            iterations: SolverIterations::default(),
            box_linear_damping: 2.0,
            box_angular_damping: 2.0,
            robot_linear_damping: 0.0,
            robot_angular_damping: 0.0,
        }
    }
}

impl WorldConfig {
    /// Arena of the given size with default settings.
    pub fn sized(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    fn validate(&self) -> Result<(), WorldError> {
        let positive = |v: f64| v > 0.0 && v.is_finite();
        if !(positive(self.width) && positive(self.height)) {
            return Err(WorldError::InvalidConfig(format!(
                "arena must have positive finite size, got {}x{}",
                self.width, self.height
            )));
        }
        if !(self.wall_thickness > 0.0) {
            return Err(WorldError::InvalidConfig(format!(
                "wall thickness must be positive, got {}",
                self.wall_thickness
            )));
        }

        let smaller = self.width.min(self.height);
        let insets = [
            ("box", self.box_boundary_inset),
            ("robot", self.robot_boundary_inset),
        ];
        for (name, inset) in insets {
            if !(inset >= 0.0 && 2.0 * inset < smaller) {
                return Err(WorldError::InvalidConfig(format!(
                    "{} ring inset {} does not fit a {}x{} arena",
                    name, inset, self.width, self.height
                )));
            }
        }
        Ok(())
    }
}

/// The simulation arena.
pub struct World<E: PhysicsEngine = RapierEngine> {
    config: WorldConfig,
    engine: E,

    box_ring: [BodyHandle; 4],
    robot_ring: [BodyHandle; 4],

    lights: Vec<Light>,
    boxes: Vec<PushBox>,
    robots: Vec<Robot>,

    steps: u64,
    elapsed: f64,

    observers: Vec<Box<dyn WorldObserver>>,
}

impl World<RapierEngine> {
    /// Creates a World backed by a fresh rapier engine.
    pub fn new(config: WorldConfig) -> Result<Self, WorldError> {
        let gravity = Vector2::new(config.gravity[0], config.gravity[1]);
        Self::with_engine(RapierEngine::new(gravity), config)
    }
}

impl<E: PhysicsEngine> World<E> {
    /// Creates a World on an existing engine and builds both boundary rings.
    pub fn with_engine(mut engine: E, config: WorldConfig) -> Result<Self, WorldError> {
        config.validate()?;

        let box_ring = build_ring(
            &mut engine,
            &config,
            config.box_boundary_inset,
            EntityCategory::BoxBoundary,
        )?;
        let robot_ring = build_ring(
            &mut engine,
            &config,
            config.robot_boundary_inset,
            EntityCategory::RobotBoundary,
        )?;

        info!(
            "Created {}x{} world (box inset {}, robot inset {})",
            config.width, config.height, config.box_boundary_inset, config.robot_boundary_inset
        );

        Ok(Self {
            config,
            engine,
            box_ring,
            robot_ring,
            lights: Vec::new(),
            boxes: Vec::new(),
            robots: Vec::new(),
            steps: 0,
            elapsed: 0.0,
            observers: Vec::new(),
        })
    }

    // ========================================================================
    // Registration
    // ========================================================================

    /// Registers an observer notified after every mutation.
    pub fn add_observer(&mut self, observer: Box<dyn WorldObserver>) {
        self.observers.push(observer);
    }

    /// Adds a robot: a locomotion body, a welded bumper and a motor joint
    /// anchored to the ground.
    pub fn add_robot(&mut self, spec: RobotSpec) -> Result<RobotId, WorldError> {
        let RobotSpec { pose, params, policy } = spec;
        let filter = self.config.collisions.filter(EntityCategory::Robot);
        let radius = params.size / 2.0;

        let body = self.engine.create_body(
            &BodyDesc::dynamic(pose)
                .with_damping(self.config.robot_linear_damping, self.config.robot_angular_damping)
                .with_sleep(false),
        );
        self.engine
            .attach_fixture(body, &FixtureDesc::new(Shape::Circle { radius }, filter))?;

        let bumper = self.engine.create_body(&BodyDesc::dynamic(pose).with_sleep(false));
        self.engine.attach_fixture(
            bumper,
            &FixtureDesc::new(
                Shape::Circle {
                    radius: radius * BUMPER_SCALE,
                },
                filter,
            )
            .with_density(BUMPER_DENSITY),
        )?;
        self.engine.create_weld_joint(body, bumper)?;

        let ground = self.engine.ground();
        let joint = self.engine.create_motor_joint(ground, body, params.motor)?;

        let id = RobotId(self.robots.len());
        let handles = RobotHandles { body, bumper, joint };
        debug!(
            "Added {} ({}) at ({:.2}, {:.2}) charge {:.1}/{:.1}",
            id,
            policy.name(),
            pose.x,
            pose.y,
            params.charge,
            params.charge_max
        );

        self.robots.push(Robot::new(id, &params, handles, policy));
        self.notify(WorldChange::RobotAdded(id));
        Ok(id)
    }

    /// Adds a pushable box.
    pub fn add_box(&mut self, spec: BoxSpec) -> Result<BoxId, WorldError> {
        let body = self.engine.create_body(
            &BodyDesc::dynamic(spec.pose)
                .with_damping(self.config.box_linear_damping, self.config.box_angular_damping),
        );
        self.engine.attach_fixture(
            body,
            &FixtureDesc::new(
                spec.shape.to_shape(spec.size),
                self.config.collisions.filter(EntityCategory::Box),
            ),
        )?;

        let id = BoxId(self.boxes.len());
        debug!(
            "Added {} {:?} size {} at ({:.2}, {:.2})",
            id, spec.shape, spec.size, spec.pose.x, spec.pose.y
        );

        self.boxes.push(PushBox::new(id, spec.shape, spec.size, body));
        self.notify(WorldChange::BoxAdded(id));
        Ok(id)
    }

    /// Adds a light.
    pub fn add_light(&mut self, light: Light) -> LightId {
        let id = LightId(self.lights.len());
        self.lights.push(light);
        self.notify(WorldChange::LightAdded(id));
        id
    }

    /// Adds `xcount * ycount` lights at the centres of an even grid over
    /// the arena, rows first.
    pub fn add_light_grid(
        &mut self,
        xcount: usize,
        ycount: usize,
        z: f64,
        intensity: f64,
    ) -> LightId {
        let first = LightId(self.lights.len());
        let (width, height) = (self.config.width, self.config.height);
        let positions = light::grid_positions(width, height, xcount, ycount);
        let count = positions.len();

        self.lights
            .extend(positions.into_iter().map(|(x, y)| Light::new(x, y, z, intensity)));

        if count > 0 {
            debug!("Added {}x{} light grid, z={} intensity={}", xcount, ycount, z, intensity);
            self.notify(WorldChange::LightGridAdded { first, count });
        }
        first
    }

    /// Overwrites the intensity of light `index`.
    ///
    /// Returns `false` and changes nothing if `index` is out of range.
    pub fn set_light_intensity(&mut self, index: usize, intensity: f64) -> bool {
        let Some(light) = self.lights.get_mut(index) else {
            trace!("set_light_intensity ignored, no light {}", index);
            return false;
        };

        light.set_intensity(intensity);
        let intensity = light.intensity();
        self.notify(WorldChange::LightIntensityChanged {
            light: LightId(index),
            intensity,
        });
        true
    }

    fn notify(&mut self, change: WorldChange) {
        for observer in self.observers.iter_mut() {
            observer.on_change(&change);
        }
    }

    // ========================================================================
    // Simulation
    // ========================================================================

    /// Advances the simulation by `timestep` seconds.
    ///
    /// The engine steps first, then every robot updates in registration
    /// order against the post-step state.
    ///
    /// # Errors
    /// Any error leaves the World in an undefined state and is fatal.
    pub fn step(&mut self, timestep: f64) -> Result<(), WorldError> {
        self.engine.step(timestep, self.config.iterations)?;
        self.steps += 1;
        self.elapsed += timestep;

        let Self {
            engine, lights, robots, ..
        } = &mut *self;

        let mut io = RobotIo::new(lights, engine);
        for robot in robots.iter_mut() {
            robot.update(&mut io, timestep)?;
        }

        trace!("World step {} t={:.3}", self.steps, self.elapsed);
        Ok(())
    }

    // ========================================================================
    // Field evaluation
    // ========================================================================

    /// Total light intensity at (x, y).
    pub fn light_intensity_at(&self, x: f64, y: f64) -> f64 {
        light::intensity_at(&self.lights, x, y)
    }

    /// Gradient of the light field at (x, y).
    pub fn light_gradient_at(&self, x: f64, y: f64) -> Vector2<f64> {
        light::gradient_at(&self.lights, x, y)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    pub fn width(&self) -> f64 {
        self.config.width
    }

    pub fn height(&self) -> f64 {
        self.config.height
    }

    /// Number of completed steps.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Simulated seconds elapsed.
    pub fn time(&self) -> f64 {
        self.elapsed
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn box_ring(&self) -> [BodyHandle; 4] {
        self.box_ring
    }

    pub fn robot_ring(&self) -> [BodyHandle; 4] {
        self.robot_ring
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    pub fn light(&self, index: usize) -> Option<&Light> {
        self.lights.get(index)
    }

    pub fn boxes(&self) -> &[PushBox] {
        &self.boxes
    }

    pub fn robots(&self) -> &[Robot] {
        &self.robots
    }

    pub fn robot(&self, id: RobotId) -> Result<&Robot, WorldError> {
        self.robots.get(id.0).ok_or(WorldError::UnknownRobot(id.0))
    }

    pub fn push_box(&self, id: BoxId) -> Result<&PushBox, WorldError> {
        self.boxes.get(id.0).ok_or(WorldError::UnknownBox(id.0))
    }

    /// Current pose of a robot's locomotion body.
    pub fn robot_pose(&self, id: RobotId) -> Result<Pose, WorldError> {
        let body = self.robot(id)?.handles().body;
        Ok(self.engine.body_pose(body)?)
    }

    pub fn box_pose(&self, id: BoxId) -> Result<Pose, WorldError> {
        let body = self.push_box(id)?.body();
        Ok(self.engine.body_pose(body)?)
    }

    /// Light intensity at a robot's current position.
    pub fn robot_light_intensity(&self, id: RobotId) -> Result<f64, WorldError> {
        let pose = self.robot_pose(id)?;
        Ok(self.light_intensity_at(pose.x, pose.y))
    }

    /// Current state of a robot's bumper.
    pub fn robot_bumper_pressed(&self, id: RobotId) -> Result<bool, WorldError> {
        let bumper = self.robot(id)?.handles().bumper;
        Ok(self.engine.body_in_contact(bumper)?)
    }
}

impl<E: PhysicsEngine> std::fmt::Debug for World<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("width", &self.config.width)
            .field("height", &self.config.height)
            .field("steps", &self.steps)
            .field("lights", &self.lights.len())
            .field("boxes", &self.boxes.len())
            .field("robots", &self.robots.len())
            .finish()
    }
}

/// Builds four static walls whose inner faces enclose
/// `[inset, width - inset] x [inset, height - inset]`.
fn build_ring<E: PhysicsEngine>(
    engine: &mut E,
    config: &WorldConfig,
    inset: f64,
    category: EntityCategory,
) -> Result<[BodyHandle; 4], WorldError> {
    let (w, h, t) = (config.width, config.height, config.wall_thickness);
    let filter = config.collisions.filter(category);

    let span_x = (w - 2.0 * inset) / 2.0 + t;
    let span_y = (h - 2.0 * inset) / 2.0 + t;

    // (centre x, centre y, half width, half height): bottom, top, left, right
    let walls = [
        (w / 2.0, inset - t / 2.0, span_x, t / 2.0),
        (w / 2.0, h - inset + t / 2.0, span_x, t / 2.0),
        (inset - t / 2.0, h / 2.0, t / 2.0, span_y),
        (w - inset + t / 2.0, h / 2.0, t / 2.0, span_y),
    ];

    let mut ring = [BodyHandle(0); 4];
    for (slot, (x, y, half_width, half_height)) in ring.iter_mut().zip(walls) {
        let body = engine.create_body(&BodyDesc::fixed(Pose::new(x, y, 0.0)));
        engine.attach_fixture(
            body,
            &FixtureDesc::new(
                Shape::Rect {
                    half_width,
                    half_height,
                },
                filter,
            ),
        )?;
        *slot = body;
    }

    debug!("Built {:?} ring at inset {}", category, inset);
    Ok(ring)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::BoxShape;
    use crate::policy::{Constant, DepletionPolicy, Phototaxis};
    use crate::robot::RobotParams;
    use approx::assert_relative_eq;
    use push_env::Velocity;
    use std::sync::{Arc, Mutex};

    const DT: f64 = 0.1;

    fn world() -> World {
        World::new(WorldConfig::default()).unwrap()
    }

    fn forward(speed: f64) -> Box<dyn crate::policy::Policy> {
        Box::new(Constant(Velocity::new(speed, 0.0, 0.0)))
    }

    fn body_velocity(w: &World, id: RobotId) -> Velocity {
        let body = w.robot(id).unwrap().handles().body;
        w.engine().body_velocity(body).unwrap()
    }

    #[test]
    fn test_constructor_builds_two_rings() {
        let w = world();
        // ground + 8 walls
        assert_eq!(w.engine().body_count(), 9);
        assert_eq!(w.steps(), 0);
        assert_ne!(w.box_ring(), w.robot_ring());
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(matches!(
            World::new(WorldConfig::sized(-1.0, 10.0)),
            Err(WorldError::InvalidConfig(_))
        ));

        let config = WorldConfig {
            robot_boundary_inset: 6.0,
            ..WorldConfig::default()
        };
        assert!(matches!(World::new(config), Err(WorldError::InvalidConfig(_))));
    }

    #[test]
    fn test_step_increments_counter_by_one() {
        let mut w = world();
        w.add_robot(RobotSpec::new(5.0, 5.0, 0.0)).unwrap();

        for expected in 1..=5 {
            w.step(DT).unwrap();
            assert_eq!(w.steps(), expected);
        }
        assert_relative_eq!(w.time(), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_timestep_still_counts() {
        let mut w = world();
        w.step(0.0).unwrap();
        assert_eq!(w.steps(), 1);
        assert_eq!(w.time(), 0.0);
    }

    #[test]
    fn test_negative_timestep_is_error() {
        let mut w = world();
        assert!(matches!(w.step(-0.1), Err(WorldError::Physics(_))));
        assert_eq!(w.steps(), 0);
    }

    #[test]
    fn test_reference_field_values() {
        let mut w = world();
        w.add_light(Light::new(5.0, 5.0, 0.0, 100.0));

        assert_relative_eq!(w.light_intensity_at(5.0, 5.0), 100.0);
        assert_relative_eq!(w.light_intensity_at(6.0, 5.0), 50.0);
    }

    #[test]
    fn test_empty_world_is_dark() {
        let w = world();
        assert_eq!(w.light_intensity_at(3.0, 7.0), 0.0);
    }

    #[test]
    fn test_light_grid_layout() {
        let mut w = world();
        let first = w.add_light_grid(2, 2, 0.0, 10.0);

        assert_eq!(first, LightId(0));
        assert_eq!(w.lights().len(), 4);

        let positions: Vec<(f64, f64)> = w.lights().iter().map(|l| (l.x(), l.y())).collect();
        assert_eq!(positions, vec![(2.5, 2.5), (7.5, 2.5), (2.5, 7.5), (7.5, 7.5)]);
        assert!(w.lights().iter().all(|l| l.z() == 0.0 && l.intensity() == 10.0));

        let expected: f64 = w.lights().iter().map(|l| l.contribution_at(5.0, 5.0)).sum();
        assert_relative_eq!(w.light_intensity_at(5.0, 5.0), expected);
        // each light is 12.5 away in d²
        assert_relative_eq!(expected, 4.0 * 10.0 / 13.5);
    }

    #[test]
    fn test_light_grid_with_height() {
        let mut w = world();
        w.add_light(Light::new(0.0, 0.0, 0.0, 1.0));
        let first = w.add_light_grid(3, 1, 2.0, 5.0);

        assert_eq!(first, LightId(1));
        assert_eq!(w.lights().len(), 4);
        assert!(w.lights()[1..].iter().all(|l| l.z() == 2.0));
    }

    #[test]
    fn test_set_light_intensity() {
        let mut w = world();
        w.add_light(Light::new(5.0, 5.0, 0.0, 100.0));

        assert!(w.set_light_intensity(0, 20.0));
        assert_eq!(w.light(0).unwrap().intensity(), 20.0);
    }

    #[test]
    fn test_set_light_intensity_out_of_range_is_noop() {
        let mut w = world();
        w.add_light_grid(2, 2, 0.0, 10.0);
        let before: Vec<f64> = w.lights().iter().map(|l| l.intensity()).collect();

        for index in [4, 5, 100, usize::MAX] {
            assert!(!w.set_light_intensity(index, 99.0));
        }

        let after: Vec<f64> = w.lights().iter().map(|l| l.intensity()).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_observers_see_mutations() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        let mut w = world();
        w.add_observer(Box::new(move |change: &WorldChange| {
            sink.lock().unwrap().push(*change);
        }));

        let light = w.add_light(Light::new(1.0, 1.0, 0.0, 1.0));
        w.set_light_intensity(0, 2.0);
        w.set_light_intensity(9, 2.0);
        let robot = w.add_robot(RobotSpec::new(5.0, 5.0, 0.0)).unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![
                WorldChange::LightAdded(light),
                WorldChange::LightIntensityChanged {
                    light,
                    intensity: 2.0
                },
                WorldChange::RobotAdded(robot),
            ]
        );
    }

    #[test]
    fn test_entity_ids_are_insertion_indices() {
        let mut w = world();
        let a = w.add_robot(RobotSpec::new(3.0, 3.0, 0.0)).unwrap();
        let b = w.add_robot(RobotSpec::new(6.0, 6.0, 0.0)).unwrap();
        let boxed = w.add_box(BoxSpec::new(BoxShape::Hex, 0.6, 5.0, 2.0, 0.0)).unwrap();

        assert_eq!((a, b), (RobotId(0), RobotId(1)));
        assert_eq!(boxed, BoxId(0));
        assert_eq!(w.robot(b).unwrap().id(), b);
        assert!(matches!(w.robot(RobotId(7)), Err(WorldError::UnknownRobot(7))));
        assert!(matches!(w.box_pose(BoxId(3)), Err(WorldError::UnknownBox(3))));
    }

    #[test]
    fn test_robot_held_inside_robot_ring() {
        let mut w = world();
        let id = w
            .add_robot(RobotSpec::new(5.0, 5.0, 0.0).with_policy(forward(1.0)))
            .unwrap();

        for _ in 0..150 {
            w.step(DT).unwrap();
        }

        let pose = w.robot_pose(id).unwrap();
        assert!(pose.x > 7.0, "robot should have driven toward the wall, x = {}", pose.x);
        assert!(pose.x < 9.0, "robot crossed the robot ring, x = {}", pose.x);
        assert!(w.robot_bumper_pressed(id).unwrap());
    }

    #[test]
    fn test_box_ignores_robot_ring() {
        let mut w = world();
        // overlaps the inner ring's left wall, clear of the outer ring
        let id = w.add_box(BoxSpec::new(BoxShape::Rect, 0.3, 0.75, 5.0, 0.0)).unwrap();

        w.step(DT).unwrap();

        let body = w.push_box(id).unwrap().body();
        assert!(!w.engine().body_in_contact(body).unwrap());
        let pose = w.box_pose(id).unwrap();
        assert_relative_eq!(pose.x, 0.75, epsilon = 1e-6);
    }

    #[test]
    fn test_robot_charges_under_light() {
        let mut w = world();
        w.add_light(Light::new(5.0, 5.0, 0.0, 100.0));
        let id = w
            .add_robot(RobotSpec::new(5.0, 5.0, 0.0).with_params(RobotParams {
                charge: 10.0,
                ..RobotParams::default()
            }))
            .unwrap();

        w.step(DT).unwrap();

        let robot = w.robot(id).unwrap();
        assert_relative_eq!(robot.last_light(), 100.0, epsilon = 1e-6);
        assert_relative_eq!(robot.charge_delta(), 0.1 * 100.0 - 0.01, epsilon = 1e-6);
        assert!(robot.charge() > 10.0);
    }

    #[test]
    fn test_depleted_robot_in_darkness_stays_frozen() {
        let mut w = world();
        let id = w
            .add_robot(
                RobotSpec::new(5.0, 5.0, 0.0)
                    .with_params(RobotParams {
                        charge: 0.0,
                        depletion: DepletionPolicy::Freeze,
                        ..RobotParams::default()
                    })
                    .with_policy(Box::new(Phototaxis::new())),
            )
            .unwrap();

        for _ in 0..20 {
            w.step(DT).unwrap();
            let robot = w.robot(id).unwrap();
            assert_eq!(robot.charge(), 0.0);
            assert_eq!(robot.commanded(), Velocity::ZERO);
        }
    }

    #[test]
    fn test_charge_bounded_over_long_run() {
        let mut w = world();
        w.add_light_grid(3, 3, 0.5, 50.0);
        for i in 0..4 {
            w.add_robot(
                RobotSpec::new(2.0 + 2.0 * i as f64, 5.0, 0.0)
                    .with_params(RobotParams {
                        charge: 20.0 * i as f64,
                        charge_max: 50.0,
                        ..RobotParams::default()
                    })
                    .with_policy(Box::new(Phototaxis::new())),
            )
            .unwrap();
        }

        for _ in 0..200 {
            w.step(DT).unwrap();
            for robot in w.robots() {
                assert!((0.0..=robot.charge_max()).contains(&robot.charge()));
            }
        }
    }

    #[test]
    fn test_identical_worlds_stay_identical() {
        fn run() -> Vec<(Pose, f64)> {
            let mut w = world();
            w.add_light(Light::new(8.0, 8.0, 1.0, 40.0));
            w.add_box(BoxSpec::new(BoxShape::Rect, 0.8, 6.0, 6.0, 0.3)).unwrap();
            for i in 0..3 {
                w.add_robot(
                    RobotSpec::new(2.0 + i as f64, 2.0, 0.0)
                        .with_params(RobotParams {
                            charge: 30.0,
                            ..RobotParams::default()
                        })
                        .with_policy(Box::new(Phototaxis::new())),
                )
                .unwrap();
            }
            for _ in 0..100 {
                w.step(DT).unwrap();
            }
            (0..3)
                .map(|i| {
                    let id = RobotId(i);
                    (w.robot_pose(id).unwrap(), w.robot(id).unwrap().charge())
                })
                .collect()
        }

        assert_eq!(run(), run());
    }

    #[test]
    fn test_motor_reaches_commanded_velocity() {
        let mut w = world();
        let mover = w.add_robot(RobotSpec::new(3.0, 3.0, 0.0).with_policy(forward(1.0))).unwrap();
        let spinner = w
            .add_robot(
                RobotSpec::new(6.0, 6.0, 0.0)
                    .with_policy(Box::new(Constant(Velocity::new(0.0, 0.0, 1.0)))),
            )
            .unwrap();

        for _ in 0..20 {
            w.step(DT).unwrap();
        }

        let v = body_velocity(&w, mover);
        assert_relative_eq!(v.vx, 1.0, epsilon = 0.03);
        assert_relative_eq!(v.vy, 0.0, epsilon = 0.03);
        // the first engine step runs before any command is issued
        let pose = w.robot_pose(mover).unwrap();
        assert!(pose.x > 4.7, "robot lagged its command, x = {}", pose.x);

        assert_relative_eq!(body_velocity(&w, spinner).va, 1.0, epsilon = 0.03);
    }

    #[test]
    fn test_set_speed_overwrites_within_a_step() {
        let mut w = world();
        let id = w.add_robot(RobotSpec::new(5.0, 5.0, 0.0)).unwrap();

        {
            let World {
                engine, lights, robots, ..
            } = &mut w;
            let mut io = RobotIo::new(lights, engine);
            let robot = &mut robots[id.0];
            robot.set_speed(&mut io, 1.0, 0.0, 0.0).unwrap();
            robot.set_speed(&mut io, 0.0, 0.5, 0.0).unwrap();
            assert_eq!(robot.commanded(), Velocity::new(0.0, 0.5, 0.0));
        }

        // advance the engine alone so no robot update replaces the target
        let iterations = w.config.iterations;
        for _ in 0..5 {
            w.engine.step(DT, iterations).unwrap();
        }

        let v = body_velocity(&w, id);
        assert_relative_eq!(v.vx, 0.0, epsilon = 0.02);
        assert_relative_eq!(v.vy, 0.5, epsilon = 0.02);
    }

    #[test]
    fn test_light_intensity_reads_without_side_effects() {
        let mut w = world();
        w.add_light(Light::new(5.0, 5.0, 0.0, 100.0));
        let id = w.add_robot(RobotSpec::new(6.0, 5.0, 0.0)).unwrap();

        let sensed = {
            let World {
                engine, lights, robots, ..
            } = &mut w;
            let io = RobotIo::new(lights, engine);
            let robot = &robots[id.0];
            let first = robot.light_intensity(&io).unwrap();
            assert_eq!(robot.light_intensity(&io).unwrap(), first);
            first
        };

        assert_relative_eq!(sensed, 50.0, epsilon = 1e-9);
        assert_relative_eq!(w.robot_light_intensity(id).unwrap(), sensed);

        let robot = w.robot(id).unwrap();
        assert_eq!(robot.charge(), 100.0);
        assert_eq!(robot.last_light(), 0.0);
        assert_eq!(robot.commanded(), Velocity::ZERO);
        assert_eq!(w.steps(), 0);
    }

    #[test]
    fn test_drifting_robot_keeps_last_target() {
        let mut w = world();
        let id = w
            .add_robot(
                RobotSpec::new(2.5, 5.0, 0.0)
                    .with_params(RobotParams {
                        charge: 0.05,
                        depletion: DepletionPolicy::Drift,
                        ..RobotParams::default()
                    })
                    .with_policy(forward(1.0)),
            )
            .unwrap();

        for _ in 0..30 {
            w.step(DT).unwrap();
        }

        let robot = w.robot(id).unwrap();
        assert!(robot.is_depleted());
        assert_eq!(robot.commanded(), Velocity::new(1.0, 0.0, 0.0));
        assert_relative_eq!(body_velocity(&w, id).vx, 1.0, epsilon = 0.03);
    }

    #[test]
    fn test_throttled_robot_scales_policy_command() {
        let mut w = world();
        let id = w
            .add_robot(
                RobotSpec::new(5.0, 5.0, 0.0)
                    .with_params(RobotParams {
                        charge: 0.0,
                        depletion: DepletionPolicy::Throttle(0.5),
                        ..RobotParams::default()
                    })
                    .with_policy(Box::new(Constant(Velocity::new(1.0, 0.0, 0.4)))),
            )
            .unwrap();

        w.step(DT).unwrap();

        let robot = w.robot(id).unwrap();
        assert!(robot.is_depleted());
        assert_eq!(robot.commanded(), Velocity::new(0.5, 0.0, 0.2));
    }
}
