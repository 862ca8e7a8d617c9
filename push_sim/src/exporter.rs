//! JSON frame exporter for offline inspection.
//!
//! Exports robot, box and light state per recorded frame. Lights are only
//! written on frames where the light field changed.

use push_core::{World, WorldError};
use push_env::PhysicsEngine;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// A single frame of simulation data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimFrame {
    /// World step counter
    pub step: u64,

    /// Simulation time in seconds
    pub time_sec: f64,

    pub robots: Vec<RobotFrame>,

    pub boxes: Vec<BoxFrame>,

    /// Present only when the light field changed since the previous frame
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lights: Option<Vec<LightFrame>>,
}

/// Robot state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RobotFrame {
    pub id: usize,
    pub x: f64,
    pub y: f64,
    pub angle: f64,
    pub charge: f64,
    pub charge_delta: f64,
    pub bumper: bool,
}

/// Box state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxFrame {
    pub id: usize,
    pub x: f64,
    pub y: f64,
    pub angle: f64,
}

/// Light state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightFrame {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub intensity: f64,
}

impl SimFrame {
    /// Captures the current state of `world`.
    ///
    /// Fails if the engine cannot report a pose.
    pub fn capture<E: PhysicsEngine>(
        world: &World<E>,
        include_lights: bool,
    ) -> Result<Self, WorldError> {
        let robots = world
            .robots()
            .iter()
            .map(|robot| {
                let pose = world.robot_pose(robot.id())?;
                Ok(RobotFrame {
                    id: robot.id().0,
                    x: pose.x,
                    y: pose.y,
                    angle: pose.angle,
                    charge: robot.charge(),
                    charge_delta: robot.charge_delta(),
                    bumper: robot.last_bumper(),
                })
            })
            .collect::<Result<_, WorldError>>()?;

        let boxes = world
            .boxes()
            .iter()
            .map(|b| {
                let pose = world.box_pose(b.id())?;
                Ok(BoxFrame {
                    id: b.id().0,
                    x: pose.x,
                    y: pose.y,
                    angle: pose.angle,
                })
            })
            .collect::<Result<_, WorldError>>()?;

        let lights = include_lights.then(|| {
            world
                .lights()
                .iter()
                .map(|l| LightFrame {
                    x: l.x(),
                    y: l.y(),
                    z: l.z(),
                    intensity: l.intensity(),
                })
                .collect()
        });

        Ok(Self {
            step: world.steps(),
            time_sec: world.time(),
            robots,
            boxes,
            lights,
        })
    }
}

/// Complete simulation export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimExport {
    /// Scenario name
    pub scenario: String,

    /// Seed used
    pub seed: u64,

    /// Timestep in seconds
    pub dt: f64,

    /// Duration in seconds
    pub duration_sec: f64,

    /// All frames
    pub frames: Vec<SimFrame>,

    /// Final results
    pub passed: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

impl SimExport {
    /// Creates a new export container.
    pub fn new(scenario: &str, seed: u64, dt: f64) -> Self {
        Self {
            scenario: scenario.to_string(),
            seed,
            dt,
            duration_sec: 0.0,
            frames: Vec::new(),
            passed: false,
            failure_reason: None,
        }
    }

    /// Adds a frame.
    pub fn add_frame(&mut self, frame: SimFrame) {
        self.duration_sec = frame.time_sec;
        self.frames.push(frame);
    }

    /// Finalizes the export.
    pub fn finalize(&mut self, passed: bool, failure_reason: Option<String>) {
        self.passed = passed;
        self.failure_reason = failure_reason;
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}
