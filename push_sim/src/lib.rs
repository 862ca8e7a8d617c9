//! Push Simulation Harness
//!
//! This crate is the headless front end of the Push arena: it loads
//! configuration, lays out scenarios, drives Worlds through a [`Session`]
//! and exports recorded frames.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                     ScenarioRunner                       │
//! │   SimConfig ──► ScenarioId::populate(ChaCha8Rng seed)    │
//! │                        │                                 │
//! │  ┌─────────────────────▼──────────────────────────────┐  │
//! │  │ Session (pause / step / skip, light redraw flag)   │  │
//! │  │   ┌──────────────────────────────────────────────┐ │  │
//! │  │   │ World (push_core)                            │ │  │
//! │  │   │   RapierEngine ─► lights ─► robots           │ │  │
//! │  │   └──────────────────────────────────────────────┘ │  │
//! │  └─────────────────────┬──────────────────────────────┘  │
//! │                        ▼                                 │
//! │                 SimExport (JSON)                         │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use push_sim::{ScenarioRunner, scenarios::ScenarioId};
//!
//! let result = ScenarioRunner::new(42).with_steps(600).run(ScenarioId::Forage);
//! assert!(result.passed);
//! ```

mod config;
mod exporter;
mod runner;
pub mod scenarios;
mod session;

pub use config::{ConfigError, RobotConfig, RunConfig, SimConfig};
pub use exporter::{BoxFrame, LightFrame, RobotFrame, SimExport, SimFrame};
pub use runner::{ScenarioMetrics, ScenarioResult, ScenarioRunner};
pub use session::{FrameReport, Session, SessionCommand};
