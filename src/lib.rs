//! # stepper-planner
//!
//! Jerk-limited look-ahead motion planning and DDA step generation for
//! multi-axis CNC machines, with embedded-hal 1.0 step/direction outputs.
//!
//! ## Features
//!
//! - **Configuration-driven**: Axis limits, motor bindings and timing in TOML
//! - **Look-ahead planning**: Corner velocities and S-curve profiles replanned on every move
//! - **Jerk-limited**: 7-phase velocity profiles, bounded jerk and acceleration
//! - **Exact step counts**: Positions rounded per segment, zero drift at block ends
//! - **Feed hold**: Controlled deceleration across block boundaries, resume and flush
//! - **no_std compatible**: Fixed-capacity queues, no allocation after construction
//!
//! ## Pipeline
//!
//! Three execution contexts, joined by the lock-free queues of a
//! [`exec::Pipeline`]:
//!
//! 1. Foreground: [`MotionPlanner::submit_move`] admits and replans moves;
//!    [`MotionPlanner::service`] slices the head block and stages segments
//! 2. Loader (low-priority interrupt): [`SegmentLoader::exec`] turns the next
//!    staged segment into DDA parameters and publishes them
//! 3. Pulse clock (high-priority interrupt): [`PulseGenerator::on_tick`] steps
//!    the motors
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use stepper_planner::{
//!     exec::Pipeline, MachineSettings, MotionPlanner, MoveRequest, PulseGenerator, RtShared,
//!     SegmentLoader,
//! };
//!
//! static RT: RtShared = RtShared::new();
//!
//! let settings = MachineSettings::from_config(&stepper_planner::load_config("machine.toml")?)?;
//! let mut pipeline = Pipeline::new();
//! let ports = pipeline.split();
//!
//! let mut loader = SegmentLoader::new(ports.loader_in, ports.loader_out, &RT, &settings);
//! let mut pulse = PulseGenerator::new(ports.pulse, &RT, outputs, &settings)?;
//! let mut planner = MotionPlanner::new(settings, &RT, ports.planner);
//!
//! planner.submit_move(&MoveRequest::line([10.0, 5.0, 0.0, 0.0, 0.0, 0.0]).feed(3000.0))?;
//! loop {
//!     planner.service()?;
//! }
//! ```
//!
//! ## Feature Flags
//!
//! - `std` (default): Enables file I/O and TOML parsing
//! - `defmt`: Enables defmt logging for embedded targets

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]
// Allow large error types - necessary for no_std with heapless strings
#![allow(clippy::result_large_err)]

mod log;

// Core modules
pub mod config;
pub mod error;
pub mod exec;
pub mod motion;
pub mod motor;
pub mod planner;

/// Number of machine axes (X, Y, Z, A, B, C).
pub const MAX_AXES: usize = 6;

/// Maximum number of motor outputs.
pub const MAX_MOTORS: usize = 6;

/// Number of move blocks held by the look-ahead queue.
pub const PLANNER_QUEUE_SIZE: usize = 48;

/// Ring size of the segment buffer between the planner and the loader.
pub const SEGMENT_BUFFER_SIZE: usize = 8;

// Re-exports for ergonomic API
pub use config::{
    validate_config, AxisId, AxisVector, LimitPolicy, MachineConfig, MachineSettings, SoftLimits,
};
pub use error::{AdmissionError, Error, Fault, Result, Status};
pub use exec::{ExecState, LoaderStatus, PulseGenerator, RtShared, SegmentLoader, TickEvent};
pub use motion::{Kinematics, Profile, Ramp, StopProfile};
pub use motor::{Direction, MachinePosition, PinBank, StepOutputs};
pub use planner::{
    Admission, CorneringPolicy, ExactStop, JunctionDeviation, MotionPlanner, MoveBuilder,
    MoveRequest, MoveType, StatusReport,
};

// Configuration loading (std only)
#[cfg(feature = "std")]
pub use config::{load_config, parse_config, parse_settings};

// Unit types
pub use config::units::{FeedRate, Microsteps, Millimeters, MmPerSec, Steps};
