//! Motion module for stepper-planner.
//!
//! Provides jerk-limited velocity ramps, seven-phase move profiles and the
//! segment generator that slices planned blocks for the step loader.

mod profile;
mod ramp;
mod segment;

pub use profile::{Profile, Section, StopProfile};
pub use ramp::{Kinematics, Ramp};
pub use segment::{GeneratorEvent, Segment, SegmentGenerator};
