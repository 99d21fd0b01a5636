//! Motor module for stepper-planner.
//!
//! Provides the step/direction output abstraction driven by the pulse
//! generator and absolute position tracking in steps.

mod outputs;
mod position;

pub use outputs::{Direction, PinBank, StepOutputs};
pub use position::MachinePosition;
