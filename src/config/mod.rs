//! Configuration module for stepper-planner.
//!
//! Provides types for loading and validating axis limits, motor bindings and
//! planner timing from TOML files (with `std` feature) or pre-parsed data,
//! and the [`MachineSettings`] view derived from them.

mod axis;
mod limits;
mod mechanical;
mod motor;
mod system;
pub mod units;
#[cfg(feature = "std")]
mod loader;
mod validation;

pub use axis::{AxisConfig, AxisId, AxisVector};
pub use limits::{LimitPolicy, SoftLimits};
pub use mechanical::{AxisSettings, MachineSettings, MotorSettings};
pub use motor::MotorConfig;
pub use system::{MachineConfig, PlannerConfig, TimingConfig};
pub use validation::validate_config;

#[cfg(feature = "std")]
pub use loader::{load_config, parse_config, parse_settings};

#[cfg(test)]
pub(crate) use mechanical::make_test_settings;

// Re-export unit types at config level
pub use units::{FeedRate, Microsteps, Millimeters, MmPerSec, MmPerSec2, MmPerSec3, Steps};
