//! Runtime machine settings derived from configuration.

use heapless::Vec;

use super::axis::{AxisId, AxisVector};
use super::limits::SoftLimits;
use super::system::MachineConfig;
use super::units::{Millimeters, Steps};
use crate::error::{ConfigError, Result};
use crate::{MAX_AXES, MAX_MOTORS};

/// Derived limits for one axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisSettings {
    /// Axis has a `[axes.*]` table.
    pub enabled: bool,
    /// Maximum velocity in mm/s.
    pub max_velocity: f32,
    /// Maximum acceleration in mm/s².
    pub max_acceleration: f32,
    /// Maximum jerk in mm/s³.
    pub max_jerk: f32,
    /// Soft limits, if configured.
    pub limits: Option<SoftLimits>,
}

impl AxisSettings {
    /// Settings for an axis without configuration.
    pub const DISABLED: Self = Self {
        enabled: false,
        max_velocity: 0.0,
        max_acceleration: 0.0,
        max_jerk: 0.0,
        limits: None,
    };
}

/// Derived parameters for one motor output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotorSettings {
    /// Axis the motor follows.
    pub axis: AxisId,
    /// Microsteps per mm of axis travel.
    pub steps_per_mm: f32,
    /// Invert direction pin logic.
    pub invert_direction: bool,
}

impl MotorSettings {
    /// Nearest motor step for an axis position.
    #[inline]
    pub fn steps_at(&self, position: &AxisVector) -> i64 {
        Steps::from_mm(Millimeters(position[self.axis.index()]), self.steps_per_mm).value()
    }

    /// Axis position of a motor step count.
    #[inline]
    pub fn position_of(&self, steps: i64) -> f32 {
        Steps(steps).to_mm(self.steps_per_mm).value()
    }
}

/// Read-only machine parameters used by the planner and step generator.
///
/// Computed once from a validated [`MachineConfig`].
#[derive(Debug, Clone)]
pub struct MachineSettings {
    /// Per-axis limits, indexed by [`AxisId::index`].
    pub axes: [AxisSettings; MAX_AXES],
    /// Motor outputs in configuration order.
    pub motors: Vec<MotorSettings, MAX_MOTORS>,
    /// Pulse clock frequency in Hz.
    pub dda_frequency_hz: u32,
    /// Target segment duration in seconds.
    pub nominal_segment: f32,
    /// Shortest section emitted on its own, in seconds.
    pub min_segment: f32,
    /// Cornering deviation in mm.
    pub junction_deviation: f32,
    /// Centripetal acceleration override for corners.
    pub junction_acceleration: Option<f32>,
    /// Shortest accepted move in mm.
    pub min_length: f32,
}

impl MachineSettings {
    /// Derive settings from a configuration.
    ///
    /// Runs [`validate_config`](super::validate_config) first.
    pub fn from_config(config: &MachineConfig) -> Result<Self> {
        super::validation::validate_config(config)?;

        let mut axes = [AxisSettings::DISABLED; MAX_AXES];
        for (name, axis) in config.axes.iter() {
            let id = AxisId::from_name(name.as_str())
                .ok_or_else(|| ConfigError::UnknownAxis(name.clone()))?;
            axes[id.index()] = AxisSettings {
                enabled: true,
                max_velocity: axis.max_velocity.value(),
                max_acceleration: axis.max_acceleration.value(),
                max_jerk: axis.max_jerk.value(),
                limits: axis.limits,
            };
        }

        let mut motors = Vec::new();
        for (_, motor) in config.motors.iter() {
            let axis = AxisId::from_name(motor.axis.as_str())
                .ok_or_else(|| ConfigError::UnknownAxis(motor.axis.clone()))?;
            motors
                .push(MotorSettings {
                    axis,
                    steps_per_mm: motor.steps_per_mm(),
                    invert_direction: motor.invert_direction,
                })
                .map_err(|_| ConfigError::TooManyMotors(config.motors.len()))?;
        }

        Ok(Self {
            axes,
            motors,
            dda_frequency_hz: config.timing.dda_frequency_hz,
            nominal_segment: config.timing.nominal_segment / 1000.0,
            min_segment: config.timing.min_segment / 1000.0,
            junction_deviation: config.planner.junction_deviation,
            junction_acceleration: config.planner.junction_acceleration,
            min_length: config.planner.min_length,
        })
    }

    /// Settings for an axis.
    #[inline]
    pub fn axis(&self, axis: AxisId) -> &AxisSettings {
        &self.axes[axis.index()]
    }

    /// Number of motor outputs.
    #[inline]
    pub fn motor_count(&self) -> usize {
        self.motors.len()
    }

    /// Motor step targets for an axis position.
    pub fn motor_steps(&self, position: &AxisVector) -> [i64; MAX_MOTORS] {
        let mut steps = [0; MAX_MOTORS];
        for (slot, motor) in steps.iter_mut().zip(self.motors.iter()) {
            *slot = motor.steps_at(position);
        }
        steps
    }

    /// Pulse clock ticks for a duration in seconds, at least one.
    #[inline]
    pub fn ticks_for(&self, seconds: f32) -> u32 {
        let ticks = libm::roundf(seconds * self.dda_frequency_hz as f32);
        if ticks < 1.0 {
            1
        } else {
            ticks as u32
        }
    }
}

#[cfg(test)]
pub(crate) fn make_test_config() -> MachineConfig {
    use heapless::String;

    use super::axis::AxisConfig;
    use super::motor::MotorConfig;
    use super::system::{PlannerConfig, TimingConfig};
    use super::units::{Microsteps, MmPerSec, MmPerSec2, MmPerSec3};

    let mut config = MachineConfig {
        timing: TimingConfig {
            dda_frequency_hz: 20_000,
            nominal_segment: 2.0,
            min_segment: 1.0,
        },
        planner: PlannerConfig::default(),
        ..MachineConfig::default()
    };

    for (name, velocity, accel, jerk) in [
        ("x", 100.0, 1000.0, 50_000.0),
        ("y", 100.0, 1000.0, 50_000.0),
        ("z", 20.0, 200.0, 10_000.0),
    ] {
        let _ = config.axes.insert(
            String::try_from(name).unwrap(),
            AxisConfig {
                max_velocity: MmPerSec(velocity),
                max_acceleration: MmPerSec2(accel),
                max_jerk: MmPerSec3(jerk),
                limits: None,
            },
        );
    }

    for (name, axis, travel) in [("m0", "x", 40.0), ("m1", "y", 40.0), ("m2", "z", 8.0)] {
        let _ = config.motors.insert(
            String::try_from(name).unwrap(),
            MotorConfig {
                axis: String::try_from(axis).unwrap(),
                step_angle: 1.8,
                travel_per_rev: travel,
                microsteps: Microsteps::SIXTEENTH,
                invert_direction: false,
            },
        );
    }

    config
}

#[cfg(test)]
pub(crate) fn make_test_settings() -> MachineSettings {
    MachineSettings::from_config(&make_test_config()).unwrap()
}
