//! Configuration validation.

use crate::error::{ConfigError, Error, Result};
use crate::MAX_MOTORS;

use super::axis::{AxisConfig, AxisId};
use super::motor::MotorConfig;
use super::MachineConfig;

/// Validate a machine configuration.
///
/// Checks:
/// - Axis tables name real axes, once each, with positive limits
/// - Soft limits are valid (min < max)
/// - Every motor is bound to a configured axis with positive resolution
/// - Axis max velocity fits within half the pulse clock for every motor
/// - Segment timing and planner tuning are in range
pub fn validate_config(config: &MachineConfig) -> Result<()> {
    validate_timing(config)?;

    let mut seen = [false; crate::MAX_AXES];
    for (name, axis) in config.axes.iter() {
        let id = AxisId::from_name(name.as_str())
            .ok_or_else(|| Error::Config(ConfigError::UnknownAxis(name.clone())))?;
        if seen[id.index()] {
            return Err(Error::Config(ConfigError::DuplicateAxis(id)));
        }
        seen[id.index()] = true;
        validate_axis(axis)?;
    }

    if config.motors.is_empty() {
        return Err(Error::Config(ConfigError::NoMotors));
    }
    if config.motors.len() > MAX_MOTORS {
        return Err(Error::Config(ConfigError::TooManyMotors(config.motors.len())));
    }

    for (name, motor) in config.motors.iter() {
        validate_motor(name.as_str(), motor, config)?;
    }

    Ok(())
}

fn validate_timing(config: &MachineConfig) -> Result<()> {
    let timing = &config.timing;
    if timing.dda_frequency_hz == 0 {
        return Err(Error::Config(ConfigError::InvalidFrequency(timing.dda_frequency_hz)));
    }

    // A segment must span at least one pulse tick.
    let tick_ms = 1000.0 / timing.dda_frequency_hz as f32;
    if timing.min_segment <= 0.0
        || timing.min_segment > timing.nominal_segment
        || timing.min_segment < tick_ms
    {
        return Err(Error::Config(ConfigError::InvalidSegmentTiming {
            nominal_ms: timing.nominal_segment,
            min_ms: timing.min_segment,
        }));
    }

    let planner = &config.planner;
    if planner.junction_deviation < 0.0 {
        return Err(Error::Config(ConfigError::InvalidJunctionDeviation(
            planner.junction_deviation,
        )));
    }
    if let Some(accel) = planner.junction_acceleration {
        if accel <= 0.0 {
            return Err(Error::Config(ConfigError::InvalidMaxAcceleration(accel)));
        }
    }
    if planner.min_length <= 0.0 {
        return Err(Error::Config(ConfigError::InvalidMinLength(planner.min_length)));
    }

    Ok(())
}

fn validate_axis(config: &AxisConfig) -> Result<()> {
    // Max velocity must be positive
    if config.max_velocity.0 <= 0.0 {
        return Err(Error::Config(ConfigError::InvalidMaxVelocity(
            config.max_velocity.0,
        )));
    }

    // Max acceleration must be positive
    if config.max_acceleration.0 <= 0.0 {
        return Err(Error::Config(ConfigError::InvalidMaxAcceleration(
            config.max_acceleration.0,
        )));
    }

    if config.max_jerk.0 <= 0.0 {
        return Err(Error::Config(ConfigError::InvalidMaxJerk(config.max_jerk.0)));
    }

    // Soft limits: min must be < max
    if let Some(ref limits) = config.limits {
        if !limits.is_valid() {
            return Err(Error::Config(ConfigError::InvalidSoftLimits {
                min: limits.min.0,
                max: limits.max.0,
            }));
        }
    }

    Ok(())
}

fn validate_motor(name: &str, motor: &MotorConfig, config: &MachineConfig) -> Result<()> {
    let axis = AxisId::from_name(motor.axis.as_str())
        .and_then(|id| config.axis(id))
        .ok_or_else(|| {
            Error::Config(ConfigError::AxisNotConfigured {
                motor: heapless::String::try_from(name).unwrap_or_default(),
                axis: motor.axis.clone(),
            })
        })?;

    if motor.step_angle <= 0.0 {
        return Err(Error::Config(ConfigError::InvalidStepAngle(motor.step_angle)));
    }
    if motor.travel_per_rev <= 0.0 {
        return Err(Error::Config(ConfigError::InvalidTravel(motor.travel_per_rev)));
    }

    // The pulse generator emits at most one step every other tick.
    let rate = axis.max_velocity.0 * motor.steps_per_mm();
    let max = config.timing.dda_frequency_hz as f32 / 2.0;
    if rate > max {
        return Err(Error::Config(ConfigError::StepRateTooHigh { rate, max }));
    }

    Ok(())
}
