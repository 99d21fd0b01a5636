//! Unit tests for configuration validation.

use stepper_planner::config::{validate_config, MachineConfig};
use stepper_planner::error::{ConfigError, Error};

use crate::common::MACHINE;

fn parse(toml_str: &str) -> MachineConfig {
    toml::from_str(toml_str).expect("Failed to parse TOML")
}

fn config_error(toml_str: &str) -> ConfigError {
    match validate_config(&parse(toml_str)) {
        Err(Error::Config(e)) => e,
        other => panic!("expected a config error, got {:?}", other),
    }
}

/// Test validation of a valid configuration.
#[test]
fn test_valid_config_passes_validation() {
    assert!(validate_config(&parse(MACHINE)).is_ok());
}

/// Test validation fails for a motor bound to an axis without limits.
#[test]
fn test_motor_on_unconfigured_axis() {
    let toml_str = r#"
[axes.x]
max_velocity_mm_per_sec = 50.0
max_acceleration_mm_per_sec2 = 500.0
max_jerk_mm_per_sec3 = 10000.0

[motors.m0]
axis = "y"
travel_per_rev_mm = 5.0
"#;

    assert!(matches!(
        config_error(toml_str),
        ConfigError::AxisNotConfigured { .. }
    ));
}

/// Test validation fails for an unknown axis name.
#[test]
fn test_unknown_axis_name() {
    let toml_str = r#"
[axes.u]
max_velocity_mm_per_sec = 50.0
max_acceleration_mm_per_sec2 = 500.0
max_jerk_mm_per_sec3 = 10000.0

[motors.m0]
axis = "u"
travel_per_rev_mm = 5.0
"#;

    assert!(matches!(config_error(toml_str), ConfigError::UnknownAxis(_)));
}

/// Test validation fails for a duplicate axis spelled in both cases.
#[test]
fn test_duplicate_axis() {
    let toml_str = r#"
[axes.x]
max_velocity_mm_per_sec = 50.0
max_acceleration_mm_per_sec2 = 500.0
max_jerk_mm_per_sec3 = 10000.0

[axes.X]
max_velocity_mm_per_sec = 50.0
max_acceleration_mm_per_sec2 = 500.0
max_jerk_mm_per_sec3 = 10000.0

[motors.m0]
axis = "x"
travel_per_rev_mm = 5.0
"#;

    assert!(matches!(config_error(toml_str), ConfigError::DuplicateAxis(_)));
}

/// Test validation fails without motors.
#[test]
fn test_no_motors() {
    let toml_str = r#"
[axes.x]
max_velocity_mm_per_sec = 50.0
max_acceleration_mm_per_sec2 = 500.0
max_jerk_mm_per_sec3 = 10000.0
"#;

    assert_eq!(config_error(toml_str), ConfigError::NoMotors);
}

/// Test validation fails for zero jerk.
#[test]
fn test_zero_jerk() {
    let toml_str = r#"
[axes.x]
max_velocity_mm_per_sec = 50.0
max_acceleration_mm_per_sec2 = 500.0
max_jerk_mm_per_sec3 = 0.0

[motors.m0]
axis = "x"
travel_per_rev_mm = 5.0
"#;

    assert_eq!(config_error(toml_str), ConfigError::InvalidMaxJerk(0.0));
}

/// Test validation fails for inverted soft limits.
#[test]
fn test_invalid_soft_limits() {
    let toml_str = r#"
[axes.x]
max_velocity_mm_per_sec = 50.0
max_acceleration_mm_per_sec2 = 500.0
max_jerk_mm_per_sec3 = 10000.0
limits = { min_mm = 100.0, max_mm = 10.0 }

[motors.m0]
axis = "x"
travel_per_rev_mm = 5.0
"#;

    assert!(matches!(
        config_error(toml_str),
        ConfigError::InvalidSoftLimits { .. }
    ));
}

/// Test validation fails when an axis would need more than one step every
/// other tick.
#[test]
fn test_step_rate_too_high() {
    let toml_str = r#"
[timing]
dda_frequency_hz = 20000

[axes.x]
max_velocity_mm_per_sec = 200.0
max_acceleration_mm_per_sec2 = 1000.0
max_jerk_mm_per_sec3 = 50000.0

[motors.m0]
axis = "x"
travel_per_rev_mm = 40.0
microsteps = 16
"#;

    // 200 mm/s at 80 steps/mm is 16 kHz against a 10 kHz ceiling
    assert!(matches!(
        config_error(toml_str),
        ConfigError::StepRateTooHigh { .. }
    ));
}

/// Test validation fails when the minimum segment exceeds the nominal one.
#[test]
fn test_invalid_segment_timing() {
    let toml_str = r#"
[timing]
nominal_segment_ms = 1.0
min_segment_ms = 2.0

[axes.x]
max_velocity_mm_per_sec = 50.0
max_acceleration_mm_per_sec2 = 500.0
max_jerk_mm_per_sec3 = 10000.0

[motors.m0]
axis = "x"
travel_per_rev_mm = 5.0
"#;

    assert!(matches!(
        config_error(toml_str),
        ConfigError::InvalidSegmentTiming { .. }
    ));
}

/// Test validation fails for a negative junction deviation.
#[test]
fn test_negative_junction_deviation() {
    let toml_str = r#"
[planner]
junction_deviation_mm = -0.1

[axes.x]
max_velocity_mm_per_sec = 50.0
max_acceleration_mm_per_sec2 = 500.0
max_jerk_mm_per_sec3 = 10000.0

[motors.m0]
axis = "x"
travel_per_rev_mm = 5.0
"#;

    assert_eq!(
        config_error(toml_str),
        ConfigError::InvalidJunctionDeviation(-0.1)
    );
}
