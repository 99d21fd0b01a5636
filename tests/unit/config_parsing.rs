//! Unit tests for TOML configuration parsing.

use stepper_planner::config::{AxisId, LimitPolicy, MachineConfig, MachineSettings};
use stepper_planner::{parse_config, parse_settings};

use crate::common::MACHINE;

/// Test parsing axis limits and motor bindings.
#[test]
fn test_parse_machine_config() {
    let config: MachineConfig = toml::from_str(MACHINE).expect("Failed to parse TOML");

    assert_eq!(config.timing.dda_frequency_hz, 20_000);
    assert_eq!(config.timing.nominal_segment, 2.0);
    assert_eq!(config.planner.junction_deviation, 0.05);

    let x = config.axis(AxisId::X).expect("X axis not found");
    assert_eq!(x.max_velocity.0, 100.0);
    assert_eq!(x.max_acceleration.0, 1000.0);
    assert_eq!(x.max_jerk.0, 50_000.0);
    assert!(config.axis(AxisId::A).is_none());

    let m2 = config.motor("m2").expect("Motor not found");
    assert_eq!(m2.axis.as_str(), "z");
    assert_eq!(m2.microsteps.value(), 16);
    assert!((m2.steps_per_mm() - 400.0).abs() < 1e-3);
    assert!(!m2.invert_direction);
}

/// Test that omitted tables and keys take their defaults.
#[test]
fn test_parse_defaults() {
    let toml_str = r#"
[axes.x]
max_velocity_mm_per_sec = 50.0
max_acceleration_mm_per_sec2 = 500.0
max_jerk_mm_per_sec3 = 10000.0

[motors.only]
axis = "x"
travel_per_rev_mm = 5.0
"#;

    let config = parse_config(toml_str).expect("Failed to parse config");
    assert_eq!(config.timing.dda_frequency_hz, 100_000);
    assert_eq!(config.timing.min_segment, 1.0);
    assert_eq!(config.planner.min_length, 0.001);
    assert_eq!(config.planner.junction_acceleration, None);

    let motor = config.motor("only").expect("Motor not found");
    assert_eq!(motor.step_angle, 1.8);
    assert_eq!(motor.microsteps.value(), 1);
    assert!((motor.steps_per_mm() - 40.0).abs() < 1e-3);
}

/// Test parsing soft limits with both policies.
#[test]
fn test_parse_soft_limits() {
    let toml_str = r#"
[axes.x]
max_velocity_mm_per_sec = 100.0
max_acceleration_mm_per_sec2 = 1000.0
max_jerk_mm_per_sec3 = 50000.0
limits = { min_mm = 0.0, max_mm = 300.0 }

[axes.y]
max_velocity_mm_per_sec = 100.0
max_acceleration_mm_per_sec2 = 1000.0
max_jerk_mm_per_sec3 = 50000.0
limits = { min_mm = -10.0, max_mm = 200.0, policy = "clamp" }

[motors.x]
axis = "x"
travel_per_rev_mm = 40.0
microsteps = 16

[motors.y]
axis = "y"
travel_per_rev_mm = 40.0
microsteps = 16
"#;

    let config = parse_config(toml_str).expect("Failed to parse config");
    let x = config.axis(AxisId::X).and_then(|a| a.limits).unwrap();
    let y = config.axis(AxisId::Y).and_then(|a| a.limits).unwrap();

    assert_eq!(x.policy, LimitPolicy::Reject);
    assert_eq!(x.max.0, 300.0);
    assert_eq!(y.policy, LimitPolicy::Clamp);
    assert_eq!(y.apply(250.0), Some(200.0));
}

/// Test deriving runtime settings.
#[test]
fn test_settings_from_config() {
    let settings: MachineSettings = parse_settings(MACHINE).expect("Failed to derive settings");

    assert_eq!(settings.motor_count(), 3);
    assert_eq!(settings.motors[1].axis, AxisId::Y);
    assert!((settings.motors[0].steps_per_mm - 80.0).abs() < 1e-3);
    assert!((settings.nominal_segment - 0.002).abs() < 1e-7);
    assert!((settings.min_segment - 0.001).abs() < 1e-7);
    assert!(settings.axis(AxisId::Z).enabled);
    assert!(!settings.axis(AxisId::B).enabled);

    let steps = settings.motor_steps(&[1.0, -0.5, 0.25, 0.0, 0.0, 0.0]);
    assert_eq!(&steps[..3], &[80, -40, 100]);
    assert_eq!(settings.ticks_for(0.002), 40);
}

/// Test that an invalid microstep value fails at parse time.
#[test]
fn test_parse_rejects_bad_microsteps() {
    let toml_str = r#"
[axes.x]
max_velocity_mm_per_sec = 50.0
max_acceleration_mm_per_sec2 = 500.0
max_jerk_mm_per_sec3 = 10000.0

[motors.m0]
axis = "x"
travel_per_rev_mm = 5.0
microsteps = 12
"#;

    assert!(toml::from_str::<MachineConfig>(toml_str).is_err());
    assert!(parse_config(toml_str).is_err());
}
