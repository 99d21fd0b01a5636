//! Motor configuration from TOML.

use heapless::String;
use serde::Deserialize;

use super::units::Microsteps;

/// Motor binding and resolution from TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct MotorConfig {
    /// Axis this motor drives (`x`, `y`, `z`, `a`, `b` or `c`).
    pub axis: String<32>,

    /// Full-step angle in degrees (1.8 for 200 step motors).
    #[serde(default = "default_step_angle", rename = "step_angle_deg")]
    pub step_angle: f32,

    /// Axis travel per motor revolution in mm.
    #[serde(rename = "travel_per_rev_mm")]
    pub travel_per_rev: f32,

    /// Microstep setting (1, 2, 4, 8, 16, 32, etc.).
    #[serde(default)]
    pub microsteps: Microsteps,

    /// Invert direction pin logic.
    #[serde(default)]
    pub invert_direction: bool,
}

fn default_step_angle() -> f32 {
    1.8
}

impl MotorConfig {
    /// Microsteps per motor revolution.
    pub fn steps_per_revolution(&self) -> f32 {
        360.0 / self.step_angle * self.microsteps.value() as f32
    }

    /// Microsteps per mm of axis travel.
    pub fn steps_per_mm(&self) -> f32 {
        self.steps_per_revolution() / self.travel_per_rev
    }
}
