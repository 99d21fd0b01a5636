//! Machine configuration - root configuration structure.

use heapless::{FnvIndexMap, String};
use serde::Deserialize;

use super::axis::{AxisConfig, AxisId};
use super::motor::MotorConfig;

/// Root configuration structure from TOML.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MachineConfig {
    /// Pulse clock and segment timing.
    #[serde(default)]
    pub timing: TimingConfig,

    /// Look-ahead planner tuning.
    #[serde(default)]
    pub planner: PlannerConfig,

    /// Axis limits keyed by axis letter.
    #[serde(default)]
    pub axes: FnvIndexMap<String<32>, AxisConfig, 8>,

    /// Named motors, in output order.
    #[serde(default)]
    pub motors: FnvIndexMap<String<32>, MotorConfig, 8>,
}

/// `[timing]` table.
#[derive(Debug, Clone, Deserialize)]
pub struct TimingConfig {
    /// Pulse clock frequency in Hz.
    #[serde(default = "default_dda_frequency")]
    pub dda_frequency_hz: u32,

    /// Target segment duration in ms.
    #[serde(default = "default_nominal_segment", rename = "nominal_segment_ms")]
    pub nominal_segment: f32,

    /// Shortest profile section emitted as its own segment, in ms.
    #[serde(default = "default_min_segment", rename = "min_segment_ms")]
    pub min_segment: f32,
}

fn default_dda_frequency() -> u32 {
    100_000
}

fn default_nominal_segment() -> f32 {
    2.0
}

fn default_min_segment() -> f32 {
    1.0
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            dda_frequency_hz: default_dda_frequency(),
            nominal_segment: default_nominal_segment(),
            min_segment: default_min_segment(),
        }
    }
}

/// `[planner]` table.
#[derive(Debug, Clone, Deserialize)]
pub struct PlannerConfig {
    /// Allowed deviation from the corner point, in mm.
    #[serde(default = "default_junction_deviation", rename = "junction_deviation_mm")]
    pub junction_deviation: f32,

    /// Centripetal acceleration used at corners. Defaults to the smaller
    /// block acceleration of the two moves.
    #[serde(default, rename = "junction_acceleration_mm_per_sec2")]
    pub junction_acceleration: Option<f32>,

    /// Moves shorter than this are rejected, in mm.
    #[serde(default = "default_min_length", rename = "min_length_mm")]
    pub min_length: f32,
}

fn default_junction_deviation() -> f32 {
    0.05
}

fn default_min_length() -> f32 {
    0.001
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            junction_deviation: default_junction_deviation(),
            junction_acceleration: None,
            min_length: default_min_length(),
        }
    }
}

impl MachineConfig {
    /// Get an axis configuration by axis.
    pub fn axis(&self, axis: AxisId) -> Option<&AxisConfig> {
        self.axes
            .iter()
            .find(|(k, _)| AxisId::from_name(k.as_str()) == Some(axis))
            .map(|(_, v)| v)
    }

    /// Get a motor configuration by name.
    pub fn motor(&self, name: &str) -> Option<&MotorConfig> {
        self.motors
            .iter()
            .find(|(k, _)| k.as_str() == name)
            .map(|(_, v)| v)
    }

    /// List all motor names in output order.
    pub fn motor_names(&self) -> impl Iterator<Item = &str> {
        self.motors.keys().map(|s| s.as_str())
    }

    /// List all configured axes.
    pub fn configured_axes(&self) -> impl Iterator<Item = AxisId> + '_ {
        self.axes.keys().filter_map(|k| AxisId::from_name(k.as_str()))
    }
}
