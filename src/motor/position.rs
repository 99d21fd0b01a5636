//! Machine position tracking.
//!
//! Holds absolute motor positions in steps and converts them back to axis
//! coordinates.

use crate::config::units::Steps;
use crate::config::{AxisVector, MachineSettings};
use crate::MAX_MOTORS;

/// Absolute step position of every motor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MachinePosition {
    steps: [Steps; MAX_MOTORS],
}

impl MachinePosition {
    /// All motors at the origin.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a position from raw step counts.
    pub fn at(steps: &[i64; MAX_MOTORS]) -> Self {
        let mut position = Self::new();
        for (slot, value) in position.steps.iter_mut().zip(steps.iter()) {
            *slot = Steps(*value);
        }
        position
    }

    /// Position of one motor in steps.
    #[inline]
    pub fn steps(&self, motor: usize) -> Steps {
        self.steps.get(motor).copied().unwrap_or_default()
    }

    /// Raw step counts.
    pub fn raw(&self) -> [i64; MAX_MOTORS] {
        let mut raw = [0; MAX_MOTORS];
        for (slot, steps) in raw.iter_mut().zip(self.steps.iter()) {
            *slot = steps.value();
        }
        raw
    }

    /// Move one motor by a number of steps.
    #[inline]
    pub fn move_steps(&mut self, motor: usize, delta: i64) {
        if let Some(steps) = self.steps.get_mut(motor) {
            *steps = Steps(steps.0 + delta);
        }
    }

    /// Set every motor to the origin.
    #[inline]
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Axis coordinates in mm.
    ///
    /// Axes without a motor keep their value from `fallback`. When several
    /// motors follow one axis the first one wins.
    pub fn to_axes(&self, settings: &MachineSettings, fallback: &AxisVector) -> AxisVector {
        let mut axes = *fallback;
        let mut seen = [false; crate::MAX_AXES];
        for (steps, motor) in self.steps.iter().zip(settings.motors.iter()) {
            let axis = motor.axis.index();
            if !seen[axis] {
                axes[axis] = motor.position_of(steps.value());
                seen[axis] = true;
            }
        }
        axes
    }

    /// Steps one motor needs to reach an axis coordinate.
    pub fn steps_to(&self, settings: &MachineSettings, motor: usize, target: &AxisVector) -> i64 {
        settings
            .motors
            .get(motor)
            .map_or(0, |m| m.steps_at(target) - self.steps(motor).value())
    }
}
