//! Fixed-point DDA parameters for one segment.
//!
//! Each motor accumulates a per-tick increment into a signed accumulator and
//! steps whenever it turns positive. The increment itself changes by a
//! constant delta every tick, so the step rate ramps linearly from the
//! segment's start velocity to its end velocity. Step counts are exact: the
//! rounding residual of the ramp is folded into the starting accumulator.

use crate::config::MachineSettings;
use crate::log::warning;
use crate::motion::Segment;
use crate::MAX_MOTORS;

/// Fractional bits of one step in accumulator units.
const SUBSTEPS: i64 = 1 << 16;

/// Step generation parameters handed to the pulse generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StepRate {
    /// Pulse clock ticks in the segment.
    pub ticks: u32,
    /// Signed steps per motor.
    pub steps: [i32; MAX_MOTORS],
    /// Accumulator value before the first tick.
    pub accumulator: [i64; MAX_MOTORS],
    /// Increment added on the first tick.
    pub increment: [i64; MAX_MOTORS],
    /// Change of the increment per tick.
    pub delta: [i64; MAX_MOTORS],
    /// Accumulator units per step.
    pub threshold: i64,
    /// Path velocity at the segment start, bits of an `f32` in mm/s.
    velocity_bits: u32,
}

impl StepRate {
    /// Parameters that step `segment` exactly in a whole number of ticks.
    ///
    /// When a motor needs more steps than there are ticks the segment is
    /// stretched to one step per tick.
    pub fn from_segment(segment: &Segment, settings: &MachineSettings) -> Self {
        let mut ticks = settings.ticks_for(segment.duration);
        let most = segment
            .steps
            .iter()
            .map(|s| s.unsigned_abs())
            .max()
            .unwrap_or(0);
        if most > ticks {
            warning!("segment needs {} steps in {} ticks, stretched", most, ticks);
            ticks = most;
        }

        let threshold = ticks as i64 * SUBSTEPS;
        let mut rate = Self {
            ticks,
            steps: segment.steps,
            accumulator: [-threshold / 2; MAX_MOTORS],
            increment: [0; MAX_MOTORS],
            delta: [0; MAX_MOTORS],
            threshold,
            velocity_bits: segment.v_start.to_bits(),
        };

        for (motor, steps) in segment.steps.iter().enumerate() {
            let (accumulator, increment, delta) =
                motor_ramp(steps.unsigned_abs(), ticks, segment.v_start, segment.v_end);
            rate.accumulator[motor] = accumulator;
            rate.increment[motor] = increment;
            rate.delta[motor] = delta;
        }
        rate
    }

    /// Path velocity at the segment start, in mm/s.
    #[inline]
    pub fn velocity(&self) -> f32 {
        f32::from_bits(self.velocity_bits)
    }
}

/// Start accumulator, increment and delta for `steps` over `ticks`.
///
/// Falls back to a constant rate when the ramp would leave the valid
/// increment range or its residual cannot be absorbed.
fn motor_ramp(steps: u32, ticks: u32, v_start: f32, v_end: f32) -> (i64, i64, i64) {
    let threshold = ticks as i64 * SUBSTEPS;
    let average = steps as i64 * SUBSTEPS;
    let constant = (-threshold / 2, average, 0);

    let v_sum = v_start + v_end;
    if steps == 0 || ticks < 2 || v_sum <= 0.0 {
        return constant;
    }

    let first = libm::round(average as f64 * 2.0 * v_start as f64 / v_sum as f64) as i64;
    let last = 2 * average - first;
    let n = ticks as i64;
    let delta = (last - first) / (n - 1);
    let final_increment = first + delta * (n - 1);
    let total = n * first + delta * (n * (n - 1) / 2);
    let residual = steps as i64 * threshold - total;

    let in_range = |inc: i64| (0..=threshold).contains(&inc);
    if !in_range(first)
        || !in_range(final_increment)
        || residual <= -threshold / 2
        || residual > threshold / 2
    {
        return constant;
    }
    (-threshold / 2 + residual, first, delta)
}

/// Per-motor accumulator state inside the pulse generator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Dda {
    accumulator: i64,
    increment: i64,
    delta: i64,
}

impl Dda {
    pub(crate) fn load(rate: &StepRate, motor: usize) -> Self {
        Self {
            accumulator: rate.accumulator[motor],
            increment: rate.increment[motor],
            delta: rate.delta[motor],
        }
    }

    /// Advance one tick. Returns `true` when the motor steps.
    #[inline]
    pub(crate) fn tick(&mut self, threshold: i64) -> bool {
        self.accumulator += self.increment;
        self.increment += self.delta;
        if self.accumulator > 0 {
            self.accumulator -= threshold;
            true
        } else {
            false
        }
    }
}
