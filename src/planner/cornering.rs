//! Corner velocity policies.

use libm::sqrtf;

use crate::config::{AxisVector, MachineSettings};

/// One side of a junction between two line blocks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Junction {
    /// Unit direction of travel.
    pub unit: AxisVector,
    /// Path acceleration limit of the block.
    pub acceleration: f32,
}

/// Limits the velocity at which the path may pass from one block to the next.
pub trait CorneringPolicy {
    /// Highest velocity through the corner from `prev` into `next`, in mm/s.
    ///
    /// May return `f32::INFINITY` when the corner imposes no limit.
    fn junction_velocity(&self, prev: &Junction, next: &Junction) -> f32;
}

/// Centripetal junction-deviation heuristic.
///
/// Treats the corner as an arc that stays within `deviation` mm of the corner
/// point and limits velocity so the centripetal acceleration on that arc does
/// not exceed the junction acceleration:
/// `v² = a·δ·sin(θ/2) / (1 − sin(θ/2))`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JunctionDeviation {
    /// Allowed deviation from the corner point in mm.
    pub deviation: f32,
    /// Centripetal acceleration; the lower block acceleration when `None`.
    pub acceleration: Option<f32>,
}

impl JunctionDeviation {
    /// Create a policy.
    pub const fn new(deviation: f32, acceleration: Option<f32>) -> Self {
        Self {
            deviation,
            acceleration,
        }
    }

    /// Policy from the `[planner]` settings.
    pub fn from_settings(settings: &MachineSettings) -> Self {
        Self::new(settings.junction_deviation, settings.junction_acceleration)
    }
}

impl CorneringPolicy for JunctionDeviation {
    fn junction_velocity(&self, prev: &Junction, next: &Junction) -> f32 {
        let dot: f32 = prev
            .unit
            .iter()
            .zip(next.unit.iter())
            .map(|(a, b)| a * b)
            .sum();

        // θ is the angle between the reversed incoming and the outgoing direction.
        let cos_theta = (-dot).clamp(-1.0, 1.0);
        let sin_half = sqrtf((1.0 - cos_theta) * 0.5);
        if sin_half >= 1.0 - 1e-6 {
            return f32::INFINITY;
        }

        let acceleration = self
            .acceleration
            .unwrap_or_else(|| prev.acceleration.min(next.acceleration));
        sqrtf(acceleration * self.deviation * sin_half / (1.0 - sin_half))
    }
}

/// Stop completely at every junction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExactStop;

impl CorneringPolicy for ExactStop {
    fn junction_velocity(&self, _prev: &Junction, _next: &Junction) -> f32 {
        0.0
    }
}
