//! Move blocks held by the look-ahead queue.

use crate::config::AxisVector;
use crate::motion::Kinematics;
use crate::MAX_AXES;

/// What a block does when it reaches the head of the queue.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BlockKind {
    /// Straight line from `start` to `target`.
    Line,
    /// Stand still for a number of seconds.
    Dwell {
        /// Remaining dwell time in seconds.
        seconds: f32,
    },
    /// Synchronized command, reported back once all earlier motion is sliced.
    Command {
        /// Caller-chosen command id.
        id: u16,
    },
}

/// A planned move.
///
/// Geometry and limits are fixed at admission. The planned velocities are
/// rewritten by every replan until the segment generator starts the block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveBlock {
    /// Block type.
    pub kind: BlockKind,
    /// Start position in mm.
    pub start: AxisVector,
    /// End position in mm.
    pub target: AxisVector,
    /// Direction of travel, unit length for lines.
    pub unit: AxisVector,
    /// Path length in mm.
    pub length: f32,
    /// Path acceleration and jerk limits.
    pub kinematics: Kinematics,
    /// Highest cruise velocity from feed rate and axis limits.
    pub cruise_vmax: f32,
    /// Highest entry velocity allowed by the corner with the previous block.
    pub entry_vmax: f32,
    /// Highest entry velocity that can still slow down for everything after.
    pub braking_velocity: f32,
    /// Planned entry velocity.
    pub entry_velocity: f32,
    /// Planned peak velocity.
    pub cruise_velocity: f32,
    /// Planned exit velocity.
    pub exit_velocity: f32,
    /// Upper bound on the exit imposed by the segment generator.
    pub exit_cap: f32,
    /// The segment generator has started slicing this block.
    pub running: bool,
    /// The segment generator has entered the tail; the exit is final.
    pub exit_committed: bool,
}

impl MoveBlock {
    /// Unused queue slot.
    pub const EMPTY: Self = Self {
        kind: BlockKind::Line,
        start: [0.0; MAX_AXES],
        target: [0.0; MAX_AXES],
        unit: [0.0; MAX_AXES],
        length: 0.0,
        kinematics: Kinematics::new(0.0, 0.0),
        cruise_vmax: 0.0,
        entry_vmax: 0.0,
        braking_velocity: 0.0,
        entry_velocity: 0.0,
        cruise_velocity: 0.0,
        exit_velocity: 0.0,
        exit_cap: f32::INFINITY,
        running: false,
        exit_committed: false,
    };

    /// Line block with admission limits.
    pub(crate) fn line(
        start: AxisVector,
        target: AxisVector,
        length: f32,
        kinematics: Kinematics,
        cruise_vmax: f32,
        entry_vmax: f32,
    ) -> Self {
        let mut unit = [0.0; MAX_AXES];
        for (u, (t, s)) in unit.iter_mut().zip(target.iter().zip(start.iter())) {
            *u = (t - s) / length;
        }
        Self {
            start,
            target,
            unit,
            length,
            kinematics,
            cruise_vmax,
            entry_vmax,
            ..Self::EMPTY
        }
    }

    /// Dwell block at `position`.
    pub(crate) fn dwell(position: AxisVector, seconds: f32) -> Self {
        Self {
            kind: BlockKind::Dwell { seconds },
            start: position,
            target: position,
            ..Self::EMPTY
        }
    }

    /// Command block at `position`.
    pub(crate) fn command(position: AxisVector, id: u16) -> Self {
        Self {
            kind: BlockKind::Command { id },
            start: position,
            target: position,
            ..Self::EMPTY
        }
    }

    /// Whether the block forces zero velocity on both sides.
    #[inline]
    pub fn is_barrier(&self) -> bool {
        !matches!(self.kind, BlockKind::Line)
    }

    /// Point `distance` mm along the block.
    pub fn position_at(&self, distance: f32) -> AxisVector {
        let mut position = self.start;
        for (p, u) in position.iter_mut().zip(self.unit.iter()) {
            *p += u * distance;
        }
        position
    }

    /// Restart the block from rest at `distance` mm along its path.
    pub(crate) fn truncate(&mut self, distance: f32) {
        self.start = self.position_at(distance);
        self.length = (self.length - distance).max(0.0);
        self.entry_velocity = 0.0;
        self.cruise_velocity = 0.0;
        self.exit_velocity = 0.0;
        self.exit_cap = f32::INFINITY;
        self.running = false;
        self.exit_committed = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_unit_vector() {
        let block = MoveBlock::line(
            [0.0; MAX_AXES],
            [3.0, 4.0, 0.0, 0.0, 0.0, 0.0],
            5.0,
            Kinematics::new(1000.0, 50_000.0),
            100.0,
            0.0,
        );

        assert!((block.unit[0] - 0.6).abs() < 1e-6);
        assert!((block.unit[1] - 0.8).abs() < 1e-6);
        assert!(!block.is_barrier());

        let mid = block.position_at(2.5);
        assert!((mid[0] - 1.5).abs() < 1e-6);
        assert!((mid[1] - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_truncate_keeps_target() {
        let mut block = MoveBlock::line(
            [0.0; MAX_AXES],
            [10.0, 0.0, 0.0, 0.0, 0.0, 0.0],
            10.0,
            Kinematics::new(1000.0, 50_000.0),
            100.0,
            0.0,
        );
        block.running = true;
        block.exit_cap = 20.0;

        block.truncate(4.0);

        assert!((block.start[0] - 4.0).abs() < 1e-6);
        assert!((block.length - 6.0).abs() < 1e-6);
        assert_eq!(block.target[0], 10.0);
        assert!(!block.running);
        assert_eq!(block.exit_cap, f32::INFINITY);
    }

    #[test]
    fn test_barriers() {
        assert!(MoveBlock::dwell([0.0; MAX_AXES], 1.0).is_barrier());
        assert!(MoveBlock::command([0.0; MAX_AXES], 7).is_barrier());
    }
}
