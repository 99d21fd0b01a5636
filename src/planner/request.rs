//! Move requests submitted by the foreground.

use crate::config::units::FeedRate;
use crate::config::{AxisId, AxisVector};
use crate::MAX_AXES;

/// What a request asks the machine to do.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MoveType {
    /// Straight line to the target at the feed rate.
    Line,
    /// Stand still.
    Dwell {
        /// Dwell time in seconds.
        seconds: f32,
    },
    /// Synchronized command, handed back through
    /// [`take_command`](super::MotionPlanner::take_command) once all earlier
    /// motion has been sliced.
    Command {
        /// Caller-chosen id.
        id: u16,
    },
}

/// One move for [`submit_move`](super::MotionPlanner::submit_move).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveRequest {
    /// Absolute target in mm. Ignored by dwells and commands.
    pub target: AxisVector,
    /// Requested path feed rate.
    pub feed_rate: FeedRate,
    /// Request type.
    pub move_type: MoveType,
}

impl MoveRequest {
    /// Line to `target` with no feed rate set.
    pub fn line(target: AxisVector) -> Self {
        Self {
            target,
            feed_rate: FeedRate::default(),
            move_type: MoveType::Line,
        }
    }

    /// Dwell for `seconds`.
    pub fn dwell(seconds: f32) -> Self {
        Self {
            target: [0.0; MAX_AXES],
            feed_rate: FeedRate::default(),
            move_type: MoveType::Dwell { seconds },
        }
    }

    /// Command barrier with an id.
    pub fn command(id: u16) -> Self {
        Self {
            target: [0.0; MAX_AXES],
            feed_rate: FeedRate::default(),
            move_type: MoveType::Command { id },
        }
    }

    /// Set the feed rate in mm/min.
    pub fn feed(mut self, mm_per_min: f32) -> Self {
        self.feed_rate = FeedRate::mm_per_min(mm_per_min);
        self
    }
}

/// Builder for line moves given axis by axis.
///
/// Axes left unset keep the start position.
#[derive(Debug, Clone)]
pub struct MoveBuilder {
    target: AxisVector,
    feed_rate: FeedRate,
}

impl MoveBuilder {
    /// Start from a position, usually [`MotionPlanner::position`](super::MotionPlanner::position).
    pub fn starting_at(position: AxisVector) -> Self {
        Self {
            target: position,
            feed_rate: FeedRate::default(),
        }
    }

    /// Set the absolute target of one axis in mm.
    pub fn to(mut self, axis: AxisId, position: f32) -> Self {
        self.target[axis.index()] = position;
        self
    }

    /// Move one axis by a distance in mm.
    pub fn by(mut self, axis: AxisId, distance: f32) -> Self {
        self.target[axis.index()] += distance;
        self
    }

    /// Set the feed rate.
    pub fn feed_rate(mut self, feed_rate: FeedRate) -> Self {
        self.feed_rate = feed_rate;
        self
    }

    /// Build the line request.
    pub fn build(self) -> MoveRequest {
        MoveRequest {
            target: self.target,
            feed_rate: self.feed_rate,
            move_type: MoveType::Line,
        }
    }
}
