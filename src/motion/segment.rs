//! Segment generation.
//!
//! Slices the head block of the move queue into short segments for the step
//! loader. Each segment carries a duration, its start
//! and end velocity and a signed step count per motor. Step counts are taken
//! from absolute positions rounded to whole steps, so no rounding error
//! accumulates from one segment or block to the next.

use crate::config::{AxisVector, MachineSettings};
use crate::log::debug;
use crate::planner::block::BlockKind;
use crate::planner::queue::MoveQueue;
use crate::MAX_MOTORS;

use super::profile::{Profile, Section, StopProfile};
use super::ramp::{fits, SOLVER_ITERATIONS};

/// Distance from a block end, in mm, at which a brake counts as reaching it.
const BLOCK_END_EPSILON: f32 = 1e-4;

/// One slice of motion.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Segment {
    /// Duration in seconds.
    pub duration: f32,
    /// Path velocity at the start, in mm/s.
    pub v_start: f32,
    /// Path velocity at the end, in mm/s.
    pub v_end: f32,
    /// Signed steps per motor.
    pub steps: [i32; MAX_MOTORS],
    /// Last segment of its block.
    pub block_end: bool,
}

/// Output of [`SegmentGenerator::next_event`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GeneratorEvent {
    /// Next slice of motion.
    Segment(Segment),
    /// A command block reached the head; all earlier motion is sliced.
    Command(u16),
    /// A feed hold has brought the path to rest.
    HoldComplete,
    /// Nothing to slice.
    QueueEmpty,
}

/// Equal-length slicing of one profile section.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Span {
    start: f32,
    end: f32,
    count: u32,
}

/// Slicing state for the head line block.
#[derive(Debug, Clone, PartialEq)]
struct LineCursor {
    profile: Profile,
    /// Block distance at which `profile` starts.
    offset: f32,
    /// Time into `profile`.
    time: f32,
    spans: heapless::Vec<Span, 3>,
    span: usize,
    index: u32,
    adopted_exit: f32,
}

impl LineCursor {
    fn new(profile: Profile, offset: f32, settings: &MachineSettings) -> Self {
        Self {
            spans: build_spans(&profile, settings),
            adopted_exit: profile.exit,
            profile,
            offset,
            time: 0.0,
            span: 0,
            index: 0,
        }
    }

    /// Distance along the block reached so far.
    fn distance(&self) -> f32 {
        self.offset + self.profile.position_at(self.time)
    }

    /// End time of the next segment and whether it ends the profile.
    fn advance(&mut self) -> (f32, bool) {
        let Some(span) = self.spans.get(self.span).copied() else {
            return (self.profile.duration(), true);
        };

        let next = self.index + 1;
        if next >= span.count {
            self.span += 1;
            self.index = 0;
            (span.end, self.span >= self.spans.len())
        } else {
            self.index = next;
            let t = span.start + (span.end - span.start) * next as f32 / span.count as f32;
            (t, false)
        }
    }
}

/// Split a profile into spans of roughly nominal segment length.
///
/// Sections shorter than the minimum segment time merge into the following
/// section, or the preceding one if they are last.
fn build_spans(profile: &Profile, settings: &MachineSettings) -> heapless::Vec<Span, 3> {
    let mut bounds = [0.0_f32; 4];
    let mut n = 1;
    for duration in [profile.head_time(), profile.body_time(), profile.tail_time()] {
        if duration > 0.0 {
            bounds[n] = bounds[n - 1] + duration;
            n += 1;
        }
    }

    while n > 2 {
        let sections = n - 1;
        let Some(short) = (0..sections).find(|&i| bounds[i + 1] - bounds[i] < settings.min_segment)
        else {
            break;
        };
        let drop = if short + 1 < sections { short + 1 } else { short };
        bounds.copy_within(drop + 1..n, drop);
        n -= 1;
    }

    let mut spans = heapless::Vec::new();
    if n < 2 {
        let _ = spans.push(Span {
            start: 0.0,
            end: profile.duration(),
            count: 1,
        });
        return spans;
    }

    for pair in bounds[..n].windows(2) {
        let count = libm::roundf((pair[1] - pair[0]) / settings.nominal_segment).max(1.0) as u32;
        let _ = spans.push(Span {
            start: pair[0],
            end: pair[1],
            count,
        });
    }
    spans
}

/// Time in `[lo, hi]` at which `stop` reaches `distance`.
fn time_at(stop: &StopProfile, distance: f32, mut lo: f32, mut hi: f32) -> f32 {
    for _ in 0..SOLVER_ITERATIONS {
        let mid = 0.5 * (lo + hi);
        if stop.position_at(mid) < distance {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    hi
}

#[derive(Debug, Clone, PartialEq)]
enum Cursor {
    Line(LineCursor),
    Dwell { remaining: f32 },
}

/// Controlled stop that may run across several line blocks.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Brake {
    profile: StopProfile,
    time: f32,
    /// Brake distance at which the current head block starts.
    origin: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Hold {
    Off,
    /// Waiting for a point where braking can start.
    Deferred,
    Braking(Brake),
    /// At rest, `HoldComplete` not reported yet.
    Completing,
    Held,
}

/// Turns queued blocks into segments.
///
/// Owned by the [`MotionPlanner`](crate::MotionPlanner) and driven by the
/// segment loader.
#[derive(Debug, Clone)]
pub struct SegmentGenerator {
    cursor: Option<Cursor>,
    hold: Hold,
    velocity: f32,
    commanded: [i64; MAX_MOTORS],
    replan_pending: bool,
}

impl Default for SegmentGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl SegmentGenerator {
    /// Create an idle generator at step position zero.
    pub const fn new() -> Self {
        Self {
            cursor: None,
            hold: Hold::Off,
            velocity: 0.0,
            commanded: [0; MAX_MOTORS],
            replan_pending: false,
        }
    }

    /// Path velocity at the end of the last emitted segment.
    #[inline]
    pub fn velocity(&self) -> f32 {
        self.velocity
    }

    /// Motor step positions at the end of the last emitted segment.
    #[inline]
    pub fn commanded(&self) -> &[i64; MAX_MOTORS] {
        &self.commanded
    }

    /// Whether a feed hold is in progress or complete.
    #[inline]
    pub fn is_holding(&self) -> bool {
        !matches!(self.hold, Hold::Off)
    }

    /// Whether a feed hold has brought the path to rest and been reported.
    #[inline]
    pub fn is_held(&self) -> bool {
        matches!(self.hold, Hold::Held)
    }

    /// Whether the next event reports a command.
    pub fn command_next<const N: usize>(&self, queue: &MoveQueue<N>) -> bool {
        self.cursor.is_none()
            && matches!(self.hold, Hold::Off)
            && queue
                .peek_head()
                .is_some_and(|block| matches!(block.kind, BlockKind::Command { .. }))
    }

    /// Whether the queue changed in a way that needs a replan. Clears the flag.
    #[inline]
    pub fn take_replan(&mut self) -> bool {
        core::mem::take(&mut self.replan_pending)
    }

    /// Drop all slicing state and restart from rest at `positions`.
    pub fn reset(&mut self, positions: [i64; MAX_MOTORS]) {
        *self = Self {
            commanded: positions,
            ..Self::new()
        };
    }

    /// Leave a completed feed hold. Returns `false` if not held.
    pub fn release_hold(&mut self) -> bool {
        if self.is_held() {
            self.hold = Hold::Off;
            true
        } else {
            false
        }
    }

    /// Start a feed hold.
    ///
    /// Brakes immediately when the remaining queue up to the next barrier is
    /// long enough, starting from the live acceleration. A block in its tail
    /// finishes first and braking starts at the next block.
    pub fn begin_hold<const N: usize>(&mut self, queue: &mut MoveQueue<N>) {
        if self.is_holding() {
            return;
        }

        match self.cursor.take() {
            None => {
                self.hold = if self.velocity <= 0.0 {
                    Hold::Completing
                } else {
                    Hold::Deferred
                };
            }
            Some(Cursor::Dwell { remaining }) => {
                if let Some(head) = queue.peek_head_mut() {
                    head.kind = BlockKind::Dwell { seconds: remaining };
                }
                self.hold = Hold::Completing;
            }
            Some(Cursor::Line(cursor)) => {
                let in_tail = cursor.profile.section_at(cursor.time) == Section::Tail;
                let distance = cursor.distance();
                let acceleration = cursor.profile.acceleration_at(cursor.time);
                self.cursor = Some(Cursor::Line(cursor));
                if in_tail || !self.try_brake(queue, distance, acceleration) {
                    self.hold = Hold::Deferred;
                }
            }
        }
        debug!("feed hold at {} mm/s", self.velocity);
    }

    /// Produce the next event.
    ///
    /// Called by the segment loader whenever the handoff slot is free.
    pub fn next_event<const N: usize>(
        &mut self,
        queue: &mut MoveQueue<N>,
        settings: &MachineSettings,
    ) -> GeneratorEvent {
        if matches!(self.hold, Hold::Braking(_)) {
            return self.brake_segment(queue, settings);
        }
        match self.cursor {
            Some(Cursor::Line(_)) => self.line_segment(queue, settings),
            Some(Cursor::Dwell { .. }) => self.dwell_segment(queue, settings),
            None => self.start_block(queue, settings),
        }
    }

    fn start_block<const N: usize>(
        &mut self,
        queue: &mut MoveQueue<N>,
        settings: &MachineSettings,
    ) -> GeneratorEvent {
        match self.hold {
            Hold::Completing => return self.complete_hold(),
            Hold::Held => return GeneratorEvent::QueueEmpty,
            _ => {}
        }

        let Some(block) = queue.peek_head().copied() else {
            if matches!(self.hold, Hold::Deferred) {
                return self.complete_hold();
            }
            return GeneratorEvent::QueueEmpty;
        };

        if matches!(self.hold, Hold::Deferred) {
            if self.velocity <= 0.0 {
                return self.complete_hold();
            }
            // Blocks start and end at zero acceleration.
            if !block.is_barrier() && self.try_brake(queue, 0.0, 0.0) {
                return self.brake_segment(queue, settings);
            }
        }

        match block.kind {
            BlockKind::Command { id } => {
                queue.dequeue_head();
                self.replan_pending = true;
                GeneratorEvent::Command(id)
            }
            BlockKind::Dwell { seconds } => {
                self.cursor = Some(Cursor::Dwell { remaining: seconds });
                self.dwell_segment(queue, settings)
            }
            BlockKind::Line => {
                self.start_line(queue, settings);
                self.line_segment(queue, settings)
            }
        }
    }

    fn start_line<const N: usize>(&mut self, queue: &mut MoveQueue<N>, settings: &MachineSettings) {
        let velocity = self.velocity;
        let Some(block) = queue.peek_head_mut() else {
            return;
        };

        let profile = Profile::fit(
            velocity,
            block.cruise_vmax,
            block.exit_velocity,
            block.length,
            block.kinematics,
        );
        block.running = true;
        block.entry_velocity = velocity;
        block.cruise_velocity = profile.cruise;
        if profile.exit != block.exit_velocity {
            block.exit_cap = profile.exit;
            block.exit_velocity = profile.exit;
            self.replan_pending = true;
        }

        self.cursor = Some(Cursor::Line(LineCursor::new(profile, 0.0, settings)));
    }

    fn line_segment<const N: usize>(
        &mut self,
        queue: &mut MoveQueue<N>,
        settings: &MachineSettings,
    ) -> GeneratorEvent {
        let Some(Cursor::Line(mut cursor)) = self.cursor.take() else {
            return GeneratorEvent::QueueEmpty;
        };
        let Some(block) = queue.peek_head_mut() else {
            return GeneratorEvent::QueueEmpty;
        };

        // The planner moved the exit; refit the rest of the block while cruising.
        if block.exit_velocity != cursor.adopted_exit
            && !block.exit_committed
            && cursor.profile.section_at(cursor.time) == Section::Body
        {
            let done = cursor.profile.position_at(cursor.time);
            let cruise = cursor.profile.cruise;
            let profile = Profile::fit(
                cruise,
                cruise,
                block.exit_velocity,
                cursor.profile.length - done,
                block.kinematics,
            );
            if profile.exit != block.exit_velocity {
                block.exit_cap = profile.exit;
                block.exit_velocity = profile.exit;
                self.replan_pending = true;
            }
            cursor = LineCursor::new(profile, cursor.offset + done, settings);
        }

        let (t1, last) = cursor.advance();
        let profile = cursor.profile;

        if !block.exit_committed && (last || t1 > profile.tail_start()) {
            block.exit_committed = true;
            block.exit_cap = profile.exit;
            if block.exit_velocity != profile.exit {
                block.exit_velocity = profile.exit;
                self.replan_pending = true;
            }
        }

        let (position, v_end) = if last {
            (block.target, profile.exit)
        } else {
            let distance = (cursor.offset + profile.position_at(t1)).min(block.length);
            (block.position_at(distance), profile.velocity_at(t1))
        };
        let duration = t1 - cursor.time;
        cursor.time = t1;

        let event = self.emit(settings, &position, duration, v_end, last);
        if last {
            queue.dequeue_head();
            self.replan_pending = true;
        } else {
            self.cursor = Some(Cursor::Line(cursor));
        }
        event
    }

    fn dwell_segment<const N: usize>(
        &mut self,
        queue: &mut MoveQueue<N>,
        settings: &MachineSettings,
    ) -> GeneratorEvent {
        let Some(Cursor::Dwell { remaining }) = self.cursor.take() else {
            return GeneratorEvent::QueueEmpty;
        };
        let Some(position) = queue.peek_head().map(|block| block.target) else {
            return GeneratorEvent::QueueEmpty;
        };

        let mut duration = remaining.min(settings.nominal_segment);
        if remaining - duration < settings.min_segment {
            duration = remaining;
        }
        let remaining = remaining - duration;
        let last = remaining <= 0.0;

        let event = self.emit(settings, &position, duration, 0.0, last);
        if last {
            queue.dequeue_head();
            self.replan_pending = true;
        } else {
            self.cursor = Some(Cursor::Dwell { remaining });
        }
        event
    }

    /// Replace the remaining plan with a stop from the current velocity.
    ///
    /// `distance` is how far into the head block the path already is and
    /// `acceleration` is the path acceleration there. Fails when the line
    /// blocks before the next barrier are too short.
    fn try_brake<const N: usize>(
        &mut self,
        queue: &MoveQueue<N>,
        distance: f32,
        acceleration: f32,
    ) -> bool {
        let velocity = self.velocity;
        let Some(head) = queue.peek_head() else {
            return false;
        };

        // Use the tightest limits of every block the stop reaches into.
        let mut kin = head.kinematics;
        let mut available = -distance;
        for block in queue.iter() {
            if block.is_barrier() {
                break;
            }
            if available > 0.0
                && fits(StopProfile::new(velocity, acceleration, kin).length(), available)
            {
                break;
            }
            kin = kin.min(block.kinematics);
            available += block.length;
        }

        let profile = StopProfile::new(velocity, acceleration, kin);
        if !fits(profile.length(), available) {
            return false;
        }

        debug!("braking over {} mm", profile.length());
        self.cursor = None;
        self.hold = Hold::Braking(Brake {
            profile,
            time: 0.0,
            origin: -distance,
        });
        true
    }

    fn brake_segment<const N: usize>(
        &mut self,
        queue: &mut MoveQueue<N>,
        settings: &MachineSettings,
    ) -> GeneratorEvent {
        let Hold::Braking(mut brake) = self.hold else {
            return GeneratorEvent::QueueEmpty;
        };
        let Some(head) = queue.peek_head().copied() else {
            return self.complete_hold();
        };
        if head.is_barrier() {
            return self.complete_hold();
        }

        let total = brake.profile.duration();
        let mut t1 = (brake.time + settings.nominal_segment).min(total);
        if total - t1 < settings.min_segment {
            t1 = total;
        }
        let s1 = brake.profile.position_at(t1);
        let head_end = brake.origin + head.length;

        if s1 >= head_end - BLOCK_END_EPSILON {
            // The stop runs past this block: finish it exactly on its target.
            let crossing = if s1 > head_end {
                time_at(&brake.profile, head_end, brake.time, t1)
            } else {
                t1
            };
            let continues = crossing < total && queue.get(1).is_some_and(|b| !b.is_barrier());
            let v_end = if continues {
                brake.profile.velocity_at(crossing)
            } else {
                0.0
            };

            let event = self.emit(settings, &head.target, crossing - brake.time, v_end, true);
            queue.dequeue_head();
            self.replan_pending = true;

            if continues {
                brake.origin = head_end;
                brake.time = crossing;
                self.hold = Hold::Braking(brake);
            } else {
                self.hold = Hold::Completing;
            }
            return event;
        }

        let distance = s1 - brake.origin;
        let position = head.position_at(distance);
        let duration = t1 - brake.time;

        if t1 >= total {
            // At rest inside the head block: it restarts from here on resume.
            if let Some(block) = queue.peek_head_mut() {
                block.truncate(distance);
            }
            self.hold = Hold::Completing;
            self.replan_pending = true;
            return self.emit(settings, &position, duration, 0.0, false);
        }

        let v_end = brake.profile.velocity_at(t1);
        brake.time = t1;
        self.hold = Hold::Braking(brake);
        self.emit(settings, &position, duration, v_end, false)
    }

    fn complete_hold(&mut self) -> GeneratorEvent {
        self.cursor = None;
        self.velocity = 0.0;
        self.hold = Hold::Held;
        GeneratorEvent::HoldComplete
    }

    fn emit(
        &mut self,
        settings: &MachineSettings,
        position: &AxisVector,
        duration: f32,
        v_end: f32,
        block_end: bool,
    ) -> GeneratorEvent {
        let target = settings.motor_steps(position);
        let mut steps = [0_i32; MAX_MOTORS];
        for ((step, commanded), target) in steps
            .iter_mut()
            .zip(self.commanded.iter_mut())
            .zip(target.iter())
        {
            *step = (*target - *commanded) as i32;
            *commanded = *target;
        }

        let segment = Segment {
            duration,
            v_start: self.velocity,
            v_end,
            steps,
            block_end,
        };
        self.velocity = v_end;
        GeneratorEvent::Segment(segment)
    }
}
