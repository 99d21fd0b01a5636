//! Planner module for stepper-planner.
//!
//! Admits moves into the look-ahead queue, replans velocities and owns the
//! segment generator. [`MotionPlanner`] is the foreground facade. It stages
//! segments for the loader through the segment buffer and is never entered
//! from an interrupt.

pub mod block;
mod cornering;
pub mod queue;
mod request;
pub(crate) mod velocity;

use heapless::spsc::Producer;
use heapless::Deque;
use libm::{fabsf, sqrtf};

pub use block::{BlockKind, MoveBlock};
pub use cornering::{CorneringPolicy, ExactStop, Junction, JunctionDeviation};
pub use queue::MoveQueue;
pub use request::{MoveBuilder, MoveRequest, MoveType};
pub use velocity::replan;

use crate::config::{AxisId, AxisVector, MachineSettings};
use crate::error::{AdmissionError, Error, Fault, Result, Status};
use crate::exec::{ExecState, Prepared, RtShared, Staged, StopReason};
use crate::log::{debug, error, info, warning};
use crate::motion::{GeneratorEvent, Kinematics, SegmentGenerator};
use crate::motor::MachinePosition;
use crate::{MAX_AXES, PLANNER_QUEUE_SIZE, SEGMENT_BUFFER_SIZE};

/// Completed commands waiting for [`MotionPlanner::take_command`].
const COMMAND_OUTBOX_SIZE: usize = 8;

/// Outcome of an accepted [`MotionPlanner::submit_move`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Admission {
    /// Block added to the queue.
    Queued,
    /// Nothing to do (zero-length line or zero dwell).
    Skipped,
}

impl Admission {
    /// Status code for the front end.
    pub fn status(self) -> Status {
        match self {
            Admission::Queued => Status::Ok,
            Admission::Skipped => Status::BlockSkipped,
        }
    }
}

/// Snapshot returned by [`MotionPlanner::status`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusReport {
    /// Execution state.
    pub state: ExecState,
    /// Axis position of the executed steps, in mm.
    pub position: AxisVector,
    /// Path velocity being stepped, in mm/s.
    pub velocity: f32,
    /// Blocks in the queue.
    pub queue_depth: usize,
    /// Queue capacity.
    pub queue_capacity: usize,
    /// Sticky fault, if alarmed.
    pub fault: Option<Fault>,
    /// A feed hold is in progress or complete.
    pub holding: bool,
}

/// Look-ahead motion planner.
///
/// Owns the move queue and the segment generator, both touched only from the
/// foreground. Segments reach the loader through the lock-free segment
/// buffer; the loader and the pulse generator share only [`RtShared`] with
/// it.
pub struct MotionPlanner<'a, P: CorneringPolicy = JunctionDeviation> {
    settings: MachineSettings,
    policy: P,
    queue: MoveQueue<PLANNER_QUEUE_SIZE>,
    generator: SegmentGenerator,
    rt: &'a RtShared,
    staging: Producer<'a, Staged, SEGMENT_BUFFER_SIZE>,
    /// Segments were staged since the last stop sentinel.
    streaming: bool,
    /// End position of the last admitted move.
    position: AxisVector,
    commands: Deque<u16, COMMAND_OUTBOX_SIZE>,
    flush_pending: bool,
    resume_pending: bool,
    alarm_reported: bool,
}

impl<'a> MotionPlanner<'a> {
    /// Create a planner with junction-deviation cornering from the settings.
    ///
    /// `staging` is the `planner` end of a [`Pipeline`](crate::exec::Pipeline).
    pub fn new(
        settings: MachineSettings,
        rt: &'a RtShared,
        staging: Producer<'a, Staged, SEGMENT_BUFFER_SIZE>,
    ) -> Self {
        let policy = JunctionDeviation::from_settings(&settings);
        Self::with_policy(settings, policy, rt, staging)
    }
}

impl<'a, P: CorneringPolicy> MotionPlanner<'a, P> {
    /// Create a planner with a custom cornering policy.
    ///
    /// Starts at the step position recorded in `rt`.
    pub fn with_policy(
        settings: MachineSettings,
        policy: P,
        rt: &'a RtShared,
        staging: Producer<'a, Staged, SEGMENT_BUFFER_SIZE>,
    ) -> Self {
        let steps = rt.positions();
        let mut generator = SegmentGenerator::new();
        generator.reset(steps);
        let position = MachinePosition::at(&steps).to_axes(&settings, &[0.0; MAX_AXES]);

        Self {
            settings,
            policy,
            queue: MoveQueue::new(),
            generator,
            rt,
            staging,
            streaming: false,
            position,
            commands: Deque::new(),
            flush_pending: false,
            resume_pending: false,
            alarm_reported: false,
        }
    }

    /// Machine settings.
    #[inline]
    pub fn settings(&self) -> &MachineSettings {
        &self.settings
    }

    /// The look-ahead queue.
    #[inline]
    pub fn queue(&self) -> &MoveQueue<PLANNER_QUEUE_SIZE> {
        &self.queue
    }

    /// End position of the last admitted move, in mm.
    #[inline]
    pub fn position(&self) -> AxisVector {
        self.position
    }

    /// Validate a move and append it to the queue.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Admission`] when the move is rejected. The queue is
    /// unchanged on error.
    pub fn submit_move(&mut self, request: &MoveRequest) -> Result<Admission> {
        let result = self.admit(request);
        if let Err(e) = &result {
            debug!("move rejected: status {}", Status::from(e).code());
        }
        result.map_err(Error::from)
    }

    fn admit(&mut self, request: &MoveRequest) -> core::result::Result<Admission, AdmissionError> {
        if self.rt.state() == ExecState::Alarmed || self.flush_pending {
            return Err(AdmissionError::NotAccepted);
        }
        if self.queue.is_full() {
            return Err(AdmissionError::NoBufferSpace);
        }

        match request.move_type {
            MoveType::Line => self.admit_line(request),
            MoveType::Dwell { seconds } => {
                if !seconds.is_finite() || seconds < 0.0 {
                    return Err(AdmissionError::InvalidDwell(seconds));
                }
                if seconds == 0.0 {
                    return Ok(Admission::Skipped);
                }
                self.enqueue(MoveBlock::dwell(self.position, seconds))
            }
            MoveType::Command { id } => self.enqueue(MoveBlock::command(self.position, id)),
        }
    }

    fn admit_line(&mut self, request: &MoveRequest) -> core::result::Result<Admission, AdmissionError> {
        let mut target = request.target;
        for axis in AxisId::ALL {
            let i = axis.index();
            let value = target[i];
            if !value.is_finite() {
                return Err(AdmissionError::InvalidTarget(axis));
            }

            let limits = self.settings.axis(axis);
            if !limits.enabled {
                if value != self.position[i] {
                    return Err(AdmissionError::InvalidTarget(axis));
                }
                continue;
            }
            if let Some(soft) = limits.limits {
                target[i] = soft
                    .apply(value)
                    .ok_or(AdmissionError::SoftLimitExceeded { axis, target: value })?;
            }
        }

        let feed = request.feed_rate.to_mm_per_sec().value();
        if !feed.is_finite() || feed <= 0.0 {
            return Err(AdmissionError::InvalidFeedRate(request.feed_rate.value()));
        }

        let mut delta = [0.0_f32; MAX_AXES];
        for ((d, t), p) in delta.iter_mut().zip(target.iter()).zip(self.position.iter()) {
            *d = t - p;
        }
        let length = sqrtf(delta.iter().map(|d| d * d).sum());
        if length == 0.0 {
            return Ok(Admission::Skipped);
        }
        if length < self.settings.min_length {
            return Err(AdmissionError::MinimumLengthMove { length });
        }

        // Path limits are the tightest axis limit scaled by that axis' share of the move.
        let mut cruise_vmax = feed;
        let mut acceleration = f32::INFINITY;
        let mut jerk = f32::INFINITY;
        for axis in AxisId::ALL {
            let share = fabsf(delta[axis.index()]) / length;
            if share > 0.0 {
                let limits = self.settings.axis(axis);
                cruise_vmax = cruise_vmax.min(limits.max_velocity / share);
                acceleration = acceleration.min(limits.max_acceleration / share);
                jerk = jerk.min(limits.max_jerk / share);
            }
        }

        let time = length / cruise_vmax;
        if time < self.settings.min_segment {
            return Err(AdmissionError::MinimumTimeMove { time });
        }

        let kinematics = Kinematics::new(acceleration, jerk);
        let block = MoveBlock::line(
            self.position,
            target,
            length,
            kinematics,
            cruise_vmax,
            0.0,
        );

        let entry_vmax = match self.queue.peek_tail() {
            Some(prev) if !prev.is_barrier() => {
                let corner = self.policy.junction_velocity(
                    &Junction {
                        unit: prev.unit,
                        acceleration: prev.kinematics.acceleration,
                    },
                    &Junction {
                        unit: block.unit,
                        acceleration,
                    },
                );
                corner.min(cruise_vmax).min(prev.cruise_vmax)
            }
            _ => 0.0,
        };

        self.enqueue(MoveBlock { entry_vmax, ..block })
    }

    fn enqueue(&mut self, block: MoveBlock) -> core::result::Result<Admission, AdmissionError> {
        self.queue.enqueue(block)?;
        self.position = block.target;
        self.replan();
        Ok(Admission::Queued)
    }

    /// Run the look-ahead passes unless a feed hold owns the queue.
    fn replan(&mut self) {
        if self.generator.is_holding() {
            return;
        }
        if velocity::replan(&mut self.queue, self.generator.velocity()) {
            debug!("replanned {} blocks", self.queue.len());
        }
    }

    /// Ask for a controlled stop.
    ///
    /// Takes effect on the next [`service`](Self::service). Segments already
    /// staged run first.
    pub fn request_feed_hold(&self) {
        info!("feed hold requested");
        self.rt.request_hold();
    }

    /// Continue after a feed hold.
    ///
    /// A hold that has not started yet is cancelled. A hold still braking
    /// resumes once the pulse generator has stopped.
    ///
    /// # Errors
    ///
    /// Returns `NotAccepted` while alarmed.
    pub fn request_resume(&mut self) -> Result<()> {
        if self.rt.state() == ExecState::Alarmed {
            return Err(AdmissionError::NotAccepted.into());
        }
        if self.rt.take_hold_request() || !self.generator.is_holding() {
            return Ok(());
        }

        if self.generator.is_held() && !self.rt.state().is_moving() {
            self.resume_now();
        } else {
            self.resume_pending = true;
        }
        Ok(())
    }

    fn resume_now(&mut self) {
        self.generator.release_hold();
        self.resume_pending = false;
        self.replan();
        info!("resumed with {} blocks queued", self.queue.len());
    }

    /// Discard all queued motion.
    ///
    /// Motion in progress is brought to rest first; the queue is cleared once
    /// the pulse generator has stopped. New moves are refused until then.
    pub fn request_flush(&mut self) {
        if self.rt.state().is_moving() {
            self.rt.request_hold();
            self.flush_pending = true;
        } else {
            self.flush_now();
        }
    }

    fn flush_now(&mut self) {
        self.queue.clear();
        let _ = self.rt.take_hold_request();

        let steps = self.rt.positions();
        self.generator.reset(steps);
        self.position = MachinePosition::at(&steps).to_axes(&self.settings, &self.position);
        self.rt.advance_epoch();
        self.streaming = false;

        self.flush_pending = false;
        self.resume_pending = false;
        info!("queue flushed");
    }

    /// Clear an alarm and return to idle at the executed position.
    ///
    /// # Errors
    ///
    /// Returns `NotAccepted` while the pulse generator is running.
    pub fn reset(&mut self) -> Result<()> {
        if self.rt.state().is_moving() {
            return Err(AdmissionError::NotAccepted.into());
        }

        self.rt.clear_faults();
        self.flush_now();
        self.commands.clear();
        self.alarm_reported = false;
        self.rt.set_state(ExecState::Idle);
        info!("reset");
        Ok(())
    }

    /// Foreground housekeeping. Call from the main loop, often enough that
    /// the segment buffer never runs dry.
    ///
    /// Starts a requested feed hold, completes a pending flush or resume once
    /// the pulse generator has stopped and stages segments for the loader.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Fault`] while alarmed.
    pub fn service(&mut self) -> Result<()> {
        if let Some(fault) = self.rt.fault() {
            if !self.alarm_reported {
                error!("alarm: {}", fault);
                self.alarm_reported = true;
            }
            return Err(fault.into());
        }

        if self.rt.take_hold_request() {
            self.begin_hold();
        }
        if !self.rt.state().is_moving() {
            if self.flush_pending {
                self.flush_now();
            } else if self.resume_pending && self.generator.is_held() {
                self.resume_now();
            }
        }

        if self.generator.take_replan() {
            self.replan();
        }
        self.prepare();
        Ok(())
    }

    /// Fill the segment buffer.
    fn prepare(&mut self) {
        let epoch = self.rt.epoch();
        while self.staging.ready() {
            if self.commands.is_full() && self.generator.command_next(&self.queue) {
                // At rest on a barrier: park instead of starving the pulse clock.
                if self.streaming {
                    warning!("command outbox full, parked");
                }
                self.stage_stop(epoch, StopReason::CommandsPending);
                return;
            }

            match self.generator.next_event(&mut self.queue, &self.settings) {
                GeneratorEvent::Segment(segment) => {
                    self.streaming = true;
                    self.stage(epoch, Prepared::Segment(segment));
                }
                GeneratorEvent::Command(id) => {
                    let _ = self.commands.push_back(id);
                }
                GeneratorEvent::HoldComplete => self.stage_stop(epoch, StopReason::Hold),
                GeneratorEvent::QueueEmpty => {
                    self.stage_stop(epoch, StopReason::QueueEmpty);
                    return;
                }
            }

            if self.generator.take_replan() {
                self.replan();
            }
        }
    }

    fn stage_stop(&mut self, epoch: u8, reason: StopReason) {
        if core::mem::take(&mut self.streaming) {
            self.stage(epoch, Prepared::Stop(reason));
        }
    }

    fn stage(&mut self, epoch: u8, entry: Prepared) {
        // Callers check `ready` first.
        let _ = self.staging.enqueue(Staged { epoch, entry });
    }

    /// Next completed command id, oldest first.
    pub fn take_command(&mut self) -> Option<u16> {
        self.commands.pop_front()
    }

    /// Snapshot of the machine state.
    pub fn status(&self) -> StatusReport {
        let steps = self.rt.positions();
        StatusReport {
            state: self.rt.state(),
            position: MachinePosition::at(&steps).to_axes(&self.settings, &self.position),
            velocity: self.rt.velocity(),
            queue_depth: self.queue.len(),
            queue_capacity: self.queue.capacity(),
            fault: self.rt.fault(),
            holding: self.generator.is_holding(),
        }
    }

    fn begin_hold(&mut self) {
        self.generator.begin_hold(&mut self.queue);
        if self.streaming {
            self.rt.enter_hold();
        }
    }
}
