//! State shared between the foreground, the loader and the pulse clock.
//!
//! Everything here is a single atomic word, so each context reads and writes
//! without locks. Place one [`RtShared`] in a `static`.

use core::sync::atomic::{AtomicBool, AtomicI32, AtomicU32, AtomicU8, Ordering};

use crate::error::Fault;
use crate::MAX_MOTORS;

/// Execution state of the step pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ExecState {
    /// Nothing has run since start or reset.
    Idle = 0,
    /// Segments are being stepped.
    Running = 1,
    /// Stepping a feed-hold deceleration.
    Hold = 2,
    /// At rest after a stop sentinel.
    Stopped = 3,
    /// A fault stopped all stepping. Cleared only by reset.
    Alarmed = 4,
}

impl ExecState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => ExecState::Idle,
            1 => ExecState::Running,
            2 => ExecState::Hold,
            3 => ExecState::Stopped,
            _ => ExecState::Alarmed,
        }
    }

    /// Whether the pulse generator may still be stepping.
    #[inline]
    pub fn is_moving(self) -> bool {
        matches!(self, ExecState::Running | ExecState::Hold)
    }
}

#[allow(clippy::declare_interior_mutable_const)]
const POSITION_ZERO: AtomicI32 = AtomicI32::new(0);

/// Lock-free state shared by all execution contexts.
#[derive(Debug)]
pub struct RtShared {
    state: AtomicU8,
    faults: AtomicU8,
    hold_request: AtomicBool,
    epoch: AtomicU8,
    positions: [AtomicI32; MAX_MOTORS],
    velocity: AtomicU32,
}

impl Default for RtShared {
    fn default() -> Self {
        Self::new()
    }
}

impl RtShared {
    /// Create shared state: idle, no faults, all motors at step zero.
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(ExecState::Idle as u8),
            faults: AtomicU8::new(0),
            hold_request: AtomicBool::new(false),
            epoch: AtomicU8::new(0),
            positions: [POSITION_ZERO; MAX_MOTORS],
            velocity: AtomicU32::new(0),
        }
    }

    /// Current execution state.
    #[inline]
    pub fn state(&self) -> ExecState {
        ExecState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub(crate) fn set_state(&self, state: ExecState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Move from `from` to `to`; fails if another context changed the state.
    fn transition(&self, from: ExecState, to: ExecState) -> bool {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// First segment of a motion was published.
    pub(crate) fn begin_motion(&self) {
        let _ = self.transition(ExecState::Idle, ExecState::Running)
            || self.transition(ExecState::Stopped, ExecState::Running);
    }

    /// The planner started a feed hold while segments were streaming.
    pub(crate) fn enter_hold(&self) {
        let _ = self.transition(ExecState::Running, ExecState::Hold);
    }

    /// The pulse generator consumed a stop sentinel.
    pub(crate) fn stop(&self) {
        let _ = self.transition(ExecState::Running, ExecState::Stopped)
            || self.transition(ExecState::Hold, ExecState::Stopped);
    }

    /// Sticky fault, if any.
    pub fn fault(&self) -> Option<Fault> {
        Fault::from_bits(self.faults.load(Ordering::Acquire))
    }

    /// Record a fault and alarm.
    pub(crate) fn raise(&self, fault: Fault) {
        self.faults.fetch_or(fault.bit(), Ordering::AcqRel);
        self.set_state(ExecState::Alarmed);
    }

    pub(crate) fn clear_faults(&self) {
        self.faults.store(0, Ordering::Release);
    }

    /// Ask the planner to start a feed hold on its next service.
    #[inline]
    pub fn request_hold(&self) {
        self.hold_request.store(true, Ordering::Release);
    }

    /// Consume a pending hold request.
    #[inline]
    pub(crate) fn take_hold_request(&self) -> bool {
        self.hold_request.swap(false, Ordering::AcqRel)
    }

    /// Generation of published step data. Data from older epochs is discarded.
    #[inline]
    pub fn epoch(&self) -> u8 {
        self.epoch.load(Ordering::Acquire)
    }

    pub(crate) fn advance_epoch(&self) {
        self.epoch.fetch_add(1, Ordering::AcqRel);
    }

    /// Executed step position of one motor.
    #[inline]
    pub fn position(&self, motor: usize) -> i32 {
        self.positions
            .get(motor)
            .map_or(0, |p| p.load(Ordering::Relaxed))
    }

    /// Executed step positions of all motors.
    pub fn positions(&self) -> [i64; MAX_MOTORS] {
        let mut positions = [0; MAX_MOTORS];
        for (slot, atomic) in positions.iter_mut().zip(self.positions.iter()) {
            *slot = atomic.load(Ordering::Relaxed) as i64;
        }
        positions
    }

    pub(crate) fn store_positions(&self, positions: &[i32; MAX_MOTORS]) {
        for (atomic, value) in self.positions.iter().zip(positions.iter()) {
            atomic.store(*value, Ordering::Relaxed);
        }
    }

    /// Path velocity of the segment being stepped, in mm/s.
    #[inline]
    pub fn velocity(&self) -> f32 {
        f32::from_bits(self.velocity.load(Ordering::Relaxed))
    }

    pub(crate) fn set_velocity(&self, velocity: f32) {
        self.velocity.store(velocity.to_bits(), Ordering::Relaxed);
    }
}
