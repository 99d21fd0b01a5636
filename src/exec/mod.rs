//! Execution module for stepper-planner.
//!
//! The real-time half of the pipeline. The planner stages segments in a
//! [`SegmentBuffer`]; the [`SegmentLoader`] turns them into DDA parameters
//! and publishes them through a single-slot [`Handoff`]; the
//! [`PulseGenerator`] consumes them on every pulse clock tick. Both queues are
//! lock-free single-producer single-consumer rings, and all three contexts
//! share an [`RtShared`].

use heapless::spsc::{Consumer, Producer, Queue};

use crate::motion::Segment;
use crate::SEGMENT_BUFFER_SIZE;

mod loader;
mod pulse;
mod rate;
mod shared;

pub use loader::{LoaderStatus, SegmentLoader};
pub use pulse::{PulseGenerator, TickEvent};
pub use rate::StepRate;
pub use shared::{ExecState, RtShared};

/// Why the pulse generator stops after the current segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StopReason {
    /// The queue ran dry at rest.
    QueueEmpty,
    /// A feed hold finished braking.
    Hold,
    /// Parked at a command until the application takes completed commands.
    CommandsPending,
}

/// Segment buffer entry content.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Prepared {
    /// Next slice of motion.
    Segment(Segment),
    /// Stop once the preceding segment ends.
    Stop(StopReason),
}

/// One segment buffer entry.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Staged {
    /// Epoch at staging time. Entries from an older epoch are discarded.
    pub epoch: u8,
    /// Entry content.
    pub entry: Prepared,
}

/// Content of the handoff slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Payload {
    /// Step the next segment.
    Segment(StepRate),
    /// Stop once the current segment ends.
    Stop(StopReason),
}

/// One published handoff entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Published {
    /// Epoch at publish time. Entries from an older epoch are discarded.
    pub epoch: u8,
    /// Entry content.
    pub payload: Payload,
}

/// Single-slot queue between the loader and the pulse generator.
///
/// `heapless::spsc::Queue<_, 2>` holds one entry.
pub type Handoff = heapless::spsc::Queue<Published, 2>;

/// Segments prepared by the foreground, waiting for the loader.
///
/// Holds `SEGMENT_BUFFER_SIZE - 1` entries.
pub type SegmentBuffer = Queue<Staged, SEGMENT_BUFFER_SIZE>;

/// Storage for both queues of the step pipeline.
///
/// Place it in a `static` or keep it alive for as long as the planner, the
/// loader and the pulse generator.
pub struct Pipeline {
    segments: SegmentBuffer,
    handoff: Handoff,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Pipeline {
    /// Create empty queues.
    pub const fn new() -> Self {
        Self {
            segments: Queue::new(),
            handoff: Queue::new(),
        }
    }

    /// Split into the queue ends of each context.
    pub fn split(&mut self) -> Ports<'_> {
        let (planner, loader_in) = self.segments.split();
        let (loader_out, pulse) = self.handoff.split();
        Ports {
            planner,
            loader_in,
            loader_out,
            pulse,
        }
    }
}

/// Queue ends returned by [`Pipeline::split`].
pub struct Ports<'a> {
    /// Staging end for the [`MotionPlanner`](crate::MotionPlanner).
    pub planner: Producer<'a, Staged, SEGMENT_BUFFER_SIZE>,
    /// Segment end for the [`SegmentLoader`].
    pub loader_in: Consumer<'a, Staged, SEGMENT_BUFFER_SIZE>,
    /// Publishing end for the [`SegmentLoader`].
    pub loader_out: Producer<'a, Published, 2>,
    /// Consuming end for the [`PulseGenerator`].
    pub pulse: Consumer<'a, Published, 2>,
}
