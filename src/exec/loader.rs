//! Segment loader.
//!
//! Runs in a low-priority interrupt (or any context that preempts the
//! foreground but not the pulse clock). Each call moves at most one staged
//! segment into the handoff slot and never blocks. It touches only the two
//! queues and [`RtShared`], never the planner.

use heapless::spsc::{Consumer, Producer};

use super::rate::StepRate;
use super::shared::{ExecState, RtShared};
use super::{Payload, Prepared, Published, Staged};
use crate::config::MachineSettings;
use crate::error::Status;
use crate::SEGMENT_BUFFER_SIZE;

/// Result of [`SegmentLoader::exec`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LoaderStatus {
    /// The handoff slot is occupied. Try again later.
    Busy,
    /// An entry was published.
    Published,
    /// Nothing staged.
    Idle,
    /// Alarmed; nothing is published until reset.
    Alarmed,
}

impl LoaderStatus {
    /// Status code for the front end.
    pub fn status(self) -> Status {
        match self {
            LoaderStatus::Busy => Status::Eagain,
            LoaderStatus::Published => Status::Ok,
            LoaderStatus::Idle => Status::Noop,
            LoaderStatus::Alarmed => Status::Alarmed,
        }
    }
}

/// Moves staged segments into the handoff as DDA parameters.
pub struct SegmentLoader<'a> {
    staged: Consumer<'a, Staged, SEGMENT_BUFFER_SIZE>,
    producer: Producer<'a, Published, 2>,
    rt: &'a RtShared,
    settings: MachineSettings,
}

impl<'a> SegmentLoader<'a> {
    /// Create a loader between the segment buffer and the handoff, from the
    /// `loader_in` and `loader_out` ends of a [`Pipeline`](super::Pipeline).
    pub fn new(
        staged: Consumer<'a, Staged, SEGMENT_BUFFER_SIZE>,
        producer: Producer<'a, Published, 2>,
        rt: &'a RtShared,
        settings: &MachineSettings,
    ) -> Self {
        Self {
            staged,
            producer,
            rt,
            settings: settings.clone(),
        }
    }

    /// Publish the next staged segment or stop sentinel if the slot is free.
    pub fn exec(&mut self) -> LoaderStatus {
        if self.rt.state() == ExecState::Alarmed {
            while self.staged.dequeue().is_some() {}
            return LoaderStatus::Alarmed;
        }
        if !self.producer.ready() {
            return LoaderStatus::Busy;
        }

        let epoch = self.rt.epoch();
        while let Some(staged) = self.staged.dequeue() {
            // Staged before a flush or reset.
            if staged.epoch != epoch {
                continue;
            }

            let payload = match staged.entry {
                Prepared::Segment(segment) => {
                    self.rt.begin_motion();
                    Payload::Segment(StepRate::from_segment(&segment, &self.settings))
                }
                Prepared::Stop(reason) => Payload::Stop(reason),
            };
            return match self.producer.enqueue(Published { epoch, payload }) {
                Ok(()) => LoaderStatus::Published,
                Err(_) => LoaderStatus::Busy,
            };
        }
        LoaderStatus::Idle
    }
}
