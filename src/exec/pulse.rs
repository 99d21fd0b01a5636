//! Step pulse generator.
//!
//! Runs in the highest-priority interrupt at the pulse clock frequency. Each
//! tick costs one pass over the motors, with no allocation and no logging.

use heapless::spsc::Consumer;

use super::rate::{Dda, StepRate};
use super::shared::{ExecState, RtShared};
use super::{Payload, Published};
use crate::config::MachineSettings;
use crate::error::{ConfigError, Fault, MotorError, Result};
use crate::motor::{Direction, StepOutputs};
use crate::MAX_MOTORS;

/// Result of one [`PulseGenerator::on_tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TickEvent {
    /// Nothing to step.
    Idle,
    /// Stepping a segment.
    Running,
    /// A new segment started on this tick.
    SegmentLoaded,
    /// A stop sentinel brought the motors to rest.
    Stopped,
    /// A segment ended with nothing to follow it; alarm raised.
    Starved,
    /// Alarmed; published data is discarded.
    Alarmed,
}

/// Consumer side of the segment handoff, driving the step outputs.
pub struct PulseGenerator<'a, O: StepOutputs> {
    consumer: Consumer<'a, Published, 2>,
    rt: &'a RtShared,
    outputs: O,
    motors: usize,
    dda: [Dda; MAX_MOTORS],
    signs: [i32; MAX_MOTORS],
    positions: [i32; MAX_MOTORS],
    threshold: i64,
    remaining: u32,
    /// Segments are streaming; an empty slot at a segment end is starvation.
    active: bool,
    pulse_high: bool,
}

impl<'a, O: StepOutputs> PulseGenerator<'a, O> {
    /// Create a pulse generator over the consumer half of a
    /// [`Handoff`](super::Handoff).
    ///
    /// Starts from the step positions recorded in `rt`.
    ///
    /// # Errors
    ///
    /// Returns an error if `outputs` drives a different number of motors than
    /// `settings` configures.
    pub fn new(
        consumer: Consumer<'a, Published, 2>,
        rt: &'a RtShared,
        outputs: O,
        settings: &MachineSettings,
    ) -> Result<Self> {
        if outputs.motor_count() != settings.motor_count() {
            return Err(ConfigError::MotorCountMismatch {
                expected: settings.motor_count(),
                found: outputs.motor_count(),
            }
            .into());
        }

        let mut positions = [0; MAX_MOTORS];
        for (motor, position) in positions.iter_mut().enumerate() {
            *position = rt.position(motor);
        }

        Ok(Self {
            consumer,
            rt,
            motors: settings.motor_count(),
            outputs,
            dda: [Dda::default(); MAX_MOTORS],
            signs: [1; MAX_MOTORS],
            positions,
            threshold: 1,
            remaining: 0,
            active: false,
            pulse_high: false,
        })
    }

    /// The output context.
    pub fn outputs(&self) -> &O {
        &self.outputs
    }

    /// Release the output context.
    pub fn release(self) -> O {
        self.outputs
    }

    /// Advance one pulse clock tick.
    pub fn on_tick(&mut self) -> TickEvent {
        if self.pulse_high {
            self.pulse_high = false;
            if self.outputs.step_low_all().is_err() {
                return self.fault(Fault::OutputFault);
            }
        }

        if self.rt.state() == ExecState::Alarmed {
            while self.consumer.dequeue().is_some() {}
            self.active = false;
            self.remaining = 0;
            return TickEvent::Alarmed;
        }

        let mut event = TickEvent::Running;
        if self.remaining == 0 {
            match self.next_payload() {
                Some(Payload::Segment(rate)) => {
                    if self.load(&rate).is_err() {
                        return self.fault(Fault::OutputFault);
                    }
                    event = TickEvent::SegmentLoaded;
                }
                Some(Payload::Stop(_)) => {
                    self.active = false;
                    self.rt.set_velocity(0.0);
                    self.rt.stop();
                    return TickEvent::Stopped;
                }
                None if self.active => {
                    self.fault(Fault::StepStarvation);
                    return TickEvent::Starved;
                }
                None => return TickEvent::Idle,
            }
        }

        if self.step().is_err() {
            return self.fault(Fault::OutputFault);
        }
        event
    }

    /// Next entry of the current epoch. Stale entries are dropped.
    fn next_payload(&mut self) -> Option<Payload> {
        let epoch = self.rt.epoch();
        while let Some(published) = self.consumer.dequeue() {
            if published.epoch == epoch {
                return Some(published.payload);
            }
        }
        None
    }

    fn load(&mut self, rate: &StepRate) -> core::result::Result<(), MotorError> {
        let motors = self.motors;
        for (motor, (steps, (dda, sign))) in rate
            .steps
            .iter()
            .zip(self.dda.iter_mut().zip(self.signs.iter_mut()))
            .take(motors)
            .enumerate()
        {
            if *steps != 0 {
                let direction = Direction::from_steps(*steps);
                self.outputs.set_direction(motor, direction)?;
                *sign = direction.sign();
            }
            *dda = Dda::load(rate, motor);
        }

        self.threshold = rate.threshold;
        self.remaining = rate.ticks;
        self.active = true;
        self.rt.set_velocity(rate.velocity());
        self.rt.store_positions(&self.positions);
        Ok(())
    }

    fn step(&mut self) -> core::result::Result<(), MotorError> {
        let motors = self.motors;
        for (motor, ((dda, position), sign)) in self
            .dda
            .iter_mut()
            .zip(self.positions.iter_mut())
            .zip(self.signs.iter())
            .take(motors)
            .enumerate()
        {
            if dda.tick(self.threshold) {
                self.outputs.step_high(motor)?;
                self.pulse_high = true;
                *position += *sign;
            }
        }

        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.rt.store_positions(&self.positions);
        }
        Ok(())
    }

    fn fault(&mut self, fault: Fault) -> TickEvent {
        self.rt.raise(fault);
        self.rt.set_velocity(0.0);
        self.rt.store_positions(&self.positions);
        self.active = false;
        self.remaining = 0;
        TickEvent::Alarmed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::make_test_settings;
    use crate::exec::{Handoff, StopReason};
    use crate::motion::Segment;

    /// Output context that counts pulses.
    #[derive(Default)]
    struct Counter {
        directions: [Option<Direction>; 3],
        pulses: [u32; 3],
        fail_step: bool,
    }

    impl StepOutputs for Counter {
        fn motor_count(&self) -> usize {
            3
        }

        fn set_direction(
            &mut self,
            motor: usize,
            direction: Direction,
        ) -> core::result::Result<(), MotorError> {
            self.directions[motor] = Some(direction);
            Ok(())
        }

        fn step_high(&mut self, motor: usize) -> core::result::Result<(), MotorError> {
            if self.fail_step {
                return Err(MotorError::PinError);
            }
            self.pulses[motor] += 1;
            Ok(())
        }

        fn step_low_all(&mut self) -> core::result::Result<(), MotorError> {
            Ok(())
        }
    }

    fn rate(steps: [i32; MAX_MOTORS]) -> StepRate {
        let segment = Segment {
            duration: 0.002,
            v_start: 10.0,
            v_end: 10.0,
            steps,
            block_end: false,
        };
        StepRate::from_segment(&segment, &make_test_settings())
    }

    fn publish(rt: &RtShared, payload: Payload) -> Published {
        Published {
            epoch: rt.epoch(),
            payload,
        }
    }

    #[test]
    fn test_steps_segment_then_stops() {
        let rt = RtShared::new();
        let settings = make_test_settings();
        let mut handoff = Handoff::new();
        let (mut producer, consumer) = handoff.split();
        let mut pulse = PulseGenerator::new(consumer, &rt, Counter::default(), &settings).unwrap();

        assert_eq!(pulse.on_tick(), TickEvent::Idle);

        rt.begin_motion();
        producer
            .enqueue(publish(&rt, Payload::Segment(rate([5, -3, 0, 0, 0, 0]))))
            .unwrap();
        assert_eq!(pulse.on_tick(), TickEvent::SegmentLoaded);
        for _ in 1..40 {
            assert_eq!(pulse.on_tick(), TickEvent::Running);
        }

        producer
            .enqueue(publish(&rt, Payload::Stop(StopReason::QueueEmpty)))
            .unwrap();
        assert_eq!(pulse.on_tick(), TickEvent::Stopped);
        assert_eq!(rt.state(), ExecState::Stopped);
        assert_eq!(pulse.on_tick(), TickEvent::Idle);

        assert_eq!(pulse.outputs().pulses, [5, 3, 0]);
        assert_eq!(pulse.outputs().directions[1], Some(Direction::Reverse));
        assert_eq!(rt.position(0), 5);
        assert_eq!(rt.position(1), -3);
        assert_eq!(rt.velocity(), 0.0);
    }

    #[test]
    fn test_starvation_raises_fault() {
        let rt = RtShared::new();
        let settings = make_test_settings();
        let mut handoff = Handoff::new();
        let (mut producer, consumer) = handoff.split();
        let mut pulse = PulseGenerator::new(consumer, &rt, Counter::default(), &settings).unwrap();

        rt.begin_motion();
        producer
            .enqueue(publish(&rt, Payload::Segment(rate([2, 0, 0, 0, 0, 0]))))
            .unwrap();
        for _ in 0..40 {
            pulse.on_tick();
        }

        assert_eq!(pulse.on_tick(), TickEvent::Starved);
        assert_eq!(rt.state(), ExecState::Alarmed);
        assert_eq!(rt.fault(), Some(Fault::StepStarvation));

        // Alarmed: published data is drained, nothing steps
        producer
            .enqueue(publish(&rt, Payload::Segment(rate([2, 0, 0, 0, 0, 0]))))
            .unwrap();
        assert_eq!(pulse.on_tick(), TickEvent::Alarmed);
        assert!(producer.ready());
        assert_eq!(pulse.outputs().pulses[0], 2);
    }

    #[test]
    fn test_stale_epoch_discarded() {
        let rt = RtShared::new();
        let settings = make_test_settings();
        let mut handoff = Handoff::new();
        let (mut producer, consumer) = handoff.split();
        let mut pulse = PulseGenerator::new(consumer, &rt, Counter::default(), &settings).unwrap();

        producer
            .enqueue(publish(&rt, Payload::Segment(rate([2, 0, 0, 0, 0, 0]))))
            .unwrap();
        rt.advance_epoch();

        assert_eq!(pulse.on_tick(), TickEvent::Idle);
        assert_eq!(pulse.outputs().pulses[0], 0);
    }

    #[test]
    fn test_output_error_alarms() {
        let rt = RtShared::new();
        let settings = make_test_settings();
        let mut handoff = Handoff::new();
        let (mut producer, consumer) = handoff.split();
        let outputs = Counter {
            fail_step: true,
            ..Counter::default()
        };
        let mut pulse = PulseGenerator::new(consumer, &rt, outputs, &settings).unwrap();

        rt.begin_motion();
        producer
            .enqueue(publish(&rt, Payload::Segment(rate([40, 0, 0, 0, 0, 0]))))
            .unwrap();

        assert_eq!(pulse.on_tick(), TickEvent::Alarmed);
        assert_eq!(rt.fault(), Some(Fault::OutputFault));
    }

    #[test]
    fn test_motor_count_checked() {
        let rt = RtShared::new();
        let mut settings = make_test_settings();
        settings.motors.truncate(2);
        let mut handoff = Handoff::new();
        let (_, consumer) = handoff.split();

        assert!(PulseGenerator::new(consumer, &rt, Counter::default(), &settings).is_err());
    }
}
