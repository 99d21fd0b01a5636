//! Shared pipeline rig for integration tests.

#![allow(dead_code)]

use stepper_planner::exec::Pipeline;
use stepper_planner::motor::{Direction, StepOutputs};
use stepper_planner::{
    parse_settings, ExecState, MachineSettings, MotionPlanner, PulseGenerator, RtShared,
    SegmentLoader, TickEvent,
};

/// Three motors on X, Y and Z at a 20 kHz pulse clock.
pub const MACHINE: &str = r#"
[timing]
dda_frequency_hz = 20000
nominal_segment_ms = 2.0
min_segment_ms = 1.0

[planner]
junction_deviation_mm = 0.05
min_length_mm = 0.001

[axes.x]
max_velocity_mm_per_sec = 100.0
max_acceleration_mm_per_sec2 = 1000.0
max_jerk_mm_per_sec3 = 50000.0

[axes.y]
max_velocity_mm_per_sec = 100.0
max_acceleration_mm_per_sec2 = 1000.0
max_jerk_mm_per_sec3 = 50000.0

[axes.z]
max_velocity_mm_per_sec = 20.0
max_acceleration_mm_per_sec2 = 200.0
max_jerk_mm_per_sec3 = 10000.0

[motors.m0]
axis = "x"
travel_per_rev_mm = 40.0
microsteps = 16

[motors.m1]
axis = "y"
travel_per_rev_mm = 40.0
microsteps = 16

[motors.m2]
axis = "z"
travel_per_rev_mm = 8.0
microsteps = 16
"#;

/// Ticks per second of [`MACHINE`].
pub const TICK_RATE: u32 = 20_000;

pub fn settings() -> MachineSettings {
    parse_settings(MACHINE).expect("machine config")
}

/// Output context that records every pulse.
#[derive(Debug)]
pub struct Recorder {
    directions: [Direction; 3],
    raised: [bool; 3],
    /// Signed step count per motor.
    pub net: [i64; 3],
    /// Pulses per motor.
    pub pulses: [u64; 3],
    /// A step line was raised twice without being lowered.
    pub double_pulse: bool,
}

impl Default for Recorder {
    fn default() -> Self {
        Self {
            directions: [Direction::Forward; 3],
            raised: [false; 3],
            net: [0; 3],
            pulses: [0; 3],
            double_pulse: false,
        }
    }
}

impl StepOutputs for Recorder {
    fn motor_count(&self) -> usize {
        3
    }

    fn set_direction(
        &mut self,
        motor: usize,
        direction: Direction,
    ) -> Result<(), stepper_planner::error::MotorError> {
        self.directions[motor] = direction;
        Ok(())
    }

    fn step_high(&mut self, motor: usize) -> Result<(), stepper_planner::error::MotorError> {
        if self.raised[motor] {
            self.double_pulse = true;
        }
        self.raised[motor] = true;
        self.pulses[motor] += 1;
        self.net[motor] += self.directions[motor].sign() as i64;
        Ok(())
    }

    fn step_low_all(&mut self) -> Result<(), stepper_planner::error::MotorError> {
        self.raised = [false; 3];
        Ok(())
    }
}

/// Planner, loader and pulse generator wired together.
pub struct Rig<'a> {
    pub rt: &'a RtShared,
    pub planner: MotionPlanner<'a>,
    pub loader: SegmentLoader<'a>,
    pub pulse: PulseGenerator<'a, Recorder>,
}

impl<'a> Rig<'a> {
    pub fn new(rt: &'a RtShared, pipeline: &'a mut Pipeline) -> Self {
        let settings = settings();
        let ports = pipeline.split();
        let pulse = PulseGenerator::new(ports.pulse, rt, Recorder::default(), &settings)
            .expect("motor count");
        Self {
            rt,
            loader: SegmentLoader::new(ports.loader_in, ports.loader_out, rt, &settings),
            planner: MotionPlanner::new(settings, rt, ports.planner),
            pulse,
        }
    }

    /// One pulse clock tick, then the loader and the foreground.
    pub fn tick(&mut self) -> TickEvent {
        let event = self.pulse.on_tick();
        self.loader.exec();
        let _ = self.planner.service();
        event
    }

    /// Tick until `done` holds. Returns the number of ticks.
    pub fn run_until<F: FnMut(&Rig<'a>) -> bool>(&mut self, max_ticks: u32, mut done: F) -> u32 {
        for ticks in 0..max_ticks {
            if done(self) {
                return ticks;
            }
            assert_ne!(self.tick(), TickEvent::Starved, "starved after {} ticks", ticks);
        }
        panic!("condition not reached after {} ticks", max_ticks);
    }

    /// Tick until the queue is empty and the motors are at rest.
    pub fn run_to_rest(&mut self) -> u32 {
        self.run_until(20 * TICK_RATE, |rig| rig.at_rest())
    }

    pub fn at_rest(&self) -> bool {
        !self.rt.state().is_moving() && self.planner.queue().is_empty()
    }

    pub fn state(&self) -> ExecState {
        self.rt.state()
    }

    pub fn net(&self) -> [i64; 3] {
        self.pulse.outputs().net
    }
}
