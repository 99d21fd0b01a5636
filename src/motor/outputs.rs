//! Step and direction outputs.
//!
//! The pulse generator drives motors through the [`StepOutputs`] trait.
//! [`PinBank`] implements it over embedded-hal 1.0 `OutputPin`s.

use embedded_hal::digital::OutputPin;

use crate::config::MachineSettings;
use crate::error::{ConfigError, Error, MotorError, Result};

/// Direction of motor motion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// Positive step count.
    Forward,
    /// Negative step count.
    Reverse,
}

impl Direction {
    /// Get direction from signed step count.
    #[inline]
    pub fn from_steps(steps: i32) -> Self {
        if steps >= 0 {
            Direction::Forward
        } else {
            Direction::Reverse
        }
    }

    /// Get the sign multiplier.
    #[inline]
    pub fn sign(self) -> i32 {
        match self {
            Direction::Forward => 1,
            Direction::Reverse => -1,
        }
    }
}

/// Hardware context the pulse generator steps.
///
/// Called from the pulse clock interrupt; implementations must not block.
pub trait StepOutputs {
    /// Number of motors driven.
    fn motor_count(&self) -> usize;

    /// Set the direction line of one motor.
    fn set_direction(&mut self, motor: usize, direction: Direction) -> core::result::Result<(), MotorError>;

    /// Raise the step line of one motor.
    fn step_high(&mut self, motor: usize) -> core::result::Result<(), MotorError>;

    /// Lower every step line raised since the last call.
    fn step_low_all(&mut self) -> core::result::Result<(), MotorError>;
}

/// Step/direction pin pairs for `M` motors.
pub struct PinBank<STEP, DIR, const M: usize>
where
    STEP: OutputPin,
    DIR: OutputPin,
{
    /// STEP pins (pulse to move one step).
    step_pins: [STEP; M],

    /// DIR pins (high = forward, or inverted).
    dir_pins: [DIR; M],

    /// Whether direction pin logic is inverted, per motor.
    invert_direction: [bool; M],

    /// Current direction (cached to avoid unnecessary pin writes).
    current_direction: [Option<Direction>; M],

    /// Step lines currently high.
    high: u32,
}

impl<STEP, DIR, const M: usize> PinBank<STEP, DIR, M>
where
    STEP: OutputPin,
    DIR: OutputPin,
{
    /// Create a pin bank with no direction inversion.
    pub fn new(step_pins: [STEP; M], dir_pins: [DIR; M]) -> Self {
        Self {
            step_pins,
            dir_pins,
            invert_direction: [false; M],
            current_direction: [None; M],
            high: 0,
        }
    }

    /// Create a pin bank with inversion flags from the motor settings.
    ///
    /// # Errors
    ///
    /// Returns an error if `M` differs from the number of configured motors.
    pub fn from_settings(
        step_pins: [STEP; M],
        dir_pins: [DIR; M],
        settings: &MachineSettings,
    ) -> Result<Self> {
        if settings.motor_count() != M {
            return Err(Error::Config(ConfigError::MotorCountMismatch {
                expected: settings.motor_count(),
                found: M,
            }));
        }

        let mut bank = Self::new(step_pins, dir_pins);
        for (invert, motor) in bank.invert_direction.iter_mut().zip(settings.motors.iter()) {
            *invert = motor.invert_direction;
        }
        Ok(bank)
    }

    /// Release the pins.
    pub fn release(self) -> ([STEP; M], [DIR; M]) {
        (self.step_pins, self.dir_pins)
    }
}

impl<STEP, DIR, const M: usize> StepOutputs for PinBank<STEP, DIR, M>
where
    STEP: OutputPin,
    DIR: OutputPin,
{
    fn motor_count(&self) -> usize {
        M
    }

    fn set_direction(&mut self, motor: usize, direction: Direction) -> core::result::Result<(), MotorError> {
        if motor >= M {
            return Err(MotorError::InvalidMotor(motor));
        }
        if self.current_direction[motor] == Some(direction) {
            return Ok(());
        }

        let pin_high = match direction {
            Direction::Forward => !self.invert_direction[motor],
            Direction::Reverse => self.invert_direction[motor],
        };

        let pin = &mut self.dir_pins[motor];
        if pin_high {
            pin.set_high().map_err(|_| MotorError::PinError)?;
        } else {
            pin.set_low().map_err(|_| MotorError::PinError)?;
        }

        self.current_direction[motor] = Some(direction);
        Ok(())
    }

    fn step_high(&mut self, motor: usize) -> core::result::Result<(), MotorError> {
        let pin = self
            .step_pins
            .get_mut(motor)
            .ok_or(MotorError::InvalidMotor(motor))?;
        pin.set_high().map_err(|_| MotorError::PinError)?;
        self.high |= 1 << motor;
        Ok(())
    }

    fn step_low_all(&mut self) -> core::result::Result<(), MotorError> {
        let mut result = Ok(());
        for (motor, pin) in self.step_pins.iter_mut().enumerate() {
            if self.high & (1 << motor) != 0 && pin.set_low().is_err() {
                result = Err(MotorError::PinError);
            }
        }
        self.high = 0;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::make_test_settings;
    use embedded_hal_mock::eh1::digital::{Mock as PinMock, State, Transaction};
    use embedded_hal_mock::eh1::MockError;
    use std::io::ErrorKind;

    #[test]
    fn test_direction_from_steps() {
        assert_eq!(Direction::from_steps(5), Direction::Forward);
        assert_eq!(Direction::from_steps(0), Direction::Forward);
        assert_eq!(Direction::from_steps(-1), Direction::Reverse);
        assert_eq!(Direction::Reverse.sign(), -1);
    }

    #[test]
    fn test_direction_written_once() {
        let step = PinMock::new(&[]);
        let dir = PinMock::new(&[
            Transaction::set(State::High),
            Transaction::set(State::Low),
        ]);
        let (mut step_check, mut dir_check) = (step.clone(), dir.clone());

        let mut bank = PinBank::new([step], [dir]);
        bank.set_direction(0, Direction::Forward).unwrap();
        bank.set_direction(0, Direction::Forward).unwrap();
        bank.set_direction(0, Direction::Reverse).unwrap();

        step_check.done();
        dir_check.done();
    }

    #[test]
    fn test_inverted_direction() {
        let step = PinMock::new(&[]);
        let dir = PinMock::new(&[Transaction::set(State::Low)]);
        let (mut step_check, mut dir_check) = (step.clone(), dir.clone());

        let mut bank = PinBank::new([step], [dir]);
        bank.invert_direction[0] = true;
        bank.set_direction(0, Direction::Forward).unwrap();

        step_check.done();
        dir_check.done();
    }

    #[test]
    fn test_step_pulse_lowers_only_raised_pins() {
        let step0 = PinMock::new(&[Transaction::set(State::High), Transaction::set(State::Low)]);
        let step1 = PinMock::new(&[]);
        let dir0 = PinMock::new(&[]);
        let dir1 = PinMock::new(&[]);
        let mut checks = [step0.clone(), step1.clone(), dir0.clone(), dir1.clone()];

        let mut bank = PinBank::new([step0, step1], [dir0, dir1]);
        bank.step_high(0).unwrap();
        bank.step_low_all().unwrap();
        // Nothing raised: no pin writes
        bank.step_low_all().unwrap();

        for pin in checks.iter_mut() {
            pin.done();
        }
    }

    #[test]
    fn test_pin_error_is_reported() {
        let step = PinMock::new(&[
            Transaction::set(State::High).with_error(MockError::Io(ErrorKind::Other))
        ]);
        let dir = PinMock::new(&[]);
        let (mut step_check, mut dir_check) = (step.clone(), dir.clone());

        let mut bank = PinBank::new([step], [dir]);
        assert_eq!(bank.step_high(0), Err(MotorError::PinError));
        assert_eq!(bank.step_high(3), Err(MotorError::InvalidMotor(3)));

        step_check.done();
        dir_check.done();
    }

    #[test]
    fn test_motor_count_must_match_settings() {
        let settings = make_test_settings();
        let steps = [PinMock::new(&[]), PinMock::new(&[])];
        let dirs = [PinMock::new(&[]), PinMock::new(&[])];
        let mut checks = [
            steps[0].clone(),
            steps[1].clone(),
            dirs[0].clone(),
            dirs[1].clone(),
        ];

        let result = PinBank::from_settings(steps, dirs, &settings);
        assert!(matches!(
            result,
            Err(Error::Config(ConfigError::MotorCountMismatch {
                expected: 3,
                found: 2
            }))
        ));

        for pin in checks.iter_mut() {
            pin.done();
        }
    }
}
