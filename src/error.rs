//! Error types for stepper-planner.
//!
//! Provides unified error handling across configuration, move admission,
//! step outputs and real-time faults, plus the numeric [`Status`] taxonomy
//! reported to front ends.

use core::fmt;

use crate::config::AxisId;

/// Result type alias using the library's Error type.
pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for all stepper-planner operations.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Configuration parsing or validation error
    Config(ConfigError),
    /// Move rejected at submission
    Admission(AdmissionError),
    /// Step/direction output error
    Motor(MotorError),
    /// Sticky real-time fault raised by the pulse generator
    Fault(Fault),
}

/// Configuration-related errors.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Failed to parse TOML configuration
    ParseError(heapless::String<128>),
    /// Invalid microstep value (must be power of 2: 1, 2, 4, 8, 16, 32, 64, 128, 256)
    InvalidMicrosteps(u16),
    /// Axis table key is not one of x, y, z, a, b, c
    UnknownAxis(heapless::String<32>),
    /// Two axis tables resolve to the same axis
    DuplicateAxis(AxisId),
    /// Motor is bound to an axis that has no `[axes.*]` table
    AxisNotConfigured {
        /// Motor name
        motor: heapless::String<32>,
        /// Axis the motor refers to
        axis: heapless::String<32>,
    },
    /// No motors configured
    NoMotors,
    /// More motors than the step generator drives
    TooManyMotors(usize),
    /// Output context drives a different number of motors than configured
    MotorCountMismatch {
        /// Motors in the configuration
        expected: usize,
        /// Motors the output context drives
        found: usize,
    },
    /// Invalid max velocity (must be > 0)
    InvalidMaxVelocity(f32),
    /// Invalid max acceleration (must be > 0)
    InvalidMaxAcceleration(f32),
    /// Invalid max jerk (must be > 0)
    InvalidMaxJerk(f32),
    /// Invalid soft limits (min must be < max)
    InvalidSoftLimits {
        /// Minimum limit value
        min: f32,
        /// Maximum limit value
        max: f32,
    },
    /// Invalid step angle (must be > 0)
    InvalidStepAngle(f32),
    /// Invalid travel per revolution (must be > 0)
    InvalidTravel(f32),
    /// Axis max velocity needs a step rate above half the pulse clock
    StepRateTooHigh {
        /// Required steps per second
        rate: f32,
        /// Highest rate the pulse clock supports
        max: f32,
    },
    /// Invalid pulse clock frequency
    InvalidFrequency(u32),
    /// Segment timing must satisfy 0 < min <= nominal
    InvalidSegmentTiming {
        /// Nominal segment duration in ms
        nominal_ms: f32,
        /// Minimum segment duration in ms
        min_ms: f32,
    },
    /// Invalid junction deviation (must be >= 0)
    InvalidJunctionDeviation(f32),
    /// Invalid minimum move length (must be > 0)
    InvalidMinLength(f32),
    /// File I/O error (std only)
    #[cfg(feature = "std")]
    IoError(heapless::String<128>),
}

/// Synchronous rejections returned by `submit_move` and control requests.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AdmissionError {
    /// Move queue has no free slot
    NoBufferSpace,
    /// Move is shorter than the configured minimum length
    MinimumLengthMove {
        /// Move length in mm
        length: f32,
    },
    /// Move would take less than one minimum segment at its cruise limit
    MinimumTimeMove {
        /// Move time in seconds
        time: f32,
    },
    /// Feed rate is zero, negative or not finite
    InvalidFeedRate(f32),
    /// Target is not finite or moves an unconfigured axis
    InvalidTarget(AxisId),
    /// Dwell time is negative or not finite
    InvalidDwell(f32),
    /// Target exceeds a soft limit with the reject policy
    SoftLimitExceeded {
        /// Offending axis
        axis: AxisId,
        /// Requested target in mm
        target: f32,
    },
    /// Motion is refused while alarmed or flushing
    NotAccepted,
}

/// Step output errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MotorError {
    /// Pin operation failed
    PinError,
    /// Motor index outside the output bank
    InvalidMotor(usize),
}

/// Real-time faults. Sticky until [`reset`](crate::MotionPlanner::reset).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Fault {
    /// A segment ran out before the loader published the next one
    StepStarvation,
    /// A step or direction pin write failed
    OutputFault,
}

impl Fault {
    pub(crate) const fn bit(self) -> u8 {
        match self {
            Fault::StepStarvation => 0x01,
            Fault::OutputFault => 0x02,
        }
    }

    pub(crate) fn from_bits(bits: u8) -> Option<Self> {
        if bits & Fault::StepStarvation.bit() != 0 {
            Some(Fault::StepStarvation)
        } else if bits & Fault::OutputFault.bit() != 0 {
            Some(Fault::OutputFault)
        } else {
            None
        }
    }
}

/// Numeric status codes reported to the front end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Status {
    /// Function completed successfully
    Ok = 0,
    /// Generic error
    Error = 1,
    /// Function would block, try again
    Eagain = 2,
    /// Nothing to do
    Noop = 3,
    /// Unrecoverable internal error
    InternalError = 20,
    /// Machine is alarmed
    Alarmed = 27,
    /// Input value out of range
    InputValueRangeError = 46,
    /// No space in the move queue
    NoBufferSpace = 51,
    /// Move is shorter than the minimum length
    MinimumLengthMove = 60,
    /// Move is shorter than the minimum time
    MinimumTimeMove = 61,
    /// Block skipped (zero length)
    BlockSkipped = 62,
    /// Feed rate missing or invalid
    FeedrateError = 64,
    /// Soft limit exceeded
    SoftLimitExceeded = 71,
    /// Command not accepted in the current state
    CommandNotAccepted = 72,
}

impl Status {
    /// Numeric code.
    #[inline]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Short human-readable message.
    pub const fn message(self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::Error => "Error",
            Status::Eagain => "Eagain",
            Status::Noop => "No operation performed",
            Status::InternalError => "Internal error",
            Status::Alarmed => "Machine is alarmed",
            Status::InputValueRangeError => "Input value range error",
            Status::NoBufferSpace => "No buffer space",
            Status::MinimumLengthMove => "Move less than minimum length",
            Status::MinimumTimeMove => "Move less than minimum time",
            Status::BlockSkipped => "Block skipped",
            Status::FeedrateError => "Feedrate error",
            Status::SoftLimitExceeded => "Soft limit exceeded",
            Status::CommandNotAccepted => "Command not accepted",
        }
    }
}

impl From<&AdmissionError> for Status {
    fn from(e: &AdmissionError) -> Self {
        match e {
            AdmissionError::NoBufferSpace => Status::NoBufferSpace,
            AdmissionError::MinimumLengthMove { .. } => Status::MinimumLengthMove,
            AdmissionError::MinimumTimeMove { .. } => Status::MinimumTimeMove,
            AdmissionError::InvalidFeedRate(_) => Status::FeedrateError,
            AdmissionError::InvalidTarget(_) | AdmissionError::InvalidDwell(_) => {
                Status::InputValueRangeError
            }
            AdmissionError::SoftLimitExceeded { .. } => Status::SoftLimitExceeded,
            AdmissionError::NotAccepted => Status::CommandNotAccepted,
        }
    }
}

impl From<&Error> for Status {
    fn from(e: &Error) -> Self {
        match e {
            Error::Config(_) => Status::Error,
            Error::Admission(a) => Status::from(a),
            Error::Motor(_) => Status::InternalError,
            Error::Fault(_) => Status::Alarmed,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(e) => write!(f, "Configuration error: {}", e),
            Error::Admission(e) => write!(f, "Move rejected: {}", e),
            Error::Motor(e) => write!(f, "Motor error: {}", e),
            Error::Fault(e) => write!(f, "Alarm: {}", e),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            ConfigError::InvalidMicrosteps(v) => {
                write!(f, "Invalid microsteps: {}. Valid values: 1, 2, 4, 8, 16, 32, 64, 128, 256", v)
            }
            ConfigError::UnknownAxis(name) => {
                write!(f, "Unknown axis '{}'. Valid axes: x, y, z, a, b, c", name)
            }
            ConfigError::DuplicateAxis(axis) => write!(f, "Axis {} configured twice", axis),
            ConfigError::AxisNotConfigured { motor, axis } => {
                write!(f, "Motor '{}' is bound to unconfigured axis '{}'", motor, axis)
            }
            ConfigError::NoMotors => write!(f, "No motors configured"),
            ConfigError::TooManyMotors(n) => write!(f, "{} motors configured, at most 6 supported", n),
            ConfigError::MotorCountMismatch { expected, found } => {
                write!(f, "Output context drives {} motors, configuration has {}", found, expected)
            }
            ConfigError::InvalidMaxVelocity(v) => write!(f, "Invalid max velocity: {}. Must be > 0", v),
            ConfigError::InvalidMaxAcceleration(v) => write!(f, "Invalid max acceleration: {}. Must be > 0", v),
            ConfigError::InvalidMaxJerk(v) => write!(f, "Invalid max jerk: {}. Must be > 0", v),
            ConfigError::InvalidSoftLimits { min, max } => {
                write!(f, "Invalid soft limits: min ({}) must be < max ({})", min, max)
            }
            ConfigError::InvalidStepAngle(v) => write!(f, "Invalid step angle: {}. Must be > 0", v),
            ConfigError::InvalidTravel(v) => write!(f, "Invalid travel per revolution: {}. Must be > 0", v),
            ConfigError::StepRateTooHigh { rate, max } => {
                write!(f, "Step rate {} steps/s exceeds pulse clock limit {}", rate, max)
            }
            ConfigError::InvalidFrequency(v) => write!(f, "Invalid pulse clock frequency: {} Hz", v),
            ConfigError::InvalidSegmentTiming { nominal_ms, min_ms } => {
                write!(f, "Invalid segment timing: nominal {} ms, minimum {} ms", nominal_ms, min_ms)
            }
            ConfigError::InvalidJunctionDeviation(v) => {
                write!(f, "Invalid junction deviation: {}. Must be >= 0", v)
            }
            ConfigError::InvalidMinLength(v) => write!(f, "Invalid minimum move length: {}. Must be > 0", v),
            #[cfg(feature = "std")]
            ConfigError::IoError(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl fmt::Display for AdmissionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdmissionError::NoBufferSpace => write!(f, "Move queue is full"),
            AdmissionError::MinimumLengthMove { length } => {
                write!(f, "Move of {} mm is below the minimum length", length)
            }
            AdmissionError::MinimumTimeMove { time } => {
                write!(f, "Move of {} s is below the minimum segment time", time)
            }
            AdmissionError::InvalidFeedRate(v) => write!(f, "Invalid feed rate: {}", v),
            AdmissionError::InvalidTarget(axis) => write!(f, "Invalid target on axis {}", axis),
            AdmissionError::InvalidDwell(v) => write!(f, "Invalid dwell time: {}", v),
            AdmissionError::SoftLimitExceeded { axis, target } => {
                write!(f, "Target {} on axis {} exceeds soft limits", target, axis)
            }
            AdmissionError::NotAccepted => write!(f, "Command not accepted in current state"),
        }
    }
}

impl fmt::Display for MotorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MotorError::PinError => write!(f, "GPIO pin operation failed"),
            MotorError::InvalidMotor(m) => write!(f, "No output for motor {}", m),
        }
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fault::StepStarvation => write!(f, "step generator starved"),
            Fault::OutputFault => write!(f, "step output failed"),
        }
    }
}

// Conversion impls
impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config(e)
    }
}

impl From<AdmissionError> for Error {
    fn from(e: AdmissionError) -> Self {
        Error::Admission(e)
    }
}

impl From<MotorError> for Error {
    fn from(e: MotorError) -> Self {
        Error::Motor(e)
    }
}

impl From<Fault> for Error {
    fn from(e: Fault) -> Self {
        Error::Fault(e)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

#[cfg(feature = "std")]
impl std::error::Error for ConfigError {}

#[cfg(feature = "std")]
impl std::error::Error for AdmissionError {}

#[cfg(feature = "std")]
impl std::error::Error for MotorError {}

#[cfg(feature = "std")]
impl std::error::Error for Fault {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(Status::Ok.code(), 0);
        assert_eq!(Status::Alarmed.code(), 27);
        assert_eq!(Status::NoBufferSpace.code(), 51);
        assert_eq!(Status::MinimumLengthMove.code(), 60);
        assert_eq!(Status::BlockSkipped.code(), 62);
        assert_eq!(Status::CommandNotAccepted.code(), 72);
    }

    #[test]
    fn test_admission_status_mapping() {
        let err = Error::from(AdmissionError::MinimumTimeMove { time: 0.0001 });
        assert_eq!(Status::from(&err), Status::MinimumTimeMove);

        let err = Error::from(AdmissionError::InvalidTarget(AxisId::Z));
        assert_eq!(Status::from(&err), Status::InputValueRangeError);

        let err = Error::from(Fault::StepStarvation);
        assert_eq!(Status::from(&err), Status::Alarmed);
    }

    #[test]
    fn test_fault_bits() {
        assert_eq!(Fault::from_bits(0), None);
        assert_eq!(Fault::from_bits(0x02), Some(Fault::OutputFault));
        assert_eq!(Fault::from_bits(0x03), Some(Fault::StepStarvation));
    }
}
