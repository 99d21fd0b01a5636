//! Axis identity and per-axis kinematic limits.

use core::fmt;

use serde::Deserialize;

use super::limits::SoftLimits;
use super::units::{MmPerSec, MmPerSec2, MmPerSec3};
use crate::MAX_AXES;

/// Position or direction vector with one entry per axis, in mm.
pub type AxisVector = [f32; MAX_AXES];

/// Machine axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AxisId {
    /// X linear axis
    X,
    /// Y linear axis
    Y,
    /// Z linear axis
    Z,
    /// A axis
    A,
    /// B axis
    B,
    /// C axis
    C,
}

impl AxisId {
    /// All axes in index order.
    pub const ALL: [AxisId; MAX_AXES] = [
        AxisId::X,
        AxisId::Y,
        AxisId::Z,
        AxisId::A,
        AxisId::B,
        AxisId::C,
    ];

    /// Index into an [`AxisVector`].
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Axis for an index.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Parse a config table key such as `x` or `Z`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "x" | "X" => Some(AxisId::X),
            "y" | "Y" => Some(AxisId::Y),
            "z" | "Z" => Some(AxisId::Z),
            "a" | "A" => Some(AxisId::A),
            "b" | "B" => Some(AxisId::B),
            "c" | "C" => Some(AxisId::C),
            _ => None,
        }
    }

    /// Upper-case axis letter.
    pub const fn letter(self) -> char {
        match self {
            AxisId::X => 'X',
            AxisId::Y => 'Y',
            AxisId::Z => 'Z',
            AxisId::A => 'A',
            AxisId::B => 'B',
            AxisId::C => 'C',
        }
    }
}

impl fmt::Display for AxisId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// Per-axis limits from TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct AxisConfig {
    /// Maximum velocity in mm/s.
    #[serde(rename = "max_velocity_mm_per_sec")]
    pub max_velocity: MmPerSec,

    /// Maximum acceleration in mm/s².
    #[serde(rename = "max_acceleration_mm_per_sec2")]
    pub max_acceleration: MmPerSec2,

    /// Maximum jerk in mm/s³.
    #[serde(rename = "max_jerk_mm_per_sec3")]
    pub max_jerk: MmPerSec3,

    /// Optional soft limits.
    #[serde(default)]
    pub limits: Option<SoftLimits>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_names() {
        assert_eq!(AxisId::from_name("x"), Some(AxisId::X));
        assert_eq!(AxisId::from_name("C"), Some(AxisId::C));
        assert_eq!(AxisId::from_name("u"), None);
        assert_eq!(AxisId::from_name("xy"), None);
    }

    #[test]
    fn test_axis_index_round_trip() {
        for axis in AxisId::ALL {
            assert_eq!(AxisId::from_index(axis.index()), Some(axis));
        }
        assert_eq!(AxisId::from_index(MAX_AXES), None);
    }
}
