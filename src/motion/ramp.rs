//! Jerk-limited velocity ramps.
//!
//! A [`Ramp`] changes velocity from `v0` to `v1` in up to three phases:
//! constant jerk, constant acceleration, constant jerk of opposite sign.
//! When the velocity change is too small to reach the acceleration limit the
//! middle phase vanishes and the ramp is a pure S.

use libm::{fabsf, sqrtf};

/// Bisection iterations used by the velocity solvers.
pub(crate) const SOLVER_ITERATIONS: usize = 24;

/// Relative slack when comparing a ramp length against available distance.
const LENGTH_TOLERANCE: f32 = 1e-5;

/// Whether a move of `length` fits into `available` distance.
#[inline]
pub(crate) fn fits(length: f32, available: f32) -> bool {
    length <= available * (1.0 + LENGTH_TOLERANCE)
}

/// Acceleration and jerk limits along a path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Kinematics {
    /// Maximum acceleration in mm/s².
    pub acceleration: f32,
    /// Maximum jerk in mm/s³.
    pub jerk: f32,
}

impl Kinematics {
    /// Create kinematic limits.
    #[inline]
    pub const fn new(acceleration: f32, jerk: f32) -> Self {
        Self { acceleration, jerk }
    }

    /// Element-wise minimum of two limit sets.
    #[inline]
    pub fn min(self, other: Self) -> Self {
        Self {
            acceleration: self.acceleration.min(other.acceleration),
            jerk: self.jerk.min(other.jerk),
        }
    }

    /// Ramp from `v0` to `v1` under these limits.
    #[inline]
    pub fn ramp(&self, v0: f32, v1: f32) -> Ramp {
        Ramp::new(v0, v1, *self)
    }

    /// Distance covered while changing velocity from `v0` to `v1`.
    #[inline]
    pub fn ramp_length(&self, v0: f32, v1: f32) -> f32 {
        let (t_jerk, t_accel, _) = self.phase_times(fabsf(v1 - v0));
        (v0 + v1) * 0.5 * (2.0 * t_jerk + t_accel)
    }

    /// Highest velocity reachable from `v0` within `length`, at most `cap`.
    pub fn achievable_velocity(&self, v0: f32, length: f32, cap: f32) -> f32 {
        if cap <= v0 || fits(self.ramp_length(v0, cap), length) {
            return cap;
        }

        let mut lo = v0;
        let mut hi = cap;
        for _ in 0..SOLVER_ITERATIONS {
            let mid = 0.5 * (lo + hi);
            if fits(self.ramp_length(v0, mid), length) {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        lo
    }

    /// Highest entry velocity that can still slow to `v_exit` within `length`,
    /// at most `cap`.
    ///
    /// Ramps are symmetric in time, so this is the acceleration problem run
    /// backwards from the exit.
    #[inline]
    pub fn braking_velocity(&self, v_exit: f32, length: f32, cap: f32) -> f32 {
        self.achievable_velocity(v_exit, length, cap)
    }

    /// Lowest velocity reachable from `v` within `length`, at least `floor`.
    pub fn decel_floor(&self, v: f32, length: f32, floor: f32) -> f32 {
        if floor >= v || fits(self.ramp_length(v, floor), length) {
            return floor;
        }

        let mut lo = floor;
        let mut hi = v;
        for _ in 0..SOLVER_ITERATIONS {
            let mid = 0.5 * (lo + hi);
            if fits(self.ramp_length(v, mid), length) {
                hi = mid;
            } else {
                lo = mid;
            }
        }
        hi
    }

    /// Highest peak velocity, at most `cap`, of a profile that starts at
    /// `entry` and ends at `exit` within `length`.
    ///
    /// `exit` must already be reachable from `entry`.
    pub fn peak_velocity(&self, entry: f32, exit: f32, cap: f32, length: f32) -> f32 {
        let floor = entry.max(exit);
        if cap <= floor {
            return floor;
        }

        let total = |peak: f32| self.ramp_length(entry, peak) + self.ramp_length(peak, exit);
        if fits(total(cap), length) {
            return cap;
        }

        let mut lo = floor;
        let mut hi = cap;
        for _ in 0..SOLVER_ITERATIONS {
            let mid = 0.5 * (lo + hi);
            if fits(total(mid), length) {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        lo
    }

    /// Jerk phase time, constant-acceleration time and peak acceleration for
    /// a velocity change of `dv`.
    fn phase_times(&self, dv: f32) -> (f32, f32, f32) {
        if dv <= 0.0 || self.jerk <= 0.0 || self.acceleration <= 0.0 {
            return (0.0, 0.0, 0.0);
        }

        let a = self.acceleration;
        let j = self.jerk;
        if dv * j <= a * a {
            let t_jerk = sqrtf(dv / j);
            (t_jerk, 0.0, j * t_jerk)
        } else {
            (a / j, dv / a - a / j, a)
        }
    }
}

/// A single jerk-limited velocity change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ramp {
    /// Start velocity in mm/s.
    pub v0: f32,
    /// End velocity in mm/s.
    pub v1: f32,
    jerk: f32,
    peak_accel: f32,
    t_jerk: f32,
    t_accel: f32,
}

impl Ramp {
    /// Create a ramp from `v0` to `v1`.
    pub fn new(v0: f32, v1: f32, kin: Kinematics) -> Self {
        let (t_jerk, t_accel, peak_accel) = kin.phase_times(fabsf(v1 - v0));
        Self {
            v0,
            v1,
            jerk: kin.jerk,
            peak_accel,
            t_jerk,
            t_accel,
        }
    }

    /// Total ramp time in seconds.
    #[inline]
    pub fn duration(&self) -> f32 {
        2.0 * self.t_jerk + self.t_accel
    }

    /// Distance covered in mm.
    #[inline]
    pub fn length(&self) -> f32 {
        (self.v0 + self.v1) * 0.5 * self.duration()
    }

    /// Whether the ramp reaches the acceleration limit.
    #[inline]
    pub fn has_constant_phase(&self) -> bool {
        self.t_accel > 0.0
    }

    #[inline]
    fn sign(&self) -> f32 {
        if self.v1 >= self.v0 {
            1.0
        } else {
            -1.0
        }
    }

    /// Distance covered after `t` seconds.
    pub fn position_at(&self, t: f32) -> f32 {
        if t <= 0.0 {
            return 0.0;
        }
        if t >= self.duration() {
            return self.length();
        }

        let s = self.sign();
        let j = self.jerk;
        let tj = self.t_jerk;
        let ap = self.peak_accel;

        if t < tj {
            return self.v0 * t + s * j * t * t * t / 6.0;
        }

        let x1 = self.v0 * tj + s * j * tj * tj * tj / 6.0;
        let va = self.v0 + s * j * tj * tj * 0.5;
        let tau = t - tj;
        if tau < self.t_accel {
            return x1 + va * tau + s * ap * tau * tau * 0.5;
        }

        let ta = self.t_accel;
        let x2 = x1 + va * ta + s * ap * ta * ta * 0.5;
        let vb = va + s * ap * ta;
        let tau = tau - ta;
        x2 + vb * tau + s * (ap * tau * tau * 0.5 - j * tau * tau * tau / 6.0)
    }

    /// Velocity after `t` seconds.
    pub fn velocity_at(&self, t: f32) -> f32 {
        if t <= 0.0 {
            return self.v0;
        }
        if t >= self.duration() {
            return self.v1;
        }

        let s = self.sign();
        let j = self.jerk;
        let tj = self.t_jerk;
        let ap = self.peak_accel;

        if t < tj {
            return self.v0 + s * j * t * t * 0.5;
        }

        let va = self.v0 + s * j * tj * tj * 0.5;
        let tau = t - tj;
        if tau < self.t_accel {
            return va + s * ap * tau;
        }

        let vb = va + s * ap * self.t_accel;
        let tau = tau - self.t_accel;
        vb + s * (ap * tau - j * tau * tau * 0.5)
    }

    /// Signed acceleration after `t` seconds.
    pub fn acceleration_at(&self, t: f32) -> f32 {
        if t <= 0.0 || t >= self.duration() {
            return 0.0;
        }

        let s = self.sign();
        let tj = self.t_jerk;
        if t < tj {
            return s * self.jerk * t;
        }
        let tau = t - tj;
        if tau < self.t_accel {
            return s * self.peak_accel;
        }
        s * (self.peak_accel - self.jerk * (tau - self.t_accel))
    }
}
