//! Seven-phase velocity profiles.
//!
//! A [`Profile`] is a head ramp (entry to cruise), a constant-velocity body
//! and a tail ramp (cruise to exit). Each ramp contributes up to three
//! phases.

use super::ramp::{Kinematics, Ramp};

/// Section of a profile at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Section {
    /// Changing velocity from entry to cruise.
    Head,
    /// Constant cruise velocity.
    Body,
    /// Changing velocity from cruise to exit.
    Tail,
}

/// Velocity profile over one move.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Profile {
    /// Entry velocity in mm/s.
    pub entry: f32,
    /// Peak velocity in mm/s.
    pub cruise: f32,
    /// Exit velocity in mm/s.
    pub exit: f32,
    /// Total distance in mm.
    pub length: f32,
    /// Entry to cruise.
    pub head: Ramp,
    /// Cruise to exit.
    pub tail: Ramp,
    /// Distance at cruise velocity in mm.
    pub body_length: f32,
    triangular: bool,
}

impl Profile {
    /// Fit a profile to `length`.
    ///
    /// The exit is clamped into the range reachable from `entry`, and the peak
    /// is the highest velocity up to `cruise_cap` that still leaves room to
    /// reach the exit. A cap below the entry is raised to the entry.
    pub fn fit(entry: f32, cruise_cap: f32, exit_target: f32, length: f32, kin: Kinematics) -> Self {
        let length = length.max(0.0);
        let cap = cruise_cap.max(entry);

        let mut exit = exit_target.min(cap).max(0.0);
        if exit > entry {
            exit = kin.achievable_velocity(entry, length, exit);
        } else if exit < entry {
            exit = kin.decel_floor(entry, length, exit);
        }

        let peak = kin.peak_velocity(entry, exit, cap, length);
        let head = kin.ramp(entry, peak);
        let tail = kin.ramp(peak, exit);
        let body_length = (length - head.length() - tail.length()).max(0.0);

        Self {
            entry,
            cruise: peak,
            exit,
            length,
            head,
            tail,
            body_length,
            triangular: peak < cap,
        }
    }

    /// Whether the cruise cap was not reached.
    #[inline]
    pub fn is_triangular(&self) -> bool {
        self.triangular
    }

    /// Head ramp duration in seconds.
    #[inline]
    pub fn head_time(&self) -> f32 {
        self.head.duration()
    }

    /// Body duration in seconds.
    #[inline]
    pub fn body_time(&self) -> f32 {
        if self.cruise > 0.0 {
            self.body_length / self.cruise
        } else {
            0.0
        }
    }

    /// Tail ramp duration in seconds.
    #[inline]
    pub fn tail_time(&self) -> f32 {
        self.tail.duration()
    }

    /// Total duration in seconds.
    #[inline]
    pub fn duration(&self) -> f32 {
        self.head_time() + self.body_time() + self.tail_time()
    }

    /// Time at which the tail starts.
    #[inline]
    pub fn tail_start(&self) -> f32 {
        self.head_time() + self.body_time()
    }

    /// Section active at time `t`.
    pub fn section_at(&self, t: f32) -> Section {
        if t < self.head_time() {
            Section::Head
        } else if t < self.tail_start() {
            Section::Body
        } else {
            Section::Tail
        }
    }

    /// Distance covered after `t` seconds, never beyond `length`.
    pub fn position_at(&self, t: f32) -> f32 {
        let head_time = self.head_time();
        let position = if t < head_time {
            self.head.position_at(t)
        } else if t < self.tail_start() {
            self.head.length() + self.cruise * (t - head_time)
        } else {
            self.head.length() + self.body_length + self.tail.position_at(t - self.tail_start())
        };
        position.min(self.length)
    }

    /// Velocity after `t` seconds.
    pub fn velocity_at(&self, t: f32) -> f32 {
        match self.section_at(t) {
            Section::Head => self.head.velocity_at(t),
            Section::Body => self.cruise,
            Section::Tail => self.tail.velocity_at(t - self.tail_start()),
        }
    }

    /// Signed acceleration after `t` seconds.
    pub fn acceleration_at(&self, t: f32) -> f32 {
        match self.section_at(t) {
            Section::Head => self.head.acceleration_at(t),
            Section::Body => 0.0,
            Section::Tail => self.tail.acceleration_at(t - self.tail_start()),
        }
    }
}

/// Controlled stop from a live velocity and acceleration.
///
/// Acceleration still in progress is first wound down to zero at the jerk
/// limit, then a ramp brings the path to rest. A stop never starts while
/// decelerating, so negative acceleration is treated as zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StopProfile {
    /// Velocity when the stop starts, in mm/s.
    pub velocity: f32,
    /// Acceleration when the stop starts, in mm/s².
    pub acceleration: f32,
    jerk: f32,
    settle_time: f32,
    settle_length: f32,
    /// Settled velocity to rest.
    pub ramp: Ramp,
}

impl StopProfile {
    /// Stop as quickly as `kin` allows.
    pub fn new(velocity: f32, acceleration: f32, kin: Kinematics) -> Self {
        let acceleration = acceleration.max(0.0);
        let jerk = kin.jerk;
        let settle_time = if jerk > 0.0 { acceleration / jerk } else { 0.0 };
        let t = settle_time;
        let settle_length = velocity * t + acceleration * t * t * 0.5 - jerk * t * t * t / 6.0;
        let settled = velocity + acceleration * t * 0.5;

        Self {
            velocity,
            acceleration,
            jerk,
            settle_time,
            settle_length,
            ramp: kin.ramp(settled, 0.0),
        }
    }

    /// Highest velocity reached, in mm/s.
    #[inline]
    pub fn peak(&self) -> f32 {
        self.ramp.v0
    }

    /// Total duration in seconds.
    #[inline]
    pub fn duration(&self) -> f32 {
        self.settle_time + self.ramp.duration()
    }

    /// Stopping distance in mm.
    #[inline]
    pub fn length(&self) -> f32 {
        self.settle_length + self.ramp.length()
    }

    /// Distance covered after `t` seconds, never beyond `length`.
    pub fn position_at(&self, t: f32) -> f32 {
        if t <= 0.0 {
            return 0.0;
        }
        let position = if t < self.settle_time {
            self.velocity * t + self.acceleration * t * t * 0.5 - self.jerk * t * t * t / 6.0
        } else {
            self.settle_length + self.ramp.position_at(t - self.settle_time)
        };
        position.min(self.length())
    }

    /// Velocity after `t` seconds.
    pub fn velocity_at(&self, t: f32) -> f32 {
        if t <= 0.0 {
            return self.velocity;
        }
        if t < self.settle_time {
            self.velocity + self.acceleration * t - self.jerk * t * t * 0.5
        } else {
            self.ramp.velocity_at(t - self.settle_time)
        }
    }

    /// Signed acceleration after `t` seconds.
    pub fn acceleration_at(&self, t: f32) -> f32 {
        if t <= 0.0 {
            return self.acceleration;
        }
        if t < self.settle_time {
            self.acceleration - self.jerk * t
        } else {
            self.ramp.acceleration_at(t - self.settle_time)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kin() -> Kinematics {
        Kinematics::new(1000.0, 50_000.0)
    }

    #[test]
    fn test_trapezoid_reaches_cruise() {
        let profile = Profile::fit(0.0, 100.0, 0.0, 50.0, kin());

        assert!(!profile.is_triangular());
        assert_eq!(profile.cruise, 100.0);
        assert!(profile.body_length > 0.0);
        assert!((profile.position_at(profile.duration()) - 50.0).abs() < 1e-4);
    }

    #[test]
    fn test_short_move_is_triangular() {
        let profile = Profile::fit(0.0, 100.0, 0.0, 1.0, kin());

        assert!(profile.is_triangular());
        assert!(profile.cruise < 100.0);
        assert!(profile.body_length < 0.01);
    }

    #[test]
    fn test_infeasible_exit_is_clamped() {
        // Cannot reach 100 mm/s from rest in 0.1 mm
        let profile = Profile::fit(0.0, 100.0, 100.0, 0.1, kin());
        assert!(profile.exit < 100.0);
        assert!(profile.exit > 0.0);

        // Cannot stop from 100 mm/s in 0.1 mm
        let profile = Profile::fit(100.0, 100.0, 0.0, 0.1, kin());
        assert!(profile.exit > 0.0);
    }

    #[test]
    fn test_cap_below_entry_is_raised() {
        let profile = Profile::fit(60.0, 40.0, 0.0, 50.0, kin());
        assert_eq!(profile.cruise, 60.0);
        assert_eq!(profile.exit, 0.0);
    }

    #[test]
    fn test_sections_cover_duration() {
        let profile = Profile::fit(10.0, 80.0, 30.0, 20.0, kin());

        assert_eq!(profile.section_at(0.0), Section::Head);
        assert_eq!(profile.section_at(profile.head_time() + 1e-4), Section::Body);
        assert_eq!(profile.section_at(profile.duration()), Section::Tail);
        assert!((profile.velocity_at(profile.duration()) - 30.0).abs() < 1e-4);
    }

    #[test]
    fn test_stop_from_cruise() {
        let stop = StopProfile::new(80.0, 0.0, kin());

        assert_eq!(stop.peak(), 80.0);
        assert_eq!(stop.length(), kin().ramp_length(80.0, 0.0));
        assert_eq!(stop.velocity_at(stop.duration()), 0.0);
        assert_eq!(stop.acceleration_at(0.0), 0.0);
    }

    #[test]
    fn test_stop_while_accelerating_winds_acceleration_down() {
        let stop = StopProfile::new(40.0, 1000.0, kin());

        // 1000² / (2 · 50000) = 10 mm/s gained while the acceleration falls
        assert!((stop.peak() - 50.0).abs() < 1e-3);
        assert!(stop.length() > kin().ramp_length(50.0, 0.0));
        assert!((stop.velocity_at(stop.duration()) - 0.0).abs() < 1e-4);

        // Acceleration changes no faster than the jerk limit
        let dt = stop.duration() / 200.0;
        let mut last = stop.acceleration_at(0.0);
        for i in 1..=200 {
            let a = stop.acceleration_at(dt * i as f32);
            assert!((a - last).abs() <= 50_000.0 * dt * 1.01 + 1e-3);
            assert!(a.abs() <= 1000.0 + 1e-3);
            last = a;
        }
        assert!((stop.position_at(stop.duration()) - stop.length()).abs() < 1e-4);
    }

    #[test]
    fn test_stop_ignores_deceleration() {
        let stop = StopProfile::new(30.0, -500.0, kin());
        assert_eq!(stop.acceleration, 0.0);
        assert_eq!(stop.peak(), 30.0);
    }
}
