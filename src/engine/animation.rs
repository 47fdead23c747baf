//! Threshold-gated, restartable transitions for the dial's animated values.
//!
//! The controller never keeps time. A scheduler (see [`Timeline`]) turns
//! elapsed time into an eased [`Progress`] and hands it to
//! [`AnimationController::tick`].

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::trig::{Angle, TRIG_MAX_ANGLE};

/// Normalized transition progress in `[0, Progress::MAX]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Progress(u32);

impl Progress {
    pub const MAX: u32 = 0xffff;
    #[cfg(test)]
    pub const START: Progress = Progress(0);
    pub const END: Progress = Progress(Self::MAX);

    pub fn new(raw: u32) -> Self {
        Progress(raw.min(Self::MAX))
    }

    pub fn raw(self) -> u32 {
        self.0
    }

    pub fn is_end(self) -> bool {
        self.0 == Self::MAX
    }
}

/// Progress-shaping curve applied by the scheduler before ticking.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Curve {
    Linear,
    EaseIn,
    EaseOut,
    #[default]
    EaseInOut,
}

impl Curve {
    /// Cubic easing in integer arithmetic; both endpoints map to themselves.
    pub fn apply(self, progress: Progress) -> Progress {
        let m = Progress::MAX as u64;
        let t = progress.raw() as u64;
        let eased = match self {
            Curve::Linear => t,
            Curve::EaseIn => t * t * t / (m * m),
            Curve::EaseOut => {
                let r = m - t;
                m - r * r * r / (m * m)
            }
            Curve::EaseInOut => {
                if 2 * t < m {
                    4 * t * t * t / (m * m)
                } else {
                    let r = m - t;
                    m - 4 * r * r * r / (m * m)
                }
            }
        };
        Progress::new(eased as u32)
    }
}

/// A value the controller can blend and compare against a snap threshold.
pub trait Interpolate: Copy + PartialEq {
    type Distance: PartialOrd + Copy;

    /// Blend from `from` toward `to`; exact at both ends of `t`.
    fn interpolate(from: Self, to: Self, t: Progress) -> Self;

    fn distance(self, other: Self) -> Self::Distance;
}

impl Interpolate for i16 {
    type Distance = u16;

    fn interpolate(from: Self, to: Self, t: Progress) -> Self {
        let span = to as i64 - from as i64;
        (from as i64 + span * t.raw() as i64 / Progress::MAX as i64) as i16
    }

    fn distance(self, other: Self) -> u16 {
        (self as i32 - other as i32).unsigned_abs() as u16
    }
}

impl Interpolate for Angle {
    type Distance = u32;

    /// Turns the short way around, so crossing midnight never spins backward.
    fn interpolate(from: Self, to: Self, t: Progress) -> Self {
        let span = from.delta_to(to) as i64;
        Angle::from_signed(from.raw() as i64 + span * t.raw() as i64 / Progress::MAX as i64)
    }

    fn distance(self, other: Self) -> u32 {
        Angle::distance(self, other)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimatedScalar<T> {
    pub from: T,
    pub to: T,
    pub current: T,
}

impl<T: Interpolate> AnimatedScalar<T> {
    pub fn snapped(value: T) -> Self {
        Self {
            from: value,
            to: value,
            current: value,
        }
    }

    fn snap(&mut self, value: T) {
        *self = Self::snapped(value);
    }

    /// Start a new leg from wherever the value is now.
    fn retarget(&mut self, target: T) {
        self.from = self.current;
        self.to = target;
    }

    fn step(&mut self, t: Progress) {
        self.current = T::interpolate(self.from, self.to, t);
    }

    fn is_near(&self, target: T, threshold: T::Distance) -> bool {
        self.current.distance(target) < threshold
    }
}

/// How reconfigurations turn into motion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimationPolicy {
    /// Horizon moves smaller than this many pixels snap.
    pub horizon_threshold: u16,
    /// Rotations smaller than this many angle units snap.
    pub kilter_threshold: u32,
    pub duration: Duration,
    pub curve: Curve,
}

impl Default for AnimationPolicy {
    fn default() -> Self {
        Self {
            horizon_threshold: 4,
            kilter_threshold: TRIG_MAX_ANGLE / 60,
            duration: Duration::from_millis(1000),
            curve: Curve::EaseInOut,
        }
    }
}

/// A transition the caller must drive to completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub duration: Duration,
    pub curve: Curve,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconfigure {
    /// Targets were close enough to assign directly.
    Snapped,
    /// A transition was scheduled; tick it until progress reaches the end.
    Scheduled(Transition),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Animating,
}

/// Values the renderer reads after each tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Visible {
    pub above: i16,
    pub below: i16,
    pub rotation: Angle,
}

/// The three dial scalars, moved together by one shared transition clock.
#[derive(Debug, Clone)]
pub struct AnimationController {
    policy: AnimationPolicy,
    above: AnimatedScalar<i16>,
    below: AnimatedScalar<i16>,
    rotation: AnimatedScalar<Angle>,
    phase: Phase,
    dirty: bool,
}

impl AnimationController {
    pub fn new(policy: AnimationPolicy, above: i16, below: i16, rotation: Angle) -> Self {
        Self {
            policy,
            above: AnimatedScalar::snapped(above),
            below: AnimatedScalar::snapped(below),
            rotation: AnimatedScalar::snapped(rotation),
            phase: Phase::Idle,
            dirty: true,
        }
    }

    pub fn reconfigure(&mut self, horizon: i16, kilter: Angle) -> Reconfigure {
        let threshold = self.policy.horizon_threshold;
        let near = self.above.is_near(horizon, threshold)
            && self.below.is_near(horizon, threshold)
            && self.rotation.is_near(kilter, self.policy.kilter_threshold);

        if near {
            self.above.snap(horizon);
            self.below.snap(horizon);
            self.rotation.snap(kilter);
            self.phase = Phase::Idle;
            self.dirty = true;
            return Reconfigure::Snapped;
        }

        self.above.retarget(horizon);
        self.below.retarget(horizon);
        self.rotation.retarget(kilter);
        self.phase = Phase::Animating;

        Reconfigure::Scheduled(Transition {
            duration: self.policy.duration,
            curve: self.policy.curve,
        })
    }

    /// Blend all three values to `progress`. Always leaves the controller dirty.
    pub fn tick(&mut self, progress: Progress) -> Visible {
        self.above.step(progress);
        self.below.step(progress);
        self.rotation.step(progress);
        if progress.is_end() {
            self.phase = Phase::Idle;
        }
        self.dirty = true;
        self.visible()
    }

    pub fn visible(&self) -> Visible {
        Visible {
            above: self.above.current,
            below: self.below.current,
            rotation: self.rotation.current,
        }
    }

    /// Returns whether a redraw was requested since the last call.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[cfg(test)]
    pub fn policy(&self) -> &AnimationPolicy {
        &self.policy
    }

    #[cfg(test)]
    pub fn above(&self) -> &AnimatedScalar<i16> {
        &self.above
    }

    #[cfg(test)]
    pub fn below(&self) -> &AnimatedScalar<i16> {
        &self.below
    }

    #[cfg(test)]
    pub fn rotation(&self) -> &AnimatedScalar<Angle> {
        &self.rotation
    }
}

/// Maps elapsed wall time onto eased progress for one [`Transition`].
#[derive(Debug, Clone, Copy)]
pub struct Timeline {
    transition: Transition,
}

impl Timeline {
    pub fn new(transition: Transition) -> Self {
        Self { transition }
    }

    /// Eased progress at `elapsed`, and whether the transition is over.
    pub fn progress_at(&self, elapsed: Duration) -> (Progress, bool) {
        let total = self.transition.duration.as_micros();
        if total == 0 || elapsed.as_micros() >= total {
            return (Progress::END, true);
        }
        let linear = Progress::new((elapsed.as_micros() * Progress::MAX as u128 / total) as u32);
        (self.transition.curve.apply(linear), false)
    }
}
