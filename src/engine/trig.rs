//! Fixed-point trigonometry and polar projection.
//!
//! Angles are measured clockwise from midnight over a full circle of
//! [`TRIG_MAX_ANGLE`] units. Screen coordinates are [`Fixed`] values with
//! [`FIXED_SHIFT`] fractional bits.

use serde::{Deserialize, Serialize};
use std::ops::Add;
use std::sync::LazyLock;

/// Fixed-point scalar shared by radii and screen coordinates.
pub type Fixed = i32;

pub const FIXED_SHIFT: u32 = 4;
pub const FIX1: Fixed = 1 << FIXED_SHIFT;

/// Units in one full turn.
pub const TRIG_MAX_ANGLE: u32 = 0x1_0000;
/// Value of `sin` at a quarter turn.
pub const TRIG_MAX_RATIO: i32 = 0xffff;

const QUARTER: u32 = TRIG_MAX_ANGLE / 4;
const MINUTES_PER_DAY: i32 = 24 * 60;

#[inline]
pub const fn int_to_fixed(v: i32) -> Fixed {
    v << FIXED_SHIFT
}

#[inline]
pub const fn fixed_to_int(v: Fixed) -> i32 {
    v >> FIXED_SHIFT
}

/// First quadrant of the sine wave; the other three are mirrored from it so
/// that quarter turns land on exact values.
static SINE_QUADRANT: LazyLock<Vec<i32>> = LazyLock::new(|| {
    let step = std::f64::consts::FRAC_PI_2 / QUARTER as f64;
    (0..=QUARTER)
        .map(|i| (TRIG_MAX_RATIO as f64 * (i as f64 * step).sin()).round() as i32)
        .collect()
});

/// An angle in `[0, TRIG_MAX_ANGLE)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Angle(u32);

impl Angle {
    pub const ZERO: Angle = Angle(0);
    #[cfg(test)]
    pub const HALF: Angle = Angle(TRIG_MAX_ANGLE / 2);

    /// Wrap any raw value into the full-circle range.
    #[inline]
    pub const fn new(raw: u32) -> Self {
        Angle(raw % TRIG_MAX_ANGLE)
    }

    /// Wrap a signed raw value into the full-circle range.
    #[inline]
    pub fn from_signed(raw: i64) -> Self {
        Angle(raw.rem_euclid(TRIG_MAX_ANGLE as i64) as u32)
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Convert hours to angle, measured clockwise from midnight.
    pub fn from_hour(hour: i32) -> Self {
        let hour = hour.rem_euclid(24) as u32;
        Angle(hour * TRIG_MAX_ANGLE / 24)
    }

    /// Convert minutes to angle, measured clockwise from midnight.
    pub fn from_minute(minute: i32) -> Self {
        let minute = minute.rem_euclid(MINUTES_PER_DAY) as u32;
        Angle(minute * TRIG_MAX_ANGLE / MINUTES_PER_DAY as u32)
    }

    /// Signed shortest turn from `self` to `to`, in `(-HALF, HALF]`.
    pub fn delta_to(self, to: Angle) -> i32 {
        let diff = (to.0 as i64 - self.0 as i64).rem_euclid(TRIG_MAX_ANGLE as i64);
        if diff > (TRIG_MAX_ANGLE / 2) as i64 {
            (diff - TRIG_MAX_ANGLE as i64) as i32
        } else {
            diff as i32
        }
    }

    /// Minimal angular distance, never more than half a turn.
    pub fn distance(self, other: Angle) -> u32 {
        self.delta_to(other).unsigned_abs()
    }
}

impl Add for Angle {
    type Output = Angle;

    fn add(self, rhs: Angle) -> Angle {
        Angle::new(self.0 + rhs.0)
    }
}

pub fn sin_lookup(angle: Angle) -> i32 {
    let a = angle.raw();
    let idx = (a % QUARTER) as usize;
    let table = &*SINE_QUADRANT;
    match a / QUARTER {
        0 => table[idx],
        1 => table[QUARTER as usize - idx],
        2 => -table[idx],
        _ => -table[QUARTER as usize - idx],
    }
}

pub fn cos_lookup(angle: Angle) -> i32 {
    sin_lookup(Angle::new(angle.raw() + QUARTER))
}

/// A point in fixed-point screen coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct FPoint {
    pub x: Fixed,
    pub y: Fixed,
}

impl FPoint {
    pub const fn new(x: Fixed, y: Fixed) -> Self {
        Self { x, y }
    }

    #[cfg(test)]
    pub const fn from_pixels(x: i32, y: i32) -> Self {
        Self {
            x: int_to_fixed(x),
            y: int_to_fixed(y),
        }
    }
}

/// Place a point on the circle of `radius` around `center`.
/// Midnight (angle zero) sits at `center.y + radius`, noon at `center.y - radius`.
pub fn project(center: FPoint, radius: Fixed, angle: Angle) -> FPoint {
    let s = sin_lookup(angle) as i64;
    let c = cos_lookup(angle) as i64;
    let r = radius as i64;
    FPoint {
        x: center.x - (s * r / TRIG_MAX_RATIO as i64) as Fixed,
        y: center.y + (c * r / TRIG_MAX_RATIO as i64) as Fixed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hour_angles_wrap_every_day() {
        assert_eq!(Angle::from_hour(0), Angle::ZERO);
        assert_eq!(Angle::from_hour(12), Angle::HALF);
        for h in -48..72 {
            assert_eq!(Angle::from_hour(h), Angle::from_hour(h.rem_euclid(24)), "hour {}", h);
        }
    }

    #[test]
    fn minute_angles_handle_out_of_range_days() {
        assert_eq!(Angle::from_minute(0), Angle::ZERO);
        assert_eq!(Angle::from_minute(720), Angle::HALF);
        assert_eq!(Angle::from_minute(360).raw(), TRIG_MAX_ANGLE / 4);
        assert_eq!(Angle::from_minute(-60), Angle::from_minute(1380));
        assert_eq!(Angle::from_minute(1500), Angle::from_minute(60));
    }

    #[test]
    fn quarter_turns_are_exact() {
        assert_eq!(sin_lookup(Angle::ZERO), 0);
        assert_eq!(cos_lookup(Angle::ZERO), TRIG_MAX_RATIO);
        assert_eq!(sin_lookup(Angle::new(QUARTER)), TRIG_MAX_RATIO);
        assert_eq!(cos_lookup(Angle::HALF), -TRIG_MAX_RATIO);
        assert_eq!(sin_lookup(Angle::new(3 * QUARTER)), -TRIG_MAX_RATIO);
    }

    #[test]
    fn sine_is_odd_around_the_circle() {
        for raw in (0..TRIG_MAX_ANGLE).step_by(97) {
            let a = Angle::new(raw);
            let mirrored = Angle::from_signed(-(raw as i64));
            assert_eq!(sin_lookup(a), -sin_lookup(mirrored), "angle {}", raw);
        }
    }

    #[test]
    fn projection_at_zero_is_one_radius_along_y() {
        let center = FPoint::from_pixels(90, 90);
        let r = int_to_fixed(75);
        assert_eq!(project(center, r, Angle::ZERO), FPoint::new(center.x, center.y + r));
        assert_eq!(project(center, r, Angle::HALF), FPoint::new(center.x, center.y - r));
        assert_eq!(
            project(center, r, Angle::new(QUARTER)),
            FPoint::new(center.x - r, center.y)
        );
    }

    #[test]
    fn projection_ignores_full_turns() {
        let center = FPoint::from_pixels(72, 84);
        let r = int_to_fixed(61);
        for raw in (0..TRIG_MAX_ANGLE).step_by(1013) {
            assert_eq!(
                project(center, r, Angle::new(raw)),
                project(center, r, Angle::new(raw + TRIG_MAX_ANGLE))
            );
        }
    }

    #[test]
    fn shortest_turn_crosses_zero() {
        let near_end = Angle::new(TRIG_MAX_ANGLE - 100);
        let past_zero = Angle::new(50);
        assert_eq!(near_end.delta_to(past_zero), 150);
        assert_eq!(past_zero.delta_to(near_end), -150);
        assert_eq!(near_end.distance(past_zero), 150);
        assert_eq!(Angle::ZERO.delta_to(Angle::HALF), (TRIG_MAX_ANGLE / 2) as i32);
    }
}
