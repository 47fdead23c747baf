//! Dial geometry derived from a daily solar ephemeris.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::trig::{fixed_to_int, int_to_fixed, project, Angle, FPoint, Fixed, FIX1, TRIG_MAX_ANGLE};

const NOON_MINUTES: i32 = 12 * 60;
const MINUTES_PER_DAY: i32 = 24 * 60;

/// Ephemeris snapshot delivered by the paired device.
///
/// Sun event times are minutes since UTC midnight. A zero `timestamp` means no
/// fix has been received yet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationFix {
    pub timestamp: i32,
    pub timezone: i32,
    pub longitude: i32,
    pub latitude: i32,
    pub sunrise: i32,
    pub sunset: i32,
    pub solar_noon: i32,
    pub status: i32,
}

impl LocationFix {
    pub fn is_set(&self) -> bool {
        self.timestamp != 0
    }
}

impl fmt::Display for LocationFix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tz_sign = if self.timezone < 0 { '-' } else { '+' };
        let tz = self.timezone.unsigned_abs();

        // Coordinates arrive as degrees scaled by one full turn.
        let long = self.longitude / TRIG_MAX_ANGLE as i32;
        let long_dir = if long < 0 { 'W' } else { 'E' };
        let lat = self.latitude / TRIG_MAX_ANGLE as i32;
        let lat_dir = if lat < 0 { 'S' } else { 'N' };
        let rise = self.sunrise.rem_euclid(MINUTES_PER_DAY);
        let set = self.sunset.rem_euclid(MINUTES_PER_DAY);

        write!(
            f,
            "UTC{}{}:{:02} {}{} x {}{} rise@{}:{:02} set@{}:{:02}",
            tz_sign,
            tz / 60,
            tz % 60,
            long.unsigned_abs(),
            long_dir,
            lat.unsigned_abs(),
            lat_dir,
            rise / 60,
            rise % 60,
            set / 60,
            set % 60,
        )
    }
}

/// What to do when the horizon lands far from the dial center.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "policy")]
pub enum HorizonPolicy {
    /// The horizon may leave the visible area.
    Unclamped,
    /// Shift the dial origin so the horizon sits at the center, up to `limit`
    /// pixels; anything beyond that remains as a residual horizon offset.
    Clamped { limit: i32 },
}

impl Default for HorizonPolicy {
    fn default() -> Self {
        HorizonPolicy::Unclamped
    }
}

/// Fixed inputs for [`configure`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DialParams {
    pub center: FPoint,
    pub orbit_radius: Fixed,
    /// Horizon used before any fix arrives, in pixels.
    pub day_fallback: i32,
    pub policy: HorizonPolicy,
}

/// Computed dial layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DialGeometry {
    /// Rotation of the hour ring that puts solar noon at the top.
    pub kilter: Angle,
    /// Sky/ground boundary, in pixels from the top of the screen.
    pub horizon: i32,
    /// Center of the orbit ring after any clamp shift.
    pub origin: FPoint,
}

pub fn configure(fix: &LocationFix, params: &DialParams) -> DialGeometry {
    if !fix.is_set() {
        return DialGeometry {
            kilter: Angle::ZERO,
            horizon: params.day_fallback,
            origin: params.center,
        };
    }

    let sunrise = fix.sunrise.wrapping_add(fix.timezone);
    let sunset = fix.sunset.wrapping_add(fix.timezone);
    let solar_noon = fix.solar_noon.wrapping_add(fix.timezone);

    let kilter = Angle::from_minute(NOON_MINUTES.wrapping_sub(solar_noon));

    let rise = project(params.center, params.orbit_radius, Angle::from_minute(sunrise) + kilter);
    let set = project(params.center, params.orbit_radius, Angle::from_minute(sunset) + kilter);

    let horizon = fixed_to_int((rise.y + set.y + FIX1) / 2);

    match params.policy {
        HorizonPolicy::Unclamped => DialGeometry {
            kilter,
            horizon,
            origin: params.center,
        },
        HorizonPolicy::Clamped { limit } => {
            let limit = limit.max(0);
            let center_y = fixed_to_int(params.center.y);
            let offset = horizon - center_y;
            let clamped = offset.clamp(-limit, limit);
            let excess = offset - clamped;
            DialGeometry {
                kilter,
                horizon: center_y + excess,
                origin: FPoint::new(params.center.x, params.center.y - int_to_fixed(clamped)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(policy: HorizonPolicy) -> DialParams {
        DialParams {
            center: FPoint::from_pixels(90, 90),
            orbit_radius: int_to_fixed(75),
            day_fallback: 90,
            policy,
        }
    }

    fn fix(sunrise: i32, sunset: i32, solar_noon: i32, timezone: i32) -> LocationFix {
        LocationFix {
            timestamp: 1_700_000_000,
            timezone,
            sunrise,
            sunset,
            solar_noon,
            ..Default::default()
        }
    }

    #[test]
    fn missing_fix_uses_fallback() {
        let garbage = LocationFix {
            timestamp: 0,
            timezone: 9999,
            longitude: -5,
            latitude: 77,
            sunrise: -400,
            sunset: 123_456,
            solar_noon: 31,
            status: 3,
        };
        let mut p = params(HorizonPolicy::Clamped { limit: 10 });
        p.day_fallback = 180;
        let g = configure(&garbage, &p);
        assert_eq!(g.kilter, Angle::ZERO);
        assert_eq!(g.horizon, 180);
        assert_eq!(g.origin, p.center);
    }

    #[test]
    fn equinox_day_is_level() {
        let p = params(HorizonPolicy::Unclamped);
        let g = configure(&fix(360, 1080, 720, 0), &p);
        assert_eq!(g.kilter, Angle::ZERO);

        let rise = project(p.center, p.orbit_radius, Angle::from_minute(360));
        let set = project(p.center, p.orbit_radius, Angle::from_minute(1080));
        assert_eq!(g.horizon, fixed_to_int((rise.y + set.y + FIX1) / 2));
        assert_eq!(g.horizon, 90);
    }

    #[test]
    fn kilter_brings_solar_noon_to_the_top() {
        let p = params(HorizonPolicy::Unclamped);
        let g = configure(&fix(255, 1095, 675, 0), &p);
        assert_eq!(g.kilter, Angle::from_minute(45));
        assert_eq!(Angle::from_minute(675) + g.kilter, Angle::HALF);
    }

    #[test]
    fn timezone_is_applied_before_projection() {
        let p = params(HorizonPolicy::Unclamped);
        let utc = configure(&fix(300, 1020, 660, 60), &p);
        let local = configure(&fix(360, 1080, 720, 0), &p);
        assert_eq!(utc, local);

        // Negative local times wrap instead of being rejected.
        let wrapped = configure(&fix(60, 780, 420, -300), &p);
        assert_eq!(wrapped.kilter, Angle::from_minute(720 - 120));
    }

    #[test]
    fn long_days_push_the_horizon_down() {
        let p = params(HorizonPolicy::Unclamped);
        let summer = configure(&fix(240, 1200, 720, 0), &p);
        let winter = configure(&fix(480, 960, 720, 0), &p);
        // Screen y grows downward: more daylight means the ground starts lower.
        assert!(summer.horizon > 90);
        assert!(winter.horizon < 90);
    }

    #[test]
    fn polar_day_collapses_to_one_point() {
        let p = params(HorizonPolicy::Unclamped);
        let g = configure(&fix(0, 1440, 720, 0), &p);
        let point = project(p.center, p.orbit_radius, Angle::ZERO);
        assert_eq!(g.horizon, fixed_to_int((2 * point.y + FIX1) / 2));
        assert_eq!(g.horizon, 165);
    }

    #[test]
    fn clamp_moves_origin_and_keeps_residual() {
        let unclamped = configure(&fix(240, 1200, 720, 0), &params(HorizonPolicy::Unclamped));
        let offset = unclamped.horizon - 90;
        assert!(offset > 20);

        let p = params(HorizonPolicy::Clamped { limit: 20 });
        let g = configure(&fix(240, 1200, 720, 0), &p);
        assert_eq!(g.kilter, unclamped.kilter);
        assert_eq!(g.horizon, 90 + (offset - 20));
        assert_eq!(g.origin, FPoint::new(p.center.x, p.center.y - int_to_fixed(20)));
    }

    #[test]
    fn clamp_within_limit_centers_horizon() {
        let unclamped = configure(&fix(480, 960, 720, 0), &params(HorizonPolicy::Unclamped));
        let offset = unclamped.horizon - 90;

        let p = params(HorizonPolicy::Clamped { limit: 60 });
        let g = configure(&fix(480, 960, 720, 0), &p);
        assert_eq!(g.horizon, 90);
        assert_eq!(g.origin.y, p.center.y - int_to_fixed(offset));
    }

    #[test]
    fn display_matches_log_format() {
        let f = LocationFix {
            timestamp: 1,
            timezone: -330,
            longitude: -(3 * TRIG_MAX_ANGLE as i32),
            latitude: 51 * TRIG_MAX_ANGLE as i32,
            sunrise: 312,
            sunset: 1241,
            ..Default::default()
        };
        assert_eq!(f.to_string(), "UTC-5:30 3W x 51N rise@5:12 set@20:41");
    }

    #[test]
    fn display_wraps_event_times_into_the_day() {
        let f = LocationFix {
            timestamp: 1,
            sunrise: -90,
            sunset: 1450,
            ..Default::default()
        };
        assert_eq!(f.to_string(), "UTC+0:00 0E x 0N rise@22:30 set@0:10");
    }
}
