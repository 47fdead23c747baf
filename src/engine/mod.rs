//! Geometry-and-animation engine for the solar dial.
//!
//! [`EngineState`] owns the current ephemeris, the geometry derived from it
//! and the animated values the renderer reads every frame. It performs no I/O
//! and keeps no time; callers drive it from their own event loop.

pub mod animation;
pub mod arc;
pub mod geometry;
pub mod trig;

pub use animation::{AnimationController, AnimationPolicy, Progress, Reconfigure, Timeline, Visible};
pub use geometry::{configure, DialGeometry, DialParams, HorizonPolicy, LocationFix};
pub use trig::{Angle, FPoint, Fixed};

use tracing::debug;

/// Where the horizon sits before any fix has arrived.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum FallbackHorizon {
    #[default]
    Center,
    FullHeight,
}

/// Everything that varies between face layouts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    pub width: i32,
    pub height: i32,
    pub orbit_radius: Fixed,
    pub policy: HorizonPolicy,
    pub fallback: FallbackHorizon,
    pub animation: AnimationPolicy,
}

impl EngineConfig {
    pub fn center(&self) -> FPoint {
        FPoint::new(trig::int_to_fixed(self.width) / 2, trig::int_to_fixed(self.height) / 2)
    }

    pub fn dial_params(&self) -> DialParams {
        let center = self.center();
        DialParams {
            center,
            orbit_radius: self.orbit_radius,
            day_fallback: match self.fallback {
                FallbackHorizon::Center => trig::fixed_to_int(center.y),
                FallbackHorizon::FullHeight => self.height,
            },
            policy: self.policy,
        }
    }
}

pub struct EngineState {
    config: EngineConfig,
    fix: LocationFix,
    geometry: DialGeometry,
    animation: AnimationController,
}

impl EngineState {
    /// Build the engine from a restored fix.
    ///
    /// Without a fix the sky and ground start collapsed (above at the top,
    /// below at the bottom) so that the first fix opens them with a transition.
    pub fn new(config: EngineConfig, fix: LocationFix) -> Self {
        let geometry = configure(&fix, &config.dial_params());
        let animation = if fix.is_set() {
            let horizon = clamp_pixels(geometry.horizon);
            AnimationController::new(config.animation, horizon, horizon, geometry.kilter)
        } else {
            AnimationController::new(config.animation, 0, clamp_pixels(config.height), Angle::ZERO)
        };

        Self {
            config,
            fix,
            geometry,
            animation,
        }
    }

    /// Replace the fix and move toward the new geometry.
    pub fn set_fix(&mut self, fix: LocationFix) -> Reconfigure {
        self.fix = fix;
        self.refresh()
    }

    /// Recompute geometry for the current fix, e.g. after the day rolls over.
    pub fn refresh(&mut self) -> Reconfigure {
        self.geometry = configure(&self.fix, &self.config.dial_params());
        let outcome = self
            .animation
            .reconfigure(clamp_pixels(self.geometry.horizon), self.geometry.kilter);
        debug!(
            "Dial reconfigured: kilter={} horizon={} -> {:?}",
            self.geometry.kilter.raw(),
            self.geometry.horizon,
            outcome
        );
        outcome
    }

    /// Advance the running transition. Returns the values to draw.
    pub fn tick(&mut self, progress: Progress) -> Visible {
        self.animation.tick(progress)
    }

    pub fn visible(&self) -> Visible {
        self.animation.visible()
    }

    pub fn take_dirty(&mut self) -> bool {
        self.animation.take_dirty()
    }

    pub fn fix(&self) -> &LocationFix {
        &self.fix
    }

    pub fn geometry(&self) -> &DialGeometry {
        &self.geometry
    }

    #[cfg(test)]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn animation(&self) -> &AnimationController {
        &self.animation
    }
}

fn clamp_pixels(v: i32) -> i16 {
    v.clamp(i16::MIN as i32, i16::MAX as i32) as i16
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::animation::Phase;

    fn config(fallback: FallbackHorizon) -> EngineConfig {
        EngineConfig {
            width: 144,
            height: 168,
            orbit_radius: trig::int_to_fixed(61),
            policy: HorizonPolicy::Unclamped,
            fallback,
            animation: AnimationPolicy::default(),
        }
    }

    fn equinox() -> LocationFix {
        LocationFix {
            timestamp: 1_700_000_000,
            sunrise: 360,
            sunset: 1080,
            solar_noon: 720,
            ..Default::default()
        }
    }

    #[test]
    fn starts_collapsed_without_fix() {
        let engine = EngineState::new(config(FallbackHorizon::Center), LocationFix::default());
        assert_eq!(
            engine.visible(),
            Visible {
                above: 0,
                below: 168,
                rotation: Angle::ZERO
            }
        );
        assert_eq!(engine.geometry().horizon, 84);
    }

    #[test]
    fn full_height_fallback() {
        let engine = EngineState::new(config(FallbackHorizon::FullHeight), LocationFix::default());
        assert_eq!(engine.geometry().horizon, 168);
        assert_eq!(engine.geometry().kilter, Angle::ZERO);
    }

    #[test]
    fn restored_fix_starts_snapped() {
        let engine = EngineState::new(config(FallbackHorizon::Center), equinox());
        let v = engine.visible();
        assert_eq!(v.above, 84);
        assert_eq!(v.below, 84);
        assert_eq!(engine.animation().phase(), Phase::Idle);
    }

    #[test]
    fn first_fix_opens_the_horizon() {
        let mut engine = EngineState::new(config(FallbackHorizon::Center), LocationFix::default());
        let outcome = engine.set_fix(equinox());
        assert!(matches!(outcome, Reconfigure::Scheduled(_)));

        let end = engine.tick(Progress::END);
        assert_eq!(end.above, 84);
        assert_eq!(end.below, 84);
        assert_eq!(end.rotation, Angle::ZERO);
    }

    #[test]
    fn refresh_with_same_fix_snaps() {
        let mut engine = EngineState::new(config(FallbackHorizon::Center), equinox());
        engine.take_dirty();
        assert_eq!(engine.refresh(), Reconfigure::Snapped);
        assert!(engine.take_dirty());
    }
}
