use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::color::ColorDepth;
use crate::engine::animation::{AnimationPolicy, Curve};
use crate::engine::trig::{int_to_fixed, Fixed, TRIG_MAX_ANGLE};
use crate::engine::{EngineConfig, FallbackHorizon, HorizonPolicy};

/// Screen shape of the face. Each shape carries its own layout constants.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, ValueEnum, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum FaceShape {
    #[default]
    Round,
    Rect,
}

/// Pixel layout of one face shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceMetrics {
    pub width: i32,
    pub height: i32,
    pub orbit_radius: Fixed,
    pub solar_radius: Fixed,
    pub solar_stroke: Fixed,
    pub pip_radius: Fixed,
    pub readout_radius: Fixed,
    pub readout_stroke: Fixed,
    pub date_text_offset: i32,
    pub wday_text_offset: i32,
    /// Round faces draw a full disc at each six-hour mark.
    pub major_discs: bool,
}

impl FaceShape {
    pub fn metrics(self) -> FaceMetrics {
        let (width, height, orbit, solar, readout, date, wday) = match self {
            FaceShape::Round => (180, 180, 75, 10, 62, 10, -36),
            FaceShape::Rect => (144, 168, 61, 8, 50, 11, -30),
        };
        FaceMetrics {
            width,
            height,
            orbit_radius: int_to_fixed(orbit),
            solar_radius: int_to_fixed(solar),
            solar_stroke: int_to_fixed(2),
            pip_radius: int_to_fixed(solar) / 4,
            readout_radius: int_to_fixed(readout),
            readout_stroke: int_to_fixed(2),
            date_text_offset: date,
            wday_text_offset: wday,
            major_discs: self == FaceShape::Round,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, ValueEnum, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum HorizonMode {
    #[default]
    Unclamped,
    Clamped,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub face: FaceConfig,
    pub animation: AnimationConfig,
    pub display: DisplayConfig,
    pub state: StateConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FaceConfig {
    pub shape: FaceShape,
    /// Overrides the shape's screen size
    pub width: Option<i32>,
    pub height: Option<i32>,
    /// Overrides the shape's orbit radius, in pixels
    pub orbit_radius: Option<i32>,
    pub horizon: HorizonMode,
    /// Maximum origin shift in pixels when `horizon = "clamped"`
    pub clamp_limit: i32,
    pub fallback: FallbackHorizon,
    pub clock_24h: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnimationConfig {
    pub duration_ms: u64,
    pub curve: Curve,
    pub horizon_threshold: u16,
    /// The rotation snap threshold is one turn divided by this
    pub kilter_divisor: u32,
    pub frame_rate: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DisplayConfig {
    pub color_depth: ColorDepth,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct StateConfig {
    pub path: Option<PathBuf>,
}

impl Default for FaceConfig {
    fn default() -> Self {
        Self {
            shape: FaceShape::Round,
            width: None,
            height: None,
            orbit_radius: None,
            horizon: HorizonMode::Unclamped,
            clamp_limit: 40,
            fallback: FallbackHorizon::Center,
            clock_24h: true,
        }
    }
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            duration_ms: 1000,
            curve: Curve::EaseInOut,
            horizon_threshold: 4,
            kilter_divisor: 60,
            frame_rate: 30,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            color_depth: ColorDepth::Color,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            face: FaceConfig::default(),
            animation: AnimationConfig::default(),
            display: DisplayConfig::default(),
            state: StateConfig::default(),
        }
    }
}

impl FaceConfig {
    pub fn metrics(&self) -> FaceMetrics {
        let mut metrics = self.shape.metrics();
        if let Some(w) = self.width {
            metrics.width = w.max(1);
        }
        if let Some(h) = self.height {
            metrics.height = h.max(1);
        }
        if let Some(r) = self.orbit_radius {
            metrics.orbit_radius = int_to_fixed(r.max(0));
        }
        metrics
    }

    pub fn horizon_policy(&self) -> HorizonPolicy {
        match self.horizon {
            HorizonMode::Unclamped => HorizonPolicy::Unclamped,
            HorizonMode::Clamped => HorizonPolicy::Clamped {
                limit: self.clamp_limit.max(0),
            },
        }
    }
}

impl AnimationConfig {
    pub fn policy(&self) -> AnimationPolicy {
        AnimationPolicy {
            horizon_threshold: self.horizon_threshold,
            kilter_threshold: TRIG_MAX_ANGLE / self.kilter_divisor.max(1),
            duration: Duration::from_millis(self.duration_ms),
            curve: self.curve,
        }
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.frame_rate.clamp(1, 120) as f64)
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config at {}", path.display()))?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Get the default XDG config path (~/.config/horizon/config.toml)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("horizon").join("config.toml"))
    }

    /// Load config from the default XDG path if it exists
    /// Returns None if file doesn't exist, logs warning on parse errors
    pub fn load_from_default_path() -> Option<Self> {
        let path = Self::default_path()?;
        if path.exists() {
            match Self::load(&path) {
                Ok(config) => Some(config),
                Err(e) => {
                    tracing::warn!(
                        "Failed to parse config at {}: {}. Using defaults.",
                        path.display(),
                        e
                    );
                    None
                }
            }
        } else {
            None
        }
    }

    /// Initialize default config file at XDG path, returns the path
    pub fn init_default_config() -> Result<PathBuf> {
        let path = Self::default_path()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(&path, Self::generate_config_template())?;

        Ok(path)
    }

    /// Load the file the CLI points at (or the default one), then apply the
    /// CLI overrides on top. Used at startup and again on every reload.
    pub fn from_args(args: &crate::Args) -> Result<Self> {
        let mut config = match &args.config {
            Some(path) => Self::load(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => Self::load_from_default_path().unwrap_or_default(),
        };
        config.merge_args(args);
        Ok(config)
    }

    pub fn state_path(&self) -> Option<PathBuf> {
        self.state.path.clone().or_else(crate::state::StateStore::default_path)
    }

    pub fn engine_config(&self) -> EngineConfig {
        let metrics = self.face.metrics();
        EngineConfig {
            width: metrics.width,
            height: metrics.height,
            orbit_radius: metrics.orbit_radius,
            policy: self.face.horizon_policy(),
            fallback: self.face.fallback,
            animation: self.animation.policy(),
        }
    }

    /// Generate a commented TOML config template
    pub fn generate_config_template() -> String {
        r#"# Horizon Configuration
# This file is auto-generated. Edit as needed.

[face]
# Screen shape: "round" (180x180) or "rect" (144x168)
shape = "round"
# Override the screen size in pixels
# width = 180
# height = 180
# Override the orbit radius in pixels
# orbit_radius = 75
# Horizon policy: "unclamped" lets the horizon leave the screen on very long
# or very short days; "clamped" shifts the dial instead, up to clamp_limit
horizon = "unclamped"
clamp_limit = 40
# Horizon before the first location fix: "center" or "full-height"
fallback = "center"
# 24-hour time readout
clock_24h = true

[animation]
# Transition length in milliseconds
duration_ms = 1000
# Easing: "linear", "ease-in", "ease-out", "ease-in-out"
curve = "ease-in-out"
# Horizon moves below this many pixels snap instead of animating
horizon_threshold = 4
# Rotations below one turn / kilter_divisor snap instead of animating
kilter_divisor = 60
# Animation frames per second
frame_rate = 30

[display]
# "color" or "mono"
color_depth = "color"

[state]
# Where the last location, palette and preferences are kept
# path = "/home/me/.local/share/horizon/state.toml"
"#
        .to_string()
    }

    /// Merge CLI arguments into config (CLI takes priority)
    pub fn merge_args(&mut self, args: &crate::Args) {
        if let Some(shape) = args.shape {
            self.face.shape = shape;
        }
        if let Some(limit) = args.clamp_limit {
            self.face.horizon = HorizonMode::Clamped;
            self.face.clamp_limit = limit;
        }
        if args.unclamped {
            self.face.horizon = HorizonMode::Unclamped;
        }
        if let Some(fallback) = args.fallback {
            self.face.fallback = fallback;
        }
        if let Some(ms) = args.duration_ms {
            self.animation.duration_ms = ms;
        }
        if args.mono {
            self.display.color_depth = ColorDepth::Mono;
        }
        if let Some(ref path) = args.state {
            self.state.path = Some(path.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_parses_to_defaults() {
        let config: Config = toml::from_str(&Config::generate_config_template()).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn partial_file_fills_defaults() {
        let config: Config = toml::from_str(
            "[face]\nshape = \"rect\"\nhorizon = \"clamped\"\nclamp_limit = 25\n",
        )
        .unwrap();
        assert_eq!(config.face.shape, FaceShape::Rect);
        assert_eq!(config.face.horizon_policy(), HorizonPolicy::Clamped { limit: 25 });
        assert_eq!(config.animation, AnimationConfig::default());
    }

    #[test]
    fn engine_config_follows_shape() {
        let mut config = Config::default();
        config.face.shape = FaceShape::Rect;
        let engine = config.engine_config();
        assert_eq!((engine.width, engine.height), (144, 168));
        assert_eq!(engine.orbit_radius, int_to_fixed(61));
        assert_eq!(engine.animation, AnimationPolicy::default());
    }

    #[test]
    fn overrides_replace_shape_defaults() {
        let mut config = Config::default();
        config.face.width = Some(200);
        config.face.orbit_radius = Some(90);
        let metrics = config.face.metrics();
        assert_eq!(metrics.width, 200);
        assert_eq!(metrics.height, 180);
        assert_eq!(metrics.orbit_radius, int_to_fixed(90));
        assert_eq!(metrics.pip_radius, int_to_fixed(10) / 4);
    }
}
