//! Last-known location, palette and preferences, kept across restarts.
//!
//! Every received field is written through on its own with `toml_edit`, so a
//! hand-edited state file keeps its comments and unrelated keys.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::engine::LocationFix;
use crate::message::{parse_hex, Key, Tuple, Value};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BluetoothAlert {
    Off,
    #[default]
    Quiet,
    Loud,
}

impl From<i32> for BluetoothAlert {
    fn from(v: i32) -> Self {
        match v {
            0 => BluetoothAlert::Off,
            1 => BluetoothAlert::Quiet,
            _ => BluetoothAlert::Loud,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatteryStyle {
    Hidden,
    #[default]
    Dish,
}

impl From<i32> for BatteryStyle {
    fn from(v: i32) -> Self {
        if v == 0 {
            BatteryStyle::Hidden
        } else {
            BatteryStyle::Dish
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateFont {
    #[default]
    Regular,
    Bold,
}

impl From<i32> for DateFont {
    fn from(v: i32) -> Self {
        if v == 0 {
            DateFont::Regular
        } else {
            DateFont::Bold
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub bluetooth_alert: BluetoothAlert,
    pub battery_style: BatteryStyle,
    pub date_font: DateFont,
}

impl Preferences {
    /// Apply preference tuples; returns true if anything changed.
    pub fn apply(&mut self, tuples: &[Tuple]) -> bool {
        let before = *self;
        for tuple in tuples {
            let Some(v) = tuple.as_int() else { continue };
            match tuple.key {
                Key::BluetoothAlert => self.bluetooth_alert = v.into(),
                Key::BatteryStyle => self.battery_style = v.into(),
                Key::DateFont => self.date_font = v.into(),
                _ => {}
            }
        }
        *self != before
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct StateFile {
    location: LocationFix,
    settings: Settings,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct Settings {
    palette: Option<String>,
    bluetooth_alert: Option<i32>,
    battery_style: Option<i32>,
    date_font: Option<i32>,
}

/// What a restart gets back.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Restored {
    pub location: LocationFix,
    pub palette: Option<Vec<u8>>,
    pub preferences: Preferences,
}

pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// `~/.local/share/horizon/state.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::data_local_dir().map(|p| p.join("horizon").join("state.toml"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Restored> {
        if !self.path.exists() {
            return Ok(Restored::default());
        }
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read state at {}", self.path.display()))?;
        let file: StateFile = toml::from_str(&content)
            .with_context(|| format!("Failed to parse state at {}", self.path.display()))?;

        let location = if file.location.is_set() {
            file.location
        } else {
            LocationFix::default()
        };

        let palette = file.settings.palette.as_deref().and_then(|hex| {
            let bytes = parse_hex(hex);
            if bytes.is_none() {
                warn!("Ignoring malformed stored palette '{}'", hex);
            }
            bytes
        });

        let mut preferences = Preferences::default();
        if let Some(v) = file.settings.bluetooth_alert {
            preferences.bluetooth_alert = v.into();
        }
        if let Some(v) = file.settings.battery_style {
            preferences.battery_style = v.into();
        }
        if let Some(v) = file.settings.date_font {
            preferences.date_font = v.into();
        }

        Ok(Restored {
            location,
            palette,
            preferences,
        })
    }

    /// Write each tuple through to the state file.
    pub fn persist(&self, tuples: &[Tuple]) -> Result<()> {
        if tuples.is_empty() {
            return Ok(());
        }

        let mut doc = match std::fs::read_to_string(&self.path) {
            Ok(content) => content
                .parse::<toml_edit::DocumentMut>()
                .with_context(|| format!("Failed to parse state at {}", self.path.display()))?,
            Err(_) => toml_edit::DocumentMut::new(),
        };

        for tuple in tuples {
            let (table, field) = match storage_slot(tuple.key) {
                Some(slot) => slot,
                None => continue,
            };
            if !doc.contains_key(table) {
                doc[table] = toml_edit::table();
            }
            doc[table][field] = match &tuple.value {
                Value::Int(v) => toml_edit::value(*v as i64),
                Value::Bytes(bytes) => toml_edit::value(encode_hex(bytes)),
            };
        }

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, doc.to_string())
            .with_context(|| format!("Failed to write state at {}", self.path.display()))?;
        debug!("Persisted {} field(s) to {}", tuples.len(), self.path.display());
        Ok(())
    }
}

fn storage_slot(key: Key) -> Option<(&'static str, &'static str)> {
    let slot = match key {
        Key::Timestamp => ("location", "timestamp"),
        Key::Timezone => ("location", "timezone"),
        Key::Longitude => ("location", "longitude"),
        Key::Latitude => ("location", "latitude"),
        Key::Sunrise => ("location", "sunrise"),
        Key::Sunset => ("location", "sunset"),
        Key::SunSouth => ("location", "solar_noon"),
        Key::SunStatus => ("location", "status"),
        Key::ColorPalette => ("settings", "palette"),
        Key::BluetoothAlert => ("settings", "bluetooth_alert"),
        Key::BatteryStyle => ("settings", "battery_style"),
        Key::DateFont => ("settings", "date_font"),
        Key::Location => return None,
    };
    Some(slot)
}

fn encode_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
