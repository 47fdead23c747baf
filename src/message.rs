//! Inbound key/value messages from the paired device.
//!
//! One message carries any subset of the ephemeris fields and preferences.
//! A `timestamp` tuple commits the location; everything else just updates the
//! stored fields.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::engine::LocationFix;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MessageError {
    #[error("unknown key '{0}'")]
    UnknownKey(String),
    #[error("expected key=value, got '{0}'")]
    MissingValue(String),
    #[error("invalid integer for {key}: '{value}'")]
    BadInteger { key: Key, value: String },
    #[error("invalid byte array for {key}: '{value}'")]
    BadBytes { key: Key, value: String },
}

/// Message keys with their stable numeric ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Location = 100,
    Longitude,
    Latitude,
    Timezone,
    Timestamp,
    Sunrise,
    Sunset,
    SunSouth,
    SunStatus,
    BluetoothAlert,
    ColorPalette,
    BatteryStyle,
    DateFont,
}

impl Key {
    pub const ALL: [Key; 13] = [
        Key::Location,
        Key::Longitude,
        Key::Latitude,
        Key::Timezone,
        Key::Timestamp,
        Key::Sunrise,
        Key::Sunset,
        Key::SunSouth,
        Key::SunStatus,
        Key::BluetoothAlert,
        Key::ColorPalette,
        Key::BatteryStyle,
        Key::DateFont,
    ];

    pub fn id(self) -> u32 {
        self as u32
    }

    pub fn from_id(id: u32) -> Option<Key> {
        Self::ALL.iter().copied().find(|k| k.id() == id)
    }

    pub fn name(self) -> &'static str {
        match self {
            Key::Location => "location",
            Key::Longitude => "longitude",
            Key::Latitude => "latitude",
            Key::Timezone => "timezone",
            Key::Timestamp => "timestamp",
            Key::Sunrise => "sunrise",
            Key::Sunset => "sunset",
            Key::SunSouth => "sunsouth",
            Key::SunStatus => "sunstatus",
            Key::BluetoothAlert => "bluetooth_alert",
            Key::ColorPalette => "palette",
            Key::BatteryStyle => "battery_style",
            Key::DateFont => "date_font",
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Key {
    type Err = MessageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase().replace('-', "_");
        if let Ok(id) = lower.parse::<u32>() {
            return Key::from_id(id).ok_or_else(|| MessageError::UnknownKey(s.to_string()));
        }
        match lower.as_str() {
            "solarnoon" | "solar_noon" | "sun_south" => Ok(Key::SunSouth),
            "sun_status" | "status" => Ok(Key::SunStatus),
            "color_palette" | "colors" => Ok(Key::ColorPalette),
            "bluetooth" => Ok(Key::BluetoothAlert),
            "battery" => Ok(Key::BatteryStyle),
            other => Key::ALL
                .iter()
                .copied()
                .find(|k| k.name() == other)
                .ok_or_else(|| MessageError::UnknownKey(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Int(i32),
    Bytes(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tuple {
    pub key: Key,
    pub value: Value,
}

impl Tuple {
    pub fn int(key: Key, value: i32) -> Self {
        Self {
            key,
            value: Value::Int(value),
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self.value {
            Value::Int(v) => Some(v),
            Value::Bytes(_) => None,
        }
    }
}

impl FromStr for Tuple {
    type Err = MessageError;

    /// Parse `key=value`. The palette takes hex bytes, everything else an int32.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (key, value) = s
            .split_once('=')
            .ok_or_else(|| MessageError::MissingValue(s.to_string()))?;
        let key: Key = key.parse()?;
        let value = value.trim();

        if key == Key::ColorPalette {
            let bytes = parse_hex(value).ok_or_else(|| MessageError::BadBytes {
                key,
                value: value.to_string(),
            })?;
            return Ok(Tuple {
                key,
                value: Value::Bytes(bytes),
            });
        }

        let int = value.parse::<i32>().map_err(|_| MessageError::BadInteger {
            key,
            value: value.to_string(),
        })?;
        Ok(Tuple::int(key, int))
    }
}

pub fn parse_hex(s: &str) -> Option<Vec<u8>> {
    let s = s.trim_start_matches("0x");
    if s.is_empty() || s.len() % 2 != 0 {
        return None;
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(s.get(i..i + 2)?, 16).ok())
        .collect()
}

/// Parse a whitespace-separated list of `key=value` tuples.
pub fn parse_message(line: &str) -> Result<Vec<Tuple>, MessageError> {
    line.split_whitespace().map(str::parse).collect()
}

/// Write the location fields of `tuples` into `fix`.
/// Returns true when the message carried a timestamp.
pub fn apply_location(fix: &mut LocationFix, tuples: &[Tuple]) -> bool {
    let mut committed = false;
    for tuple in tuples {
        let Some(v) = tuple.as_int() else { continue };
        match tuple.key {
            Key::Timestamp => {
                fix.timestamp = v;
                committed = true;
            }
            Key::Timezone => fix.timezone = v,
            Key::Longitude => fix.longitude = v,
            Key::Latitude => fix.latitude = v,
            Key::Sunrise => fix.sunrise = v,
            Key::Sunset => fix.sunset = v,
            Key::SunSouth => fix.solar_noon = v,
            Key::SunStatus => fix.status = v,
            _ => {}
        }
    }
    committed
}
