//! Everything the running face knows: the engine, colors, preferences and
//! device status, plus the write-through store behind them.

use chrono::{NaiveDateTime, Timelike};
use tracing::{debug, info, warn};

use crate::color::Palette;
use crate::config::{Config, FaceMetrics};
use crate::engine::{EngineState, LocationFix, Progress, Reconfigure, Visible};
use crate::message::{apply_location, Key, Tuple, Value};
use crate::renderer::dial::Scene;
use crate::state::{BluetoothAlert, Preferences, StateStore};

/// What a clock update changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeChange {
    Unchanged,
    Minute,
    /// The local date rolled over and the dial was recomputed.
    Day(Reconfigure),
}

pub struct Face {
    engine: EngineState,
    /// Location fields received so far; only committed by a timestamp.
    pending: LocationFix,
    palette: Palette,
    preferences: Preferences,
    store: Option<StateStore>,
    metrics: FaceMetrics,
    clock_24h: bool,
    battery: u8,
    connected: bool,
    now: NaiveDateTime,
}

impl Face {
    pub fn new(config: &Config, now: NaiveDateTime) -> Self {
        let store = config.state_path().map(StateStore::new);
        Self::with_store(config, store, now)
    }

    pub fn with_store(config: &Config, store: Option<StateStore>, now: NaiveDateTime) -> Self {
        let restored = match store.as_ref().map(StateStore::load).transpose() {
            Ok(restored) => restored.unwrap_or_default(),
            Err(e) => {
                warn!("{:#}. Starting without saved state.", e);
                Default::default()
            }
        };

        let mut palette = Palette::new(config.display.color_depth);
        if let Some(bytes) = restored.palette.as_deref() {
            palette.apply(bytes);
        }

        if restored.location.is_set() {
            debug!("Restored location: {}", restored.location);
        } else {
            info!("No saved location, waiting for a fix");
        }

        Self {
            engine: EngineState::new(config.engine_config(), restored.location),
            pending: restored.location,
            palette,
            preferences: restored.preferences,
            store,
            metrics: config.face.metrics(),
            clock_24h: config.face.clock_24h,
            battery: 100,
            connected: true,
            now,
        }
    }

    /// Apply one inbound message. Every tuple is persisted; a timestamp
    /// commits the location and moves the dial.
    pub fn apply_message(&mut self, tuples: &[Tuple]) -> Option<Reconfigure> {
        if let Some(store) = &self.store {
            if let Err(e) = store.persist(tuples) {
                warn!("Failed to persist message to {}: {:#}", store.path().display(), e);
            }
        }

        for tuple in tuples {
            if let (Key::ColorPalette, Value::Bytes(bytes)) = (tuple.key, &tuple.value) {
                let applied = self.palette.apply(bytes);
                debug!("Palette updated ({} slot(s))", applied);
            }
        }

        if self.preferences.apply(tuples) {
            debug!("Preferences updated: {:?}", self.preferences);
        }

        if !apply_location(&mut self.pending, tuples) {
            return None;
        }

        debug!("Location committed: {}", self.pending);
        Some(self.engine.set_fix(self.pending))
    }

    /// Advance the wall clock. The dial is recomputed when the date changes.
    pub fn time_changed(&mut self, now: NaiveDateTime) -> TimeChange {
        let before = self.now;
        self.now = now;

        if now.date() != before.date() {
            debug!("Day rolled over to {}", now.date());
            return TimeChange::Day(self.engine.refresh());
        }
        if (now.hour(), now.minute()) != (before.hour(), before.minute()) {
            return TimeChange::Minute;
        }
        TimeChange::Unchanged
    }

    pub fn refresh(&mut self) -> Reconfigure {
        self.engine.refresh()
    }

    pub fn tick(&mut self, progress: Progress) -> Visible {
        self.engine.tick(progress)
    }

    pub fn take_dirty(&mut self) -> bool {
        self.engine.take_dirty()
    }

    /// Returns true if the level changed.
    pub fn set_battery(&mut self, level: u8) -> bool {
        let level = level.min(100);
        let changed = level != self.battery;
        self.battery = level;
        changed
    }

    /// Record the link state. Returns the alert to raise when the link drops.
    pub fn set_link(&mut self, connected: bool) -> Option<BluetoothAlert> {
        let lost = self.connected && !connected;
        self.connected = connected;
        if !lost {
            return None;
        }
        warn!("Link to the phone lost");
        match self.preferences.bluetooth_alert {
            BluetoothAlert::Off => None,
            alert => Some(alert),
        }
    }

    /// Rebuild the layout from a new config, keeping the received state.
    pub fn reload(&mut self, config: &Config) {
        let bytes = *self.palette.bytes();
        self.palette = Palette::new(config.display.color_depth);
        self.palette.apply(&bytes);
        self.metrics = config.face.metrics();
        self.clock_24h = config.face.clock_24h;
        self.engine = EngineState::new(config.engine_config(), *self.engine.fix());
    }

    pub fn status(&self) -> String {
        let fix = self.engine.fix();
        let location = if fix.is_set() {
            fix.to_string()
        } else {
            "none".to_string()
        };
        let visible = self.engine.visible();
        format!(
            "location={} horizon={} kilter={} above={} below={} phase={:?} battery={} link={}",
            location,
            self.engine.geometry().horizon,
            self.engine.geometry().kilter.raw(),
            visible.above,
            visible.below,
            self.engine.animation().phase(),
            self.battery,
            if self.connected { "up" } else { "down" },
        )
    }

    pub fn scene(&self) -> Scene<'_> {
        Scene {
            visible: self.engine.visible(),
            origin: self.engine.geometry().origin,
            metrics: &self.metrics,
            palette: &self.palette,
            preferences: &self.preferences,
            now: self.now,
            clock_24h: self.clock_24h,
            battery: self.battery,
        }
    }

    pub fn engine(&self) -> &EngineState {
        &self.engine
    }

    #[cfg(test)]
    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    #[cfg(test)]
    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn connected(&self) -> bool {
        self.connected
    }

    #[cfg(test)]
    pub fn today(&self) -> chrono::NaiveDate {
        self.now.date()
    }
}
