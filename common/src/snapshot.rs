use serde::Deserialize;
use thiserror::Error;

use crate::{
    config::SourceTopics,
    types::{HvacMode, Season},
};

/// What the unit last reported about itself.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ActuatorState {
    pub mode: Option<HvacMode>,
    pub setpoint: Option<f32>,
}

/// Everything one control cycle looks at. Rebuilt from scratch every cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceSnapshot {
    pub outdoor_temp: Option<f32>,
    pub room_temp: Option<f32>,
    pub house_occupied: bool,
    pub room_occupied: bool,
    pub automation_enabled: bool,
    pub season: Option<Season>,
    pub use_presence_piece: Option<bool>,
    pub actuator: Option<ActuatorState>,
}

impl Default for DeviceSnapshot {
    fn default() -> Self {
        Self {
            outdoor_temp: None,
            room_temp: None,
            house_occupied: true,
            room_occupied: true,
            automation_enabled: true,
            season: None,
            use_presence_piece: None,
            actuator: None,
        }
    }
}

impl DeviceSnapshot {
    pub fn actuator_reported_mode(&self) -> Option<HvacMode> {
        self.actuator.and_then(|actuator| actuator.mode)
    }

    pub fn actuator_reported_setpoint(&self) -> Option<f32> {
        self.actuator.and_then(|actuator| actuator.setpoint)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotError {
    #[error("sensor source is not connected")]
    SourceUnavailable,
}

pub trait SnapshotReader {
    fn read_snapshot(&self, now_ms: u64) -> Result<DeviceSnapshot, SnapshotError>;
}

pub fn parse_temperature(payload: &str) -> Option<f32> {
    payload
        .trim()
        .parse::<f32>()
        .ok()
        .filter(|value| value.is_finite() && (-50.0..=70.0).contains(value))
}

pub fn parse_switch(payload: &str) -> Option<bool> {
    match payload.trim().to_ascii_lowercase().as_str() {
        "on" | "true" | "1" | "home" | "occupied" | "detected" => Some(true),
        "off" | "false" | "0" | "away" | "not_home" | "clear" => Some(false),
        _ => None,
    }
}

/// The season switch is ON for heating, OFF for cooling.
pub fn parse_season(payload: &str) -> Option<Season> {
    match payload.trim().to_ascii_lowercase().as_str() {
        "heat" | "heating" => Some(Season::Heat),
        "cool" | "cooling" => Some(Season::Cool),
        other => parse_switch(other).map(|on| if on { Season::Heat } else { Season::Cool }),
    }
}

#[derive(Debug, Deserialize)]
struct ActuatorStateWire {
    #[serde(default, alias = "hvac_mode", alias = "state")]
    mode: Option<String>,
    #[serde(default, alias = "setpoint", alias = "target")]
    temperature: Option<f64>,
}

/// Parses the unit's JSON state report, e.g. `{"mode": "heat", "temperature": 22}`.
pub fn parse_actuator_state(payload: &str) -> Option<ActuatorState> {
    let wire: ActuatorStateWire = serde_json::from_str(payload).ok()?;
    Some(ActuatorState {
        mode: wire.mode.as_deref().and_then(HvacMode::from_reported),
        setpoint: wire
            .temperature
            .map(|value| value as f32)
            .filter(|value| value.is_finite()),
    })
}

#[derive(Debug, Clone, Copy)]
struct Timestamped {
    value: f32,
    at_ms: u64,
}

/// Latest readings received from the outside world, folded into a
/// [`DeviceSnapshot`] on demand. Temperatures expire after
/// `stale_timeout_ms`; switches and presence are held until replaced.
#[derive(Debug, Clone)]
pub struct SensorCache {
    stale_timeout_ms: u64,
    connected: bool,
    outdoor_temp: Option<Timestamped>,
    room_temp: Option<Timestamped>,
    house_occupied: Option<bool>,
    room_occupied: Option<bool>,
    automation_enabled: bool,
    season: Season,
    use_presence_piece: Option<bool>,
    actuator: Option<ActuatorState>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadingUpdate {
    Applied,
    Rejected,
    UnknownTopic,
}

impl SensorCache {
    pub fn new(stale_timeout_ms: u64) -> Self {
        Self {
            stale_timeout_ms,
            connected: false,
            outdoor_temp: None,
            room_temp: None,
            house_occupied: None,
            room_occupied: None,
            automation_enabled: true,
            season: Season::Heat,
            use_presence_piece: None,
            actuator: None,
        }
    }

    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn set_stale_timeout_ms(&mut self, stale_timeout_ms: u64) {
        self.stale_timeout_ms = stale_timeout_ms;
    }

    pub fn set_automation_enabled(&mut self, enabled: bool) {
        self.automation_enabled = enabled;
    }

    pub fn set_season(&mut self, season: Season) {
        self.season = season;
    }

    pub fn set_use_presence_piece(&mut self, enabled: bool) {
        self.use_presence_piece = Some(enabled);
    }

    pub fn actuator(&self) -> Option<ActuatorState> {
        self.actuator
    }

    /// Routes one raw message to the reading it belongs to.
    pub fn apply_message(
        &mut self,
        sources: &SourceTopics,
        topic: &str,
        payload: &str,
        now_ms: u64,
    ) -> ReadingUpdate {
        let applied = if topic == sources.outdoor_temp {
            parse_temperature(payload)
                .map(|value| self.outdoor_temp = Some(Timestamped { value, at_ms: now_ms }))
        } else if topic == sources.room_temp {
            parse_temperature(payload)
                .map(|value| self.room_temp = Some(Timestamped { value, at_ms: now_ms }))
        } else if topic == sources.house_presence {
            parse_switch(payload).map(|value| self.house_occupied = Some(value))
        } else if topic == sources.room_presence {
            parse_switch(payload).map(|value| self.room_occupied = Some(value))
        } else if topic == sources.automation_switch {
            parse_switch(payload).map(|value| self.automation_enabled = value)
        } else if topic == sources.season_switch {
            parse_season(payload).map(|value| self.season = value)
        } else if topic == sources.presence_switch {
            parse_switch(payload).map(|value| self.use_presence_piece = Some(value))
        } else if topic == sources.actuator_state {
            parse_actuator_state(payload).map(|value| self.actuator = Some(value))
        } else {
            return ReadingUpdate::UnknownTopic;
        };

        if applied.is_some() {
            ReadingUpdate::Applied
        } else {
            ReadingUpdate::Rejected
        }
    }

    fn fresh(&self, reading: Option<Timestamped>, now_ms: u64) -> Option<f32> {
        reading
            .filter(|reading| now_ms.saturating_sub(reading.at_ms) < self.stale_timeout_ms)
            .map(|reading| reading.value)
    }

    /// Snapshot regardless of connection state, for status reporting.
    pub fn peek(&self, now_ms: u64) -> DeviceSnapshot {
        DeviceSnapshot {
            outdoor_temp: self.fresh(self.outdoor_temp, now_ms),
            room_temp: self.fresh(self.room_temp, now_ms),
            house_occupied: self.house_occupied.unwrap_or(true),
            room_occupied: self.room_occupied.unwrap_or(true),
            automation_enabled: self.automation_enabled,
            season: Some(self.season),
            use_presence_piece: self.use_presence_piece,
            actuator: self.actuator,
        }
    }
}

impl SnapshotReader for SensorCache {
    fn read_snapshot(&self, now_ms: u64) -> Result<DeviceSnapshot, SnapshotError> {
        if !self.connected {
            return Err(SnapshotError::SourceUnavailable);
        }
        Ok(self.peek(now_ms))
    }
}
