use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    setpoint::{setpoint_range, SetpointTable},
    topics::*,
};

pub const DEFAULT_HYSTERESIS_C: f32 = 0.5;
pub const DEFAULT_SETBACK_OFFSET_C: f32 = 1.0;
pub const MAX_HYSTERESIS_C: f32 = 5.0;
pub const MAX_SETBACK_OFFSET_C: f32 = 3.0;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("hysteresis must be between 0 and 5, got {0}")]
    Hysteresis(f32),
    #[error("setback offset must be between 0 and 3, got {0}")]
    SetbackOffset(f32),
    #[error("setpoint {name} must be between {min} and {max}, got {value}")]
    Setpoint {
        name: &'static str,
        value: f32,
        min: f32,
        max: f32,
    },
    #[error("source topic {0} cannot be empty")]
    EmptyTopic(&'static str),
}

/// Where the controller reads its inputs from and sends its commands to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceTopics {
    #[serde(rename = "outdoorTemp")]
    pub outdoor_temp: String,
    #[serde(rename = "roomTemp")]
    pub room_temp: String,
    #[serde(rename = "housePresence")]
    pub house_presence: String,
    #[serde(rename = "roomPresence")]
    pub room_presence: String,
    #[serde(rename = "automationSwitch")]
    pub automation_switch: String,
    #[serde(rename = "seasonSwitch")]
    pub season_switch: String,
    #[serde(rename = "presenceSwitch")]
    pub presence_switch: String,
    #[serde(rename = "actuatorState")]
    pub actuator_state: String,
    #[serde(rename = "actuatorModeCommand")]
    pub actuator_mode_command: String,
    #[serde(rename = "actuatorTempCommand")]
    pub actuator_temp_command: String,
}

impl Default for SourceTopics {
    fn default() -> Self {
        Self {
            outdoor_temp: TOPIC_SENSOR_OUTDOOR_TEMP.to_string(),
            room_temp: TOPIC_SENSOR_ROOM_TEMP.to_string(),
            house_presence: TOPIC_PRESENCE_HOUSE.to_string(),
            room_presence: TOPIC_PRESENCE_ROOM.to_string(),
            automation_switch: TOPIC_SWITCH_AUTOMATION.to_string(),
            season_switch: TOPIC_SWITCH_SEASON.to_string(),
            presence_switch: TOPIC_SWITCH_PRESENCE.to_string(),
            actuator_state: TOPIC_ACTUATOR_STATE.to_string(),
            actuator_mode_command: TOPIC_CMD_ACTUATOR_MODE.to_string(),
            actuator_temp_command: TOPIC_CMD_ACTUATOR_TEMP.to_string(),
        }
    }
}

impl SourceTopics {
    fn named(&self) -> [(&'static str, &str); 10] {
        [
            ("outdoorTemp", self.outdoor_temp.as_str()),
            ("roomTemp", self.room_temp.as_str()),
            ("housePresence", self.house_presence.as_str()),
            ("roomPresence", self.room_presence.as_str()),
            ("automationSwitch", self.automation_switch.as_str()),
            ("seasonSwitch", self.season_switch.as_str()),
            ("presenceSwitch", self.presence_switch.as_str()),
            ("actuatorState", self.actuator_state.as_str()),
            ("actuatorModeCommand", self.actuator_mode_command.as_str()),
            ("actuatorTempCommand", self.actuator_temp_command.as_str()),
        ]
    }

    /// Topics the controller subscribes to.
    pub fn inputs(&self) -> [&str; 8] {
        [
            self.outdoor_temp.as_str(),
            self.room_temp.as_str(),
            self.house_presence.as_str(),
            self.room_presence.as_str(),
            self.automation_switch.as_str(),
            self.season_switch.as_str(),
            self.presence_switch.as_str(),
            self.actuator_state.as_str(),
        ]
    }
}

/// Missing keys take their default, so a partial update only has to carry
/// the values it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    #[serde(rename = "hysteresis")]
    pub hysteresis_c: f32,
    #[serde(rename = "setbackOffset")]
    pub setback_offset_c: f32,
    pub setpoints: SetpointTable,
    #[serde(rename = "usePresencePiece")]
    pub use_presence_piece: bool,
    pub sources: SourceTopics,
    #[serde(rename = "fallbackRoomTemp")]
    pub fallback_room_temp_c: f32,
}

fn default_fallback_room_temp() -> f32 {
    20.0
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            hysteresis_c: DEFAULT_HYSTERESIS_C,
            setback_offset_c: DEFAULT_SETBACK_OFFSET_C,
            setpoints: SetpointTable::default(),
            use_presence_piece: true,
            sources: SourceTopics::default(),
            fallback_room_temp_c: default_fallback_room_temp(),
        }
    }
}

impl ControllerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.hysteresis_c.is_finite() || !(0.0..=MAX_HYSTERESIS_C).contains(&self.hysteresis_c)
        {
            return Err(ConfigError::Hysteresis(self.hysteresis_c));
        }
        if !self.setback_offset_c.is_finite()
            || !(0.0..=MAX_SETBACK_OFFSET_C).contains(&self.setback_offset_c)
        {
            return Err(ConfigError::SetbackOffset(self.setback_offset_c));
        }
        for (name, season, value) in self.setpoints.entries() {
            let Some(value) = value else {
                continue;
            };
            let (min, max) = setpoint_range(season);
            if !value.is_finite() || !(min..=max).contains(&value) {
                return Err(ConfigError::Setpoint {
                    name,
                    value,
                    min,
                    max,
                });
            }
        }
        for (name, topic) in self.sources.named() {
            if topic.trim().is_empty() {
                return Err(ConfigError::EmptyTopic(name));
            }
        }
        Ok(())
    }

    /// Brings persisted values back into range instead of rejecting them.
    pub fn sanitize(&mut self) {
        self.hysteresis_c = sanitize_band(self.hysteresis_c, DEFAULT_HYSTERESIS_C, MAX_HYSTERESIS_C);
        self.setback_offset_c = sanitize_band(
            self.setback_offset_c,
            DEFAULT_SETBACK_OFFSET_C,
            MAX_SETBACK_OFFSET_C,
        );

        for (season, entry) in self.setpoints.entries_mut() {
            let (min, max) = setpoint_range(season);
            *entry = entry
                .filter(|value| value.is_finite())
                .map(|value| value.clamp(min, max));
        }

        if !self.fallback_room_temp_c.is_finite() {
            self.fallback_room_temp_c = default_fallback_room_temp();
        }

        let defaults = SourceTopics::default();
        let sources = &mut self.sources;
        for (topic, default) in [
            (&mut sources.outdoor_temp, defaults.outdoor_temp),
            (&mut sources.room_temp, defaults.room_temp),
            (&mut sources.house_presence, defaults.house_presence),
            (&mut sources.room_presence, defaults.room_presence),
            (&mut sources.automation_switch, defaults.automation_switch),
            (&mut sources.season_switch, defaults.season_switch),
            (&mut sources.presence_switch, defaults.presence_switch),
            (&mut sources.actuator_state, defaults.actuator_state),
            (&mut sources.actuator_mode_command, defaults.actuator_mode_command),
            (&mut sources.actuator_temp_command, defaults.actuator_temp_command),
        ] {
            if topic.trim().is_empty() {
                *topic = default;
            }
        }
    }
}

fn sanitize_band(value: f32, default: f32, max: f32) -> f32 {
    if value.is_finite() {
        value.clamp(0.0, max)
    } else {
        default
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    pub cycle_interval_ms: u64,
    pub sensor_stale_timeout_ms: u64,
    pub command_timeout_ms: u64,
    pub state_publish_interval_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            cycle_interval_ms: 30_000,
            sensor_stale_timeout_ms: 300_000,
            command_timeout_ms: 5_000,
            state_publish_interval_ms: 10_000,
        }
    }
}

impl TimingConfig {
    pub fn sanitize(&mut self) {
        self.cycle_interval_ms = self.cycle_interval_ms.clamp(1_000, 3_600_000);
        self.command_timeout_ms = self.command_timeout_ms.clamp(100, 60_000);
        self.state_publish_interval_ms = self.state_publish_interval_ms.clamp(1_000, 3_600_000);
        if self.sensor_stale_timeout_ms < self.cycle_interval_ms {
            self.sensor_stale_timeout_ms = self.cycle_interval_ms;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub mqtt_host: String,
    pub mqtt_port: u16,
    pub mqtt_user: String,
    pub mqtt_pass: String,
    pub mqtt_client_id: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            mqtt_host: "127.0.0.1".to_string(),
            mqtt_port: 1883,
            mqtt_user: String::new(),
            mqtt_pass: String::new(),
            mqtt_client_id: "minisplit-controller".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub controller: ControllerConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub network: NetworkConfig,
}

impl RuntimeConfig {
    pub fn sanitize(&mut self) {
        self.controller.sanitize();
        self.timing.sanitize();
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert_eq!(ControllerConfig::default().validate(), Ok(()));
    }

    #[test]
    fn rejects_out_of_range_bands() {
        let config = ControllerConfig {
            hysteresis_c: -0.1,
            ..ControllerConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::Hysteresis(-0.1)));

        let config = ControllerConfig {
            setback_offset_c: 3.5,
            ..ControllerConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::SetbackOffset(3.5)));
    }

    #[test]
    fn rejects_cool_setpoint_below_range() {
        let mut config = ControllerConfig::default();
        config.setpoints.eco_cool_c = Some(18.0);

        assert_eq!(
            config.validate(),
            Err(ConfigError::Setpoint {
                name: "ecoCool",
                value: 18.0,
                min: 20.0,
                max: 30.0,
            })
        );
    }

    #[test]
    fn rejects_empty_topic() {
        let mut config = ControllerConfig::default();
        config.sources.room_temp = "  ".to_string();

        assert_eq!(config.validate(), Err(ConfigError::EmptyTopic("roomTemp")));
    }

    #[test]
    fn sanitize_clamps_and_restores() {
        let mut config = ControllerConfig {
            hysteresis_c: 9.0,
            setback_offset_c: f32::NAN,
            ..ControllerConfig::default()
        };
        config.setpoints.comfort_heat_c = Some(30.0);
        config.setpoints.absence_cool_c = Some(f32::INFINITY);
        config.sources.actuator_state = String::new();

        config.sanitize();

        assert_eq!(config.hysteresis_c, MAX_HYSTERESIS_C);
        assert_eq!(config.setback_offset_c, DEFAULT_SETBACK_OFFSET_C);
        assert_eq!(config.setpoints.comfort_heat_c, Some(25.0));
        assert_eq!(config.setpoints.absence_cool_c, None);
        assert_eq!(config.sources.actuator_state, TOPIC_ACTUATOR_STATE);
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn runtime_config_fills_missing_sections() {
        let raw = r#"{"controller": {"hysteresis": 2.0, "setbackOffset": 1.0}}"#;
        let runtime: RuntimeConfig = serde_json::from_str(raw).unwrap();

        assert_eq!(runtime.controller.hysteresis_c, 2.0);
        assert!(runtime.controller.use_presence_piece);
        assert_eq!(runtime.controller.sources, SourceTopics::default());
        assert_eq!(runtime.timing.cycle_interval_ms, 30_000);
        assert_eq!(runtime.network.mqtt_port, 1883);
    }

    #[test]
    fn partial_update_keeps_defaults() {
        let raw = r#"{"setbackOffset": 2.0, "setpoints": {"comfortHeat": 21.0}}"#;
        let config: ControllerConfig = serde_json::from_str(raw).unwrap();

        assert_eq!(config.setback_offset_c, 2.0);
        assert_eq!(config.hysteresis_c, DEFAULT_HYSTERESIS_C);
        assert_eq!(config.setpoints.comfort_heat_c, Some(21.0));
        assert!(config.use_presence_piece);
        assert_eq!(config.sources, SourceTopics::default());
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn serializes_camel_case_keys() {
        let value = serde_json::to_value(ControllerConfig::default()).unwrap();

        for key in [
            "hysteresis",
            "setbackOffset",
            "setpoints",
            "usePresencePiece",
            "sources",
            "fallbackRoomTemp",
        ] {
            assert!(value.get(key).is_some(), "missing key {key}");
        }
        assert!(value.get("hysteresis_c").is_none());
    }
}
