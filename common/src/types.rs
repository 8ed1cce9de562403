use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Season {
    Heat,
    Cool,
}

impl Season {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Heat => "HEAT",
            Self::Cool => "COOL",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Heat => "Heating",
            Self::Cool => "Cooling",
        }
    }
}

/// Occupancy-derived operating tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Mode {
    Absence,
    Eco,
    Comfort,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Absence => "ABSENCE",
            Self::Eco => "ECO",
            Self::Comfort => "COMFORT",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HvacMode {
    Off,
    Heat,
    Cool,
}

impl HvacMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Off => "OFF",
            Self::Heat => "HEAT",
            Self::Cool => "COOL",
        }
    }

    /// Value understood by the unit's mode command.
    pub fn wire_value(self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Heat => "heat",
            Self::Cool => "cool",
        }
    }

    /// Parses a mode reported by the unit. Modes the controller never drives
    /// (`auto`, `dry`, `fan_only`, ...) yield `None`.
    pub fn from_reported(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "off" => Some(Self::Off),
            "heat" => Some(Self::Heat),
            "cool" => Some(Self::Cool),
            _ => None,
        }
    }
}

impl From<Season> for HvacMode {
    fn from(season: Season) -> Self {
        match season {
            Season::Heat => Self::Heat,
            Season::Cool => Self::Cool,
        }
    }
}

/// The controller's retained memory between cycles.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControllerState {
    pub season: Season,
    pub mode: Mode,
    #[serde(rename = "manualOverride")]
    pub manual_override: bool,
    #[serde(rename = "effectiveTarget")]
    pub effective_target: Option<f32>,
    #[serde(rename = "hvacMode")]
    pub hvac_mode: HvacMode,
    #[serde(rename = "lastAction")]
    pub last_action: String,
}

impl Default for ControllerState {
    fn default() -> Self {
        Self {
            season: Season::Heat,
            mode: Mode::Absence,
            manual_override: false,
            effective_target: None,
            hvac_mode: HvacMode::Off,
            last_action: "Initialising".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ActuatorCommand {
    TurnOff,
    SetMode(HvacMode),
    SetTemperature(f32),
}

#[derive(Debug, Clone, Serialize)]
pub struct ControllerStatePayload {
    pub season: &'static str,
    pub mode: &'static str,
    #[serde(rename = "hvacMode")]
    pub hvac_mode: &'static str,
    pub target: Option<f32>,
    #[serde(rename = "manualOverride")]
    pub manual_override: bool,
    #[serde(rename = "lastAction")]
    pub last_action: String,
}

impl From<&ControllerState> for ControllerStatePayload {
    fn from(state: &ControllerState) -> Self {
        Self {
            season: state.season.as_str(),
            mode: state.mode.as_str(),
            hvac_mode: state.hvac_mode.as_str(),
            target: state.effective_target,
            manual_override: state.manual_override,
            last_action: state.last_action.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ControllerStatus {
    pub state: ControllerStatePayload,
    #[serde(rename = "roomTemp")]
    pub room_temp: Option<f32>,
    #[serde(rename = "outdoorTemp")]
    pub outdoor_temp: Option<f32>,
    #[serde(rename = "houseOccupied")]
    pub house_occupied: bool,
    #[serde(rename = "roomOccupied")]
    pub room_occupied: bool,
    #[serde(rename = "automationEnabled")]
    pub automation_enabled: bool,
    #[serde(rename = "usePresencePiece")]
    pub use_presence_piece: bool,
    pub hysteresis: f32,
    #[serde(rename = "setbackOffset")]
    pub setback_offset: f32,
    #[serde(rename = "actuatorMode")]
    pub actuator_mode: Option<&'static str>,
    #[serde(rename = "actuatorSetpoint")]
    pub actuator_setpoint: Option<f32>,
    pub headline: String,
    pub reason: String,
    pub readings: String,
    #[serde(rename = "lastCycleEpoch")]
    pub last_cycle_epoch: Option<i64>,
}
