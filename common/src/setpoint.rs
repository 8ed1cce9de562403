use serde::{Deserialize, Serialize};

use crate::types::{Mode, Season};

pub const DEFAULT_ABSENCE_HEAT_C: f32 = 18.0;
pub const DEFAULT_ECO_HEAT_C: f32 = 20.0;
pub const DEFAULT_COMFORT_HEAT_C: f32 = 22.0;
pub const DEFAULT_ABSENCE_COOL_C: f32 = 26.0;
pub const DEFAULT_ECO_COOL_C: f32 = 25.0;
pub const DEFAULT_COMFORT_COOL_C: f32 = 24.0;

pub const HEAT_SETPOINT_RANGE_C: (f32, f32) = (15.0, 25.0);
pub const COOL_SETPOINT_RANGE_C: (f32, f32) = (20.0, 30.0);

/// Per-installation setpoints. Entries left unset fall back to the built-in
/// defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SetpointTable {
    #[serde(default, rename = "absenceHeat")]
    pub absence_heat_c: Option<f32>,
    #[serde(default, rename = "ecoHeat")]
    pub eco_heat_c: Option<f32>,
    #[serde(default, rename = "comfortHeat")]
    pub comfort_heat_c: Option<f32>,
    #[serde(default, rename = "absenceCool")]
    pub absence_cool_c: Option<f32>,
    #[serde(default, rename = "ecoCool")]
    pub eco_cool_c: Option<f32>,
    #[serde(default, rename = "comfortCool")]
    pub comfort_cool_c: Option<f32>,
}

impl SetpointTable {
    pub fn base_setpoint(&self, mode: Mode, season: Season) -> f32 {
        let (configured, fallback) = match (season, mode) {
            (Season::Heat, Mode::Absence) => (self.absence_heat_c, DEFAULT_ABSENCE_HEAT_C),
            (Season::Heat, Mode::Eco) => (self.eco_heat_c, DEFAULT_ECO_HEAT_C),
            (Season::Heat, Mode::Comfort) => (self.comfort_heat_c, DEFAULT_COMFORT_HEAT_C),
            (Season::Cool, Mode::Absence) => (self.absence_cool_c, DEFAULT_ABSENCE_COOL_C),
            (Season::Cool, Mode::Eco) => (self.eco_cool_c, DEFAULT_ECO_COOL_C),
            (Season::Cool, Mode::Comfort) => (self.comfort_cool_c, DEFAULT_COMFORT_COOL_C),
        };
        configured.filter(|value| value.is_finite()).unwrap_or(fallback)
    }

    pub(crate) fn entries_mut(&mut self) -> [(Season, &mut Option<f32>); 6] {
        [
            (Season::Heat, &mut self.absence_heat_c),
            (Season::Heat, &mut self.eco_heat_c),
            (Season::Heat, &mut self.comfort_heat_c),
            (Season::Cool, &mut self.absence_cool_c),
            (Season::Cool, &mut self.eco_cool_c),
            (Season::Cool, &mut self.comfort_cool_c),
        ]
    }

    pub(crate) fn entries(&self) -> [(&'static str, Season, Option<f32>); 6] {
        [
            ("absenceHeat", Season::Heat, self.absence_heat_c),
            ("ecoHeat", Season::Heat, self.eco_heat_c),
            ("comfortHeat", Season::Heat, self.comfort_heat_c),
            ("absenceCool", Season::Cool, self.absence_cool_c),
            ("ecoCool", Season::Cool, self.eco_cool_c),
            ("comfortCool", Season::Cool, self.comfort_cool_c),
        ]
    }
}

pub fn setpoint_range(season: Season) -> (f32, f32) {
    match season {
        Season::Heat => HEAT_SETPOINT_RANGE_C,
        Season::Cool => COOL_SETPOINT_RANGE_C,
    }
}
