use crate::{
    snapshot::DeviceSnapshot,
    types::{ControllerState, Mode},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub headline: String,
    pub reason: String,
    pub readings: String,
}

fn format_temp(value: Option<f32>) -> String {
    value
        .map(|value| format!("{value:.1}°C"))
        .unwrap_or_else(|| "N/A".to_string())
}

/// One-line explanation of what the controller is doing and why.
pub fn describe(state: &ControllerState, snapshot: &DeviceSnapshot) -> StatusReport {
    let (headline, reason) = headline_and_reason(state, snapshot);
    StatusReport {
        headline,
        reason,
        readings: format!(
            "Room {} / Outdoor {}",
            format_temp(snapshot.room_temp),
            format_temp(snapshot.outdoor_temp)
        ),
    }
}

fn headline_and_reason(state: &ControllerState, snapshot: &DeviceSnapshot) -> (String, String) {
    if !snapshot.automation_enabled {
        return (
            "AUTOMATION DISABLED - the unit is not controlled automatically".to_string(),
            "Manual control only".to_string(),
        );
    }

    if state.manual_override {
        return (
            format!("MANUAL MODE - last action: {}", state.last_action),
            "The unit was changed by hand; automatic control resumes once the house is empty"
                .to_string(),
        );
    }

    let season = state.season.label();
    let target = format_temp(state.effective_target);

    if !snapshot.house_occupied {
        return (
            "HOUSE EMPTY - unit off to save energy".to_string(),
            "Nobody is home".to_string(),
        );
    }

    match state.mode {
        Mode::Absence => (
            "ABSENCE - unit off".to_string(),
            "Absence mode active".to_string(),
        ),
        Mode::Eco => (
            format!("ECO - {season} at {target} (room empty)"),
            "Room empty, running at the economy setpoint".to_string(),
        ),
        Mode::Comfort => (
            format!("COMFORT - {season} at {target} (room occupied)"),
            "Room occupied, running at the comfort setpoint".to_string(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::types::{HvacMode, Season};

    fn comfort() -> ControllerState {
        ControllerState {
            season: Season::Heat,
            mode: Mode::Comfort,
            effective_target: Some(22.0),
            hvac_mode: HvacMode::Heat,
            ..ControllerState::default()
        }
    }

    #[test]
    fn automation_off_wins() {
        let snapshot = DeviceSnapshot {
            automation_enabled: false,
            ..DeviceSnapshot::default()
        };

        let report = describe(&comfort(), &snapshot);

        assert!(report.headline.starts_with("AUTOMATION DISABLED"));
    }

    #[test]
    fn manual_shows_last_action() {
        let state = ControllerState {
            manual_override: true,
            last_action: "Manual mode detected".to_string(),
            ..comfort()
        };

        let report = describe(&state, &DeviceSnapshot::default());

        assert_eq!(report.headline, "MANUAL MODE - last action: Manual mode detected");
    }

    #[test]
    fn comfort_headline_names_season_and_target() {
        let report = describe(&comfort(), &DeviceSnapshot::default());

        assert_eq!(report.headline, "COMFORT - Heating at 22.0°C (room occupied)");
    }

    #[test]
    fn eco_without_target_shows_na() {
        let state = ControllerState {
            mode: Mode::Eco,
            effective_target: None,
            ..comfort()
        };

        let report = describe(&state, &DeviceSnapshot::default());

        assert_eq!(report.headline, "ECO - Heating at N/A (room empty)");
    }

    #[test]
    fn empty_house_headline() {
        let snapshot = DeviceSnapshot {
            house_occupied: false,
            ..DeviceSnapshot::default()
        };

        let report = describe(&ControllerState::default(), &snapshot);

        assert_eq!(report.headline, "HOUSE EMPTY - unit off to save energy");
    }

    #[test]
    fn readings_include_outdoor_temperature() {
        let snapshot = DeviceSnapshot {
            room_temp: Some(21.0),
            outdoor_temp: Some(-4.5),
            ..DeviceSnapshot::default()
        };

        let report = describe(&comfort(), &snapshot);

        assert_eq!(report.readings, "Room 21.0°C / Outdoor -4.5°C");
    }

    #[test]
    fn missing_readings_show_na() {
        let report = describe(&comfort(), &DeviceSnapshot::default());

        assert_eq!(report.readings, "Room N/A / Outdoor N/A");
    }
}
