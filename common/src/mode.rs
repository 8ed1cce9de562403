use crate::{
    config::ControllerConfig,
    snapshot::DeviceSnapshot,
    types::{ControllerState, Mode, Season},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Automation is switched off; the cycle must not touch anything.
    Skip,
    /// A manual override is active; keep the previous mode and season.
    Hold { mode: Mode, season: Season },
    Resolved { mode: Mode, season: Season },
}

/// Maps occupancy and the control switches to an operating mode and season.
///
/// `manual` is the override flag as already updated for this cycle, so an
/// override cleared by an empty house resolves straight to `Absence`.
pub fn resolve(
    snapshot: &DeviceSnapshot,
    config: &ControllerConfig,
    prior: &ControllerState,
    manual: bool,
) -> Resolution {
    if !snapshot.automation_enabled {
        return Resolution::Skip;
    }

    if manual && snapshot.house_occupied {
        return Resolution::Hold {
            mode: prior.mode,
            season: prior.season,
        };
    }

    let season = snapshot.season.unwrap_or(prior.season);
    let use_presence_piece = snapshot
        .use_presence_piece
        .unwrap_or(config.use_presence_piece);

    let mode = if !snapshot.house_occupied {
        Mode::Absence
    } else if use_presence_piece && !snapshot.room_occupied {
        Mode::Eco
    } else {
        Mode::Comfort
    };

    Resolution::Resolved { mode, season }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn occupied() -> DeviceSnapshot {
        DeviceSnapshot {
            season: Some(Season::Heat),
            ..DeviceSnapshot::default()
        }
    }

    #[test]
    fn automation_off_skips() {
        let snapshot = DeviceSnapshot {
            automation_enabled: false,
            house_occupied: false,
            ..occupied()
        };

        assert_eq!(
            resolve(&snapshot, &ControllerConfig::default(), &ControllerState::default(), false),
            Resolution::Skip
        );
    }

    #[test]
    fn empty_house_is_absence() {
        let snapshot = DeviceSnapshot {
            house_occupied: false,
            ..occupied()
        };

        assert_eq!(
            resolve(&snapshot, &ControllerConfig::default(), &ControllerState::default(), false),
            Resolution::Resolved {
                mode: Mode::Absence,
                season: Season::Heat,
            }
        );
    }

    #[test]
    fn empty_room_is_eco_only_with_presence_piece() {
        let snapshot = DeviceSnapshot {
            room_occupied: false,
            ..occupied()
        };
        let prior = ControllerState::default();

        assert_eq!(
            resolve(&snapshot, &ControllerConfig::default(), &prior, false),
            Resolution::Resolved {
                mode: Mode::Eco,
                season: Season::Heat,
            }
        );

        let config = ControllerConfig {
            use_presence_piece: false,
            ..ControllerConfig::default()
        };
        assert_eq!(
            resolve(&snapshot, &config, &prior, false),
            Resolution::Resolved {
                mode: Mode::Comfort,
                season: Season::Heat,
            }
        );
    }

    #[test]
    fn presence_switch_overrides_config_default() {
        let snapshot = DeviceSnapshot {
            room_occupied: false,
            use_presence_piece: Some(false),
            ..occupied()
        };

        assert_eq!(
            resolve(&snapshot, &ControllerConfig::default(), &ControllerState::default(), false),
            Resolution::Resolved {
                mode: Mode::Comfort,
                season: Season::Heat,
            }
        );
    }

    #[test]
    fn season_comes_from_switch_not_outdoor_temp() {
        let snapshot = DeviceSnapshot {
            season: Some(Season::Cool),
            outdoor_temp: Some(-5.0),
            ..occupied()
        };

        assert_eq!(
            resolve(&snapshot, &ControllerConfig::default(), &ControllerState::default(), false),
            Resolution::Resolved {
                mode: Mode::Comfort,
                season: Season::Cool,
            }
        );
    }

    #[test]
    fn missing_season_keeps_prior() {
        let snapshot = DeviceSnapshot {
            season: None,
            ..occupied()
        };
        let prior = ControllerState {
            season: Season::Cool,
            ..ControllerState::default()
        };

        assert_eq!(
            resolve(&snapshot, &ControllerConfig::default(), &prior, false),
            Resolution::Resolved {
                mode: Mode::Comfort,
                season: Season::Cool,
            }
        );
    }

    #[test]
    fn manual_holds_while_house_occupied() {
        let snapshot = DeviceSnapshot {
            room_occupied: false,
            season: Some(Season::Cool),
            ..occupied()
        };
        let prior = ControllerState {
            mode: Mode::Comfort,
            season: Season::Heat,
            manual_override: true,
            ..ControllerState::default()
        };

        assert_eq!(
            resolve(&snapshot, &ControllerConfig::default(), &prior, true),
            Resolution::Hold {
                mode: Mode::Comfort,
                season: Season::Heat,
            }
        );
    }
}
