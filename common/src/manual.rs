use crate::{snapshot::DeviceSnapshot, types::ControllerState};

/// Largest gap between the unit's setpoint and ours that is still read as
/// rounding or lag rather than a user change.
pub const SETPOINT_DEAD_BAND_C: f32 = 0.5;

#[derive(Debug, Clone, PartialEq)]
pub struct ManualDetection {
    pub manual_override: bool,
    /// Set when the flag changed this cycle.
    pub action: Option<String>,
}

/// The unit setpoint as last reported to us and as last sent by us.
///
/// A user change is a report that moved since the previous cycle, so a unit
/// that has not yet acknowledged our own command is never read as manual.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SetpointMemory {
    last_reported: Option<f32>,
    last_commanded: Option<f32>,
}

impl SetpointMemory {
    /// Records the unit's report. A missing report keeps the previous one.
    pub fn observe(&mut self, reported: Option<f32>) {
        if reported.is_some() {
            self.last_reported = reported;
        }
    }

    pub fn commanded(&mut self, setpoint: f32) {
        self.last_commanded = Some(setpoint);
    }

    pub fn last_reported(&self) -> Option<f32> {
        self.last_reported
    }

    fn is_new_report(&self, reported: f32) -> bool {
        self.last_reported
            .map(|seen| (seen - reported).abs() > f32::EPSILON)
            .unwrap_or(true)
    }

    fn is_own_command(&self, reported: f32) -> bool {
        self.last_commanded
            .map(|sent| (sent - reported).abs() <= SETPOINT_DEAD_BAND_C)
            .unwrap_or(false)
    }
}

/// Infers whether the user changed the unit by hand since the last cycle.
///
/// The flag is sticky: once set it is only cleared by a cycle that sees the
/// house empty. `memory` must hold the observations of previous cycles only.
pub fn detect(
    snapshot: &DeviceSnapshot,
    prior: &ControllerState,
    memory: &SetpointMemory,
) -> ManualDetection {
    if prior.manual_override {
        if snapshot.house_occupied {
            return ManualDetection {
                manual_override: true,
                action: None,
            };
        }
        return ManualDetection {
            manual_override: false,
            action: Some("Manual mode cleared - house empty".to_string()),
        };
    }

    let (Some(target), Some(reported)) = (
        prior.effective_target,
        snapshot.actuator_reported_setpoint(),
    ) else {
        return ManualDetection {
            manual_override: false,
            action: None,
        };
    };

    let user_change = memory.is_new_report(reported)
        && !memory.is_own_command(reported)
        && (reported - target).abs() > SETPOINT_DEAD_BAND_C;

    if user_change {
        ManualDetection {
            manual_override: true,
            action: Some(format!(
                "Manual mode detected - setpoint changed from {target:.1}°C to {reported:.1}°C"
            )),
        }
    } else {
        ManualDetection {
            manual_override: false,
            action: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    use super::*;
    use crate::{snapshot::ActuatorState, types::HvacMode};

    fn reporting(setpoint: Option<f32>) -> DeviceSnapshot {
        DeviceSnapshot {
            actuator: Some(ActuatorState {
                mode: Some(HvacMode::Heat),
                setpoint,
            }),
            ..DeviceSnapshot::default()
        }
    }

    fn targeting(target: Option<f32>) -> ControllerState {
        ControllerState {
            effective_target: target,
            hvac_mode: if target.is_some() {
                HvacMode::Heat
            } else {
                HvacMode::Off
            },
            ..ControllerState::default()
        }
    }

    #[test]
    fn small_difference_is_not_manual() {
        let detection = detect(
            &reporting(Some(22.5)),
            &targeting(Some(22.0)),
            &SetpointMemory::default(),
        );

        assert!(!detection.manual_override);
        assert_eq!(detection.action, None);
    }

    #[test]
    fn large_difference_is_manual() {
        let detection = detect(
            &reporting(Some(24.0)),
            &targeting(Some(22.0)),
            &SetpointMemory::default(),
        );

        assert!(detection.manual_override);
        assert_eq!(
            detection.action.as_deref(),
            Some("Manual mode detected - setpoint changed from 22.0°C to 24.0°C")
        );
    }

    #[test]
    fn needs_both_targets() {
        let memory = SetpointMemory::default();

        assert!(!detect(&reporting(None), &targeting(Some(22.0)), &memory).manual_override);
        assert!(!detect(&reporting(Some(28.0)), &targeting(None), &memory).manual_override);
        assert!(
            !detect(
                &DeviceSnapshot::default(),
                &targeting(Some(22.0)),
                &memory
            )
            .manual_override
        );
    }

    #[test]
    fn empty_house_clears_override() {
        let prior = ControllerState {
            manual_override: true,
            ..targeting(Some(22.0))
        };
        let snapshot = DeviceSnapshot {
            house_occupied: false,
            ..reporting(Some(26.0))
        };

        let detection = detect(&snapshot, &prior, &SetpointMemory::default());

        assert!(!detection.manual_override);
        assert_eq!(
            detection.action.as_deref(),
            Some("Manual mode cleared - house empty")
        );
    }

    #[test]
    fn unchanged_report_is_not_manual() {
        // We set back to 21 but the unit still shows the 22 it showed before.
        let mut memory = SetpointMemory::default();
        memory.observe(Some(22.0));
        memory.commanded(21.0);

        let detection = detect(&reporting(Some(22.0)), &targeting(Some(21.0)), &memory);

        assert!(!detection.manual_override);
        assert_eq!(detection.action, None);
    }

    #[test]
    fn acknowledged_command_is_not_manual() {
        let mut memory = SetpointMemory::default();
        memory.observe(Some(24.0));
        memory.commanded(22.0);

        // Target has moved on to 23 before the unit caught up with our 22.
        let detection = detect(&reporting(Some(22.0)), &targeting(Some(23.0)), &memory);

        assert!(!detection.manual_override);
    }

    #[test]
    fn moved_report_away_from_target_is_manual() {
        let mut memory = SetpointMemory::default();
        memory.observe(Some(22.0));
        memory.commanded(22.0);

        let detection = detect(&reporting(Some(25.0)), &targeting(Some(22.0)), &memory);

        assert!(detection.manual_override);
    }

    #[test]
    fn missing_report_keeps_last_observation() {
        let mut memory = SetpointMemory::default();
        memory.observe(Some(22.0));
        memory.observe(None);

        assert_eq!(memory.last_reported(), Some(22.0));
    }

    proptest! {
        #[test]
        fn override_sticks_while_house_occupied(
            reported in proptest::option::of(10.0f32..35.0),
            target in proptest::option::of(10.0f32..35.0),
            room_occupied in any::<bool>(),
        ) {
            let prior = ControllerState {
                manual_override: true,
                ..targeting(target)
            };
            let snapshot = DeviceSnapshot {
                room_occupied,
                ..reporting(reported)
            };

            let detection = detect(&snapshot, &prior, &SetpointMemory::default());

            prop_assert!(detection.manual_override);
        }
    }
}
