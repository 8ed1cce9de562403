use crate::{
    manual::SETPOINT_DEAD_BAND_C,
    snapshot::ActuatorState,
    types::{ActuatorCommand, ControllerState, HvacMode},
};

/// Commands needed to bring the unit in line with `state`.
///
/// Uses the same dead-band as override detection so that a setpoint we sent
/// ourselves never reads back as a user change. Without a report from the unit
/// nothing is sent; the next cycle tries again.
pub fn dispatch(state: &ControllerState, actuator: Option<&ActuatorState>) -> Vec<ActuatorCommand> {
    let mut commands = Vec::new();
    let Some(actuator) = actuator else {
        return commands;
    };

    if state.hvac_mode == HvacMode::Off {
        if actuator.mode != Some(HvacMode::Off) {
            commands.push(ActuatorCommand::TurnOff);
        }
    } else if actuator.mode != Some(state.hvac_mode) {
        commands.push(ActuatorCommand::SetMode(state.hvac_mode));
    }

    if let Some(target) = state.effective_target {
        let diverged = actuator
            .setpoint
            .map(|setpoint| (setpoint - target).abs() > SETPOINT_DEAD_BAND_C)
            .unwrap_or(true);
        if diverged {
            commands.push(ActuatorCommand::SetTemperature(target));
        }
    }

    commands
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    use super::*;
    use crate::types::{Mode, Season};

    fn heating_at(target: f32) -> ControllerState {
        ControllerState {
            season: Season::Heat,
            mode: Mode::Comfort,
            effective_target: Some(target),
            hvac_mode: HvacMode::Heat,
            ..ControllerState::default()
        }
    }

    fn unit(mode: Option<HvacMode>, setpoint: Option<f32>) -> ActuatorState {
        ActuatorState { mode, setpoint }
    }

    #[test]
    fn off_turns_unit_off_once() {
        let state = ControllerState::default();

        assert_eq!(
            dispatch(&state, Some(&unit(Some(HvacMode::Heat), Some(22.0)))),
            vec![ActuatorCommand::TurnOff]
        );
        assert!(dispatch(&state, Some(&unit(Some(HvacMode::Off), Some(22.0)))).is_empty());
    }

    #[test]
    fn mode_and_temperature_from_off() {
        assert_eq!(
            dispatch(&heating_at(22.0), Some(&unit(Some(HvacMode::Off), None))),
            vec![
                ActuatorCommand::SetMode(HvacMode::Heat),
                ActuatorCommand::SetTemperature(22.0),
            ]
        );
    }

    #[test]
    fn unknown_reported_mode_is_corrected() {
        assert_eq!(
            dispatch(&heating_at(22.0), Some(&unit(None, Some(22.0)))),
            vec![ActuatorCommand::SetMode(HvacMode::Heat)]
        );
    }

    #[test]
    fn temperature_outside_dead_band_is_resent() {
        assert_eq!(
            dispatch(&heating_at(21.0), Some(&unit(Some(HvacMode::Heat), Some(22.0)))),
            vec![ActuatorCommand::SetTemperature(21.0)]
        );
    }

    #[test]
    fn unreachable_unit_gets_nothing() {
        assert!(dispatch(&heating_at(22.0), None).is_empty());
        assert!(dispatch(&ControllerState::default(), None).is_empty());
    }

    proptest! {
        #[test]
        fn converged_unit_gets_nothing(
            target in 15.0f32..30.0,
            noise in -0.5f32..=0.5,
            cooling in any::<bool>(),
        ) {
            let hvac_mode = if cooling { HvacMode::Cool } else { HvacMode::Heat };
            let state = ControllerState {
                hvac_mode,
                ..heating_at(target)
            };
            let reported = unit(Some(hvac_mode), Some(target + noise));
            prop_assume!(((target + noise) - target).abs() <= SETPOINT_DEAD_BAND_C);

            prop_assert!(dispatch(&state, Some(&reported)).is_empty());
        }
    }
}
