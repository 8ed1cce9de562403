use crate::{
    config::ControllerConfig,
    dispatch::dispatch,
    hysteresis::{self, EngineStep},
    manual::{detect, SetpointMemory},
    mode::{resolve, Resolution},
    snapshot::DeviceSnapshot,
    types::{ActuatorCommand, ControllerState, ControllerStatePayload},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleKind {
    /// Automation switched off; state untouched.
    Skipped,
    /// Manual override active; state kept apart from the override flag.
    ManualHold,
    Applied,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CycleOutcome {
    pub kind: CycleKind,
    pub commands: Vec<ActuatorCommand>,
    pub action: String,
    /// True when the state differs from the previous cycle's.
    pub changed: bool,
}

/// Owns the controller state and runs one full decision cycle per call.
#[derive(Debug, Clone)]
pub struct ClimateController {
    config: ControllerConfig,
    state: ControllerState,
    memory: SetpointMemory,
}

impl ClimateController {
    pub fn new(mut config: ControllerConfig) -> Self {
        config.sanitize();
        Self {
            config,
            state: ControllerState::default(),
            memory: SetpointMemory::default(),
        }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    pub fn state_payload(&self) -> ControllerStatePayload {
        ControllerStatePayload::from(&self.state)
    }

    /// Swaps in a new configuration. The retained state is kept; the next
    /// cycle re-evaluates it against the new setpoints and bands.
    pub fn reconfigure(&mut self, mut config: ControllerConfig) {
        config.sanitize();
        self.config = config;
    }

    pub fn run_cycle(&mut self, snapshot: &DeviceSnapshot) -> CycleOutcome {
        let prior = &self.state;
        let detection = detect(snapshot, prior, &self.memory);
        // Recorded on every cycle, skipped ones included, so that a change made
        // while automation was off is not read as manual once it is back on.
        self.memory.observe(snapshot.actuator_reported_setpoint());

        let next = match resolve(snapshot, &self.config, prior, detection.manual_override) {
            Resolution::Skip => {
                return CycleOutcome {
                    kind: CycleKind::Skipped,
                    commands: Vec::new(),
                    action: "Automatic control disabled".to_string(),
                    changed: false,
                };
            }
            Resolution::Hold { .. } => {
                let mut next = prior.clone();
                next.manual_override = true;
                if let Some(action) = detection.action {
                    next.last_action = action;
                }
                return self.commit(next, CycleKind::ManualHold, Vec::new());
            }
            Resolution::Resolved { mode, season } => {
                let base = self.config.setpoints.base_setpoint(mode, season);
                let room_temp = snapshot
                    .room_temp
                    .unwrap_or(self.config.fallback_room_temp_c);
                let decision =
                    hysteresis::apply(room_temp, mode, season, base, prior, &self.config);

                let last_action = if mode != prior.mode {
                    match decision.effective_target {
                        Some(target) => format!(
                            "Switching to {} mode - setpoint {target:.1}°C",
                            mode.as_str()
                        ),
                        None => format!("Switching to {} mode - unit off", mode.as_str()),
                    }
                } else if decision.step == EngineStep::Hold {
                    // Quiet cycles keep the last meaningful action visible.
                    detection.action.unwrap_or_else(|| prior.last_action.clone())
                } else {
                    decision.action
                };

                ControllerState {
                    season,
                    mode,
                    manual_override: detection.manual_override,
                    effective_target: decision.effective_target,
                    hvac_mode: decision.hvac_mode,
                    last_action,
                }
            }
        };

        let commands = dispatch(&next, snapshot.actuator.as_ref());
        for command in &commands {
            if let ActuatorCommand::SetTemperature(setpoint) = command {
                self.memory.commanded(*setpoint);
            }
        }
        self.commit(next, CycleKind::Applied, commands)
    }

    fn commit(
        &mut self,
        next: ControllerState,
        kind: CycleKind,
        commands: Vec<ActuatorCommand>,
    ) -> CycleOutcome {
        let changed = next != self.state;
        let action = next.last_action.clone();
        self.state = next;
        CycleOutcome {
            kind,
            commands,
            action,
            changed,
        }
    }
}
