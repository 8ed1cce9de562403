use crate::{
    config::ControllerConfig,
    types::{ControllerState, HvacMode, Mode, Season},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineStep {
    /// Absence: the unit is switched off.
    Off,
    /// The room drifted past the hysteresis band; call at the full setpoint.
    Engage,
    /// The room overshot the last target by the offset; relax the target.
    Setback,
    /// Inside both bands; keep the last target.
    Hold,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineDecision {
    pub effective_target: Option<f32>,
    pub hvac_mode: HvacMode,
    pub step: EngineStep,
    pub action: String,
}

/// Computes the effective target for this cycle.
///
/// Engagement is judged against the base setpoint with the hysteresis band,
/// setback against the previous effective target with the setback offset.
/// A previous target that belonged to another mode or season is not carried
/// over; the base setpoint stands in for it.
pub fn apply(
    room_temp: f32,
    mode: Mode,
    season: Season,
    base_setpoint: f32,
    prior: &ControllerState,
    config: &ControllerConfig,
) -> EngineDecision {
    if mode == Mode::Absence {
        return EngineDecision {
            effective_target: None,
            hvac_mode: HvacMode::Off,
            step: EngineStep::Off,
            action: "House empty - unit off".to_string(),
        };
    }

    let h = config.hysteresis_c;
    let o = config.setback_offset_c;
    let t = base_setpoint;
    let previous = prior
        .effective_target
        .filter(|_| prior.mode == mode && prior.season == season)
        .unwrap_or(t);

    let (target, step, action) = match season {
        Season::Heat => {
            if room_temp < t - h {
                (
                    t,
                    EngineStep::Engage,
                    format!(
                        "Room {room_temp:.1}°C below {:.1}°C (setpoint - hysteresis) - heating at {t:.1}°C",
                        t - h
                    ),
                )
            } else if room_temp >= previous + o {
                setback_or_hold(
                    t - o,
                    previous,
                    format!(
                        "Room {room_temp:.1}°C reached {:.1}°C (target + offset) - setting back to {:.1}°C",
                        previous + o,
                        t - o
                    ),
                    room_temp,
                )
            } else {
                hold(previous, room_temp)
            }
        }
        Season::Cool => {
            if room_temp > t + h {
                (
                    t,
                    EngineStep::Engage,
                    format!(
                        "Room {room_temp:.1}°C above {:.1}°C (setpoint + hysteresis) - cooling at {t:.1}°C",
                        t + h
                    ),
                )
            } else if room_temp <= previous - o {
                setback_or_hold(
                    t + o,
                    previous,
                    format!(
                        "Room {room_temp:.1}°C reached {:.1}°C (target - offset) - setting back to {:.1}°C",
                        previous - o,
                        t + o
                    ),
                    room_temp,
                )
            } else {
                hold(previous, room_temp)
            }
        }
    };

    EngineDecision {
        effective_target: Some(target),
        hvac_mode: season.into(),
        step,
        action,
    }
}

// A setback that lands on the target already in force is not a new step.
fn setback_or_hold(
    target: f32,
    previous: f32,
    action: String,
    room_temp: f32,
) -> (f32, EngineStep, String) {
    if (target - previous).abs() > f32::EPSILON {
        (target, EngineStep::Setback, action)
    } else {
        hold(target, room_temp)
    }
}

fn hold(previous: f32, room_temp: f32) -> (f32, EngineStep, String) {
    (
        previous,
        EngineStep::Hold,
        format!("Room {room_temp:.1}°C - holding {previous:.1}°C"),
    )
}
