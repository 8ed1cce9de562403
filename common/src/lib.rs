pub mod config;
pub mod controller;
pub mod dispatch;
pub mod hysteresis;
pub mod manual;
pub mod mode;
pub mod setpoint;
pub mod snapshot;
pub mod status;
pub mod topics;
pub mod types;

pub use config::{ConfigError, ControllerConfig, RuntimeConfig, SourceTopics, TimingConfig};
pub use controller::{ClimateController, CycleKind, CycleOutcome};
pub use hysteresis::{EngineDecision, EngineStep};
pub use manual::{ManualDetection, SetpointMemory, SETPOINT_DEAD_BAND_C};
pub use mode::Resolution;
pub use setpoint::SetpointTable;
pub use snapshot::{
    ActuatorState, DeviceSnapshot, ReadingUpdate, SensorCache, SnapshotError, SnapshotReader,
};
pub use status::StatusReport;
pub use topics::*;
pub use types::{
    ActuatorCommand, ControllerState, ControllerStatePayload, ControllerStatus, HvacMode, Mode,
    Season,
};
