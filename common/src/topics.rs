pub const TOPIC_SENSOR_OUTDOOR_TEMP: &str = "minisplit/sensor/outdoor_temperature";
pub const TOPIC_SENSOR_ROOM_TEMP: &str = "minisplit/sensor/room_temperature";
pub const TOPIC_PRESENCE_HOUSE: &str = "minisplit/presence/house";
pub const TOPIC_PRESENCE_ROOM: &str = "minisplit/presence/room";

pub const TOPIC_SWITCH_AUTOMATION: &str = "minisplit/switch/automation";
pub const TOPIC_SWITCH_SEASON: &str = "minisplit/switch/season";
pub const TOPIC_SWITCH_PRESENCE: &str = "minisplit/switch/use_presence_piece";

pub const TOPIC_ACTUATOR_STATE: &str = "minisplit/unit/state";
pub const TOPIC_CMD_ACTUATOR_MODE: &str = "minisplit/cmnd/unit/mode";
pub const TOPIC_CMD_ACTUATOR_TEMP: &str = "minisplit/cmnd/unit/temperature";

pub const TOPIC_CONTROLLER_STATE: &str = "minisplit/controller/state";
