use std::{
    collections::HashMap,
    io::ErrorKind,
    net::SocketAddr,
    path::PathBuf,
    sync::{Arc, OnceLock},
    time::{Duration, Instant},
};

use anyhow::Context;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use rumqttc::{AsyncClient, Event, Incoming, MqttOptions, QoS};
use serde::Serialize;
use tokio::{net::TcpListener, sync::Mutex, time::MissedTickBehavior};
use tracing::{debug, info, warn};

use minisplit_common::{
    snapshot::{parse_season, parse_switch},
    status, ActuatorCommand, ClimateController, ControllerConfig, ControllerStatus, CycleKind,
    CycleOutcome, ReadingUpdate, RuntimeConfig, SensorCache, SnapshotReader, SourceTopics,
    TimingConfig, TOPIC_CONTROLLER_STATE,
};

#[derive(Clone)]
struct AppState {
    controller: Arc<Mutex<ClimateController>>,
    readings: Arc<Mutex<SensorCache>>,
    // Held for the whole of a cycle so that the loop and /api/cycle never overlap.
    cycle_lock: Arc<Mutex<()>>,
    last_cycle: Arc<Mutex<Option<DateTime<Utc>>>>,
    sources: Arc<SourceTopics>,
    timing: Arc<TimingConfig>,
    mqtt: AsyncClient,
    store: AppStore,
}

#[derive(Clone)]
struct AppStore {
    runtime_path: Arc<PathBuf>,
    lock: Arc<Mutex<()>>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Serialize)]
struct ConfigUpdateResponse {
    #[serde(rename = "restartRequired")]
    restart_required: bool,
    config: ControllerConfig,
}

const MAX_MQTT_PAYLOAD_BYTES: usize = 512;

pub async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let store = AppStore::new();
    let mut runtime = store.load_runtime_config().await.unwrap_or_else(|err| {
        warn!("failed to load runtime config from store: {err:#}");
        RuntimeConfig::default()
    });
    runtime.sanitize();

    let mqtt_host = std::env::var("MQTT_HOST").unwrap_or(runtime.network.mqtt_host.clone());
    let mqtt_port = std::env::var("MQTT_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(runtime.network.mqtt_port);

    let mut mqtt_options = MqttOptions::new(
        runtime.network.mqtt_client_id.clone(),
        mqtt_host,
        mqtt_port,
    );
    mqtt_options.set_keep_alive(Duration::from_secs(30));
    let mqtt_user = std::env::var("MQTT_USER").unwrap_or(runtime.network.mqtt_user.clone());
    let mqtt_pass = std::env::var("MQTT_PASS").unwrap_or(runtime.network.mqtt_pass.clone());
    if !mqtt_user.is_empty() {
        mqtt_options.set_credentials(mqtt_user, mqtt_pass);
    }

    let (mqtt, eventloop) = AsyncClient::new(mqtt_options, 64);

    let sources = runtime.controller.sources.clone();
    let app_state = AppState {
        controller: Arc::new(Mutex::new(ClimateController::new(runtime.controller))),
        readings: Arc::new(Mutex::new(SensorCache::new(
            runtime.timing.sensor_stale_timeout_ms,
        ))),
        cycle_lock: Arc::new(Mutex::new(())),
        last_cycle: Arc::new(Mutex::new(None)),
        sources: Arc::new(sources),
        timing: Arc::new(runtime.timing),
        mqtt,
        store,
    };

    spawn_mqtt_loop(app_state.clone(), eventloop);
    spawn_control_loop(app_state.clone());
    spawn_state_publish_loop(app_state.clone());

    let app = Router::new()
        .route("/api/status", get(handle_get_status))
        .route("/api/state", get(handle_get_state))
        .route("/api/cycle", post(handle_run_cycle))
        .route("/api/switch/{name}", post(handle_set_switch))
        .route("/api/config", get(handle_get_config).put(handle_put_config))
        .with_state(app_state);

    let port = std::env::var("CONTROLLER_HTTP_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind controller server at {addr}"))?;

    info!("controller listening on http://{addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

async fn subscribe_topics(mqtt: &AsyncClient, sources: &SourceTopics) -> anyhow::Result<()> {
    for topic in sources.inputs() {
        mqtt.subscribe(topic, QoS::AtMostOnce)
            .await
            .with_context(|| format!("failed to subscribe to {topic}"))?;
    }
    Ok(())
}

fn spawn_mqtt_loop(app_state: AppState, mut eventloop: rumqttc::EventLoop) {
    tokio::spawn(async move {
        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Incoming::Publish(message))) => {
                    handle_mqtt_message(&app_state, &message.topic, &message.payload).await;
                }
                Ok(Event::Incoming(Incoming::ConnAck(_))) => {
                    info!("mqtt connected");
                    app_state.readings.lock().await.set_connected(true);
                    // Subscriptions do not survive a clean-session reconnect.
                    let mqtt = app_state.mqtt.clone();
                    let sources = app_state.sources.clone();
                    tokio::spawn(async move {
                        if let Err(err) = subscribe_topics(&mqtt, &sources).await {
                            warn!("mqtt subscribe failed: {err:#}");
                        }
                    });
                }
                Ok(_) => {}
                Err(err) => {
                    warn!("mqtt poll error: {err}");
                    app_state.readings.lock().await.set_connected(false);
                    tokio::time::sleep(Duration::from_secs(2)).await;
                }
            }
        }
    });
}

fn spawn_control_loop(app_state: AppState) {
    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(Duration::from_millis(app_state.timing.cycle_interval_ms));
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            interval.tick().await;
            run_control_cycle(&app_state).await;
        }
    });
}

fn spawn_state_publish_loop(app_state: AppState) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_millis(
            app_state.timing.state_publish_interval_ms,
        ));
        loop {
            interval.tick().await;
            publish_state(&app_state).await;
        }
    });
}

async fn publish_state(app_state: &AppState) {
    let payload = {
        let controller = app_state.controller.lock().await;
        serde_json::to_vec(&controller.state_payload())
    };

    match payload {
        Ok(body) => {
            if let Err(err) = app_state
                .mqtt
                .publish(TOPIC_CONTROLLER_STATE, QoS::AtLeastOnce, true, body)
                .await
            {
                warn!("controller state publish failed: {err}");
            }
        }
        Err(err) => warn!("controller state serialization failed: {err}"),
    }
}

/// Runs one full cycle. Returns `None` when the sensor source could not be read,
/// in which case the controller state is left as it was.
async fn run_control_cycle(app_state: &AppState) -> Option<CycleOutcome> {
    let _cycle = app_state.cycle_lock.lock().await;
    let now_ms = monotonic_ms();

    let snapshot = match app_state.readings.lock().await.read_snapshot(now_ms) {
        Ok(snapshot) => snapshot,
        Err(err) => {
            warn!("skipping control cycle: {err}");
            return None;
        }
    };

    let (outcome, state_dump) = {
        let mut controller = app_state.controller.lock().await;
        let outcome = controller.run_cycle(&snapshot);
        let dump = serde_json::to_string(controller.state()).unwrap_or_default();
        (outcome, dump)
    };
    *app_state.last_cycle.lock().await = Some(Utc::now());

    match outcome.kind {
        CycleKind::Skipped => debug!("{}", outcome.action),
        _ if outcome.changed => info!(state = %state_dump, "{}", outcome.action),
        _ => debug!(state = %state_dump, "no change"),
    }

    if !outcome.commands.is_empty() {
        execute_commands(app_state, &outcome.commands).await;
        publish_state(app_state).await;
    }

    Some(outcome)
}

async fn execute_commands(app_state: &AppState, commands: &[ActuatorCommand]) {
    let timeout = Duration::from_millis(app_state.timing.command_timeout_ms);

    for command in commands {
        let (topic, payload) = command_message(&app_state.sources, command);
        let publish = app_state
            .mqtt
            .publish(topic, QoS::AtLeastOnce, false, payload);
        match tokio::time::timeout(timeout, publish).await {
            Ok(Ok(())) => info!("actuator command: {command:?}"),
            // Dropped for this cycle; the next cycle re-issues it if still needed.
            Ok(Err(err)) => warn!("actuator command {command:?} dropped: {err}"),
            Err(_) => warn!("actuator command {command:?} timed out"),
        }
    }
}

fn command_message<'a>(sources: &'a SourceTopics, command: &ActuatorCommand) -> (&'a str, String) {
    match command {
        ActuatorCommand::TurnOff => (sources.actuator_mode_command.as_str(), "off".to_string()),
        ActuatorCommand::SetMode(mode) => (
            sources.actuator_mode_command.as_str(),
            mode.wire_value().to_string(),
        ),
        ActuatorCommand::SetTemperature(target) => (
            sources.actuator_temp_command.as_str(),
            format!("{target:.1}"),
        ),
    }
}

async fn handle_mqtt_message(app_state: &AppState, topic: &str, payload: &[u8]) {
    if payload.len() > MAX_MQTT_PAYLOAD_BYTES {
        warn!(
            "dropping oversized MQTT payload on topic {} ({} bytes)",
            topic,
            payload.len()
        );
        return;
    }

    let Ok(message) = std::str::from_utf8(payload) else {
        warn!("dropping non utf8 MQTT payload on topic {topic}");
        return;
    };

    let update = {
        let mut readings = app_state.readings.lock().await;
        readings.apply_message(&app_state.sources, topic, message, monotonic_ms())
    };

    match update {
        ReadingUpdate::Applied => debug!("reading {topic} = {message}"),
        ReadingUpdate::Rejected => warn!("unusable payload on {topic}: {message:?}"),
        ReadingUpdate::UnknownTopic => {}
    }
}

async fn build_status(state: &AppState) -> ControllerStatus {
    let snapshot = state.readings.lock().await.peek(monotonic_ms());
    let last_cycle_epoch = state.last_cycle.lock().await.map(|at| at.timestamp());

    let controller = state.controller.lock().await;
    let config = controller.config();
    let report = status::describe(controller.state(), &snapshot);

    ControllerStatus {
        state: controller.state_payload(),
        room_temp: snapshot.room_temp,
        outdoor_temp: snapshot.outdoor_temp,
        house_occupied: snapshot.house_occupied,
        room_occupied: snapshot.room_occupied,
        automation_enabled: snapshot.automation_enabled,
        use_presence_piece: snapshot
            .use_presence_piece
            .unwrap_or(config.use_presence_piece),
        hysteresis: config.hysteresis_c,
        setback_offset: config.setback_offset_c,
        actuator_mode: snapshot.actuator_reported_mode().map(|mode| mode.as_str()),
        actuator_setpoint: snapshot.actuator_reported_setpoint(),
        headline: report.headline,
        reason: report.reason,
        readings: report.readings,
        last_cycle_epoch,
    }
}

async fn handle_get_status(State(state): State<AppState>) -> impl IntoResponse {
    Json(build_status(&state).await)
}

async fn handle_get_state(State(state): State<AppState>) -> impl IntoResponse {
    let payload = state.controller.lock().await.state_payload();
    Json(payload)
}

async fn handle_run_cycle(State(state): State<AppState>) -> impl IntoResponse {
    if run_control_cycle(&state).await.is_none() {
        return error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            "Sensor source is not connected",
        );
    }
    Json(build_status(&state).await).into_response()
}

async fn handle_set_switch(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let Some(value) = params.get("value") else {
        return error_response(StatusCode::BAD_REQUEST, "Missing 'value' parameter");
    };

    let topic = {
        let mut readings = state.readings.lock().await;
        match name.as_str() {
            "automation" => {
                let Some(enabled) = parse_switch(value) else {
                    return error_response(StatusCode::BAD_REQUEST, "Use 'on' or 'off'");
                };
                readings.set_automation_enabled(enabled);
                &state.sources.automation_switch
            }
            "season" => {
                let Some(season) = parse_season(value) else {
                    return error_response(StatusCode::BAD_REQUEST, "Use 'heat' or 'cool'");
                };
                readings.set_season(season);
                &state.sources.season_switch
            }
            "presence" => {
                let Some(enabled) = parse_switch(value) else {
                    return error_response(StatusCode::BAD_REQUEST, "Use 'on' or 'off'");
                };
                readings.set_use_presence_piece(enabled);
                &state.sources.presence_switch
            }
            _ => {
                return error_response(
                    StatusCode::NOT_FOUND,
                    "Unknown switch. Use 'automation', 'season' or 'presence'",
                )
            }
        }
    };
    info!("switch {name} set to {value}");

    // Retained so the broker hands the switch back to us after a restart.
    if let Err(err) = state
        .mqtt
        .publish(topic.as_str(), QoS::AtLeastOnce, true, value.clone())
        .await
    {
        warn!("switch state publish failed: {err}");
    }

    Json(build_status(&state).await).into_response()
}

async fn handle_get_config(State(state): State<AppState>) -> impl IntoResponse {
    let config = state.controller.lock().await.config().clone();
    Json(config)
}

async fn handle_put_config(
    State(state): State<AppState>,
    Json(update): Json<ControllerConfig>,
) -> impl IntoResponse {
    if let Err(err) = update.validate() {
        return error_response(StatusCode::BAD_REQUEST, &err.to_string());
    }

    let mut runtime = state
        .store
        .load_runtime_config()
        .await
        .unwrap_or_else(|err| {
            warn!("failed to load existing runtime config for update: {err:#}");
            RuntimeConfig::default()
        });
    runtime.controller = update.clone();

    if let Err(err) = state.store.save_runtime_config(&runtime).await {
        warn!("failed to persist controller config update: {err:#}");
        return error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to persist controller settings",
        );
    }

    let config = {
        let mut controller = state.controller.lock().await;
        controller.reconfigure(update);
        controller.config().clone()
    };
    info!(
        "controller config updated: hysteresis {:.1}, offset {:.1}",
        config.hysteresis_c, config.setback_offset_c
    );

    let payload = ConfigUpdateResponse {
        restart_required: config.sources != *state.sources,
        config,
    };
    Json(payload).into_response()
}

impl AppStore {
    fn new() -> Self {
        let data_dir = std::env::var("MINISPLIT_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./.minisplit"));

        Self {
            runtime_path: Arc::new(data_dir.join("runtime.json")),
            lock: Arc::new(Mutex::new(())),
        }
    }

    async fn load_runtime_config(&self) -> anyhow::Result<RuntimeConfig> {
        let _guard = self.lock.lock().await;
        match tokio::fs::read(self.runtime_path.as_ref()).await {
            Ok(raw) => Ok(serde_json::from_slice::<RuntimeConfig>(&raw)?),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(RuntimeConfig::default()),
            Err(err) => Err(err.into()),
        }
    }

    async fn save_runtime_config(&self, runtime: &RuntimeConfig) -> anyhow::Result<()> {
        let _guard = self.lock.lock().await;
        let path = self.runtime_path.as_ref().clone();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let payload = serde_json::to_vec_pretty(runtime)?;
        tokio::fs::write(path, payload).await?;
        Ok(())
    }
}

fn error_response(status: StatusCode, message: &str) -> axum::response::Response {
    (
        status,
        Json(ErrorBody {
            error: message.to_string(),
        }),
    )
        .into_response()
}

fn monotonic_ms() -> u64 {
    static START: OnceLock<Instant> = OnceLock::new();
    START
        .get_or_init(Instant::now)
        .elapsed()
        .as_millis()
        .try_into()
        .unwrap_or(u64::MAX)
}
