//! System configuration parameters
//!
//! All tunable parameters for the feeder controller and the status board.
//! Values come from an optional TOML file layered under `LILYFEED__*`
//! environment variables, e.g. `LILYFEED__FEEDER__LABEL=north`.

use core::time::Duration;
use std::path::PathBuf;

use log::info;
use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;
use crate::broadcast::protocol::DEFAULT_CHANNEL;

/// Environment variable naming the config file.
pub const CONFIG_PATH_ENV: &str = "LILYFEED_CONFIG";
/// Config file used when neither a CLI argument nor the env var names one.
pub const DEFAULT_CONFIG_PATH: &str = "lilyfeed.toml";
const ENV_PREFIX: &str = "LILYFEED";

/// Top-level settings shared by both binaries.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub feeder: FeederConfig,
    pub broadcast: BroadcastConfig,
    pub board: BoardConfig,
}

/// Controller configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FeederConfig {
    // --- Identity ---
    /// Human label; `id_<source_id>` when unset
    pub label: Option<String>,
    /// Numeric source id; derived from the host name when unset
    pub source_id: Option<u32>,

    // --- Prediction ---
    /// Seconds of cooldown per sensor level
    pub unit_seconds: u64,
    /// Seconds added to every prediction to cover propagation lag
    pub extra_buffer_seconds: u64,
    /// Seconds between an unconfirmed pulse and the retry
    pub retry_delay_seconds: u64,

    // --- Actuation ---
    /// Pulse length (milliseconds)
    pub pulse_ms: u64,
    /// Confirmation window after a pulse (milliseconds)
    pub confirm_window_ms: u64,
    /// Sensor poll interval inside the confirmation window (milliseconds)
    pub confirm_poll_ms: u64,

    // --- Timing ---
    /// Control loop interval (milliseconds)
    pub tick_ms: u64,
    /// Heartbeat period for `level` status (seconds)
    pub status_period_secs: u64,

    // --- I/O ---
    /// Persisted schedule blob
    pub state_path: PathBuf,
    /// Text file holding the current sensor level
    pub sensor_path: PathBuf,
    /// Value file driven high/low by the pulse
    pub actuator_path: PathBuf,
}

impl Default for FeederConfig {
    fn default() -> Self {
        Self {
            // Identity
            label: None,
            source_id: None,

            // Prediction
            unit_seconds: 20,
            extra_buffer_seconds: 1,
            retry_delay_seconds: 5,

            // Actuation
            pulse_ms: 500,
            confirm_window_ms: 4000,
            confirm_poll_ms: 200,

            // Timing
            tick_ms: 250,
            status_period_secs: 5,

            // I/O
            state_path: PathBuf::from("lilyfeed.state"),
            sensor_path: PathBuf::from("level"),
            actuator_path: PathBuf::from("pulse"),
        }
    }
}

impl FeederConfig {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    pub fn pulse(&self) -> Duration {
        Duration::from_millis(self.pulse_ms)
    }

    pub fn confirm_window(&self) -> Duration {
        Duration::from_millis(self.confirm_window_ms)
    }

    pub fn confirm_poll(&self) -> Duration {
        Duration::from_millis(self.confirm_poll_ms)
    }

    pub fn status_period(&self) -> Duration {
        Duration::from_secs(self.status_period_secs)
    }
}

/// Broadcast endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BroadcastConfig {
    /// Channel tag shared by controllers and boards
    pub channel: String,
    /// UDP port used for status datagrams
    pub port: u16,
    /// Destination address for outgoing datagrams
    pub broadcast_addr: String,
    /// Refuse to start the controller without a working endpoint
    pub required: bool,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            channel: DEFAULT_CHANNEL.to_string(),
            port: 47474,
            broadcast_addr: "255.255.255.255".to_string(),
            required: true,
        }
    }
}

/// Status board configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BoardConfig {
    /// Minimum time between repaints (milliseconds)
    pub redraw_ms: u64,
    /// Maximum wait for one datagram (milliseconds)
    pub receive_timeout_ms: u64,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            redraw_ms: 1000,   // 1 Hz
            receive_timeout_ms: 250,
        }
    }
}

impl BoardConfig {
    pub fn redraw(&self) -> Duration {
        Duration::from_millis(self.redraw_ms)
    }

    pub fn receive_timeout(&self) -> Duration {
        Duration::from_millis(self.receive_timeout_ms)
    }
}

/// Range-check every field.  Invalid values are rejected, not clamped.
pub fn validate(settings: &Settings) -> Result<(), ConfigError> {
    let f = &settings.feeder;
    if !(1..=3600).contains(&f.unit_seconds) {
        return Err(ConfigError::ValidationFailed("unit_seconds must be 1–3600"));
    }
    if f.extra_buffer_seconds > 600 {
        return Err(ConfigError::ValidationFailed(
            "extra_buffer_seconds must be 0–600",
        ));
    }
    if !(1..=3600).contains(&f.retry_delay_seconds) {
        return Err(ConfigError::ValidationFailed(
            "retry_delay_seconds must be 1–3600",
        ));
    }
    if !(10..=10_000).contains(&f.pulse_ms) {
        return Err(ConfigError::ValidationFailed("pulse_ms must be 10–10000"));
    }
    if !(10..=1000).contains(&f.confirm_poll_ms) {
        return Err(ConfigError::ValidationFailed(
            "confirm_poll_ms must be 10–1000",
        ));
    }
    if f.confirm_window_ms < f.confirm_poll_ms || f.confirm_window_ms > 60_000 {
        return Err(ConfigError::ValidationFailed(
            "confirm_window_ms must be confirm_poll_ms–60000",
        ));
    }
    if !(10..=10_000).contains(&f.tick_ms) {
        return Err(ConfigError::ValidationFailed("tick_ms must be 10–10000"));
    }
    if !(1..=3600).contains(&f.status_period_secs) {
        return Err(ConfigError::ValidationFailed(
            "status_period_secs must be 1–3600",
        ));
    }
    if settings.broadcast.channel.is_empty() {
        return Err(ConfigError::ValidationFailed("channel must not be empty"));
    }
    if settings.broadcast.port == 0 {
        return Err(ConfigError::ValidationFailed("port must be non-zero"));
    }
    if !(50..=60_000).contains(&settings.board.redraw_ms) {
        return Err(ConfigError::ValidationFailed("redraw_ms must be 50–60000"));
    }
    if !(1..=10_000).contains(&settings.board.receive_timeout_ms) {
        return Err(ConfigError::ValidationFailed(
            "receive_timeout_ms must be 1–10000",
        ));
    }
    Ok(())
}

/// Resolve the config file path: explicit argument, then `LILYFEED_CONFIG`,
/// then [`DEFAULT_CONFIG_PATH`].
pub fn config_path(arg: Option<String>) -> PathBuf {
    arg.or_else(|| std::env::var(CONFIG_PATH_ENV).ok())
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from)
}

/// Load settings from `path` (optional) and the environment, then validate.
pub fn load(path: &std::path::Path) -> Result<Settings, ConfigError> {
    let built = config::Config::builder()
        .add_source(config::File::from(path).required(false))
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__"),
        )
        .build()
        .map_err(|e| ConfigError::Load(e.to_string()))?;

    let settings: Settings = built
        .try_deserialize()
        .map_err(|e| ConfigError::Load(e.to_string()))?;
    validate(&settings)?;
    info!("Config loaded (file: {})", path.display());
    Ok(settings)
}
