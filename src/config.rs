//! Application-level configuration loading: store endpoint, polling cadence,
//! effect durations and buzzer defaults.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    serial::link::DEFAULT_BAUD_RATE,
    services::poller::DEFAULT_FETCH_TIMEOUT,
    state::{
        buttons::{DEFAULT_BUTTON_COUNT, DEFAULT_LOG_CAPACITY},
        effects::EffectDurations,
    },
};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "FEUD_SYNC_CONFIG_PATH";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_SSE_CAPACITY: usize = 64;

/// Where the game tables live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Base URL of the PostgREST project.
    pub url: String,
    /// Anonymous API key.
    pub api_key: Option<String>,
}

/// Poll cadence of a display session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollingConfig {
    /// Full snapshot poll period.
    pub snapshot_interval: Duration,
    /// Cue-token poll period.
    pub sound_interval: Duration,
    /// Bound on each store read.
    pub fetch_timeout: Duration,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            snapshot_interval: Duration::from_millis(2_000),
            sound_interval: Duration::from_millis(500),
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }
}

/// Buzzer board defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuzzerConfig {
    /// Buttons wired to the board.
    pub button_count: usize,
    /// Raw lines kept in the diagnostic ring.
    pub log_capacity: usize,
    /// Port opened at startup and used when a connect request names none.
    pub serial_path: Option<String>,
    /// Line speed in baud.
    pub baud_rate: u32,
}

impl Default for BuzzerConfig {
    fn default() -> Self {
        Self {
            button_count: DEFAULT_BUTTON_COUNT,
            log_capacity: DEFAULT_LOG_CAPACITY,
            serial_path: None,
            baud_rate: DEFAULT_BAUD_RATE,
        }
    }
}

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// HTTP listen port.
    pub port: u16,
    /// Remote store; no session runs without it.
    pub store: Option<StoreConfig>,
    /// Game followed by the display session.
    pub game_id: Option<Uuid>,
    /// Poll cadence.
    pub polling: PollingConfig,
    /// Effect lengths.
    pub effects: EffectDurations,
    /// Buzzer board defaults.
    pub buzzers: BuzzerConfig,
    /// Capacity of the public SSE broadcast channel.
    pub sse_capacity: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            store: None,
            game_id: None,
            polling: PollingConfig::default(),
            effects: EffectDurations::default(),
            buzzers: BuzzerConfig::default(),
            sse_capacity: DEFAULT_SSE_CAPACITY,
        }
    }
}

impl AppConfig {
    /// Load the configuration file, then apply environment overrides.
    pub fn load() -> Self {
        let mut config = Self::from_file();
        config.apply_overrides(|name| env::var(name).ok());
        config
    }

    fn from_file() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match Self::from_json(&contents) {
                Ok(config) => {
                    info!(path = %path.display(), "loaded configuration file");
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Parse the JSON configuration format.
    pub fn from_json(contents: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<RawConfig>(contents).map(Into::into)
    }

    /// Apply `PORT`, `STORE_URL`, `STORE_API_KEY`, `GAME_ID` and `SERIAL_PATH`.
    ///
    /// Unparseable values are logged and ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(value) = lookup("PORT").or_else(|| lookup("SERVER_PORT")) {
            match value.parse::<u16>() {
                Ok(port) => self.port = port,
                Err(err) => warn!(%value, error = %err, "ignoring invalid PORT"),
            }
        }

        if let Some(url) = lookup("STORE_URL").filter(|url| !url.is_empty()) {
            let api_key = self.store.take().and_then(|store| store.api_key);
            self.store = Some(StoreConfig { url, api_key });
        }
        if let Some(key) = lookup("STORE_API_KEY").filter(|key| !key.is_empty()) {
            match self.store.as_mut() {
                Some(store) => store.api_key = Some(key),
                None => warn!("STORE_API_KEY set without a store URL; ignoring"),
            }
        }

        if let Some(value) = lookup("GAME_ID") {
            match Uuid::parse_str(&value) {
                Ok(id) => self.game_id = Some(id),
                Err(err) => warn!(%value, error = %err, "ignoring invalid GAME_ID"),
            }
        }

        if let Some(path) = lookup("SERIAL_PATH").filter(|path| !path.is_empty()) {
            self.buzzers.serial_path = Some(path);
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    port: Option<u16>,
    store_url: Option<String>,
    store_api_key: Option<String>,
    game_id: Option<Uuid>,
    snapshot_interval_ms: Option<u64>,
    sound_interval_ms: Option<u64>,
    fetch_timeout_ms: Option<u64>,
    strike_flash_ms: Option<u64>,
    intense_sound_ms: Option<u64>,
    winning_sound_ms: Option<u64>,
    button_count: Option<usize>,
    log_capacity: Option<usize>,
    serial_path: Option<String>,
    baud_rate: Option<u32>,
    sse_capacity: Option<usize>,
}

impl From<RawConfig> for AppConfig {
    fn from(raw: RawConfig) -> Self {
        let defaults = AppConfig::default();
        let millis = |value: Option<u64>, fallback: Duration| {
            value
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis)
                .unwrap_or(fallback)
        };

        Self {
            port: raw.port.unwrap_or(defaults.port),
            store: raw.store_url.map(|url| StoreConfig {
                url,
                api_key: raw.store_api_key,
            }),
            game_id: raw.game_id,
            polling: PollingConfig {
                snapshot_interval: millis(
                    raw.snapshot_interval_ms,
                    defaults.polling.snapshot_interval,
                ),
                sound_interval: millis(raw.sound_interval_ms, defaults.polling.sound_interval),
                fetch_timeout: millis(raw.fetch_timeout_ms, defaults.polling.fetch_timeout),
            },
            effects: EffectDurations {
                strike_flash: millis(raw.strike_flash_ms, defaults.effects.strike_flash),
                intense_sound: millis(raw.intense_sound_ms, defaults.effects.intense_sound),
                winning_sound: millis(raw.winning_sound_ms, defaults.effects.winning_sound),
            },
            buzzers: BuzzerConfig {
                button_count: raw
                    .button_count
                    .filter(|count| *count > 0)
                    .unwrap_or(defaults.buzzers.button_count),
                log_capacity: raw.log_capacity.unwrap_or(defaults.buzzers.log_capacity),
                serial_path: raw.serial_path,
                baud_rate: raw.baud_rate.unwrap_or(defaults.buzzers.baud_rate),
            },
            sse_capacity: raw
                .sse_capacity
                .filter(|capacity| *capacity > 0)
                .unwrap_or(defaults.sse_capacity),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn empty_file_yields_defaults() {
        let config = AppConfig::from_json("{}").unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.polling, PollingConfig::default());
        assert_eq!(config.effects, EffectDurations::default());
        assert_eq!(config.buzzers, BuzzerConfig::default());
        assert!(config.store.is_none());
    }

    #[test]
    fn file_values_replace_defaults() {
        let config = AppConfig::from_json(
            r#"{
                "store_url": "https://store.example",
                "store_api_key": "anon",
                "snapshot_interval_ms": 1000,
                "winning_sound_ms": 0,
                "button_count": 8
            }"#,
        )
        .unwrap();

        let store = config.store.unwrap();
        assert_eq!(store.url, "https://store.example");
        assert_eq!(store.api_key.as_deref(), Some("anon"));
        assert_eq!(config.polling.snapshot_interval, Duration::from_secs(1));
        assert_eq!(config.effects.winning_sound, Duration::from_millis(6_000));
        assert_eq!(config.buzzers.button_count, 8);
    }

    #[test]
    fn environment_overrides_file() {
        let game_id = Uuid::new_v4();
        let vars: HashMap<&str, String> = HashMap::from([
            ("PORT", "9000".to_string()),
            ("STORE_URL", "http://localhost:54321".to_string()),
            ("STORE_API_KEY", "secret".to_string()),
            ("GAME_ID", game_id.to_string()),
            ("SERIAL_PATH", "/dev/ttyACM0".to_string()),
        ]);

        let mut config = AppConfig::default();
        config.apply_overrides(|name| vars.get(name).cloned());

        assert_eq!(config.port, 9000);
        assert_eq!(
            config.store,
            Some(StoreConfig {
                url: "http://localhost:54321".into(),
                api_key: Some("secret".into()),
            })
        );
        assert_eq!(config.game_id, Some(game_id));
        assert_eq!(config.buzzers.serial_path.as_deref(), Some("/dev/ttyACM0"));
    }

    #[test]
    fn invalid_overrides_are_ignored() {
        let mut config = AppConfig::default();
        config.apply_overrides(|name| match name {
            "PORT" => Some("not-a-port".into()),
            "GAME_ID" => Some("nope".into()),
            _ => None,
        });
        assert_eq!(config.port, 8080);
        assert_eq!(config.game_id, None);
    }
}
