use serde::Deserialize;
use std::{env, fs, io, path::Path};

use crate::errors::ConfigError;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP port to listen on.
    pub port: u16,

    /// Log level for tracing (e.g. "info", "debug").
    pub log_level: String,

    /// Shared secret every sensor must send as `token`.
    pub api_key: String,

    /// Distance (cm) at or below which a spot counts as occupied.
    pub threshold_cm: f64,

    /// Spot used when a sensor omits `spot_id`.
    ///
    /// Single-spot deployments flash firmware that never sends a spot id,
    /// so this keeps them working without a token.
    pub default_spot: String,

    /// Outbound messages buffered per live viewer before it is dropped.
    pub subscriber_buffer: usize,

    /// How long (ms) one frame may wait on a viewer's socket before the
    /// session is torn down.
    pub send_timeout_ms: u64,

    /// Directory with the dashboard's static assets, served as fallback.
    pub static_dir: Option<String>,

    pub server_version: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            log_level: "info".to_string(),
            api_key: "changeme123".to_string(),
            threshold_cm: 50.0,
            default_spot: "A1".to_string(),
            subscriber_buffer: 64,
            send_timeout_ms: 5000,
            static_dir: None,
            server_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl AppConfig {
    /// Read `path`, falling back to defaults when the file does not exist,
    /// then apply environment overrides and validate.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let cfg = match fs::read_to_string(path) {
            Ok(file) => Self::from_json(&file)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::info!("No config file at {}, using defaults", path.display());
                Self::default()
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.display().to_string(),
                    source,
                })
            }
        };

        let cfg = cfg.with_overrides(|key| env::var(key).ok())?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str::<AppConfig>(text)?)
    }

    /// Apply `PORT`, `LOG_LEVEL`, `API_KEY`, `THRESHOLD_CM`, `DEFAULT_SPOT`
    /// and `STATIC_DIR` from `lookup`.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT") {
            self.port = port.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                key: "PORT",
                value: port.clone(),
            })?;
        }
        if let Some(level) = lookup("LOG_LEVEL") {
            self.log_level = level;
        }
        if let Some(key) = lookup("API_KEY") {
            self.api_key = key;
        }
        if let Some(raw) = lookup("THRESHOLD_CM") {
            self.threshold_cm = raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidThreshold(raw.clone()))?;
        }
        if let Some(spot) = lookup("DEFAULT_SPOT") {
            self.default_spot = spot;
        }
        if let Some(dir) = lookup("STATIC_DIR") {
            self.static_dir = Some(dir);
        }
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.threshold_cm.is_finite() {
            return Err(ConfigError::InvalidThreshold(self.threshold_cm.to_string()));
        }
        if self.api_key.is_empty() {
            return Err(ConfigError::EmptyApiKey);
        }
        Ok(())
    }
}
