use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

pub const DEFAULT_BASE_URL: &str = "http://localhost:10024";
pub const DEFAULT_LOG_LEVEL: &str = "info";

const CONFIG_DIR_NAME: &str = "ticketboard";
const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub base_url: String,
    pub request_timeout_secs: Option<u64>,
    pub log_level: String,
    pub discard_stale_responses: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: None,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            discard_stale_responses: false,
        }
    }
}

impl AppConfig {
    /// Resolves the configuration: flag, then environment, then the stored
    /// file, then defaults.
    pub fn load(base_url_override: Option<String>) -> AppResult<Self> {
        let stored = StoredConfig::load()?;
        Ok(Self::resolve(stored, base_url_override, |key| env::var(key).ok()))
    }

    fn resolve(
        stored: StoredConfig,
        base_url_override: Option<String>,
        env_var: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let defaults = Self::default();

        let base_url = base_url_override
            .or_else(|| env_var("TICKETBOARD_BASE_URL"))
            .or(stored.base_url)
            .filter(|url| !url.trim().is_empty())
            .unwrap_or(defaults.base_url);

        let request_timeout_secs = env_var("TICKETBOARD_TIMEOUT_SECS")
            .and_then(|value| value.parse().ok())
            .or(stored.request_timeout_secs)
            .filter(|secs| *secs > 0);

        let log_level = stored
            .log_level
            .filter(|level| !level.trim().is_empty())
            .unwrap_or(defaults.log_level);

        let discard_stale_responses = env_var("TICKETBOARD_DISCARD_STALE")
            .map(|value| matches!(value.to_lowercase().as_str(), "1" | "true" | "yes"))
            .or(stored.discard_stale_responses)
            .unwrap_or(defaults.discard_stale_responses);

        Self {
            base_url,
            request_timeout_secs,
            log_level,
            discard_stale_responses,
        }
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

/// Values persisted by `config init`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoredConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discard_stale_responses: Option<bool>,
}

impl StoredConfig {
    pub fn load() -> AppResult<Self> {
        let path = config_file_path()?;
        match fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents).map_err(|err| {
                AppError::Configuration(format!("invalid config file {}: {err}", path.display()))
            }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(AppError::Io(err)),
        }
    }

    pub fn save(&self) -> AppResult<()> {
        let path = config_file_path()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_string_pretty(self)
            .map_err(|err| AppError::Configuration(format!("failed to write config: {err}")))?;
        fs::write(&path, data)?;
        Ok(())
    }
}

pub fn config_directory() -> AppResult<PathBuf> {
    if let Some(dir) = env::var_os("TICKETBOARD_CONFIG_DIR") {
        return Ok(PathBuf::from(dir));
    }
    dirs::config_dir()
        .map(|dir| dir.join(CONFIG_DIR_NAME))
        .ok_or_else(|| {
            AppError::Configuration("could not determine the configuration directory".to_string())
        })
}

pub fn config_file_path() -> AppResult<PathBuf> {
    Ok(config_directory()?.join(CONFIG_FILE_NAME))
}
