//! Client configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::calendar::SyncSettings;
use crate::category::{Color, DEFAULT_EVENT_COLOR};
use crate::error::{AgendaError, AgendaResult};

static DEFAULT_API_URL: &str = "http://127.0.0.1:8080";
const DEFAULT_DEBOUNCE_MS: u64 = 500;
const DEFAULT_WINDOW_DAYS: i64 = 14;

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_debounce_ms() -> u64 {
    DEFAULT_DEBOUNCE_MS
}

fn default_color() -> String {
    DEFAULT_EVENT_COLOR.to_string()
}

fn default_window_days() -> i64 {
    DEFAULT_WINDOW_DAYS
}

/// Configuration at ~/.config/agenda/config.toml
///
/// Any key can be overridden from the environment with an `AGENDA_` prefix,
/// e.g. `AGENDA_TOKEN` or `AGENDA_DEBOUNCE_MS`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AgendaConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Quiet period before a changed window is fetched.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    #[serde(default = "default_color")]
    pub default_color: String,

    /// Days shown around today when no range is given.
    #[serde(default = "default_window_days")]
    pub window_days: i64,
}

impl Default for AgendaConfig {
    fn default() -> Self {
        AgendaConfig {
            api_url: default_api_url(),
            token: None,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            default_color: default_color(),
            window_days: DEFAULT_WINDOW_DAYS,
        }
    }
}

impl AgendaConfig {
    pub fn config_path() -> AgendaResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| AgendaError::Config("Could not determine config directory".into()))?
            .join("agenda");

        Ok(config_dir.join("config.toml"))
    }

    /// Load the user's config, writing a commented default file first if
    /// there is none yet.
    pub fn load() -> AgendaResult<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            Self::create_default_config(&config_path)?;
        }

        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> AgendaResult<Self> {
        Config::builder()
            .add_source(File::from(path).required(false))
            .add_source(Environment::with_prefix("AGENDA").try_parsing(true))
            .build()
            .map_err(|e| AgendaError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| AgendaError::Config(e.to_string()))
    }

    /// Create a default config file with all options commented out.
    pub fn create_default_config(path: &Path) -> AgendaResult<()> {
        let contents = format!(
            "\
# agenda configuration

# Schedule service to talk to:
# api_url = \"{DEFAULT_API_URL}\"

# Bearer token for the service:
# token = \"...\"

# Milliseconds to wait before fetching a changed window:
# debounce_ms = {DEFAULT_DEBOUNCE_MS}

# Colour of events without a category:
# default_color = \"{DEFAULT_EVENT_COLOR}\"

# Days shown around today by `agenda events`:
# window_days = {DEFAULT_WINDOW_DAYS}
"
        );

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AgendaError::Config(format!("Could not create config directory: {e}"))
            })?;
        }

        std::fs::write(path, contents)
            .map_err(|e| AgendaError::Config(format!("Could not write config file: {e}")))?;

        Ok(())
    }

    pub fn to_toml(&self) -> AgendaResult<String> {
        toml::to_string_pretty(self).map_err(|e| AgendaError::Serialization(e.to_string()))
    }

    pub fn sync_settings(&self) -> AgendaResult<SyncSettings> {
        let default_color = Color::parse(&self.default_color)
            .map_err(|e| AgendaError::Config(format!("default_color: {e}")))?;

        Ok(SyncSettings {
            debounce: Duration::from_millis(self.debounce_ms),
            default_color,
        })
    }
}
