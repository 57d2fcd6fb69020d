//! `config.json` under the base directory.
//!
//! Every field is optional in the file; missing ones take their defaults.
//! `ROWMIRROR_LOG_LEVEL` overrides the log level after the file is read.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{CoreError, CoreResult, Paths};

pub const DEFAULT_LOG_LEVEL: &str = "info";

const LOG_LEVEL_ENV: &str = "ROWMIRROR_LOG_LEVEL";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log_level: String,
    /// Relative to the base directory unless absolute.
    pub database_file: String,
    /// Log table the CLI works on.
    pub table: String,
    /// Name of the change channel the watcher listens on.
    pub channel: String,
    /// Self-heal poll period while watching.
    pub poll_interval_ms: u64,
    /// Catch the mirror up right after every append.
    pub catch_up_on_append: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            database_file: "mirror.db".to_string(),
            table: "records".to_string(),
            channel: "records_changed".to_string(),
            poll_interval_ms: 5_000,
            catch_up_on_append: false,
        }
    }
}

impl Config {
    /// Reads the config file if present, applies the environment, validates.
    pub fn load(paths: &Paths) -> CoreResult<Self> {
        let file = paths.config_file();
        let mut config = if file.exists() {
            Self::load_from_file(&file)?
        } else {
            Self::default()
        };

        if let Ok(level) = std::env::var(LOG_LEVEL_ENV) {
            config.log_level = level;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn load_from_file(path: &Path) -> CoreResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Writes the config file, creating the base directory first.
    pub fn save(&self, paths: &Paths) -> CoreResult<()> {
        paths.ensure_dirs()?;
        std::fs::write(paths.config_file(), serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn validate(&self) -> CoreResult<()> {
        if self.poll_interval_ms == 0 {
            return Err(CoreError::Config("poll_interval_ms must be positive".to_string()));
        }
        for (field, value) in [("table", &self.table), ("channel", &self.channel)] {
            if value.trim().is_empty() {
                return Err(CoreError::Config(format!("{field} must not be empty")));
            }
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
