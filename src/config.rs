use crate::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub database_path: PathBuf,
    pub log_dir: PathBuf,
    pub log_level: String,
    pub busy_timeout_ms: u64,
    pub publish_sweep_interval_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("linkbio.db"),
            log_dir: PathBuf::from("logs"),
            log_level: "info".to_string(),
            busy_timeout_ms: 5_000,
            publish_sweep_interval_secs: 60,
        }
    }
}

impl Settings {
    /// Defaults, then the optional YAML file, then `LINKBIO_*` variables.
    pub fn load(path: Option<&Path>) -> AppResult<Self> {
        let mut settings = match path {
            Some(path) => {
                let raw = fs::read_to_string(path)?;
                if raw.trim().is_empty() {
                    Self::default()
                } else {
                    serde_yaml::from_str(&raw)?
                }
            }
            None => Self::default(),
        };
        settings.apply_overrides(|key| std::env::var(key).ok())?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> AppResult<()> {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        if let Some(value) = read("LINKBIO_DATABASE_PATH") {
            self.database_path = PathBuf::from(value);
        }
        if let Some(value) = read("LINKBIO_LOG_DIR") {
            self.log_dir = PathBuf::from(value);
        }
        if let Some(value) = read("LINKBIO_LOG_LEVEL") {
            self.log_level = value;
        }
        if let Some(value) = read("LINKBIO_BUSY_TIMEOUT_MS") {
            self.busy_timeout_ms = parse_number("LINKBIO_BUSY_TIMEOUT_MS", &value)?;
        }
        if let Some(value) = read("LINKBIO_SWEEP_INTERVAL_SECS") {
            self.publish_sweep_interval_secs = parse_number("LINKBIO_SWEEP_INTERVAL_SECS", &value)?;
        }
        Ok(())
    }

    fn validate(&self) -> AppResult<()> {
        if self.publish_sweep_interval_secs == 0 {
            return Err(AppError::Validation(
                "publishSweepIntervalSecs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.publish_sweep_interval_secs)
    }
}

fn parse_number(key: &str, value: &str) -> AppResult<u64> {
    value
        .parse::<u64>()
        .map_err(|_| AppError::Validation(format!("{} must be a non-negative integer, got '{}'", key, value)))
}
