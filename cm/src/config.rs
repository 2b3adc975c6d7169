//! CarMonitor configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Main CarMonitor configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Task periods and shutdown budget
    pub timing: TimingConfig,

    /// Where committed values go
    pub output: OutputConfig,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,
}

impl Config {
    /// Load from `config_path`, else the first readable candidate file, else defaults
    ///
    /// An explicit path must load. Candidates are `.carmonitor.yml` in the
    /// working directory, then `carmonitor/carmonitor.yml` under the user
    /// config dir; a broken candidate is skipped with a warning.
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        for candidate in Self::candidates() {
            if !candidate.exists() {
                continue;
            }
            match Self::load_from_file(&candidate) {
                Ok(config) => return Ok(config),
                Err(e) => warn!(path = %candidate.display(), error = %e, "skipping unreadable config"),
            }
        }

        info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn candidates() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(".carmonitor.yml")];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("carmonitor").join("carmonitor.yml"));
        }
        paths
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).context("Failed to read config file")?;
        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;
        info!(path = %path.display(), "loaded config");
        Ok(config)
    }
}

/// Task periods, all in milliseconds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Owner loop refreshes data from the car this often
    #[serde(rename = "refresh-ms")]
    pub refresh_ms: u64,

    /// Speed producer bumps the speed this often
    #[serde(rename = "increase-ms")]
    pub increase_ms: u64,

    /// Poll interval while the car is disconnected
    #[serde(rename = "reconnect-ms")]
    pub reconnect_ms: u64,

    /// How long to wait for tasks after cancellation
    #[serde(rename = "shutdown-timeout-ms")]
    pub shutdown_timeout_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        debug!("TimingConfig::default: called");
        Self {
            refresh_ms: 2_000,
            increase_ms: 5_000,
            reconnect_ms: 1_000,
            shutdown_timeout_ms: 5_000,
        }
    }
}

impl TimingConfig {
    pub fn refresh(&self) -> Duration {
        Duration::from_millis(self.refresh_ms.max(1))
    }

    pub fn increase(&self) -> Duration {
        Duration::from_millis(self.increase_ms.max(1))
    }

    pub fn reconnect(&self) -> Duration {
        Duration::from_millis(self.reconnect_ms.max(1))
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Append-only telemetry log
    pub path: PathBuf,

    /// Print every value to stdout
    pub console: bool,

    /// Slots in the data notify channel and each consumer channel
    #[serde(rename = "notify-buffer")]
    pub notify_buffer: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        debug!("OutputConfig::default: called");
        Self {
            path: PathBuf::from("log.txt"),
            console: true,
            notify_buffer: valuestore::DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.timing.refresh_ms, 2_000);
        assert_eq!(config.timing.increase_ms, 5_000);
        assert_eq!(config.timing.reconnect_ms, 1_000);
        assert_eq!(config.output.path, PathBuf::from("log.txt"));
        assert!(config.output.console);
        assert_eq!(config.output.notify_buffer, 1);
        assert!(config.log_level.is_none());
    }

    #[test]
    fn test_parse_partial_yaml() {
        let yaml = r#"
timing:
  refresh-ms: 50
output:
  console: false
log-level: DEBUG
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.timing.refresh_ms, 50);
        assert_eq!(config.timing.increase_ms, 5_000);
        assert!(!config.output.console);
        assert_eq!(config.output.path, PathBuf::from("log.txt"));
        assert_eq!(config.log_level.as_deref(), Some("DEBUG"));
    }

    #[test]
    fn test_load_explicit_path() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("cm.yml");
        fs::write(&path, "output:\n  path: /tmp/car.txt\n  notify-buffer: 8\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.output.path, PathBuf::from("/tmp/car.txt"));
        assert_eq!(config.output.notify_buffer, 8);
    }

    #[test]
    fn test_load_missing_explicit_path_fails() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("missing.yml");
        assert!(Config::load(Some(&path)).is_err());
    }

    #[test]
    fn test_candidates_prefer_working_directory() {
        let candidates = Config::candidates();
        assert_eq!(candidates[0], PathBuf::from(".carmonitor.yml"));
        assert!(candidates.iter().skip(1).all(|p| p.ends_with("carmonitor/carmonitor.yml")));
    }

    #[test]
    fn test_zero_periods_are_clamped() {
        let timing = TimingConfig {
            refresh_ms: 0,
            increase_ms: 0,
            reconnect_ms: 0,
            shutdown_timeout_ms: 0,
        };
        assert_eq!(timing.refresh(), Duration::from_millis(1));
        assert_eq!(timing.increase(), Duration::from_millis(1));
        assert_eq!(timing.reconnect(), Duration::from_millis(1));
        assert_eq!(timing.shutdown_timeout(), Duration::ZERO);
    }
}
