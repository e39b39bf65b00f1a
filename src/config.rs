//! Configuration types for the warden service

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub monitor: MonitorSettings,
}

/// Settings for one monitored target.
///
/// An immutable snapshot: a config reload produces a whole new value, never a
/// partial mutation of a live one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorSettings {
    /// URL of the health endpoint to probe
    pub target_url: String,
    /// Bearer token sent with each probe
    #[serde(default)]
    pub target_token: String,
    /// Consecutive failures before remediation and notification
    #[serde(default = "default_retry_times")]
    pub retry_times: u32,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default = "default_check_interval_seconds")]
    pub check_interval_seconds: u64,
    #[serde(default)]
    pub notify: NotifySettings,
    #[serde(default)]
    pub device: DeviceSettings,
}

impl MonitorSettings {
    /// Per-request timeout; a configured zero falls back to the default
    pub fn timeout(&self) -> Duration {
        let seconds = if self.timeout_seconds == 0 {
            default_timeout_seconds()
        } else {
            self.timeout_seconds
        };
        Duration::from_secs(seconds)
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_seconds)
    }
}

/// Notification endpoint settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotifySettings {
    #[serde(default)]
    pub api_url: String,
    #[serde(default)]
    pub api_token: String,
    #[serde(default)]
    pub topic_id: i64,
}

/// Smart plug (Tuya) settings for the remediation power cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceSettings {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub access_id: String,
    #[serde(default)]
    pub access_key: String,
    #[serde(default)]
    pub device_id: String,
    /// Region suffix of the openapi.tuya<region>.com host
    #[serde(default = "default_region")]
    pub region: String,
    /// Seconds to stay powered off between the off and on toggles
    #[serde(default = "default_wait_seconds")]
    pub wait_seconds: u64,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            access_id: String::new(),
            access_key: String::new(),
            device_id: String::new(),
            region: default_region(),
            wait_seconds: default_wait_seconds(),
        }
    }
}

fn default_retry_times() -> u32 {
    3
}

fn default_timeout_seconds() -> u64 {
    10
}

fn default_check_interval_seconds() -> u64 {
    60
}

fn default_region() -> String {
    "us".to_string()
}

fn default_wait_seconds() -> u64 {
    5
}

/// Load configuration from a JSON file
pub fn load_config(path: &Path) -> crate::Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        crate::WardenError::Config(format!("Failed to read config file {:?}: {}", path, e))
    })?;
    let config: Config = serde_json::from_str(&content)?;
    Ok(config)
}

/// Watches the config file for changes by polling its modified time.
///
/// Polled at cycle boundaries by the run loop, so a reload is only ever
/// applied between check cycles.
#[derive(Debug)]
pub struct ConfigWatcher {
    path: PathBuf,
    last_modified: Option<SystemTime>,
}

impl ConfigWatcher {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let last_modified = std::fs::metadata(&path).and_then(|m| m.modified()).ok();
        Self {
            path,
            last_modified,
        }
    }

    /// Reload the config if the file changed since the last poll.
    ///
    /// Returns `Ok(None)` when unchanged. A failed reload returns the error
    /// once; the caller keeps the previous snapshot.
    pub fn poll(&mut self) -> crate::Result<Option<Config>> {
        let modified = std::fs::metadata(&self.path)?.modified()?;
        if self.last_modified == Some(modified) {
            return Ok(None);
        }
        self.last_modified = Some(modified);
        let config = load_config(&self.path)?;
        Ok(Some(config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_config() {
        let json = r#"{
            "monitor": {
                "target_url": "http://ha.local:8123/api/",
                "target_token": "bearer-token",
                "retry_times": 5,
                "timeout_seconds": 15,
                "check_interval_seconds": 30,
                "notify": {
                    "api_url": "https://push.example.com/send",
                    "api_token": "push-token",
                    "topic_id": 42
                },
                "device": {
                    "enabled": true,
                    "access_id": "tuya-id",
                    "access_key": "tuya-key",
                    "device_id": "dev-1",
                    "region": "eu",
                    "wait_seconds": 8
                }
            }
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();
        let m = &config.monitor;
        assert_eq!(m.target_url, "http://ha.local:8123/api/");
        assert_eq!(m.target_token, "bearer-token");
        assert_eq!(m.retry_times, 5);
        assert_eq!(m.timeout(), Duration::from_secs(15));
        assert_eq!(m.check_interval(), Duration::from_secs(30));
        assert_eq!(m.notify.api_url, "https://push.example.com/send");
        assert_eq!(m.notify.topic_id, 42);
        assert!(m.device.enabled);
        assert_eq!(m.device.region, "eu");
        assert_eq!(m.device.wait_seconds, 8);
    }

    #[test]
    fn parse_minimal_config_applies_defaults() {
        let json = r#"{"monitor": {"target_url": "http://ha.local/"}}"#;
        let config: Config = serde_json::from_str(json).unwrap();
        let m = &config.monitor;
        assert_eq!(m.target_token, "");
        assert_eq!(m.retry_times, 3);
        assert_eq!(m.timeout_seconds, 10);
        assert_eq!(m.check_interval_seconds, 60);
        assert_eq!(m.notify.api_url, "");
        assert!(!m.device.enabled);
        assert_eq!(m.device.region, "us");
        assert_eq!(m.device.wait_seconds, 5);
    }

    #[test]
    fn zero_timeout_normalizes_to_default() {
        let json = r#"{"monitor": {"target_url": "http://x/", "timeout_seconds": 0}}"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.monitor.timeout(), Duration::from_secs(10));
    }

    #[test]
    fn load_config_missing_file() {
        let result = load_config(Path::new("/nonexistent/config.json"));
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn load_config_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.json");
        std::fs::write(&config_path, "not json").unwrap();

        assert!(load_config(&config_path).is_err());
    }

    #[test]
    fn load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.json");
        std::fs::write(
            &config_path,
            r#"{"monitor": {"target_url": "http://ha.local/"}}"#,
        )
        .unwrap();

        let config = load_config(&config_path).unwrap();
        assert_eq!(config.monitor.target_url, "http://ha.local/");
    }

    #[test]
    fn watcher_returns_none_when_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.json");
        std::fs::write(
            &config_path,
            r#"{"monitor": {"target_url": "http://a/"}}"#,
        )
        .unwrap();

        let mut watcher = ConfigWatcher::new(&config_path);
        assert!(watcher.poll().unwrap().is_none());
    }

    #[test]
    fn watcher_reloads_after_change() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.json");
        std::fs::write(
            &config_path,
            r#"{"monitor": {"target_url": "http://a/"}}"#,
        )
        .unwrap();

        let mut watcher = ConfigWatcher::new(&config_path);
        std::thread::sleep(Duration::from_millis(20));
        std::fs::write(
            &config_path,
            r#"{"monitor": {"target_url": "http://b/"}}"#,
        )
        .unwrap();

        let reloaded = watcher.poll().unwrap().expect("change not detected");
        assert_eq!(reloaded.monitor.target_url, "http://b/");
        // Settles back to unchanged afterwards
        assert!(watcher.poll().unwrap().is_none());
    }

    #[test]
    fn watcher_reports_broken_reload_once() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.json");
        std::fs::write(
            &config_path,
            r#"{"monitor": {"target_url": "http://a/"}}"#,
        )
        .unwrap();

        let mut watcher = ConfigWatcher::new(&config_path);
        std::thread::sleep(Duration::from_millis(20));
        std::fs::write(&config_path, "not json").unwrap();

        assert!(watcher.poll().is_err());
        // The bad revision is remembered; no repeated errors until it changes
        assert!(watcher.poll().unwrap().is_none());
    }
}
