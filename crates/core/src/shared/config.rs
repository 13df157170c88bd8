use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::shared::constants::{
    CONFIG_DIR_NAME, DEFAULT_CAPTURE_FPS, DEFAULT_CAPTURE_HEIGHT, DEFAULT_CAPTURE_WIDTH,
    DEFAULT_JPEG_QUALITY, DEFAULT_POLL_INTERVAL_MS, DEFAULT_SERVER_URL, SERVER_URL_ENV,
};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write config {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Capture device preferences. `None` picks the platform default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub device: Option<String>,
    pub backend: Option<String>,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            device: None,
            backend: None,
            width: DEFAULT_CAPTURE_WIDTH,
            height: DEFAULT_CAPTURE_HEIGHT,
            fps: DEFAULT_CAPTURE_FPS,
        }
    }
}

/// Settings shared by every front end: where the face service lives,
/// how often to poll it and how frames are captured and encoded.
///
/// Resolution order: defaults, then the JSON file, then
/// [`SERVER_URL_ENV`], then whatever the caller overrides explicitly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub server_url: String,
    pub poll_interval_ms: u64,
    pub capture: CaptureConfig,
    pub jpeg_quality: u8,
    /// No timeout when unset.
    pub request_timeout_ms: Option<u64>,
    /// Cap on concurrently outstanding polling calls; unset means no cap.
    pub max_in_flight: Option<usize>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            capture: CaptureConfig::default(),
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            request_timeout_ms: None,
            max_in_flight: None,
        }
    }
}

impl ClientConfig {
    /// `$CONFIG_DIR/FaceWatch/client.json`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(CONFIG_DIR_NAME).join("client.json"))
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&json).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Loads an explicit file (which must exist), else the default file if
    /// present, else the built-in defaults. Applies the environment
    /// override and validates the result.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match explicit {
            Some(path) => Self::load(path)?,
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(path) => Self::load(&path)?,
                None => Self::default(),
            },
        };
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(SERVER_URL_ENV).filter(|u| !u.trim().is_empty()) {
            log::debug!("Server URL overridden by {SERVER_URL_ENV}: {url}");
            self.server_url = url;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.server_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "server URL must start with http:// or https://, got '{url}'"
            )));
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "poll interval must be at least 1 ms".into(),
            ));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(ConfigError::Invalid(format!(
                "JPEG quality must be between 1 and 100, got {}",
                self.jpeg_quality
            )));
        }
        if self.capture.width == 0 || self.capture.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "capture size must be non-zero, got {}x{}",
                self.capture.width, self.capture.height
            )));
        }
        if self.max_in_flight == Some(0) {
            return Err(ConfigError::Invalid(
                "max_in_flight must be at least 1 when set".into(),
            ));
        }
        Ok(())
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;
        fs::write(path, json).map_err(|e| ConfigError::Write {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Joins the base URL and an endpoint path without doubling slashes.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.server_url.trim().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_are_valid() {
        let config = ClientConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.poll_interval(), Duration::from_millis(100));
        assert_eq!(config.capture.width, 640);
        assert_eq!(config.capture.height, 480);
        assert!(config.request_timeout().is_none());
    }

    #[test]
    fn test_load_partial_file_fills_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("client.json");
        fs::write(
            &path,
            r#"{ "server_url": "http://faces.local:8080", "capture": { "width": 1280 } }"#,
        )
        .unwrap();

        let config = ClientConfig::load(&path).unwrap();
        assert_eq!(config.server_url, "http://faces.local:8080");
        assert_eq!(config.capture.width, 1280);
        assert_eq!(config.capture.height, DEFAULT_CAPTURE_HEIGHT);
        assert_eq!(config.poll_interval_ms, DEFAULT_POLL_INTERVAL_MS);
    }

    #[test]
    fn test_load_missing_file_is_read_error() {
        let err = ClientConfig::load(Path::new("/nonexistent/client.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_load_garbage_is_parse_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("client.json");
        fs::write(&path, "not json").unwrap();
        let err = ClientConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_save_then_load() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("client.json");
        let config = ClientConfig {
            max_in_flight: Some(2),
            request_timeout_ms: Some(1500),
            ..ClientConfig::default()
        };
        config.save(&path).unwrap();
        assert_eq!(ClientConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_env_override_wins() {
        let mut config = ClientConfig::default();
        config.apply_env(|key| {
            (key == SERVER_URL_ENV).then(|| "https://remote.example:443".to_string())
        });
        assert_eq!(config.server_url, "https://remote.example:443");
    }

    #[test]
    fn test_blank_env_override_is_ignored() {
        let mut config = ClientConfig::default();
        config.apply_env(|_| Some("  ".to_string()));
        assert_eq!(config.server_url, DEFAULT_SERVER_URL);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let bad_url = ClientConfig {
            server_url: "ftp://x".into(),
            ..ClientConfig::default()
        };
        assert!(bad_url.validate().is_err());

        let zero_interval = ClientConfig {
            poll_interval_ms: 0,
            ..ClientConfig::default()
        };
        assert!(zero_interval.validate().is_err());

        let zero_quality = ClientConfig {
            jpeg_quality: 0,
            ..ClientConfig::default()
        };
        assert!(zero_quality.validate().is_err());

        let zero_cap = ClientConfig {
            max_in_flight: Some(0),
            ..ClientConfig::default()
        };
        assert!(zero_cap.validate().is_err());
    }

    #[test]
    fn test_endpoint_joins_without_double_slash() {
        let config = ClientConfig {
            server_url: "http://host:5000/".into(),
            ..ClientConfig::default()
        };
        assert_eq!(config.endpoint("/detect"), "http://host:5000/detect");
        assert_eq!(config.endpoint("enroll"), "http://host:5000/enroll");
    }
}
