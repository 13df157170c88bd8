use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use facewatch_core::shared::config::ClientConfig;
use facewatch_core::shared::constants::CONFIG_DIR_NAME;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Appearance {
    System,
    Dark,
    Light,
}

impl Appearance {
    pub const ALL: &[Appearance] = &[Appearance::System, Appearance::Dark, Appearance::Light];
}

impl std::fmt::Display for Appearance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Appearance::System => write!(f, "System"),
            Appearance::Dark => write!(f, "Dark"),
            Appearance::Light => write!(f, "Light"),
        }
    }
}

/// Window preferences plus the connection overrides the controller is
/// built from. Unknown or missing fields fall back to defaults.
///
/// Connection fields left unset defer to the resolved [`ClientConfig`]
/// (config file and `FACEWATCH_SERVER`); only values the user changed
/// here are stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poll_interval_ms: Option<u64>,
    /// Empty defers to the client config, then the platform's default camera.
    pub device: String,
    pub appearance: Appearance,
    pub high_contrast: bool,
    pub font_scale: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: None,
            poll_interval_ms: None,
            device: String::new(),
            appearance: Appearance::System,
            high_contrast: false,
            font_scale: 1.0,
        }
    }
}

impl Settings {
    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(CONFIG_DIR_NAME).join("settings.json"))
    }

    pub fn load() -> Self {
        Self::config_path()
            .map(|path| Self::load_from(&path))
            .unwrap_or_default()
    }

    pub fn load_from(path: &Path) -> Self {
        fs::read_to_string(path)
            .ok()
            .and_then(|json| serde_json::from_str(&json).ok())
            .unwrap_or_default()
    }

    pub fn save(&self) {
        if let Some(path) = Self::config_path() {
            self.save_to(&path);
        }
    }

    pub fn save_to(&self, path: &Path) {
        if let Some(parent) = path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        match serde_json::to_string_pretty(self) {
            Ok(json) => {
                if let Err(e) = fs::write(path, json) {
                    log::warn!("Could not save settings to {}: {e}", path.display());
                }
            }
            Err(e) => log::warn!("Could not serialize settings: {e}"),
        }
    }

    /// Layers the connection overrides over `base` (the shared client config).
    pub fn client_config(&self, base: &ClientConfig) -> ClientConfig {
        let mut config = base.clone();
        if let Some(url) = &self.server_url {
            config.server_url = url.trim().to_string();
        }
        if let Some(interval) = self.poll_interval_ms {
            config.poll_interval_ms = interval;
        }
        let device = self.device.trim();
        if !device.is_empty() {
            config.capture.device = Some(device.to_string());
        }
        config
    }

    /// Same appearance, connection overrides cleared.
    pub fn without_overrides(&self) -> Self {
        Self {
            server_url: None,
            poll_interval_ms: None,
            device: String::new(),
            ..self.clone()
        }
    }
}

/// Editable copy of the effective connection fields. Nothing takes effect
/// until [`SettingsDraft::apply`] succeeds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsDraft {
    pub server_url: String,
    pub poll_interval_ms: String,
    pub device: String,
    pub error: Option<String>,
}

impl SettingsDraft {
    pub fn from_settings(settings: &Settings, base: &ClientConfig) -> Self {
        let effective = settings.client_config(base);
        Self {
            server_url: effective.server_url,
            poll_interval_ms: effective.poll_interval_ms.to_string(),
            device: effective.capture.device.unwrap_or_default(),
            error: None,
        }
    }

    /// Returns `current` with the drafted connection fields, or a message
    /// for the first field that does not validate. Fields equal to `base`
    /// are stored as unset so later config or environment changes apply.
    pub fn apply(&self, current: &Settings, base: &ClientConfig) -> Result<Settings, String> {
        let interval = self.poll_interval_ms.trim();
        let poll_interval_ms = interval
            .parse::<u64>()
            .map_err(|_| format!("'{interval}' is not a whole number of milliseconds"))?;
        let server_url = self.server_url.trim();
        let device = self.device.trim();
        let next = Settings {
            server_url: (server_url != base.server_url.trim()).then(|| server_url.to_string()),
            poll_interval_ms: (poll_interval_ms != base.poll_interval_ms).then_some(poll_interval_ms),
            device: if base.capture.device.as_deref() == Some(device) {
                String::new()
            } else {
                device.to_string()
            },
            ..current.clone()
        };
        next.client_config(base)
            .validate()
            .map_err(|e| e.to_string())?;
        Ok(next)
    }
}
