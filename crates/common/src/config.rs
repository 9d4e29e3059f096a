//! Adapter configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{DisplayError, DisplayResult};

/// Global configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct VidmodeConfig {
    /// Fade transition around video mode switches.
    pub fade: FadeConfig,

    /// Monitor enumeration settings.
    pub display: DisplayConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Fade-to-black transition wrapped around every mode switch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FadeConfig {
    /// Disable to switch modes without blanking (headless and test runs).
    pub enabled: bool,

    /// How long the fade reservation is held, in seconds.
    pub reservation_secs: f32,

    /// Blend to solid black before the switch, in seconds.
    pub fade_out_secs: f32,

    /// Blend back from black after the switch, in seconds.
    pub fade_in_secs: f32,
}

/// Monitor enumeration settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Locale key used to pick the localized product name.
    pub name_locale: String,

    /// Name used when the display reports no product name.
    pub fallback_name: String,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "vidmode=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,
}

impl Default for FadeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            reservation_secs: 5.0,
            fade_out_secs: 0.3,
            fade_in_secs: 0.5,
        }
    }
}

impl FadeConfig {
    /// No blanking at all.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            name_locale: "en_US".to_string(),
            fallback_name: "Unknown".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl VidmodeConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match Self::load_from(&config_path) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!("Failed to load config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Load and validate config from an explicit path.
    pub fn load_from(path: &Path) -> DisplayResult<Self> {
        if !path.exists() {
            return Err(DisplayError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to the standard location.
    pub fn save(&self) -> DisplayResult<()> {
        self.save_to(&config_file_path())
    }

    pub fn save_to(&self, path: &Path) -> DisplayResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Reject values the adapter cannot act on.
    pub fn validate(&self) -> DisplayResult<()> {
        let durations = [
            ("fade.reservation_secs", self.fade.reservation_secs),
            ("fade.fade_out_secs", self.fade.fade_out_secs),
            ("fade.fade_in_secs", self.fade.fade_in_secs),
        ];
        for (field, value) in durations {
            if !value.is_finite() || value < 0.0 {
                return Err(DisplayError::config(format!(
                    "{field} must be a non-negative number of seconds, got {value}"
                )));
            }
        }
        if self.display.name_locale.trim().is_empty() {
            return Err(DisplayError::config("display.name_locale must not be empty"));
        }
        Ok(())
    }
}

/// Standard config file location.
fn config_file_path() -> PathBuf {
    if let Ok(path) = std::env::var("VIDMODE_CONFIG") {
        return PathBuf::from(path);
    }
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("vidmode").join("config.json")
}
