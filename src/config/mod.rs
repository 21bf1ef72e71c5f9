//! Configuration file support for wayscan.
//!
//! Settings are read from `~/.config/wayscan/config.toml`. Every section and
//! field is optional; anything missing falls back to its default, and values
//! outside their valid range are clamped with a warning.

pub mod types;

pub use types::{
    CaptureConfig, GeminiConfig, OllamaConfig, OutputConfig, PaddleConfig, RecognitionConfig,
};

use anyhow::{Context, Result};
use log::{debug, info, warn};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::recognition::ProviderKind;

/// Root configuration.
///
/// # Example TOML
/// ```toml
/// [capture]
/// render_inactive = true
///
/// [output]
/// auto_copy = true
///
/// [recognition]
/// provider = "tesseract"
/// language = "spa"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct Config {
    #[serde(default)]
    pub capture: CaptureConfig,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub recognition: RecognitionConfig,
}

/// Command-line switches that override file settings.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub auto_copy: bool,
    pub notify: bool,
    pub render_inactive: bool,
    pub no_fractional: bool,
    pub provider: Option<ProviderKind>,
    pub language: Option<String>,
    pub translate: bool,
}

impl Config {
    /// Validates and clamps values to acceptable ranges.
    ///
    /// - `recognition.timeout_secs`: 1 - 600
    /// - `recognition.provider`: must name a known provider, otherwise dropped
    /// - `recognition.language`: must not be empty, otherwise "eng"
    fn validate_and_clamp(&mut self) {
        if !(1..=600).contains(&self.recognition.timeout_secs) {
            warn!(
                "Invalid timeout_secs {}, clamping to 1-600 range",
                self.recognition.timeout_secs
            );
            self.recognition.timeout_secs = self.recognition.timeout_secs.clamp(1, 600);
        }

        if let Some(name) = &self.recognition.provider {
            if let Err(err) = name.parse::<ProviderKind>() {
                warn!("Ignoring recognition.provider: {}", err);
                self.recognition.provider = None;
            }
        }

        if self.recognition.language.trim().is_empty() {
            warn!("Empty recognition.language, falling back to 'eng'");
            self.recognition.language = "eng".to_string();
        }
    }

    /// Provider to run on every commit, if configured.
    pub fn auto_provider(&self) -> Option<ProviderKind> {
        self.recognition
            .provider
            .as_deref()
            .and_then(|name| name.parse().ok())
    }

    /// Applies command-line overrides. Flags only ever switch features on.
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        self.output.auto_copy |= overrides.auto_copy;
        self.output.notify |= overrides.notify;
        self.capture.render_inactive |= overrides.render_inactive;
        if overrides.no_fractional {
            self.capture.fractional_scaling = false;
        }
        if let Some(kind) = overrides.provider {
            self.recognition.provider = Some(kind.id().to_string());
        }
        if let Some(language) = &overrides.language {
            self.recognition.language = language.clone();
        }
        self.recognition.translate |= overrides.translate;
    }

    /// Returns the path to the configuration file.
    ///
    /// # Errors
    /// Returns an error if the config directory cannot be determined (e.g., HOME not set).
    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not find config directory")?
            .join("wayscan");

        Ok(config_dir.join("config.toml"))
    }

    /// Loads configuration from the default path, or returns defaults if the
    /// file does not exist.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    /// Loads configuration from `config_path`; see [`Config::load`].
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            info!("Config file not found, using defaults");
            debug!("Expected config at: {}", config_path.display());
            return Ok(Self::default());
        }

        let config_str = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config from {}", config_path.display()))?;

        let mut config: Config = toml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config from {}", config_path.display()))?;

        config.validate_and_clamp();

        info!("Loaded config from {}", config_path.display());
        debug!("Config: {:?}", config);

        Ok(config)
    }

    /// JSON schema describing the configuration file.
    pub fn json_schema() -> schemars::Schema {
        schemars::schema_for!(Config)
    }
}
