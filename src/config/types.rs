//! Configuration type definitions.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Screen capture and overlay behavior.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CaptureConfig {
    /// Show the frozen image on monitors the pointer is not on. When false
    /// those overlays stay transparent.
    #[serde(default)]
    pub render_inactive: bool,

    /// Use the fractional-scale protocol when the compositor offers it
    #[serde(default = "default_true")]
    pub fractional_scaling: bool,

    /// Include the cursor in the frozen image
    #[serde(default)]
    pub overlay_cursor: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            render_inactive: false,
            fractional_scaling: true,
            overlay_cursor: false,
        }
    }
}

/// What happens with recognized text.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct OutputConfig {
    /// Copy recognized text to the clipboard as soon as it arrives
    #[serde(default)]
    pub auto_copy: bool,

    /// Send a desktop notification with the recognized text
    #[serde(default)]
    pub notify: bool,
}

/// Recognition provider settings.
///
/// # Example TOML
/// ```toml
/// [recognition]
/// provider = "paddle"
/// language = "eng"
///
/// [recognition.paddle]
/// socket_path = "/tmp/paddle_socket_unix"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RecognitionConfig {
    /// Provider to run automatically after every selection
    /// ("tesseract", "paddle", "ollama" or "gemini")
    #[serde(default)]
    pub provider: Option<String>,

    /// Tesseract language tag (e.g. "eng", "spa", "eng+deu")
    #[serde(default = "default_language")]
    pub language: String,

    /// Ask AI providers for a translation instead of a transcription
    #[serde(default)]
    pub translate: bool,

    /// Target language for translations
    #[serde(default = "default_translate_target")]
    pub translate_target: String,

    /// Per-request timeout in seconds (valid range: 1 - 600)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub paddle: PaddleConfig,

    #[serde(default)]
    pub ollama: OllamaConfig,

    #[serde(default)]
    pub gemini: GeminiConfig,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            provider: None,
            language: default_language(),
            translate: false,
            translate_target: default_translate_target(),
            timeout_secs: default_timeout_secs(),
            paddle: PaddleConfig::default(),
            ollama: OllamaConfig::default(),
            gemini: GeminiConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PaddleConfig {
    /// Unix socket of the local OCR service
    #[serde(default = "default_paddle_socket")]
    pub socket_path: String,
}

impl Default for PaddleConfig {
    fn default() -> Self {
        Self {
            socket_path: default_paddle_socket(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct OllamaConfig {
    #[serde(default = "default_ollama_endpoint")]
    pub endpoint: String,

    /// Vision-capable model name
    #[serde(default = "default_ollama_model")]
    pub model: String,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            endpoint: default_ollama_endpoint(),
            model: default_ollama_model(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GeminiConfig {
    #[serde(default = "default_gemini_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_gemini_model")]
    pub model: String,

    /// API key; the GEMINI_API_KEY environment variable takes precedence
    #[serde(default)]
    pub api_key: Option<String>,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            endpoint: default_gemini_endpoint(),
            model: default_gemini_model(),
            api_key: None,
        }
    }
}

impl GeminiConfig {
    /// The key to send: environment first, then the config file.
    pub fn resolved_api_key(&self) -> Option<String> {
        std::env::var(crate::recognition::GEMINI_API_KEY_ENV)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| self.api_key.clone())
    }
}

fn default_true() -> bool {
    true
}

fn default_language() -> String {
    "eng".to_string()
}

fn default_translate_target() -> String {
    "English".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_paddle_socket() -> String {
    "/tmp/paddle_socket_unix".to_string()
}

fn default_ollama_endpoint() -> String {
    "http://localhost:11434".to_string()
}

fn default_ollama_model() -> String {
    "gemma3:12b".to_string()
}

fn default_gemini_endpoint() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_gemini_model() -> String {
    "gemini-2.5-flash-lite".to_string()
}
