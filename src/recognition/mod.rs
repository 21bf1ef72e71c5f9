//! Text recognition providers and the worker that runs them.
//!
//! Every provider takes the PNG-encoded selection and returns a list of
//! [`RecognitionResult`]s whose boxes live in the pixel space of that PNG.
//! Optional behavior is expressed through the capability traits
//! [`Translatable`] and [`LanguageConfigurable`], applied when the provider is
//! built from configuration.

mod gemini;
mod manager;
mod ollama;
mod paddle;
mod tesseract;

use std::{fmt, str::FromStr};

use async_trait::async_trait;
use thiserror::Error;

use crate::config::RecognitionConfig;
use crate::util::{Point, Rect};

pub use gemini::{API_KEY_ENV as GEMINI_API_KEY_ENV, GeminiProvider};
pub use manager::{
    OutcomeSink, ProviderFactory, RecognitionManager, RecognitionOutcome, RecognitionRequest,
};
pub use ollama::OllamaProvider;
pub use paddle::PaddleProvider;
pub use tesseract::TesseractProvider;

/// One recognized fragment.
///
/// Position and size are in pixels of the image handed to the provider. AI
/// providers return whole-text answers with a zero box.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionResult {
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl RecognitionResult {
    pub fn new(text: impl Into<String>, x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            text: text.into(),
            x,
            y,
            width,
            height,
        }
    }

    /// A result without a location.
    pub fn text_only(text: impl Into<String>) -> Self {
        Self::new(text, 0.0, 0.0, 0.0, 0.0)
    }

    pub fn has_box(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }

    /// Maps the box back onto the overlay: `anchor` is the logical top-left of
    /// the selection, `scale` the frozen-image to logical ratio.
    pub fn project(&self, anchor: Point, scale: (f64, f64)) -> Option<Rect> {
        if !self.has_box() || scale.0 <= 0.0 || scale.1 <= 0.0 {
            return None;
        }
        Some(Rect::new(
            anchor.x + self.x / scale.0,
            anchor.y + self.y / scale.1,
            self.width / scale.0,
            self.height / scale.1,
        ))
    }
}

/// Joins result texts the way they are shown and copied.
pub fn joined_text(results: &[RecognitionResult]) -> String {
    results
        .iter()
        .map(|r| r.text.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Errors a provider may report. None of them end the session.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("service unavailable: {0}")]
    Unavailable(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("engine error: {0}")]
    Engine(String),

    #[error("no API key configured (set {0})")]
    MissingApiKey(&'static str),

    #[error("timed out after {0}s")]
    Timeout(u64),
}

/// The provider contract.
#[async_trait]
pub trait RecognitionProvider: Send + Sync {
    /// Short display name used in status messages.
    fn name(&self) -> &'static str;

    async fn recognize(&self, png: &[u8]) -> Result<Vec<RecognitionResult>, ProviderError>;
}

/// Providers that can answer with a translation instead of a transcription.
pub trait Translatable {
    fn set_translate(&mut self, target: Option<&str>);
}

/// Providers whose engine needs a language tag.
pub trait LanguageConfigurable {
    fn set_language(&mut self, tag: &str);
}

/// The built-in providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    Tesseract,
    Paddle,
    Ollama,
    Gemini,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 4] = [
        ProviderKind::Tesseract,
        ProviderKind::Paddle,
        ProviderKind::Ollama,
        ProviderKind::Gemini,
    ];

    /// Menu label.
    pub fn label(self) -> &'static str {
        match self {
            ProviderKind::Tesseract => "Tesseract",
            ProviderKind::Paddle => "PaddleOCR",
            ProviderKind::Ollama => "Ollama AI",
            ProviderKind::Gemini => "Gemini AI",
        }
    }

    /// Name accepted on the command line and in the config file.
    pub fn id(self) -> &'static str {
        match self {
            ProviderKind::Tesseract => "tesseract",
            ProviderKind::Paddle => "paddle",
            ProviderKind::Ollama => "ollama",
            ProviderKind::Gemini => "gemini",
        }
    }

    /// Builds the provider with its capabilities configured.
    pub fn build(self, config: &RecognitionConfig) -> Box<dyn RecognitionProvider> {
        let translate_target = config
            .translate
            .then_some(config.translate_target.as_str());
        match self {
            ProviderKind::Tesseract => {
                let mut provider = TesseractProvider::new();
                provider.set_language(&config.language);
                Box::new(provider)
            }
            ProviderKind::Paddle => Box::new(PaddleProvider::new(&config.paddle.socket_path)),
            ProviderKind::Ollama => {
                let mut provider =
                    OllamaProvider::new(&config.ollama.endpoint, &config.ollama.model);
                provider.set_translate(translate_target);
                Box::new(provider)
            }
            ProviderKind::Gemini => {
                let mut provider = GeminiProvider::new(
                    &config.gemini.endpoint,
                    &config.gemini.model,
                    config.gemini.resolved_api_key(),
                );
                provider.set_translate(translate_target);
                Box::new(provider)
            }
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tesseract" => Ok(ProviderKind::Tesseract),
            "paddle" | "paddleocr" => Ok(ProviderKind::Paddle),
            "ollama" => Ok(ProviderKind::Ollama),
            "gemini" => Ok(ProviderKind::Gemini),
            other => Err(format!(
                "unknown provider '{}' (expected one of: tesseract, paddle, ollama, gemini)",
                other
            )),
        }
    }
}

/// Instruction sent to the AI providers.
pub(crate) fn ai_prompt(translate_target: Option<&str>) -> String {
    match translate_target {
        Some(target) => format!(
            "Translate the text in the image into {}. Respond only with the translation.",
            target
        ),
        None => "Extract any visible text in this image. Respond only with the extracted text."
            .to_string(),
    }
}
