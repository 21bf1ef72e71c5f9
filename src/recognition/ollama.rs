//! Ollama vision model provider (`/api/generate`).

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};

use super::{ProviderError, RecognitionProvider, RecognitionResult, Translatable, ai_prompt};

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
    images: Vec<String>,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

pub struct OllamaProvider {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    translate_target: Option<String>,
}

impl OllamaProvider {
    pub fn new(endpoint: &str, model: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: model.to_string(),
            translate_target: None,
        }
    }

    fn url(&self) -> String {
        format!("{}/api/generate", self.endpoint)
    }

    fn request_body(&self, png: &[u8]) -> GenerateRequest<'_> {
        GenerateRequest {
            model: &self.model,
            prompt: ai_prompt(self.translate_target.as_deref()),
            stream: false,
            images: vec![STANDARD.encode(png)],
        }
    }
}

impl Translatable for OllamaProvider {
    fn set_translate(&mut self, target: Option<&str>) {
        self.translate_target = target.map(str::to_string);
    }
}

#[async_trait]
impl RecognitionProvider for OllamaProvider {
    fn name(&self) -> &'static str {
        "Ollama"
    }

    async fn recognize(&self, png: &[u8]) -> Result<Vec<RecognitionResult>, ProviderError> {
        log::info!("Querying Ollama model {} at {}", self.model, self.endpoint);

        let response = self
            .client
            .post(self.url())
            .json(&self.request_body(png))
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    ProviderError::Unavailable(format!("cannot reach {}: {}", self.endpoint, e))
                } else {
                    ProviderError::Http(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Engine(format!("Ollama returned {}: {}", status, body)));
        }

        let body = response.bytes().await?;
        parse_response(&body)
    }
}

pub(crate) fn parse_response(body: &[u8]) -> Result<Vec<RecognitionResult>, ProviderError> {
    let parsed: GenerateResponse = serde_json::from_slice(body)
        .map_err(|e| ProviderError::MalformedResponse(format!("Ollama reply: {}", e)))?;
    let text = parsed.response.trim();
    if text.is_empty() {
        return Ok(Vec::new());
    }
    Ok(vec![RecognitionResult::text_only(text)])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_carries_base64_image_and_disables_streaming() {
        let provider = OllamaProvider::new("http://localhost:11434/", "gemma3:12b");
        assert_eq!(provider.url(), "http://localhost:11434/api/generate");

        let body = serde_json::to_value(provider.request_body(&[1, 2, 3])).unwrap();
        assert_eq!(body["model"], "gemma3:12b");
        assert_eq!(body["stream"], false);
        assert_eq!(body["images"][0], "AQID");
        assert!(body["prompt"].as_str().unwrap().starts_with("Extract"));
    }

    #[test]
    fn translate_changes_prompt() {
        let mut provider = OllamaProvider::new("http://localhost:11434", "m");
        provider.set_translate(Some("German"));
        let body = serde_json::to_value(provider.request_body(&[])).unwrap();
        assert!(body["prompt"].as_str().unwrap().contains("German"));
    }

    #[test]
    fn response_field_becomes_single_result() {
        let results = parse_response(br#"{"model":"m","response":" Hello there \n","done":true}"#)
            .unwrap();
        assert_eq!(results, vec![RecognitionResult::text_only("Hello there")]);
        assert!(parse_response(br#"{"response":""}"#).unwrap().is_empty());
        assert!(parse_response(br#"{"error":"model not found"}"#).is_err());
    }
}
