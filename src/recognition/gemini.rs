//! Google Gemini provider (`models/{model}:generateContent`).

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};

use super::{ProviderError, RecognitionProvider, RecognitionResult, Translatable, ai_prompt};

pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

#[derive(Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: &'static str,
    data: String,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

pub struct GeminiProvider {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    translate_target: Option<String>,
}

impl GeminiProvider {
    pub fn new(endpoint: &str, model: &str, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            translate_target: None,
        }
    }

    fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }

    fn request_body(&self, png: &[u8]) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content {
                parts: vec![
                    Part {
                        text: Some(ai_prompt(self.translate_target.as_deref())),
                        inline_data: None,
                    },
                    Part {
                        text: None,
                        inline_data: Some(InlineData {
                            mime_type: "image/png",
                            data: STANDARD.encode(png),
                        }),
                    },
                ],
            }],
        }
    }
}

impl Translatable for GeminiProvider {
    fn set_translate(&mut self, target: Option<&str>) {
        self.translate_target = target.map(str::to_string);
    }
}

#[async_trait]
impl RecognitionProvider for GeminiProvider {
    fn name(&self) -> &'static str {
        "Gemini"
    }

    async fn recognize(&self, png: &[u8]) -> Result<Vec<RecognitionResult>, ProviderError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(ProviderError::MissingApiKey(API_KEY_ENV))?;

        log::info!("Querying Gemini model {}", self.model);

        let response = self
            .client
            .post(self.url())
            .header("x-goog-api-key", api_key.trim())
            .json(&self.request_body(png))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Engine(format!("Gemini API returned {}: {}", status, body)));
        }

        let body = response.bytes().await?;
        parse_response(&body)
    }
}

pub(crate) fn parse_response(body: &[u8]) -> Result<Vec<RecognitionResult>, ProviderError> {
    let parsed: GenerateContentResponse = serde_json::from_slice(body)
        .map_err(|e| ProviderError::MalformedResponse(format!("Gemini reply: {}", e)))?;
    let text = parsed
        .candidates
        .first()
        .and_then(|c| c.content.parts.first())
        .map(|p| p.text.trim())
        .unwrap_or_default();
    if text.is_empty() {
        return Ok(Vec::new());
    }
    Ok(vec![RecognitionResult::text_only(text)])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_has_prompt_then_inline_png() {
        let provider = GeminiProvider::new(
            "https://generativelanguage.googleapis.com/v1beta",
            "gemini-2.5-flash-lite",
            Some("key".to_string()),
        );
        assert_eq!(
            provider.url(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash-lite:generateContent"
        );
        let body = serde_json::to_value(provider.request_body(&[0xff])).unwrap();
        let parts = &body["contents"][0]["parts"];
        assert!(parts[0]["text"].is_string());
        assert_eq!(parts[1]["inlineData"]["mimeType"], "image/png");
        assert_eq!(parts[1]["inlineData"]["data"], "/w==");
        assert!(parts[1].get("text").is_none());
    }

    #[test]
    fn first_candidate_part_is_the_answer() {
        let body = br#"{"candidates":[{"content":{"parts":[{"text":"Hola"},{"text":"ignored"}]}}]}"#;
        assert_eq!(
            parse_response(body).unwrap(),
            vec![RecognitionResult::text_only("Hola")]
        );
        assert!(parse_response(br#"{"candidates":[]}"#).unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_key_fails_before_any_request() {
        let provider = GeminiProvider::new("http://127.0.0.1:9", "m", Some("  ".to_string()));
        let err = provider.recognize(b"png").await.unwrap_err();
        assert!(matches!(err, ProviderError::MissingApiKey(API_KEY_ENV)));
    }
}
