use std::time::Duration;

use engine_logging::engine_debug;
use serde::{Deserialize, Serialize};

use crate::{ConversionError, FailureKind};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub prompt: String,
    pub max_output_tokens: u32,
    pub temperature: f32,
}

#[async_trait::async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(
        &self,
        api_key: &str,
        request: &CompletionRequest,
    ) -> Result<String, ConversionError>;
}

#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub base_url: String,
    pub connect_timeout: Duration,
    /// Transport-level ceiling. The per-attempt timeout is enforced by the converter.
    pub request_timeout: Duration,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(60),
        }
    }
}

/// Talks to a `generateContent`-style endpoint over HTTPS.
#[derive(Debug, Clone)]
pub struct ReqwestCompletionClient {
    settings: ClientSettings,
    client: reqwest::Client,
}

impl ReqwestCompletionClient {
    pub fn new(settings: ClientSettings) -> Result<Self, ConversionError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| ConversionError::new(FailureKind::Network, err.to_string()))?;
        Ok(Self { settings, client })
    }

    fn endpoint(&self, model: &str) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.settings.base_url.trim_end_matches('/'),
            model
        )
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<PartOut<'a>>,
}

#[derive(Debug, Serialize)]
struct PartOut<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<PartIn>,
}

#[derive(Debug, Deserialize)]
struct PartIn {
    #[serde(default)]
    text: Option<String>,
}

#[async_trait::async_trait]
impl CompletionClient for ReqwestCompletionClient {
    async fn complete(
        &self,
        api_key: &str,
        request: &CompletionRequest,
    ) -> Result<String, ConversionError> {
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![PartOut {
                    text: &request.prompt,
                }],
            }],
            generation_config: GenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_output_tokens,
            },
        };

        let response = self
            .client
            .post(self.endpoint(&request.model))
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            engine_debug!("completion endpoint returned {} ({} bytes)", status, text.len());
            return Err(classify_status(status.as_u16(), &text));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|err| ConversionError::new(FailureKind::EmptyResponse, err.to_string()))?;
        extract_text(parsed)
    }
}

fn extract_text(response: GenerateResponse) -> Result<String, ConversionError> {
    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();
    if text.trim().is_empty() {
        return Err(ConversionError::new(
            FailureKind::EmptyResponse,
            "no candidate text in response",
        ));
    }
    Ok(text)
}

/// Maps a non-success HTTP status and its body to a failure kind.
pub fn classify_status(status: u16, body: &str) -> ConversionError {
    let lower = body.to_ascii_lowercase();
    let kind = match status {
        401 | 403 => FailureKind::AuthError,
        400 if lower.contains("api key") || lower.contains("api_key") => FailureKind::AuthError,
        429 if lower.contains("quota") => FailureKind::QuotaExceeded,
        429 => FailureKind::RateLimited,
        _ => FailureKind::Network,
    };
    ConversionError::new(kind, format!("http status {status}"))
}

fn map_reqwest_error(err: reqwest::Error) -> ConversionError {
    if err.is_timeout() {
        return ConversionError::new(FailureKind::Timeout, err.to_string());
    }
    ConversionError::new(FailureKind::Network, err.to_string())
}
