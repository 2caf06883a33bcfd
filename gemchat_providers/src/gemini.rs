use async_trait::async_trait;
use gemchat_core::{ConfigurationError, GenerateFailure, TextGenerator};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_MODEL: &str = "gemini-1.5-pro";

/// Google Gemini `generateContent` client.
#[derive(Clone)]
pub struct GeminiProvider {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: [Part<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
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
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text parts of the first candidate.
    fn into_text(self) -> Option<String> {
        let parts = self.candidates.into_iter().next()?.content?.parts;
        let text: String = parts.into_iter().filter_map(|p| p.text).collect();
        (!text.is_empty()).then_some(text)
    }
}

impl GeminiProvider {
    pub fn new(api_key: String, model: Option<String>) -> Result<Self, ConfigurationError> {
        if api_key.trim().is_empty() {
            return Err(ConfigurationError::MissingApiKey("GOOGLE_API_KEY"));
        }

        let model = model.unwrap_or_else(|| DEFAULT_MODEL.to_string());
        if model.trim().is_empty() {
            return Err(ConfigurationError::InvalidValue {
                field: "provider.model",
                reason: "model name must not be empty".to_string(),
            });
        }

        let client = Client::builder()
            .user_agent(concat!("gemchat/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ConfigurationError::ClientBuild(e.to_string()))?;

        info!("Creating GeminiProvider with model {model}");
        Ok(Self {
            client,
            api_key,
            model,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self) -> String {
        let model = self.model.strip_prefix("models/").unwrap_or(&self.model);
        format!("{}/v1beta/models/{model}:generateContent", self.base_url)
    }
}

#[async_trait]
impl TextGenerator for GeminiProvider {
    async fn generate(&self, text: &str) -> Result<String, GenerateFailure> {
        let request = GenerateContentRequest {
            contents: [Content {
                role: "user",
                parts: [Part { text }],
            }],
        };

        debug!("Sending request to Gemini API: model={}", self.model);

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| GenerateFailure::Transport {
                status: e.status().map(|s| s.as_u16()),
                message: e.to_string(),
            })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(GenerateFailure::RateLimited);
        }
        if !status.is_success() {
            return Err(GenerateFailure::Transport {
                status: Some(status.as_u16()),
                message: error_body(response.text().await),
            });
        }

        let body = response
            .json::<GenerateContentResponse>()
            .await
            .map_err(|e| GenerateFailure::Other(format!("Invalid response body: {e}")))?;

        body.into_text().ok_or(GenerateFailure::InvalidPayload)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Body of a failed response, or why it could not be read.
fn error_body<E: std::fmt::Display>(body: Result<String, E>) -> String {
    body.unwrap_or_else(|e| {
        debug!("Failed to read error response body: {e}");
        format!("failed to read error body: {e}")
    })
}
