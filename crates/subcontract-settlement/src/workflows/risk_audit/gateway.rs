use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::NarrationConfig;

#[derive(Debug, thiserror::Error)]
pub enum NarrationError {
    #[error("narration is disabled: no API key configured")]
    Disabled,
    #[error("failed to serialize audit snapshot: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("narration request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("narration endpoint returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("narration endpoint returned no text")]
    EmptyResponse,
}

/// Outbound text-generation hook used by the risk audit.
#[async_trait]
pub trait NarrationGateway: Debug + Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, NarrationError>;
}

/// Stand-in used when no API key is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledNarration;

#[async_trait]
impl NarrationGateway for DisabledNarration {
    async fn generate(&self, _prompt: &str) -> Result<String, NarrationError> {
        Err(NarrationError::Disabled)
    }
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateContentResponse {
    fn into_text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        let text: String = content
            .parts
            .into_iter()
            .filter_map(|part| part.text)
            .collect();

        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

/// HTTP client for a `generateContent`-style text-generation endpoint.
#[derive(Clone)]
pub struct GenerativeTextClient {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl GenerativeTextClient {
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, NarrationError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
            model: model.into(),
            api_key: api_key.into(),
        })
    }

    fn url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.endpoint.trim_end_matches('/'),
            self.model
        )
    }
}

impl Debug for GenerativeTextClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerativeTextClient")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl NarrationGateway for GenerativeTextClient {
    async fn generate(&self, prompt: &str) -> Result<String, NarrationError> {
        let request = GenerateContentRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: prompt }],
            }],
        };

        let response = self
            .http
            .post(self.url())
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(NarrationError::Status { status, body });
        }

        let payload: GenerateContentResponse = response.json().await?;
        payload.into_text().ok_or(NarrationError::EmptyResponse)
    }
}

/// Pick the gateway for the configured narration settings.
pub fn gateway_from_config(
    config: &NarrationConfig,
) -> Result<Box<dyn NarrationGateway>, NarrationError> {
    match &config.api_key {
        Some(api_key) => Ok(Box::new(GenerativeTextClient::new(
            config.endpoint.clone(),
            config.model.clone(),
            api_key.clone(),
            Duration::from_secs(config.timeout_secs),
        )?)),
        None => Ok(Box::new(DisabledNarration)),
    }
}
