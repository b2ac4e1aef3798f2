//! Generative model API client
//!
//! Chat via `generateContent`, video generation via `predictLongRunning`
//! plus operation polling.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config::AiConfig;
use crate::error::AppError;

/// Speaker of a chat turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Model,
}

/// One turn of chat history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub text: String,
}

/// Video generation options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoConfig {
    #[serde(default = "default_aspect_ratio")]
    pub aspect_ratio: String,
    #[serde(default)]
    pub duration_seconds: Option<u32>,
}

fn default_aspect_ratio() -> String {
    "16:9".to_string()
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            aspect_ratio: default_aspect_ratio(),
            duration_seconds: None,
        }
    }
}

/// State of a long-running generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationStatus {
    Running,
    Done { video_uri: String },
    Failed { message: String },
}

/// Start and poll long-running video operations
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VideoOperations: Send + Sync {
    /// Returns the operation name to poll
    async fn start_operation(&self, prompt: &str, config: &VideoConfig)
    -> Result<String, AppError>;

    async fn poll_operation(&self, name: &str) -> Result<OperationStatus, AppError>;
}

/// Client for the Gemini REST API
#[derive(Clone)]
pub struct GeminiClient {
    http_client: Arc<reqwest::Client>,
    base_url: String,
    api_key: String,
    chat_model: String,
    video_model: String,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Operation {
    name: Option<String>,
    #[serde(default)]
    done: bool,
    error: Option<OperationError>,
    response: Option<OperationResponse>,
}

#[derive(Debug, Deserialize)]
struct OperationError {
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OperationResponse {
    generate_video_response: Option<GenerateVideoResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateVideoResponse {
    #[serde(default)]
    generated_samples: Vec<GeneratedSample>,
}

#[derive(Debug, Deserialize)]
struct GeneratedSample {
    video: Option<GeneratedVideo>,
}

#[derive(Debug, Deserialize)]
struct GeneratedVideo {
    uri: Option<String>,
}

impl Operation {
    fn status(self) -> OperationStatus {
        if let Some(error) = self.error {
            return OperationStatus::Failed {
                message: error.message,
            };
        }
        if !self.done {
            return OperationStatus::Running;
        }

        let uri = self
            .response
            .and_then(|response| response.generate_video_response)
            .and_then(|response| response.generated_samples.into_iter().next())
            .and_then(|sample| sample.video)
            .and_then(|video| video.uri);
        match uri {
            Some(video_uri) => OperationStatus::Done { video_uri },
            None => OperationStatus::Failed {
                message: "operation finished without a video".to_string(),
            },
        }
    }
}

fn chat_request_body(history: &[ChatMessage], message: &str) -> serde_json::Value {
    let mut contents: Vec<serde_json::Value> = history
        .iter()
        .map(|turn| json!({ "role": turn.role, "parts": [{ "text": turn.text }] }))
        .collect();
    contents.push(json!({ "role": ChatRole::User, "parts": [{ "text": message }] }));
    json!({ "contents": contents })
}

fn reply_text(response: GenerateContentResponse) -> Option<String> {
    let text: String = response
        .candidates
        .into_iter()
        .next()?
        .content?
        .parts
        .into_iter()
        .filter_map(|part| part.text)
        .collect();
    (!text.trim().is_empty()).then_some(text)
}

impl GeminiClient {
    /// Returns None when no API key is configured
    pub fn from_config(config: &AiConfig, http_client: Arc<reqwest::Client>) -> Option<Self> {
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())?;

        Some(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            chat_model: config.chat_model.clone(),
            video_model: config.video_model.clone(),
        })
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, AppError> {
        let response = request.header("x-goog-api-key", &self.api_key).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(%status, body = %body, "Generative model API request failed");
            return Err(AppError::Upstream(format!("model API returned HTTP {status}")));
        }
        Ok(response)
    }

    /// Answer `message` given the earlier turns
    pub async fn chat(&self, history: &[ChatMessage], message: &str) -> Result<String, AppError> {
        if message.trim().is_empty() {
            return Err(AppError::Validation("message is required".to_string()));
        }

        let url = format!(
            "{}/models/{}:generateContent",
            self.base_url, self.chat_model
        );
        let response = self
            .send(
                self.http_client
                    .post(&url)
                    .json(&chat_request_body(history, message)),
            )
            .await?;

        let body: GenerateContentResponse = response.json().await?;
        reply_text(body).ok_or_else(|| AppError::Upstream("model returned no text".to_string()))
    }
}

#[async_trait]
impl VideoOperations for GeminiClient {
    async fn start_operation(
        &self,
        prompt: &str,
        config: &VideoConfig,
    ) -> Result<String, AppError> {
        let url = format!(
            "{}/models/{}:predictLongRunning",
            self.base_url, self.video_model
        );
        let mut parameters = json!({ "aspectRatio": config.aspect_ratio });
        if let Some(seconds) = config.duration_seconds {
            parameters["durationSeconds"] = json!(seconds);
        }
        let body = json!({
            "instances": [{ "prompt": prompt }],
            "parameters": parameters,
        });

        let response = self.send(self.http_client.post(&url).json(&body)).await?;
        let operation: Operation = response.json().await?;
        operation
            .name
            .ok_or_else(|| AppError::Upstream("operation has no name".to_string()))
    }

    async fn poll_operation(&self, name: &str) -> Result<OperationStatus, AppError> {
        let url = format!("{}/{}", self.base_url, name.trim_start_matches('/'));
        let response = self.send(self.http_client.get(&url)).await?;
        let operation: Operation = response.json().await?;
        Ok(operation.status())
    }
}
