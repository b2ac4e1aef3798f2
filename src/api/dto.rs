//! API request and response DTOs

use serde::{Deserialize, Serialize};

use crate::ai::{ChatMessage, VideoConfig};
use crate::data::User;

/// Sign-in form
#[derive(Debug, Clone, Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

/// Issued session token with the signed-in user
#[derive(Debug, Clone, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

/// Current session; `user` is null when signed out
#[derive(Debug, Clone, Serialize)]
pub struct SessionResponse {
    pub user: Option<User>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProgressRequest {
    pub progress: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub history: Vec<ChatMessage>,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatResponse {
    pub reply: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VideoRequest {
    pub prompt: String,
    #[serde(default)]
    pub config: VideoConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn video_request_defaults_config() {
        let request: VideoRequest =
            serde_json::from_str(r#"{"prompt":"A lecture hall at dawn"}"#).unwrap();
        assert_eq!(request.config.aspect_ratio, "16:9");
        assert_eq!(request.config.duration_seconds, None);
    }

    #[test]
    fn chat_request_history_is_optional() {
        let request: ChatRequest = serde_json::from_str(r#"{"message":"Hello"}"#).unwrap();
        assert!(request.history.is_empty());
    }
}
