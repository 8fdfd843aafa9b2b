use crate::{ApiError, ApiResult};

use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_TOKENS: u32 = 2048;
pub const DEFAULT_TEMPERATURE: f64 = 0.7;
pub const DEFAULT_TOP_P: f64 = 1.0;
pub const MAX_TEMPERATURE: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

/// OpenAI-compatible chat completion request.
///
/// Unknown roles and mistyped fields are rejected while deserializing.
/// Ranges are checked by [`ChatCompletionRequest::validate`], which also
/// fills in the sampling defaults before the body is forwarded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    pub messages: Vec<ChatMessage>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(default)]
    pub max_tokens: Option<u32>,

    #[serde(default)]
    pub temperature: Option<f64>,

    #[serde(default)]
    pub top_p: Option<f64>,

    #[serde(default)]
    pub stream: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
}

impl ChatCompletionRequest {
    /// Check ranges and apply defaults. `max_tokens_limit` is the engine's
    /// configured context limit.
    pub fn validate(mut self, max_tokens_limit: u32) -> ApiResult<Self> {
        if self.messages.is_empty() {
            return Err(ApiError::validation(
                "messages must contain at least one message",
                "messages",
            ));
        }

        let max_tokens = self
            .max_tokens
            .unwrap_or(DEFAULT_MAX_TOKENS.min(max_tokens_limit));
        if max_tokens == 0 || max_tokens > max_tokens_limit {
            return Err(ApiError::validation(
                format!("max_tokens must be 1-{max_tokens_limit}, got {max_tokens}"),
                "max_tokens",
            ));
        }

        let temperature = self.temperature.unwrap_or(DEFAULT_TEMPERATURE);
        if !(0.0..=MAX_TEMPERATURE).contains(&temperature) {
            return Err(ApiError::validation(
                format!("temperature must be 0-{MAX_TEMPERATURE}, got {temperature}"),
                "temperature",
            ));
        }

        let top_p = self.top_p.unwrap_or(DEFAULT_TOP_P);
        if !(0.0..=1.0).contains(&top_p) {
            return Err(ApiError::validation(
                format!("top_p must be 0-1, got {top_p}"),
                "top_p",
            ));
        }

        self.max_tokens = Some(max_tokens);
        self.temperature = Some(temperature);
        self.top_p = Some(top_p);
        Ok(self)
    }
}
