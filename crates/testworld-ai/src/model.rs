//! Language-model client contract
//!
//! The minimal surface the fixture provider wraps: one-shot generation and
//! event streaming. Real provider clients implement [`LanguageModel`].

use crate::error::ModelError;
use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Token accounting reported by a provider
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl Usage {
    /// Usage with total computed from its parts
    #[must_use]
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
        }
    }
}

/// Generation request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub prompt: String,
    /// Provider settings (temperature, max tokens...), recorded verbatim
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<Value>,
}

impl GenerateRequest {
    /// Request for `prompt` without settings
    #[must_use]
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            settings: None,
        }
    }

    /// With provider settings
    #[must_use]
    pub fn with_settings(mut self, settings: Value) -> Self {
        self.settings = Some(settings);
        self
    }
}

/// Generation result
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

/// One streaming event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Incremental text
    TextDelta(String),
    /// End of stream
    Finish {
        usage: Option<Usage>,
        finish_reason: Option<String>,
    },
}

/// Stream of events from [`LanguageModel::stream`]
pub type EventStream = BoxStream<'static, Result<StreamEvent, ModelError>>;

/// Language-model client
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Provider model identifier, part of every fixture id
    fn model_id(&self) -> &str;

    /// Generate a complete response
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, ModelError>;

    /// Stream a response as text deltas followed by one finish event
    async fn stream(&self, request: &GenerateRequest) -> Result<EventStream, ModelError>;
}
