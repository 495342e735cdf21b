//! Recorded AI fixtures and their content-addressed ids
//!
//! A fixture id is a blake3 hash over the normalized prompt, the model id
//! and the serialized [`FixtureContext`]. The same input always maps to the
//! same id, across processes and machines.

use crate::model::{GenerateRequest, GenerateResponse, Usage};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use testworld_core::WorldId;

const ID_BYTES: usize = 16;
const NAME_CHARS: usize = 48;
const GENERAL_DIR: &str = "general";

/// Call-site context folded into the fixture id
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixtureContext {
    pub use_case_id: Option<String>,
    pub world_id: Option<WorldId>,
    pub fixture_prefix: Option<String>,
}

impl FixtureContext {
    /// Context with no use case, world or prefix
    #[inline]
    #[must_use]
    pub fn general() -> Self {
        Self::default()
    }

    /// With use case id
    #[must_use]
    pub fn with_use_case(mut self, use_case: impl Into<String>) -> Self {
        self.use_case_id = Some(use_case.into());
        self
    }

    /// With world id
    #[must_use]
    pub fn with_world(mut self, world: impl Into<WorldId>) -> Self {
        self.world_id = Some(world.into());
        self
    }

    /// With fixture name prefix
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.fixture_prefix = Some(prefix.into());
        self
    }

    /// Directory under `ai/` holding this context's fixtures
    #[must_use]
    pub fn dir(&self) -> &str {
        self.use_case_id
            .as_deref()
            .or(self.world_id.as_ref().map(WorldId::as_str))
            .unwrap_or(GENERAL_DIR)
    }

    /// Root-relative path of the fixture `id`
    #[must_use]
    pub fn relative_path(&self, id: &str) -> String {
        format!("ai/{}/{id}.json", self.dir())
    }
}

/// Trim and collapse whitespace runs to one space
#[must_use]
pub fn normalize_prompt(prompt: &str) -> String {
    prompt.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Stable fixture id for `(prompt, model, context)`
#[must_use]
pub fn fixture_id(prompt: &str, model: &str, context: &FixtureContext) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(normalize_prompt(prompt).as_bytes());
    hasher.update(&[0]);
    hasher.update(model.as_bytes());
    hasher.update(&[0]);
    // Field order is fixed by the struct, so the encoding is stable
    let context = serde_json::to_vec(context).unwrap_or_default();
    hasher.update(&context);
    hex::encode(&hasher.finalize().as_bytes()[..ID_BYTES])
}

/// Recorded input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixtureInput {
    pub prompt: String,
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<FixtureContext>,
}

/// Recorded output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixtureOutput {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
    pub timestamp: DateTime<Utc>,
    /// Live call duration in milliseconds
    pub duration: u64,
}

/// Bookkeeping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixtureMetadata {
    pub created_at: DateTime<Utc>,
    /// blake3 hex of `output.content`
    pub hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

/// One recorded model call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AIFixture {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_case_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub world_id: Option<WorldId>,
    pub input: FixtureInput,
    pub output: FixtureOutput,
    pub metadata: FixtureMetadata,
}

impl AIFixture {
    /// Build a fixture from a completed live call
    #[must_use]
    pub fn record(
        model: &str,
        context: &FixtureContext,
        request: &GenerateRequest,
        response: &GenerateResponse,
        duration_ms: u64,
    ) -> Self {
        let now = Utc::now();
        let id = fixture_id(&request.prompt, model, context);
        Self {
            name: fixture_name(context.fixture_prefix.as_deref(), &request.prompt),
            use_case_id: context.use_case_id.clone(),
            world_id: context.world_id.clone(),
            input: FixtureInput {
                prompt: normalize_prompt(&request.prompt),
                model: model.to_string(),
                settings: request.settings.clone(),
                context: Some(context.clone()),
            },
            output: FixtureOutput {
                content: response.text.clone(),
                usage: response.usage,
                finish_reason: response.finish_reason.clone(),
                timestamp: now,
                duration: duration_ms,
            },
            metadata: FixtureMetadata {
                created_at: now,
                hash: blake3::hash(response.text.as_bytes()).to_hex().to_string(),
                tags: None,
            },
            id,
        }
    }

    /// Recorded result in the caller-visible shape
    #[must_use]
    pub fn response(&self) -> GenerateResponse {
        GenerateResponse {
            text: self.output.content.clone(),
            usage: self.output.usage,
            finish_reason: self.output.finish_reason.clone(),
        }
    }

    /// Whether `metadata.hash` matches `output.content`
    #[must_use]
    pub fn content_intact(&self) -> bool {
        blake3::hash(self.output.content.as_bytes()).to_hex().as_str() == self.metadata.hash
    }
}

fn fixture_name(prefix: Option<&str>, prompt: &str) -> String {
    let slug: String = normalize_prompt(prompt)
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .take(NAME_CHARS)
        .collect();
    let slug = slug.trim_matches('-');
    match prefix {
        Some(prefix) => format!("{prefix}-{slug}"),
        None => slug.to_string(),
    }
}
