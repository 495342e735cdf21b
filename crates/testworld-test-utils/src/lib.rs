//! Testing utilities for the test worlds workspace
//!
//! Shared fixtures, sample worlds and a scripted language model.

#![allow(missing_docs)]

use async_trait::async_trait;
use futures::{stream, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use testworld_ai::{
    EventStream, GenerateRequest, GenerateResponse, LanguageModel, ModelError, StreamEvent, Usage,
};
use testworld_core::{
    ArtifactKind, WorldArtifact, WorldChat, WorldDefinition, WorldRegistry, WorldUser,
};
use testworld_fixtures::FixtureLoader;
use testworld_seed::SeedEngine;
use testworld_store::MemoryStore;

/// Temporary fixture root, removed on drop
#[derive(Debug)]
pub struct TempFixtures {
    dir: TempDir,
}

impl TempFixtures {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Write `{root}/{world}/{relative}`, creating directories
    pub fn world_file(&self, world: &str, relative: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(world).join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, content).unwrap();
        path
    }

    pub fn loader(&self) -> FixtureLoader {
        FixtureLoader::new(self.root())
    }
}

impl Default for TempFixtures {
    fn default() -> Self {
        Self::new()
    }
}

/// One user, two artifacts, no chats
pub fn single_user_world(id: &str) -> WorldDefinition {
    WorldDefinition::new(id, "Single user")
        .with_user(WorldUser::new("user-a", "Avery"))
        .with_artifact(
            WorldArtifact::new("doc-1", "Notes", ArtifactKind::Text, "user-a").with_content("artifacts/notes.md"),
        )
        .with_artifact(WorldArtifact::new("doc-2", "Script", ArtifactKind::Code, "user-a"))
}

/// World whose only artifact references an undeclared owner
pub fn dangling_owner_world(id: &str) -> WorldDefinition {
    WorldDefinition::new(id, "Dangling owner")
        .with_user(WorldUser::new("user-a", "Avery"))
        .with_artifact(WorldArtifact::new("doc-1", "Orphan", ArtifactKind::Text, "user-missing"))
}

/// Two users and a chat with a message fixture
pub fn chat_world(id: &str) -> WorldDefinition {
    WorldDefinition::new(id, "Chat")
        .with_user(WorldUser::new("user-a", "Avery"))
        .with_user(WorldUser::new("user-b", "Blake"))
        .with_artifact(
            WorldArtifact::new("sheet-1", "Budget", ArtifactKind::Sheet, "user-b").with_content("artifacts/budget.csv"),
        )
        .with_chat(WorldChat::new("chat-1", "Planning", "user-a").with_messages("chats/planning.json"))
}

/// Legacy-shaped transcript for [`chat_world`]
pub const PLANNING_MESSAGES: &str = r#"[
  {"role": "user", "content": "Plan the launch"},
  {"role": "assistant", "content": "Here is a plan.", "toolInvocations": [{"toolName": "createDocument", "args": {"title": "Launch"}}]}
]"#;

/// Registry holding `defs`
pub fn registry_of(defs: impl IntoIterator<Item = WorldDefinition>) -> Arc<WorldRegistry> {
    Arc::new(WorldRegistry::from_definitions(defs).unwrap())
}

/// Memory store, temp fixtures and a seed engine over them
pub fn setup_seed_engine(registry: Arc<WorldRegistry>) -> (TempFixtures, Arc<MemoryStore>, SeedEngine) {
    let fixtures = TempFixtures::new();
    let store = Arc::new(MemoryStore::new());
    let engine = SeedEngine::new(store.clone(), fixtures.loader(), registry).with_session(1_700_000_000_000);
    (fixtures, store, engine)
}

/// Language model returning a fixed reply and counting calls
#[derive(Debug)]
pub struct ScriptedModel {
    model_id: String,
    reply: String,
    delay: Duration,
    calls: AtomicUsize,
}

impl ScriptedModel {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            model_id: "scripted-1".to_string(),
            reply: reply.into(),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_model_id(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = model_id.into();
        self
    }

    /// Sleep before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn response(&self) -> GenerateResponse {
        GenerateResponse {
            text: self.reply.clone(),
            usage: Some(Usage::new(8, 16)),
            finish_reason: Some("stop".to_string()),
        }
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn generate(&self, _request: &GenerateRequest) -> Result<GenerateResponse, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(self.response())
    }

    async fn stream(&self, request: &GenerateRequest) -> Result<EventStream, ModelError> {
        let response = self.generate(request).await?;
        let words: Vec<Result<StreamEvent, ModelError>> = response
            .text
            .split_inclusive(' ')
            .map(|w| Ok(StreamEvent::TextDelta(w.to_string())))
            .chain(std::iter::once(Ok(StreamEvent::Finish {
                usage: response.usage,
                finish_reason: response.finish_reason,
            })))
            .collect();
        Ok(stream::iter(words).boxed())
    }
}
