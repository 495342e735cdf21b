//! File-backed fixture store with an in-process cache

use crate::error::ModelError;
use crate::fixture::{AIFixture, FixtureContext};
use moka::future::Cache;
use std::path::Path;
use std::sync::Arc;
use testworld_core::AiConfig;
use testworld_fixtures::FixtureLoader;

/// Reads and writes [`AIFixture`] files under `{root}/ai/...`
#[derive(Debug, Clone)]
pub struct FixtureStore {
    loader: FixtureLoader,
    cache: Cache<String, Arc<AIFixture>>,
}

impl FixtureStore {
    /// Store rooted at `root` caching up to `capacity` fixtures
    #[must_use]
    pub fn new(root: impl AsRef<Path>, capacity: u64) -> Self {
        Self {
            loader: FixtureLoader::new(root.as_ref()),
            cache: Cache::new(capacity),
        }
    }

    /// Store at the configured root and cache capacity
    #[must_use]
    pub fn from_config(config: &AiConfig) -> Self {
        Self::new(&config.fixtures_root, config.cache_capacity)
    }

    /// Fixture root
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        self.loader.root()
    }

    /// Look up fixture `id` recorded under `context`
    ///
    /// # Errors
    /// - `ModelError::Fixture` on read failures other than not-found
    /// - `ModelError::Corrupt` if the file is not a fixture
    pub async fn get(&self, context: &FixtureContext, id: &str) -> Result<Option<Arc<AIFixture>>, ModelError> {
        if let Some(hit) = self.cache.get(id).await {
            return Ok(Some(hit));
        }

        let relative = context.relative_path(id);
        let Some(text) = self.loader.read_text(&relative).await? else {
            return Ok(None);
        };
        let fixture: AIFixture = serde_json::from_str(&text).map_err(|e| ModelError::Corrupt {
            path: relative.clone(),
            message: e.to_string(),
        })?;
        if fixture.id != id {
            return Err(ModelError::Corrupt {
                path: relative,
                message: format!("file holds fixture '{}'", fixture.id),
            });
        }
        if !fixture.content_intact() {
            tracing::warn!(fixture = id, path = %relative, "fixture content does not match its hash");
        }

        let fixture = Arc::new(fixture);
        self.cache.insert(id.to_string(), Arc::clone(&fixture)).await;
        Ok(Some(fixture))
    }

    /// Persist a fixture, replacing any earlier recording
    ///
    /// # Errors
    /// - `ModelError::Fixture` if the file cannot be written
    pub async fn put(&self, context: &FixtureContext, fixture: AIFixture) -> Result<Arc<AIFixture>, ModelError> {
        let relative = context.relative_path(&fixture.id);
        let text = serde_json::to_string_pretty(&fixture).map_err(|e| ModelError::Corrupt {
            path: relative.clone(),
            message: e.to_string(),
        })?;
        let path = self.loader.write_text(&relative, &text).await?;
        tracing::info!(fixture = %fixture.id, path = %path.display(), "recorded AI fixture");

        let fixture = Arc::new(fixture);
        self.cache.insert(fixture.id.clone(), Arc::clone(&fixture)).await;
        Ok(fixture)
    }

    /// Drop every cached fixture
    pub fn clear_cache(&self) {
        self.cache.invalidate_all();
    }

    /// Whether fixture `id` is cached
    pub async fn is_cached(&self, id: &str) -> bool {
        self.cache.get(id).await.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GenerateRequest, GenerateResponse};

    fn sample(context: &FixtureContext) -> AIFixture {
        AIFixture::record(
            "model-a",
            context,
            &GenerateRequest::new("Summarize the brief"),
            &GenerateResponse {
                text: "A short summary.".into(),
                ..GenerateResponse::default()
            },
            5,
        )
    }

    #[tokio::test]
    async fn put_then_get_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = FixtureContext::general().with_use_case("UC-02");
        let fixture = sample(&ctx);
        let id = fixture.id.clone();

        let writer = FixtureStore::new(dir.path(), 16);
        writer.put(&ctx, fixture.clone()).await.unwrap();
        assert!(dir.path().join("ai/UC-02").join(format!("{id}.json")).exists());

        let reader = FixtureStore::new(dir.path(), 16);
        assert!(!reader.is_cached(&id).await);
        let loaded = reader.get(&ctx, &id).await.unwrap().unwrap();
        assert_eq!(*loaded, fixture);
        assert!(reader.is_cached(&id).await);
    }

    #[tokio::test]
    async fn unknown_id_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FixtureStore::new(dir.path(), 16);
        assert!(store.get(&FixtureContext::general(), "nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn clear_cache_forces_reread() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = FixtureContext::general();
        let store = FixtureStore::new(dir.path(), 16);
        let fixture = store.put(&ctx, sample(&ctx)).await.unwrap();

        std::fs::remove_file(dir.path().join(ctx.relative_path(&fixture.id))).unwrap();
        assert!(store.get(&ctx, &fixture.id).await.unwrap().is_some());

        store.clear_cache();
        assert!(store.get(&ctx, &fixture.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn garbage_file_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let ai = dir.path().join("ai/general");
        std::fs::create_dir_all(&ai).unwrap();
        std::fs::write(ai.join("bad.json"), "not json").unwrap();

        let store = FixtureStore::new(dir.path(), 16);
        let err = store.get(&FixtureContext::general(), "bad").await.unwrap_err();
        assert!(matches!(err, ModelError::Corrupt { .. }));
    }
}
