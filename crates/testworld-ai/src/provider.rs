//! Record/replay decorator around a language model
//!
//! [`FixtureProvider`] exposes the same [`LanguageModel`] contract as the
//! model it wraps. The mode is fixed at construction:
//! - `Passthrough` forwards every call
//! - `Record` calls the model under a deadline and persists the result
//! - `Replay` serves recorded results and never calls the model
//!
//! Streaming replay re-chunks the recorded text into paced deltas followed
//! by a finish event carrying the recorded usage and finish reason.

use crate::error::ModelError;
use crate::fixture::{fixture_id, AIFixture, FixtureContext};
use crate::model::{EventStream, GenerateRequest, GenerateResponse, LanguageModel, StreamEvent};
use crate::store::FixtureStore;
use async_trait::async_trait;
use futures::{stream, StreamExt};
use std::sync::Arc;
use std::time::{Duration, Instant};
use testworld_core::{AiConfig, FixtureMode};

const DEFAULT_RECORD_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_CHUNK_CHARS: usize = 16;
const DEFAULT_PACING: Duration = Duration::from_millis(10);

/// Fixture-backed [`LanguageModel`] decorator
pub struct FixtureProvider {
    inner: Arc<dyn LanguageModel>,
    store: FixtureStore,
    mode: FixtureMode,
    context: FixtureContext,
    record_timeout: Duration,
    chunk_chars: usize,
    pacing: Duration,
}

impl std::fmt::Debug for FixtureProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FixtureProvider")
            .field("model", &self.inner.model_id())
            .field("mode", &self.mode)
            .field("context", &self.context)
            .field("record_timeout", &self.record_timeout)
            .finish_non_exhaustive()
    }
}

impl FixtureProvider {
    /// Wrap `inner` in `mode` with default timings and a general context
    #[must_use]
    pub fn new(inner: Arc<dyn LanguageModel>, store: FixtureStore, mode: FixtureMode) -> Self {
        Self {
            inner,
            store,
            mode,
            context: FixtureContext::general(),
            record_timeout: DEFAULT_RECORD_TIMEOUT,
            chunk_chars: DEFAULT_CHUNK_CHARS,
            pacing: DEFAULT_PACING,
        }
    }

    /// Wrap `inner` using mode and timings from configuration
    #[must_use]
    pub fn from_config(inner: Arc<dyn LanguageModel>, store: FixtureStore, config: &AiConfig) -> Self {
        Self::new(inner, store, config.mode)
            .with_record_timeout(config.record_timeout())
            .with_stream_chunking(config.stream_chunk_chars, config.stream_pacing())
    }

    /// With call-site context
    #[inline]
    #[must_use]
    pub fn with_context(mut self, context: FixtureContext) -> Self {
        self.context = context;
        self
    }

    /// With record deadline
    #[inline]
    #[must_use]
    pub fn with_record_timeout(mut self, timeout: Duration) -> Self {
        self.record_timeout = timeout;
        self
    }

    /// With replay chunk size (chars, at least 1) and pacing
    #[inline]
    #[must_use]
    pub fn with_stream_chunking(mut self, chunk_chars: usize, pacing: Duration) -> Self {
        self.chunk_chars = chunk_chars.max(1);
        self.pacing = pacing;
        self
    }

    /// Mode fixed at construction
    #[inline]
    #[must_use]
    pub fn mode(&self) -> FixtureMode {
        self.mode
    }

    /// Call-site context
    #[inline]
    #[must_use]
    pub fn context(&self) -> &FixtureContext {
        &self.context
    }

    /// Backing fixture store
    #[inline]
    #[must_use]
    pub fn store(&self) -> &FixtureStore {
        &self.store
    }

    /// Fixture id a request maps to
    #[must_use]
    pub fn fixture_id_for(&self, request: &GenerateRequest) -> String {
        fixture_id(&request.prompt, self.inner.model_id(), &self.context)
    }

    async fn replay(&self, request: &GenerateRequest) -> Result<GenerateResponse, ModelError> {
        let id = self.fixture_id_for(request);
        match self.store.get(&self.context, &id).await? {
            Some(fixture) => {
                tracing::debug!(fixture = %id, "replaying AI fixture");
                Ok(fixture.response())
            }
            None => {
                tracing::error!(fixture = %id, dir = self.context.dir(), "no recording for replayed input");
                Err(ModelError::ReplayMiss { fixture_id: id })
            }
        }
    }

    async fn record<F>(&self, request: &GenerateRequest, live: F) -> Result<GenerateResponse, ModelError>
    where
        F: std::future::Future<Output = Result<GenerateResponse, ModelError>> + Send,
    {
        let id = self.fixture_id_for(request);
        let started = Instant::now();
        let response = tokio::time::timeout(self.record_timeout, live)
            .await
            .map_err(|_| ModelError::RecordTimeout {
                fixture_id: id.clone(),
                timeout_ms: u64::try_from(self.record_timeout.as_millis()).unwrap_or(u64::MAX),
            })??;
        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        let fixture = AIFixture::record(self.inner.model_id(), &self.context, request, &response, duration_ms);
        self.store.put(&self.context, fixture).await?;
        Ok(response)
    }

    fn replay_stream(&self, response: GenerateResponse) -> EventStream {
        let pacing = self.pacing;
        let deltas = chunk_text(&response.text, self.chunk_chars)
            .into_iter()
            .map(StreamEvent::TextDelta);
        let finish = StreamEvent::Finish {
            usage: response.usage,
            finish_reason: response.finish_reason,
        };
        stream::iter(deltas.chain(std::iter::once(finish)))
            .then(move |event| async move {
                if matches!(event, StreamEvent::TextDelta(_)) && !pacing.is_zero() {
                    tokio::time::sleep(pacing).await;
                }
                Ok(event)
            })
            .boxed()
    }
}

#[async_trait]
impl LanguageModel for FixtureProvider {
    fn model_id(&self) -> &str {
        self.inner.model_id()
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, ModelError> {
        match self.mode {
            FixtureMode::Passthrough => self.inner.generate(request).await,
            FixtureMode::Replay => self.replay(request).await,
            FixtureMode::Record => self.record(request, self.inner.generate(request)).await,
        }
    }

    async fn stream(&self, request: &GenerateRequest) -> Result<EventStream, ModelError> {
        match self.mode {
            FixtureMode::Passthrough => self.inner.stream(request).await,
            FixtureMode::Replay => {
                let response = self.replay(request).await?;
                Ok(self.replay_stream(response))
            }
            FixtureMode::Record => {
                let response = self.record(request, collect_stream(self.inner.as_ref(), request)).await?;
                Ok(self.replay_stream(response))
            }
        }
    }
}

/// Wrap `model` so its calls go through fixtures under `store`
#[must_use]
pub fn wrap(
    model: Arc<dyn LanguageModel>,
    store: FixtureStore,
    mode: FixtureMode,
    context: FixtureContext,
) -> Arc<dyn LanguageModel> {
    Arc::new(FixtureProvider::new(model, store, mode).with_context(context))
}

async fn collect_stream(model: &dyn LanguageModel, request: &GenerateRequest) -> Result<GenerateResponse, ModelError> {
    let mut events = model.stream(request).await?;
    let mut response = GenerateResponse::default();
    while let Some(event) = events.next().await {
        match event? {
            StreamEvent::TextDelta(delta) => response.text.push_str(&delta),
            StreamEvent::Finish { usage, finish_reason } => {
                response.usage = usage;
                response.finish_reason = finish_reason;
            }
        }
    }
    Ok(response)
}

fn chunk_text(text: &str, chunk_chars: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(chunk_chars.max(1))
        .map(|chunk| chunk.iter().collect())
        .collect()
}
