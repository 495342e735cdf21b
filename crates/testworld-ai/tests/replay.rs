//! Record/replay through the public provider surface

use futures::StreamExt;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;
use testworld_ai::{
    fixture_id, wrap, AIFixture, FixtureContext, FixtureMode, FixtureProvider, FixtureStore,
    GenerateRequest, LanguageModel, ModelError, StreamEvent,
};
use testworld_test_utils::{ScriptedModel, TempFixtures};

#[tokio::test]
async fn unrecorded_prompt_misses_with_its_fixture_id() {
    let fixtures = TempFixtures::new();
    let model = Arc::new(ScriptedModel::new("unused"));
    let context = FixtureContext::general().with_use_case("UC-01");
    let replay = wrap(
        model.clone(),
        FixtureStore::new(fixtures.root(), 100),
        FixtureMode::Replay,
        context.clone(),
    );

    let err = replay
        .generate(&GenerateRequest::new("Create onboarding site for Alex"))
        .await
        .unwrap_err();

    let expected = fixture_id("Create onboarding site for Alex", "scripted-1", &context);
    match err {
        ModelError::ReplayMiss { fixture_id } => assert_eq!(fixture_id, expected),
        other => panic!("unexpected error {other}"),
    }
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn record_then_replay_is_byte_identical() {
    let fixtures = TempFixtures::new();
    let store = FixtureStore::new(fixtures.root(), 100);
    let context = FixtureContext::general().with_world("w-1-0-abcd");
    let request = GenerateRequest::new("Outline a post about  tide pools");

    let live = Arc::new(ScriptedModel::new("1. Intro\n2. Creatures\n3. Safety"));
    let recorded = wrap(live.clone(), store.clone(), FixtureMode::Record, context.clone())
        .generate(&request)
        .await
        .unwrap();

    // a fresh store reads the file, not the cache
    let replay = wrap(
        Arc::new(ScriptedModel::new("different")),
        FixtureStore::new(fixtures.root(), 100),
        FixtureMode::Replay,
        context.clone(),
    );
    for _ in 0..3 {
        let replayed = replay.generate(&request).await.unwrap();
        assert_eq!(replayed.text.as_bytes(), recorded.text.as_bytes());
        assert_eq!(replayed.usage, recorded.usage);
    }
    assert_eq!(live.calls(), 1);

    let id = fixture_id(&request.prompt, "scripted-1", &context);
    let path = fixtures.root().join(context.relative_path(&id));
    let saved: AIFixture = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(saved.id, id);
    assert_eq!(saved.input.prompt, "Outline a post about tide pools");
    assert_eq!(saved.world_id.as_ref().map(|w| w.as_str()), Some("w-1-0-abcd"));
}

#[tokio::test(start_paused = true)]
async fn slow_model_times_out_while_recording() {
    let fixtures = TempFixtures::new();
    let model = Arc::new(ScriptedModel::new("late").with_delay(Duration::from_secs(5)));
    let provider = FixtureProvider::new(model, FixtureStore::new(fixtures.root(), 10), FixtureMode::Record)
        .with_record_timeout(Duration::from_secs(1));
    let request = GenerateRequest::new("slow prompt");

    let err = provider.generate(&request).await.unwrap_err();
    assert!(matches!(err, ModelError::RecordTimeout { timeout_ms: 1000, .. }));
    assert_eq!(err.fixture_id(), Some(provider.fixture_id_for(&request).as_str()));
}

#[tokio::test]
async fn replayed_stream_reassembles_recording() {
    let fixtures = TempFixtures::new();
    let store = FixtureStore::new(fixtures.root(), 100);
    let request = GenerateRequest::new("Write a tagline");
    let live: Arc<dyn LanguageModel> = Arc::new(ScriptedModel::new("Build sites at the speed of thought"));

    let recorder = FixtureProvider::new(live.clone(), store.clone(), FixtureMode::Record)
        .with_stream_chunking(5, Duration::ZERO);
    let _ = recorder.stream(&request).await.unwrap().count().await;

    let replayer = FixtureProvider::new(live, store, FixtureMode::Replay).with_stream_chunking(5, Duration::ZERO);
    let mut text = String::new();
    let mut finished = false;
    let mut events = replayer.stream(&request).await.unwrap();
    while let Some(event) = events.next().await {
        match event.unwrap() {
            StreamEvent::TextDelta(delta) => {
                assert!(!finished);
                assert!(delta.chars().count() <= 5);
                text.push_str(&delta);
            }
            StreamEvent::Finish { finish_reason, .. } => {
                assert_eq!(finish_reason.as_deref(), Some("stop"));
                finished = true;
            }
        }
    }
    assert!(finished);
    assert_eq!(text, "Build sites at the speed of thought");
}
