//! Seeding and cleanup against the in-memory store

use pretty_assertions::assert_eq;
use std::sync::Arc;
use testworld_core::{catalog, EntityKind, WorldId, WorldRegistry};
use testworld_fixtures::FixtureLoader;
use testworld_seed::{MissingFixturePolicy, SeedEngine, SeedError};
use testworld_store::{
    ArtifactRow, ChatRow, MemoryStore, MessagePart, MessageRow, ScopedStore, UserRow, WorldContext,
    WorldStore,
};
use testworld_test_utils::{
    chat_world, dangling_owner_world, registry_of, setup_seed_engine, single_user_world,
    PLANNING_MESSAGES,
};

#[tokio::test]
async fn one_user_two_artifacts_no_chats() {
    let (_fixtures, _store, engine) = setup_seed_engine(registry_of([single_user_world("single")]));

    let result = engine.seed(&WorldId::new("w-a"), "single").await.unwrap();

    assert_eq!(result.users.count, 1);
    assert_eq!(result.artifacts.count, 2);
    assert_eq!(result.chats.count, 0);
    assert_eq!(result.user_ids.len(), 1);
    assert_eq!(result.artifact_ids.len(), 2);
}

#[tokio::test]
async fn legacy_transcript_is_stored_as_parts() {
    let (fixtures, store, engine) = setup_seed_engine(registry_of([chat_world("chat")]));
    fixtures.world_file("chat", "chats/planning.json", PLANNING_MESSAGES);
    fixtures.world_file("chat", "artifacts/budget.csv", "item,amount\nads,100\n");

    let world = WorldId::new("w-chat");
    let result = engine.seed(&world, "chat").await.unwrap();
    assert_eq!(result.messages.count, 2);
    assert!(result.synthesized.is_empty());

    let scoped = ScopedStore::new(store, WorldContext::for_world(world));
    let mut messages: Vec<MessageRow> = scoped.select().await.unwrap();
    messages.sort_by_key(|m| m.ordinal);
    assert_eq!(messages[0].role, "user");
    assert_eq!(messages[1].parts.len(), 2);
    assert!(matches!(messages[1].parts[1], MessagePart::ToolInvocation { .. }));

    let chats: Vec<ChatRow> = scoped.select().await.unwrap();
    let users: Vec<UserRow> = scoped.select().await.unwrap();
    let owner = users.iter().find(|u| u.name == "Avery").unwrap();
    assert_eq!(chats[0].owner_id, owner.id);
}

#[tokio::test]
async fn concurrent_worlds_stay_isolated() {
    let (_fixtures, store, engine) = setup_seed_engine(registry_of([chat_world("chat")]));
    let a = WorldId::new("w-a");
    let b = WorldId::new("w-b");

    let (ra, rb) = futures::join!(engine.seed(&a, "chat"), engine.seed(&b, "chat"));
    let (ra, rb) = (ra.unwrap(), rb.unwrap());

    let scoped_a = ScopedStore::new(store.clone(), WorldContext::for_world(a.clone()));
    let artifacts: Vec<ArtifactRow> = scoped_a.select().await.unwrap();
    assert_eq!(artifacts.len(), ra.artifacts.count);
    assert!(artifacts.iter().all(|r| r.world_id.as_ref() == Some(&a)));
    assert!(artifacts.iter().all(|r| !rb.artifact_ids.contains(&r.id)));

    let production = ScopedStore::new(store, WorldContext::production());
    assert!(production.select::<UserRow>().await.unwrap().is_empty());
    assert!(production.select::<ArtifactRow>().await.unwrap().is_empty());
}

#[tokio::test]
async fn cleanup_then_cleanup_again() {
    let (_fixtures, store, engine) = setup_seed_engine(registry_of([chat_world("chat")]));
    let world = WorldId::new("w-clean");
    engine.seed(&world, "chat").await.unwrap();

    let first = engine.cleanup(&world).await.unwrap();
    assert!(first.total() > 0);
    for kind in EntityKind::CLEANUP_ORDER {
        assert_eq!(
            store
                .count(kind, &testworld_store::WorldFilter::world(world.clone()))
                .await
                .unwrap(),
            0
        );
    }

    let second = engine.cleanup(&world).await.unwrap();
    assert!(second.is_noop());
}

#[tokio::test]
async fn dangling_owner_blocks_seeding() {
    let (_fixtures, store, engine) = setup_seed_engine(registry_of([dangling_owner_world("bad")]));

    let err = engine.seed(&WorldId::new("w-bad"), "bad").await.unwrap_err();
    match err {
        SeedError::Registry(e) => assert_eq!(e.structural_errors().len(), 1),
        other => panic!("unexpected error {other}"),
    }
    assert_eq!(store.total_rows(), 0);
}

#[tokio::test]
async fn shipped_catalog_seeds_with_strict_fixtures() {
    let root = concat!(env!("CARGO_MANIFEST_DIR"), "/../../fixtures/worlds");
    let registry = Arc::new(WorldRegistry::builtin());
    let store = Arc::new(MemoryStore::new());
    let engine = SeedEngine::new(store.clone(), FixtureLoader::new(root), registry.clone())
        .with_policy(MissingFixturePolicy::Fail);

    for id in registry.ids() {
        let world = WorldId::new(format!("w-shipped-{id}"));
        let result = engine.seed(&world, id.as_str()).await.unwrap();
        assert_eq!(result.definition_id.as_str(), id.as_str());
    }

    let site = engine
        .seed(&WorldId::new("w-site-again"), catalog::SITE_BUILDER)
        .await
        .unwrap();
    assert_eq!(site.messages.count, 4);
}

#[tokio::test]
async fn strict_policy_rejects_unparseable_transcript() {
    let (fixtures, store, engine) = setup_seed_engine(registry_of([chat_world("chat")]));
    let engine = engine.with_policy(MissingFixturePolicy::Fail);
    fixtures.world_file("chat", "artifacts/budget.csv", "item,amount\n");
    fixtures.world_file("chat", "chats/planning.json", "{ not json");

    let err = engine.seed(&WorldId::new("w-strict"), "chat").await.unwrap_err();
    assert!(matches!(err, SeedError::Fixture { entity: EntityKind::Chat, .. }));
    assert_eq!(store.total_rows(), 0);
}

#[tokio::test]
async fn unusable_transcript_is_reported_as_dropped() {
    let (fixtures, _store, engine) = setup_seed_engine(registry_of([chat_world("chat")]));
    fixtures.world_file("chat", "artifacts/budget.csv", "item,amount\nads,100\n");
    fixtures.world_file(
        "chat",
        "chats/planning.json",
        r#"[{"role":"user","content":42},{"role":"assistant","parts":"oops"}]"#,
    );

    let result = engine.seed(&WorldId::new("w-dropped"), "chat").await.unwrap();
    assert_eq!(result.chats.count, 1);
    assert_eq!(result.messages.count, 0);
    assert_eq!(result.dropped_chats, vec!["chat-1".to_string()]);
    assert!(result.synthesized.is_empty());
}
