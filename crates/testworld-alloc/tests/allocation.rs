//! Worker allocation end to end against the in-memory store

use futures::future::join_all;
use pretty_assertions::assert_eq;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use testworld_alloc::{AllocError, ProfileTable, SeedProfile, WorldAllocator};
use testworld_core::{catalog, EntityKind, WorldRegistry};
use testworld_store::{MemoryStore, WorldFilter, WorldStore};
use testworld_test_utils::{setup_seed_engine, single_user_world, TempFixtures};

fn allocator() -> (TempFixtures, Arc<MemoryStore>, WorldAllocator) {
    let (fixtures, store, engine) = setup_seed_engine(Arc::new(WorldRegistry::builtin()));
    let allocator = WorldAllocator::new(Arc::new(engine), ProfileTable::builtin()).with_session(42);
    (fixtures, store, allocator)
}

#[tokio::test]
async fn two_workers_same_test_file_get_distinct_worlds() {
    let (_fixtures, _store, allocator) = allocator();
    let file = "UC-01-create-site.spec.ts";

    let (w1, w2) = futures::join!(allocator.allocate("w1", file), allocator.allocate("w2", file));
    let (w1, w2) = (w1.unwrap(), w2.unwrap());

    assert_ne!(w1.world_id, w2.world_id);
    assert_eq!(w1.assigned_tests, vec![file.to_string()]);
    assert_eq!(w2.assigned_tests, vec![file.to_string()]);
    assert_eq!(w1.seed_type, catalog::SITE_BUILDER);
    assert!(w1.is_active);
}

#[tokio::test]
async fn many_concurrent_workers_never_share_a_world() {
    let (_fixtures, _store, allocator) = allocator();
    let workers: Vec<String> = (0..16).map(|i| format!("worker-{i}")).collect();

    let infos = join_all(workers.iter().map(|w| allocator.allocate(w, "smoke.spec.ts"))).await;
    let ids: HashSet<_> = infos.into_iter().map(|r| r.unwrap().world_id).collect();

    assert_eq!(ids.len(), workers.len());
    assert_eq!(allocator.active_worlds().len(), workers.len());
}

#[tokio::test]
async fn later_requests_append_without_reseeding() {
    let (_fixtures, store, allocator) = allocator();
    let first = allocator.allocate("w1", "UC-02-a.spec.ts").await.unwrap();
    let round_trips = store.round_trips();

    let second = allocator.allocate("w1", "UC-02-b.spec.ts").await.unwrap();
    assert_eq!(second.world_id, first.world_id);
    assert_eq!(second.assigned_tests, vec!["UC-02-a.spec.ts", "UC-02-b.spec.ts"]);
    assert_eq!(store.round_trips(), round_trips);
}

#[tokio::test]
async fn release_removes_rows_and_binding() {
    let (_fixtures, store, allocator) = allocator();
    let info = allocator.allocate("w1", "UC-02.spec.ts").await.unwrap();

    let report = allocator.release("w1").await.unwrap().unwrap();
    assert_eq!(report.total() as usize, info.seed_result.total_rows());
    assert_eq!(store.total_rows(), 0);
    assert!(allocator.world_for("w1").await.is_none());
    assert!(allocator.active_worlds().is_empty());

    assert!(allocator.release("w1").await.unwrap().is_none());
    assert!(allocator.release("never-allocated").await.unwrap().is_none());
    assert_eq!(allocator.worker_count(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_from_one_worker_share_a_world() {
    let (_fixtures, store, allocator) = allocator();
    let allocator = Arc::new(allocator);
    let files: Vec<String> = (0..8).map(|i| format!("UC-02-{i}.spec.ts")).collect();

    let handles: Vec<_> = files
        .iter()
        .cloned()
        .map(|file| {
            let allocator = Arc::clone(&allocator);
            tokio::spawn(async move { allocator.allocate("w1", &file).await })
        })
        .collect();
    let infos: Vec<_> = join_all(handles)
        .await
        .into_iter()
        .map(|r| r.unwrap().unwrap())
        .collect();

    let ids: HashSet<_> = infos.iter().map(|i| i.world_id.clone()).collect();
    assert_eq!(ids.len(), 1);
    assert_eq!(allocator.active_worlds().len(), 1);
    assert_eq!(store.total_rows(), infos[0].seed_result.total_rows());

    let snapshot = allocator.snapshot().await;
    assert_eq!(snapshot.len(), 1);
    let assigned: HashSet<_> = snapshot[0].assigned_tests.iter().cloned().collect();
    assert_eq!(assigned, files.iter().cloned().collect::<HashSet<_>>());
    assert_eq!(snapshot[0].assigned_tests.len(), files.len());
}

#[tokio::test]
async fn seed_failure_cleans_partial_world() {
    let (_fixtures, store, allocator) = allocator();
    store.inject_fault(EntityKind::Chat);

    let err = allocator.allocate("w1", "UC-02.spec.ts").await.unwrap_err();
    assert!(matches!(err, AllocError::Seed { .. }));
    assert_eq!(store.total_rows(), 0);
    assert!(allocator.active_worlds().is_empty());
    assert!(allocator.world_for("w1").await.is_none());

    // the fault fired once; the worker can retry
    assert!(allocator.allocate("w1", "UC-02.spec.ts").await.is_ok());
}

#[tokio::test]
async fn admin_profile_rejects_world_without_admin() {
    let (_fixtures, store, engine) = setup_seed_engine(Arc::new(WorldRegistry::builtin()));
    let profiles = ProfileTable::default().with_profile("admin", SeedProfile::new(catalog::SOLO_WRITER).admin());
    let allocator = WorldAllocator::new(Arc::new(engine), profiles);

    let err = allocator.allocate("w1", "admin-users.spec.ts").await.unwrap_err();
    assert!(matches!(err, AllocError::AdminRequired { .. }));
    assert_eq!(store.round_trips(), 0);
}

#[tokio::test]
async fn slow_seed_still_allocates() {
    let (_fixtures, _store, engine) = setup_seed_engine(Arc::new(WorldRegistry::builtin()));
    let profiles = ProfileTable::new(SeedProfile::new(catalog::SOLO_WRITER).with_timeout(Duration::ZERO));
    let allocator = WorldAllocator::new(Arc::new(engine), profiles);

    assert!(allocator.allocate("w1", "any.spec.ts").await.is_ok());
}

#[tokio::test]
async fn release_all_and_snapshot() {
    let (_fixtures, store, engine) = setup_seed_engine(Arc::new(
        WorldRegistry::from_definitions([single_user_world("single")]).unwrap(),
    ));
    let allocator = WorldAllocator::new(Arc::new(engine), ProfileTable::new(SeedProfile::new("single")));

    allocator.allocate("b", "x.spec.ts").await.unwrap();
    allocator.allocate("a", "y.spec.ts").await.unwrap();
    let snapshot = allocator.snapshot().await;
    assert_eq!(
        snapshot.iter().map(|i| i.worker_id.as_str()).collect::<Vec<_>>(),
        vec!["a", "b"]
    );

    assert_eq!(allocator.release_all().await.unwrap(), 2);
    assert!(allocator.snapshot().await.is_empty());
    let left = store
        .count(EntityKind::User, &WorldFilter::world(snapshot[0].world_id.clone()))
        .await
        .unwrap();
    assert_eq!(left, 0);
}

#[tokio::test]
async fn release_all_counts_only_bound_workers() {
    let (_fixtures, store, engine) = setup_seed_engine(Arc::new(
        WorldRegistry::from_definitions([single_user_world("kept").without_auto_cleanup()]).unwrap(),
    ));
    let allocator = WorldAllocator::new(Arc::new(engine), ProfileTable::new(SeedProfile::new("kept")));

    allocator.allocate("a", "x.spec.ts").await.unwrap();
    allocator.allocate("b", "y.spec.ts").await.unwrap();
    allocator.allocate("c", "z.spec.ts").await.unwrap();
    assert!(allocator.release("c").await.unwrap().is_none());
    assert!(allocator.world_for("c").await.is_none());
    assert_eq!(allocator.worker_count(), 2);

    // rows survive, but both remaining bindings are released
    assert_eq!(allocator.release_all().await.unwrap(), 2);
    assert_eq!(allocator.worker_count(), 0);
    assert!(allocator.active_worlds().is_empty());
    assert!(store.total_rows() > 0);

    assert_eq!(allocator.release_all().await.unwrap(), 0);
}
