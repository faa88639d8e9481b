// tests/source_cache.rs
//
// Read path and refresh semantics of SourceCache against a temp directory.
//
// Covered:
// - memory hit returns the same snapshot without collecting again
// - a cold cache adopts the on-disk file without collecting
// - force_refresh skips memory but still adopts the file
// - refresh purges and refetches; a failed refresh keeps the old snapshot
// - purge of a missing file is fine
// - a snapshot path that cannot be purged does not block refresh
// - the written file round-trips through storage

mod common;

use std::sync::Arc;

use common::{cache_in, StubProvider};
use topic_pulse::source_cache::CacheState;
use topic_pulse::storage::SnapshotStore;
use topic_pulse::Snapshot;

#[tokio::test]
async fn second_get_is_served_from_memory() {
    let dir = tempfile::tempdir().unwrap();
    let provider = StubProvider::new("forum");
    let cache = cache_in(dir.path(), provider.clone());

    let a = cache.get(false).await.expect("first get");
    let b = cache.get(false).await.expect("second get");

    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(provider.calls(), 1);
    assert_eq!(cache.state(), CacheState::Ready);
}

#[tokio::test]
async fn fresh_fetch_is_written_to_disk() {
    let dir = tempfile::tempdir().unwrap();
    let cache = cache_in(dir.path(), StubProvider::new("forum"));

    let snap = cache.get(false).await.unwrap();
    assert!(dir.path().join("forum.json").exists());

    let on_disk = SnapshotStore::new(dir.path(), "forum")
        .load()
        .await
        .unwrap()
        .expect("file present");
    assert_eq!(on_disk, *snap);
    assert_eq!(on_disk.data[0].text, "forum says hi #0", "tags are stripped");
}

#[tokio::test]
async fn cold_start_adopts_file_without_collect() {
    let dir = tempfile::tempdir().unwrap();
    let stored = Snapshot::new(1_000, Vec::new());
    SnapshotStore::new(dir.path(), "forum")
        .replace(&stored)
        .await
        .unwrap();

    let provider = StubProvider::new("forum");
    let cache = cache_in(dir.path(), provider.clone());
    let snap = cache.get(false).await.unwrap();

    assert_eq!(snap.update_time, 1_000);
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn evicted_memory_reloads_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let provider = StubProvider::new("forum");
    let cache = cache_in(dir.path(), provider.clone());

    let first = cache.get(false).await.unwrap();
    cache.evict_memory();
    assert_eq!(cache.state(), CacheState::Empty);

    let again = cache.get(false).await.unwrap();
    assert_eq!(provider.calls(), 1);
    assert_eq!(*again, *first);
    assert!(!Arc::ptr_eq(&again, &first));
}

#[tokio::test]
async fn force_refresh_still_prefers_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let provider = StubProvider::new("forum");
    let cache = cache_in(dir.path(), provider.clone());

    let first = cache.get(false).await.unwrap();
    let forced = cache.get(true).await.unwrap();

    assert_eq!(provider.calls(), 1, "file present, so no second collect");
    assert_eq!(forced.update_time, first.update_time);
}

#[tokio::test]
async fn refresh_refetches_after_purge() {
    let dir = tempfile::tempdir().unwrap();
    let provider = StubProvider::new("forum");
    let cache = cache_in(dir.path(), provider.clone());

    cache.get(false).await.unwrap();
    let refreshed = cache.refresh().await.expect("refresh");

    assert_eq!(provider.calls(), 2);
    assert_eq!(refreshed.data[0].url, "https://forum.example/entry/1");
    assert!(Arc::ptr_eq(&refreshed, &cache.current().unwrap()));
}

#[tokio::test]
async fn failed_refresh_keeps_serving_previous_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let provider = StubProvider::new("forum");
    let cache = cache_in(dir.path(), provider.clone());

    let before = cache.get(false).await.unwrap();
    provider.set_failing(true);

    assert!(cache.refresh().await.is_err());
    let after = cache.get(false).await.unwrap();
    assert!(Arc::ptr_eq(&before, &after));
    // The purge already happened; only memory survives.
    assert!(!dir.path().join("forum.json").exists());
}

#[tokio::test]
async fn purge_without_file_is_ok() {
    let dir = tempfile::tempdir().unwrap();
    let cache = cache_in(dir.path(), StubProvider::new("forum"));
    cache.purge().await.expect("purge missing file");
    cache.purge().await.expect("purge twice");
}

#[tokio::test]
async fn refresh_fetches_even_when_purge_fails() {
    let dir = tempfile::tempdir().unwrap();
    let provider = StubProvider::new("forum");
    let cache = cache_in(dir.path(), provider.clone());

    let before = cache.get(false).await.unwrap();

    // A directory where the snapshot file should be: remove and write both fail.
    let path = dir.path().join("forum.json");
    std::fs::remove_file(&path).unwrap();
    std::fs::create_dir(&path).unwrap();

    let refreshed = cache.refresh().await.expect("refresh despite storage fault");
    assert_eq!(provider.calls(), 2);
    assert!(!Arc::ptr_eq(&before, &refreshed));
    assert_eq!(refreshed.data[0].url, "https://forum.example/entry/1");
    assert!(Arc::ptr_eq(&refreshed, &cache.current().unwrap()));
}

#[tokio::test]
async fn refresh_never_adopts_a_stale_file() {
    let dir = tempfile::tempdir().unwrap();
    let provider = StubProvider::new("forum");
    let cache = cache_in(dir.path(), provider.clone());

    let stale = Snapshot::new(1_000, Vec::new());
    SnapshotStore::new(dir.path(), "forum")
        .replace(&stale)
        .await
        .unwrap();

    let refreshed = cache.refresh().await.unwrap();
    assert_eq!(provider.calls(), 1);
    assert_ne!(refreshed.update_time, 1_000);
}

#[tokio::test]
async fn corrupt_file_falls_back_to_collect() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("forum.json"), b"{not json").unwrap();

    let provider = StubProvider::new("forum");
    let cache = cache_in(dir.path(), provider.clone());
    let snap = cache.get(false).await.unwrap();

    assert_eq!(provider.calls(), 1);
    assert_eq!(snap.len(), 1);
}

#[tokio::test]
async fn concurrent_cold_reads_collect_once() {
    let dir = tempfile::tempdir().unwrap();
    let provider = StubProvider::slow("forum", std::time::Duration::from_millis(50));
    let cache = cache_in(dir.path(), provider.clone());

    let reads = (0..8).map(|_| {
        let c = Arc::clone(&cache);
        tokio::spawn(async move { c.get(false).await })
    });
    let snaps: Vec<_> = futures::future::join_all(reads)
        .await
        .into_iter()
        .map(|r| r.unwrap().unwrap())
        .collect();

    assert_eq!(provider.calls(), 1);
    assert!(snaps.iter().all(|s| Arc::ptr_eq(s, &snaps[0])));
}
