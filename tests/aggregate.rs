// tests/aggregate.rs
//
// Fan-out over several sources.
//
// Covered:
// - result follows display order regardless of completion order
// - one failing source fails the whole aggregate and is named
// - a slow source keeps fetching after another source failed

mod common;

use std::time::Duration;

use common::{cache_in, StubProvider};
use topic_pulse::aggregate::Aggregator;

#[tokio::test]
async fn streams_follow_display_order() {
    let dir = tempfile::tempdir().unwrap();
    let caches = vec![
        cache_in(dir.path(), StubProvider::slow("alpha", Duration::from_millis(40))),
        cache_in(dir.path(), StubProvider::new("beta")),
        cache_in(dir.path(), StubProvider::new("gamma")),
    ];
    let agg = Aggregator::new(caches, &["gamma".to_string(), "nope".to_string()]);
    assert_eq!(agg.order(), ["gamma", "alpha", "beta"]);

    let out = agg.collect_all().await.expect("all sources ok");
    assert_eq!(out.names(), vec!["gamma", "alpha", "beta"]);
    assert_eq!(
        out.get("beta").unwrap().data[0].url,
        "https://beta.example/entry/0"
    );
}

#[tokio::test]
async fn one_failing_source_fails_the_aggregate() {
    let dir = tempfile::tempdir().unwrap();
    let caches = vec![
        cache_in(dir.path(), StubProvider::new("alpha")),
        cache_in(dir.path(), StubProvider::failing("beta")),
        cache_in(dir.path(), StubProvider::new("gamma")),
    ];
    let agg = Aggregator::new(caches, &[]);

    let err = agg.collect_all().await.unwrap_err();
    assert_eq!(err.source_name, "beta");
    assert!(err.to_string().contains("beta"));
}

#[tokio::test]
async fn in_flight_fetch_finishes_after_early_failure() {
    let dir = tempfile::tempdir().unwrap();
    let slow = StubProvider::slow("slow", Duration::from_millis(80));
    let slow_cache = cache_in(dir.path(), slow.clone());
    let caches = vec![
        slow_cache.clone(),
        cache_in(dir.path(), StubProvider::failing("broken")),
    ];
    let agg = Aggregator::new(caches, &[]);

    let err = agg.collect_all().await.unwrap_err();
    assert_eq!(err.source_name, "broken");
    assert!(slow_cache.current().is_none(), "slow fetch still running");

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(slow_cache.current().is_some(), "slow fetch was not cancelled");
    assert_eq!(slow.calls(), 1);

    // Next read is a memory hit for the slow source.
    assert!(agg.collect_all().await.is_err());
    assert_eq!(slow.calls(), 1);
}
