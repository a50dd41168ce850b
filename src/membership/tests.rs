//! Membership Module Tests
//!
//! ## Test Scopes
//! - **Snapshot Building**: uid/position invariant, malformed roster rejection.
//! - **Sources**: file and HTTP adapters, including retries against an in-process registry.
//! - **Refresh**: publish on new generation, stale and failed refreshes keep the old snapshot.
//! - **Concurrency**: readers never observe a generation going backwards; refreshes never overlap.
//! - **Scheduler**: periodic ticks, cancellation between ticks.

#[cfg(test)]
mod tests {
    use crate::membership::scheduler::RefreshScheduler;
    use crate::membership::source::{
        FileRegistrySource, HttpRegistrySource, RegistrySource, StaticRegistrySource, from_location,
    };
    use crate::membership::store::{MembershipStore, RefreshError, build_snapshot};
    use crate::membership::types::{NeuronInfo, ReputationMetric, Roster, WorkerId};
    use anyhow::Result;
    use async_trait::async_trait;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::{Json, Router};
    use std::net::SocketAddr;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    fn neuron(uid: u16) -> NeuronInfo {
        NeuronInfo {
            uid,
            ip: format!("10.0.0.{}", uid % 250 + 1),
            port: 8091,
            is_serving: true,
            validator_permit: false,
            stake: 10.0,
            emission: uid as f64,
            incentive: 0.5,
            coldkey: format!("cold-{}", uid),
            hotkey: format!("hot-{}", uid),
        }
    }

    fn roster(block: u64, size: u16) -> Roster {
        Roster {
            block,
            neurons: (0..size).map(neuron).collect(),
        }
    }

    /// Source whose generation advances on every fetch, with an optional delay
    /// and a flag that records overlapping fetches.
    struct CountingSource {
        block: AtomicU64,
        fetches: AtomicUsize,
        in_flight: AtomicBool,
        overlapped: AtomicBool,
        delay: Duration,
        fail: AtomicBool,
    }

    impl CountingSource {
        fn new(delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                block: AtomicU64::new(100),
                fetches: AtomicUsize::new(0),
                in_flight: AtomicBool::new(false),
                overlapped: AtomicBool::new(false),
                delay,
                fail: AtomicBool::new(false),
            })
        }
    }

    #[async_trait]
    impl RegistrySource for CountingSource {
        async fn fetch_roster(&self) -> Result<Roster> {
            if self.in_flight.swap(true, Ordering::SeqCst) {
                self.overlapped.store(true, Ordering::SeqCst);
            }
            self.fetches.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.in_flight.store(false, Ordering::SeqCst);

            if self.fail.load(Ordering::SeqCst) {
                return Err(anyhow::anyhow!("registry unreachable"));
            }

            let block = self.block.fetch_add(1, Ordering::SeqCst);
            Ok(roster(block, 4))
        }

        fn describe(&self) -> String {
            "counting source".to_string()
        }
    }

    // ============================================================
    // SNAPSHOT BUILDING
    // ============================================================

    #[test]
    fn test_snapshot_positions_match_ids() {
        let mut raw = roster(7, 5);
        raw.neurons.reverse();

        let snapshot = build_snapshot(raw).expect("valid roster");

        assert_eq!(snapshot.generation, 7);
        assert_eq!(snapshot.len(), 5);
        for (i, worker) in snapshot.workers.iter().enumerate() {
            assert_eq!(worker.id, WorkerId(i as u16));
        }
        assert_eq!(snapshot.get(WorkerId(3)).unwrap().hotkey, "hot-3");
        assert!(snapshot.get(WorkerId(5)).is_none());
    }

    #[test]
    fn test_snapshot_rejects_duplicate_uid() {
        let mut raw = roster(1, 3);
        raw.neurons.push(neuron(1));

        let result = build_snapshot(raw);

        assert!(matches!(result, Err(RefreshError::MalformedRoster(_))));
    }

    #[test]
    fn test_snapshot_rejects_gap_in_uids() {
        let raw = Roster {
            block: 1,
            neurons: vec![neuron(0), neuron(2)],
        };

        assert!(matches!(build_snapshot(raw), Err(RefreshError::MalformedRoster(_))));
    }

    #[test]
    fn test_invalid_ip_marks_worker_idle() {
        let mut raw = roster(1, 2);
        raw.neurons[1].ip = "not-an-ip".to_string();

        let snapshot = build_snapshot(raw).unwrap();

        assert!(snapshot.workers[0].is_serving);
        assert!(!snapshot.workers[1].is_serving);
        assert_eq!(snapshot.serving_count(), 1);
    }

    #[test]
    fn test_reputation_score_by_metric() {
        let snapshot = build_snapshot(roster(1, 3)).unwrap();
        let worker = &snapshot.workers[2];

        assert_eq!(worker.reputation.score(ReputationMetric::Stake), 10.0);
        assert_eq!(worker.reputation.score(ReputationMetric::Emission), 2.0);
        assert_eq!(worker.reputation.score(ReputationMetric::Incentive), 0.5);
    }

    #[test]
    fn test_roster_json_defaults() {
        let json = r#"{
            "block": 12,
            "neurons": [
                {"uid": 0, "ip": "127.0.0.1", "port": 9000, "is_serving": true,
                 "coldkey": "c0", "hotkey": "h0"}
            ]
        }"#;

        let raw: Roster = serde_json::from_str(json).expect("roster should parse");
        let snapshot = build_snapshot(raw).unwrap();

        assert_eq!(snapshot.workers[0].endpoint, "127.0.0.1:9000".parse().unwrap());
        assert!(!snapshot.workers[0].validator_permit);
        assert_eq!(snapshot.workers[0].reputation.stake, 0.0);
    }

    // ============================================================
    // SOURCES
    // ============================================================

    #[tokio::test]
    async fn test_file_source_reads_roster() {
        let path = std::env::temp_dir().join(format!("roster-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(&path, serde_json::to_vec(&roster(77, 2)).unwrap()).unwrap();

        let source = FileRegistrySource::new(&path);
        let fetched = source.fetch_roster().await.unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(fetched.block, 77);
        assert_eq!(fetched.neurons.len(), 2);
    }

    #[tokio::test]
    async fn test_file_source_missing_file_is_error() {
        let source = from_location("/nonexistent/roster.json", 32).unwrap();

        assert!(source.fetch_roster().await.is_err());
        assert_eq!(source.describe(), "/nonexistent/roster.json");
    }

    #[test]
    fn test_http_location_selects_http_source() {
        let source = from_location("http://registry.local:9000/", 32).unwrap();

        assert_eq!(source.describe(), "http://registry.local:9000/roster/32");
    }

    async fn serve(app: Router) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        addr
    }

    /// Registry whose `/roster/32` fails with `status` for the first `failures` hits.
    async fn flaky_registry(
        failures: usize,
        status: StatusCode,
    ) -> (SocketAddr, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let app = Router::new().route(
            "/roster/32",
            get(move || {
                let counter = counter.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) < failures {
                        Err(status)
                    } else {
                        Ok(Json(roster(55, 3)))
                    }
                }
            }),
        );
        (serve(app).await, hits)
    }

    #[tokio::test]
    async fn test_http_source_fetches_roster_for_netuid() {
        let (addr, hits) = flaky_registry(0, StatusCode::OK).await;
        let source = HttpRegistrySource::new(&format!("http://{}/", addr), 32).unwrap();

        let fetched = source.fetch_roster().await.unwrap();

        assert_eq!(fetched.block, 55);
        assert_eq!(fetched.neurons.len(), 3);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_http_source_retries_server_errors() {
        let (addr, hits) = flaky_registry(2, StatusCode::SERVICE_UNAVAILABLE).await;
        let source = HttpRegistrySource::new(&format!("http://{}", addr), 32).unwrap();

        let fetched = source.fetch_roster().await.unwrap();

        assert_eq!(fetched.block, 55);
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_http_source_gives_up_after_three_server_errors() {
        let (addr, hits) = flaky_registry(usize::MAX, StatusCode::INTERNAL_SERVER_ERROR).await;
        let source = HttpRegistrySource::new(&format!("http://{}", addr), 32).unwrap();

        let error = source.fetch_roster().await.unwrap_err();

        assert_eq!(hits.load(Ordering::SeqCst), 3);
        assert!(format!("{:#}", error).contains("500"), "unexpected error: {:#}", error);
    }

    #[tokio::test]
    async fn test_http_source_does_not_retry_client_errors() {
        let (addr, hits) = flaky_registry(usize::MAX, StatusCode::NOT_FOUND).await;
        let source = HttpRegistrySource::new(&format!("http://{}", addr), 32).unwrap();

        let error = source.fetch_roster().await.unwrap_err();

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(error.to_string().contains("404"), "unexpected error: {}", error);
    }

    #[tokio::test]
    async fn test_http_source_unreachable_registry_is_error() {
        let addr = {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap()
        };
        let source = HttpRegistrySource::new(&format!("http://{}", addr), 32).unwrap();

        let error = source.fetch_roster().await.unwrap_err();

        assert!(
            error.to_string().contains("after 3 attempts"),
            "unexpected error: {}",
            error
        );
    }

    // ============================================================
    // REFRESH
    // ============================================================

    #[tokio::test]
    async fn test_bootstrap_loads_initial_snapshot() {
        let source = StaticRegistrySource::new(roster(10, 3));

        let store = MembershipStore::bootstrap(Arc::new(source)).await.unwrap();

        assert_eq!(store.generation(), 10);
        assert_eq!(store.snapshot().len(), 3);
    }

    #[tokio::test]
    async fn test_bootstrap_fails_when_source_fails() {
        let source = CountingSource::new(Duration::ZERO);
        source.fail.store(true, Ordering::SeqCst);

        let result = MembershipStore::bootstrap(source).await;

        assert!(matches!(result, Err(RefreshError::Source(_))));
    }

    #[tokio::test]
    async fn test_refresh_publishes_new_generation() {
        let source = StaticRegistrySource::new(roster(10, 3));
        let store = MembershipStore::bootstrap(Arc::new(source.clone())).await.unwrap();
        let old = store.snapshot();

        source.replace(roster(11, 5));
        let outcome = store.refresh().await.unwrap();

        assert!(outcome.changed);
        assert_eq!(outcome.generation, 11);
        assert_eq!(outcome.workers, 5);
        assert_eq!(store.snapshot().len(), 5);
        // A reader holding the old snapshot keeps seeing it unchanged.
        assert_eq!(old.generation, 10);
        assert_eq!(old.len(), 3);
    }

    #[tokio::test]
    async fn test_stale_refresh_is_noop() {
        let source = StaticRegistrySource::new(roster(10, 3));
        let store = MembershipStore::bootstrap(Arc::new(source.clone())).await.unwrap();
        let before = store.snapshot();

        source.replace(roster(10, 8));
        let outcome = store.refresh().await.unwrap();

        assert!(!outcome.changed);
        assert_eq!(outcome.generation, 10);
        assert!(Arc::ptr_eq(&before, &store.snapshot()));
    }

    #[tokio::test]
    async fn test_older_generation_is_not_published() {
        let source = StaticRegistrySource::new(roster(10, 3));
        let store = MembershipStore::bootstrap(Arc::new(source.clone())).await.unwrap();

        source.replace(roster(9, 6));
        let outcome = store.refresh().await.unwrap();

        assert!(!outcome.changed);
        assert_eq!(store.generation(), 10);
        assert_eq!(store.snapshot().len(), 3);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_snapshot() {
        let source = CountingSource::new(Duration::ZERO);
        let store = MembershipStore::bootstrap(source.clone()).await.unwrap();
        let before = store.snapshot();

        source.fail.store(true, Ordering::SeqCst);
        let result = store.refresh().await;

        assert!(matches!(result, Err(RefreshError::Source(_))));
        assert!(Arc::ptr_eq(&before, &store.snapshot()));
    }

    #[tokio::test]
    async fn test_malformed_refresh_keeps_previous_snapshot() {
        let source = StaticRegistrySource::new(roster(10, 3));
        let store = MembershipStore::bootstrap(Arc::new(source.clone())).await.unwrap();

        let mut bad = roster(11, 3);
        bad.neurons.push(neuron(0));
        source.replace(bad);

        assert!(matches!(store.refresh().await, Err(RefreshError::MalformedRoster(_))));
        assert_eq!(store.generation(), 10);
    }

    // ============================================================
    // CONCURRENCY
    // ============================================================

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_refreshes_do_not_overlap() {
        let source = CountingSource::new(Duration::from_millis(20));
        let store = MembershipStore::bootstrap(source.clone()).await.unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.refresh().await })
            })
            .collect();

        for handle in handles {
            assert!(handle.await.unwrap().unwrap().changed);
        }

        assert!(!source.overlapped.load(Ordering::SeqCst));
        assert_eq!(source.fetches.load(Ordering::SeqCst), 9);
        assert_eq!(store.generation(), 108);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_readers_never_see_generation_go_backwards() {
        let source = CountingSource::new(Duration::from_millis(1));
        let store = MembershipStore::bootstrap(source).await.unwrap();

        let writer = {
            let store = store.clone();
            tokio::spawn(async move {
                for _ in 0..50 {
                    store.refresh().await.unwrap();
                }
            })
        };

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move {
                    let mut last = 0;
                    for _ in 0..2_000 {
                        let snapshot = store.snapshot();
                        assert!(snapshot.generation >= last, "generation went backwards");
                        assert_eq!(snapshot.len(), 4, "partial snapshot observed");
                        last = snapshot.generation;
                        tokio::task::yield_now().await;
                    }
                })
            })
            .collect();

        writer.await.unwrap();
        for reader in readers {
            reader.await.unwrap();
        }

        assert_eq!(store.generation(), 150);
    }

    // ============================================================
    // SCHEDULER
    // ============================================================

    #[tokio::test(start_paused = true)]
    async fn test_scheduler_refreshes_every_period() {
        let source = CountingSource::new(Duration::ZERO);
        let store = MembershipStore::bootstrap(source.clone()).await.unwrap();
        let cancel = CancellationToken::new();

        let handle =
            RefreshScheduler::spawn(store.clone(), Duration::from_secs(60), cancel.clone());

        // Nothing happens before the first period elapses.
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(source.fetches.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(100)).await;
        assert_eq!(source.fetches.load(Ordering::SeqCst), 3);
        assert_eq!(store.generation(), 102);

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduler_survives_refresh_errors() {
        let source = CountingSource::new(Duration::ZERO);
        let store = MembershipStore::bootstrap(source.clone()).await.unwrap();
        let cancel = CancellationToken::new();
        source.fail.store(true, Ordering::SeqCst);

        let handle =
            RefreshScheduler::spawn(store.clone(), Duration::from_secs(10), cancel.clone());

        tokio::time::sleep(Duration::from_secs(25)).await;
        assert_eq!(store.generation(), 100);

        source.fail.store(false, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(store.generation() > 100);

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_lets_in_flight_refresh_finish() {
        let source = CountingSource::new(Duration::from_secs(5));
        let store = MembershipStore::bootstrap(source.clone()).await.unwrap();
        let cancel = CancellationToken::new();

        let handle =
            RefreshScheduler::spawn(store.clone(), Duration::from_secs(10), cancel.clone());

        // Land in the middle of the first scheduled refresh.
        tokio::time::sleep(Duration::from_secs(12)).await;
        assert!(source.in_flight.load(Ordering::SeqCst));

        cancel.cancel();
        handle.await.unwrap();

        assert!(!source.in_flight.load(Ordering::SeqCst));
        assert_eq!(store.generation(), 101);
        assert_eq!(source.fetches.load(Ordering::SeqCst), 2);
    }
}
