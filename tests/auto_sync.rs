/// Auto-sync scheduler tests
/// Tick periods are shortened to milliseconds so runs happen within the test
use lead_sync_api::memory_store::InMemoryLeadStore;
use lead_sync_api::models::Platform;
use lead_sync_api::orchestrator::SyncOrchestrator;
use lead_sync_api::providers::ProviderAdapter;
use lead_sync_api::scheduler::AutoSyncScheduler;
use lead_sync_api::store::LeadStore;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn setup(meta_delay: Duration) -> (MockServer, Arc<InMemoryLeadStore>, Arc<SyncOrchestrator>) {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/meta/leads"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({
                    "leads": [{
                        "leadgen_id": "META_1",
                        "field_data": [
                            { "name": "full_name", "values": ["Alice Meta"] },
                            { "name": "email", "values": ["alice@example.com"] }
                        ]
                    }]
                }))
                .set_delay(meta_delay),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/google/leads"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "leads": [] })))
        .mount(&server)
        .await;

    let adapters = vec![
        ProviderAdapter::new(
            Platform::Meta,
            format!("{}/meta/leads", server.uri()),
            Duration::from_secs(5),
        )
        .unwrap(),
        ProviderAdapter::new(
            Platform::Google,
            format!("{}/google/leads", server.uri()),
            Duration::from_secs(5),
        )
        .unwrap(),
    ];

    let store = Arc::new(InMemoryLeadStore::new());
    let orchestrator = Arc::new(SyncOrchestrator::new(adapters, store.clone()));
    (server, store, orchestrator)
}

async fn wait_until<F: Fn() -> bool>(condition: F, within: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + within;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

#[tokio::test]
async fn test_status_reflects_start_and_stop() {
    let (_server, _store, orchestrator) = setup(Duration::ZERO).await;
    let scheduler = AutoSyncScheduler::new(orchestrator);

    let status = scheduler.status().await;
    assert!(!status.enabled);
    assert_eq!(status.interval_secs, None);

    scheduler.start(Duration::from_secs(120)).await;
    let status = scheduler.status().await;
    assert!(status.enabled);
    assert_eq!(status.interval_secs, Some(120));

    // Restarting replaces the period.
    scheduler.start(Duration::from_secs(30)).await;
    assert_eq!(scheduler.status().await.interval_secs, Some(30));

    scheduler.stop().await;
    assert!(!scheduler.status().await.enabled);

    // Stopping twice is harmless.
    scheduler.stop().await;
}

#[tokio::test]
async fn test_ticks_trigger_sync_runs() {
    let (_server, store, orchestrator) = setup(Duration::ZERO).await;
    let scheduler = AutoSyncScheduler::new(orchestrator.clone());

    scheduler.start(Duration::from_millis(50)).await;

    let mut runs = 0;
    for _ in 0..100 {
        runs = store.recent_sync_runs(100, None).await.unwrap().len();
        if runs >= 4 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    scheduler.stop().await;

    // Two ticks at least, each auditing both platforms.
    assert!(runs >= 4, "only {} sync runs recorded", runs);
    assert_eq!(store.count_leads(None).await.unwrap(), 1);
}

#[tokio::test]
async fn test_stop_leaves_in_flight_run_alone() {
    let (_server, store, orchestrator) = setup(Duration::from_millis(500)).await;
    let scheduler = AutoSyncScheduler::new(orchestrator.clone());

    scheduler.start(Duration::from_millis(20)).await;
    assert!(
        wait_until(|| orchestrator.is_running(), Duration::from_secs(2)).await,
        "auto-sync never started a run"
    );

    tokio::time::timeout(Duration::from_millis(100), scheduler.stop())
        .await
        .expect("stop should not wait for the run");
    assert!(orchestrator.is_running());
    assert!(!scheduler.status().await.enabled);

    assert!(wait_until(|| !orchestrator.is_running(), Duration::from_secs(3)).await);

    // Ticks during the run were skipped by the guard; no tick followed stop.
    let runs = store.recent_sync_runs(100, None).await.unwrap();
    assert_eq!(runs.len(), 2);
    assert_eq!(store.count_leads(Some(Platform::Meta)).await.unwrap(), 1);
}
