use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use hand_ev::config::AnalyserConfig;
use hand_ev::hand::HandRecord;
use hand_ev::store::{HandStore, MemoryStore};
use hand_ev::web;
use hand_ev::EvAnalysis;
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use tokio::task::JoinHandle;
use tokio::time::{Duration, sleep};

fn fixture() -> Value {
    serde_json::from_str(include_str!("fixtures/flop_bet.json")).unwrap()
}

fn test_config() -> AnalyserConfig {
    AnalyserConfig {
        samples: 60,
        max_rollouts: 2_000,
        ..AnalyserConfig::default()
    }
}

async fn spawn_app() -> anyhow::Result<(String, JoinHandle<()>)> {
    spawn_app_with(Arc::new(MemoryStore::new()), test_config()).await
}

async fn spawn_app_with(
    store: Arc<MemoryStore>,
    config: AnalyserConfig,
) -> anyhow::Result<(String, JoinHandle<()>)> {
    let app: Router = web::router(store, config);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr: SocketAddr = listener.local_addr()?;
    let server = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    sleep(Duration::from_millis(25)).await;
    Ok((format!("http://{}", addr), server))
}

#[tokio::test]
async fn web_api_supports_hand_flow() -> anyhow::Result<()> {
    let (base_url, server) = spawn_app().await?;
    let client = Client::builder().build()?;

    let created = client
        .post(format!("{}/api/hands", base_url))
        .json(&fixture())
        .send()
        .await?;
    assert_eq!(created.status(), StatusCode::CREATED);
    let created: HandRecord = created.json().await?;
    assert_eq!(created.id, "fixture-flop-bet");

    let results: Vec<Value> = client
        .post(format!("{}/api/hands/{}/analyse", base_url, created.id))
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    let indices: Vec<u64> = results.iter().filter_map(|r| r["index"].as_u64()).collect();
    assert_eq!(indices, [1, 4, 7, 11]);
    assert!(results.iter().all(|r| r.get("analysis").is_some()));

    let stored: HandRecord = client
        .get(format!("{}/api/hands/{}", base_url, created.id))
        .send()
        .await?
        .json()
        .await?;
    for index in [1, 4, 7, 11] {
        assert!(stored.betting_actions[index].ev_analysis.is_some());
    }

    let reseeded: EvAnalysis = client
        .post(format!("{}/api/hands/{}/actions/4/analysis", base_url, created.id))
        .json(&json!({ "seed": 7, "samples": 40 }))
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    let stored: HandRecord = client
        .get(format!("{}/api/hands/{}", base_url, created.id))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(stored.betting_actions[4].ev_analysis.as_ref(), Some(&reseeded));

    let stats: Value = client
        .get(format!("{}/api/stats", base_url))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(stats["hands"], 1);
    assert_eq!(stats["analysed"], 4);

    server.abort();
    let _ = server.await;
    Ok(())
}

#[tokio::test]
async fn web_api_reports_errors_with_status() -> anyhow::Result<()> {
    let (base_url, server) = spawn_app().await?;
    let client = Client::builder().build()?;

    let missing = client
        .get(format!("{}/api/hands/no-such-hand", base_url))
        .send()
        .await?;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);

    let mut broken = fixture();
    broken["heroHoleCards"] = json!(["Ah", "Zz"]);
    let rejected = client
        .post(format!("{}/api/hands", base_url))
        .json(&broken)
        .send()
        .await?;
    assert_eq!(rejected.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = rejected.json().await?;
    assert!(body["error"].as_str().unwrap_or_default().contains("Zz"));

    client
        .post(format!("{}/api/hands", base_url))
        .json(&fixture())
        .send()
        .await?
        .error_for_status()?;
    let not_a_decision = client
        .post(format!("{}/api/hands/fixture-flop-bet/actions/0/analysis", base_url))
        .send()
        .await?;
    assert_eq!(not_a_decision.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let health = client.get(format!("{}/healthz", base_url)).send().await?;
    assert_eq!(health.text().await?, "ok");

    server.abort();
    let _ = server.await;
    Ok(())
}

#[tokio::test]
async fn failed_reanalysis_drops_stored_results() -> anyhow::Result<()> {
    let store = Arc::new(MemoryStore::new());
    let hand: HandRecord = serde_json::from_value(fixture())?;
    store.save(&hand)?;
    let (fast_url, fast) = spawn_app_with(store.clone(), test_config()).await?;
    let timed_out = AnalyserConfig {
        deadline_ms: Some(0),
        ..test_config()
    };
    let (slow_url, slow) = spawn_app_with(store.clone(), timed_out).await?;
    let client = Client::new();

    client
        .post(format!("{}/api/hands/{}/analyse", fast_url, hand.id))
        .send()
        .await?
        .error_for_status()?;
    let analysed = store.load(&hand.id)?;
    assert_eq!(
        analysed.betting_actions.iter().filter(|a| a.ev_analysis.is_some()).count(),
        4
    );

    let results: Vec<Value> = client
        .post(format!("{}/api/hands/{}/analyse", slow_url, hand.id))
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    assert_eq!(results.len(), 4);
    assert!(results.iter().all(|r| r.get("error").is_some() && r.get("analysis").is_none()));
    assert_eq!(store.load(&hand.id)?, hand);

    fast.abort();
    slow.abort();
    Ok(())
}
