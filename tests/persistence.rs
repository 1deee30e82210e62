use hand_ev::config::AnalyserConfig;
use hand_ev::error::AnalysisError;
use hand_ev::hand::HandRecord;
use hand_ev::store::{HandStore, JsonDirStore, MemoryStore, StoreError, persist_analysis, player_stats};

fn fixture() -> HandRecord {
    serde_json::from_str(include_str!("fixtures/flop_bet.json")).unwrap()
}

fn fast_config(seed: u64) -> AnalyserConfig {
    AnalyserConfig {
        samples: 80,
        max_rollouts: 2_000,
        seed,
        ..AnalyserConfig::default()
    }
}

#[test]
fn stored_analysis_reloads_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonDirStore::open(dir.path()).unwrap();
    let hand = fixture();
    store.save(&hand).unwrap();

    let analysis = persist_analysis(&store, &hand.id, 4, &fast_config(11)).unwrap();

    // a fresh handle reads only what reached the disk
    let reopened = JsonDirStore::open(dir.path()).unwrap();
    let reloaded = reopened.load(&hand.id).unwrap();
    assert_eq!(reloaded.betting_actions[4].ev_analysis.as_ref(), Some(&analysis));
    assert!(reloaded.betting_actions[7].ev_analysis.is_none());

    let mut expected = hand.clone();
    expected.betting_actions[4].ev_analysis = Some(analysis);
    assert_eq!(reloaded, expected);
}

#[test]
fn recomputing_replaces_previous_analysis() {
    let store = MemoryStore::new();
    let hand = fixture();
    store.save(&hand).unwrap();

    persist_analysis(&store, &hand.id, 7, &fast_config(1)).unwrap();
    let second = persist_analysis(&store, &hand.id, 7, &fast_config(2)).unwrap();

    let stored = store.load(&hand.id).unwrap();
    assert_eq!(stored.betting_actions[7].ev_analysis.as_ref(), Some(&second));
    let stats = player_stats(&store.list().unwrap());
    assert_eq!(stats.decisions, 4);
    assert_eq!(stats.analysed, 1);
}

#[test]
fn failed_analysis_leaves_hand_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonDirStore::open(dir.path()).unwrap();
    let hand = fixture();
    store.save(&hand).unwrap();

    let err = persist_analysis(&store, &hand.id, 9, &fast_config(0)).unwrap_err();
    assert!(matches!(err, StoreError::Analysis(_)));
    assert_eq!(store.load(&hand.id).unwrap(), hand);

    assert!(matches!(
        persist_analysis(&store, "missing", 4, &fast_config(0)),
        Err(StoreError::NotFound(_))
    ));
}

#[test]
fn failed_recompute_clears_stale_analysis() {
    let store = MemoryStore::new();
    let hand = fixture();
    store.save(&hand).unwrap();
    persist_analysis(&store, &hand.id, 4, &fast_config(3)).unwrap();

    let cancelled = AnalyserConfig {
        deadline_ms: Some(0),
        ..fast_config(3)
    };
    let err = persist_analysis(&store, &hand.id, 4, &cancelled).unwrap_err();
    assert!(matches!(
        err,
        StoreError::Analysis(AnalysisError::Cancelled { .. })
    ));
    assert_eq!(store.load(&hand.id).unwrap(), hand);
}
