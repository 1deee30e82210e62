//! Hand persistence and the hook that writes analyses back onto decisions.
//! The analyser itself never touches a store.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::analyser::{self, EvAnalysis};
use crate::compare::Classification;
use crate::config::AnalyserConfig;
use crate::error::AnalysisError;
use crate::hand::HandRecord;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("hand {0} not found")]
    NotFound(String),
    #[error("hand id '{0}' is not a valid file name")]
    InvalidId(String),
    #[error("store io: {0}")]
    Io(#[from] io::Error),
    #[error("store json: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
}

pub trait HandStore: Send + Sync {
    fn load(&self, id: &str) -> Result<HandRecord, StoreError>;
    /// Inserts or fully replaces the hand with the same id.
    fn save(&self, hand: &HandRecord) -> Result<(), StoreError>;
    /// Every stored hand, ordered by id.
    fn list(&self) -> Result<Vec<HandRecord>, StoreError>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    hands: RwLock<BTreeMap<String, HandRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HandStore for MemoryStore {
    fn load(&self, id: &str) -> Result<HandRecord, StoreError> {
        self.hands
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    fn save(&self, hand: &HandRecord) -> Result<(), StoreError> {
        self.hands.write().insert(hand.id.clone(), hand.clone());
        Ok(())
    }

    fn list(&self) -> Result<Vec<HandRecord>, StoreError> {
        Ok(self.hands.read().values().cloned().collect())
    }
}

/// One pretty-printed `<id>.json` document per hand.
#[derive(Debug, Clone)]
pub struct JsonDirStore {
    dir: PathBuf,
}

impl JsonDirStore {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, id: &str) -> Result<PathBuf, StoreError> {
        let valid = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            && !id.starts_with('.');
        if !valid {
            return Err(StoreError::InvalidId(id.to_string()));
        }
        Ok(self.dir.join(format!("{id}.json")))
    }
}

impl HandStore for JsonDirStore {
    fn load(&self, id: &str) -> Result<HandRecord, StoreError> {
        let path = self.path_for(id)?;
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(id.to_string()));
            }
            Err(err) => return Err(err.into()),
        };
        Ok(serde_json::from_str(&raw)?)
    }

    fn save(&self, hand: &HandRecord) -> Result<(), StoreError> {
        let path = self.path_for(&hand.id)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(hand)?)?;
        fs::rename(&tmp, &path)?;
        debug!(hand = %hand.id, path = %path.display(), "hand saved");
        Ok(())
    }

    fn list(&self) -> Result<Vec<HandRecord>, StoreError> {
        let mut paths: Vec<PathBuf> = fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();
        paths
            .iter()
            .map(|p| -> Result<HandRecord, StoreError> {
                Ok(serde_json::from_str(&fs::read_to_string(p)?)?)
            })
            .collect()
    }
}

/// Replaces the analysis on action `index`.
pub fn attach_analysis(
    hand: &mut HandRecord,
    index: usize,
    analysis: EvAnalysis,
) -> Result<(), StoreError> {
    let count = hand.betting_actions.len();
    let action = hand
        .betting_actions
        .get_mut(index)
        .ok_or_else(|| AnalysisError::InvalidDecision {
            index,
            reason: format!("hand has {count} actions"),
        })?;
    action.ev_analysis = Some(analysis);
    Ok(())
}

/// Drops the analysis on action `index`; `true` when there was one.
pub fn clear_analysis(hand: &mut HandRecord, index: usize) -> bool {
    hand.betting_actions
        .get_mut(index)
        .and_then(|action| action.ev_analysis.take())
        .is_some()
}

/// Loads a hand, analyses one decision, writes the result back and saves.
/// A failed run clears whatever an earlier run stored on that action.
pub fn persist_analysis(
    store: &dyn HandStore,
    id: &str,
    index: usize,
    config: &AnalyserConfig,
) -> Result<EvAnalysis, StoreError> {
    let mut hand = store.load(id)?;
    let analysis = match analyser::analyse(&hand, index, config) {
        Ok(analysis) => analysis,
        Err(err) => {
            if clear_analysis(&mut hand, index) {
                store.save(&hand)?;
                warn!(hand = %id, index, error = %err, "stale analysis cleared");
            }
            return Err(err.into());
        }
    };
    attach_analysis(&mut hand, index, analysis.clone())?;
    store.save(&hand)?;
    info!(hand = %id, index, "analysis persisted");
    Ok(analysis)
}

/// Aggregates over every stored hand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStats {
    pub hands: usize,
    pub decisions: usize,
    pub analysed: usize,
    pub plus_ev: usize,
    pub minus_ev: usize,
    pub total_ev: f64,
    pub total_delta: f64,
}

pub fn player_stats(hands: &[HandRecord]) -> PlayerStats {
    let mut stats = PlayerStats {
        hands: hands.len(),
        ..PlayerStats::default()
    };
    for hand in hands {
        let decisions = hand.hero_decisions();
        stats.decisions += decisions.len();
        for analysis in decisions
            .iter()
            .filter_map(|&i| hand.betting_actions.get(i)?.ev_analysis.as_ref())
        {
            stats.analysed += 1;
            match analysis.classification {
                Classification::PlusEv => stats.plus_ev += 1,
                Classification::MinusEv => stats.minus_ev += 1,
            }
            stats.total_ev += analysis.total_ev;
            stats.total_delta += analysis.delta;
        }
    }
    stats.total_ev = crate::round3(stats.total_ev);
    stats.total_delta = crate::round3(stats.total_delta);
    stats
}
