pub mod analyser;
pub mod cards;
pub mod compare;
pub mod config;
pub mod context;
pub mod equity;
pub mod error;
pub mod ev;
pub mod game;
pub mod hand;
pub mod range;
pub mod report;
pub mod rival;
pub mod store;
pub mod web;

pub use analyser::{AnalysisOutcome, EvAnalysis, RunControl, Stage, analyse, analyse_all};
pub use config::AnalyserConfig;
pub use error::AnalysisError;
pub use hand::HandRecord;

/// Rounds to 3 decimals, the precision of every reported number.
pub fn round3(x: f64) -> f64 {
    (x * 1000.0).round() / 1000.0
}
