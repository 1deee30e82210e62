use crate::analyser::Stage;
use crate::cards::ParseCardError;

/// Input-shape failures and explicit cancellation. Local degeneracies such as an
/// empty range or a zero pot are not errors; they travel as `reason` strings on
/// the stage output instead.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AnalysisError {
    #[error("hero hole cards are missing")]
    MissingHeroCards,
    #[error("invalid card '{0}'")]
    InvalidCard(String),
    #[error("inconsistent street progression: {0}")]
    InconsistentStreet(String),
    #[error("analysis cancelled after {}", .completed.map(|s| s.name()).unwrap_or("no stage"))]
    Cancelled { completed: Option<Stage> },
    #[error("equity inputs are empty")]
    EquityInputsEmpty,
    #[error("action {index} is not an analysable decision: {reason}")]
    InvalidDecision { index: usize, reason: String },
    #[error("invalid hand: {0}")]
    InvalidHand(String),
}

impl From<ParseCardError> for AnalysisError {
    fn from(err: ParseCardError) -> Self {
        AnalysisError::InvalidCard(err.0)
    }
}
