//! Opponent response model: how likely the villain is to fold, call or raise
//! facing the hero's bet.
//!
//! The model is a layered accumulator. Features are read off the decision, a
//! base fold frequency is taken as a weighted average of several estimates, a
//! series of bounded adjustments is added, the triple is assembled and
//! validated, and finally an equilibrium heuristic may be blended in.

pub mod adjust;
pub mod features;
pub mod nash;
pub mod validate;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::analyser::{Cancelled, Stage};
use crate::cards::Card;
use crate::config::{ModelCoefficients, NashConfig};
use crate::context::Decision;
use crate::game::{ActionKind, Street};

use adjust::Adjustment;
use features::{BetFeatures, BoardTexture, RangeStrengthPrior, StreetPattern};
use nash::NashBlend;
use validate::ValidationTrace;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Frequencies {
    pub fold: f64,
    pub call: f64,
    pub raise: f64,
}

impl Frequencies {
    pub const fn new(fold: f64, call: f64, raise: f64) -> Self {
        Self { fold, call, raise }
    }

    pub fn sum(&self) -> f64 {
        self.fold + self.call + self.raise
    }

    pub fn rounded(&self) -> Self {
        Self {
            fold: crate::round3(self.fold),
            call: crate::round3(self.call),
            raise: crate::round3(self.raise),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VillainAction {
    pub street: Street,
    pub kind: ActionKind,
    pub amount: f64,
}

/// Everything the model reads about one hero bet.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelInputs {
    pub street: Street,
    /// Pot before the hero's bet.
    pub pot: f64,
    /// Chips the hero puts in with the bet.
    pub bet: f64,
    /// What the hero was facing before betting.
    pub to_call: f64,
    pub effective_stack: f64,
    pub board: Vec<Card>,
    pub villain_actions: Vec<VillainAction>,
    pub villain_in_position: Option<bool>,
    pub active_players: usize,
}

impl ModelInputs {
    pub fn from_decision(decision: &Decision) -> Self {
        Self {
            street: decision.street,
            pot: decision.pot,
            bet: decision.callable(decision.bet()),
            to_call: decision.to_call,
            effective_stack: decision.effective_stack,
            board: decision.board.clone(),
            villain_actions: decision
                .villain_actions()
                .map(|a| VillainAction {
                    street: a.street,
                    kind: a.kind,
                    amount: a.amount,
                })
                .collect(),
            villain_in_position: decision.villain.as_ref().and_then(|v| v.in_position),
            active_players: decision.active_players,
        }
    }

    /// The same spot with a different hero bet.
    pub fn with_bet(&self, bet: f64) -> Self {
        Self {
            bet,
            ..self.clone()
        }
    }

    pub fn pot_before_bet(&self) -> f64 {
        self.pot
    }

    pub fn pot_facing_villain(&self) -> f64 {
        self.pot + self.bet
    }

    /// The part of the hero's bet the villain has not yet matched.
    pub fn villain_call_cost(&self) -> f64 {
        (self.bet - self.to_call).max(0.0)
    }

    fn missing(&self) -> bool {
        !(self.pot.is_finite() && self.bet.is_finite())
            || self.pot <= 0.0
            || self.villain_call_cost() <= 0.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Features {
    pub bet: BetFeatures,
    pub range: RangeStrengthPrior,
    pub pattern: StreetPattern,
    pub texture: BoardTexture,
}

/// Base fold frequency and the estimates it was averaged from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseFrequencies {
    pub gto: f64,
    pub sizing: f64,
    pub pot_odds: f64,
    pub range: f64,
    pub street: f64,
    pub fold: f64,
    pub call: f64,
    pub raise: f64,
}

pub fn base_frequencies(features: &Features, c: &ModelCoefficients) -> BaseFrequencies {
    let w = &c.weights;
    let gto = c.gto_fold.get(features.bet.category);
    let ratio = features.bet.bet_to_pot;
    let sizing = ratio / (1.0 + ratio);
    let pot_odds = (features.bet.pot_odds * c.pot_odds_fold_scale).clamp(0.0, 1.0);
    let range = 1.0 - features.range.average;
    let street = features.pattern.fold_prior;

    let total_weight = w.gto + w.sizing + w.pot_odds + w.range + w.street;
    let blended = if total_weight > 0.0 {
        (w.gto * gto + w.sizing * sizing + w.pot_odds * pot_odds + w.range * range + w.street * street)
            / total_weight
    } else {
        gto
    };

    BaseFrequencies {
        gto,
        sizing,
        pot_odds,
        range,
        street,
        fold: blended.clamp(c.fold_floor, c.fold_ceiling),
        call: c.base_call,
        raise: c.base_raise,
    }
}

/// Applies every adjustment to the base rates. The result is not normalised.
pub fn assemble(base: &BaseFrequencies, adjustments: &[Adjustment], c: &ModelCoefficients) -> (Frequencies, Option<String>) {
    let fold = base.fold + adjustments.iter().map(|a| a.fold).sum::<f64>();
    let call = base.call + adjustments.iter().map(|a| a.call).sum::<f64>();
    let raise = (base.raise + adjustments.iter().map(|a| a.raise).sum::<f64>()).max(c.min_raise);
    let raw = Frequencies {
        fold: fold.clamp(0.0, 1.0),
        call: call.clamp(0.0, 1.0),
        raise: raise.clamp(0.0, 1.0),
    };
    if raw.sum() <= f64::EPSILON {
        return (
            Frequencies::new(base.fold, base.call, base.raise),
            Some("adjusted frequencies collapsed; using base rates".to_string()),
        );
    }
    (raw, None)
}

/// Full output of the response model for one bet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseModel {
    pub features: Option<Features>,
    pub base: Option<BaseFrequencies>,
    pub adjustments: Vec<Adjustment>,
    pub raw: Frequencies,
    pub validated: Frequencies,
    pub trace: ValidationTrace,
    pub nash: Option<NashBlend>,
    /// What downstream stages use: the blended triple when a blend fired,
    /// else the validated one.
    pub frequencies: Frequencies,
}

impl ResponseModel {
    fn neutral(c: &ModelCoefficients, reason: &str) -> Self {
        let neutral = c.neutral;
        Self {
            features: None,
            base: None,
            adjustments: Vec::new(),
            raw: neutral,
            validated: neutral,
            trace: ValidationTrace {
                input_sum: neutral.sum(),
                reason: Some(reason.to_string()),
                ..ValidationTrace::default()
            },
            nash: None,
            frequencies: neutral,
        }
    }

    pub fn gto_frequencies(&self) -> Option<Frequencies> {
        self.nash.as_ref().map(|n| n.heuristic)
    }
}

/// Runs the model, calling `checkpoint` after every stage so the caller can
/// abandon the run at a stage boundary.
pub fn respond<F>(
    inputs: &ModelInputs,
    coefficients: &ModelCoefficients,
    nash_config: &NashConfig,
    mut checkpoint: F,
) -> Result<ResponseModel, Cancelled>
where
    F: FnMut(Stage) -> Result<(), Cancelled>,
{
    let c = coefficients;
    if inputs.missing() {
        warn!(pot = inputs.pot, bet = inputs.bet, "response model inputs missing");
        let model = ResponseModel::neutral(c, "missing inputs");
        checkpoint(Stage::NashBlend)?;
        return Ok(model);
    }

    let bet = features::bet_features(inputs);
    checkpoint(Stage::BetFeatures)?;
    let range = features::range_strength(&inputs.villain_actions);
    checkpoint(Stage::RangeStrength)?;
    let pattern = features::street_pattern(&inputs.villain_actions, inputs.street, c);
    checkpoint(Stage::StreetPattern)?;
    let texture = features::board_texture(&inputs.board);
    checkpoint(Stage::BoardTexture)?;
    let features = Features {
        bet,
        range,
        pattern,
        texture,
    };

    let base = base_frequencies(&features, c);
    checkpoint(Stage::BaseFrequencies)?;

    let mut adjustments = Vec::with_capacity(7);
    adjustments.push(adjust::range_strength(&features.range, c));
    checkpoint(Stage::RangeAdjustment)?;
    adjustments.push(adjust::position(inputs.villain_in_position, c));
    checkpoint(Stage::PositionAdjustment)?;
    adjustments.push(adjust::stack_depth(
        inputs.effective_stack,
        inputs.pot_facing_villain(),
        c,
    ));
    checkpoint(Stage::StackAdjustment)?;
    adjustments.push(adjust::multiway(inputs.active_players, c));
    checkpoint(Stage::MultiwayAdjustment)?;
    adjustments.push(adjust::bet_sizing(&features.bet, c));
    checkpoint(Stage::SizingAdjustment)?;
    adjustments.push(adjust::aggression(&features.pattern, c));
    checkpoint(Stage::AggressionAdjustment)?;
    adjustments.push(adjust::board_texture(&features.texture, c));
    checkpoint(Stage::TextureAdjustment)?;

    let (raw, collapse) = assemble(&base, &adjustments, c);
    checkpoint(Stage::Assembly)?;

    let (validated, mut trace) = validate::validate(raw, c.min_raise, c.neutral);
    if trace.reason.is_none() {
        trace.reason = collapse;
    }
    checkpoint(Stage::Validation)?;

    let (heuristic, informative) = nash::heuristic(
        &features.bet,
        inputs.pot,
        &features.texture,
        inputs.villain_in_position,
        c,
    );
    let nash = nash::blend(validated, heuristic, informative, nash_config, c);
    let frequencies = nash.as_ref().map(|n| n.blended).unwrap_or(validated);
    checkpoint(Stage::NashBlend)?;

    debug!(
        base_fold = base.fold,
        fold = frequencies.fold,
        call = frequencies.call,
        raise = frequencies.raise,
        blended = nash.is_some(),
        "response model"
    );

    Ok(ResponseModel {
        features: Some(features),
        base: Some(base),
        adjustments,
        raw,
        validated,
        trace,
        nash,
        frequencies,
    })
}

/// [`respond`] without stage checkpoints.
pub fn respond_now(
    inputs: &ModelInputs,
    coefficients: &ModelCoefficients,
    nash_config: &NashConfig,
) -> ResponseModel {
    match respond(inputs, coefficients, nash_config, |_| Ok(())) {
        Ok(model) => model,
        Err(_) => ResponseModel::neutral(coefficients, "cancelled"),
    }
}
