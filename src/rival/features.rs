//! Inputs of the response model that are read straight off the decision:
//! sizing, pot odds, what the villain's line says about their range, and the
//! board.

use serde::{Deserialize, Serialize};

use crate::cards::Card;
use crate::config::ModelCoefficients;
use crate::game::{ActionKind, BetSizeCategory, Street};
use crate::rival::{ModelInputs, VillainAction};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BetFeatures {
    pub category: BetSizeCategory,
    /// Hero's bet over the pot it goes into.
    pub bet_to_pot: f64,
    /// What the villain must put in to continue.
    pub call_cost: f64,
    pub pot_odds: f64,
}

/// `call_cost / (pot + call_cost)`; zero when nothing is at stake.
pub fn pot_odds(call_cost: f64, pot: f64) -> f64 {
    let denominator = pot + call_cost;
    if call_cost <= 0.0 || denominator <= 0.0 {
        0.0
    } else {
        call_cost / denominator
    }
}

pub fn bet_features(inputs: &ModelInputs) -> BetFeatures {
    let call_cost = inputs.villain_call_cost();
    let category = BetSizeCategory::classify(
        call_cost,
        inputs.pot_before_bet(),
        inputs.effective_stack,
    );
    let bet_to_pot = if inputs.pot_before_bet() > 0.0 {
        call_cost / inputs.pot_before_bet()
    } else {
        0.0
    };
    BetFeatures {
        category,
        bet_to_pot,
        call_cost,
        pot_odds: pot_odds(call_cost, inputs.pot_facing_villain()),
    }
}

/// Composition of the villain's range as implied by their actions so far.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeStrengthPrior {
    pub strong: f64,
    pub medium: f64,
    pub weak: f64,
    pub drawing: f64,
    /// Weighted strength in [0, 1].
    pub average: f64,
    pub observed: usize,
}

const UNOBSERVED_PROFILE: [f64; 4] = [0.25, 0.35, 0.30, 0.10];
const STRENGTH_OF: [f64; 4] = [0.9, 0.55, 0.15, 0.4];

/// `[strong, medium, weak, drawing]` implied by one action.
fn action_profile(kind: ActionKind) -> Option<[f64; 4]> {
    match kind {
        ActionKind::Raise => Some([0.60, 0.25, 0.05, 0.10]),
        ActionKind::Bet => Some([0.40, 0.30, 0.10, 0.20]),
        ActionKind::Call => Some([0.15, 0.45, 0.15, 0.25]),
        ActionKind::Check => Some([0.05, 0.30, 0.55, 0.10]),
        ActionKind::Fold => None,
    }
}

/// Later streets say more about a range than earlier ones.
fn street_weight(street: Street) -> f64 {
    match street {
        Street::Preflop => 0.5,
        Street::Flop => 1.0,
        Street::Turn => 1.25,
        Street::River => 1.5,
    }
}

pub fn range_strength(actions: &[VillainAction]) -> RangeStrengthPrior {
    let mut totals = [0.0f64; 4];
    let mut weight = 0.0;
    let mut observed = 0;
    for action in actions {
        if let Some(profile) = action_profile(action.kind) {
            let w = street_weight(action.street);
            for (total, share) in totals.iter_mut().zip(profile) {
                *total += w * share;
            }
            weight += w;
            observed += 1;
        }
    }
    let shares = if weight > 0.0 {
        totals.map(|t| t / weight)
    } else {
        UNOBSERVED_PROFILE
    };
    let average = shares
        .iter()
        .zip(STRENGTH_OF)
        .map(|(share, strength)| share * strength)
        .sum::<f64>()
        .clamp(0.0, 1.0);
    RangeStrengthPrior {
        strong: shares[0],
        medium: shares[1],
        weak: shares[2],
        drawing: shares[3],
        average,
        observed,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    Unobserved,
    Checking,
    Calling,
    Aggressive,
    Mixed,
}

/// The villain's line through the hand, summarised.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreetPattern {
    pub kind: PatternKind,
    pub checks: usize,
    pub calls: usize,
    pub aggressive: usize,
    /// Share of bets and raises among the villain's non-fold actions.
    pub aggression: f64,
    pub fold_prior: f64,
}

pub fn street_pattern(
    actions: &[VillainAction],
    street: Street,
    coefficients: &ModelCoefficients,
) -> StreetPattern {
    let count = |wanted: &[ActionKind]| {
        actions
            .iter()
            .filter(|a| wanted.contains(&a.kind))
            .count()
    };
    let checks = count(&[ActionKind::Check]);
    let calls = count(&[ActionKind::Call]);
    let aggressive = count(&[ActionKind::Bet, ActionKind::Raise]);
    let total = checks + calls + aggressive;
    let aggression = if total == 0 {
        0.0
    } else {
        aggressive as f64 / total as f64
    };

    let kind = if total == 0 {
        PatternKind::Unobserved
    } else if aggression >= 0.5 {
        PatternKind::Aggressive
    } else if aggressive == 0 && calls > checks {
        PatternKind::Calling
    } else if aggressive == 0 {
        PatternKind::Checking
    } else {
        PatternKind::Mixed
    };
    let shift = match kind {
        PatternKind::Unobserved => 0.0,
        PatternKind::Checking => 0.08,
        PatternKind::Calling => -0.06,
        PatternKind::Aggressive => -0.10,
        PatternKind::Mixed => -0.02,
    };

    StreetPattern {
        kind,
        checks,
        calls,
        aggressive,
        aggression,
        fold_prior: (coefficients.street_fold.get(street) + shift).clamp(0.0, 1.0),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct BoardTexture {
    /// At least a flop is visible; otherwise every flag is false.
    pub known: bool,
    pub paired: bool,
    /// Three or more cards of one suit.
    pub monotone: bool,
    pub two_tone: bool,
    /// Three ranks fit inside one five-rank window.
    pub connected: bool,
    pub wet: bool,
    pub dry: bool,
}

pub fn board_texture(board: &[Card]) -> BoardTexture {
    if board.len() < 3 {
        return BoardTexture::default();
    }
    let mut rank_counts = [0u8; 15];
    let mut suit_counts = [0u8; 4];
    for card in board {
        rank_counts[card.rank_value() as usize] += 1;
        suit_counts[card.suit.index()] += 1;
    }
    let paired = rank_counts.iter().any(|&c| c >= 2);
    let max_suit = suit_counts.iter().copied().max().unwrap_or(0);
    let monotone = max_suit >= 3;
    let two_tone = max_suit == 2;

    let mut present = [false; 15];
    for rank in 2..=14 {
        present[rank] = rank_counts[rank] > 0;
    }
    present[1] = present[14];
    let connected = (1..=10).any(|low| present[low..low + 5].iter().filter(|&&p| p).count() >= 3);

    let wet = monotone || connected;
    BoardTexture {
        known: true,
        paired,
        monotone,
        two_tone,
        connected,
        wet,
        dry: !wet && !two_tone,
    }
}
