//! Villain range tracking. A range starts from a preflop heuristic over every
//! live combo and is reshaped by each action the villain takes before the
//! decision. Weights always sum to one, or the range is empty.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cards::{Card, Combo, all_combos};
use crate::equity::{HandCategory, best_five_card_hand};
use crate::game::{ActionKind, Street};
use crate::rival::VillainAction;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Range {
    entries: Vec<(Combo, f64)>,
}

impl Range {
    pub fn empty() -> Self {
        Self::default()
    }

    /// A range holding exactly one combo.
    pub fn single(combo: Combo) -> Self {
        Self {
            entries: vec![(combo, 1.0)],
        }
    }

    /// Builds a range from raw weights, dropping dead or non-positive entries
    /// and renormalising.
    pub fn from_weights(entries: impl IntoIterator<Item = (Combo, f64)>, dead: u64) -> Self {
        let mut range = Self {
            entries: entries.into_iter().collect(),
        };
        range.remove_dead(dead);
        range.normalise();
        range
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Combo, f64)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_weight(&self) -> f64 {
        self.entries.iter().map(|(_, w)| w).sum()
    }

    pub fn weight_of(&self, combo: Combo) -> f64 {
        self.entries
            .iter()
            .find(|(c, _)| *c == combo)
            .map(|(_, w)| *w)
            .unwrap_or(0.0)
    }

    pub fn remove_dead(&mut self, dead: u64) {
        self.entries
            .retain(|(combo, weight)| !combo.intersects(dead) && weight.is_finite() && *weight > 0.0);
    }

    pub fn normalise(&mut self) {
        let total = self.total_weight();
        if total <= 0.0 || !total.is_finite() {
            self.entries.clear();
            return;
        }
        for (_, weight) in &mut self.entries {
            *weight /= total;
        }
    }

    /// Multiplies every weight by `factor(combo)`, then filters and
    /// renormalises.
    pub fn reshape(&mut self, dead: u64, mut factor: impl FnMut(Combo) -> f64) {
        for (combo, weight) in &mut self.entries {
            *weight *= factor(*combo).clamp(0.0, 1.0);
        }
        self.remove_dead(dead);
        self.normalise();
    }
}

/// Pre-flop playability of two hole cards in [0, 1].
pub fn preflop_strength(combo: Combo) -> f64 {
    let high = combo.high.rank_value().max(combo.low.rank_value());
    let low = combo.high.rank_value().min(combo.low.rank_value());
    let base = f64::from(high + low) / 28.0;
    let mut strength = base;
    if combo.is_pair() {
        strength += 0.25;
    } else if high - low <= 1 {
        strength += 0.08;
    }
    if combo.is_suited() {
        strength += 0.05;
    }
    strength.clamp(0.0, 1.0)
}

const CATEGORY_FLOOR: [f64; 9] = [0.05, 0.35, 0.60, 0.70, 0.78, 0.84, 0.92, 0.97, 0.99];

/// Showdown value of `combo` on `board` in [0, 1], and whether it holds a
/// live draw.
pub fn combo_strength(combo: Combo, board: &[Card]) -> (f64, bool) {
    if board.len() < 3 {
        return (preflop_strength(combo), false);
    }
    let mut cards = Vec::with_capacity(7);
    cards.extend(combo.cards());
    cards.extend_from_slice(board);
    let strength = best_five_card_hand(&cards);

    let category = strength.category as usize;
    let next = CATEGORY_FLOOR.get(category + 1).copied().unwrap_or(1.0);
    let span = next - CATEGORY_FLOOR[category];
    let kicker = f64::from(strength.ranks[0].saturating_sub(2)) / 12.0;
    let mut score = CATEGORY_FLOOR[category] + span * kicker * 0.9;

    // a pair that lives entirely on the board is no better than high card
    if strength.category == HandCategory::OnePair && !pairs_with_hole(combo, strength.ranks[0]) {
        score = CATEGORY_FLOOR[0] + 0.2 * kicker;
    }
    if board.len() == 5 && board_plays(combo, board) {
        score *= 0.6;
    }

    let drawing = board.len() < 5 && has_draw(combo, board);
    (score.clamp(0.0, 1.0), drawing)
}

fn pairs_with_hole(combo: Combo, rank: u8) -> bool {
    combo.cards().iter().any(|c| c.rank_value() == rank)
}

fn board_plays(combo: Combo, board: &[Card]) -> bool {
    let mut cards = Vec::with_capacity(7);
    cards.extend(combo.cards());
    cards.extend_from_slice(board);
    best_five_card_hand(board) == best_five_card_hand(&cards)
}

/// Four to a flush or four to a straight, using at least one hole card.
fn has_draw(combo: Combo, board: &[Card]) -> bool {
    let hole = combo.cards();
    let flush_draw = hole.iter().any(|h| {
        let suited = board.iter().filter(|b| b.suit == h.suit).count()
            + hole.iter().filter(|o| o.suit == h.suit).count();
        suited == 4
    });
    if flush_draw {
        return true;
    }

    let mut present = [false; 15];
    for card in board.iter().chain(hole.iter()) {
        present[card.rank_value() as usize] = true;
    }
    present[1] = present[14];
    (1..=10).any(|low| {
        let window = low..low + 5;
        let count = window.clone().filter(|&r| present[r]).count();
        let uses_hole = hole.iter().any(|h| {
            let r = h.rank_value() as usize;
            window.contains(&r) || (r == 14 && low == 1)
        });
        count == 4 && uses_hole
    })
}

/// How strongly an action of `kind` on `street` keeps a combo of the given
/// strength in the range.
pub fn action_factor(kind: ActionKind, street: Street, strength: f64, drawing: bool) -> f64 {
    let sharpness = match street {
        Street::Preflop => 1.0,
        Street::Flop => 1.1,
        Street::Turn => 1.25,
        Street::River => 1.5,
    };
    let semi_bluff = drawing && street != Street::River;
    let factor = match kind {
        ActionKind::Fold => 0.0,
        ActionKind::Check => 1.0 - 0.5 * strength.powi(2),
        ActionKind::Call => {
            let centred = (strength - 0.6) / 0.45;
            (1.0 - centred * centred).max(0.1) + if drawing { 0.3 } else { 0.0 }
        }
        ActionKind::Bet => {
            (0.15 + 0.85 * strength).powf(sharpness) + if semi_bluff { 0.25 } else { 0.0 }
        }
        ActionKind::Raise => {
            (0.05 + 0.95 * strength).powf(1.5 * sharpness) + if semi_bluff { 0.15 } else { 0.0 }
        }
    };
    factor.clamp(0.0, 1.0)
}

/// Initial villain range: every live combo weighted by preflop playability,
/// with trash kept at a small floor.
pub fn initial_range(dead: u64) -> Range {
    Range::from_weights(
        all_combos().into_iter().map(|combo| {
            let s = preflop_strength(combo);
            let weight = if s < 0.35 { 0.15 } else { 0.3 + 0.7 * s };
            (combo, weight)
        }),
        dead,
    )
}

/// Applies one villain action to `range`, scoring combos on the board that was
/// visible when the action was taken.
pub fn apply_action(range: &mut Range, action: VillainAction, board: &[Card], dead: u64) {
    if action.kind == ActionKind::Fold {
        // the villain's branch ends here
        *range = Range::empty();
        return;
    }
    let visible = &board[..action.street.board_len().min(board.len())];
    range.reshape(dead, |combo| {
        let (strength, drawing) = combo_strength(combo, visible);
        action_factor(action.kind, action.street, strength, drawing)
    });
}

/// The villain's range at the decision and the two conditional ranges it
/// splits into when the villain calls or raises.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRanges {
    pub current: Range,
    pub calling: Range,
    pub raising: Range,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeSummary {
    pub current_combos: usize,
    pub calling_combos: usize,
    pub raising_combos: usize,
}

impl ResolvedRanges {
    pub fn summary(&self) -> RangeSummary {
        RangeSummary {
            current_combos: self.current.len(),
            calling_combos: self.calling.len(),
            raising_combos: self.raising.len(),
        }
    }
}

/// Replays the villain's prior actions over the initial range, then derives
/// the calling and raising ranges at the decision street.
pub fn resolve(
    villain_actions: &[VillainAction],
    board: &[Card],
    street: Street,
    dead: u64,
) -> ResolvedRanges {
    let mut current = initial_range(dead);
    for action in villain_actions {
        apply_action(&mut current, *action, board, dead);
    }

    let conditional = |kind: ActionKind| {
        let mut range = current.clone();
        apply_action(
            &mut range,
            VillainAction {
                street,
                kind,
                amount: 0.0,
            },
            board,
            dead,
        );
        range
    };
    let calling = conditional(ActionKind::Call);
    let raising = conditional(ActionKind::Raise);

    debug!(
        current = current.len(),
        calling = calling.len(),
        raising = raising.len(),
        "ranges resolved"
    );
    ResolvedRanges {
        current,
        calling,
        raising,
    }
}
