use std::cmp::Ordering;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cards::{Card, Combo, Rank, Suit, live_deck, mask_of};
use crate::error::AnalysisError;
use crate::range::Range;

pub const NEUTRAL_EQUITY: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum HandCategory {
    HighCard = 0,
    OnePair = 1,
    TwoPair = 2,
    ThreeOfAKind = 3,
    Straight = 4,
    Flush = 5,
    FullHouse = 6,
    FourOfAKind = 7,
    StraightFlush = 8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandStrength {
    pub category: HandCategory,
    pub ranks: [u8; 5],
}

impl PartialOrd for HandStrength {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HandStrength {
    fn cmp(&self, other: &Self) -> Ordering {
        self.category
            .cmp(&other.category)
            .then_with(|| self.ranks.cmp(&other.ranks))
    }
}

fn fill(values: &[u8]) -> [u8; 5] {
    let mut ranks = [0u8; 5];
    for (slot, value) in ranks.iter_mut().zip(values) {
        *slot = *value;
    }
    ranks
}

/// Highest straight in a rank bitmask (bit `r` set for rank value `r`).
fn straight_high(mask: u16) -> Option<u8> {
    let mut mask = mask;
    if mask & (1 << 14) != 0 {
        mask |= 1 << 1; // Ace-low straight support
    }
    (5u8..=14)
        .rev()
        .find(|&high| (0..5u8).all(|i| mask & (1 << (high - i)) != 0))
}

fn ranks_desc(mask: u16) -> impl Iterator<Item = u8> {
    (2u8..=14).rev().filter(move |r| mask & (1 << r) != 0)
}

/// Best five-card hand out of five to seven cards.
pub fn best_five_card_hand(cards: &[Card]) -> HandStrength {
    debug_assert!((5..=7).contains(&cards.len()), "5 to 7 cards required");

    let mut counts = [0u8; 15];
    let mut suit_masks = [0u16; 4];
    let mut rank_mask = 0u16;
    for card in cards {
        let rank = card.rank_value();
        counts[rank as usize] += 1;
        suit_masks[card.suit.index()] |= 1 << rank;
        rank_mask |= 1 << rank;
    }

    let flush_mask = suit_masks
        .iter()
        .copied()
        .find(|mask| mask.count_ones() >= 5);

    if let Some(mask) = flush_mask
        && let Some(high) = straight_high(mask)
    {
        return HandStrength {
            category: HandCategory::StraightFlush,
            ranks: fill(&[high, high - 1, high - 2, high - 3, high - 4]),
        };
    }

    // (count, rank), biggest group first, then highest rank
    let mut groups: Vec<(u8, u8)> = (2u8..=14)
        .filter(|&r| counts[r as usize] > 0)
        .map(|r| (counts[r as usize], r))
        .collect();
    groups.sort_unstable_by(|a, b| b.cmp(a));

    let kickers = |exclude: &[u8], take: usize| -> Vec<u8> {
        ranks_desc(rank_mask)
            .filter(|r| !exclude.contains(r))
            .take(take)
            .collect()
    };

    let (top_count, top_rank) = groups[0];
    let second = groups.get(1).copied();

    if top_count == 4 {
        let mut values = vec![top_rank];
        values.extend(kickers(&[top_rank], 1));
        return HandStrength {
            category: HandCategory::FourOfAKind,
            ranks: fill(&values),
        };
    }

    if top_count == 3
        && let Some((count, rank)) = second
        && count >= 2
    {
        return HandStrength {
            category: HandCategory::FullHouse,
            ranks: fill(&[top_rank, rank]),
        };
    }

    if let Some(mask) = flush_mask {
        let values: Vec<u8> = ranks_desc(mask).take(5).collect();
        return HandStrength {
            category: HandCategory::Flush,
            ranks: fill(&values),
        };
    }

    if let Some(high) = straight_high(rank_mask) {
        return HandStrength {
            category: HandCategory::Straight,
            ranks: fill(&[high, high - 1, high - 2, high - 3, high - 4]),
        };
    }

    match (top_count, second) {
        (3, _) => {
            let mut values = vec![top_rank];
            values.extend(kickers(&[top_rank], 2));
            HandStrength {
                category: HandCategory::ThreeOfAKind,
                ranks: fill(&values),
            }
        }
        (2, Some((2, low_pair))) => {
            let mut values = vec![top_rank, low_pair];
            values.extend(kickers(&[top_rank, low_pair], 1));
            HandStrength {
                category: HandCategory::TwoPair,
                ranks: fill(&values),
            }
        }
        (2, _) => {
            let mut values = vec![top_rank];
            values.extend(kickers(&[top_rank], 3));
            HandStrength {
                category: HandCategory::OnePair,
                ranks: fill(&values),
            }
        }
        _ => HandStrength {
            category: HandCategory::HighCard,
            ranks: fill(&kickers(&[], 5)),
        },
    }
}

pub fn compare_strength(a: HandStrength, b: HandStrength) -> Ordering {
    a.cmp(&b)
}

/// Win/tie/loss score of `hero` against `villain` on a complete board.
pub fn showdown_score(hero: Combo, villain: Combo, board: &[Card; 5]) -> f64 {
    let [h1, h2] = hero.cards();
    let [v1, v2] = villain.cards();
    let [b1, b2, b3, b4, b5] = *board;
    let hero_strength = best_five_card_hand(&[h1, h2, b1, b2, b3, b4, b5]);
    let villain_strength = best_five_card_hand(&[v1, v2, b1, b2, b3, b4, b5]);
    match compare_strength(hero_strength, villain_strength) {
        Ordering::Greater => 1.0,
        Ordering::Equal => 0.5,
        Ordering::Less => 0.0,
    }
}

/// Output of one equity estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EquityResult {
    pub mean: f64,
    /// Showdowns evaluated: one per matchup on the river, rollouts otherwise.
    pub samples: u64,
    pub deterministic: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl EquityResult {
    pub fn neutral(reason: impl Into<String>, deterministic: bool) -> Self {
        Self {
            mean: NEUTRAL_EQUITY,
            samples: 0,
            deterministic,
            reason: Some(reason.into()),
        }
    }
}

/// Sampling limits for one estimate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleBudget {
    /// Run-outs per matchup.
    pub per_matchup: u32,
    /// Cap on run-outs across all matchups.
    pub max_rollouts: u64,
}

impl SampleBudget {
    pub fn per_pair(&self, pairs: usize) -> u64 {
        let share = self.max_rollouts / pairs.max(1) as u64;
        share.clamp(1, u64::from(self.per_matchup.max(1)))
    }
}

/// Range-versus-range equity of `hero` on `board`. Fails with
/// [`AnalysisError::EquityInputsEmpty`] when no matchup survives card removal.
pub fn try_estimate_equity(
    board: &[Card],
    hero: &Range,
    villain: &Range,
    budget: SampleBudget,
    seed: u64,
) -> Result<EquityResult, AnalysisError> {
    if !matches!(board.len(), 0 | 3 | 4 | 5) {
        return Err(AnalysisError::InvalidHand(format!(
            "board of {} cards",
            board.len()
        )));
    }
    let board_mask = mask_of(board);
    let pairs: Vec<(Combo, Combo, f64)> = hero
        .iter()
        .flat_map(|&(h, hw)| villain.iter().map(move |&(v, vw)| (h, v, hw * vw)))
        .filter(|(h, v, w)| {
            *w > 0.0 && !h.intersects(board_mask | v.mask()) && !v.intersects(board_mask)
        })
        .collect();
    let total_weight: f64 = pairs.iter().map(|(_, _, w)| w).sum();
    if pairs.is_empty() || total_weight <= 0.0 {
        return Err(AnalysisError::EquityInputsEmpty);
    }

    let deterministic = board.len() == 5;
    let mut weighted = 0.0;
    let mut samples = 0u64;
    let mut reason = None;

    if let Ok(river) = <[Card; 5]>::try_from(board) {
        for (h, v, w) in &pairs {
            weighted += w * showdown_score(*h, *v, &river);
        }
        samples = pairs.len() as u64;
    } else {
        let per_pair = budget.per_pair(pairs.len());
        if per_pair < u64::from(budget.per_matchup) {
            reason = Some(format!(
                "rollout cap {} allows {per_pair} of {} run-outs per matchup",
                budget.max_rollouts, budget.per_matchup
            ));
        }
        let needed = 5 - board.len();
        let mut rng = StdRng::seed_from_u64(seed);
        let mut runout = [Card::new(Rank::Two, Suit::Clubs); 5];
        runout[..board.len()].copy_from_slice(board);

        for (h, v, w) in &pairs {
            let mut deck = live_deck(board_mask | h.mask() | v.mask());
            let mut wins = 0.0;
            for _ in 0..per_pair {
                let (drawn, _) = deck.partial_shuffle(&mut rng, needed);
                runout[board.len()..].copy_from_slice(drawn);
                wins += showdown_score(*h, *v, &runout);
            }
            weighted += w * wins / per_pair as f64;
            samples += per_pair;
        }
    }

    let mean = (weighted / total_weight).clamp(0.0, 1.0);
    debug!(
        mean,
        samples,
        matchups = pairs.len(),
        deterministic,
        "equity estimated"
    );
    Ok(EquityResult {
        mean,
        samples,
        deterministic,
        reason,
    })
}

/// Like [`try_estimate_equity`] but degrades to neutral equity with a reason.
pub fn estimate_equity(
    board: &[Card],
    hero: &Range,
    villain: &Range,
    budget: SampleBudget,
    seed: u64,
) -> EquityResult {
    let deterministic = board.len() == 5;
    match try_estimate_equity(board, hero, villain, budget, seed) {
        Ok(result) => result,
        Err(AnalysisError::EquityInputsEmpty) => {
            EquityResult::neutral("no live matchups between ranges", deterministic)
        }
        Err(err) => EquityResult::neutral(err.to_string(), deterministic),
    }
}
