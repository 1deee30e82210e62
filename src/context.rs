//! Normalises a hand record around one target action: the betting stream, the
//! board the hero could see, pot and stacks, and who is in position.

use std::collections::HashSet;

use tracing::debug;

use crate::cards::{Card, Combo, mask_of};
use crate::error::AnalysisError;
use crate::game::{ActionKind, GameType, Position, Street};
use crate::hand::HandRecord;

const SEATS: u8 = 9;

#[derive(Debug, Clone, PartialEq)]
pub struct ContextAction {
    pub index: usize,
    pub player_id: String,
    pub kind: ActionKind,
    pub amount: f64,
    pub street: Street,
    pub order: u32,
    pub by_hero: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActionContext {
    pub hand_id: String,
    pub game_type: GameType,
    pub hero_id: String,
    pub hero: Combo,
    pub hero_seat: u8,
    /// Every postflop action of the hand, in street then order sequence.
    pub postflop: Vec<ContextAction>,
    /// `None` when the hand carries no betting actions at all.
    pub decision: Option<Decision>,
}

/// State of the table immediately before the target action.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub index: usize,
    pub action: ContextAction,
    pub street: Street,
    pub board: Vec<Card>,
    /// Chips in the middle before the target action.
    pub pot: f64,
    /// Outstanding amount the hero faced on this street.
    pub to_call: f64,
    pub hero_remaining: f64,
    pub effective_stack: f64,
    pub hero_position: Position,
    pub villain: Option<Villain>,
    /// Players still holding cards, hero included.
    pub active_players: usize,
    /// Every action before the target, preflop included.
    pub prior: Vec<ContextAction>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Villain {
    pub id: String,
    pub seat: Option<u8>,
    pub position: Option<Position>,
    pub remaining: f64,
    /// `true` when the villain acts after the hero postflop.
    pub in_position: Option<bool>,
}

impl Decision {
    /// Dead cards at the decision: hero hole cards plus the visible board.
    pub fn dead_mask(&self, hero: Combo) -> u64 {
        hero.mask() | mask_of(&self.board)
    }

    pub fn villain_actions(&self) -> impl Iterator<Item = &ContextAction> {
        let villain = self.villain.as_ref().map(|v| v.id.clone());
        self.prior
            .iter()
            .filter(move |a| villain.as_deref() == Some(a.player_id.as_str()))
    }

    pub fn bet(&self) -> f64 {
        self.action.amount
    }

    /// The most the villain can match: the price the hero faced plus the
    /// effective stack. `None` while the villain's stack is unknown.
    pub fn bet_cap(&self) -> Option<f64> {
        let villain = self.villain.as_ref()?;
        villain
            .remaining
            .is_finite()
            .then(|| self.to_call + self.effective_stack)
    }

    /// `amount` without the part the villain could never call.
    pub fn callable(&self, amount: f64) -> f64 {
        self.bet_cap().map_or(amount, |cap| amount.min(cap))
    }

    /// The hero's all-in, as far as the villain can match it.
    pub fn all_in(&self) -> f64 {
        self.callable(self.hero_remaining)
    }
}

impl ActionContext {
    pub fn extract(hand: &HandRecord, index: usize) -> Result<Self, AnalysisError> {
        let cards = hand.validate()?;
        let hero_id = hand
            .hero_id()
            .ok_or_else(|| AnalysisError::InvalidHand("hero is not seated".to_string()))?
            .to_string();

        let stream = ordered_stream(hand, &hero_id, cards.board.len())?;
        let postflop: Vec<ContextAction> = stream
            .iter()
            .filter(|a| a.street.is_postflop())
            .cloned()
            .collect();

        let hero_seat = hand
            .players
            .iter()
            .find(|p| p.id == hero_id)
            .map(|p| p.position)
            .unwrap_or(hand.hero_position);

        let mut context = Self {
            hand_id: hand.id.clone(),
            game_type: hand.game_type,
            hero_id,
            hero: cards.hero,
            hero_seat,
            postflop,
            decision: None,
        };
        if stream.is_empty() {
            debug!(hand = %hand.id, "hand has no betting actions");
            return Ok(context);
        }

        let target = stream
            .get(index)
            .cloned()
            .ok_or_else(|| AnalysisError::InvalidDecision {
                index,
                reason: format!("hand has {} actions", stream.len()),
            })?;
        if !target.by_hero {
            return Err(AnalysisError::InvalidDecision {
                index,
                reason: format!("action belongs to {}", target.player_id),
            });
        }
        if !target.kind.is_aggressive() {
            return Err(AnalysisError::InvalidDecision {
                index,
                reason: format!("hero action is a {}", target.kind),
            });
        }

        let prior: Vec<ContextAction> = stream[..index].to_vec();
        let board = cards.board[..target.street.board_len()].to_vec();
        let pot: f64 = prior.iter().map(|a| a.amount).sum();
        let folded: HashSet<&str> = prior
            .iter()
            .filter(|a| a.kind == ActionKind::Fold)
            .map(|a| a.player_id.as_str())
            .collect();

        let invested = |id: &str| -> f64 {
            prior
                .iter()
                .filter(|a| a.player_id == id)
                .map(|a| a.amount)
                .sum()
        };
        let street_invested = |id: &str| -> f64 {
            prior
                .iter()
                .filter(|a| a.player_id == id && a.street == target.street)
                .map(|a| a.amount)
                .sum()
        };
        let stack_of = |id: &str| hand.players.iter().find(|p| p.id == id).map(|p| p.stack_size);

        let hero_id = context.hero_id.as_str();
        let hero_street = street_invested(hero_id);
        let max_street = prior
            .iter()
            .filter(|a| a.street == target.street)
            .map(|a| a.player_id.as_str())
            .collect::<HashSet<_>>()
            .into_iter()
            .map(street_invested)
            .fold(0.0f64, f64::max);
        let to_call = (max_street - hero_street).max(0.0);
        let hero_remaining = stack_of(hero_id)
            .map(|s| (s - invested(hero_id)).max(0.0))
            .unwrap_or(f64::INFINITY);

        let seats = occupied_seats(hand, hero_seat);
        let villain_id = prior
            .iter()
            .rev()
            .find(|a| !a.by_hero && !folded.contains(a.player_id.as_str()))
            .map(|a| a.player_id.clone())
            .or_else(|| {
                hand.players
                    .iter()
                    .find(|p| p.id != hero_id && p.is_active && !folded.contains(p.id.as_str()))
                    .map(|p| p.id.clone())
            });
        let hero_position = position_of(&seats, hand.button_position, hero_seat);
        let villain = villain_id.map(|id| {
            let seat = hand.players.iter().find(|p| p.id == id).map(|p| p.position);
            let remaining = stack_of(id.as_str())
                .map(|s| (s - invested(id.as_str())).max(0.0))
                .unwrap_or(f64::INFINITY);
            let in_position = seat.map(|seat| {
                postflop_rank(&seats, hand.button_position, seat)
                    > postflop_rank(&seats, hand.button_position, hero_seat)
            });
            Villain {
                position: seat.map(|seat| position_of(&seats, hand.button_position, seat)),
                id,
                seat,
                remaining,
                in_position,
            }
        });

        let effective_stack = match &villain {
            Some(v) => hero_remaining.min(v.remaining),
            None => hero_remaining,
        };
        let effective_stack = if effective_stack.is_finite() {
            effective_stack
        } else {
            0.0
        };
        let hero_remaining = if hero_remaining.is_finite() {
            hero_remaining
        } else {
            effective_stack
        };

        let seated = if hand.players.is_empty() {
            stream
                .iter()
                .map(|a| a.player_id.as_str())
                .collect::<HashSet<_>>()
                .difference(&folded)
                .count()
        } else {
            hand.players
                .iter()
                .filter(|p| p.is_active && !folded.contains(p.id.as_str()))
                .count()
        };
        let active_players = seated.max(2);

        debug!(
            hand = %context.hand_id,
            index,
            street = %target.street,
            pot,
            to_call,
            effective_stack,
            active_players,
            "action context extracted"
        );

        context.decision = Some(Decision {
            index,
            street: target.street,
            action: target,
            board,
            pot,
            to_call,
            hero_remaining,
            effective_stack,
            hero_position,
            villain,
            active_players,
            prior,
        });
        Ok(context)
    }
}

/// Checks street monotonicity, in-street ordering, and that every street that
/// carries actions was actually dealt.
fn ordered_stream(
    hand: &HandRecord,
    hero_id: &str,
    board_len: usize,
) -> Result<Vec<ContextAction>, AnalysisError> {
    let mut stream = Vec::with_capacity(hand.betting_actions.len());
    let mut last: Option<(Street, u32)> = None;
    let mut seen_on_street = 0u32;
    for (index, action) in hand.betting_actions.iter().enumerate() {
        if last.is_none_or(|(street, _)| street != action.street) {
            seen_on_street = 0;
        }
        let order = action.order.unwrap_or(seen_on_street);
        seen_on_street += 1;
        if let Some((street, previous)) = last {
            if action.street < street {
                return Err(AnalysisError::InconsistentStreet(format!(
                    "action {index} on {} follows {street}",
                    action.street
                )));
            }
            if action.street == street && order <= previous {
                return Err(AnalysisError::InconsistentStreet(format!(
                    "action {index} repeats or reverses order {previous} on {street}"
                )));
            }
        }
        if action.street.board_len() > board_len {
            return Err(AnalysisError::InconsistentStreet(format!(
                "action {index} on {} but only {board_len} board cards were dealt",
                action.street
            )));
        }
        last = Some((action.street, order));
        stream.push(ContextAction {
            index,
            player_id: action.player_id.clone(),
            kind: action.action,
            amount: action.amount,
            street: action.street,
            order,
            by_hero: action.player_id == hero_id,
        });
    }
    Ok(stream)
}

fn occupied_seats(hand: &HandRecord, hero_seat: u8) -> Vec<u8> {
    let mut seats: Vec<u8> = hand.players.iter().map(|p| p.position).collect();
    if !seats.contains(&hero_seat) {
        seats.push(hero_seat);
    }
    seats.sort_unstable();
    seats.dedup();
    seats
}

/// Occupied seats clockwise from the button, the button itself being 0.
fn seat_offset(seats: &[u8], button: u8, seat: u8) -> usize {
    let distance = |s: u8| (s + SEATS - button % SEATS) % SEATS;
    let mut ordered: Vec<u8> = seats.to_vec();
    ordered.sort_by_key(|&s| distance(s));
    // an empty button seat belongs to the next occupied seat behind it
    let shift = usize::from(!seats.contains(&button));
    let idx = ordered.iter().position(|&s| s == seat).unwrap_or(0);
    (idx + shift) % seats.len().max(1)
}

fn position_of(seats: &[u8], button: u8, seat: u8) -> Position {
    Position::from_offset(seat_offset(seats, button, seat), seats.len())
}

/// Postflop acting order; higher acts later.
fn postflop_rank(seats: &[u8], button: u8, seat: u8) -> usize {
    let n = seats.len().max(1);
    (seat_offset(seats, button, seat) + n - 1) % n
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hand::{BettingAction, CommunityCards, Player};

    fn hand(actions: Vec<BettingAction>) -> HandRecord {
        HandRecord {
            id: "ctx".into(),
            username: Some("hero".into()),
            hero_hole_cards: vec!["Ah".into(), "Kh".into()],
            community_cards: CommunityCards {
                flop: Some(vec!["2h".into(), "7h".into(), "Qc".into()]),
                turn: Some("3s".into()),
                river: None,
            },
            betting_actions: actions,
            players: vec![
                Player { id: "hero".into(), position: 0, stack_size: 200.0, is_active: true },
                Player { id: "villain".into(), position: 1, stack_size: 150.0, is_active: true },
            ],
            button_position: 0,
            hero_position: 0,
            game_type: GameType::Cash,
            tournament_name: None,
        }
    }

    fn act(id: &str, kind: ActionKind, amount: f64, street: Street, order: u32) -> BettingAction {
        BettingAction::new(id, kind, amount, street, order)
    }

    #[test]
    fn empty_stream_yields_empty_context() {
        let ctx = ActionContext::extract(&hand(vec![]), 0).unwrap();
        assert!(ctx.decision.is_none());
        assert!(ctx.postflop.is_empty());
    }

    #[test]
    fn turn_bet_sees_four_cards_and_prior_pot() {
        let ctx = ActionContext::extract(
            &hand(vec![
                act("hero", ActionKind::Raise, 6.0, Street::Preflop, 0),
                act("villain", ActionKind::Call, 6.0, Street::Preflop, 1),
                act("villain", ActionKind::Check, 0.0, Street::Flop, 0),
                act("hero", ActionKind::Bet, 8.0, Street::Flop, 1),
                act("villain", ActionKind::Call, 8.0, Street::Flop, 2),
                act("villain", ActionKind::Check, 0.0, Street::Turn, 0),
                act("hero", ActionKind::Bet, 20.0, Street::Turn, 1),
            ]),
            6,
        )
        .unwrap();
        let decision = ctx.decision.unwrap();
        assert_eq!(decision.board.len(), 4);
        assert_eq!(decision.pot, 28.0);
        assert_eq!(decision.to_call, 0.0);
        assert_eq!(decision.effective_stack, 136.0);
        assert_eq!(ctx.postflop.len(), 5);
        let villain = decision.villain.unwrap();
        assert_eq!(villain.id, "villain");
        // heads-up: the button acts last postflop
        assert_eq!(villain.in_position, Some(false));
        assert_eq!(decision.hero_position, Position::Btn);
    }

    #[test]
    fn action_on_undealt_street_is_inconsistent() {
        let err = ActionContext::extract(
            &hand(vec![act("hero", ActionKind::Bet, 5.0, Street::River, 0)]),
            0,
        )
        .unwrap_err();
        assert!(matches!(err, AnalysisError::InconsistentStreet(_)));
    }

    #[test]
    fn street_regression_is_inconsistent() {
        let err = ActionContext::extract(
            &hand(vec![
                act("hero", ActionKind::Bet, 5.0, Street::Flop, 0),
                act("villain", ActionKind::Call, 5.0, Street::Preflop, 1),
            ]),
            0,
        )
        .unwrap_err();
        assert!(matches!(err, AnalysisError::InconsistentStreet(_)));
    }

    #[test]
    fn callable_bet_stops_at_villain_stack() {
        let actions = vec![
            act("hero", ActionKind::Raise, 6.0, Street::Preflop, 0),
            act("villain", ActionKind::Call, 6.0, Street::Preflop, 1),
            act("villain", ActionKind::Bet, 10.0, Street::Flop, 0),
            act("hero", ActionKind::Raise, 500.0, Street::Flop, 1),
        ];
        let decision = ActionContext::extract(&hand(actions.clone()), 3)
            .unwrap()
            .decision
            .unwrap();
        assert_eq!(decision.to_call, 10.0);
        assert_eq!(decision.bet_cap(), Some(144.0));
        assert_eq!(decision.callable(500.0), 144.0);
        assert_eq!(decision.callable(40.0), 40.0);
        assert_eq!(decision.all_in(), 144.0);

        let mut unknown = hand(actions);
        unknown.players.retain(|p| p.id == "hero");
        let decision = ActionContext::extract(&unknown, 3).unwrap().decision.unwrap();
        assert_eq!(decision.bet_cap(), None);
        assert_eq!(decision.callable(500.0), 500.0);
    }

    #[test]
    fn missing_order_follows_document_position() {
        let raw = r#"[
            { "playerId": "hero", "action": "raise", "amount": 6, "street": "preflop" },
            { "playerId": "villain", "action": "call", "amount": 6, "street": "preflop" },
            { "playerId": "villain", "action": "check", "amount": 0, "street": "flop" },
            { "playerId": "hero", "action": "bet", "amount": 8, "street": "flop" }
        ]"#;
        let actions: Vec<BettingAction> = serde_json::from_str(raw).unwrap();
        assert!(actions.iter().all(|a| a.order.is_none()));

        let ctx = ActionContext::extract(&hand(actions), 3).unwrap();
        let decision = ctx.decision.unwrap();
        assert_eq!(decision.pot, 12.0);
        assert_eq!(decision.action.order, 1);
        let orders: Vec<u32> = ctx.postflop.iter().map(|a| a.order).collect();
        assert_eq!(orders, [0, 1]);
    }

    #[test]
    fn explicit_order_still_must_increase() {
        let mut actions = vec![
            act("villain", ActionKind::Check, 0.0, Street::Flop, 2),
            act("hero", ActionKind::Bet, 8.0, Street::Flop, 1),
        ];
        let err = ActionContext::extract(&hand(actions.clone()), 1).unwrap_err();
        assert!(matches!(err, AnalysisError::InconsistentStreet(_)));

        actions.iter_mut().for_each(|a| a.order = None);
        assert!(ActionContext::extract(&hand(actions), 1).is_ok());
    }

    #[test]
    fn villain_action_is_not_a_decision() {
        let err = ActionContext::extract(
            &hand(vec![act("villain", ActionKind::Bet, 5.0, Street::Flop, 0)]),
            0,
        )
        .unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidDecision { index: 0, .. }));
    }
}
