use serde::{Deserialize, Serialize};

use crate::analyser::EvAnalysis;
use crate::cards::{Card, Combo, mask_of};
use crate::error::AnalysisError;
use crate::game::{ActionKind, GameType, Street};

pub const MAX_SEAT: u8 = 8;

/// A stored hand history, as the document store and the HTTP surface see it.
/// Card fields stay as strings so malformed input surfaces as
/// [`AnalysisError::InvalidCard`] instead of a deserialisation failure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HandRecord {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default)]
    pub hero_hole_cards: Vec<String>,
    #[serde(default)]
    pub community_cards: CommunityCards,
    #[serde(default)]
    pub betting_actions: Vec<BettingAction>,
    #[serde(default)]
    pub players: Vec<Player>,
    #[serde(default)]
    pub button_position: u8,
    #[serde(default)]
    pub hero_position: u8,
    #[serde(default)]
    pub game_type: GameType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tournament_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct CommunityCards {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flop: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub turn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub river: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BettingAction {
    pub player_id: String,
    pub action: ActionKind,
    #[serde(default)]
    pub amount: f64,
    pub street: Street,
    /// Position within the street. Absent orders follow document position.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ev_analysis: Option<EvAnalysis>,
}

impl BettingAction {
    pub fn new(player_id: &str, action: ActionKind, amount: f64, street: Street, order: u32) -> Self {
        Self {
            player_id: player_id.to_string(),
            action,
            amount,
            street,
            order: Some(order),
            ev_analysis: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: String,
    pub position: u8,
    pub stack_size: f64,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

/// Parsed, cross-checked cards of a hand.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidCards {
    pub hero: Combo,
    /// Reached board prefix: flop, then turn, then river. A missing street
    /// truncates everything after it.
    pub board: Vec<Card>,
}

impl ValidCards {
    pub fn dead_mask(&self) -> u64 {
        self.hero.mask() | mask_of(&self.board)
    }
}

impl HandRecord {
    /// Structural validation of the document: card syntax, hole-card count,
    /// flop shape, seat range, amounts, and card uniqueness.
    pub fn validate(&self) -> Result<ValidCards, AnalysisError> {
        if self.hero_hole_cards.is_empty() {
            return Err(AnalysisError::MissingHeroCards);
        }
        let hole = parse_all(&self.hero_hole_cards)?;
        if hole.len() != 2 {
            return Err(AnalysisError::InvalidHand(format!(
                "expected two hero hole cards, found {}",
                hole.len()
            )));
        }
        let hero = Combo::new(hole[0], hole[1]).ok_or_else(|| {
            AnalysisError::InvalidHand("hero hole cards are identical".to_string())
        })?;

        let mut board = Vec::with_capacity(5);
        if let Some(flop) = &self.community_cards.flop {
            let flop = parse_all(flop)?;
            if flop.len() != 3 {
                return Err(AnalysisError::InvalidHand(format!(
                    "flop must have three cards, found {}",
                    flop.len()
                )));
            }
            board.extend(flop);
            if let Some(turn) = &self.community_cards.turn {
                board.push(turn.parse()?);
                if let Some(river) = &self.community_cards.river {
                    board.push(river.parse()?);
                }
            } else if let Some(river) = &self.community_cards.river {
                // still syntax-checked even though the street is unreached
                river.parse::<Card>()?;
            }
        } else {
            for card in [&self.community_cards.turn, &self.community_cards.river]
                .into_iter()
                .flatten()
            {
                card.parse::<Card>()?;
            }
        }

        let mut seen = hero.mask();
        for card in &board {
            if seen & card.mask() != 0 {
                return Err(AnalysisError::InvalidHand(format!(
                    "card {card} appears more than once"
                )));
            }
            seen |= card.mask();
        }

        for seat in self
            .players
            .iter()
            .map(|p| p.position)
            .chain([self.button_position, self.hero_position])
        {
            if seat > MAX_SEAT {
                return Err(AnalysisError::InvalidHand(format!("seat {seat} out of range")));
            }
        }
        for player in &self.players {
            if !player.stack_size.is_finite() || player.stack_size < 0.0 {
                return Err(AnalysisError::InvalidHand(format!(
                    "player {} has an invalid stack",
                    player.id
                )));
            }
        }
        if let Some((index, _)) = self
            .betting_actions
            .iter()
            .enumerate()
            .find(|(_, a)| !a.amount.is_finite() || a.amount < 0.0)
        {
            return Err(AnalysisError::InvalidHand(format!(
                "action {index} has a negative or non-finite amount"
            )));
        }

        Ok(ValidCards { hero, board })
    }

    /// Identifier of the hero: the player named like `username`, else the one
    /// sitting in `heroPosition`.
    pub fn hero_id(&self) -> Option<&str> {
        if let Some(name) = &self.username
            && let Some(player) = self.players.iter().find(|p| &p.id == name)
        {
            return Some(&player.id);
        }
        self.players
            .iter()
            .find(|p| p.position == self.hero_position)
            .map(|p| p.id.as_str())
            .or(self.username.as_deref())
    }

    /// Indices of every hero bet or raise, in document order.
    pub fn hero_decisions(&self) -> Vec<usize> {
        let Some(hero) = self.hero_id() else {
            return Vec::new();
        };
        self.betting_actions
            .iter()
            .enumerate()
            .filter(|(_, a)| a.player_id == hero && a.action.is_aggressive())
            .map(|(i, _)| i)
            .collect()
    }
}

fn parse_all(cards: &[String]) -> Result<Vec<Card>, AnalysisError> {
    cards
        .iter()
        .map(|c| c.parse::<Card>().map_err(AnalysisError::from))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> HandRecord {
        HandRecord {
            id: "h1".into(),
            username: Some("hero".into()),
            hero_hole_cards: vec!["Ah".into(), "Kd".into()],
            community_cards: CommunityCards {
                flop: Some(vec!["2c".into(), "7d".into(), "9s".into()]),
                turn: None,
                river: Some("Qs".into()),
            },
            betting_actions: vec![],
            players: vec![
                Player { id: "hero".into(), position: 1, stack_size: 100.0, is_active: true },
                Player { id: "villain".into(), position: 4, stack_size: 100.0, is_active: true },
            ],
            button_position: 1,
            hero_position: 1,
            game_type: GameType::Cash,
            tournament_name: None,
        }
    }

    #[test]
    fn missing_turn_truncates_river() {
        let cards = record().validate().unwrap();
        assert_eq!(cards.board.len(), 3);
    }

    #[test]
    fn empty_hole_cards_are_missing() {
        let mut hand = record();
        hand.hero_hole_cards.clear();
        assert_eq!(hand.validate(), Err(AnalysisError::MissingHeroCards));
    }

    #[test]
    fn malformed_card_is_reported_verbatim() {
        let mut hand = record();
        hand.hero_hole_cards[1] = "1x".into();
        assert_eq!(hand.validate(), Err(AnalysisError::InvalidCard("1x".into())));
    }

    #[test]
    fn duplicate_across_hole_and_board_rejected() {
        let mut hand = record();
        hand.community_cards.flop = Some(vec!["Ah".into(), "7d".into(), "9s".into()]);
        assert!(matches!(hand.validate(), Err(AnalysisError::InvalidHand(_))));
    }

    #[test]
    fn hero_resolved_by_username_then_seat() {
        let mut hand = record();
        assert_eq!(hand.hero_id(), Some("hero"));
        hand.username = None;
        hand.hero_position = 4;
        assert_eq!(hand.hero_id(), Some("villain"));
    }
}
