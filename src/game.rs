use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Street {
    Preflop,
    Flop,
    Turn,
    River,
}

impl Street {
    /// Community cards visible once this street is dealt.
    pub fn board_len(self) -> usize {
        match self {
            Street::Preflop => 0,
            Street::Flop => 3,
            Street::Turn => 4,
            Street::River => 5,
        }
    }

    pub fn is_postflop(self) -> bool {
        self != Street::Preflop
    }
}

impl Display for Street {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Street::Preflop => "preflop",
            Street::Flop => "flop",
            Street::Turn => "turn",
            Street::River => "river",
        })
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Fold,
    Check,
    Call,
    Bet,
    Raise,
}

impl ActionKind {
    pub fn is_aggressive(self) -> bool {
        matches!(self, ActionKind::Bet | ActionKind::Raise)
    }
}

impl Display for ActionKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ActionKind::Fold => "fold",
            ActionKind::Check => "check",
            ActionKind::Call => "call",
            ActionKind::Bet => "bet",
            ActionKind::Raise => "raise",
        })
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum GameType {
    #[default]
    Cash,
    Tournament,
}

/// Seat label relative to the button.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum Position {
    Btn,
    Sb,
    Bb,
    Utg,
    Mp,
    Hj,
    Co,
}

impl Position {
    /// `offset` is the number of occupied seats clockwise from the button,
    /// `players` the number of occupied seats.
    pub fn from_offset(offset: usize, players: usize) -> Self {
        if players <= 2 {
            return if offset == 0 { Position::Btn } else { Position::Bb };
        }
        match offset {
            0 => Position::Btn,
            1 => Position::Sb,
            2 => Position::Bb,
            _ => {
                let from_button = players - offset;
                match from_button {
                    1 => Position::Co,
                    2 => Position::Hj,
                    _ if offset == 3 => Position::Utg,
                    _ => Position::Mp,
                }
            }
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Position::Btn => "BTN",
            Position::Sb => "SB",
            Position::Bb => "BB",
            Position::Utg => "UTG",
            Position::Mp => "MP",
            Position::Hj => "HJ",
            Position::Co => "CO",
        }
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Bet size relative to the pot it goes into.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BetSizeCategory {
    Small,
    Medium,
    Large,
    VeryLarge,
    AllIn,
}

impl BetSizeCategory {
    pub fn classify(bet: f64, pot: f64, effective_stack: f64) -> Self {
        if effective_stack > 0.0 && bet >= effective_stack {
            return BetSizeCategory::AllIn;
        }
        if pot <= 0.0 {
            return BetSizeCategory::VeryLarge;
        }
        let ratio = bet / pot;
        if ratio <= 1.0 / 3.0 {
            BetSizeCategory::Small
        } else if ratio <= 1.0 {
            BetSizeCategory::Medium
        } else if ratio <= 2.0 {
            BetSizeCategory::Large
        } else {
            BetSizeCategory::VeryLarge
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn six_handed_labels() {
        let labels: Vec<_> = (0..6).map(|o| Position::from_offset(o, 6).label()).collect();
        assert_eq!(labels, ["BTN", "SB", "BB", "UTG", "HJ", "CO"]);
    }

    #[test]
    fn nine_handed_has_middle_positions() {
        assert_eq!(Position::from_offset(3, 9), Position::Utg);
        assert_eq!(Position::from_offset(5, 9), Position::Mp);
        assert_eq!(Position::from_offset(8, 9), Position::Co);
    }

    #[test]
    fn bet_size_buckets() {
        assert_eq!(BetSizeCategory::classify(30.0, 100.0, 1000.0), BetSizeCategory::Small);
        assert_eq!(BetSizeCategory::classify(75.0, 100.0, 1000.0), BetSizeCategory::Medium);
        assert_eq!(BetSizeCategory::classify(150.0, 100.0, 1000.0), BetSizeCategory::Large);
        assert_eq!(BetSizeCategory::classify(250.0, 100.0, 1000.0), BetSizeCategory::VeryLarge);
        assert_eq!(BetSizeCategory::classify(300.0, 100.0, 300.0), BetSizeCategory::AllIn);
    }
}
