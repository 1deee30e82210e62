use std::fmt::{Display, Formatter};
use std::str::FromStr;

use itertools::Itertools;
use serde_with::{DeserializeFromStr, SerializeDisplay};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid card '{0}'")]
pub struct ParseCardError(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub enum Suit {
    Clubs,
    Diamonds,
    Hearts,
    Spades,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Clubs, Suit::Diamonds, Suit::Hearts, Suit::Spades];

    pub fn index(self) -> usize {
        match self {
            Suit::Clubs => 0,
            Suit::Diamonds => 1,
            Suit::Hearts => 2,
            Suit::Spades => 3,
        }
    }

    pub fn letter(self) -> char {
        match self {
            Suit::Clubs => 'c',
            Suit::Diamonds => 'd',
            Suit::Hearts => 'h',
            Suit::Spades => 's',
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Suit::Clubs => "♣",
            Suit::Diamonds => "♦",
            Suit::Hearts => "♥",
            Suit::Spades => "♠",
        }
    }

    fn from_letter(c: char) -> Option<Self> {
        match c {
            'c' => Some(Suit::Clubs),
            'd' => Some(Suit::Diamonds),
            'h' => Some(Suit::Hearts),
            's' => Some(Suit::Spades),
            _ => None,
        }
    }
}

impl Display for Suit {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.letter())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
#[repr(u8)]
pub enum Rank {
    Two = 2,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
    Nine,
    Ten,
    Jack,
    Queen,
    King,
    Ace,
}

impl Rank {
    pub const ALL: [Rank; 13] = [
        Rank::Two,
        Rank::Three,
        Rank::Four,
        Rank::Five,
        Rank::Six,
        Rank::Seven,
        Rank::Eight,
        Rank::Nine,
        Rank::Ten,
        Rank::Jack,
        Rank::Queen,
        Rank::King,
        Rank::Ace,
    ];

    pub fn value(self) -> u8 {
        self as u8
    }

    pub fn short_label(self) -> char {
        match self {
            Rank::Two => '2',
            Rank::Three => '3',
            Rank::Four => '4',
            Rank::Five => '5',
            Rank::Six => '6',
            Rank::Seven => '7',
            Rank::Eight => '8',
            Rank::Nine => '9',
            Rank::Ten => 'T',
            Rank::Jack => 'J',
            Rank::Queen => 'Q',
            Rank::King => 'K',
            Rank::Ace => 'A',
        }
    }

    /// Only the canonical upper-case labels are accepted; hand documents never
    /// carry "10" or lower-case faces.
    fn from_label(c: char) -> Option<Self> {
        Rank::ALL.into_iter().find(|rank| rank.short_label() == c)
    }
}

impl Display for Rank {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.short_label())
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, SerializeDisplay, DeserializeFromStr,
)]
pub struct Card {
    pub rank: Rank,
    pub suit: Suit,
}

impl Card {
    pub fn new(rank: Rank, suit: Suit) -> Self {
        Self { rank, suit }
    }

    pub fn rank_value(&self) -> u8 {
        self.rank.value()
    }

    /// Dense index in 0..52, rank-major.
    pub fn index(&self) -> u8 {
        (self.rank_value() - 2) * 4 + self.suit.index() as u8
    }

    pub fn mask(&self) -> u64 {
        1u64 << self.index()
    }

    /// Symbol form used by the terminal report, e.g. `A♠`.
    pub fn pretty(&self) -> String {
        format!("{}{}", self.rank.short_label(), self.suit.symbol())
    }
}

impl Display for Card {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.rank, self.suit)
    }
}

impl FromStr for Card {
    type Err = ParseCardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        match (chars.next(), chars.next(), chars.next()) {
            (Some(r), Some(su), None) => {
                let rank = Rank::from_label(r).ok_or_else(|| ParseCardError(s.to_string()))?;
                let suit = Suit::from_letter(su).ok_or_else(|| ParseCardError(s.to_string()))?;
                Ok(Card::new(rank, suit))
            }
            _ => Err(ParseCardError(s.to_string())),
        }
    }
}

/// Parses a whitespace or comma separated list such as `"As Kh, Qc"`.
pub fn parse_cards(s: &str) -> Result<Vec<Card>, ParseCardError> {
    s.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|part| !part.is_empty())
        .map(str::parse)
        .collect()
}

pub fn standard_deck() -> Vec<Card> {
    let mut cards = Vec::with_capacity(52);
    for suit in Suit::ALL {
        for rank in Rank::ALL {
            cards.push(Card::new(rank, suit));
        }
    }
    cards
}

/// Bit set over the 52 cards.
pub fn mask_of(cards: &[Card]) -> u64 {
    cards.iter().fold(0, |acc, card| acc | card.mask())
}

/// Deck with every card in `dead` removed, in standard order.
pub fn live_deck(dead: u64) -> Vec<Card> {
    standard_deck()
        .into_iter()
        .filter(|card| dead & card.mask() == 0)
        .collect()
}

/// An unordered two-card holding, stored high card first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Combo {
    pub high: Card,
    pub low: Card,
}

impl Combo {
    /// `None` when both cards are the same.
    pub fn new(a: Card, b: Card) -> Option<Self> {
        match a.index().cmp(&b.index()) {
            std::cmp::Ordering::Greater => Some(Self { high: a, low: b }),
            std::cmp::Ordering::Less => Some(Self { high: b, low: a }),
            std::cmp::Ordering::Equal => None,
        }
    }

    pub fn cards(&self) -> [Card; 2] {
        [self.high, self.low]
    }

    pub fn mask(&self) -> u64 {
        self.high.mask() | self.low.mask()
    }

    pub fn intersects(&self, dead: u64) -> bool {
        self.mask() & dead != 0
    }

    pub fn is_pair(&self) -> bool {
        self.high.rank == self.low.rank
    }

    pub fn is_suited(&self) -> bool {
        self.high.suit == self.low.suit
    }
}

impl Display for Combo {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.high, self.low)
    }
}

/// All 1 326 two-card combos, in a fixed order.
pub fn all_combos() -> Vec<Combo> {
    standard_deck()
        .into_iter()
        .tuple_combinations()
        .filter_map(|(a, b)| Combo::new(a, b))
        .collect()
}
