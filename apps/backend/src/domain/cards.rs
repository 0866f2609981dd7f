//! Playing cards shared by blackjack and poker.

use std::fmt;

use serde::{Serialize, Serializer};

use crate::domain::rng::GameRng;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Suit {
    Clubs,
    Diamonds,
    Hearts,
    Spades,
}

pub const SUITS: [Suit; 4] = [Suit::Clubs, Suit::Diamonds, Suit::Hearts, Suit::Spades];

#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Rank {
    Two,
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

pub const RANKS: [Rank; 13] = [
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

impl Rank {
    /// Ace-high numeric value, 2..=14.
    pub fn value(self) -> u8 {
        self as u8 + 2
    }

    fn symbol(self) -> char {
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
}

impl Suit {
    fn symbol(self) -> char {
        match self {
            Suit::Clubs => 'C',
            Suit::Diamonds => 'D',
            Suit::Hearts => 'H',
            Suit::Spades => 'S',
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Card {
    pub rank: Rank,
    pub suit: Suit,
}

impl Card {
    pub const fn new(rank: Rank, suit: Suit) -> Self {
        Self { rank, suit }
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.rank.symbol(), self.suit.symbol())
    }
}

// Wire format is the two-character code ("AS", "TD").
impl Serialize for Card {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Generate a full 52-card deck in standard order.
pub fn full_deck() -> Vec<Card> {
    let mut deck = Vec::with_capacity(52);
    for suit in SUITS {
        for rank in RANKS {
            deck.push(Card { rank, suit });
        }
    }
    deck
}

/// A shuffled deck of `decks` × 52 cards; callers draw with `pop()`.
pub fn shuffled_shoe(decks: u8, rng: &mut GameRng) -> Vec<Card> {
    let mut shoe = Vec::with_capacity(decks as usize * 52);
    for _ in 0..decks {
        shoe.extend(full_deck());
    }
    rng.shuffle(&mut shoe);
    shoe
}

#[cfg(test)]
pub(crate) fn card(code: &str) -> Card {
    let mut chars = code.chars();
    let rank = match chars.next() {
        Some('2') => Rank::Two,
        Some('3') => Rank::Three,
        Some('4') => Rank::Four,
        Some('5') => Rank::Five,
        Some('6') => Rank::Six,
        Some('7') => Rank::Seven,
        Some('8') => Rank::Eight,
        Some('9') => Rank::Nine,
        Some('T') => Rank::Ten,
        Some('J') => Rank::Jack,
        Some('Q') => Rank::Queen,
        Some('K') => Rank::King,
        Some('A') => Rank::Ace,
        other => panic!("bad rank in {code}: {other:?}"),
    };
    let suit = match chars.next() {
        Some('C') => Suit::Clubs,
        Some('D') => Suit::Diamonds,
        Some('H') => Suit::Hearts,
        Some('S') => Suit::Spades,
        other => panic!("bad suit in {code}: {other:?}"),
    };
    Card { rank, suit }
}

#[cfg(test)]
pub(crate) fn cards(codes: &str) -> Vec<Card> {
    codes.split_whitespace().map(card).collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn full_deck_has_52_unique_cards() {
        let deck = full_deck();
        assert_eq!(deck.len(), 52);
        let unique: HashSet<_> = deck.iter().collect();
        assert_eq!(unique.len(), 52);
    }

    #[test]
    fn shoe_holds_every_card_once_per_deck() {
        let mut rng = GameRng::from_u64(11);
        let shoe = shuffled_shoe(6, &mut rng);
        assert_eq!(shoe.len(), 312);
        let aces_of_spades = shoe
            .iter()
            .filter(|c| **c == Card::new(Rank::Ace, Suit::Spades))
            .count();
        assert_eq!(aces_of_spades, 6);
    }

    #[test]
    fn card_serializes_as_code() {
        let json = serde_json::to_string(&card("TD")).unwrap();
        assert_eq!(json, "\"TD\"");
    }
}
