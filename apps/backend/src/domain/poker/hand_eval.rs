//! Five-card hand ranking over five to seven cards.
//!
//! Ranks run 1 (royal flush, best) to 10 (high card, worst), the way players
//! name them; [`HandValue`] orders so that a greater value is a better hand.

use std::cmp::Ordering;

use serde::Serialize;

use crate::domain::cards::Card;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HandRank {
    RoyalFlush = 1,
    StraightFlush = 2,
    FourOfAKind = 3,
    FullHouse = 4,
    Flush = 5,
    Straight = 6,
    ThreeOfAKind = 7,
    TwoPair = 8,
    OnePair = 9,
    HighCard = 10,
}

impl HandRank {
    pub fn number(self) -> u8 {
        self as u8
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HandValue {
    pub rank: HandRank,
    /// Card values (2..=14) compared lexicographically within a rank.
    pub tiebreak: Vec<u8>,
}

impl Ord for HandValue {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .rank
            .number()
            .cmp(&self.rank.number())
            .then_with(|| self.tiebreak.cmp(&other.tiebreak))
    }
}

impl PartialOrd for HandValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// High card of a straight in `desc` (distinct values, descending), with the
/// wheel A-2-3-4-5 counting as five-high.
fn straight_high(desc: &[u8]) -> Option<u8> {
    if desc.len() != 5 {
        return None;
    }
    if desc.windows(2).all(|w| w[0] == w[1] + 1) {
        return Some(desc[0]);
    }
    if desc == [14, 5, 4, 3, 2] {
        return Some(5);
    }
    None
}

/// Rank exactly five cards.
pub fn evaluate_five(cards: &[Card; 5]) -> HandValue {
    let mut values: Vec<u8> = cards.iter().map(|c| c.rank.value()).collect();
    values.sort_unstable_by(|a, b| b.cmp(a));
    let flush = cards.iter().all(|c| c.suit == cards[0].suit);

    let mut distinct = values.clone();
    distinct.dedup();
    let straight = straight_high(&distinct);

    // (count, value) groups, biggest group first, then higher value.
    let mut groups: Vec<(u8, u8)> = distinct
        .iter()
        .map(|v| (values.iter().filter(|x| *x == v).count() as u8, *v))
        .collect();
    groups.sort_unstable_by(|a, b| b.cmp(a));
    let grouped: Vec<u8> = groups.iter().map(|(_, v)| *v).collect();

    let (rank, tiebreak) = match (straight, flush, groups[0].0, groups.get(1).map(|g| g.0)) {
        (Some(14), true, _, _) => (HandRank::RoyalFlush, vec![14]),
        (Some(high), true, _, _) => (HandRank::StraightFlush, vec![high]),
        (_, _, 4, _) => (HandRank::FourOfAKind, grouped),
        (_, _, 3, Some(2)) => (HandRank::FullHouse, grouped),
        (_, true, _, _) => (HandRank::Flush, values),
        (Some(high), false, _, _) => (HandRank::Straight, vec![high]),
        (_, _, 3, _) => (HandRank::ThreeOfAKind, grouped),
        (_, _, 2, Some(2)) => (HandRank::TwoPair, grouped),
        (_, _, 2, _) => (HandRank::OnePair, grouped),
        _ => (HandRank::HighCard, values),
    };
    HandValue { rank, tiebreak }
}

/// Best five-card value from 5..=7 cards by trying every combination.
/// Returns `None` for fewer than five cards.
pub fn evaluate_best(cards: &[Card]) -> Option<HandValue> {
    let n = cards.len();
    if n < 5 {
        return None;
    }
    let mut best: Option<HandValue> = None;
    for a in 0..n {
        for b in a + 1..n {
            for c in b + 1..n {
                for d in c + 1..n {
                    for e in d + 1..n {
                        let five = [cards[a], cards[b], cards[c], cards[d], cards[e]];
                        let value = evaluate_five(&five);
                        if best.as_ref().is_none_or(|b| value > *b) {
                            best = Some(value);
                        }
                    }
                }
            }
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::domain::cards::{cards, full_deck};

    fn best(codes: &str) -> HandValue {
        evaluate_best(&cards(codes)).unwrap()
    }

    #[test]
    fn classifies_every_rank() {
        assert_eq!(best("AS KS QS JS TS").rank, HandRank::RoyalFlush);
        assert_eq!(best("9H 8H 7H 6H 5H").rank, HandRank::StraightFlush);
        assert_eq!(best("9H 9D 9S 9C 5H").rank, HandRank::FourOfAKind);
        assert_eq!(best("9H 9D 9S 5C 5H").rank, HandRank::FullHouse);
        assert_eq!(best("2H 9H JH 4H 5H").rank, HandRank::Flush);
        assert_eq!(best("AH 2D 3S 4C 5H").rank, HandRank::Straight);
        assert_eq!(best("9H 9D 9S 4C 5H").rank, HandRank::ThreeOfAKind);
        assert_eq!(best("9H 9D 4S 4C 5H").rank, HandRank::TwoPair);
        assert_eq!(best("9H 9D 3S 4C 5H").rank, HandRank::OnePair);
        assert_eq!(best("9H KD 3S 4C 6H").rank, HandRank::HighCard);
    }

    #[test]
    fn wheel_is_the_lowest_straight() {
        let wheel = best("AH 2D 3S 4C 5H");
        let six_high = best("2D 3S 4C 5H 6D");
        assert_eq!(wheel.tiebreak, vec![5]);
        assert!(six_high > wheel);
    }

    #[test]
    fn kickers_break_ties() {
        assert!(best("AH AD KS 4C 3H") > best("AH AD QS JC TH"));
        assert_eq!(best("AH AD KS 4C 3H"), best("AC AS KD 4H 3D"));
        assert!(best("KH KD 2S 2C 3H") > best("QH QD JS JC AH"));
    }

    #[test]
    fn best_of_seven_uses_the_board() {
        // Hole 2C 7D, board makes a heart flush.
        let v = best("2C 7D AH KH 9H 4H 3H");
        assert_eq!(v.rank, HandRank::Flush);
        assert_eq!(v.tiebreak, vec![14, 13, 9, 4, 3]);
    }

    #[test]
    fn fewer_than_five_cards() {
        assert!(evaluate_best(&cards("AH KH")).is_none());
    }

    proptest! {
        #[test]
        fn best_of_seven_is_at_least_any_five(idx in prop::sample::subsequence((0..52).collect::<Vec<usize>>(), 7)) {
            let deck = full_deck();
            let seven: Vec<Card> = idx.iter().map(|i| deck[*i]).collect();
            let best = evaluate_best(&seven).unwrap();
            let five = [seven[0], seven[1], seven[2], seven[3], seven[4]];
            prop_assert!(best >= evaluate_five(&five));
            prop_assert!((1..=10).contains(&best.rank.number()));
        }
    }
}
