use serde::Serialize;

use crate::domain::cards::{Card, Rank};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HandStatus {
    Active,
    Stood,
    Busted,
    Blackjack,
    Surrendered,
}

fn card_points(rank: Rank) -> u8 {
    match rank {
        Rank::Ace => 11,
        Rank::Ten | Rank::Jack | Rank::Queen | Rank::King => 10,
        other => other.value(),
    }
}

/// Best total not above 21 where possible, and whether an ace still counts 11.
pub fn hand_value(cards: &[Card]) -> (u8, bool) {
    let mut total: u32 = cards.iter().map(|c| card_points(c.rank) as u32).sum();
    let mut soft_aces = cards.iter().filter(|c| c.rank == Rank::Ace).count();
    while total > 21 && soft_aces > 0 {
        total -= 10;
        soft_aces -= 1;
    }
    (total.min(u8::MAX as u32) as u8, soft_aces > 0)
}

pub fn is_natural(cards: &[Card]) -> bool {
    cards.len() == 2 && hand_value(cards).0 == 21
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Hand {
    pub cards: Vec<Card>,
    pub bet: i64,
    pub status: HandStatus,
    pub doubled: bool,
    pub from_split: bool,
    pub payout: Option<i64>,
}

impl Hand {
    pub fn new(cards: Vec<Card>, bet: i64, from_split: bool) -> Self {
        let mut hand = Self {
            cards,
            bet,
            status: HandStatus::Active,
            doubled: false,
            from_split,
            payout: None,
        };
        hand.refresh_status();
        hand
    }

    pub fn total(&self) -> u8 {
        hand_value(&self.cards).0
    }

    /// Split hands never count as blackjack.
    pub fn is_blackjack(&self) -> bool {
        !self.from_split && is_natural(&self.cards)
    }

    pub fn is_pair(&self) -> bool {
        self.cards.len() == 2 && self.cards[0].rank == self.cards[1].rank
    }

    /// Recompute status from the cards. Terminal choices (stood, surrendered)
    /// are kept; totals of 21 and above end the hand.
    pub fn refresh_status(&mut self) {
        if matches!(self.status, HandStatus::Stood | HandStatus::Surrendered) {
            if self.total() > 21 {
                self.status = HandStatus::Busted;
            }
            return;
        }
        let total = self.total();
        self.status = if self.is_blackjack() {
            HandStatus::Blackjack
        } else if total > 21 {
            HandStatus::Busted
        } else if total == 21 {
            HandStatus::Stood
        } else {
            HandStatus::Active
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cards::cards;

    #[test]
    fn aces_drop_to_one_when_needed() {
        assert_eq!(hand_value(&cards("AS 6D")), (17, true));
        assert_eq!(hand_value(&cards("AS 6D KH")), (17, false));
        assert_eq!(hand_value(&cards("AS AD")), (12, true));
        assert_eq!(hand_value(&cards("KS QD 5H")), (25, false));
    }

    #[test]
    fn natural_only_on_two_cards_unsplit() {
        assert_eq!(Hand::new(cards("AS KD"), 10, false).status, HandStatus::Blackjack);
        assert_eq!(Hand::new(cards("AS KD"), 10, true).status, HandStatus::Stood);
        assert_eq!(Hand::new(cards("7S 7D 7H"), 10, false).status, HandStatus::Stood);
        assert_eq!(Hand::new(cards("9S 7D"), 10, false).status, HandStatus::Active);
    }
}
