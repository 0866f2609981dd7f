//! Blackjack against the house dealer.
//!
//! No hole-card peek: a dealer natural is revealed during dealer play, which
//! is when insurance resolves.

use serde::{Deserialize, Serialize};

use super::hand::{hand_value, is_natural, Hand, HandStatus};
use crate::domain::cards::{shuffled_shoe, Card, Rank};
use crate::domain::engine::{
    check_player_count, wrong_phase, Actor, GameKind, Outcome, Pending, PlayerSeat, RuleEngine,
    UserId,
};
use crate::domain::rng::{GameRng, Seed};
use crate::errors::domain::{DomainError, ValidationKind};

pub const MAX_HANDS: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BlackjackSettings {
    pub decks: u8,
    pub min_bet: i64,
    pub max_bet: i64,
    pub hit_soft_17: bool,
    /// Reshuffle before a deal when fewer than this share of cards remain.
    pub reshuffle_percent: u8,
}

impl Default for BlackjackSettings {
    fn default() -> Self {
        Self {
            decks: 6,
            min_bet: 1,
            max_bet: 1_000,
            hit_soft_17: false,
            reshuffle_percent: 25,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlackjackPhase {
    Betting,
    PlayerTurn,
    DealerTurn,
    Settlement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlackjackAction {
    PlaceBet { amount: i64 },
    CloseBetting,
    Hit,
    Stand,
    Double,
    Split,
    Insurance,
    Surrender,
    DealerPlay,
    NextRound,
    RemovePlayer { user_id: UserId },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlackjackPlayer {
    pub user_id: UserId,
    pub display_name: String,
    pub bet: Option<i64>,
    pub hands: Vec<Hand>,
    pub active_hand: usize,
    pub insurance: i64,
    pub insurance_payout: Option<i64>,
    /// Any decision taken this round besides insurance.
    pub acted: bool,
}

impl BlackjackPlayer {
    fn reset(&mut self) {
        self.bet = None;
        self.hands.clear();
        self.active_hand = 0;
        self.insurance = 0;
        self.insurance_payout = None;
        self.acted = false;
    }

    /// Everything this player has at risk this round.
    pub fn committed(&self) -> i64 {
        if self.hands.is_empty() {
            self.bet.unwrap_or(0)
        } else {
            self.hands.iter().map(|h| h.bet).sum::<i64>() + self.insurance
        }
    }

    /// Gross return once the round is settled.
    pub fn returned(&self) -> i64 {
        self.hands.iter().filter_map(|h| h.payout).sum::<i64>()
            + self.insurance_payout.unwrap_or(0)
    }
}

#[derive(Debug, Clone)]
pub struct BlackjackState {
    pub settings: BlackjackSettings,
    pub phase: BlackjackPhase,
    pub players: Vec<BlackjackPlayer>,
    pub dealer: Vec<Card>,
    /// Seat index of the acting player during `PlayerTurn`.
    pub current: usize,
    pub round: u32,
    shoe: Vec<Card>,
    rng: GameRng,
}

impl BlackjackState {
    pub fn seat_of(&self, user_id: UserId) -> Option<usize> {
        self.players.iter().position(|p| p.user_id == user_id)
    }

    pub fn current_player(&self) -> Option<UserId> {
        (self.phase == BlackjackPhase::PlayerTurn)
            .then(|| self.players.get(self.current).map(|p| p.user_id))
            .flatten()
    }

    pub fn committed(&self, user_id: UserId) -> i64 {
        self.seat_of(user_id)
            .map(|s| self.players[s].committed())
            .unwrap_or(0)
    }

    pub fn dealer_up_card(&self) -> Option<Card> {
        self.dealer.first().copied()
    }

    pub fn shoe_len(&self) -> usize {
        self.shoe.len()
    }

    fn shoe_size(&self) -> usize {
        self.settings.decks as usize * 52
    }

    /// Draw from the shoe, refilling it when exhausted. `decks >= 1`.
    fn draw(&mut self) -> Card {
        loop {
            if let Some(card) = self.shoe.pop() {
                return card;
            }
            self.shoe = shuffled_shoe(self.settings.decks, &mut self.rng);
        }
    }

    fn deal(&mut self) {
        let threshold = self.shoe_size() * self.settings.reshuffle_percent as usize / 100;
        if self.shoe.len() < threshold {
            self.shoe = shuffled_shoe(self.settings.decks, &mut self.rng);
        }
        let seats: Vec<usize> = (0..self.players.len())
            .filter(|s| self.players[*s].bet.is_some())
            .collect();

        let mut first = Vec::with_capacity(seats.len());
        for _ in &seats {
            first.push(self.draw());
        }
        self.dealer = vec![self.draw()];
        for (i, seat) in seats.iter().enumerate() {
            let second = self.draw();
            let bet = self.players[*seat].bet.unwrap_or(0);
            self.players[*seat].hands = vec![Hand::new(vec![first[i], second], bet, false)];
            self.players[*seat].active_hand = 0;
        }
        let hole = self.draw();
        self.dealer.push(hole);
        self.phase = BlackjackPhase::PlayerTurn;
        self.advance_from(0);
    }

    /// Move the turn to the first seat at or after `seat` with an active
    /// hand, or to the dealer.
    fn advance_from(&mut self, seat: usize) {
        for s in seat..self.players.len() {
            let player = &mut self.players[s];
            if let Some(h) = player
                .hands
                .iter()
                .position(|h| h.status == HandStatus::Active)
            {
                player.active_hand = h;
                self.current = s;
                return;
            }
        }
        self.phase = BlackjackPhase::DealerTurn;
    }

    fn after_player_action(&mut self) {
        let seat = self.current;
        let player = &mut self.players[seat];
        if let Some(h) = player
            .hands
            .iter()
            .position(|h| h.status == HandStatus::Active)
        {
            player.active_hand = h;
            return;
        }
        self.advance_from(seat + 1);
    }

    fn all_seated_have_bet(&self) -> bool {
        !self.players.is_empty() && self.players.iter().all(|p| p.bet.is_some())
    }

    fn play_dealer(&mut self) {
        let anyone_live = self.players.iter().flat_map(|p| &p.hands).any(|h| {
            matches!(h.status, HandStatus::Stood | HandStatus::Active | HandStatus::Blackjack)
        });
        if anyone_live {
            loop {
                let (total, soft) = hand_value(&self.dealer);
                let hit = total < 17 || (total == 17 && soft && self.settings.hit_soft_17);
                if !hit {
                    break;
                }
                let card = self.draw();
                self.dealer.push(card);
            }
        }

        let dealer_total = hand_value(&self.dealer).0;
        let dealer_natural = is_natural(&self.dealer);
        for player in &mut self.players {
            for hand in &mut player.hands {
                hand.payout = Some(settle_hand(hand, dealer_total, dealer_natural));
            }
            if player.insurance > 0 {
                player.insurance_payout = Some(if dealer_natural {
                    player.insurance * 3
                } else {
                    0
                });
            }
        }
        self.phase = BlackjackPhase::Settlement;
    }

    /// Gross return per participant, in seat order.
    pub fn round_payouts(&self) -> Vec<(UserId, i64)> {
        self.players
            .iter()
            .filter(|p| !p.hands.is_empty())
            .map(|p| (p.user_id, p.returned()))
            .collect()
    }

    fn acting_player(&mut self, actor: Actor) -> Result<usize, DomainError> {
        if self.phase != BlackjackPhase::PlayerTurn {
            return Err(wrong_phase(&self.phase, "act"));
        }
        let user = self
            .current_player()
            .ok_or_else(|| DomainError::phase("No player to act"))?;
        actor.ensure_turn(user)?;
        Ok(self.current)
    }
}

/// Chips returned for one hand. Odd bets round the 3:2 bonus and the
/// surrender refund down; the house keeps the half chip.
fn settle_hand(hand: &Hand, dealer_total: u8, dealer_natural: bool) -> i64 {
    match hand.status {
        HandStatus::Surrendered => hand.bet / 2,
        HandStatus::Busted => 0,
        HandStatus::Blackjack if dealer_natural => hand.bet,
        HandStatus::Blackjack => hand.bet + hand.bet * 3 / 2,
        HandStatus::Active | HandStatus::Stood => {
            let total = hand.total();
            if dealer_natural {
                0
            } else if dealer_total > 21 || total > dealer_total {
                hand.bet * 2
            } else if total == dealer_total {
                hand.bet
            } else {
                0
            }
        }
    }
}

fn ineligible(detail: &str) -> DomainError {
    DomainError::validation(ValidationKind::NotEligible, detail.to_string())
}

pub struct BlackjackEngine;

impl RuleEngine for BlackjackEngine {
    type State = BlackjackState;
    type Action = BlackjackAction;
    type Settings = BlackjackSettings;

    fn initialize(
        players: &[PlayerSeat],
        settings: &BlackjackSettings,
        seed: Seed,
    ) -> Result<BlackjackState, DomainError> {
        check_player_count(GameKind::Blackjack, players)?;
        if settings.min_bet <= 0 || settings.max_bet < settings.min_bet || settings.decks == 0 {
            return Err(DomainError::validation(
                ValidationKind::InvalidSettings,
                "Invalid table settings",
            ));
        }
        let mut rng = GameRng::from_seed(seed);
        let shoe = shuffled_shoe(settings.decks, &mut rng);
        Ok(BlackjackState {
            settings: settings.clone(),
            phase: BlackjackPhase::Betting,
            players: players
                .iter()
                .map(|p| BlackjackPlayer {
                    user_id: p.user_id,
                    display_name: p.display_name.clone(),
                    bet: None,
                    hands: Vec::new(),
                    active_hand: 0,
                    insurance: 0,
                    insurance_payout: None,
                    acted: false,
                })
                .collect(),
            dealer: Vec::new(),
            current: 0,
            round: 1,
            shoe,
            rng,
        })
    }

    fn apply(
        state: &BlackjackState,
        action: BlackjackAction,
        actor: Actor,
    ) -> Result<BlackjackState, DomainError> {
        let mut next = state.clone();
        match action {
            BlackjackAction::PlaceBet { amount } => {
                if next.phase != BlackjackPhase::Betting {
                    return Err(wrong_phase(&next.phase, "bet"));
                }
                let seat = actor
                    .player_id()
                    .and_then(|id| next.seat_of(id))
                    .ok_or_else(|| {
                        DomainError::validation(ValidationKind::NotSeated, "Only seated players may bet")
                    })?;
                if amount < next.settings.min_bet || amount > next.settings.max_bet {
                    return Err(DomainError::validation(
                        ValidationKind::BetOutOfRange,
                        format!(
                            "Bet must be between {} and {}",
                            next.settings.min_bet, next.settings.max_bet
                        ),
                    ));
                }
                if next.players[seat].bet.is_some() {
                    return Err(DomainError::validation(
                        ValidationKind::InvalidBet,
                        "Bet already placed this round",
                    ));
                }
                next.players[seat].bet = Some(amount);
                if next.all_seated_have_bet() {
                    next.deal();
                }
            }
            BlackjackAction::CloseBetting => {
                if next.phase != BlackjackPhase::Betting {
                    return Err(wrong_phase(&next.phase, "close betting"));
                }
                actor.ensure_system()?;
                if next.players.iter().any(|p| p.bet.is_some()) {
                    next.deal();
                }
            }
            BlackjackAction::Hit => {
                let seat = next.acting_player(actor)?;
                let card = next.draw();
                let player = &mut next.players[seat];
                let hand = &mut player.hands[player.active_hand];
                hand.cards.push(card);
                hand.refresh_status();
                player.acted = true;
                next.after_player_action();
            }
            BlackjackAction::Stand => {
                let seat = next.acting_player(actor)?;
                let player = &mut next.players[seat];
                player.hands[player.active_hand].status = HandStatus::Stood;
                player.acted = true;
                next.after_player_action();
            }
            BlackjackAction::Double => {
                let seat = next.acting_player(actor)?;
                let player = &next.players[seat];
                let hand = &player.hands[player.active_hand];
                if hand.cards.len() != 2 || hand.doubled {
                    return Err(ineligible("Double only on a fresh two-card hand"));
                }
                let card = next.draw();
                let player = &mut next.players[seat];
                let hand = &mut player.hands[player.active_hand];
                hand.bet *= 2;
                hand.doubled = true;
                hand.cards.push(card);
                hand.status = HandStatus::Stood;
                hand.refresh_status();
                player.acted = true;
                next.after_player_action();
            }
            BlackjackAction::Split => {
                let seat = next.acting_player(actor)?;
                let player = &next.players[seat];
                let idx = player.active_hand;
                if !player.hands[idx].is_pair() {
                    return Err(ineligible("Split only on an initial pair"));
                }
                if player.hands.len() >= MAX_HANDS {
                    return Err(ineligible("Maximum number of hands reached"));
                }
                let (c1, c2) = (next.draw(), next.draw());
                let player = &mut next.players[seat];
                let original = player.hands.remove(idx);
                let aces = original.cards[0].rank == Rank::Ace;
                let mut first = Hand::new(vec![original.cards[0], c1], original.bet, true);
                let mut second = Hand::new(vec![original.cards[1], c2], original.bet, true);
                if aces {
                    // Split aces receive exactly one card each.
                    first.status = HandStatus::Stood;
                    second.status = HandStatus::Stood;
                }
                player.hands.insert(idx, second);
                player.hands.insert(idx, first);
                player.acted = true;
                next.after_player_action();
            }
            BlackjackAction::Insurance => {
                let seat = next.acting_player(actor)?;
                let up_is_ace = next.dealer_up_card().is_some_and(|c| c.rank == Rank::Ace);
                let player = &mut next.players[seat];
                if !up_is_ace {
                    return Err(ineligible("Insurance only against a dealer ace"));
                }
                if player.acted || player.insurance > 0 || player.hands.len() != 1 {
                    return Err(ineligible("Insurance must be taken before any other action"));
                }
                let cost = player.hands[0].bet / 2;
                if cost <= 0 {
                    return Err(ineligible("Bet too small to insure"));
                }
                player.insurance = cost;
            }
            BlackjackAction::Surrender => {
                let seat = next.acting_player(actor)?;
                let player = &mut next.players[seat];
                if player.acted || player.hands.len() != 1 || player.hands[0].cards.len() != 2 {
                    return Err(ineligible("Surrender only on the initial two cards"));
                }
                player.hands[0].status = HandStatus::Surrendered;
                player.acted = true;
                next.after_player_action();
            }
            BlackjackAction::DealerPlay => {
                if next.phase != BlackjackPhase::DealerTurn {
                    return Err(wrong_phase(&next.phase, "play the dealer"));
                }
                actor.ensure_system()?;
                next.play_dealer();
            }
            BlackjackAction::NextRound => {
                if next.phase != BlackjackPhase::Settlement {
                    return Err(wrong_phase(&next.phase, "start the next round"));
                }
                actor.ensure_system()?;
                for p in &mut next.players {
                    p.reset();
                }
                next.dealer.clear();
                next.current = 0;
                next.round += 1;
                next.phase = BlackjackPhase::Betting;
            }
            BlackjackAction::RemovePlayer { user_id } => {
                actor.ensure_system()?;
                let seat = next.seat_of(user_id).ok_or_else(|| {
                    DomainError::validation(ValidationKind::NotSeated, "Player is not seated")
                })?;
                next.players.remove(seat);
                match next.phase {
                    BlackjackPhase::Betting => {
                        if next.all_seated_have_bet() {
                            next.deal();
                        }
                    }
                    BlackjackPhase::PlayerTurn => {
                        if seat < next.current {
                            next.current -= 1;
                        } else if seat == next.current {
                            next.advance_from(seat);
                        }
                    }
                    BlackjackPhase::DealerTurn | BlackjackPhase::Settlement => {}
                }
            }
        }
        Ok(next)
    }

    fn remove_player(user_id: UserId) -> BlackjackAction {
        BlackjackAction::RemovePlayer { user_id }
    }

    fn outcome(state: &BlackjackState) -> Option<Outcome> {
        (state.phase == BlackjackPhase::Settlement).then(|| Outcome::RoundSettled {
            round: state.round,
            payouts: state.round_payouts(),
        })
    }

    fn pending(state: &BlackjackState) -> Pending {
        match state.phase {
            BlackjackPhase::Betting => Pending::BettingWindow,
            BlackjackPhase::PlayerTurn => match state.current_player() {
                Some(user) => Pending::Turn(user),
                None => Pending::Idle,
            },
            BlackjackPhase::DealerTurn => Pending::Resolve,
            BlackjackPhase::Settlement => Pending::NextRound,
        }
    }

    fn on_timer(state: &BlackjackState) -> Vec<BlackjackAction> {
        match state.phase {
            BlackjackPhase::Betting => vec![BlackjackAction::CloseBetting],
            BlackjackPhase::PlayerTurn => vec![BlackjackAction::Stand],
            BlackjackPhase::DealerTurn => vec![BlackjackAction::DealerPlay],
            BlackjackPhase::Settlement => vec![BlackjackAction::NextRound],
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DealerView {
    pub cards: Vec<Card>,
    pub hidden_cards: usize,
    pub total: Option<u8>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlackjackView {
    pub phase: BlackjackPhase,
    pub players: Vec<BlackjackPlayer>,
    pub dealer: DealerView,
    pub current_player: Option<UserId>,
    pub round: u32,
    pub min_bet: i64,
    pub max_bet: i64,
    pub shoe_remaining: usize,
}

impl BlackjackState {
    pub fn view(&self) -> BlackjackView {
        let reveal = matches!(
            self.phase,
            BlackjackPhase::DealerTurn | BlackjackPhase::Settlement
        );
        let dealer = if reveal {
            DealerView {
                cards: self.dealer.clone(),
                hidden_cards: 0,
                total: Some(hand_value(&self.dealer).0),
            }
        } else {
            DealerView {
                cards: self.dealer.iter().take(1).copied().collect(),
                hidden_cards: self.dealer.len().saturating_sub(1),
                total: None,
            }
        };
        BlackjackView {
            phase: self.phase,
            players: self.players.clone(),
            dealer,
            current_player: self.current_player(),
            round: self.round,
            min_bet: self.settings.min_bet,
            max_bet: self.settings.max_bet,
            shoe_remaining: self.shoe.len(),
        }
    }

    #[cfg(test)]
    pub(crate) fn stack_shoe(&mut self, top_first: &[Card]) {
        for card in top_first.iter().rev() {
            self.shoe.push(*card);
        }
    }
}
