//! No-limit Texas Hold'em, played as a multi-hand freezeout.
//!
//! Seats never move within a tournament: busted and departed players keep
//! their seat index with `eliminated` set, so the dealer button and pot
//! eligibility can always be expressed as seat indices.

use serde::{Deserialize, Serialize};

use super::hand_eval::{evaluate_best, HandValue};
use super::pots::{calculate_pots, distribute, Contribution, Pot};
use crate::domain::cards::{shuffled_shoe, Card};
use crate::domain::engine::{
    check_player_count, wrong_phase, Actor, GameKind, Outcome, Pending, PlayerSeat, RuleEngine,
    UserId,
};
use crate::domain::rng::{GameRng, Seed};
use crate::domain::standings::Standing;
use crate::errors::domain::{DomainError, InfraErrorKind, ResourceKind, ValidationKind};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PokerSettings {
    pub starting_chips: i64,
    pub small_blind: i64,
    pub big_blind: i64,
    /// Hands between blind increases; 0 keeps blinds fixed.
    pub blind_increase_every: u32,
    pub blind_multiplier: i64,
}

impl Default for PokerSettings {
    fn default() -> Self {
        Self {
            starting_chips: 1_000,
            small_blind: 5,
            big_blind: 10,
            blind_increase_every: 10,
            blind_multiplier: 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PokerPhase {
    Blinds,
    Preflop,
    Flop,
    Turn,
    River,
    Showdown,
    HandEnd,
    Finished,
}

impl PokerPhase {
    fn is_betting(self) -> bool {
        matches!(
            self,
            PokerPhase::Preflop | PokerPhase::Flop | PokerPhase::Turn | PokerPhase::River
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PokerAction {
    Fold,
    Check,
    Call,
    /// Raise the current bet to `to` (total for this street).
    Raise { to: i64 },
    AllIn,
    NextHand,
    RemovePlayer { user_id: UserId },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PokerPlayer {
    pub user_id: UserId,
    pub display_name: String,
    pub chips: i64,
    /// Chips put in on the current street.
    pub current_bet: i64,
    pub total_bet_in_hand: i64,
    pub hole: Vec<Card>,
    pub folded: bool,
    pub all_in: bool,
    pub has_acted: bool,
    /// Out of the tournament: busted or left.
    pub eliminated: bool,
    pub left: bool,
    pub eliminated_in_hand: Option<u32>,
}

impl PokerPlayer {
    fn in_hand(&self) -> bool {
        !self.eliminated && !self.folded
    }

    fn can_act(&self) -> bool {
        self.in_hand() && !self.all_in
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevealedHand {
    pub user_id: UserId,
    pub cards: Vec<Card>,
    pub value: HandValue,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HandResult {
    pub hand_number: u32,
    pub pots: Vec<Pot>,
    pub payouts: Vec<(UserId, i64)>,
    /// Empty when the hand ended without a showdown.
    pub revealed: Vec<RevealedHand>,
}

#[derive(Debug, Clone)]
pub struct PokerState {
    pub settings: PokerSettings,
    pub phase: PokerPhase,
    pub players: Vec<PokerPlayer>,
    pub dealer: usize,
    pub current: usize,
    pub community: Vec<Card>,
    pub current_bet: i64,
    pub last_raise: i64,
    pub small_blind: i64,
    pub big_blind: i64,
    pub hand_number: u32,
    pub last_result: Option<HandResult>,
    deck: Vec<Card>,
    rng: GameRng,
}

impl PokerState {
    pub fn seat_of(&self, user_id: UserId) -> Option<usize> {
        self.players.iter().position(|p| p.user_id == user_id)
    }

    pub fn pot(&self) -> i64 {
        self.players.iter().map(|p| p.total_bet_in_hand).sum()
    }

    pub fn total_chips(&self) -> i64 {
        self.players.iter().map(|p| p.chips).sum::<i64>() + self.pot()
    }

    pub fn current_player(&self) -> Option<UserId> {
        if !self.phase.is_betting() {
            return None;
        }
        self.players
            .get(self.current)
            .filter(|p| p.can_act())
            .map(|p| p.user_id)
    }

    pub fn hole_cards(&self, user_id: UserId) -> Option<&[Card]> {
        let seat = self.seat_of(user_id)?;
        let hole = &self.players[seat].hole;
        (!hole.is_empty()).then_some(hole.as_slice())
    }

    fn live_count(&self) -> usize {
        self.players.iter().filter(|p| !p.eliminated).count()
    }

    /// Next seat clockwise after `from` matching `pred`.
    fn next_seat(&self, from: usize, pred: impl Fn(&PokerPlayer) -> bool) -> Option<usize> {
        let n = self.players.len();
        (1..=n)
            .map(|step| (from + step) % n)
            .find(|s| pred(&self.players[*s]))
    }

    fn draw(&mut self) -> Option<Card> {
        self.deck.pop()
    }

    fn post(&mut self, seat: usize, amount: i64) {
        let player = &mut self.players[seat];
        let paid = amount.min(player.chips);
        player.chips -= paid;
        player.current_bet += paid;
        player.total_bet_in_hand += paid;
        if player.chips == 0 {
            player.all_in = true;
        }
    }

    fn start_hand(&mut self) -> Result<(), DomainError> {
        self.phase = PokerPhase::Blinds;
        self.community.clear();
        self.deck = shuffled_shoe(1, &mut self.rng);
        for p in &mut self.players {
            p.current_bet = 0;
            p.total_bet_in_hand = 0;
            p.hole.clear();
            p.folded = p.eliminated;
            p.all_in = false;
            p.has_acted = false;
        }

        let heads_up = self.live_count() == 2;
        let live = |p: &PokerPlayer| !p.eliminated;
        let (sb, bb) = if heads_up {
            let other = self.next_seat(self.dealer, live);
            (Some(self.dealer), other)
        } else {
            let sb = self.next_seat(self.dealer, live);
            let bb = sb.and_then(|s| self.next_seat(s, live));
            (sb, bb)
        };
        let (Some(sb), Some(bb)) = (sb, bb) else {
            return Err(DomainError::validation(
                ValidationKind::InvalidPlayerCount,
                "Not enough players to post blinds",
            ));
        };
        self.post(sb, self.small_blind);
        self.post(bb, self.big_blind);
        self.current_bet = self.big_blind;
        self.last_raise = self.big_blind;

        let n = self.players.len();
        for _ in 0..2 {
            for step in 1..=n {
                let seat = (self.dealer + step) % n;
                if !self.players[seat].eliminated {
                    let card = self.draw().ok_or_else(|| {
                        DomainError::infra(
                            InfraErrorKind::DataCorruption,
                            "deck exhausted while dealing",
                        )
                    })?;
                    self.players[seat].hole.push(card);
                }
            }
        }

        self.phase = PokerPhase::Preflop;
        let first = if heads_up {
            Some(sb)
        } else {
            self.next_seat(bb, PokerPlayer::can_act)
        };
        self.current = first.unwrap_or(bb);
        self.progress()
    }

    fn round_complete(&self) -> bool {
        self.players
            .iter()
            .filter(|p| p.can_act())
            .all(|p| p.has_acted && p.current_bet == self.current_bet)
    }

    /// Settle whatever the last action made inevitable: an uncontested pot,
    /// a closed street, or the next player to act.
    fn progress(&mut self) -> Result<(), DomainError> {
        loop {
            let in_hand: Vec<usize> = (0..self.players.len())
                .filter(|s| self.players[*s].in_hand())
                .collect();
            if in_hand.len() == 1 {
                self.award_uncontested(in_hand[0]);
                return Ok(());
            }

            let can_act = self.players.iter().filter(|p| p.can_act()).count();
            let facing_bet = self
                .players
                .iter()
                .any(|p| p.can_act() && p.current_bet < self.current_bet);
            let betting_possible = can_act > 1 || facing_bet;

            if betting_possible && !self.round_complete() {
                if !self.players[self.current].can_act()
                    || (self.players[self.current].has_acted
                        && self.players[self.current].current_bet == self.current_bet)
                {
                    if let Some(next) = self.next_seat(self.current, |p| {
                        p.can_act() && (!p.has_acted || p.current_bet < self.current_bet)
                    }) {
                        self.current = next;
                    }
                }
                return Ok(());
            }

            // Street over.
            match self.phase {
                PokerPhase::River => {
                    self.showdown();
                    return Ok(());
                }
                PokerPhase::Preflop | PokerPhase::Flop | PokerPhase::Turn => self.next_street()?,
                _ => return Ok(()),
            }
        }
    }

    fn next_street(&mut self) -> Result<(), DomainError> {
        let (phase, cards) = match self.phase {
            PokerPhase::Preflop => (PokerPhase::Flop, 3),
            PokerPhase::Flop => (PokerPhase::Turn, 1),
            PokerPhase::Turn => (PokerPhase::River, 1),
            other => return Err(wrong_phase(&other, "deal the next street")),
        };
        for _ in 0..cards {
            let card = self.draw().ok_or_else(|| {
                DomainError::infra(
                    InfraErrorKind::DataCorruption,
                    "deck exhausted on the board",
                )
            })?;
            self.community.push(card);
        }
        for p in &mut self.players {
            p.current_bet = 0;
            p.has_acted = false;
        }
        self.current_bet = 0;
        self.last_raise = self.big_blind;
        self.phase = phase;
        if let Some(first) = self.next_seat(self.dealer, PokerPlayer::can_act) {
            self.current = first;
        }
        Ok(())
    }

    fn award_uncontested(&mut self, seat: usize) {
        let pot = self.pot();
        let pots = calculate_pots(&self.contributions());
        self.players[seat].chips += pot;
        let winner = self.players[seat].user_id;
        self.end_hand(HandResult {
            hand_number: self.hand_number,
            pots,
            payouts: vec![(winner, pot)],
            revealed: Vec::new(),
        });
    }

    fn contributions(&self) -> Vec<Contribution> {
        self.players
            .iter()
            .enumerate()
            .filter(|(_, p)| p.total_bet_in_hand > 0)
            .map(|(seat, p)| Contribution {
                seat,
                amount: p.total_bet_in_hand,
                folded: !p.in_hand(),
            })
            .collect()
    }

    fn showdown(&mut self) {
        self.phase = PokerPhase::Showdown;
        let pots = calculate_pots(&self.contributions());
        let mut hands: Vec<(usize, HandValue)> = Vec::new();
        let mut revealed = Vec::new();
        for (seat, p) in self.players.iter().enumerate() {
            if !p.in_hand() {
                continue;
            }
            let mut seven = p.hole.clone();
            seven.extend_from_slice(&self.community);
            if let Some(value) = evaluate_best(&seven) {
                revealed.push(RevealedHand {
                    user_id: p.user_id,
                    cards: p.hole.clone(),
                    value: value.clone(),
                });
                hands.push((seat, value));
            }
        }
        let paid = distribute(&pots, &hands, self.dealer, self.players.len());
        let mut payouts = Vec::with_capacity(paid.len());
        for (seat, amount) in paid {
            self.players[seat].chips += amount;
            payouts.push((self.players[seat].user_id, amount));
        }
        self.end_hand(HandResult {
            hand_number: self.hand_number,
            pots,
            payouts,
            revealed,
        });
    }

    fn end_hand(&mut self, result: HandResult) {
        for p in &mut self.players {
            p.current_bet = 0;
            p.total_bet_in_hand = 0;
        }
        self.current_bet = 0;
        self.last_result = Some(result);
        self.phase = PokerPhase::HandEnd;
        if self.contenders() <= 1 {
            self.eliminate_busted();
            self.phase = PokerPhase::Finished;
        }
    }

    /// Players who can start another hand.
    fn contenders(&self) -> usize {
        self.players
            .iter()
            .filter(|p| !p.eliminated && !p.left && p.chips > 0)
            .count()
    }

    fn eliminate_busted(&mut self) {
        let hand = self.hand_number;
        for p in &mut self.players {
            if !p.eliminated && (p.chips == 0 || p.left) {
                p.eliminated = true;
                p.folded = true;
                p.eliminated_in_hand = Some(hand);
            }
        }
    }

    fn acting_seat(&self, actor: Actor) -> Result<usize, DomainError> {
        if !self.phase.is_betting() {
            return Err(wrong_phase(&self.phase, "bet"));
        }
        let user = self
            .current_player()
            .ok_or_else(|| DomainError::phase("Nobody is due to act"))?;
        actor.ensure_turn(user)?;
        Ok(self.current)
    }

    fn put_in(&mut self, seat: usize, amount: i64) {
        let player = &mut self.players[seat];
        player.chips -= amount;
        player.current_bet += amount;
        player.total_bet_in_hand += amount;
        if player.chips == 0 {
            player.all_in = true;
        }
    }

    /// Whether `seat` may raise. After acting, a player may only raise again
    /// once the bet has grown by a full raise; short all-ins alone never
    /// reopen the action for them.
    pub fn may_raise(&self, seat: usize) -> bool {
        let p = &self.players[seat];
        !p.has_acted || self.current_bet - p.current_bet >= self.last_raise
    }

    /// A bet that raises by at least the last raise reopens the action.
    fn register_raise(&mut self, seat: usize, new_bet: i64) {
        let raise = new_bet - self.current_bet;
        if raise >= self.last_raise {
            self.last_raise = raise;
            for (s, p) in self.players.iter_mut().enumerate() {
                if s != seat {
                    p.has_acted = false;
                }
            }
        }
        self.current_bet = new_bet;
    }

    /// Survivors by chips, then eliminated players latest-first. Players
    /// knocked out in the same hand share a rank.
    pub fn standings(&self) -> Vec<Standing> {
        let mut order: Vec<&PokerPlayer> = self.players.iter().collect();
        order.sort_by(|a, b| {
            let key = |p: &PokerPlayer| match p.eliminated_in_hand {
                None => (1u8, p.chips, 0u32),
                Some(hand) => (0u8, 0, hand),
            };
            key(b).cmp(&key(a))
        });

        let mut out: Vec<Standing> = Vec::with_capacity(order.len());
        let mut prev_key: Option<(bool, i64, u32)> = None;
        for (pos, p) in order.iter().enumerate() {
            let key = (
                p.eliminated_in_hand.is_none(),
                p.chips,
                p.eliminated_in_hand.unwrap_or(0),
            );
            let rank = match (prev_key, out.last()) {
                (Some(k), Some(last)) if k == key => last.rank,
                _ => pos as u32 + 1,
            };
            prev_key = Some(key);
            out.push(Standing {
                user_id: p.user_id,
                rank,
                score: p.chips,
            });
        }
        out
    }

    pub fn winner(&self) -> Option<UserId> {
        (self.phase == PokerPhase::Finished)
            .then(|| {
                self.players
                    .iter()
                    .filter(|p| !p.eliminated)
                    .max_by_key(|p| p.chips)
                    .map(|p| p.user_id)
            })
            .flatten()
    }
}

pub struct PokerEngine;

impl RuleEngine for PokerEngine {
    type State = PokerState;
    type Action = PokerAction;
    type Settings = PokerSettings;

    fn initialize(
        players: &[PlayerSeat],
        settings: &PokerSettings,
        seed: Seed,
    ) -> Result<PokerState, DomainError> {
        check_player_count(GameKind::Poker, players)?;
        if settings.small_blind <= 0
            || settings.big_blind < settings.small_blind
            || settings.starting_chips < settings.big_blind
            || settings.blind_multiplier < 1
        {
            return Err(DomainError::validation(
                ValidationKind::InvalidSettings,
                "Blinds must be positive, ordered and affordable",
            ));
        }
        let mut state = PokerState {
            settings: settings.clone(),
            phase: PokerPhase::Blinds,
            players: players
                .iter()
                .map(|p| PokerPlayer {
                    user_id: p.user_id,
                    display_name: p.display_name.clone(),
                    chips: settings.starting_chips,
                    current_bet: 0,
                    total_bet_in_hand: 0,
                    hole: Vec::new(),
                    folded: false,
                    all_in: false,
                    has_acted: false,
                    eliminated: false,
                    left: false,
                    eliminated_in_hand: None,
                })
                .collect(),
            dealer: 0,
            current: 0,
            community: Vec::new(),
            current_bet: 0,
            last_raise: settings.big_blind,
            small_blind: settings.small_blind,
            big_blind: settings.big_blind,
            hand_number: 1,
            last_result: None,
            deck: Vec::new(),
            rng: GameRng::from_seed(seed),
        };
        state.start_hand()?;
        Ok(state)
    }

    fn apply(
        state: &PokerState,
        action: PokerAction,
        actor: Actor,
    ) -> Result<PokerState, DomainError> {
        let mut next = state.clone();
        match action {
            PokerAction::Fold => {
                let seat = next.acting_seat(actor)?;
                next.players[seat].folded = true;
                next.players[seat].has_acted = true;
                next.progress()?;
            }
            PokerAction::Check => {
                let seat = next.acting_seat(actor)?;
                if next.players[seat].current_bet != next.current_bet {
                    return Err(DomainError::validation(
                        ValidationKind::InvalidBet,
                        "Cannot check while facing a bet",
                    ));
                }
                next.players[seat].has_acted = true;
                next.progress()?;
            }
            PokerAction::Call => {
                let seat = next.acting_seat(actor)?;
                let to_call = next.current_bet - next.players[seat].current_bet;
                if to_call <= 0 {
                    return Err(DomainError::validation(
                        ValidationKind::InvalidBet,
                        "Nothing to call",
                    ));
                }
                let amount = to_call.min(next.players[seat].chips);
                next.put_in(seat, amount);
                next.players[seat].has_acted = true;
                next.progress()?;
            }
            PokerAction::Raise { to } => {
                let seat = next.acting_seat(actor)?;
                if to <= next.current_bet {
                    return Err(DomainError::validation(
                        ValidationKind::InvalidBet,
                        "A raise must exceed the current bet",
                    ));
                }
                if !next.may_raise(seat) {
                    return Err(action_not_reopened());
                }
                let min_to = next.current_bet + next.last_raise;
                if to < min_to {
                    return Err(DomainError::validation(
                        ValidationKind::MinRaise,
                        format!("Minimum raise is to {min_to}"),
                    ));
                }
                let needed = to - next.players[seat].current_bet;
                if needed > next.players[seat].chips {
                    return Err(DomainError::resource(
                        ResourceKind::InsufficientChips,
                        "Not enough chips for that raise",
                    ));
                }
                next.put_in(seat, needed);
                next.register_raise(seat, to);
                next.players[seat].has_acted = true;
                next.progress()?;
            }
            PokerAction::AllIn => {
                let seat = next.acting_seat(actor)?;
                let chips = next.players[seat].chips;
                let to_call = next.current_bet - next.players[seat].current_bet;
                if chips > to_call && !next.may_raise(seat) {
                    return Err(action_not_reopened());
                }
                next.put_in(seat, chips);
                let new_bet = next.players[seat].current_bet;
                if new_bet > next.current_bet {
                    next.register_raise(seat, new_bet);
                }
                next.players[seat].has_acted = true;
                next.progress()?;
            }
            PokerAction::NextHand => {
                if next.phase != PokerPhase::HandEnd {
                    return Err(wrong_phase(&next.phase, "start the next hand"));
                }
                actor.ensure_system()?;
                next.eliminate_busted();
                if next.live_count() <= 1 {
                    next.phase = PokerPhase::Finished;
                    return Ok(next);
                }
                let every = next.settings.blind_increase_every;
                if every > 0 && next.hand_number % every == 0 {
                    next.small_blind *= next.settings.blind_multiplier;
                    next.big_blind *= next.settings.blind_multiplier;
                }
                next.hand_number += 1;
                if let Some(dealer) = next.next_seat(next.dealer, |p| !p.eliminated) {
                    next.dealer = dealer;
                }
                next.start_hand()?;
            }
            PokerAction::RemovePlayer { user_id } => {
                actor.ensure_system()?;
                let seat = next.seat_of(user_id).ok_or_else(|| {
                    DomainError::validation(ValidationKind::NotSeated, "Player is not seated")
                })?;
                if next.players[seat].left {
                    return Err(DomainError::validation(
                        ValidationKind::NotSeated,
                        "Player already left",
                    ));
                }
                next.players[seat].left = true;
                match next.phase {
                    phase if phase.is_betting() => {
                        next.players[seat].folded = true;
                        next.players[seat].has_acted = true;
                        next.progress()?;
                    }
                    PokerPhase::HandEnd => {
                        if next.contenders() <= 1 {
                            next.eliminate_busted();
                            next.phase = PokerPhase::Finished;
                        }
                    }
                    _ => {}
                }
            }
        }
        Ok(next)
    }

    fn remove_player(user_id: UserId) -> PokerAction {
        PokerAction::RemovePlayer { user_id }
    }

    fn outcome(state: &PokerState) -> Option<Outcome> {
        (state.phase == PokerPhase::Finished).then(|| Outcome::Finished {
            winner: state.winner(),
            standings: state.standings(),
        })
    }

    fn pending(state: &PokerState) -> Pending {
        match state.phase {
            PokerPhase::HandEnd => Pending::NextRound,
            _ => match state.current_player() {
                Some(user) => Pending::Turn(user),
                None => Pending::Idle,
            },
        }
    }

    fn on_timer(state: &PokerState) -> Vec<PokerAction> {
        match state.phase {
            PokerPhase::HandEnd => vec![PokerAction::NextHand],
            phase if phase.is_betting() => {
                let can_check = state
                    .players
                    .get(state.current)
                    .is_some_and(|p| p.current_bet == state.current_bet);
                if can_check {
                    vec![PokerAction::Check]
                } else {
                    vec![PokerAction::Fold]
                }
            }
            _ => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PokerPlayerView {
    pub user_id: UserId,
    pub display_name: String,
    pub chips: i64,
    pub current_bet: i64,
    pub total_bet_in_hand: i64,
    pub folded: bool,
    pub all_in: bool,
    pub eliminated: bool,
    pub has_cards: bool,
}

/// Public table state. Hole cards only travel on private channels, or in
/// `last_result.revealed` after a showdown.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PokerView {
    pub phase: PokerPhase,
    pub players: Vec<PokerPlayerView>,
    pub dealer: usize,
    pub current_player: Option<UserId>,
    pub community: Vec<Card>,
    pub pot: i64,
    pub current_bet: i64,
    pub min_raise_to: i64,
    pub small_blind: i64,
    pub big_blind: i64,
    pub hand_number: u32,
    pub last_result: Option<HandResult>,
}

impl PokerState {
    pub fn view(&self) -> PokerView {
        PokerView {
            phase: self.phase,
            players: self
                .players
                .iter()
                .map(|p| PokerPlayerView {
                    user_id: p.user_id,
                    display_name: p.display_name.clone(),
                    chips: p.chips,
                    current_bet: p.current_bet,
                    total_bet_in_hand: p.total_bet_in_hand,
                    folded: p.folded,
                    all_in: p.all_in,
                    eliminated: p.eliminated,
                    has_cards: !p.hole.is_empty() && !p.folded,
                })
                .collect(),
            dealer: self.dealer,
            current_player: self.current_player(),
            community: self.community.clone(),
            pot: self.pot(),
            current_bet: self.current_bet,
            min_raise_to: self.current_bet + self.last_raise,
            small_blind: self.small_blind,
            big_blind: self.big_blind,
            hand_number: self.hand_number,
            last_result: self.last_result.clone(),
        }
    }
}

fn action_not_reopened() -> DomainError {
    DomainError::validation(
        ValidationKind::InvalidBet,
        "Betting was not reopened by a full raise; call or fold",
    )
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::domain::engine::seats;

    fn table(ids: &[UserId]) -> PokerState {
        PokerEngine::initialize(&seats(ids), &PokerSettings::default(), [1; 32]).unwrap()
    }

    fn act(s: &PokerState, action: PokerAction) -> PokerState {
        let user = s.current_player().unwrap();
        PokerEngine::apply(s, action, Actor::Player(user)).unwrap()
    }

    #[test]
    fn three_handed_blinds() {
        let s = table(&[1, 2, 3]);
        assert_eq!(s.phase, PokerPhase::Preflop);
        assert_eq!(s.players[1].current_bet, 5);
        assert_eq!(s.players[1].chips, 995);
        assert_eq!(s.players[2].current_bet, 10);
        assert_eq!(s.players[2].chips, 990);
        assert_eq!(s.pot(), 15);
        assert_eq!(s.current_player(), Some(1));
        assert_eq!(s.current, 0);
        assert!(s.players.iter().all(|p| p.hole.len() == 2));
    }

    #[test]
    fn heads_up_dealer_posts_small_and_acts_first() {
        let s = table(&[1, 2]);
        assert_eq!(s.players[0].current_bet, 5);
        assert_eq!(s.players[1].current_bet, 10);
        assert_eq!(s.current, 0);
    }

    #[test]
    fn big_blind_keeps_the_option() {
        let s = table(&[1, 2, 3]);
        let s = act(&s, PokerAction::Call);
        let s = act(&s, PokerAction::Call);
        assert_eq!(s.phase, PokerPhase::Preflop);
        assert_eq!(s.current, 2);
        let s = act(&s, PokerAction::Check);
        assert_eq!(s.phase, PokerPhase::Flop);
        assert_eq!(s.community.len(), 3);
        // First to act post-flop is left of the dealer.
        assert_eq!(s.current, 1);
    }

    #[test]
    fn min_raise_is_enforced() {
        let s = table(&[1, 2, 3]);
        let err = PokerEngine::apply(&s, PokerAction::Raise { to: 15 }, Actor::Player(1))
            .unwrap_err();
        match err {
            DomainError::Validation(ValidationKind::MinRaise, detail) => {
                assert!(detail.contains("20"))
            }
            other => panic!("unexpected {other:?}"),
        }
        let s = act(&s, PokerAction::Raise { to: 30 });
        assert_eq!(s.current_bet, 30);
        assert_eq!(s.last_raise, 20);
        let err = PokerEngine::apply(&s, PokerAction::Raise { to: 45 }, Actor::Player(2))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(ValidationKind::MinRaise, _)));
    }

    #[test]
    fn short_all_in_does_not_reopen_the_action() {
        let s = table(&[1, 2, 3]);
        let mut s = act(&s, PokerAction::Raise { to: 30 });
        // Small blind has 35 behind: all-in to 40 is only 10 more.
        s.players[1].chips = 35;
        let s = act(&s, PokerAction::AllIn);
        assert_eq!(s.current_bet, 40);
        assert_eq!(s.last_raise, 20);

        // The big blind has not acted yet and may still raise.
        assert_eq!(s.current, 2);
        assert!(s.may_raise(2));
        let s = act(&s, PokerAction::Call);

        // The original raiser faces 10 more: call or fold only.
        assert_eq!(s.current, 0);
        assert!(!s.may_raise(0));
        let err = PokerEngine::apply(&s, PokerAction::Raise { to: 60 }, Actor::Player(1))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(ValidationKind::InvalidBet, _)));
        assert!(PokerEngine::apply(&s, PokerAction::AllIn, Actor::Player(1)).is_err());
        let s = act(&s, PokerAction::Call);
        assert_eq!(s.phase, PokerPhase::Flop);
    }

    #[test]
    fn stacked_short_all_ins_reopen_once_they_add_up() {
        let s = table(&[1, 2, 3, 4]);
        // Seat 3 (user 4) is first to act preflop with four players.
        let first = s.current;
        let mut s = act(&s, PokerAction::Raise { to: 30 });
        let second = s.current;
        s.players[second].chips = s.players[second].chips.min(45 - s.players[second].current_bet);
        let mut s = act(&s, PokerAction::AllIn);
        let third = s.current;
        s.players[third].chips = 55 - s.players[third].current_bet;
        let s = act(&s, PokerAction::AllIn);
        assert_eq!(s.current_bet, 55);
        // 25 more than the 30 the first raiser put in exceeds the 20 raise.
        assert!(s.may_raise(first));
    }

    #[test]
    fn raise_beyond_stack_is_a_resource_error() {
        let s = table(&[1, 2, 3]);
        let err = PokerEngine::apply(&s, PokerAction::Raise { to: 5_000 }, Actor::Player(1))
            .unwrap_err();
        assert!(matches!(
            err,
            DomainError::Resource(ResourceKind::InsufficientChips, _)
        ));
    }

    #[test]
    fn folds_to_one_player_win_without_showdown() {
        let s = table(&[1, 2, 3]);
        let s = act(&s, PokerAction::Fold);
        let s = act(&s, PokerAction::Fold);
        assert_eq!(s.phase, PokerPhase::HandEnd);
        assert_eq!(s.players[2].chips, 1_005);
        let result = s.last_result.as_ref().unwrap();
        assert!(result.revealed.is_empty());
        assert_eq!(s.total_chips(), 3_000);
    }

    #[test]
    fn all_in_runs_out_the_board() {
        let s = table(&[1, 2]);
        let s = act(&s, PokerAction::AllIn);
        let s = act(&s, PokerAction::Call);
        assert!(matches!(s.phase, PokerPhase::HandEnd | PokerPhase::Finished));
        assert_eq!(s.last_result.as_ref().unwrap().revealed.len(), 2);
        assert_eq!(s.total_chips(), 2_000);
    }

    #[test]
    fn next_hand_rotates_dealer_and_escalates_blinds() {
        let settings = PokerSettings {
            blind_increase_every: 1,
            ..PokerSettings::default()
        };
        let s = PokerEngine::initialize(&seats(&[1, 2, 3]), &settings, [2; 32]).unwrap();
        let s = act(&s, PokerAction::Fold);
        let s = act(&s, PokerAction::Fold);
        let s = PokerEngine::apply(&s, PokerAction::NextHand, Actor::System).unwrap();
        assert_eq!(s.hand_number, 2);
        assert_eq!(s.dealer, 1);
        assert_eq!(s.big_blind, 20);
        assert_eq!(s.players[2].current_bet, 10);
        assert_eq!(s.players[0].current_bet, 20);
    }

    #[test]
    fn removal_of_last_opponent_finishes_tournament() {
        let s = table(&[1, 2]);
        let s = PokerEngine::apply(&s, PokerAction::RemovePlayer { user_id: 1 }, Actor::System)
            .unwrap();
        assert_eq!(s.phase, PokerPhase::Finished);
        assert_eq!(s.winner(), Some(2));
        match PokerEngine::outcome(&s) {
            Some(Outcome::Finished { standings, .. }) => {
                assert_eq!(standings[0].user_id, 2);
                assert_eq!(standings[0].rank, 1);
                assert_eq!(standings[1].rank, 2);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn same_hand_eliminations_share_a_rank() {
        let mut s = table(&[1, 2, 3]);
        s.phase = PokerPhase::Finished;
        s.players[0].eliminated = true;
        s.players[0].eliminated_in_hand = Some(4);
        s.players[0].chips = 0;
        s.players[1].eliminated = true;
        s.players[1].eliminated_in_hand = Some(4);
        s.players[1].chips = 0;
        let standings = s.standings();
        assert_eq!(standings[0].user_id, 3);
        assert_eq!(standings[1].rank, 2);
        assert_eq!(standings[2].rank, 2);
    }

    #[test]
    fn timer_checks_or_folds() {
        let s = table(&[1, 2, 3]);
        assert_eq!(PokerEngine::on_timer(&s), vec![PokerAction::Fold]);
        let s = act(&s, PokerAction::Call);
        let s = act(&s, PokerAction::Call);
        assert_eq!(PokerEngine::on_timer(&s), vec![PokerAction::Check]);
    }

    fn random_action(s: &PokerState, pick: u8) -> PokerAction {
        let p = &s.players[s.current];
        let facing = s.current_bet - p.current_bet;
        match pick % 5 {
            0 => PokerAction::Fold,
            1 if facing == 0 => PokerAction::Check,
            1 | 2 if facing > 0 => PokerAction::Call,
            3 if s.may_raise(s.current) && p.chips > facing + s.last_raise => PokerAction::Raise {
                to: s.current_bet + s.last_raise,
            },
            4 if s.may_raise(s.current) || p.chips <= facing => PokerAction::AllIn,
            _ if facing == 0 => PokerAction::Check,
            _ => PokerAction::Call,
        }
    }

    proptest! {
        #[test]
        fn chips_are_conserved_across_hands(picks in prop::collection::vec(any::<u8>(), 1..400), n in 2usize..=5) {
            let ids: Vec<UserId> = (1..=n as i64).collect();
            let mut s = PokerEngine::initialize(&seats(&ids), &PokerSettings::default(), [7; 32]).unwrap();
            let total = s.total_chips();
            for pick in picks {
                s = match s.phase {
                    PokerPhase::Finished => break,
                    PokerPhase::HandEnd => PokerEngine::apply(&s, PokerAction::NextHand, Actor::System).unwrap(),
                    _ => {
                        let action = random_action(&s, pick);
                        let user = s.current_player().unwrap();
                        PokerEngine::apply(&s, action, Actor::Player(user)).unwrap()
                    }
                };
                prop_assert_eq!(s.total_chips(), total);
                prop_assert!(s.players.iter().all(|p| p.chips >= 0));
            }
        }
    }
}
