//! European roulette: bets, spin, settlement, repeat.

use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};

use super::bets::{calculate_bet_payout, is_red, validate_bet, BetType};
use crate::domain::engine::{
    check_player_count, wrong_phase, Actor, GameKind, Outcome, Pending, PlayerSeat, RuleEngine,
    UserId,
};
use crate::domain::rng::{GameRng, Seed};
use crate::errors::domain::{DomainError, ValidationKind};

pub const HISTORY_LEN: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RouletteSettings {
    pub min_bet: i64,
    pub max_bet: i64,
    pub max_bets_per_player: usize,
}

impl Default for RouletteSettings {
    fn default() -> Self {
        Self {
            min_bet: 1,
            max_bet: 1_000,
            max_bets_per_player: 20,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoulettePhase {
    Betting,
    Spinning,
    Settlement,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RouletteAction {
    PlaceBet {
        bet_type: BetType,
        numbers: Vec<u8>,
        amount: i64,
    },
    Spin,
    Settle,
    NextRound,
    RemovePlayer {
        user_id: UserId,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacedBet {
    pub user_id: UserId,
    pub bet_type: BetType,
    /// Covered numbers after normalisation.
    pub numbers: Vec<u8>,
    pub amount: i64,
    pub payout: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoulettePlayer {
    pub user_id: UserId,
    pub display_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Color {
    Green,
    Red,
    Black,
}

pub fn color_of(number: u8) -> Color {
    if number == 0 {
        Color::Green
    } else if is_red(number) {
        Color::Red
    } else {
        Color::Black
    }
}

#[derive(Debug, Clone)]
pub struct RouletteState {
    pub settings: RouletteSettings,
    pub phase: RoulettePhase,
    pub players: Vec<RoulettePlayer>,
    pub bets: Vec<PlacedBet>,
    pub result: Option<u8>,
    /// Most recent first.
    pub history: VecDeque<u8>,
    pub round: u32,
    rng: GameRng,
}

impl RouletteState {
    fn is_seated(&self, user_id: UserId) -> bool {
        self.players.iter().any(|p| p.user_id == user_id)
    }

    /// Gross return per bettor for the resolved round, in seat order.
    pub fn round_payouts(&self) -> Vec<(UserId, i64)> {
        let mut per_user: BTreeMap<UserId, i64> = BTreeMap::new();
        for bet in &self.bets {
            *per_user.entry(bet.user_id).or_default() += bet.payout.unwrap_or(0);
        }
        self.players
            .iter()
            .filter_map(|p| per_user.get(&p.user_id).map(|amt| (p.user_id, *amt)))
            .collect()
    }

    pub fn staked_by(&self, user_id: UserId) -> i64 {
        self.bets
            .iter()
            .filter(|b| b.user_id == user_id)
            .map(|b| b.amount)
            .sum()
    }
}

pub struct RouletteEngine;

impl RuleEngine for RouletteEngine {
    type State = RouletteState;
    type Action = RouletteAction;
    type Settings = RouletteSettings;

    fn initialize(
        players: &[PlayerSeat],
        settings: &RouletteSettings,
        seed: Seed,
    ) -> Result<RouletteState, DomainError> {
        check_player_count(GameKind::Roulette, players)?;
        if settings.min_bet <= 0 || settings.max_bet < settings.min_bet {
            return Err(DomainError::validation(
                ValidationKind::InvalidSettings,
                "Table limits must satisfy 0 < min <= max",
            ));
        }
        Ok(RouletteState {
            settings: settings.clone(),
            phase: RoulettePhase::Betting,
            players: players
                .iter()
                .map(|p| RoulettePlayer {
                    user_id: p.user_id,
                    display_name: p.display_name.clone(),
                })
                .collect(),
            bets: Vec::new(),
            result: None,
            history: VecDeque::with_capacity(HISTORY_LEN),
            round: 1,
            rng: GameRng::from_seed(seed),
        })
    }

    fn apply(
        state: &RouletteState,
        action: RouletteAction,
        actor: Actor,
    ) -> Result<RouletteState, DomainError> {
        let mut next = state.clone();
        match action {
            RouletteAction::PlaceBet {
                bet_type,
                numbers,
                amount,
            } => {
                if next.phase != RoulettePhase::Betting {
                    return Err(wrong_phase(&next.phase, "place a bet"));
                }
                let user_id = actor.player_id().filter(|id| next.is_seated(*id)).ok_or_else(
                    || DomainError::validation(ValidationKind::NotSeated, "Only seated players may bet"),
                )?;
                let covered = validate_bet(bet_type, &numbers)?;
                if amount < next.settings.min_bet || amount > next.settings.max_bet {
                    return Err(DomainError::validation(
                        ValidationKind::BetOutOfRange,
                        format!(
                            "Bet must be between {} and {}",
                            next.settings.min_bet, next.settings.max_bet
                        ),
                    ));
                }
                let count = next.bets.iter().filter(|b| b.user_id == user_id).count();
                if count >= next.settings.max_bets_per_player {
                    return Err(DomainError::validation(
                        ValidationKind::InvalidBet,
                        "Too many bets this round",
                    ));
                }
                next.bets.push(PlacedBet {
                    user_id,
                    bet_type,
                    numbers: covered,
                    amount,
                    payout: None,
                });
            }
            RouletteAction::Spin => {
                if next.phase != RoulettePhase::Betting {
                    return Err(wrong_phase(&next.phase, "spin"));
                }
                actor.ensure_system()?;
                let number = next.rng.below(37) as u8;
                next.result = Some(number);
                next.history.push_front(number);
                next.history.truncate(HISTORY_LEN);
                next.phase = RoulettePhase::Spinning;
            }
            RouletteAction::Settle => {
                if next.phase != RoulettePhase::Spinning {
                    return Err(wrong_phase(&next.phase, "settle"));
                }
                actor.ensure_system()?;
                let winning = next.result.ok_or_else(|| {
                    DomainError::phase("Wheel has not been spun")
                })?;
                for bet in &mut next.bets {
                    bet.payout = Some(calculate_bet_payout(
                        bet.bet_type,
                        bet.amount,
                        &bet.numbers,
                        winning,
                    ));
                }
                next.phase = RoulettePhase::Settlement;
            }
            RouletteAction::NextRound => {
                if next.phase != RoulettePhase::Settlement {
                    return Err(wrong_phase(&next.phase, "start the next round"));
                }
                actor.ensure_system()?;
                next.bets.clear();
                next.result = None;
                next.round += 1;
                next.phase = RoulettePhase::Betting;
            }
            RouletteAction::RemovePlayer { user_id } => {
                actor.ensure_system()?;
                if !next.is_seated(user_id) {
                    return Err(DomainError::validation(
                        ValidationKind::NotSeated,
                        "Player is not seated",
                    ));
                }
                next.players.retain(|p| p.user_id != user_id);
                // Bets of a removed player are forfeit: open ones are dropped,
                // placed ones stay in the pot but `round_payouts` only pays
                // seated players.
                if next.phase == RoulettePhase::Betting {
                    next.bets.retain(|b| b.user_id != user_id);
                }
            }
        }
        Ok(next)
    }

    fn remove_player(user_id: UserId) -> RouletteAction {
        RouletteAction::RemovePlayer { user_id }
    }

    fn outcome(state: &RouletteState) -> Option<Outcome> {
        (state.phase == RoulettePhase::Settlement).then(|| Outcome::RoundSettled {
            round: state.round,
            payouts: state.round_payouts(),
        })
    }

    fn pending(state: &RouletteState) -> Pending {
        match state.phase {
            RoulettePhase::Betting => Pending::BettingWindow,
            RoulettePhase::Spinning => Pending::Resolve,
            RoulettePhase::Settlement => Pending::NextRound,
        }
    }

    fn on_timer(state: &RouletteState) -> Vec<RouletteAction> {
        match state.phase {
            RoulettePhase::Betting => vec![RouletteAction::Spin],
            RoulettePhase::Spinning => vec![RouletteAction::Settle],
            RoulettePhase::Settlement => vec![RouletteAction::NextRound],
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouletteView {
    pub phase: RoulettePhase,
    pub players: Vec<RoulettePlayer>,
    pub bets: Vec<PlacedBet>,
    pub result: Option<u8>,
    pub result_color: Option<Color>,
    pub history: Vec<u8>,
    pub round: u32,
    pub min_bet: i64,
    pub max_bet: i64,
}

impl RouletteState {
    pub fn view(&self) -> RouletteView {
        RouletteView {
            phase: self.phase,
            players: self.players.clone(),
            bets: self.bets.clone(),
            result: self.result,
            result_color: self.result.map(color_of),
            history: self.history.iter().copied().collect(),
            round: self.round,
            min_bet: self.settings.min_bet,
            max_bet: self.settings.max_bet,
        }
    }
}
