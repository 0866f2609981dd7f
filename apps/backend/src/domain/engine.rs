//! The contract every rule engine implements.
//!
//! Engines are pure: `apply` takes the current state by reference and returns
//! a new one, or a [`DomainError`] without touching the input. They never
//! start timers or send messages; callers derive those from [`RuleEngine::pending`]
//! and [`RuleEngine::outcome`] after each transition.
//!
//! Validation order is the same everywhere: phase, then turn ownership, then
//! parameter shape, then game invariants.

use serde::{Deserialize, Serialize};

use crate::domain::rng::Seed;
use crate::domain::standings::Standing;
use crate::errors::domain::{DomainError, ValidationKind};

pub type UserId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameKind {
    Dice,
    Blackjack,
    Roulette,
    Poker,
}

impl GameKind {
    pub fn min_players(self) -> usize {
        match self {
            GameKind::Dice | GameKind::Poker => 2,
            GameKind::Blackjack | GameKind::Roulette => 1,
        }
    }

    pub fn max_players(self) -> usize {
        match self {
            GameKind::Dice => 6,
            GameKind::Blackjack => 7,
            GameKind::Roulette => 8,
            GameKind::Poker => 9,
        }
    }

    /// Tournament games pay out once from the locked pot; house games settle
    /// every round against the house.
    pub fn is_tournament(self) -> bool {
        matches!(self, GameKind::Dice | GameKind::Poker)
    }
}

/// Who is performing an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    Player(UserId),
    /// Timers and the room orchestrator.
    System,
}

impl Actor {
    /// Turn ownership: the player whose turn it is, or the system acting for them.
    pub fn ensure_turn(self, expected: UserId) -> Result<(), DomainError> {
        match self {
            Actor::System => Ok(()),
            Actor::Player(id) if id == expected => Ok(()),
            Actor::Player(_) => Err(DomainError::out_of_turn()),
        }
    }

    pub fn ensure_system(self) -> Result<(), DomainError> {
        match self {
            Actor::System => Ok(()),
            Actor::Player(_) => Err(DomainError::validation(
                ValidationKind::UnsupportedAction,
                "Only the server may perform this action",
            )),
        }
    }

    pub fn player_id(self) -> Option<UserId> {
        match self {
            Actor::Player(id) => Some(id),
            Actor::System => None,
        }
    }
}

/// A seated participant handed to `initialize`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerSeat {
    pub user_id: UserId,
    pub display_name: String,
}

impl PlayerSeat {
    pub fn new(user_id: UserId, display_name: impl Into<String>) -> Self {
        Self {
            user_id,
            display_name: display_name.into(),
        }
    }
}

/// What a state is waiting for. The orchestrator maps each variant onto one
/// timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pending {
    /// A specific player must act.
    Turn(UserId),
    /// Bets are open; closes on a timer or when everyone has bet.
    BettingWindow,
    /// A system step resolves the round: blackjack dealer play, roulette
    /// settlement after the spin.
    Resolve,
    /// Round or hand resolved; the next one starts after a short delay.
    NextRound,
    /// Nothing to schedule: paused or finished.
    Idle,
}

/// Economic result of a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Tournament over. `winner` follows the game's tie rule.
    Finished {
        winner: Option<UserId>,
        standings: Vec<Standing>,
    },
    /// House round resolved. Amounts are gross returns (stake included).
    RoundSettled {
        round: u32,
        payouts: Vec<(UserId, i64)>,
    },
}

pub trait RuleEngine {
    type State: Clone + std::fmt::Debug;
    type Action: Clone + std::fmt::Debug;
    type Settings;

    fn initialize(
        players: &[PlayerSeat],
        settings: &Self::Settings,
        seed: Seed,
    ) -> Result<Self::State, DomainError>;

    fn apply(
        state: &Self::State,
        action: Self::Action,
        actor: Actor,
    ) -> Result<Self::State, DomainError>;

    fn remove_player(user_id: UserId) -> Self::Action;

    fn outcome(state: &Self::State) -> Option<Outcome>;

    fn pending(state: &Self::State) -> Pending;

    /// System actions to apply, in order, when the pending timer fires.
    fn on_timer(state: &Self::State) -> Vec<Self::Action>;
}

/// Shorthand for the "wrong phase" rejection.
pub(crate) fn wrong_phase<P: std::fmt::Debug>(phase: &P, action: &str) -> DomainError {
    DomainError::phase(format!("Cannot {action} during {phase:?}"))
}

/// Seat count checks shared by every engine.
pub(crate) fn check_player_count(
    kind: GameKind,
    players: &[PlayerSeat],
) -> Result<(), DomainError> {
    let n = players.len();
    if n < kind.min_players() || n > kind.max_players() {
        return Err(DomainError::validation(
            ValidationKind::InvalidPlayerCount,
            format!(
                "{kind:?} needs between {} and {} players, got {n}",
                kind.min_players(),
                kind.max_players()
            ),
        ));
    }
    let mut ids: Vec<UserId> = players.iter().map(|p| p.user_id).collect();
    ids.sort_unstable();
    ids.dedup();
    if ids.len() != n {
        return Err(DomainError::validation(
            ValidationKind::InvalidPlayerCount,
            "Duplicate player in seat list",
        ));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) fn seats(ids: &[UserId]) -> Vec<PlayerSeat> {
    ids.iter()
        .map(|id| PlayerSeat::new(*id, format!("player-{id}")))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_may_act_for_anyone() {
        assert!(Actor::System.ensure_turn(7).is_ok());
        assert!(Actor::Player(7).ensure_turn(7).is_ok());
        let err = Actor::Player(8).ensure_turn(7).unwrap_err();
        assert!(matches!(
            err,
            DomainError::Validation(ValidationKind::OutOfTurn, _)
        ));
    }

    #[test]
    fn player_count_bounds() {
        assert!(check_player_count(GameKind::Dice, &seats(&[1])).is_err());
        assert!(check_player_count(GameKind::Dice, &seats(&[1, 2])).is_ok());
        assert!(check_player_count(GameKind::Roulette, &seats(&[1])).is_ok());
        assert!(check_player_count(GameKind::Poker, &seats(&[1, 1])).is_err());
    }
}
