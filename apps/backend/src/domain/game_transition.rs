//! Side effects a room owes after a game transition, derived by comparing
//! the state before and after an `apply`.

use crate::domain::engine::{Outcome, UserId};
use crate::domain::game::GameState;
use crate::domain::standings::Standing;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameTransition {
    /// Edge-triggered: a new poker hand was dealt (or the game just began).
    HandStarted { hand: u32 },

    /// Edge-triggered: a house round resolved.
    RoundSettled {
        round: u32,
        payouts: Vec<(UserId, i64)>,
    },

    /// Edge-triggered: the game reached its terminal state.
    Finished {
        winner: Option<UserId>,
        standings: Vec<Standing>,
    },

    /// Edge-triggered: dice play paused or resumed.
    Paused,
    Resumed,
}

/// Derive transitions from `before` (None at game start) to `after`.
pub fn derive_game_transitions(before: Option<&GameState>, after: &GameState) -> Vec<GameTransition> {
    let mut transitions = Vec::new();

    if let Some(hand) = after.hand_marker() {
        if before.and_then(GameState::hand_marker) != Some(hand) {
            transitions.push(GameTransition::HandStarted { hand });
        }
    }

    let had_outcome = before.is_some_and(|b| b.outcome().is_some());
    if !had_outcome {
        match after.outcome() {
            Some(Outcome::RoundSettled { round, payouts }) => {
                transitions.push(GameTransition::RoundSettled { round, payouts });
            }
            Some(Outcome::Finished { winner, standings }) => {
                transitions.push(GameTransition::Finished { winner, standings });
            }
            None => {}
        }
    }

    let was_paused = before.is_some_and(GameState::is_paused);
    match (was_paused, after.is_paused()) {
        (false, true) => transitions.push(GameTransition::Paused),
        (true, false) => transitions.push(GameTransition::Resumed),
        _ => {}
    }

    transitions
}
