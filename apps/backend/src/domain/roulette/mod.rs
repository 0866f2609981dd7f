//! European roulette.

pub mod bets;
pub mod engine;

pub use bets::{calculate_bet_payout, validate_bet, BetType};
pub use engine::{RouletteAction, RouletteEngine, RoulettePhase, RouletteSettings, RouletteState, RouletteView};
