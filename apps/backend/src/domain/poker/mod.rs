//! Texas Hold'em freezeout.

pub mod engine;
pub mod hand_eval;
pub mod pots;

pub use engine::{PokerAction, PokerEngine, PokerPhase, PokerSettings, PokerState, PokerView};
pub use hand_eval::{evaluate_best, HandRank, HandValue};
pub use pots::{calculate_pots, distribute, Pot};
