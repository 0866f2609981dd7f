//! Multi-deck blackjack against the house.

pub mod engine;
pub mod hand;

pub use engine::{
    BlackjackAction, BlackjackEngine, BlackjackPhase, BlackjackSettings, BlackjackState,
    BlackjackView,
};
pub use hand::{hand_value, Hand, HandStatus};
