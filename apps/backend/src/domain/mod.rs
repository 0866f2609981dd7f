//! Domain layer: pure game logic. Nothing here touches the database, the
//! clock or the network.

pub mod blackjack;
pub mod cards;
pub mod dice;
pub mod engine;
pub mod game;
pub mod game_transition;
pub mod payouts;
pub mod poker;
pub mod rng;
pub mod roulette;
pub mod standings;

// Re-exports for ergonomics
pub use engine::{Actor, GameKind, Outcome, Pending, PlayerSeat, RuleEngine, UserId};
pub use game::{GameAction, GameSettings, GameState, GameView};
pub use game_transition::{derive_game_transitions, GameTransition};
pub use rng::{fresh_seed, GameRng, Seed};
pub use standings::Standing;
