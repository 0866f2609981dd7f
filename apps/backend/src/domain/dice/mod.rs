//! Configurable dice-scoring game.

pub mod engine;
pub mod ruleset;
pub mod scoring;

pub use engine::{DiceAction, DiceEngine, DicePhase, DiceState, DiceView, Scoresheet};
pub use ruleset::{resolve_ruleset, MatchMode, Ruleset, RulesetOverrides};
pub use scoring::{calculate_upper_bonus, score, Category, Dice};
