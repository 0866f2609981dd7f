//! One game of any kind, as the room orchestrator sees it.
//!
//! The four engines share the [`RuleEngine`] contract but not their types;
//! these enums close over them so a room can hold "the current game" without
//! caring which one it is. A mismatched action (a poker raise sent to a dice
//! room) is an `UnsupportedAction` validation error.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::blackjack::{
    BlackjackAction, BlackjackEngine, BlackjackSettings, BlackjackState, BlackjackView,
};
use crate::domain::cards::Card;
use crate::domain::dice::{
    resolve_ruleset, DiceAction, DiceEngine, DicePhase, DiceState, DiceView, Ruleset,
    RulesetOverrides,
};
use crate::domain::engine::{Actor, GameKind, Outcome, Pending, PlayerSeat, RuleEngine, UserId};
use crate::domain::poker::{PokerAction, PokerEngine, PokerSettings, PokerState, PokerView};
use crate::domain::rng::Seed;
use crate::domain::roulette::{
    RouletteAction, RouletteEngine, RouletteSettings, RouletteState, RouletteView,
};
use crate::errors::domain::{DomainError, ValidationKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameSettings {
    Dice(Ruleset),
    Blackjack(BlackjackSettings),
    Roulette(RouletteSettings),
    Poker(PokerSettings),
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DiceSettingsInput {
    preset: Option<String>,
    #[serde(flatten)]
    overrides: RulesetOverrides,
}

fn invalid_settings(err: serde_json::Error) -> DomainError {
    DomainError::validation(
        ValidationKind::InvalidSettings,
        format!("Invalid game settings: {err}"),
    )
}

impl GameSettings {
    /// Parse client-supplied settings for `kind`; `None` or `null` means defaults.
    pub fn parse(kind: GameKind, raw: Option<&Value>) -> Result<Self, DomainError> {
        let raw = raw.filter(|v| !v.is_null()).cloned();
        fn decode<T: for<'de> Deserialize<'de> + Default>(
            raw: Option<Value>,
        ) -> Result<T, DomainError> {
            match raw {
                Some(v) => serde_json::from_value(v).map_err(invalid_settings),
                None => Ok(T::default()),
            }
        }
        Ok(match kind {
            GameKind::Dice => {
                let input: DiceSettingsInput = decode(raw)?;
                GameSettings::Dice(resolve_ruleset(input.preset.as_deref(), &input.overrides)?)
            }
            GameKind::Blackjack => GameSettings::Blackjack(decode(raw)?),
            GameKind::Roulette => GameSettings::Roulette(decode(raw)?),
            GameKind::Poker => GameSettings::Poker(decode(raw)?),
        })
    }

    pub fn kind(&self) -> GameKind {
        match self {
            GameSettings::Dice(_) => GameKind::Dice,
            GameSettings::Blackjack(_) => GameKind::Blackjack,
            GameSettings::Roulette(_) => GameKind::Roulette,
            GameSettings::Poker(_) => GameKind::Poker,
        }
    }

    /// Speed-mode dice rooms run on a short turn clock.
    pub fn speed_mode(&self) -> bool {
        matches!(self, GameSettings::Dice(rules) if rules.speed_mode)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "game", content = "action", rename_all = "snake_case")]
pub enum GameAction {
    Dice(DiceAction),
    Blackjack(BlackjackAction),
    Roulette(RouletteAction),
    Poker(PokerAction),
}

impl GameAction {
    pub fn kind(&self) -> GameKind {
        match self {
            GameAction::Dice(_) => GameKind::Dice,
            GameAction::Blackjack(_) => GameKind::Blackjack,
            GameAction::Roulette(_) => GameKind::Roulette,
            GameAction::Poker(_) => GameKind::Poker,
        }
    }
}

#[derive(Debug, Clone)]
pub enum GameState {
    Dice(DiceState),
    Blackjack(BlackjackState),
    Roulette(RouletteState),
    Poker(PokerState),
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "game", rename_all = "snake_case")]
pub enum GameView {
    Dice(DiceView),
    Blackjack(BlackjackView),
    Roulette(RouletteView),
    Poker(PokerView),
}

fn mismatch(expected: GameKind, got: GameKind) -> DomainError {
    DomainError::validation(
        ValidationKind::UnsupportedAction,
        format!("{got:?} action is not supported in a {expected:?} game"),
    )
}

impl GameState {
    pub fn start(
        settings: &GameSettings,
        players: &[PlayerSeat],
        seed: Seed,
    ) -> Result<Self, DomainError> {
        Ok(match settings {
            GameSettings::Dice(s) => GameState::Dice(DiceEngine::initialize(players, s, seed)?),
            GameSettings::Blackjack(s) => {
                GameState::Blackjack(BlackjackEngine::initialize(players, s, seed)?)
            }
            GameSettings::Roulette(s) => {
                GameState::Roulette(RouletteEngine::initialize(players, s, seed)?)
            }
            GameSettings::Poker(s) => GameState::Poker(PokerEngine::initialize(players, s, seed)?),
        })
    }

    pub fn kind(&self) -> GameKind {
        match self {
            GameState::Dice(_) => GameKind::Dice,
            GameState::Blackjack(_) => GameKind::Blackjack,
            GameState::Roulette(_) => GameKind::Roulette,
            GameState::Poker(_) => GameKind::Poker,
        }
    }

    pub fn apply(&self, action: GameAction, actor: Actor) -> Result<Self, DomainError> {
        Ok(match (self, action) {
            (GameState::Dice(s), GameAction::Dice(a)) => {
                GameState::Dice(DiceEngine::apply(s, a, actor)?)
            }
            (GameState::Blackjack(s), GameAction::Blackjack(a)) => {
                GameState::Blackjack(BlackjackEngine::apply(s, a, actor)?)
            }
            (GameState::Roulette(s), GameAction::Roulette(a)) => {
                GameState::Roulette(RouletteEngine::apply(s, a, actor)?)
            }
            (GameState::Poker(s), GameAction::Poker(a)) => {
                GameState::Poker(PokerEngine::apply(s, a, actor)?)
            }
            (state, action) => return Err(mismatch(state.kind(), action.kind())),
        })
    }

    pub fn remove_player_action(&self, user_id: UserId) -> GameAction {
        match self {
            GameState::Dice(_) => GameAction::Dice(DiceEngine::remove_player(user_id)),
            GameState::Blackjack(_) => {
                GameAction::Blackjack(BlackjackEngine::remove_player(user_id))
            }
            GameState::Roulette(_) => GameAction::Roulette(RouletteEngine::remove_player(user_id)),
            GameState::Poker(_) => GameAction::Poker(PokerEngine::remove_player(user_id)),
        }
    }

    pub fn outcome(&self) -> Option<Outcome> {
        match self {
            GameState::Dice(s) => DiceEngine::outcome(s),
            GameState::Blackjack(s) => BlackjackEngine::outcome(s),
            GameState::Roulette(s) => RouletteEngine::outcome(s),
            GameState::Poker(s) => PokerEngine::outcome(s),
        }
    }

    pub fn pending(&self) -> Pending {
        match self {
            GameState::Dice(s) => DiceEngine::pending(s),
            GameState::Blackjack(s) => BlackjackEngine::pending(s),
            GameState::Roulette(s) => RouletteEngine::pending(s),
            GameState::Poker(s) => PokerEngine::pending(s),
        }
    }

    pub fn timer_actions(&self) -> Vec<GameAction> {
        match self {
            GameState::Dice(s) => DiceEngine::on_timer(s)
                .into_iter()
                .map(GameAction::Dice)
                .collect(),
            GameState::Blackjack(s) => BlackjackEngine::on_timer(s)
                .into_iter()
                .map(GameAction::Blackjack)
                .collect(),
            GameState::Roulette(s) => RouletteEngine::on_timer(s)
                .into_iter()
                .map(GameAction::Roulette)
                .collect(),
            GameState::Poker(s) => PokerEngine::on_timer(s)
                .into_iter()
                .map(GameAction::Poker)
                .collect(),
        }
    }

    /// The player the turn clock is running for, if any.
    pub fn turn_holder(&self) -> Option<UserId> {
        match self.pending() {
            Pending::Turn(user) => Some(user),
            _ => None,
        }
    }

    /// Money this user has at risk in the current house round.
    pub fn committed(&self, user_id: UserId) -> i64 {
        match self {
            GameState::Blackjack(s) => s.committed(user_id),
            GameState::Roulette(s) => s.staked_by(user_id),
            GameState::Dice(_) | GameState::Poker(_) => 0,
        }
    }

    pub fn is_paused(&self) -> bool {
        matches!(self, GameState::Dice(s) if s.phase == DicePhase::Paused)
    }

    /// A pause vote may only pass while a dice player is rolling.
    pub fn can_pause(&self) -> bool {
        matches!(self, GameState::Dice(s) if s.phase == DicePhase::Rolling)
    }

    /// Poker round identity; hole cards are re-sent whenever it changes.
    pub fn hand_marker(&self) -> Option<u32> {
        match self {
            GameState::Poker(s) => Some(s.hand_number),
            _ => None,
        }
    }

    /// Cards only `user_id` may see.
    pub fn private_cards(&self, user_id: UserId) -> Option<Vec<Card>> {
        match self {
            GameState::Poker(s) => s.hole_cards(user_id).map(<[Card]>::to_vec),
            _ => None,
        }
    }

    pub fn view(&self) -> GameView {
        match self {
            GameState::Dice(s) => GameView::Dice(s.view()),
            GameState::Blackjack(s) => GameView::Blackjack(s.view()),
            GameState::Roulette(s) => GameView::Roulette(s.view()),
            GameState::Poker(s) => GameView::Poker(s.view()),
        }
    }
}
