//! Websocket wire format: inbound `{verb, payload, ack}` frames and the
//! outbound `{event, payload}` envelope.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::blackjack::BlackjackAction;
use crate::domain::cards::Card;
use crate::domain::dice::{Category, DiceAction};
use crate::domain::engine::{GameKind, UserId};
use crate::domain::game::{GameAction, GameView};
use crate::domain::poker::PokerAction;
use crate::domain::roulette::{BetType, RouletteAction};
use crate::domain::standings::Standing;
use crate::errors::domain::{DomainError, ValidationKind};
use crate::services::rooms::record::{ChatMessage, RoomView};

#[derive(Debug, Clone, Deserialize)]
pub struct ClientFrame {
    pub verb: String,
    #[serde(default)]
    pub payload: Value,
    #[serde(default)]
    pub ack: Option<u64>,
}

/// Room parameters for `room:create`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoom {
    pub game_kind: GameKind,
    #[serde(default)]
    pub stake: Option<i64>,
    #[serde(default)]
    pub payout_ratios: Option<Vec<u32>>,
    #[serde(default)]
    pub settings: Option<Value>,
}

/// A decoded client frame.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientRequest {
    Create(CreateRoom),
    Join { room_id: String },
    Spectate { room_id: String },
    Leave { room_id: String },
    Ready { room_id: String, ready: bool },
    Start { room_id: String },
    Chat { room_id: String, text: String },
    VotePause { room_id: String },
    VoteRematch { room_id: String },
    AfkAck { room_id: String },
    Game { room_id: String, action: GameAction },
}

impl ClientRequest {
    pub fn room_id(&self) -> Option<&str> {
        match self {
            ClientRequest::Create(_) => None,
            ClientRequest::Join { room_id }
            | ClientRequest::Spectate { room_id }
            | ClientRequest::Leave { room_id }
            | ClientRequest::Ready { room_id, .. }
            | ClientRequest::Start { room_id }
            | ClientRequest::Chat { room_id, .. }
            | ClientRequest::VotePause { room_id }
            | ClientRequest::VoteRematch { room_id }
            | ClientRequest::AfkAck { room_id }
            | ClientRequest::Game { room_id, .. } => Some(room_id),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RoomRef {
    room_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReadyPayload {
    room_id: String,
    #[serde(default = "default_true")]
    ready: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatPayload {
    room_id: String,
    text: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RollPayload {
    room_id: String,
    #[serde(default)]
    kept_dice: Vec<usize>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CategoryPayload {
    room_id: String,
    category: Category,
    #[serde(default)]
    column_index: Option<usize>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct JokerPayload {
    room_id: String,
    die: usize,
    delta: i8,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AmountPayload {
    room_id: String,
    amount: i64,
}

#[derive(Deserialize)]
#[serde(rename_all = "snake_case")]
enum BlackjackMove {
    Hit,
    Stand,
    Double,
    Split,
    Insurance,
    Surrender,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BlackjackMovePayload {
    room_id: String,
    action: BlackjackMove,
}

#[derive(Deserialize)]
#[serde(rename_all = "snake_case")]
enum PokerMove {
    Fold,
    Check,
    Call,
    Raise,
    #[serde(alias = "allin", alias = "all-in")]
    AllIn,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PokerPayload {
    room_id: String,
    action: PokerMove,
    #[serde(default)]
    amount: Option<i64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RouletteBetPayload {
    room_id: String,
    bet_type: BetType,
    #[serde(default)]
    numbers: Vec<u8>,
    amount: i64,
}

fn bad_payload(verb: &str, err: serde_json::Error) -> DomainError {
    DomainError::validation_other(format!("Invalid payload for {verb}: {err}"))
}

fn decode<T: DeserializeOwned>(verb: &str, payload: Value) -> Result<T, DomainError> {
    serde_json::from_value(payload).map_err(|e| bad_payload(verb, e))
}

impl ClientFrame {
    /// Decode the verb and its payload into a typed request.
    pub fn request(&self) -> Result<ClientRequest, DomainError> {
        let verb = self.verb.as_str();
        let payload = self.payload.clone();
        let room = |payload| decode::<RoomRef>(verb, payload).map(|r| r.room_id);

        Ok(match verb {
            "room:create" => ClientRequest::Create(decode(verb, payload)?),
            "room:join" => ClientRequest::Join {
                room_id: room(payload)?,
            },
            "room:spectate" => ClientRequest::Spectate {
                room_id: room(payload)?,
            },
            "room:leave" => ClientRequest::Leave {
                room_id: room(payload)?,
            },
            "room:ready" => {
                let p: ReadyPayload = decode(verb, payload)?;
                ClientRequest::Ready {
                    room_id: p.room_id,
                    ready: p.ready,
                }
            }
            "room:start" => ClientRequest::Start {
                room_id: room(payload)?,
            },
            "room:chat" => {
                let p: ChatPayload = decode(verb, payload)?;
                ClientRequest::Chat {
                    room_id: p.room_id,
                    text: p.text,
                }
            }
            "room:vote-pause" => ClientRequest::VotePause {
                room_id: room(payload)?,
            },
            "room:vote-rematch" => ClientRequest::VoteRematch {
                room_id: room(payload)?,
            },
            "afk:ack" => ClientRequest::AfkAck {
                room_id: room(payload)?,
            },
            "game:roll-dice" => {
                let p: RollPayload = decode(verb, payload)?;
                game(p.room_id, GameAction::Dice(DiceAction::RollDice { kept: p.kept_dice }))
            }
            "game:choose-category" => {
                let p: CategoryPayload = decode(verb, payload)?;
                game(
                    p.room_id,
                    GameAction::Dice(DiceAction::ChooseCategory {
                        category: p.category,
                        column: p.column_index.unwrap_or(0),
                    }),
                )
            }
            "game:use-joker" => {
                let p: JokerPayload = decode(verb, payload)?;
                game(
                    p.room_id,
                    GameAction::Dice(DiceAction::UseJoker {
                        die: p.die,
                        delta: p.delta,
                    }),
                )
            }
            "game:stop-rolling" => game(room(payload)?, GameAction::Dice(DiceAction::StopRolling)),
            "blackjack:bet" => {
                let p: AmountPayload = decode(verb, payload)?;
                game(
                    p.room_id,
                    GameAction::Blackjack(BlackjackAction::PlaceBet { amount: p.amount }),
                )
            }
            "blackjack:action" => {
                let p: BlackjackMovePayload = decode(verb, payload)?;
                let action = match p.action {
                    BlackjackMove::Hit => BlackjackAction::Hit,
                    BlackjackMove::Stand => BlackjackAction::Stand,
                    BlackjackMove::Double => BlackjackAction::Double,
                    BlackjackMove::Split => BlackjackAction::Split,
                    BlackjackMove::Insurance => BlackjackAction::Insurance,
                    BlackjackMove::Surrender => BlackjackAction::Surrender,
                };
                game(p.room_id, GameAction::Blackjack(action))
            }
            "poker:action" => {
                let p: PokerPayload = decode(verb, payload)?;
                let action = match p.action {
                    PokerMove::Fold => PokerAction::Fold,
                    PokerMove::Check => PokerAction::Check,
                    PokerMove::Call => PokerAction::Call,
                    PokerMove::AllIn => PokerAction::AllIn,
                    PokerMove::Raise => {
                        let to = p.amount.ok_or_else(|| {
                            DomainError::validation(
                                ValidationKind::InvalidAmount,
                                "Raise needs an amount",
                            )
                        })?;
                        PokerAction::Raise { to }
                    }
                };
                game(p.room_id, GameAction::Poker(action))
            }
            "roulette:place-bet" => {
                let p: RouletteBetPayload = decode(verb, payload)?;
                game(
                    p.room_id,
                    GameAction::Roulette(RouletteAction::PlaceBet {
                        bet_type: p.bet_type,
                        numbers: p.numbers,
                        amount: p.amount,
                    }),
                )
            }
            "roulette:spin" => game(room(payload)?, GameAction::Roulette(RouletteAction::Spin)),
            other => {
                return Err(DomainError::validation(
                    ValidationKind::UnsupportedAction,
                    format!("Unknown verb '{other}'"),
                ))
            }
        })
    }
}

fn game(room_id: String, action: GameAction) -> ClientRequest {
    ClientRequest::Game { room_id, action }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AckPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ack: Option<u64>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl AckPayload {
    pub fn ok(ack: Option<u64>, data: Option<Value>) -> Self {
        Self {
            ack,
            success: true,
            error: None,
            code: None,
            data,
        }
    }

    pub fn err(ack: Option<u64>, err: &DomainError) -> Self {
        Self {
            ack,
            success: false,
            error: Some(err.to_string()),
            code: Some(err.code().as_str().to_string()),
            data: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PayoutLine {
    pub user_id: UserId,
    pub amount: i64,
}

#[allow(clippy::large_enum_variant)]
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "payload")]
pub enum ServerEvent {
    #[serde(rename = "ack")]
    Ack(AckPayload),

    #[serde(rename = "room:update")]
    RoomUpdate(RoomView),

    #[serde(rename = "game:state-update", rename_all = "camelCase")]
    GameStateUpdate { room_id: String, state: GameView },

    #[serde(rename = "game:ended", rename_all = "camelCase")]
    GameEnded {
        room_id: String,
        winner: Option<UserId>,
        scores: Vec<Standing>,
        payouts: Vec<PayoutLine>,
    },

    #[serde(rename = "room:chat")]
    Chat(ChatMessage),

    #[serde(rename = "afk:warning", rename_all = "camelCase")]
    AfkWarning { room_id: String, grace_sec: u64 },

    #[serde(rename = "wallet:balance")]
    WalletBalance { balance: i64 },

    #[serde(rename = "poker:hole-cards", rename_all = "camelCase")]
    HoleCards {
        room_id: String,
        hand_number: u32,
        cards: Vec<Card>,
    },

    #[serde(rename = "room:closed", rename_all = "camelCase")]
    RoomClosed { room_id: String },
}

impl ServerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::Ack(_) => "ack",
            ServerEvent::RoomUpdate(_) => "room:update",
            ServerEvent::GameStateUpdate { .. } => "game:state-update",
            ServerEvent::GameEnded { .. } => "game:ended",
            ServerEvent::Chat(_) => "room:chat",
            ServerEvent::AfkWarning { .. } => "afk:warning",
            ServerEvent::WalletBalance { .. } => "wallet:balance",
            ServerEvent::HoleCards { .. } => "poker:hole-cards",
            ServerEvent::RoomClosed { .. } => "room:closed",
        }
    }
}
