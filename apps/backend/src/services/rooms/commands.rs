//! Messages a room's actor task accepts.

use tokio::sync::oneshot;
use tokio::time::{Duration, Instant};

use super::record::{ChatMessage, RoomView};
use super::timers::TimerKind;
use crate::domain::engine::UserId;
use crate::domain::game::{GameAction, GameState};
use crate::errors::domain::DomainError;

pub type Reply<T> = oneshot::Sender<Result<T, DomainError>>;

/// Everything a caller may see of a room at one instant.
#[derive(Debug, Clone)]
pub struct RoomSnapshot {
    pub view: RoomView,
    pub game: Option<GameState>,
    pub chat: Vec<ChatMessage>,
}

pub enum RoomCommand {
    Join {
        user_id: UserId,
        spectator: bool,
        reply: Reply<RoomView>,
    },
    Leave {
        user_id: UserId,
        reply: Reply<()>,
    },
    SetReady {
        user_id: UserId,
        ready: bool,
        reply: Reply<RoomView>,
    },
    Start {
        user_id: UserId,
        reply: Reply<RoomView>,
    },
    Chat {
        user_id: UserId,
        text: String,
        reply: Reply<ChatMessage>,
    },
    Action {
        user_id: UserId,
        action: GameAction,
        reply: Reply<()>,
    },
    VotePause {
        user_id: UserId,
        reply: Reply<bool>,
    },
    VoteRematch {
        user_id: UserId,
        reply: Reply<bool>,
    },
    AfkAck {
        user_id: UserId,
        reply: Reply<()>,
    },
    Disconnect {
        user_id: UserId,
    },
    Reconnect {
        user_id: UserId,
        reply: Reply<RoomView>,
    },
    TimerFired {
        kind: TimerKind,
        generation: u64,
    },
    Snapshot {
        reply: Reply<RoomSnapshot>,
    },
    /// Close the room if it is empty or has been idle longer than
    /// `stale_after` as of `now`. Replies whether it closed.
    Sweep {
        now: Instant,
        stale_after: Duration,
        reply: Reply<bool>,
    },
    Shutdown {
        reply: Option<oneshot::Sender<()>>,
    },
}

impl RoomCommand {
    pub fn name(&self) -> &'static str {
        match self {
            RoomCommand::Join { .. } => "join",
            RoomCommand::Leave { .. } => "leave",
            RoomCommand::SetReady { .. } => "set_ready",
            RoomCommand::Start { .. } => "start",
            RoomCommand::Chat { .. } => "chat",
            RoomCommand::Action { .. } => "action",
            RoomCommand::VotePause { .. } => "vote_pause",
            RoomCommand::VoteRematch { .. } => "vote_rematch",
            RoomCommand::AfkAck { .. } => "afk_ack",
            RoomCommand::Disconnect { .. } => "disconnect",
            RoomCommand::Reconnect { .. } => "reconnect",
            RoomCommand::TimerFired { .. } => "timer_fired",
            RoomCommand::Snapshot { .. } => "snapshot",
            RoomCommand::Sweep { .. } => "sweep",
            RoomCommand::Shutdown { .. } => "shutdown",
        }
    }
}
