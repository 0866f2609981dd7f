//! Live rooms by id, and the handles callers use to talk to them.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use ulid::Ulid;

use super::actor::RoomActor;
use super::commands::{Reply, RoomCommand, RoomSnapshot};
use super::record::{ChatMessage, Room, RoomView};
use crate::config::game::GameConfig;
use crate::domain::engine::{GameKind, UserId};
use crate::domain::game::{GameAction, GameSettings};
use crate::domain::payouts::validate_ratios;
use crate::errors::domain::{DomainError, InfraErrorKind, NotFoundKind, ValidationKind};
use crate::services::settings::SettingsProvider;
use crate::services::settlement::SettlementCoordinator;
use crate::services::users::UserDirectory;
use crate::ws::hub::Notifier;
use crate::ws::protocol::CreateRoom;

const ROOM_CHANNEL_CAPACITY: usize = 64;

/// What every room task is handed at birth.
#[derive(Clone)]
pub struct RoomDeps {
    pub notifier: Arc<dyn Notifier>,
    /// `None` runs rooms without a ledger: free play only.
    pub settlement: Option<Arc<SettlementCoordinator>>,
    pub users: Arc<dyn UserDirectory>,
    pub settings: Arc<dyn SettingsProvider>,
    pub config: GameConfig,
}

fn unavailable(room_id: &str) -> DomainError {
    DomainError::infra(
        InfraErrorKind::RoomUnavailable,
        format!("Room {room_id} is no longer running"),
    )
}

#[derive(Clone)]
pub struct RoomHandle {
    id: String,
    kind: GameKind,
    tx: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> GameKind {
        self.kind
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    async fn request<T>(&self, build: impl FnOnce(Reply<T>) -> RoomCommand) -> Result<T, DomainError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(build(reply))
            .await
            .map_err(|_| unavailable(&self.id))?;
        rx.await.map_err(|_| unavailable(&self.id))?
    }

    pub async fn join(&self, user_id: UserId, spectator: bool) -> Result<RoomView, DomainError> {
        self.request(|reply| RoomCommand::Join {
            user_id,
            spectator,
            reply,
        })
        .await
    }

    pub async fn leave(&self, user_id: UserId) -> Result<(), DomainError> {
        self.request(|reply| RoomCommand::Leave { user_id, reply }).await
    }

    pub async fn set_ready(&self, user_id: UserId, ready: bool) -> Result<RoomView, DomainError> {
        self.request(|reply| RoomCommand::SetReady {
            user_id,
            ready,
            reply,
        })
        .await
    }

    pub async fn start(&self, user_id: UserId) -> Result<RoomView, DomainError> {
        self.request(|reply| RoomCommand::Start { user_id, reply }).await
    }

    pub async fn chat(&self, user_id: UserId, text: String) -> Result<ChatMessage, DomainError> {
        self.request(|reply| RoomCommand::Chat {
            user_id,
            text,
            reply,
        })
        .await
    }

    pub async fn act(&self, user_id: UserId, action: GameAction) -> Result<(), DomainError> {
        self.request(|reply| RoomCommand::Action {
            user_id,
            action,
            reply,
        })
        .await
    }

    pub async fn vote_pause(&self, user_id: UserId) -> Result<bool, DomainError> {
        self.request(|reply| RoomCommand::VotePause { user_id, reply }).await
    }

    pub async fn vote_rematch(&self, user_id: UserId) -> Result<bool, DomainError> {
        self.request(|reply| RoomCommand::VoteRematch { user_id, reply })
            .await
    }

    pub async fn afk_ack(&self, user_id: UserId) -> Result<(), DomainError> {
        self.request(|reply| RoomCommand::AfkAck { user_id, reply }).await
    }

    pub async fn reconnect(&self, user_id: UserId) -> Result<RoomView, DomainError> {
        self.request(|reply| RoomCommand::Reconnect { user_id, reply }).await
    }

    pub async fn snapshot(&self) -> Result<RoomSnapshot, DomainError> {
        self.request(|reply| RoomCommand::Snapshot { reply }).await
    }

    /// Fire-and-forget; a room that already closed has nothing to do.
    pub async fn disconnect(&self, user_id: UserId) {
        let _ = self.tx.send(RoomCommand::Disconnect { user_id }).await;
    }

    /// Whether the room is gone after the check.
    pub async fn sweep(&self, now: Instant, stale_after: Duration) -> bool {
        self.request(|reply| RoomCommand::Sweep {
            now,
            stale_after,
            reply,
        })
        .await
        .unwrap_or(true)
    }

    /// Close the room and wait until it has refunded and said goodbye.
    pub async fn shutdown(&self) {
        let (reply, done) = oneshot::channel();
        if self
            .tx
            .send(RoomCommand::Shutdown { reply: Some(reply) })
            .await
            .is_ok()
        {
            let _ = done.await;
        }
    }
}

pub struct RoomRegistry {
    rooms: DashMap<String, RoomHandle>,
    deps: RoomDeps,
}

impl RoomRegistry {
    pub fn new(deps: RoomDeps) -> Self {
        Self {
            rooms: DashMap::new(),
            deps,
        }
    }

    pub fn deps(&self) -> &RoomDeps {
        &self.deps
    }

    /// Open a room with `host_id` seated in it.
    pub async fn create(&self, host_id: UserId, request: CreateRoom) -> Result<RoomView, DomainError> {
        let kind = request.game_kind;
        let settings = GameSettings::parse(kind, request.settings.as_ref())?;
        let ratios = match request.payout_ratios {
            Some(ratios) => ratios,
            None => self.deps.settings.default_payout_ratios().await,
        };
        validate_ratios(&ratios)?;
        if let Some(stake) = request.stake {
            if stake <= 0 {
                return Err(DomainError::validation(
                    ValidationKind::InvalidAmount,
                    format!("Stake must be positive, got {stake}"),
                ));
            }
            if !kind.is_tournament() {
                return Err(DomainError::validation(
                    ValidationKind::InvalidSettings,
                    format!("{kind:?} is played against the house; bets are placed per round"),
                ));
            }
            if self.deps.settlement.is_none() {
                return Err(DomainError::infra(
                    InfraErrorKind::RoomUnavailable,
                    "Staked rooms need the ledger",
                ));
            }
        }

        let id = Ulid::new().to_string();
        let room = Room::new(
            id.clone(),
            host_id,
            settings,
            request.stake,
            ratios,
            self.deps.config.chat_capacity,
        );
        let (tx, rx) = mpsc::channel(ROOM_CHANNEL_CAPACITY);
        let actor = RoomActor::new(room, rx, &tx, self.deps.clone());
        tokio::spawn(actor.run());

        let handle = RoomHandle {
            id: id.clone(),
            kind,
            tx,
        };
        self.rooms.insert(id.clone(), handle.clone());
        match handle.join(host_id, false).await {
            Ok(view) => {
                info!(room_id = %id, host_id, ?kind, "room created");
                Ok(view)
            }
            Err(err) => {
                handle.shutdown().await;
                self.rooms.remove(&id);
                Err(err)
            }
        }
    }

    pub fn get(&self, room_id: &str) -> Result<RoomHandle, DomainError> {
        let handle = self.rooms.get(room_id).map(|h| h.clone());
        match handle {
            Some(handle) if !handle.is_closed() => Ok(handle),
            Some(_) => {
                self.rooms.remove(room_id);
                Err(DomainError::not_found(NotFoundKind::Room, format!("Room {room_id} has closed")))
            }
            None => Err(DomainError::not_found(
                NotFoundKind::Room,
                format!("Room {room_id} does not exist"),
            )),
        }
    }

    pub fn room_ids(&self) -> Vec<String> {
        self.rooms.iter().map(|r| r.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    fn handles(&self) -> Vec<RoomHandle> {
        self.rooms.iter().map(|r| r.value().clone()).collect()
    }

    /// Close empty and idle rooms. Returns how many were dropped.
    pub async fn sweep(&self) -> usize {
        let now = Instant::now();
        let stale_after = self.deps.config.stale_room;
        let mut removed = 0;
        for handle in self.handles() {
            if handle.is_closed() || handle.sweep(now, stale_after).await {
                self.rooms.remove(handle.id());
                removed += 1;
            }
        }
        removed
    }

    pub fn spawn_sweeper(self: Arc<Self>, interval: Duration, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(interval_ms = interval.as_millis() as u64, "room sweeper started");
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(interval) => {
                        let removed = self.sweep().await;
                        if removed > 0 {
                            info!(removed, live = self.len(), "rooms swept");
                        }
                    }
                }
            }
            info!("room sweeper stopped");
        })
    }

    /// Close every room, refunding open escrows.
    pub async fn shutdown_all(&self) {
        let handles = self.handles();
        if !handles.is_empty() {
            warn!(rooms = handles.len(), "closing all rooms");
        }
        for handle in handles {
            handle.shutdown().await;
        }
        self.rooms.clear();
    }
}
