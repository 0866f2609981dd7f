//! The per-room task. It alone owns the [`Room`], so every command, timer
//! firing and settlement for a room happens in one sequence.

use tokio::sync::mpsc;
use tokio::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::commands::{RoomCommand, RoomSnapshot};
use super::record::{ChatMessage, Room, RoomStatus, RoomView};
use super::registry::RoomDeps;
use super::timers::{TimerKind, Timers};
use crate::domain::dice::DiceAction;
use crate::domain::engine::{Actor, GameKind, Pending, UserId};
use crate::domain::game::{GameAction, GameState};
use crate::domain::game_transition::{derive_game_transitions, GameTransition};
use crate::domain::rng::fresh_seed;
use crate::domain::roulette::RouletteAction;
use crate::errors::domain::{DomainError, InfraErrorKind, ResourceKind, ValidationKind};
use crate::services::settlement::{JobOutcome, SettlementCoordinator, SettlementJob};
use crate::ws::protocol::{PayoutLine, ServerEvent};

pub struct RoomActor {
    room: Room,
    rx: mpsc::Receiver<RoomCommand>,
    timers: Timers,
    deps: RoomDeps,
    /// What the armed game timer is counting down for.
    armed_for: Option<Pending>,
    closed: bool,
}

fn not_host() -> DomainError {
    DomainError::validation(ValidationKind::NotHost, "Only the host can do that")
}

impl RoomActor {
    pub fn new(room: Room, rx: mpsc::Receiver<RoomCommand>, tx: &mpsc::Sender<RoomCommand>, deps: RoomDeps) -> Self {
        Self {
            room,
            rx,
            timers: Timers::new(tx.downgrade()),
            deps,
            armed_for: None,
            closed: false,
        }
    }

    pub async fn run(mut self) {
        info!(room_id = %self.room.id, kind = ?self.room.kind, stake = ?self.room.stake, "room opened");
        while let Some(cmd) = self.rx.recv().await {
            debug!(room_id = %self.room.id, command = cmd.name(), "room command");
            self.handle(cmd).await;
            if self.closed {
                break;
            }
        }
        if !self.closed {
            self.close("abandoned").await;
        }
    }

    async fn handle(&mut self, cmd: RoomCommand) {
        match cmd {
            RoomCommand::Join {
                user_id,
                spectator,
                reply,
            } => {
                self.room.touch();
                let _ = reply.send(self.join(user_id, spectator).await);
            }
            RoomCommand::Leave { user_id, reply } => {
                self.room.touch();
                let _ = reply.send(self.leave(user_id).await);
            }
            RoomCommand::SetReady {
                user_id,
                ready,
                reply,
            } => {
                self.room.touch();
                let _ = reply.send(self.set_ready(user_id, ready).await);
            }
            RoomCommand::Start { user_id, reply } => {
                self.room.touch();
                let _ = reply.send(self.start(user_id).await);
            }
            RoomCommand::Chat {
                user_id,
                text,
                reply,
            } => {
                self.room.touch();
                let _ = reply.send(self.chat(user_id, &text));
            }
            RoomCommand::Action {
                user_id,
                action,
                reply,
            } => {
                self.room.touch();
                let _ = reply.send(self.apply_action(user_id, action).await);
            }
            RoomCommand::VotePause { user_id, reply } => {
                self.room.touch();
                let _ = reply.send(self.vote_pause(user_id).await);
            }
            RoomCommand::VoteRematch { user_id, reply } => {
                self.room.touch();
                let _ = reply.send(self.vote_rematch(user_id).await);
            }
            RoomCommand::AfkAck { user_id, reply } => {
                self.room.touch();
                let _ = reply.send(self.afk_ack(user_id));
            }
            RoomCommand::Disconnect { user_id } => self.disconnect(user_id).await,
            RoomCommand::Reconnect { user_id, reply } => {
                self.room.touch();
                let _ = reply.send(self.reconnect(user_id));
            }
            RoomCommand::TimerFired { kind, generation } => {
                self.timer_fired(kind, generation).await;
            }
            RoomCommand::Snapshot { reply } => {
                let _ = reply.send(Ok(RoomSnapshot {
                    view: self.room.view(),
                    game: self.room.game.clone(),
                    chat: self.room.chat.iter().cloned().collect(),
                }));
            }
            RoomCommand::Sweep {
                now,
                stale_after,
                reply,
            } => {
                let _ = reply.send(Ok(self.sweep(now, stale_after).await));
            }
            RoomCommand::Shutdown { reply } => {
                self.close("shutdown").await;
                if let Some(reply) = reply {
                    let _ = reply.send(());
                }
            }
        }
    }

    // ---- collaborators -------------------------------------------------

    fn settlement(&self) -> Option<&SettlementCoordinator> {
        self.deps.settlement.as_deref()
    }

    /// Real money moves in this room: a staked tournament, or a house game
    /// backed by the ledger.
    fn wagering(&self) -> bool {
        self.room.is_staked() || (!self.room.kind.is_tournament() && self.deps.settlement.is_some())
    }

    async fn run_job(&self, job: SettlementJob) -> JobOutcome {
        match self.settlement() {
            Some(settlement) => settlement.run_with_retry(job).await,
            None => JobOutcome::Done,
        }
    }

    fn broadcast(&self, event: ServerEvent) {
        self.deps.notifier.to_room(&self.room.id, &event);
    }

    fn broadcast_room(&self) {
        self.broadcast(ServerEvent::RoomUpdate(self.room.view()));
    }

    fn broadcast_game(&self) {
        if let Some(game) = &self.room.game {
            self.broadcast(ServerEvent::GameStateUpdate {
                room_id: self.room.id.clone(),
                state: game.view(),
            });
        }
    }

    fn send_private_cards(&self, user_id: UserId) {
        let Some(game) = &self.room.game else {
            return;
        };
        if let (Some(hand_number), Some(cards)) = (game.hand_marker(), game.private_cards(user_id)) {
            self.deps.notifier.to_user(
                user_id,
                &ServerEvent::HoleCards {
                    room_id: self.room.id.clone(),
                    hand_number,
                    cards,
                },
            );
        }
    }

    // ---- membership ----------------------------------------------------

    async fn join(&mut self, user_id: UserId, spectator: bool) -> Result<RoomView, DomainError> {
        if self.room.is_player(user_id) {
            return self.reconnect(user_id);
        }
        if spectator {
            self.room.add_spectator(user_id)?;
            info!(room_id = %self.room.id, user_id, "spectator joined");
            self.broadcast_room();
            self.broadcast_game();
            return Ok(self.room.view());
        }

        self.room.check_can_seat(user_id)?;
        let profile = self.deps.users.profile(user_id).await?;
        if profile.wallet_frozen && self.wagering() {
            return Err(DomainError::resource(
                ResourceKind::WalletFrozen,
                "Wallet is frozen",
            ));
        }
        if let Some(stake) = self.room.stake {
            let settlement = self.settlement().ok_or_else(|| {
                DomainError::infra(InfraErrorKind::RoomUnavailable, "Staked rooms need the ledger")
            })?;
            settlement.ensure_stake(&self.room.id, user_id, stake).await?;
        }
        self.room.add_player(user_id, &profile.display_name)?;
        info!(room_id = %self.room.id, user_id, "player joined");
        self.broadcast_room();
        Ok(self.room.view())
    }

    fn reconnect(&mut self, user_id: UserId) -> Result<RoomView, DomainError> {
        if self.room.spectators.contains(&user_id) {
            return Ok(self.room.view());
        }
        let slot = self.room.player_mut(user_id).ok_or_else(|| {
            DomainError::validation(ValidationKind::NotInRoom, "You are not in this room")
        })?;
        slot.connected = true;
        self.timers.cancel(TimerKind::Disconnect(user_id));
        info!(room_id = %self.room.id, user_id, "player reconnected");
        self.broadcast_room();
        self.broadcast_game();
        self.send_private_cards(user_id);
        Ok(self.room.view())
    }

    async fn leave(&mut self, user_id: UserId) -> Result<(), DomainError> {
        if self.room.spectators.remove(&user_id) {
            self.broadcast_room();
            self.close_if_empty().await;
            return Ok(());
        }
        self.room.require_player(user_id)?;
        self.remove_player(user_id, "left").await;
        Ok(())
    }

    async fn disconnect(&mut self, user_id: UserId) {
        if self.room.spectators.remove(&user_id) {
            self.broadcast_room();
            self.close_if_empty().await;
            return;
        }
        if !self.room.is_player(user_id) {
            return;
        }
        if self.room.status == RoomStatus::Playing {
            if let Some(slot) = self.room.player_mut(user_id) {
                slot.connected = false;
            }
            let grace = self.deps.config.disconnect_grace;
            self.timers.start(TimerKind::Disconnect(user_id), grace);
            info!(room_id = %self.room.id, user_id, grace_sec = grace.as_secs(), "player disconnected mid-game");
            self.broadcast_room();
        } else {
            self.remove_player(user_id, "disconnected").await;
        }
    }

    /// Take a player out of the room. Mid-game their escrow is forfeited and
    /// the engine plays on without them; before or after a game it is refunded.
    async fn remove_player(&mut self, user_id: UserId, reason: &'static str) {
        if !self.room.is_player(user_id) {
            return;
        }
        self.timers.cancel_user(user_id);

        let in_game = self.room.status == RoomStatus::Playing;
        let job = if in_game {
            SettlementJob::Forfeit {
                room_id: self.room.id.clone(),
                user_id,
            }
        } else {
            SettlementJob::Refund {
                room_id: self.room.id.clone(),
                user_id,
            }
        };
        let outcome = self.run_job(job).await;
        debug!(room_id = %self.room.id, user_id, ?outcome, "escrow resolved for departing player");

        self.room.remove_player(user_id);
        info!(room_id = %self.room.id, user_id, reason, in_game, "player removed");

        let next = match (&self.room.game, in_game) {
            (Some(game), true) => match game.apply(game.remove_player_action(user_id), Actor::System) {
                Ok(next) => Some(next),
                Err(err) => {
                    warn!(room_id = %self.room.id, user_id, error = %err, "engine refused player removal");
                    None
                }
            },
            _ => None,
        };
        match next {
            Some(next) if !self.room.players.is_empty() => self.commit(next).await,
            _ => self.broadcast_room(),
        }
        self.close_if_empty().await;
    }

    async fn close_if_empty(&mut self) {
        if self.room.players.is_empty() {
            self.close("empty").await;
        }
    }

    // ---- lobby ---------------------------------------------------------

    async fn set_ready(&mut self, user_id: UserId, ready: bool) -> Result<RoomView, DomainError> {
        self.room.set_ready(user_id, ready)?;
        self.broadcast_room();

        let paused = self.room.game.as_ref().is_some_and(GameState::is_paused);
        if paused && self.room.all_ready() {
            self.apply_system(GameAction::Dice(DiceAction::Resume)).await?;
        } else if self.room.status == RoomStatus::Waiting
            && self.room.all_ready()
            && self.room.has_enough_players()
        {
            self.start_game().await?;
        }
        Ok(self.room.view())
    }

    async fn start(&mut self, user_id: UserId) -> Result<RoomView, DomainError> {
        self.room.require_player(user_id)?;
        if user_id != self.room.host_id {
            return Err(not_host());
        }
        if self.room.status != RoomStatus::Waiting {
            return Err(DomainError::phase("Game already started"));
        }
        if !self.room.has_enough_players() {
            return Err(DomainError::validation(
                ValidationKind::InvalidPlayerCount,
                format!("{:?} needs at least {} players", self.room.kind, self.room.kind.min_players()),
            ));
        }
        self.start_game().await?;
        Ok(self.room.view())
    }

    async fn start_game(&mut self) -> Result<(), DomainError> {
        let state = GameState::start(&self.room.settings, &self.room.seats(), fresh_seed())?;
        if self.room.is_staked() {
            if let Some(settlement) = self.settlement() {
                settlement.lock_room(&self.room.id).await?;
            }
        }
        self.room.status = RoomStatus::Playing;
        self.room.pause_votes.clear();
        self.room.rematch_votes.clear();
        for slot in &mut self.room.players {
            slot.inactivity = 0;
        }
        info!(room_id = %self.room.id, kind = ?self.room.kind, players = self.room.players.len(), "game started");
        self.commit(state).await;
        Ok(())
    }

    fn chat(&mut self, user_id: UserId, text: &str) -> Result<ChatMessage, DomainError> {
        let message = self.room.push_chat(user_id, text)?;
        self.broadcast(ServerEvent::Chat(message.clone()));
        Ok(message)
    }

    // ---- play ----------------------------------------------------------

    async fn apply_action(&mut self, user_id: UserId, action: GameAction) -> Result<(), DomainError> {
        self.room.require_player(user_id)?;
        let game = match (&self.room.game, self.room.status) {
            (Some(game), RoomStatus::Playing) => game,
            _ => return Err(DomainError::phase("No game in progress")),
        };
        // The host may spin early; otherwise the wheel turns on the timer.
        let actor = match &action {
            GameAction::Roulette(RouletteAction::Spin) if user_id == self.room.host_id => Actor::System,
            GameAction::Roulette(RouletteAction::Spin) => return Err(not_host()),
            _ => Actor::Player(user_id),
        };
        let next = game.apply(action, actor)?;
        // Acting on one's own turn restarts that turn's clock.
        let own_turn = game.pending() == Pending::Turn(user_id);

        let delta = next.committed(user_id) - game.committed(user_id);
        if delta > 0 {
            if let Some(settlement) = self.settlement() {
                settlement.top_up(&self.room.id, user_id, delta).await?;
            }
        }

        if let Some(slot) = self.room.player_mut(user_id) {
            slot.inactivity = 0;
        }
        self.timers.cancel(TimerKind::AfkGrace(user_id));
        if own_turn {
            self.armed_for = None;
        }
        self.commit(next).await;
        Ok(())
    }

    async fn apply_system(&mut self, action: GameAction) -> Result<(), DomainError> {
        let game = self
            .room
            .game
            .as_ref()
            .ok_or_else(|| DomainError::phase("No game in progress"))?;
        let next = game.apply(action, Actor::System)?;
        self.commit(next).await;
        Ok(())
    }

    /// Install `next` as the current game and carry out everything the change
    /// implies.
    async fn commit(&mut self, next: GameState) {
        let before = self.room.game.take();
        let transitions = derive_game_transitions(before.as_ref(), &next);
        self.room.game = Some(next);
        self.broadcast_game();
        for transition in transitions {
            self.on_transition(transition).await;
        }
        self.broadcast_room();
        self.arm_game_timer();
    }

    async fn on_transition(&mut self, transition: GameTransition) {
        match transition {
            GameTransition::HandStarted { hand } => {
                debug!(room_id = %self.room.id, hand, "hand started");
                let ids: Vec<UserId> = self.room.players.iter().map(|p| p.user_id).collect();
                for user_id in ids {
                    self.send_private_cards(user_id);
                }
            }
            GameTransition::RoundSettled { round, payouts } => {
                let committed = self.room.game.as_ref().is_some_and(|game| {
                    self.room.players.iter().any(|p| game.committed(p.user_id) > 0)
                });
                let wagered = committed || !payouts.is_empty();
                if !wagered || self.settlement().is_none() {
                    return;
                }
                self.room.hand_number += 1;
                let outcome = self
                    .run_job(SettlementJob::House {
                        room_id: self.room.id.clone(),
                        hand_number: self.room.hand_number,
                        payouts,
                    })
                    .await;
                info!(room_id = %self.room.id, round, hand_number = self.room.hand_number, ?outcome, "house round settled");
            }
            GameTransition::Finished { winner, standings } => {
                self.room.status = RoomStatus::Ended;
                self.timers.cancel(TimerKind::Game);
                self.armed_for = None;
                for slot in &self.room.players {
                    self.timers.cancel(TimerKind::AfkGrace(slot.user_id));
                }
                self.room.rematch_votes.clear();
                self.room.pause_votes.clear();
                self.room.unready_all();

                let mut payouts = Vec::new();
                if self.room.is_staked() && self.settlement().is_some() {
                    self.room.hand_number += 1;
                    let outcome = self
                        .run_job(SettlementJob::Tournament {
                            room_id: self.room.id.clone(),
                            hand_number: self.room.hand_number,
                            standings: standings.clone(),
                            ratios: self.room.payout_ratios.clone(),
                        })
                        .await;
                    match outcome {
                        JobOutcome::Settled(report) => {
                            info!(room_id = %self.room.id, pot = report.pot, hand_number = report.hand_number, "tournament settled");
                            payouts = report.payouts;
                        }
                        other => {
                            warn!(room_id = %self.room.id, outcome = ?other, "tournament payout not applied inline");
                        }
                    }
                }
                info!(room_id = %self.room.id, ?winner, "game ended");
                self.broadcast(ServerEvent::GameEnded {
                    room_id: self.room.id.clone(),
                    winner,
                    scores: standings,
                    payouts: payouts
                        .into_iter()
                        .map(|(user_id, amount)| PayoutLine { user_id, amount })
                        .collect(),
                });
            }
            GameTransition::Paused => {
                self.timers.cancel(TimerKind::Game);
                self.armed_for = None;
                self.room.unready_all();
                info!(room_id = %self.room.id, "game paused by vote");
            }
            GameTransition::Resumed => {
                info!(room_id = %self.room.id, "game resumed");
            }
        }
    }

    fn timeout_for(&self, pending: Pending) -> Option<Duration> {
        let cfg = &self.deps.config;
        Some(match pending {
            Pending::Turn(_) if self.room.settings.speed_mode() => cfg.speed_turn_timeout,
            Pending::Turn(_) => cfg.turn_timeout,
            Pending::BettingWindow if self.room.kind == GameKind::Roulette => cfg.spin_delay,
            Pending::BettingWindow => cfg.betting_window,
            Pending::Resolve => cfg.dealer_delay,
            Pending::NextRound => cfg.next_hand_delay,
            Pending::Idle => return None,
        })
    }

    /// Point the game timer at whatever the game now waits on. A timer that
    /// already counts down for the same thing keeps running unless
    /// `armed_for` was cleared.
    fn arm_game_timer(&mut self) {
        let pending = match (&self.room.game, self.room.status) {
            (Some(game), RoomStatus::Playing) => game.pending(),
            _ => Pending::Idle,
        };
        if self.armed_for == Some(pending) && self.timers.is_armed(TimerKind::Game) {
            return;
        }
        match self.timeout_for(pending) {
            Some(after) => {
                self.timers.start(TimerKind::Game, after);
                self.armed_for = Some(pending);
            }
            None => {
                self.timers.cancel(TimerKind::Game);
                self.armed_for = None;
            }
        }
    }

    async fn timer_fired(&mut self, kind: TimerKind, generation: u64) {
        if !self.timers.accept(kind, generation) {
            debug!(room_id = %self.room.id, ?kind, generation, "stale timer ignored");
            return;
        }
        match kind {
            TimerKind::Game => self.game_timer_fired().await,
            TimerKind::AfkGrace(user_id) => {
                info!(room_id = %self.room.id, user_id, "afk grace expired");
                self.remove_player(user_id, "afk").await;
            }
            TimerKind::Disconnect(user_id) => {
                info!(room_id = %self.room.id, user_id, "disconnect grace expired");
                self.remove_player(user_id, "disconnected").await;
            }
        }
    }

    async fn game_timer_fired(&mut self) {
        self.armed_for = None;
        let Some(game) = self.room.game.as_ref() else {
            return;
        };
        if self.room.status != RoomStatus::Playing {
            return;
        }
        let holder = game.turn_holder();
        let actions = game.timer_actions();
        let mut played = false;
        for action in actions {
            let Some(current) = self.room.game.as_ref() else {
                break;
            };
            match current.apply(action.clone(), Actor::System) {
                Ok(next) => {
                    played = true;
                    self.commit(next).await;
                }
                Err(err) => {
                    warn!(room_id = %self.room.id, ?action, error = %err, "timer action rejected");
                    break;
                }
            }
            if self.room.status != RoomStatus::Playing {
                break;
            }
        }
        if !played {
            self.arm_game_timer();
        }
        if let (Some(user_id), true) = (holder, played) {
            self.note_auto_play(user_id).await;
        }
    }

    /// The server just played a turn for `user_id`.
    async fn note_auto_play(&mut self, user_id: UserId) {
        let threshold = self.deps.config.afk_threshold;
        let Some(slot) = self.room.player_mut(user_id) else {
            return;
        };
        slot.inactivity += 1;
        let count = slot.inactivity;
        debug!(room_id = %self.room.id, user_id, count, "turn auto-played");
        if count < threshold || self.timers.is_armed(TimerKind::AfkGrace(user_id)) {
            return;
        }
        if !self.wagering() {
            self.remove_player(user_id, "afk").await;
            return;
        }
        let grace = self.deps.settings.afk_grace_period().await;
        self.timers.start(TimerKind::AfkGrace(user_id), grace);
        self.deps.notifier.to_user(
            user_id,
            &ServerEvent::AfkWarning {
                room_id: self.room.id.clone(),
                grace_sec: grace.as_secs(),
            },
        );
        info!(room_id = %self.room.id, user_id, grace_sec = grace.as_secs(), "afk warning sent");
    }

    fn afk_ack(&mut self, user_id: UserId) -> Result<(), DomainError> {
        self.room.require_player(user_id)?;
        self.timers.cancel(TimerKind::AfkGrace(user_id));
        if let Some(slot) = self.room.player_mut(user_id) {
            slot.inactivity = 0;
        }
        Ok(())
    }

    // ---- votes ---------------------------------------------------------

    async fn vote_pause(&mut self, user_id: UserId) -> Result<bool, DomainError> {
        let passed = self.room.vote_pause(user_id)?;
        if passed {
            self.apply_system(GameAction::Dice(DiceAction::Pause)).await?;
        } else {
            self.broadcast_room();
        }
        Ok(passed)
    }

    async fn vote_rematch(&mut self, user_id: UserId) -> Result<bool, DomainError> {
        let everyone = self.room.vote_rematch(user_id)?;
        if everyone {
            self.rematch().await?;
        } else {
            self.broadcast_room();
        }
        Ok(everyone)
    }

    /// Back to waiting with fresh stakes, then straight into a new game when
    /// enough players could pay.
    async fn rematch(&mut self) -> Result<(), DomainError> {
        self.room.status = RoomStatus::Waiting;
        self.room.game = None;
        self.room.rematch_votes.clear();
        self.room.pause_votes.clear();
        self.room.unready_all();

        if let (Some(stake), Some(settlement)) = (self.room.stake, self.deps.settlement.clone()) {
            let ids: Vec<UserId> = self.room.players.iter().map(|p| p.user_id).collect();
            for user_id in ids {
                if let Err(err) = settlement.ensure_stake(&self.room.id, user_id, stake).await {
                    warn!(room_id = %self.room.id, user_id, error = %err, "rematch stake failed, seat released");
                    self.room.remove_player(user_id);
                    self.timers.cancel_user(user_id);
                }
            }
        }
        info!(room_id = %self.room.id, players = self.room.players.len(), "rematch agreed");
        self.broadcast_room();

        if self.room.players.is_empty() {
            self.close("empty").await;
        } else if self.room.has_enough_players() {
            self.start_game().await?;
        }
        Ok(())
    }

    // ---- lifetime ------------------------------------------------------

    async fn sweep(&mut self, now: Instant, stale_after: Duration) -> bool {
        let idle = now.saturating_duration_since(self.room.last_activity);
        if self.room.players.is_empty() || idle >= stale_after {
            info!(room_id = %self.room.id, idle_sec = idle.as_secs(), "stale room swept");
            self.close("stale").await;
            return true;
        }
        false
    }

    /// Refund whatever is still held and tell everyone the room is gone.
    async fn close(&mut self, reason: &'static str) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.timers.cancel_all();
        self.armed_for = None;

        let ids: Vec<UserId> = self.room.players.iter().map(|p| p.user_id).collect();
        for user_id in ids {
            let outcome = self
                .run_job(SettlementJob::Refund {
                    room_id: self.room.id.clone(),
                    user_id,
                })
                .await;
            debug!(room_id = %self.room.id, user_id, ?outcome, "escrow refunded on close");
        }
        self.broadcast(ServerEvent::RoomClosed {
            room_id: self.room.id.clone(),
        });
        info!(room_id = %self.room.id, reason, "room closed");
    }
}
