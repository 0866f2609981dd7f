//! The room record and its pure bookkeeping: roster, readiness, votes, chat.
//! Only the room's actor task ever holds one.

use std::collections::{BTreeSet, VecDeque};

use serde::Serialize;
use tokio::time::Instant;
use unicode_normalization::UnicodeNormalization;

use crate::domain::engine::{GameKind, PlayerSeat, UserId};
use crate::domain::game::{GameSettings, GameState};
use crate::errors::domain::{DomainError, ValidationKind};

pub const MAX_CHAT_CHARS: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomStatus {
    Waiting,
    Playing,
    Ended,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSlot {
    pub user_id: UserId,
    pub display_name: String,
    pub ready: bool,
    pub team_id: Option<u8>,
    pub seat: usize,
    /// Consecutive turns the server had to play for this player.
    pub inactivity: u32,
    pub connected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub room_id: String,
    pub user_id: UserId,
    pub display_name: String,
    pub text: String,
    /// Unix seconds.
    pub sent_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomView {
    pub room_id: String,
    pub game_kind: GameKind,
    pub status: RoomStatus,
    pub host_id: UserId,
    pub players: Vec<PlayerSlot>,
    pub spectators: Vec<UserId>,
    pub stake: Option<i64>,
    pub payout_ratios: Vec<u32>,
    pub hand_number: i32,
    pub pause_votes: usize,
    pub rematch_votes: usize,
    pub votes_needed: usize,
}

#[derive(Debug)]
pub struct Room {
    pub id: String,
    pub kind: GameKind,
    pub status: RoomStatus,
    pub host_id: UserId,
    pub players: Vec<PlayerSlot>,
    pub spectators: BTreeSet<UserId>,
    pub game: Option<GameState>,
    pub chat: VecDeque<ChatMessage>,
    pub chat_capacity: usize,
    pub pause_votes: BTreeSet<UserId>,
    pub rematch_votes: BTreeSet<UserId>,
    /// `None` is a free room.
    pub stake: Option<i64>,
    pub payout_ratios: Vec<u32>,
    pub settings: GameSettings,
    /// Settlements made so far; the next one uses `hand_number + 1`.
    pub hand_number: i32,
    pub last_activity: Instant,
}

fn invalid(kind: ValidationKind, detail: impl Into<String>) -> DomainError {
    DomainError::validation(kind, detail)
}

impl Room {
    pub fn new(
        id: String,
        host_id: UserId,
        settings: GameSettings,
        stake: Option<i64>,
        payout_ratios: Vec<u32>,
        chat_capacity: usize,
    ) -> Self {
        Self {
            id,
            kind: settings.kind(),
            status: RoomStatus::Waiting,
            host_id,
            players: Vec::new(),
            spectators: BTreeSet::new(),
            game: None,
            chat: VecDeque::with_capacity(chat_capacity),
            chat_capacity,
            pause_votes: BTreeSet::new(),
            rematch_votes: BTreeSet::new(),
            stake,
            payout_ratios,
            settings,
            hand_number: 0,
            last_activity: Instant::now(),
        }
    }

    pub fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    pub fn is_staked(&self) -> bool {
        self.stake.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty() && self.spectators.is_empty()
    }

    pub fn player(&self, user_id: UserId) -> Option<&PlayerSlot> {
        self.players.iter().find(|p| p.user_id == user_id)
    }

    pub fn player_mut(&mut self, user_id: UserId) -> Option<&mut PlayerSlot> {
        self.players.iter_mut().find(|p| p.user_id == user_id)
    }

    pub fn is_player(&self, user_id: UserId) -> bool {
        self.player(user_id).is_some()
    }

    pub fn require_player(&self, user_id: UserId) -> Result<&PlayerSlot, DomainError> {
        self.player(user_id)
            .ok_or_else(|| invalid(ValidationKind::NotInRoom, "You are not a player in this room"))
    }

    /// Seat a new player. Only while waiting and below the game's capacity.
    pub fn check_can_seat(&self, user_id: UserId) -> Result<(), DomainError> {
        if self.is_player(user_id) {
            return Err(invalid(ValidationKind::AlreadyJoined, "Already seated in this room"));
        }
        if self.status != RoomStatus::Waiting {
            return Err(DomainError::phase("Game already in progress"));
        }
        if self.players.len() >= self.kind.max_players() {
            return Err(invalid(
                ValidationKind::RoomFull,
                format!("Room is full ({} players)", self.kind.max_players()),
            ));
        }
        Ok(())
    }

    pub fn add_player(&mut self, user_id: UserId, display_name: &str) -> Result<&PlayerSlot, DomainError> {
        self.check_can_seat(user_id)?;
        let seat = (0..)
            .find(|s| self.players.iter().all(|p| p.seat != *s))
            .unwrap_or(self.players.len());
        self.spectators.remove(&user_id);
        self.players.push(PlayerSlot {
            user_id,
            display_name: display_name.to_string(),
            ready: false,
            team_id: None,
            seat,
            inactivity: 0,
            connected: true,
        });
        self.players.sort_by_key(|p| p.seat);
        self.require_player(user_id)
    }

    pub fn add_spectator(&mut self, user_id: UserId) -> Result<(), DomainError> {
        if self.is_player(user_id) {
            return Err(invalid(ValidationKind::AlreadyJoined, "Players cannot spectate their own room"));
        }
        self.spectators.insert(user_id);
        Ok(())
    }

    /// Drop a player from the roster and every vote. The host role passes to
    /// the lowest remaining seat.
    pub fn remove_player(&mut self, user_id: UserId) -> Option<PlayerSlot> {
        let idx = self.players.iter().position(|p| p.user_id == user_id)?;
        let slot = self.players.remove(idx);
        self.pause_votes.remove(&user_id);
        self.rematch_votes.remove(&user_id);
        if self.host_id == user_id {
            if let Some(next) = self.players.first() {
                self.host_id = next.user_id;
            }
        }
        Some(slot)
    }

    pub fn set_ready(&mut self, user_id: UserId, ready: bool) -> Result<(), DomainError> {
        if self.status == RoomStatus::Ended {
            return Err(DomainError::phase("Game has ended; vote for a rematch instead"));
        }
        let paused = self.game.as_ref().is_some_and(GameState::is_paused);
        if self.status == RoomStatus::Playing && !paused {
            return Err(DomainError::phase("Game already in progress"));
        }
        let slot = self
            .player_mut(user_id)
            .ok_or_else(|| invalid(ValidationKind::NotInRoom, "You are not a player in this room"))?;
        slot.ready = ready;
        Ok(())
    }

    pub fn unready_all(&mut self) {
        for p in &mut self.players {
            p.ready = false;
        }
    }

    pub fn all_ready(&self) -> bool {
        !self.players.is_empty() && self.players.iter().all(|p| p.ready)
    }

    pub fn has_enough_players(&self) -> bool {
        self.players.len() >= self.kind.min_players()
    }

    pub fn seats(&self) -> Vec<PlayerSeat> {
        self.players
            .iter()
            .map(|p| PlayerSeat::new(p.user_id, p.display_name.clone()))
            .collect()
    }

    /// Strict majority of seated players.
    pub fn majority(&self) -> usize {
        self.players.len() / 2 + 1
    }

    /// Record a pause vote; returns true when it carries.
    pub fn vote_pause(&mut self, user_id: UserId) -> Result<bool, DomainError> {
        self.require_player(user_id)?;
        let pausable = self.status == RoomStatus::Playing
            && self.game.as_ref().is_some_and(GameState::can_pause);
        if !pausable {
            return Err(invalid(
                ValidationKind::VoteNotAllowed,
                "Pausing is only possible while a dice player is rolling",
            ));
        }
        self.pause_votes.insert(user_id);
        if self.pause_votes.len() >= self.majority() {
            self.pause_votes.clear();
            return Ok(true);
        }
        Ok(false)
    }

    /// Record a rematch vote; returns true once every player has voted.
    pub fn vote_rematch(&mut self, user_id: UserId) -> Result<bool, DomainError> {
        self.require_player(user_id)?;
        if self.status != RoomStatus::Ended {
            return Err(invalid(
                ValidationKind::VoteNotAllowed,
                "Rematch votes open once the game has ended",
            ));
        }
        self.rematch_votes.insert(user_id);
        Ok(self
            .players
            .iter()
            .all(|p| self.rematch_votes.contains(&p.user_id)))
    }

    /// Normalise and store a chat line, evicting the oldest past capacity.
    pub fn push_chat(&mut self, user_id: UserId, text: &str) -> Result<ChatMessage, DomainError> {
        let display_name = match self.player(user_id) {
            Some(p) => p.display_name.clone(),
            None if self.spectators.contains(&user_id) => format!("spectator-{user_id}"),
            None => {
                return Err(invalid(ValidationKind::NotInRoom, "You are not in this room"));
            }
        };
        let normalized: String = text.nfc().collect();
        let trimmed = normalized.trim();
        let len = trimmed.chars().count();
        if len == 0 || len > MAX_CHAT_CHARS {
            return Err(invalid(
                ValidationKind::InvalidChat,
                format!("Chat messages must be 1 to {MAX_CHAT_CHARS} characters"),
            ));
        }
        let message = ChatMessage {
            room_id: self.id.clone(),
            user_id,
            display_name,
            text: trimmed.to_string(),
            sent_at: time::OffsetDateTime::now_utc().unix_timestamp(),
        };
        while self.chat.len() >= self.chat_capacity {
            self.chat.pop_front();
        }
        self.chat.push_back(message.clone());
        Ok(message)
    }

    pub fn view(&self) -> RoomView {
        let votes_needed = match self.status {
            RoomStatus::Ended => self.players.len(),
            _ => self.majority(),
        };
        RoomView {
            room_id: self.id.clone(),
            game_kind: self.kind,
            status: self.status,
            host_id: self.host_id,
            players: self.players.clone(),
            spectators: self.spectators.iter().copied().collect(),
            stake: self.stake,
            payout_ratios: self.payout_ratios.clone(),
            hand_number: self.hand_number,
            pause_votes: self.pause_votes.len(),
            rematch_votes: self.rematch_votes.len(),
            votes_needed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::dice::Ruleset;

    fn dice_room() -> Room {
        Room::new(
            "r1".into(),
            1,
            GameSettings::Dice(Ruleset::classic()),
            None,
            vec![10_000],
            3,
        )
    }

    #[test]
    fn seats_fill_lowest_free_slot() {
        let mut room = dice_room();
        room.add_player(1, "a").unwrap();
        room.add_player(2, "b").unwrap();
        room.add_player(3, "c").unwrap();
        room.remove_player(2);
        let slot = room.add_player(4, "d").unwrap();
        assert_eq!(slot.seat, 1);
    }

    #[test]
    fn host_passes_on_when_host_leaves() {
        let mut room = dice_room();
        room.add_player(1, "a").unwrap();
        room.add_player(2, "b").unwrap();
        room.remove_player(1);
        assert_eq!(room.host_id, 2);
    }

    #[test]
    fn no_seats_once_playing() {
        let mut room = dice_room();
        room.status = RoomStatus::Playing;
        let err = room.add_player(5, "e").unwrap_err();
        assert_eq!(err.code(), crate::errors::ErrorCode::PhaseMismatch);
    }

    #[test]
    fn room_full_at_capacity() {
        let mut room = dice_room();
        for id in 0..GameKind::Dice.max_players() as i64 {
            room.add_player(id + 10, "p").unwrap();
        }
        let err = room.add_player(99, "late").unwrap_err();
        assert_eq!(err.code(), crate::errors::ErrorCode::RoomFull);
    }

    #[test]
    fn chat_is_normalised_trimmed_and_bounded() {
        let mut room = dice_room();
        room.add_player(1, "a").unwrap();
        // "e" + combining acute composes to a single char under NFC.
        let msg = room.push_chat(1, "  cafe\u{301}  ").unwrap();
        assert_eq!(msg.text, "caf\u{e9}");
        for i in 0..5 {
            room.push_chat(1, &format!("m{i}")).unwrap();
        }
        assert_eq!(room.chat.len(), 3);
        assert_eq!(room.chat.front().unwrap().text, "m2");

        assert!(room.push_chat(1, "   ").is_err());
        assert!(room.push_chat(1, &"x".repeat(MAX_CHAT_CHARS + 1)).is_err());
        assert!(room.push_chat(1, &"x".repeat(MAX_CHAT_CHARS)).is_ok());
        assert!(room.push_chat(42, "hi").is_err());
    }

    #[test]
    fn rematch_needs_everyone() {
        let mut room = dice_room();
        room.add_player(1, "a").unwrap();
        room.add_player(2, "b").unwrap();
        assert!(room.vote_rematch(1).is_err());
        room.status = RoomStatus::Ended;
        assert!(!room.vote_rematch(1).unwrap());
        assert!(room.vote_rematch(2).unwrap());
    }

    #[test]
    fn ready_only_before_play() {
        let mut room = dice_room();
        room.add_player(1, "a").unwrap();
        room.add_player(2, "b").unwrap();
        room.set_ready(1, true).unwrap();
        assert!(!room.all_ready());
        room.set_ready(2, true).unwrap();
        assert!(room.all_ready());
        room.status = RoomStatus::Playing;
        assert!(room.set_ready(1, false).is_err());
    }
}
