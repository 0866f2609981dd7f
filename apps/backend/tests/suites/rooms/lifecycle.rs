//! Lobby flow, votes and rematches in free rooms.

use gamehall::config::game::GameConfig;
use gamehall::domain::dice::DiceAction;
use gamehall::domain::{GameAction, GameKind};
use gamehall::errors::domain::{DomainError, ValidationKind};
use gamehall::services::rooms::{RoomHandle, RoomStatus};

use crate::support::rooms::{create, free_harness, Harness};

async fn playing_dice_room(harness: &Harness) -> RoomHandle {
    let (_, room) = harness.open(1, create(GameKind::Dice)).await;
    room.join(2, false).await.unwrap();
    room.set_ready(1, true).await.unwrap();
    let view = room.set_ready(2, true).await.unwrap();
    assert_eq!(view.status, RoomStatus::Playing);
    room
}

#[tokio::test(start_paused = true)]
async fn pause_needs_a_majority_and_ready_resumes() {
    let harness = free_harness(GameConfig::for_tests());
    let room = playing_dice_room(&harness).await;

    assert!(!room.vote_pause(1).await.unwrap());
    assert!(room.vote_pause(2).await.unwrap());

    let snapshot = room.snapshot().await.unwrap();
    assert!(snapshot.game.as_ref().unwrap().is_paused());
    assert!(snapshot.view.players.iter().all(|p| !p.ready));

    // Paused games cannot take another pause vote.
    let err = room.vote_pause(1).await.unwrap_err();
    assert!(matches!(
        err,
        DomainError::Validation(ValidationKind::VoteNotAllowed, _)
    ));

    room.set_ready(1, true).await.unwrap();
    room.set_ready(2, true).await.unwrap();
    let snapshot = room.snapshot().await.unwrap();
    assert!(!snapshot.game.unwrap().is_paused());
    assert_eq!(snapshot.view.status, RoomStatus::Playing);
}

#[tokio::test(start_paused = true)]
async fn walkout_ends_the_game_and_rematch_reopens_the_lobby() {
    let harness = free_harness(GameConfig::for_tests());
    let room = playing_dice_room(&harness).await;
    let room_id = room.id().to_string();

    assert!(room.vote_rematch(1).await.is_err());
    room.leave(2).await.unwrap();

    let snapshot = room.snapshot().await.unwrap();
    assert_eq!(snapshot.view.status, RoomStatus::Ended);
    assert!(harness
        .notifier
        .room_event_names(&room_id)
        .contains(&"game:ended"));

    assert!(room.vote_rematch(1).await.unwrap());
    let snapshot = room.snapshot().await.unwrap();
    assert_eq!(snapshot.view.status, RoomStatus::Waiting);
    assert!(snapshot.game.is_none());

    // Seats open again once the lobby is back.
    room.join(3, false).await.unwrap();
    room.set_ready(1, true).await.unwrap();
    let view = room.set_ready(3, true).await.unwrap();
    assert_eq!(view.status, RoomStatus::Playing);
}

#[tokio::test(start_paused = true)]
async fn spectators_watch_and_chat_but_do_not_play() {
    let harness = free_harness(GameConfig::for_tests());
    let room = playing_dice_room(&harness).await;

    let view = room.join(4, true).await.unwrap();
    assert_eq!(view.spectators, vec![4]);

    let line = room.chat(4, "gl hf".into()).await.unwrap();
    assert_eq!(line.display_name, "spectator-4");

    let roll = GameAction::Dice(DiceAction::RollDice { kept: vec![] });
    let err = room.act(4, roll).await.unwrap_err();
    assert!(matches!(
        err,
        DomainError::Validation(ValidationKind::NotInRoom, _)
    ));
}

#[tokio::test(start_paused = true)]
async fn chat_lines_are_bounded() {
    let harness = free_harness(GameConfig::for_tests());
    let (_, room) = harness.open(1, create(GameKind::Dice)).await;

    assert!(room.chat(1, "   ".into()).await.is_err());
    assert!(room.chat(1, "x".repeat(501)).await.is_err());
    assert!(room.chat(2, "hi".into()).await.is_err());
    room.chat(1, "x".repeat(500)).await.unwrap();

    let snapshot = room.snapshot().await.unwrap();
    assert_eq!(snapshot.chat.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn wrong_game_actions_are_rejected() {
    let harness = free_harness(GameConfig::for_tests());
    let room = playing_dice_room(&harness).await;

    let fold = GameAction::Poker(gamehall::domain::poker::PokerAction::Fold);
    let err = room.act(1, fold).await.unwrap_err();
    assert!(matches!(
        err,
        DomainError::Validation(ValidationKind::UnsupportedAction, _)
    ));
}

#[tokio::test(start_paused = true)]
async fn poker_hole_cards_go_only_to_their_owner() {
    use gamehall::ws::protocol::ServerEvent;

    let harness = free_harness(GameConfig::for_tests());
    let (view, room) = harness.open(1, create(GameKind::Poker)).await;
    room.join(2, false).await.unwrap();
    room.set_ready(1, true).await.unwrap();
    room.set_ready(2, true).await.unwrap();

    for user in [1, 2] {
        let cards: Vec<_> = harness
            .notifier
            .for_user(user)
            .into_iter()
            .filter_map(|e| match e {
                ServerEvent::HoleCards { cards, .. } => Some(cards),
                _ => None,
            })
            .collect();
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].len(), 2);
    }
    assert!(!harness
        .notifier
        .room_event_names(&view.room_id)
        .contains(&"poker:hole-cards"));

    // A reconnecting player gets their cards again.
    room.reconnect(2).await.unwrap();
    let resent = harness
        .notifier
        .for_user(2)
        .iter()
        .filter(|e| matches!(e, ServerEvent::HoleCards { .. }))
        .count();
    assert_eq!(resent, 2);
}
