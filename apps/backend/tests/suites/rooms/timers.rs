//! Turn clocks, AFK handling, disconnect grace and sweeping in free rooms.

use std::time::Duration;

use gamehall::config::game::GameConfig;
use gamehall::domain::dice::DiceAction;
use gamehall::domain::{GameAction, GameKind};
use gamehall::services::rooms::{RoomHandle, RoomStatus};

use crate::support::rooms::{create, free_harness, Harness};

async fn playing_dice_room(harness: &Harness) -> RoomHandle {
    let (_, room) = harness.open(1, create(GameKind::Dice)).await;
    room.join(2, false).await.unwrap();
    room.set_ready(1, true).await.unwrap();
    room.set_ready(2, true).await.unwrap();
    room
}

#[tokio::test(start_paused = true)]
async fn idle_turn_is_played_by_the_server() {
    let harness = free_harness(GameConfig::for_tests());
    let room = playing_dice_room(&harness).await;
    let first = room
        .snapshot()
        .await
        .unwrap()
        .game
        .unwrap()
        .turn_holder()
        .unwrap();

    tokio::time::sleep(Duration::from_secs(11)).await;

    let snapshot = room.snapshot().await.unwrap();
    let next = snapshot.game.unwrap().turn_holder();
    assert!(next.is_some());
    assert_ne!(next, Some(first));
    let slot = snapshot
        .view
        .players
        .iter()
        .find(|p| p.user_id == first)
        .unwrap();
    assert_eq!(slot.inactivity, 1);
}

#[tokio::test(start_paused = true)]
async fn rolling_restarts_the_turn_clock() {
    let harness = free_harness(GameConfig::for_tests());
    let room = playing_dice_room(&harness).await;
    let first = room
        .snapshot()
        .await
        .unwrap()
        .game
        .unwrap()
        .turn_holder()
        .unwrap();

    // Roll 8s into a 10s turn; the clock starts over from the roll.
    tokio::time::sleep(Duration::from_secs(8)).await;
    let roll = GameAction::Dice(DiceAction::RollDice { kept: vec![] });
    room.act(first, roll).await.unwrap();

    tokio::time::sleep(Duration::from_secs(4)).await;
    let snapshot = room.snapshot().await.unwrap();
    assert_eq!(snapshot.game.unwrap().turn_holder(), Some(first));
    let slot = snapshot
        .view
        .players
        .iter()
        .find(|p| p.user_id == first)
        .unwrap();
    assert_eq!(slot.inactivity, 0);

    tokio::time::sleep(Duration::from_secs(7)).await;
    let holder = room.snapshot().await.unwrap().game.unwrap().turn_holder();
    assert_ne!(holder, Some(first));
}

#[tokio::test(start_paused = true)]
async fn afk_player_in_a_free_room_is_removed() {
    let config = GameConfig {
        afk_threshold: 1,
        ..GameConfig::for_tests()
    };
    let harness = free_harness(config);
    let room = playing_dice_room(&harness).await;
    let afk = room
        .snapshot()
        .await
        .unwrap()
        .game
        .unwrap()
        .turn_holder()
        .unwrap();

    tokio::time::sleep(Duration::from_secs(11)).await;

    let snapshot = room.snapshot().await.unwrap();
    assert!(snapshot.view.players.iter().all(|p| p.user_id != afk));
    // Alone at the table, the other player wins.
    assert_eq!(snapshot.view.status, RoomStatus::Ended);
    assert!(harness.notifier.for_user(afk).is_empty());
}

#[tokio::test(start_paused = true)]
async fn reconnect_within_grace_keeps_the_seat() {
    let harness = free_harness(GameConfig::for_tests());
    let room = playing_dice_room(&harness).await;

    room.disconnect(2).await;
    tokio::time::sleep(Duration::from_secs(5)).await;
    let view = room.reconnect(2).await.unwrap();
    let slot = view.players.iter().find(|p| p.user_id == 2).unwrap();
    assert!(slot.connected);

    room.disconnect(2).await;
    tokio::time::sleep(Duration::from_secs(21)).await;

    let snapshot = room.snapshot().await.unwrap();
    assert_eq!(snapshot.view.players.len(), 1);
    assert_eq!(snapshot.view.players[0].user_id, 1);
    assert_eq!(snapshot.view.status, RoomStatus::Ended);
}

#[tokio::test(start_paused = true)]
async fn disconnect_in_the_lobby_frees_the_seat() {
    let harness = free_harness(GameConfig::for_tests());
    let (_, room) = harness.open(1, create(GameKind::Dice)).await;
    room.join(2, false).await.unwrap();

    room.disconnect(2).await;
    let snapshot = room.snapshot().await.unwrap();
    assert_eq!(snapshot.view.players.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn idle_rooms_are_swept() {
    let harness = free_harness(GameConfig::for_tests());
    let (view, _) = harness.open(1, create(GameKind::Dice)).await;
    assert_eq!(harness.registry.sweep().await, 0);

    tokio::time::sleep(GameConfig::for_tests().stale_room + Duration::from_secs(1)).await;
    assert_eq!(harness.registry.sweep().await, 1);
    assert!(harness.registry.get(&view.room_id).is_err());
    assert!(harness
        .notifier
        .room_event_names(&view.room_id)
        .contains(&"room:closed"));
}
