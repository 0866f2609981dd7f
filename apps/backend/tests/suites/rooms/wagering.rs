//! Rooms backed by the escrow ledger. These run on the real clock with short
//! timers; see `common::wait_for`.

use std::time::Duration;

use gamehall::config::game::GameConfig;
use gamehall::domain::roulette::{BetType, RouletteAction};
use gamehall::domain::{GameAction, GameKind};
use gamehall::entities::escrows::EscrowStatus;
use gamehall::errors::domain::{DomainError, ResourceKind};
use gamehall::repos::wallets;
use gamehall::services::rooms::RoomStatus;
use gamehall::ws::protocol::ServerEvent;

use crate::common::wait_for;
use crate::support::ledger::{active_escrows, balance, coordinator, funded, ledger_db};
use crate::support::rooms::{create, ledger_harness, staked};

#[tokio::test]
async fn staked_tournament_locks_and_pays_the_survivor() {
    let db = ledger_db().await;
    let (coord, _) = coordinator(&db);
    let ann = funded(&db, "ann", 1_000).await;
    let bob = funded(&db, "bob", 1_000).await;
    let harness = ledger_harness(GameConfig::for_tests(), &db, coord.clone());

    let (view, room) = harness.open(ann, staked(GameKind::Dice, 100)).await;
    room.join(bob, false).await.unwrap();
    assert_eq!(balance(&coord, ann).await, 900);
    assert_eq!(balance(&coord, bob).await, 900);

    room.set_ready(ann, true).await.unwrap();
    room.set_ready(bob, true).await.unwrap();
    let open = active_escrows(&db, &view.room_id).await;
    assert!(open.iter().all(|e| e.status == EscrowStatus::Locked));

    // Walking out mid-game forfeits the stake; ann is left as the winner.
    room.leave(bob).await.unwrap();
    let snapshot = room.snapshot().await.unwrap();
    assert_eq!(snapshot.view.status, RoomStatus::Ended);
    assert_eq!(snapshot.view.hand_number, 1);

    assert_eq!(balance(&coord, ann).await, 1_000);
    assert_eq!(balance(&coord, bob).await, 900);
    assert!(active_escrows(&db, &view.room_id).await.is_empty());

    let ended = harness.notifier.events().into_iter().find_map(|(_, event)| match event {
        ServerEvent::GameEnded { payouts, winner, .. } => Some((winner, payouts)),
        _ => None,
    });
    let (winner, payouts) = ended.expect("game:ended broadcast");
    assert_eq!(winner, Some(ann));
    assert_eq!(payouts.len(), 1);
    assert_eq!(payouts[0].user_id, ann);
    assert_eq!(payouts[0].amount, 100);
}

#[tokio::test]
async fn players_who_cannot_pay_are_not_seated() {
    let db = ledger_db().await;
    let (coord, _) = coordinator(&db);
    let ann = funded(&db, "ann", 1_000).await;
    let poor = funded(&db, "poor", 50).await;
    let frozen = funded(&db, "frozen", 1_000).await;
    wallets::set_frozen(&db, frozen, true).await.unwrap();
    let harness = ledger_harness(GameConfig::for_tests(), &db, coord.clone());

    let (_, room) = harness.open(ann, staked(GameKind::Dice, 100)).await;

    let err = room.join(poor, false).await.unwrap_err();
    assert!(matches!(
        err,
        DomainError::Resource(ResourceKind::InsufficientBalance, _)
    ));
    let err = room.join(frozen, false).await.unwrap_err();
    assert!(matches!(err, DomainError::Resource(ResourceKind::WalletFrozen, _)));

    let view = room.snapshot().await.unwrap().view;
    assert_eq!(view.players.len(), 1);
    assert_eq!(balance(&coord, poor).await, 50);
}

#[tokio::test]
async fn shutdown_refunds_waiting_stakes() {
    let db = ledger_db().await;
    let (coord, _) = coordinator(&db);
    let ann = funded(&db, "ann", 1_000).await;
    let bob = funded(&db, "bob", 1_000).await;
    let harness = ledger_harness(GameConfig::for_tests(), &db, coord.clone());

    let (view, room) = harness.open(ann, staked(GameKind::Poker, 200)).await;
    room.join(bob, false).await.unwrap();
    assert_eq!(active_escrows(&db, &view.room_id).await.len(), 2);

    harness.registry.shutdown_all().await;
    assert_eq!(balance(&coord, ann).await, 1_000);
    assert_eq!(balance(&coord, bob).await, 1_000);
    assert!(active_escrows(&db, &view.room_id).await.is_empty());
}

#[tokio::test]
async fn afk_in_a_staked_room_warns_then_forfeits() {
    let db = ledger_db().await;
    let (coord, _) = coordinator(&db);
    let ann = funded(&db, "ann", 1_000).await;
    let bob = funded(&db, "bob", 1_000).await;
    let config = GameConfig {
        turn_timeout: Duration::from_millis(100),
        afk_threshold: 1,
        afk_grace: Duration::from_millis(300),
        ..GameConfig::for_tests()
    };
    let harness = ledger_harness(config, &db, coord.clone());

    let (_, room) = harness.open(ann, staked(GameKind::Dice, 100)).await;
    room.join(bob, false).await.unwrap();
    room.set_ready(ann, true).await.unwrap();
    room.set_ready(bob, true).await.unwrap();
    let afk = room
        .snapshot()
        .await
        .unwrap()
        .game
        .unwrap()
        .turn_holder()
        .unwrap();
    let other = if afk == ann { bob } else { ann };

    let notifier = harness.notifier.clone();
    let warned = wait_for(Duration::from_secs(2), || {
        let notifier = notifier.clone();
        async move {
            notifier
                .for_user(afk)
                .iter()
                .any(|e| matches!(e, ServerEvent::AfkWarning { .. }))
        }
    })
    .await;
    assert!(warned, "afk player should be warned before removal");

    // The first warned player runs out of grace first and forfeits; the
    // other wins the pot back.
    let coord_ref = coord.clone();
    let settled = wait_for(Duration::from_secs(3), || {
        let coord = coord_ref.clone();
        async move {
            coord.balance(afk).await.ok() == Some(900)
                && coord.balance(other).await.ok() == Some(1_000)
        }
    })
    .await;
    assert!(settled, "forfeit and payout should land");
}

#[tokio::test]
async fn afk_ack_within_grace_keeps_the_seat() {
    let db = ledger_db().await;
    let (coord, _) = coordinator(&db);
    let ann = funded(&db, "ann", 1_000).await;
    let bob = funded(&db, "bob", 1_000).await;
    // Both players idle. Without the ack, the first warned player's grace
    // would run out one turn before the other's.
    let config = GameConfig {
        turn_timeout: Duration::from_millis(400),
        afk_threshold: 1,
        afk_grace: Duration::from_millis(1_500),
        ..GameConfig::for_tests()
    };
    let harness = ledger_harness(config, &db, coord.clone());

    let (_, room) = harness.open(ann, staked(GameKind::Dice, 100)).await;
    room.join(bob, false).await.unwrap();
    room.set_ready(ann, true).await.unwrap();
    room.set_ready(bob, true).await.unwrap();
    let warned_first = room
        .snapshot()
        .await
        .unwrap()
        .game
        .unwrap()
        .turn_holder()
        .unwrap();
    let other = if warned_first == ann { bob } else { ann };

    let notifier = harness.notifier.clone();
    let warned = wait_for(Duration::from_secs(2), || {
        let notifier = notifier.clone();
        async move {
            notifier
                .for_user(warned_first)
                .iter()
                .any(|e| matches!(e, ServerEvent::AfkWarning { .. }))
        }
    })
    .await;
    assert!(warned);
    room.afk_ack(warned_first).await.unwrap();

    let coord_ref = coord.clone();
    let settled = wait_for(Duration::from_secs(5), || {
        let coord = coord_ref.clone();
        async move {
            coord.balance(warned_first).await.ok() == Some(1_000)
                && coord.balance(other).await.ok() == Some(900)
        }
    })
    .await;
    assert!(settled, "the player who never acknowledged should forfeit");

    tokio::time::sleep(Duration::from_millis(800)).await;
    let snapshot = room.snapshot().await.unwrap();
    assert_eq!(snapshot.view.status, RoomStatus::Ended);
    assert!(snapshot.view.players.iter().any(|p| p.user_id == warned_first));
    assert!(snapshot.view.players.iter().all(|p| p.user_id != other));
}

#[tokio::test]
async fn roulette_bets_are_escrowed_and_settled_per_spin() {
    let db = ledger_db().await;
    let (coord, _) = coordinator(&db);
    let ann = funded(&db, "ann", 1_000).await;
    let harness = ledger_harness(GameConfig::for_tests(), &db, coord.clone());

    let (view, room) = harness.open(ann, create(GameKind::Roulette)).await;
    room.set_ready(ann, true).await.unwrap();

    let bet = GameAction::Roulette(RouletteAction::PlaceBet {
        bet_type: BetType::Straight,
        numbers: vec![17],
        amount: 10,
    });
    room.act(ann, bet).await.unwrap();
    assert_eq!(balance(&coord, ann).await, 990);
    assert_eq!(active_escrows(&db, &view.room_id).await.len(), 1);

    // The host spins early instead of waiting out the betting window.
    room.act(ann, GameAction::Roulette(RouletteAction::Spin))
        .await
        .unwrap();

    let db_ref = db.clone();
    let room_id = view.room_id.clone();
    let settled = wait_for(Duration::from_secs(2), || {
        let db = db_ref.clone();
        let room_id = room_id.clone();
        async move { active_escrows(&db, &room_id).await.is_empty() }
    })
    .await;
    assert!(settled, "the spin should settle after the dealer delay");

    let after = balance(&coord, ann).await;
    assert!(after == 990 || after == 1_350, "unexpected balance {after}");
    assert_eq!(room.snapshot().await.unwrap().view.hand_number, 1);
    harness.registry.shutdown_all().await;
}
