//! Staking, locking, refunds and forfeits.

use gamehall::entities::escrows::EscrowStatus;
use gamehall::entities::ledger_entries::LedgerKind;
use gamehall::errors::domain::{DomainError, ResourceKind};
use gamehall::repos::{escrows, ledger, wallets};
use gamehall::ws::protocol::ServerEvent;

use crate::support::ledger::{active_escrows, balance, coordinator, funded, ledger_db};

#[tokio::test]
async fn stake_is_escrowed_once_per_room() {
    let db = ledger_db().await;
    let (coord, notifier) = coordinator(&db);
    let ann = funded(&db, "ann", 1_000).await;

    assert!(coord.ensure_stake("room-a", ann, 100).await.unwrap());
    // A second call finds the open escrow and moves nothing.
    assert!(!coord.ensure_stake("room-a", ann, 100).await.unwrap());
    assert_eq!(balance(&coord, ann).await, 900);

    let open = active_escrows(&db, "room-a").await;
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].status, EscrowStatus::Pending);
    assert_eq!(open[0].amount, 100);

    let pushed = notifier.for_user(ann);
    assert_eq!(pushed.len(), 1);
    assert!(matches!(pushed[0], ServerEvent::WalletBalance { balance: 900 }));
}

#[tokio::test]
async fn insufficient_balance_leaves_no_trace() {
    let db = ledger_db().await;
    let (coord, _) = coordinator(&db);
    let bob = funded(&db, "bob", 50).await;

    let err = coord.ensure_stake("room-a", bob, 100).await.unwrap_err();
    assert!(matches!(
        err,
        DomainError::Resource(ResourceKind::InsufficientBalance, _)
    ));
    assert_eq!(balance(&coord, bob).await, 50);
    assert!(active_escrows(&db, "room-a").await.is_empty());
    assert!(ledger::list_for_user(&db, bob).await.unwrap().is_empty());
}

#[tokio::test]
async fn frozen_wallet_cannot_stake_but_is_refunded() {
    let db = ledger_db().await;
    let (coord, _) = coordinator(&db);
    let cy = funded(&db, "cy", 500).await;

    coord.ensure_stake("room-a", cy, 200).await.unwrap();
    wallets::set_frozen(&db, cy, true).await.unwrap();

    let err = coord.ensure_stake("room-b", cy, 10).await.unwrap_err();
    assert!(matches!(err, DomainError::Resource(ResourceKind::WalletFrozen, _)));

    assert_eq!(coord.refund("room-a", cy).await.unwrap(), Some(200));
    assert_eq!(balance(&coord, cy).await, 500);
}

#[tokio::test]
async fn lock_then_refund_releases_the_stake() {
    let db = ledger_db().await;
    let (coord, _) = coordinator(&db);
    let ann = funded(&db, "ann", 1_000).await;
    let bob = funded(&db, "bob", 1_000).await;

    coord.ensure_stake("room-a", ann, 100).await.unwrap();
    coord.ensure_stake("room-a", bob, 100).await.unwrap();
    assert_eq!(coord.lock_room("room-a").await.unwrap(), 2);
    // Already locked: nothing more to do.
    assert_eq!(coord.lock_room("room-a").await.unwrap(), 0);

    assert_eq!(coord.refund_room("room-a").await.unwrap(), 2);
    assert_eq!(balance(&coord, ann).await, 1_000);
    assert_eq!(balance(&coord, bob).await, 1_000);
    // Nothing open means nothing to refund.
    assert_eq!(coord.refund("room-a", ann).await.unwrap(), None);

    let history = escrows::list_for_room(&db, "room-a").await.unwrap();
    assert!(history.iter().all(|e| e.status == EscrowStatus::Released));
}

#[tokio::test]
async fn forfeit_keeps_the_money_out() {
    let db = ledger_db().await;
    let (coord, _) = coordinator(&db);
    let ann = funded(&db, "ann", 1_000).await;

    coord.ensure_stake("room-a", ann, 250).await.unwrap();
    coord.lock_room("room-a").await.unwrap();
    assert_eq!(coord.forfeit("room-a", ann).await.unwrap(), Some(250));
    assert_eq!(coord.forfeit("room-a", ann).await.unwrap(), None);
    assert_eq!(balance(&coord, ann).await, 750);

    let kinds: Vec<LedgerKind> = ledger::list_for_user(&db, ann)
        .await
        .unwrap()
        .into_iter()
        .map(|entry| entry.kind)
        .collect();
    assert_eq!(kinds, vec![LedgerKind::Stake, LedgerKind::Forfeit]);
}

#[tokio::test]
async fn top_up_grows_one_escrow() {
    let db = ledger_db().await;
    let (coord, _) = coordinator(&db);
    let ann = funded(&db, "ann", 300).await;

    assert_eq!(coord.top_up("wheel", ann, 40).await.unwrap(), 260);
    assert_eq!(coord.top_up("wheel", ann, 60).await.unwrap(), 200);

    let open = active_escrows(&db, "wheel").await;
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].amount, 100);
    assert!(coord.top_up("wheel", ann, 0).await.is_err());
}

#[tokio::test]
async fn orphaned_escrows_are_refunded_on_startup() {
    let db = ledger_db().await;
    let (coord, _) = coordinator(&db);
    let ann = funded(&db, "ann", 1_000).await;
    let bob = funded(&db, "bob", 1_000).await;

    coord.ensure_stake("gone", ann, 100).await.unwrap();
    coord.ensure_stake("live", bob, 100).await.unwrap();

    let live = ["live".to_string()].into_iter().collect();
    assert_eq!(coord.refund_orphans(&live).await.unwrap(), 1);
    assert_eq!(balance(&coord, ann).await, 1_000);
    assert_eq!(balance(&coord, bob).await, 900);
}
