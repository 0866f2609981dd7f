//! Jobs that keep failing are parked and retried later.

use gamehall::domain::standings::rank_by_score;
use gamehall::services::settlement::{JobOutcome, SettlementJob};
use sea_orm::{ConnectionTrait, DatabaseConnection, Statement};

use crate::support::ledger::{active_escrows, balance, coordinator, funded, ledger_db};

async fn exec(db: &DatabaseConnection, sql: &str) {
    db.execute(Statement::from_string(db.get_database_backend(), sql.to_string()))
        .await
        .expect("raw statement");
}

#[tokio::test]
async fn failing_settlement_is_queued_then_reconciled() {
    let db = ledger_db().await;
    let (coord, _) = coordinator(&db);
    let ann = funded(&db, "ann", 1_000).await;
    let bob = funded(&db, "bob", 1_000).await;

    coord.ensure_stake("t1", ann, 100).await.unwrap();
    coord.ensure_stake("t1", bob, 100).await.unwrap();
    coord.lock_room("t1").await.unwrap();

    // Hide the settlements table so every attempt fails mid-transaction.
    exec(&db, "ALTER TABLE settlements RENAME TO settlements_offline").await;

    let job = SettlementJob::Tournament {
        room_id: "t1".into(),
        hand_number: 1,
        standings: rank_by_score(&[(ann, 20), (bob, 10)]),
        ratios: vec![10_000],
    };
    assert_eq!(coord.run_with_retry(job).await, JobOutcome::Queued);
    assert_eq!(coord.pending_reconciliation(), 1);
    // The failed transactions rolled back: stakes are still held.
    assert_eq!(active_escrows(&db, "t1").await.len(), 2);
    assert_eq!(balance(&coord, ann).await, 900);

    // Still broken: the job stays queued.
    assert_eq!(coord.reconcile_once().await, (0, 1));

    exec(&db, "ALTER TABLE settlements_offline RENAME TO settlements").await;
    assert_eq!(coord.reconcile_once().await, (1, 0));
    assert_eq!(balance(&coord, ann).await, 1_100);
    assert_eq!(balance(&coord, bob).await, 900);
    assert!(active_escrows(&db, "t1").await.is_empty());
}

#[tokio::test]
async fn rejected_jobs_are_dropped_not_queued() {
    let db = ledger_db().await;
    let (coord, _) = coordinator(&db);
    let ann = funded(&db, "ann", 1_000).await;
    coord.top_up("wheel", ann, 10).await.unwrap();

    // A payout to a wallet that no longer exists cannot succeed on retry.
    exec(&db, &format!("DELETE FROM wallets WHERE user_id = {ann}")).await;
    let job = SettlementJob::House {
        room_id: "wheel".into(),
        hand_number: 1,
        payouts: vec![(ann, 20)],
    };
    assert_eq!(coord.run_with_retry(job).await, JobOutcome::Dropped);
    assert_eq!(coord.pending_reconciliation(), 0);
    // Rolled back as a whole: the escrow is still open.
    assert_eq!(active_escrows(&db, "wheel").await.len(), 1);
}
