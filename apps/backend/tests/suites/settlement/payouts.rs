//! Tournament and house settlement, and that a hand pays at most once.

use gamehall::domain::standings::rank_by_score;
use gamehall::repos::ledger;
use gamehall::services::settlement::{JobOutcome, SettlementJob};

use crate::support::ledger::{active_escrows, balance, coordinator, funded, ledger_db};

#[tokio::test]
async fn tournament_pot_follows_ratios() {
    let db = ledger_db().await;
    let (coord, _) = coordinator(&db);
    let ann = funded(&db, "ann", 1_000).await;
    let bob = funded(&db, "bob", 1_000).await;
    let cy = funded(&db, "cy", 1_000).await;

    for user in [ann, bob, cy] {
        coord.ensure_stake("t1", user, 100).await.unwrap();
    }
    coord.lock_room("t1").await.unwrap();

    let standings = rank_by_score(&[(ann, 310), (bob, 250), (cy, 120)]);
    let report = coord
        .settle_tournament("t1", 1, &standings, &[7_000, 3_000])
        .await
        .unwrap();

    assert_eq!(report.pot, 300);
    assert_eq!(report.payouts, vec![(ann, 210), (bob, 90)]);
    assert_eq!(balance(&coord, ann).await, 1_110);
    assert_eq!(balance(&coord, bob).await, 990);
    assert_eq!(balance(&coord, cy).await, 900);
    assert!(active_escrows(&db, "t1").await.is_empty());
}

#[tokio::test]
async fn unstaked_players_drop_out_of_the_ranking() {
    let db = ledger_db().await;
    let (coord, _) = coordinator(&db);
    let ann = funded(&db, "ann", 1_000).await;
    let bob = funded(&db, "bob", 1_000).await;

    coord.ensure_stake("t2", bob, 100).await.unwrap();
    coord.lock_room("t2").await.unwrap();

    // Ann tops the table but never had a locked stake.
    let standings = rank_by_score(&[(ann, 500), (bob, 100)]);
    let report = coord
        .settle_tournament("t2", 1, &standings, &[10_000])
        .await
        .unwrap();
    assert_eq!(report.payouts, vec![(bob, 100)]);
    assert_eq!(balance(&coord, ann).await, 1_000);
}

#[tokio::test]
async fn a_hand_settles_only_once() {
    let db = ledger_db().await;
    let (coord, _) = coordinator(&db);
    let ann = funded(&db, "ann", 1_000).await;

    coord.top_up("wheel", ann, 10).await.unwrap();
    let job = SettlementJob::House {
        room_id: "wheel".into(),
        hand_number: 1,
        payouts: vec![(ann, 360)],
    };
    assert!(matches!(
        coord.run_with_retry(job.clone()).await,
        JobOutcome::Settled(_)
    ));
    assert_eq!(coord.run_with_retry(job).await, JobOutcome::AlreadySettled);
    assert_eq!(balance(&coord, ann).await, 1_350);

    let payouts = ledger::list_for_room(&db, "wheel")
        .await
        .unwrap()
        .into_iter()
        .filter(|entry| entry.amount > 0)
        .count();
    assert_eq!(payouts, 1);
}

#[tokio::test]
async fn house_payouts_need_an_escrow() {
    let db = ledger_db().await;
    let (coord, _) = coordinator(&db);
    let ann = funded(&db, "ann", 1_000).await;
    let bob = funded(&db, "bob", 1_000).await;

    coord.top_up("table", ann, 50).await.unwrap();
    let report = coord
        .settle_house("table", 1, &[(ann, 100), (bob, 100)])
        .await
        .unwrap();
    assert_eq!(report.pot, 50);
    assert_eq!(report.payouts, vec![(ann, 100)]);
    assert_eq!(balance(&coord, bob).await, 1_000);
}

#[tokio::test]
async fn balances_match_the_ledger() {
    let db = ledger_db().await;
    let (coord, _) = coordinator(&db);
    let ann = funded(&db, "ann", 1_000).await;
    let bob = funded(&db, "bob", 1_000).await;

    coord.ensure_stake("t3", ann, 100).await.unwrap();
    coord.ensure_stake("t3", bob, 100).await.unwrap();
    coord.lock_room("t3").await.unwrap();
    coord.forfeit("t3", bob).await.unwrap();
    let standings = rank_by_score(&[(ann, 1)]);
    coord
        .settle_tournament("t3", 1, &standings, &[10_000])
        .await
        .unwrap();
    coord.top_up("wheel", bob, 30).await.unwrap();
    coord.refund("wheel", bob).await.unwrap();

    for user in [ann, bob] {
        let net: i64 = ledger::list_for_user(&db, user)
            .await
            .unwrap()
            .iter()
            .map(|entry| entry.amount)
            .sum();
        assert_eq!(balance(&coord, user).await, 1_000 + net);
    }
}
