use std::sync::Arc;
use std::time::Duration;

use gamehall::domain::UserId;
use gamehall::entities::escrows;
use gamehall::repos::escrows as escrow_repo;
use gamehall::services::settlement::{RetryPolicy, SettlementCoordinator};
use gamehall::services::users::register_player;
use gamehall::ws::hub::{Notifier, RecordingNotifier};
use gamehall::{bootstrap_db, DbOwner, DbProfile};
use sea_orm::DatabaseConnection;

/// A private, migrated in-memory ledger.
pub async fn ledger_db() -> DatabaseConnection {
    bootstrap_db(DbProfile::InMemory, DbOwner::App)
        .await
        .expect("in-memory ledger should bootstrap")
}

pub async fn funded(db: &DatabaseConnection, name: &str, balance: i64) -> UserId {
    register_player(db, name, balance)
        .await
        .expect("player registration")
}

/// Quick retries so failure paths finish in milliseconds.
pub fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        attempts: 3,
        initial_backoff: Duration::from_millis(5),
        max_backoff: Duration::from_millis(20),
    }
}

pub fn coordinator(
    db: &DatabaseConnection,
) -> (Arc<SettlementCoordinator>, Arc<RecordingNotifier>) {
    let notifier = Arc::new(RecordingNotifier::new());
    let coordinator = SettlementCoordinator::with_retry(
        db.clone(),
        notifier.clone() as Arc<dyn Notifier>,
        fast_retry(),
    );
    (Arc::new(coordinator), notifier)
}

pub async fn active_escrows(db: &DatabaseConnection, room_id: &str) -> Vec<escrows::Model> {
    escrow_repo::list_active_for_room(db, room_id)
        .await
        .expect("escrow query")
}

pub async fn balance(coordinator: &SettlementCoordinator, user_id: UserId) -> i64 {
    coordinator.balance(user_id).await.expect("wallet exists")
}
