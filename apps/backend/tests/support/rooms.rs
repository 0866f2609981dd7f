use std::sync::Arc;

use gamehall::config::game::GameConfig;
use gamehall::domain::{GameKind, UserId};
use gamehall::services::rooms::{RoomDeps, RoomHandle, RoomRegistry, RoomView};
use gamehall::services::settings::StaticSettings;
use gamehall::services::settlement::SettlementCoordinator;
use gamehall::services::users::{DbUserDirectory, StaticUserDirectory, UserDirectory};
use gamehall::ws::hub::{Notifier, RecordingNotifier};
use gamehall::ws::protocol::CreateRoom;
use sea_orm::DatabaseConnection;

pub struct Harness {
    pub registry: RoomRegistry,
    pub notifier: Arc<RecordingNotifier>,
}

impl Harness {
    pub async fn open(&self, host: UserId, create: CreateRoom) -> (RoomView, RoomHandle) {
        let view = self.registry.create(host, create).await.expect("room created");
        let handle = self.registry.get(&view.room_id).expect("room registered");
        (view, handle)
    }
}

fn deps(
    config: GameConfig,
    users: Arc<dyn UserDirectory>,
    settlement: Option<Arc<SettlementCoordinator>>,
    notifier: Arc<RecordingNotifier>,
) -> RoomDeps {
    RoomDeps {
        notifier: notifier as Arc<dyn Notifier>,
        settlement,
        users,
        settings: Arc::new(StaticSettings::new(config.clone())),
        config,
    }
}

/// Rooms without a ledger; users 1..=4 are "p1".."p4".
pub fn free_harness(config: GameConfig) -> Harness {
    let users = StaticUserDirectory::new();
    for id in 1..=4 {
        users.insert(id, &format!("p{id}"));
    }
    let notifier = Arc::new(RecordingNotifier::new());
    let registry = RoomRegistry::new(deps(config, Arc::new(users), None, notifier.clone()));
    Harness { registry, notifier }
}

/// Rooms backed by `db`, with profiles read from its users table.
pub fn ledger_harness(
    config: GameConfig,
    db: &DatabaseConnection,
    settlement: Arc<SettlementCoordinator>,
) -> Harness {
    let notifier = Arc::new(RecordingNotifier::new());
    let users: Arc<dyn UserDirectory> = Arc::new(DbUserDirectory::new(db.clone()));
    let registry = RoomRegistry::new(deps(config, users, Some(settlement), notifier.clone()));
    Harness { registry, notifier }
}

pub fn create(kind: GameKind) -> CreateRoom {
    CreateRoom {
        game_kind: kind,
        stake: None,
        payout_ratios: None,
        settings: None,
    }
}

pub fn staked(kind: GameKind, stake: i64) -> CreateRoom {
    CreateRoom {
        stake: Some(stake),
        ..create(kind)
    }
}
