use std::sync::Arc;

use sea_orm::DatabaseConnection;

use super::security_config::SecurityConfig;
use crate::config::game::GameConfig;
use crate::services::rooms::RoomRegistry;
use crate::services::settlement::SettlementCoordinator;
use crate::ws::hub::WsHub;

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    /// Database connection (absent when running free rooms only)
    pub db: Option<DatabaseConnection>,
    /// Security configuration including JWT settings
    pub security: SecurityConfig,
    pub config: GameConfig,
    /// Websocket fan-out shared by every session
    pub hub: Arc<WsHub>,
    pub rooms: Arc<RoomRegistry>,
    /// Present whenever `db` is
    pub settlement: Option<Arc<SettlementCoordinator>>,
}

impl AppState {
    pub fn db(&self) -> Option<&DatabaseConnection> {
        self.db.as_ref()
    }
}
