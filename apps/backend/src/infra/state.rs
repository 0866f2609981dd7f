use std::collections::HashSet;
use std::sync::Arc;

use tracing::{info, warn};

use crate::config::db::{DbOwner, DbProfile};
use crate::config::game::GameConfig;
use crate::error::AppError;
use crate::infra::db::bootstrap_db;
use crate::services::rooms::{RoomDeps, RoomRegistry};
use crate::services::settings::{SettingsProvider, StaticSettings};
use crate::services::settlement::SettlementCoordinator;
use crate::services::users::{DbUserDirectory, StaticUserDirectory, UserDirectory};
use crate::state::app_state::AppState;
use crate::state::security_config::SecurityConfig;
use crate::ws::hub::{Notifier, WsHub};

/// Builder for creating AppState instances (used in both tests and main)
pub struct StateBuilder {
    security_config: SecurityConfig,
    game_config: GameConfig,
    db_profile: Option<DbProfile>,
    users: Option<Arc<dyn UserDirectory>>,
}

impl StateBuilder {
    pub fn new() -> Self {
        Self {
            security_config: SecurityConfig::default(),
            game_config: GameConfig::default(),
            db_profile: None,
            users: None,
        }
    }
    pub fn with_db(mut self, profile: DbProfile) -> Self {
        self.db_profile = Some(profile);
        self
    }
    pub fn with_security(mut self, security_config: SecurityConfig) -> Self {
        self.security_config = security_config;
        self
    }
    pub fn with_game_config(mut self, game_config: GameConfig) -> Self {
        self.game_config = game_config;
        self
    }
    /// Replace the user directory that would otherwise be derived from the
    /// database (or left empty without one).
    pub fn with_users(mut self, users: Arc<dyn UserDirectory>) -> Self {
        self.users = Some(users);
        self
    }

    pub async fn build(self) -> Result<AppState, AppError> {
        self.game_config.validate()?;
        let hub = Arc::new(WsHub::new());
        let notifier: Arc<dyn Notifier> = hub.clone();

        let (db, settlement, users) = match self.db_profile {
            Some(profile) => {
                // single entrypoint: build + migrate
                let conn = bootstrap_db(profile, DbOwner::App).await?;
                let settlement = Arc::new(SettlementCoordinator::new(conn.clone(), notifier.clone()));
                // No room survives a restart, so every open escrow is an orphan.
                let refunded = settlement.refund_orphans(&HashSet::new()).await?;
                if refunded > 0 {
                    warn!(refunded, "refunded escrows left by a previous process");
                }
                let users = self
                    .users
                    .unwrap_or_else(|| Arc::new(DbUserDirectory::new(conn.clone())) as Arc<dyn UserDirectory>);
                (Some(conn), Some(settlement), users)
            }
            None => {
                let users = self
                    .users
                    .unwrap_or_else(|| Arc::new(StaticUserDirectory::new()) as Arc<dyn UserDirectory>);
                (None, None, users)
            }
        };

        let settings: Arc<dyn SettingsProvider> = Arc::new(StaticSettings::new(self.game_config.clone()));
        let rooms = Arc::new(RoomRegistry::new(RoomDeps {
            notifier,
            settlement: settlement.clone(),
            users,
            settings,
            config: self.game_config.clone(),
        }));
        info!(ledger = settlement.is_some(), "application state ready");

        Ok(AppState {
            db,
            security: self.security_config,
            config: self.game_config,
            hub,
            rooms,
            settlement,
        })
    }
}

impl Default for StateBuilder {
    fn default() -> Self {
        Self::new()
    }
}
pub fn build_state() -> StateBuilder {
    StateBuilder::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_build_succeeds_without_db_option() {
        let state = build_state().build().await.unwrap();
        assert!(state.db().is_none());
        assert!(state.settlement.is_none());
        assert!(state.rooms.is_empty());
    }

    #[tokio::test]
    async fn in_memory_build_wires_the_ledger() {
        let state = build_state()
            .with_db(DbProfile::InMemory)
            .with_game_config(GameConfig::for_tests())
            .build()
            .await
            .unwrap();
        assert!(state.db().is_some());
        assert!(state.settlement.is_some());
    }
}
