//! Per-deployment room settings the rooms read at runtime.

use std::time::Duration;

use async_trait::async_trait;

use crate::config::game::GameConfig;

#[async_trait]
pub trait SettingsProvider: Send + Sync {
    /// Basis points per finishing position, best first.
    async fn default_payout_ratios(&self) -> Vec<u32>;
    async fn afk_grace_period(&self) -> Duration;
}

/// Serves the values loaded into [`GameConfig`] at startup.
pub struct StaticSettings {
    config: GameConfig,
}

impl StaticSettings {
    pub fn new(config: GameConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl SettingsProvider for StaticSettings {
    async fn default_payout_ratios(&self) -> Vec<u32> {
        self.config.default_payout_ratios.clone()
    }

    async fn afk_grace_period(&self) -> Duration {
        self.config.afk_grace
    }
}
