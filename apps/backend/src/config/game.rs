//! Room and timer tunables read from the environment.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::domain::payouts::validate_ratios;
use crate::error::AppError;

#[derive(Debug, Clone, PartialEq)]
pub struct GameConfig {
    pub turn_timeout: Duration,
    /// Turn timer for dice rulesets with `speed_mode`.
    pub speed_turn_timeout: Duration,
    pub betting_window: Duration,
    pub spin_delay: Duration,
    pub dealer_delay: Duration,
    pub next_hand_delay: Duration,
    pub disconnect_grace: Duration,
    pub afk_grace: Duration,
    /// Consecutive auto-plays before a player counts as AFK.
    pub afk_threshold: u32,
    pub stale_room: Duration,
    pub sweep_interval: Duration,
    pub reconciliation_interval: Duration,
    pub chat_capacity: usize,
    /// Basis points, best position first.
    pub default_payout_ratios: Vec<u32>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            turn_timeout: Duration::from_secs(60),
            speed_turn_timeout: Duration::from_secs(15),
            betting_window: Duration::from_secs(20),
            spin_delay: Duration::from_secs(25),
            dealer_delay: Duration::from_secs(1),
            next_hand_delay: Duration::from_secs(5),
            disconnect_grace: Duration::from_secs(60),
            afk_grace: Duration::from_secs(30),
            afk_threshold: 3,
            stale_room: Duration::from_secs(30 * 60),
            sweep_interval: Duration::from_secs(60),
            reconciliation_interval: Duration::from_secs(30),
            chat_capacity: 100,
            default_payout_ratios: vec![10_000],
        }
    }
}

impl GameConfig {
    /// Defaults overridden by any `GAMEHALL_*` variables that are set.
    pub fn from_env() -> Result<Self, AppError> {
        let d = Self::default();
        let config = Self {
            turn_timeout: secs("GAMEHALL_TURN_TIMEOUT_SECS", d.turn_timeout)?,
            speed_turn_timeout: secs("GAMEHALL_SPEED_TURN_TIMEOUT_SECS", d.speed_turn_timeout)?,
            betting_window: secs("GAMEHALL_BETTING_WINDOW_SECS", d.betting_window)?,
            spin_delay: secs("GAMEHALL_SPIN_DELAY_SECS", d.spin_delay)?,
            dealer_delay: millis("GAMEHALL_DEALER_DELAY_MS", d.dealer_delay)?,
            next_hand_delay: secs("GAMEHALL_NEXT_HAND_DELAY_SECS", d.next_hand_delay)?,
            disconnect_grace: secs("GAMEHALL_DISCONNECT_GRACE_SECS", d.disconnect_grace)?,
            afk_grace: secs("GAMEHALL_AFK_GRACE_SECS", d.afk_grace)?,
            afk_threshold: parsed("GAMEHALL_AFK_THRESHOLD", d.afk_threshold)?,
            stale_room: secs("GAMEHALL_STALE_ROOM_SECS", d.stale_room)?,
            sweep_interval: secs("GAMEHALL_SWEEP_INTERVAL_SECS", d.sweep_interval)?,
            reconciliation_interval: secs(
                "GAMEHALL_RECONCILIATION_INTERVAL_SECS",
                d.reconciliation_interval,
            )?,
            chat_capacity: parsed("GAMEHALL_CHAT_CAPACITY", d.chat_capacity)?,
            default_payout_ratios: ratios("GAMEHALL_PAYOUT_RATIOS", d.default_payout_ratios)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.afk_threshold == 0 {
            return Err(AppError::config("GAMEHALL_AFK_THRESHOLD must be at least 1"));
        }
        if self.chat_capacity == 0 {
            return Err(AppError::config("GAMEHALL_CHAT_CAPACITY must be at least 1"));
        }
        validate_ratios(&self.default_payout_ratios)
            .map_err(|e| AppError::config(format!("GAMEHALL_PAYOUT_RATIOS: {e}")))
    }

    /// Short timers for tests driving a paused tokio clock.
    pub fn for_tests() -> Self {
        Self {
            turn_timeout: Duration::from_secs(10),
            speed_turn_timeout: Duration::from_secs(5),
            betting_window: Duration::from_secs(10),
            spin_delay: Duration::from_secs(10),
            dealer_delay: Duration::from_millis(100),
            next_hand_delay: Duration::from_secs(1),
            disconnect_grace: Duration::from_secs(20),
            afk_grace: Duration::from_secs(15),
            ..Self::default()
        }
    }
}

fn parsed<T: FromStr>(name: &str, default: T) -> Result<T, AppError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::config(format!("{name} has an invalid value: '{raw}'"))),
        Err(_) => Ok(default),
    }
}

fn secs(name: &str, default: Duration) -> Result<Duration, AppError> {
    parsed(name, default.as_secs()).map(Duration::from_secs)
}

fn millis(name: &str, default: Duration) -> Result<Duration, AppError> {
    parsed(name, default.as_millis() as u64).map(Duration::from_millis)
}

/// Comma-separated basis points, e.g. `6000,3000,1000`.
fn ratios(name: &str, default: Vec<u32>) -> Result<Vec<u32>, AppError> {
    match env::var(name) {
        Ok(raw) => raw
            .split(',')
            .map(|part| {
                part.trim()
                    .parse::<u32>()
                    .map_err(|_| AppError::config(format!("{name} has an invalid entry: '{part}'")))
            })
            .collect(),
        Err(_) => Ok(default),
    }
}
