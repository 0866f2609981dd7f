//! Who a user is, as far as rooms care: name, role and wallet state.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use sea_orm::DatabaseConnection;
use tracing::info;

use crate::db::txn::with_txn;
use crate::domain::engine::UserId;
use crate::entities::users::UserRole;
use crate::errors::domain::{DomainError, NotFoundKind};
use crate::repos::{users, wallets};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub user_id: UserId,
    pub display_name: String,
    pub role: UserRole,
    pub wallet_frozen: bool,
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn profile(&self, user_id: UserId) -> Result<UserProfile, DomainError>;
}

/// Profiles straight from the users and wallets tables.
pub struct DbUserDirectory {
    db: DatabaseConnection,
}

impl DbUserDirectory {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserDirectory for DbUserDirectory {
    async fn profile(&self, user_id: UserId) -> Result<UserProfile, DomainError> {
        let user = users::require_user(&self.db, user_id).await?;
        let wallet = wallets::find_wallet(&self.db, user_id).await?;
        Ok(UserProfile {
            user_id,
            display_name: user.display_name,
            role: user.role,
            wallet_frozen: wallet.is_some_and(|w| w.frozen),
        })
    }
}

/// Fixed profiles held in memory.
#[derive(Default)]
pub struct StaticUserDirectory {
    profiles: RwLock<HashMap<UserId, UserProfile>>,
}

impl StaticUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, user_id: UserId, display_name: &str) {
        self.profiles.write().insert(
            user_id,
            UserProfile {
                user_id,
                display_name: display_name.to_string(),
                role: UserRole::Player,
                wallet_frozen: false,
            },
        );
    }

    pub fn set_frozen(&self, user_id: UserId, frozen: bool) {
        if let Some(profile) = self.profiles.write().get_mut(&user_id) {
            profile.wallet_frozen = frozen;
        }
    }
}

#[async_trait]
impl UserDirectory for StaticUserDirectory {
    async fn profile(&self, user_id: UserId) -> Result<UserProfile, DomainError> {
        self.profiles.read().get(&user_id).cloned().ok_or_else(|| {
            DomainError::not_found(NotFoundKind::User, format!("User {user_id} not found"))
        })
    }
}

/// Create a player together with a funded wallet.
pub async fn register_player(
    db: &DatabaseConnection,
    display_name: &str,
    opening_balance: i64,
) -> Result<UserId, DomainError> {
    let name = display_name.to_string();
    let user_id = with_txn(db, move |txn| {
        Box::pin(async move {
            let user = users::create_user(txn, &name, UserRole::Player).await?;
            wallets::create_wallet(txn, user.id, opening_balance).await?;
            Ok(user.id)
        })
    })
    .await?;
    info!(user_id, opening_balance, "player registered");
    Ok(user_id)
}
