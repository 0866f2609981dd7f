use sea_orm::sea_query::Expr;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};

use crate::entities::wallets;
use crate::errors::domain::{DomainError, NotFoundKind, ResourceKind, ValidationKind};
use crate::infra::db_errors::map_db_err;

fn wallet_not_found(user_id: i64) -> DomainError {
    DomainError::not_found(
        NotFoundKind::Wallet,
        format!("Wallet for user {user_id} not found"),
    )
}

fn ensure_positive(amount: i64) -> Result<(), DomainError> {
    if amount <= 0 {
        return Err(DomainError::validation(
            ValidationKind::InvalidAmount,
            format!("Amount must be positive, got {amount}"),
        ));
    }
    Ok(())
}

pub async fn create_wallet<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    user_id: i64,
    balance: i64,
) -> Result<wallets::Model, DomainError> {
    wallets::ActiveModel {
        user_id: Set(user_id),
        balance: Set(balance),
        frozen: Set(false),
        updated_at: Set(time::OffsetDateTime::now_utc()),
    }
    .insert(conn)
    .await
    .map_err(map_db_err)
}

pub async fn find_wallet<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    user_id: i64,
) -> Result<Option<wallets::Model>, DomainError> {
    wallets::Entity::find_by_id(user_id)
        .one(conn)
        .await
        .map_err(map_db_err)
}

pub async fn require_wallet<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    user_id: i64,
) -> Result<wallets::Model, DomainError> {
    find_wallet(conn, user_id)
        .await?
        .ok_or_else(|| wallet_not_found(user_id))
}

/// Take `amount` out of a wallet. The balance check and the write are one
/// conditional UPDATE, so the balance can never go negative. Returns the new
/// balance.
pub async fn debit<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    user_id: i64,
    amount: i64,
) -> Result<i64, DomainError> {
    ensure_positive(amount)?;
    let result = wallets::Entity::update_many()
        .col_expr(
            wallets::Column::Balance,
            Expr::col(wallets::Column::Balance).sub(amount),
        )
        .col_expr(
            wallets::Column::UpdatedAt,
            Expr::value(time::OffsetDateTime::now_utc()),
        )
        .filter(wallets::Column::UserId.eq(user_id))
        .filter(wallets::Column::Frozen.eq(false))
        .filter(wallets::Column::Balance.gte(amount))
        .exec(conn)
        .await
        .map_err(map_db_err)?;

    if result.rows_affected == 0 {
        // Work out which precondition failed.
        let wallet = require_wallet(conn, user_id).await?;
        if wallet.frozen {
            return Err(DomainError::resource(
                ResourceKind::WalletFrozen,
                "Wallet is frozen",
            ));
        }
        return Err(DomainError::resource(
            ResourceKind::InsufficientBalance,
            format!("Balance {} is below {amount}", wallet.balance),
        ));
    }
    Ok(require_wallet(conn, user_id).await?.balance)
}

/// Add `amount` to a wallet; frozen wallets still receive refunds and payouts.
/// Returns the new balance.
pub async fn credit<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    user_id: i64,
    amount: i64,
) -> Result<i64, DomainError> {
    ensure_positive(amount)?;
    let result = wallets::Entity::update_many()
        .col_expr(
            wallets::Column::Balance,
            Expr::col(wallets::Column::Balance).add(amount),
        )
        .col_expr(
            wallets::Column::UpdatedAt,
            Expr::value(time::OffsetDateTime::now_utc()),
        )
        .filter(wallets::Column::UserId.eq(user_id))
        .exec(conn)
        .await
        .map_err(map_db_err)?;
    if result.rows_affected == 0 {
        return Err(wallet_not_found(user_id));
    }
    Ok(require_wallet(conn, user_id).await?.balance)
}

pub async fn set_frozen<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    user_id: i64,
    frozen: bool,
) -> Result<wallets::Model, DomainError> {
    let wallet = require_wallet(conn, user_id).await?;
    let mut active: wallets::ActiveModel = wallet.into();
    active.frozen = Set(frozen);
    active.updated_at = Set(time::OffsetDateTime::now_utc());
    active.update(conn).await.map_err(map_db_err)
}
