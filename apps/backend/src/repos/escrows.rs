use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, NotSet, QueryFilter, QueryOrder,
    Set,
};

use crate::entities::escrows::{self, EscrowStatus};
use crate::errors::domain::{ConflictKind, DomainError, NotFoundKind};
use crate::infra::db_errors::map_db_err;

const ACTIVE: [EscrowStatus; 2] = [EscrowStatus::Pending, EscrowStatus::Locked];

/// The one non-terminal escrow of `user_id` in `room_id`, if any.
pub async fn find_active<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    room_id: &str,
    user_id: i64,
) -> Result<Option<escrows::Model>, DomainError> {
    escrows::Entity::find()
        .filter(escrows::Column::RoomId.eq(room_id))
        .filter(escrows::Column::UserId.eq(user_id))
        .filter(escrows::Column::Status.is_in(ACTIVE))
        .one(conn)
        .await
        .map_err(map_db_err)
}

pub async fn list_active_for_room<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    room_id: &str,
) -> Result<Vec<escrows::Model>, DomainError> {
    escrows::Entity::find()
        .filter(escrows::Column::RoomId.eq(room_id))
        .filter(escrows::Column::Status.is_in(ACTIVE))
        .order_by_asc(escrows::Column::Id)
        .all(conn)
        .await
        .map_err(map_db_err)
}

pub async fn list_for_room<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    room_id: &str,
) -> Result<Vec<escrows::Model>, DomainError> {
    escrows::Entity::find()
        .filter(escrows::Column::RoomId.eq(room_id))
        .order_by_asc(escrows::Column::Id)
        .all(conn)
        .await
        .map_err(map_db_err)
}

/// Every non-terminal escrow across all rooms.
pub async fn list_all_active<C: ConnectionTrait + Send + Sync>(
    conn: &C,
) -> Result<Vec<escrows::Model>, DomainError> {
    escrows::Entity::find()
        .filter(escrows::Column::Status.is_in(ACTIVE))
        .order_by_asc(escrows::Column::Id)
        .all(conn)
        .await
        .map_err(map_db_err)
}

pub async fn create_escrow<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    room_id: &str,
    user_id: i64,
    amount: i64,
) -> Result<escrows::Model, DomainError> {
    let now = time::OffsetDateTime::now_utc();
    escrows::ActiveModel {
        id: NotSet,
        room_id: Set(room_id.to_string()),
        user_id: Set(user_id),
        amount: Set(amount),
        status: Set(EscrowStatus::Pending),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(conn)
    .await
    .map_err(map_db_err)
}

/// Grow a non-terminal escrow by `delta`.
pub async fn add_amount<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    escrow_id: i64,
    delta: i64,
) -> Result<(), DomainError> {
    let result = escrows::Entity::update_many()
        .col_expr(
            escrows::Column::Amount,
            Expr::col(escrows::Column::Amount).add(delta),
        )
        .col_expr(
            escrows::Column::UpdatedAt,
            Expr::value(time::OffsetDateTime::now_utc()),
        )
        .filter(escrows::Column::Id.eq(escrow_id))
        .filter(escrows::Column::Status.is_in(ACTIVE))
        .exec(conn)
        .await
        .map_err(map_db_err)?;
    if result.rows_affected == 0 {
        return Err(DomainError::conflict(
            ConflictKind::EscrowState,
            format!("Escrow {escrow_id} is no longer open"),
        ));
    }
    Ok(())
}

/// Move an escrow forward. The UPDATE is conditioned on the status we read,
/// so a concurrent transition makes this fail rather than overwrite.
pub async fn transition<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    escrow: &escrows::Model,
    next: EscrowStatus,
) -> Result<(), DomainError> {
    if !escrow.status.can_become(next) {
        return Err(DomainError::conflict(
            ConflictKind::EscrowState,
            format!(
                "Escrow {} cannot move from {:?} to {:?}",
                escrow.id, escrow.status, next
            ),
        ));
    }
    let result = escrows::Entity::update_many()
        .col_expr(escrows::Column::Status, Expr::value(next))
        .col_expr(
            escrows::Column::UpdatedAt,
            Expr::value(time::OffsetDateTime::now_utc()),
        )
        .filter(escrows::Column::Id.eq(escrow.id))
        .filter(escrows::Column::Status.eq(escrow.status))
        .exec(conn)
        .await
        .map_err(map_db_err)?;
    if result.rows_affected == 0 {
        return Err(DomainError::conflict(
            ConflictKind::EscrowState,
            format!("Escrow {} changed concurrently", escrow.id),
        ));
    }
    Ok(())
}

pub async fn require_escrow<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    escrow_id: i64,
) -> Result<escrows::Model, DomainError> {
    escrows::Entity::find_by_id(escrow_id)
        .one(conn)
        .await
        .map_err(map_db_err)?
        .ok_or_else(|| {
            DomainError::not_found(NotFoundKind::Escrow, format!("Escrow {escrow_id} not found"))
        })
}
