use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, NotSet, QueryFilter, QueryOrder,
    Set,
};

use crate::entities::ledger_entries::{self, LedgerKind};
use crate::errors::domain::DomainError;
use crate::infra::db_errors::map_db_err;

/// Append one ledger line. The ledger is never updated in place.
pub async fn record<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    user_id: i64,
    room_id: &str,
    amount: i64,
    kind: LedgerKind,
    reference: &str,
) -> Result<ledger_entries::Model, DomainError> {
    ledger_entries::ActiveModel {
        id: NotSet,
        user_id: Set(user_id),
        room_id: Set(room_id.to_string()),
        amount: Set(amount),
        kind: Set(kind),
        reference: Set(reference.to_string()),
        created_at: Set(time::OffsetDateTime::now_utc()),
    }
    .insert(conn)
    .await
    .map_err(map_db_err)
}

pub async fn list_for_user<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    user_id: i64,
) -> Result<Vec<ledger_entries::Model>, DomainError> {
    ledger_entries::Entity::find()
        .filter(ledger_entries::Column::UserId.eq(user_id))
        .order_by_asc(ledger_entries::Column::Id)
        .all(conn)
        .await
        .map_err(map_db_err)
}

pub async fn list_for_room<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    room_id: &str,
) -> Result<Vec<ledger_entries::Model>, DomainError> {
    ledger_entries::Entity::find()
        .filter(ledger_entries::Column::RoomId.eq(room_id))
        .order_by_asc(ledger_entries::Column::Id)
        .all(conn)
        .await
        .map_err(map_db_err)
}
