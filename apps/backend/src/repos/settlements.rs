use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, NotSet, QueryFilter, Set};

use crate::entities::settlements;
use crate::errors::domain::DomainError;
use crate::infra::db_errors::map_db_err;

/// Claim `(room_id, hand_number)`. A second claim fails with
/// `ConflictKind::AlreadySettled` through the unique index.
pub async fn claim<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    room_id: &str,
    hand_number: i32,
    pot: i64,
) -> Result<settlements::Model, DomainError> {
    settlements::ActiveModel {
        id: NotSet,
        room_id: Set(room_id.to_string()),
        hand_number: Set(hand_number),
        pot: Set(pot),
        created_at: Set(time::OffsetDateTime::now_utc()),
    }
    .insert(conn)
    .await
    .map_err(map_db_err)
}

pub async fn find<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    room_id: &str,
    hand_number: i32,
) -> Result<Option<settlements::Model>, DomainError> {
    settlements::Entity::find()
        .filter(settlements::Column::RoomId.eq(room_id))
        .filter(settlements::Column::HandNumber.eq(hand_number))
        .one(conn)
        .await
        .map_err(map_db_err)
}
