use sea_orm::{ActiveModelTrait, ConnectionTrait, EntityTrait, NotSet, Set};

use crate::entities::users::{self, UserRole};
use crate::errors::domain::{DomainError, NotFoundKind};
use crate::infra::db_errors::map_db_err;

pub async fn create_user<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    display_name: &str,
    role: UserRole,
) -> Result<users::Model, DomainError> {
    let now = time::OffsetDateTime::now_utc();
    users::ActiveModel {
        id: NotSet,
        display_name: Set(display_name.to_string()),
        role: Set(role),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(conn)
    .await
    .map_err(map_db_err)
}

pub async fn find_user_by_id<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    user_id: i64,
) -> Result<Option<users::Model>, DomainError> {
    users::Entity::find_by_id(user_id)
        .one(conn)
        .await
        .map_err(map_db_err)
}

pub async fn require_user<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    user_id: i64,
) -> Result<users::Model, DomainError> {
    find_user_by_id(conn, user_id).await?.ok_or_else(|| {
        DomainError::not_found(NotFoundKind::User, format!("User {user_id} not found"))
    })
}
