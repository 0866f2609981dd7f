use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Escrow lifecycle. Transitions only move forward:
/// `Pending -> Locked -> {Released | Forfeited}`, or straight from `Pending`
/// to either terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum EscrowStatus {
    #[sea_orm(string_value = "PENDING")]
    Pending,
    #[sea_orm(string_value = "LOCKED")]
    Locked,
    #[sea_orm(string_value = "RELEASED")]
    Released,
    #[sea_orm(string_value = "FORFEITED")]
    Forfeited,
}

impl EscrowStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, EscrowStatus::Released | EscrowStatus::Forfeited)
    }

    pub fn can_become(self, next: EscrowStatus) -> bool {
        match (self, next) {
            (EscrowStatus::Pending, EscrowStatus::Locked) => true,
            (EscrowStatus::Pending | EscrowStatus::Locked, EscrowStatus::Released) => true,
            (EscrowStatus::Pending | EscrowStatus::Locked, EscrowStatus::Forfeited) => true,
            _ => false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "escrows")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(column_name = "room_id")]
    pub room_id: String,
    #[sea_orm(column_name = "user_id")]
    pub user_id: i64,
    pub amount: i64,
    pub status: EscrowStatus,
    #[sea_orm(column_name = "created_at")]
    pub created_at: OffsetDateTime,
    #[sea_orm(column_name = "updated_at")]
    pub updated_at: OffsetDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id"
    )]
    Users,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::EscrowStatus::*;

    #[test]
    fn transitions_never_go_back() {
        assert!(Pending.can_become(Locked));
        assert!(Locked.can_become(Released));
        assert!(Pending.can_become(Forfeited));
        assert!(!Locked.can_become(Pending));
        assert!(!Released.can_become(Locked));
        assert!(!Forfeited.can_become(Released));
        assert!(!Locked.can_become(Locked));
    }
}
