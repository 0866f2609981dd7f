use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_query::{ColumnDef, ForeignKeyAction, Index, Table};

#[derive(DeriveMigrationName)]
pub struct Migration;

// ----- Iden enums for tables & columns -----
#[derive(Iden)]
enum Users {
    Table,
    Id,
    DisplayName,
    Role,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Wallets {
    Table,
    UserId,
    Balance,
    Frozen,
    UpdatedAt,
}

#[derive(Iden)]
enum Escrows {
    Table,
    Id,
    RoomId,
    UserId,
    Amount,
    Status,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum LedgerEntries {
    Table,
    Id,
    UserId,
    RoomId,
    Amount,
    Kind,
    Reference,
    CreatedAt,
}

#[derive(Iden)]
enum Settlements {
    Table,
    Id,
    RoomId,
    HandNumber,
    Pot,
    CreatedAt,
}

fn id_col<T: Iden + 'static>(col: T) -> ColumnDef {
    ColumnDef::new(col)
        .big_integer()
        .not_null()
        .primary_key()
        .auto_increment()
        .to_owned()
}

fn ts_col<T: Iden + 'static>(col: T) -> ColumnDef {
    ColumnDef::new(col)
        .timestamp_with_time_zone()
        .not_null()
        .to_owned()
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // users
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(id_col(Users::Id))
                    .col(ColumnDef::new(Users::DisplayName).string().not_null())
                    .col(
                        ColumnDef::new(Users::Role)
                            .string_len(16)
                            .not_null()
                            .default("PLAYER"),
                    )
                    .col(ts_col(Users::CreatedAt))
                    .col(ts_col(Users::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        // wallets: one per user, balance never negative
        manager
            .create_table(
                Table::create()
                    .table(Wallets::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Wallets::UserId)
                            .big_integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Wallets::Balance)
                            .big_integer()
                            .not_null()
                            .default(0)
                            .check(Expr::col(Wallets::Balance).gte(0)),
                    )
                    .col(
                        ColumnDef::new(Wallets::Frozen)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ts_col(Wallets::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_wallets_user_id")
                            .from(Wallets::Table, Wallets::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // escrows
        manager
            .create_table(
                Table::create()
                    .table(Escrows::Table)
                    .if_not_exists()
                    .col(id_col(Escrows::Id))
                    .col(ColumnDef::new(Escrows::RoomId).string().not_null())
                    .col(ColumnDef::new(Escrows::UserId).big_integer().not_null())
                    .col(
                        ColumnDef::new(Escrows::Amount)
                            .big_integer()
                            .not_null()
                            .check(Expr::col(Escrows::Amount).gte(0)),
                    )
                    .col(ColumnDef::new(Escrows::Status).string_len(16).not_null())
                    .col(ts_col(Escrows::CreatedAt))
                    .col(ts_col(Escrows::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_escrows_user_id")
                            .from(Escrows::Table, Escrows::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_escrows_room_user")
                    .table(Escrows::Table)
                    .col(Escrows::RoomId)
                    .col(Escrows::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_escrows_status")
                    .table(Escrows::Table)
                    .col(Escrows::Status)
                    .to_owned(),
            )
            .await?;

        // ledger_entries (append-only)
        manager
            .create_table(
                Table::create()
                    .table(LedgerEntries::Table)
                    .if_not_exists()
                    .col(id_col(LedgerEntries::Id))
                    .col(
                        ColumnDef::new(LedgerEntries::UserId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(LedgerEntries::RoomId).string().not_null())
                    .col(
                        ColumnDef::new(LedgerEntries::Amount)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LedgerEntries::Kind)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LedgerEntries::Reference)
                            .string()
                            .not_null(),
                    )
                    .col(ts_col(LedgerEntries::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_ledger_entries_user_id")
                            .from(LedgerEntries::Table, LedgerEntries::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_ledger_entries_user")
                    .table(LedgerEntries::Table)
                    .col(LedgerEntries::UserId)
                    .to_owned(),
            )
            .await?;

        // settlements: unique per (room, hand)
        manager
            .create_table(
                Table::create()
                    .table(Settlements::Table)
                    .if_not_exists()
                    .col(id_col(Settlements::Id))
                    .col(ColumnDef::new(Settlements::RoomId).string().not_null())
                    .col(
                        ColumnDef::new(Settlements::HandNumber)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Settlements::Pot).big_integer().not_null())
                    .col(ts_col(Settlements::CreatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_settlements_room_hand_unique")
                    .table(Settlements::Table)
                    .col(Settlements::RoomId)
                    .col(Settlements::HandNumber)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Settlements::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(LedgerEntries::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Escrows::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Wallets::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).if_exists().to_owned())
            .await?;
        Ok(())
    }
}
