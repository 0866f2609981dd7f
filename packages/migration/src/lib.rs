//! Schema for the gamehall escrow ledger: users, wallets, escrows, ledger
//! entries and settlements.

pub use sea_orm_migration::sea_orm::{ConnectionTrait, DatabaseConnection};
pub use sea_orm_migration::prelude::*;

mod m20261001_000001_init;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(m20261001_000001_init::Migration)]
    }
}

#[derive(Debug, Clone, Copy)]
pub enum MigrationCommand {
    Up,
    Down,
    Fresh,
    Reset,
    Refresh,
    Status,
}

/// Run `command` against an open connection. Shared by the CLI, server
/// startup and tests so none of them parse the environment here.
pub async fn migrate(db: &DatabaseConnection, command: MigrationCommand) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let defined = Migrator::migrations().len();
    let before = count_applied_migrations(db).await?;
    tracing::info!(?command, ?backend, defined, applied = before, "migration starting");

    let result = match command {
        MigrationCommand::Up => Migrator::up(db, None).await,
        MigrationCommand::Down => Migrator::down(db, None).await,
        MigrationCommand::Fresh => Migrator::fresh(db).await,
        MigrationCommand::Reset => Migrator::reset(db).await,
        MigrationCommand::Refresh => Migrator::refresh(db).await,
        MigrationCommand::Status => Migrator::status(db).await,
    };

    match result {
        Ok(()) => {
            let after = count_applied_migrations(db).await?;
            tracing::info!(?command, ?backend, applied = after, "migration finished");
            Ok(())
        }
        Err(e) => {
            tracing::error!(?command, ?backend, error = %e, "migration failed");
            Err(e)
        }
    }
}

/// Applied migrations; 0 before the bookkeeping table exists.
pub async fn count_applied_migrations(db: &DatabaseConnection) -> Result<usize, DbErr> {
    match Migrator::get_applied_migrations(db).await {
        Ok(migrations) => Ok(migrations.len()),
        Err(DbErr::Exec(_)) => Ok(0),
        Err(e) => Err(e),
    }
}

/// Name of the newest applied migration, if any.
pub async fn get_latest_migration_version(
    db: &DatabaseConnection,
) -> Result<Option<String>, DbErr> {
    match Migrator::get_applied_migrations(db).await {
        Ok(migrations) => Ok(migrations.last().map(|m| m.name().to_string())),
        Err(DbErr::Exec(_)) => Ok(None),
        Err(e) => Err(e),
    }
}
