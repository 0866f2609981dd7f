use std::time::Duration;

use migration::{migrate, MigrationCommand};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};

use crate::config::db::{db_url, DbOwner, DbProfile};
use crate::error::AppError;

/// Unified database connector that supports different profiles and owners.
/// This function does NOT run any migrations.
pub async fn connect_db(
    profile: DbProfile,
    owner: DbOwner,
) -> Result<DatabaseConnection, AppError> {
    let database_url = db_url(profile.clone(), owner)?;

    let mut options = ConnectOptions::new(database_url);
    options.sqlx_logging(false);
    if profile == DbProfile::InMemory {
        // Every connection to `sqlite::memory:` is its own database; pin one.
        options
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(Duration::from_secs(24 * 60 * 60))
            .max_lifetime(Duration::from_secs(24 * 60 * 60));
    }

    let conn = Database::connect(options).await?;
    Ok(conn)
}

/// Connect and bring the schema up to date. Single entrypoint used by the
/// server and by tests.
pub async fn bootstrap_db(
    profile: DbProfile,
    owner: DbOwner,
) -> Result<DatabaseConnection, AppError> {
    let conn = connect_db(profile, owner).await?;
    migrate(&conn, MigrationCommand::Up)
        .await
        .map_err(|e| AppError::db(format!("migration failed: {e}")))?;
    Ok(conn)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_bootstrap_applies_migrations() {
        let conn = bootstrap_db(DbProfile::InMemory, DbOwner::App)
            .await
            .unwrap();
        let latest = migration::get_latest_migration_version(&conn)
            .await
            .unwrap();
        assert!(latest.is_some());
    }
}
