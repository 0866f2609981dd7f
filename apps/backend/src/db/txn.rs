use std::future::Future;
use std::pin::Pin;

use sea_orm::{
    ConnectionTrait, DatabaseBackend, DatabaseConnection, DatabaseTransaction, IsolationLevel,
    TransactionTrait,
};

use crate::errors::domain::DomainError;
use crate::infra::db_errors::map_db_err;

/// Boxed future borrowing the transaction for the length of the closure.
pub type TxnFuture<'c, R> = Pin<Box<dyn Future<Output = Result<R, DomainError>> + Send + 'c>>;

/// Ledger transactions run serializable where the backend supports choosing.
fn isolation_for(db: &DatabaseConnection) -> Option<IsolationLevel> {
    match db.get_database_backend() {
        DatabaseBackend::Postgres => Some(IsolationLevel::Serializable),
        // SQLite transactions are already serialized by its single writer
        _ => None,
    }
}

/// Execute a function within a database transaction.
///
/// Commits on `Ok`, rolls back on `Err` and hands back the closure's error
/// untouched. Everything the closure reads or writes must go through the
/// provided transaction.
pub async fn with_txn<R, F>(db: &DatabaseConnection, f: F) -> Result<R, DomainError>
where
    F: for<'c> FnOnce(&'c DatabaseTransaction) -> TxnFuture<'c, R> + Send,
    R: Send,
{
    let txn = db
        .begin_with_config(isolation_for(db), None)
        .await
        .map_err(map_db_err)?;

    match f(&txn).await {
        Ok(val) => {
            txn.commit().await.map_err(map_db_err)?;
            Ok(val)
        }
        Err(err) => {
            // Best-effort rollback; preserve original error
            if let Err(rollback_err) = txn.rollback().await {
                tracing::warn!(error = %rollback_err, "rollback failed");
            }
            Err(err)
        }
    }
}
