//! SeaORM -> DomainError translation helpers.
//!
//! Repositories convert `sea_orm::DbErr` into `DomainError` here, and higher
//! layers can then map `DomainError` to `AppError` via `From`.

use tracing::{error, warn};

use crate::errors::domain::{ConflictKind, DomainError, InfraErrorKind, NotFoundKind};

fn mentions_sqlstate(msg: &str, code: &str) -> bool {
    msg.contains(code) || msg.contains(&format!("SQLSTATE({code})"))
}

fn is_unique_violation(msg: &str) -> bool {
    mentions_sqlstate(msg, "23505")
        || msg.contains("duplicate key value violates unique constraint")
        || msg.contains("UNIQUE constraint failed")
}

/// Map a unique violation to a domain conflict by the constraint it names.
/// Postgres reports the index name, SQLite reports `table.column`.
fn unique_conflict(msg: &str) -> DomainError {
    if msg.contains("idx_settlements_room_hand_unique") || msg.contains("settlements.room_id") {
        return DomainError::conflict(ConflictKind::AlreadySettled, "Hand already settled");
    }
    DomainError::conflict(
        ConflictKind::Other("Unique".into()),
        "Unique constraint violation",
    )
}

/// Translate a `DbErr` into a `DomainError` with sanitized detail.
pub fn map_db_err(e: sea_orm::DbErr) -> DomainError {
    let error_msg = e.to_string();

    match &e {
        sea_orm::DbErr::RecordNotFound(_) => {
            return DomainError::not_found(
                NotFoundKind::Other("Record".into()),
                "Record not found",
            );
        }
        sea_orm::DbErr::ConnectionAcquire(_) | sea_orm::DbErr::Conn(_) => {
            warn!(raw_error = %error_msg, "Database unavailable");
            return DomainError::infra(InfraErrorKind::DbUnavailable, "Database unavailable");
        }
        _ => {}
    }

    if is_unique_violation(&error_msg) {
        warn!(raw_error = %error_msg, "Unique constraint violation");
        return unique_conflict(&error_msg);
    }

    if mentions_sqlstate(&error_msg, "23503") || error_msg.contains("FOREIGN KEY constraint failed")
    {
        warn!(raw_error = %error_msg, "Foreign key constraint violation");
        return DomainError::validation_other("Foreign key constraint violation");
    }

    if mentions_sqlstate(&error_msg, "23514") || error_msg.contains("CHECK constraint failed") {
        warn!(raw_error = %error_msg, "Check constraint violation");
        return DomainError::validation_other("Check constraint violation");
    }

    if mentions_sqlstate(&error_msg, "40001") || error_msg.contains("could not serialize access") {
        warn!(raw_error = %error_msg, "Serialization failure");
        return DomainError::infra(
            InfraErrorKind::Other("SerializationFailure".into()),
            "Concurrent ledger update; retry",
        );
    }

    if error_msg.contains("timeout")
        || error_msg.contains("pool")
        || error_msg.contains("database is locked")
    {
        warn!(raw_error = %error_msg, "Database timeout or pool issue");
        return DomainError::infra(InfraErrorKind::Timeout, "Database timeout");
    }

    error!(raw_error = %error_msg, "Unhandled database error");
    DomainError::infra(
        InfraErrorKind::Other("DbErr".into()),
        "Database operation failed",
    )
}
