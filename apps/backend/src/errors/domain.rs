//! Domain-level error type used across engines, services and repos.
//!
//! This error type is HTTP- and DB-agnostic. Handlers return
//! `Result<T, crate::error::AppError>` and convert from `DomainError`
//! using the provided `From<DomainError> for AppError` implementation.
//! Websocket acks render it through `Display`.

use std::error::Error;
use std::fmt::{Display, Formatter, Result as FmtResult};

use super::ErrorCode;

/// Rule and input violations. Never mutate state.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ValidationKind {
    PhaseMismatch,
    OutOfTurn,
    UnsupportedAction,
    InvalidDice,
    NoRollsLeft,
    MustRollFirst,
    CategoryFilled,
    CategoryDisabled,
    ScratchNotAllowed,
    NoJokersLeft,
    InvalidBet,
    BetOutOfRange,
    MinRaise,
    InvalidAmount,
    NotEligible,
    NotSeated,
    InvalidPlayerCount,
    InvalidSettings,
    RoomFull,
    AlreadyJoined,
    NotInRoom,
    NotHost,
    InvalidChat,
    VoteNotAllowed,
    Other(String),
}

/// Resource checks that run before any ledger mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ResourceKind {
    InsufficientBalance,
    WalletFrozen,
    InsufficientChips,
}

/// Infra error kinds to distinguish operational failures
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum InfraErrorKind {
    Timeout,
    DbUnavailable,
    DataCorruption,
    RoomUnavailable,
    Other(String),
}

/// Domain-level not found entities
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum NotFoundKind {
    Room,
    User,
    Wallet,
    Escrow,
    Other(String),
}

/// Domain-level conflict kinds
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConflictKind {
    AlreadySettled,
    EscrowState,
    Other(String),
}

/// Central domain error type
#[derive(Debug, Clone, PartialEq)]
pub enum DomainError {
    /// Input/user validation or business rule violation
    Validation(ValidationKind, String),
    /// Not enough money/chips, or a frozen wallet
    Resource(ResourceKind, String),
    /// Semantic conflict
    Conflict(ConflictKind, String),
    /// Missing resource in domain terms
    NotFound(NotFoundKind, String),
    /// Infrastructure/operational failures
    Infra(InfraErrorKind, String),
}

impl Display for DomainError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            DomainError::Validation(_, d) => write!(f, "{d}"),
            DomainError::Resource(_, d) => write!(f, "{d}"),
            DomainError::Conflict(kind, d) => write!(f, "conflict {kind:?}: {d}"),
            DomainError::NotFound(kind, d) => write!(f, "not found {kind:?}: {d}"),
            DomainError::Infra(kind, d) => write!(f, "infra {kind:?}: {d}"),
        }
    }
}

impl Error for DomainError {}

impl DomainError {
    pub fn validation(kind: ValidationKind, detail: impl Into<String>) -> Self {
        Self::Validation(kind, detail.into())
    }
    pub fn validation_other(detail: impl Into<String>) -> Self {
        let detail = detail.into();
        Self::Validation(ValidationKind::Other(detail.clone()), detail)
    }
    pub fn resource(kind: ResourceKind, detail: impl Into<String>) -> Self {
        Self::Resource(kind, detail.into())
    }
    pub fn conflict(kind: ConflictKind, detail: impl Into<String>) -> Self {
        Self::Conflict(kind, detail.into())
    }
    pub fn not_found(kind: NotFoundKind, detail: impl Into<String>) -> Self {
        Self::NotFound(kind, detail.into())
    }
    pub fn infra(kind: InfraErrorKind, detail: impl Into<String>) -> Self {
        Self::Infra(kind, detail.into())
    }

    /// Shorthand for the most common rejection.
    pub fn phase(detail: impl Into<String>) -> Self {
        Self::validation(ValidationKind::PhaseMismatch, detail)
    }

    /// Shorthand for turn-ownership failures.
    pub fn out_of_turn() -> Self {
        Self::validation(ValidationKind::OutOfTurn, "Not your turn")
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, DomainError::Validation(..))
    }

    /// Stable wire code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            DomainError::Validation(kind, _) => match kind {
                ValidationKind::PhaseMismatch => ErrorCode::PhaseMismatch,
                ValidationKind::OutOfTurn => ErrorCode::OutOfTurn,
                ValidationKind::UnsupportedAction => ErrorCode::UnsupportedAction,
                ValidationKind::CategoryFilled => ErrorCode::CategoryFilled,
                ValidationKind::MinRaise => ErrorCode::MinRaise,
                ValidationKind::InvalidBet | ValidationKind::BetOutOfRange => ErrorCode::InvalidBet,
                ValidationKind::RoomFull => ErrorCode::RoomFull,
                ValidationKind::NotInRoom => ErrorCode::NotInRoom,
                _ => ErrorCode::ValidationError,
            },
            DomainError::Resource(kind, _) => match kind {
                ResourceKind::InsufficientBalance => ErrorCode::InsufficientBalance,
                ResourceKind::WalletFrozen => ErrorCode::WalletFrozen,
                ResourceKind::InsufficientChips => ErrorCode::InsufficientChips,
            },
            DomainError::Conflict(kind, _) => match kind {
                ConflictKind::AlreadySettled => ErrorCode::AlreadySettled,
                _ => ErrorCode::Conflict,
            },
            DomainError::NotFound(kind, _) => match kind {
                NotFoundKind::Room => ErrorCode::RoomNotFound,
                NotFoundKind::Wallet => ErrorCode::WalletNotFound,
                _ => ErrorCode::NotFound,
            },
            DomainError::Infra(kind, _) => match kind {
                InfraErrorKind::DbUnavailable => ErrorCode::DbUnavailable,
                InfraErrorKind::Timeout => ErrorCode::DbTimeout,
                _ => ErrorCode::InternalError,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_display_is_detail_only() {
        let err = DomainError::validation(ValidationKind::CategoryFilled, "Category already filled");
        assert_eq!(err.to_string(), "Category already filled");
        assert_eq!(err.code(), ErrorCode::CategoryFilled);
    }

    #[test]
    fn resource_errors_map_to_resource_codes() {
        let err = DomainError::resource(ResourceKind::WalletFrozen, "Wallet is frozen");
        assert_eq!(err.code(), ErrorCode::WalletFrozen);
        assert!(!err.is_validation());
    }
}
