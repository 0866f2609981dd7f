//! Error codes for the gamehall API.
//!
//! Add new codes here; never pass ad-hoc strings as error codes.
//! All error codes are SCREAMING_SNAKE_CASE and map 1:1 to the strings
//! that appear in HTTP responses and websocket acks.

use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Authentication & Authorization
    /// Authentication required
    Unauthorized,
    /// Invalid or expired JWT
    UnauthorizedInvalidJwt,
    /// Access denied
    Forbidden,

    // Request Validation
    /// Action not legal in the current phase
    PhaseMismatch,
    /// Actor is not the player on turn
    OutOfTurn,
    /// Action tag not handled by this game
    UnsupportedAction,
    /// Scoresheet cell already filled
    CategoryFilled,
    /// Raise below the minimum
    MinRaise,
    /// Malformed or out-of-range bet
    InvalidBet,
    /// Room has no free seat
    RoomFull,
    /// Actor is not part of the room
    NotInRoom,
    /// General validation error
    ValidationError,
    /// Malformed request
    BadRequest,

    // Resources
    /// Wallet balance too low
    InsufficientBalance,
    /// Wallet frozen by an operator
    WalletFrozen,
    /// Not enough chips at the table
    InsufficientChips,

    // Resource Not Found
    /// Room not found
    RoomNotFound,
    /// Wallet not found
    WalletNotFound,
    /// General not found error
    NotFound,

    // Business Logic Conflicts
    /// Settlement for (room, hand) already applied
    AlreadySettled,
    /// Generic conflict
    Conflict,

    // System Errors
    /// Database error
    DbError,
    /// Database unavailable
    DbUnavailable,
    /// Database timeout
    DbTimeout,
    /// Internal server error
    InternalError,
    /// Configuration error
    ConfigError,
}

impl ErrorCode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unauthorized => "UNAUTHORIZED",
            Self::UnauthorizedInvalidJwt => "UNAUTHORIZED_INVALID_JWT",
            Self::Forbidden => "FORBIDDEN",
            Self::PhaseMismatch => "PHASE_MISMATCH",
            Self::OutOfTurn => "OUT_OF_TURN",
            Self::UnsupportedAction => "UNSUPPORTED_ACTION",
            Self::CategoryFilled => "CATEGORY_FILLED",
            Self::MinRaise => "MIN_RAISE",
            Self::InvalidBet => "INVALID_BET",
            Self::RoomFull => "ROOM_FULL",
            Self::NotInRoom => "NOT_IN_ROOM",
            Self::ValidationError => "VALIDATION_ERROR",
            Self::BadRequest => "BAD_REQUEST",
            Self::InsufficientBalance => "INSUFFICIENT_BALANCE",
            Self::WalletFrozen => "WALLET_FROZEN",
            Self::InsufficientChips => "INSUFFICIENT_CHIPS",
            Self::RoomNotFound => "ROOM_NOT_FOUND",
            Self::WalletNotFound => "WALLET_NOT_FOUND",
            Self::NotFound => "NOT_FOUND",
            Self::AlreadySettled => "ALREADY_SETTLED",
            Self::Conflict => "CONFLICT",
            Self::DbError => "DB_ERROR",
            Self::DbUnavailable => "DB_UNAVAILABLE",
            Self::DbTimeout => "DB_TIMEOUT",
            Self::InternalError => "INTERNAL_ERROR",
            Self::ConfigError => "CONFIG_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::ErrorCode;

    #[test]
    fn codes_are_unique_and_screaming_snake() {
        let all = [
            ErrorCode::Unauthorized,
            ErrorCode::UnauthorizedInvalidJwt,
            ErrorCode::Forbidden,
            ErrorCode::PhaseMismatch,
            ErrorCode::OutOfTurn,
            ErrorCode::UnsupportedAction,
            ErrorCode::CategoryFilled,
            ErrorCode::MinRaise,
            ErrorCode::InvalidBet,
            ErrorCode::RoomFull,
            ErrorCode::NotInRoom,
            ErrorCode::ValidationError,
            ErrorCode::BadRequest,
            ErrorCode::InsufficientBalance,
            ErrorCode::WalletFrozen,
            ErrorCode::InsufficientChips,
            ErrorCode::RoomNotFound,
            ErrorCode::WalletNotFound,
            ErrorCode::NotFound,
            ErrorCode::AlreadySettled,
            ErrorCode::Conflict,
            ErrorCode::DbError,
            ErrorCode::DbUnavailable,
            ErrorCode::DbTimeout,
            ErrorCode::InternalError,
            ErrorCode::ConfigError,
        ];
        let mut seen = HashSet::new();
        for code in all {
            let s = code.as_str();
            assert!(seen.insert(s), "duplicate code {s}");
            assert!(s.chars().all(|c| c.is_ascii_uppercase() || c == '_'));
        }
    }
}
