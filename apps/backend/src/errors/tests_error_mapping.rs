// Mapping from domain errors to wire codes and HTTP statuses, no I/O involved.
use actix_web::http::StatusCode;

use crate::errors::domain::{
    ConflictKind, DomainError, InfraErrorKind, NotFoundKind, ResourceKind, ValidationKind,
};
use crate::{AppError, ErrorCode};

#[test]
fn game_rule_violations_keep_their_codes() {
    let cases = [
        (ValidationKind::PhaseMismatch, "PHASE_MISMATCH"),
        (ValidationKind::OutOfTurn, "OUT_OF_TURN"),
        (ValidationKind::UnsupportedAction, "UNSUPPORTED_ACTION"),
        (ValidationKind::MinRaise, "MIN_RAISE"),
        (ValidationKind::BetOutOfRange, "INVALID_BET"),
        (ValidationKind::RoomFull, "ROOM_FULL"),
    ];
    for (kind, code) in cases {
        let app: AppError = DomainError::validation(kind, "nope").into();
        assert_eq!(app.code().as_str(), code);
        assert_eq!(app.status(), StatusCode::BAD_REQUEST);
    }
}

#[test]
fn unmapped_validation_falls_back_to_generic_code() {
    let app: AppError = DomainError::validation(ValidationKind::InvalidDice, "die 7").into();
    assert_eq!(app.code(), ErrorCode::ValidationError);

    let app: AppError = DomainError::validation_other("bad frame").into();
    assert_eq!(app.code(), ErrorCode::ValidationError);
}

#[test]
fn wallet_problems_are_payment_required() {
    let app: AppError =
        DomainError::resource(ResourceKind::InsufficientBalance, "balance 5, need 10").into();
    assert_eq!(app.code().as_str(), "INSUFFICIENT_BALANCE");
    assert_eq!(app.status().as_u16(), 402);

    let app: AppError = DomainError::resource(ResourceKind::WalletFrozen, "frozen").into();
    assert_eq!(app.code(), ErrorCode::WalletFrozen);
}

#[test]
fn maps_conflicts() {
    let settled = DomainError::conflict(ConflictKind::AlreadySettled, "hand 3 already paid");
    let app: AppError = settled.into();
    assert_eq!(app.code().as_str(), "ALREADY_SETTLED");
    assert_eq!(app.status().as_u16(), 409);

    let escrow = DomainError::conflict(ConflictKind::EscrowState, "escrow is refunded");
    let app: AppError = escrow.into();
    assert_eq!(app.code().as_str(), "CONFLICT");
    assert_eq!(app.status().as_u16(), 409);
}

#[test]
fn maps_not_found() {
    let app: AppError = DomainError::not_found(NotFoundKind::Room, "no room r1").into();
    assert_eq!(app.code().as_str(), "ROOM_NOT_FOUND");
    assert_eq!(app.status().as_u16(), 404);

    let app: AppError = DomainError::not_found(NotFoundKind::Escrow, "no escrow").into();
    assert_eq!(app.code(), ErrorCode::NotFound);
}

#[test]
fn maps_infra() {
    let down = DomainError::infra(InfraErrorKind::DbUnavailable, "down");
    let app: AppError = down.into();
    assert!(matches!(app, AppError::DbUnavailable));
    assert_eq!(app.status().as_u16(), 503);

    let gone = DomainError::infra(InfraErrorKind::RoomUnavailable, "actor stopped");
    let app: AppError = gone.into();
    assert_eq!(app.code().as_str(), "INTERNAL_ERROR");
    assert_eq!(app.status().as_u16(), 500);
}

#[test]
fn constructor_helpers() {
    assert!(matches!(
        DomainError::out_of_turn(),
        DomainError::Validation(ValidationKind::OutOfTurn, _)
    ));
    assert!(matches!(
        DomainError::phase("betting is closed"),
        DomainError::Validation(ValidationKind::PhaseMismatch, _)
    ));
    assert!(DomainError::validation_other("x").is_validation());
    assert!(!DomainError::infra(InfraErrorKind::Timeout, "slow").is_validation());
}
