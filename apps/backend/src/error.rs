use actix_web::error::ResponseError;
use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use serde::Serialize;
use thiserror::Error;

use crate::errors::domain::{DomainError, InfraErrorKind};
use crate::errors::ErrorCode;

#[derive(Serialize)]
pub struct ProblemDetails {
    #[serde(rename = "type")]
    pub type_: String,
    pub title: String,
    pub status: u16,
    pub detail: String,
    pub code: String,
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {detail}")]
    Validation { code: ErrorCode, detail: String },
    #[error("Resource error: {detail}")]
    Resource { code: ErrorCode, detail: String },
    #[error("Not found: {detail}")]
    NotFound { code: ErrorCode, detail: String },
    #[error("Conflict: {detail}")]
    Conflict { code: ErrorCode, detail: String },
    #[error("Unauthorized")]
    Unauthorized,
    #[error("UnauthorizedInvalidJwt")]
    UnauthorizedInvalidJwt,
    #[error("Bad request: {detail}")]
    BadRequest { detail: String },
    #[error("Database error: {detail}")]
    Db { detail: String },
    #[error("Database unavailable")]
    DbUnavailable,
    #[error("Configuration error: {detail}")]
    Config { detail: String },
    #[error("Internal error: {detail}")]
    Internal { detail: String },
}

impl AppError {
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { code, .. } => *code,
            AppError::Resource { code, .. } => *code,
            AppError::NotFound { code, .. } => *code,
            AppError::Conflict { code, .. } => *code,
            AppError::Unauthorized => ErrorCode::Unauthorized,
            AppError::UnauthorizedInvalidJwt => ErrorCode::UnauthorizedInvalidJwt,
            AppError::BadRequest { .. } => ErrorCode::BadRequest,
            AppError::Db { .. } => ErrorCode::DbError,
            AppError::DbUnavailable => ErrorCode::DbUnavailable,
            AppError::Config { .. } => ErrorCode::ConfigError,
            AppError::Internal { .. } => ErrorCode::InternalError,
        }
    }

    fn detail(&self) -> String {
        match self {
            AppError::Validation { detail, .. }
            | AppError::Resource { detail, .. }
            | AppError::NotFound { detail, .. }
            | AppError::Conflict { detail, .. }
            | AppError::BadRequest { detail }
            | AppError::Db { detail }
            | AppError::Config { detail }
            | AppError::Internal { detail } => detail.clone(),
            AppError::Unauthorized => "Authentication required".to_string(),
            AppError::UnauthorizedInvalidJwt => "Invalid JWT".to_string(),
            AppError::DbUnavailable => "Database unavailable".to_string(),
        }
    }

    /// Get the HTTP status code for this error
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::Resource { .. } => StatusCode::PAYMENT_REQUIRED,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Conflict { .. } => StatusCode::CONFLICT,
            AppError::Unauthorized | AppError::UnauthorizedInvalidJwt => StatusCode::UNAUTHORIZED,
            AppError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            AppError::DbUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Db { .. } | AppError::Config { .. } | AppError::Internal { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Self::Internal {
            detail: detail.into(),
        }
    }

    pub fn config(detail: impl Into<String>) -> Self {
        Self::Config {
            detail: detail.into(),
        }
    }

    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::BadRequest {
            detail: detail.into(),
        }
    }

    pub fn db(detail: impl Into<String>) -> Self {
        Self::Db {
            detail: detail.into(),
        }
    }

    pub fn unauthorized() -> Self {
        Self::Unauthorized
    }

    pub fn db_unavailable() -> Self {
        Self::DbUnavailable
    }

    fn humanize_code(code: &str) -> String {
        code.split('_')
            .map(|word| {
                let mut chars = word.to_lowercase().chars().collect::<Vec<_>>().into_iter();
                match chars.next() {
                    None => String::new(),
                    Some(first) => first.to_uppercase().chain(chars).collect(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl From<DomainError> for AppError {
    fn from(e: DomainError) -> Self {
        let code = e.code();
        match e {
            DomainError::Validation(_, detail) => AppError::Validation { code, detail },
            DomainError::Resource(_, detail) => AppError::Resource { code, detail },
            DomainError::NotFound(_, detail) => AppError::NotFound { code, detail },
            DomainError::Conflict(_, detail) => AppError::Conflict { code, detail },
            DomainError::Infra(InfraErrorKind::DbUnavailable, _) => AppError::DbUnavailable,
            DomainError::Infra(_, detail) => AppError::Internal { detail },
        }
    }
}

impl From<sea_orm::DbErr> for AppError {
    fn from(e: sea_orm::DbErr) -> Self {
        AppError::db(format!("db error: {e}"))
    }
}

impl From<std::env::VarError> for AppError {
    fn from(e: std::env::VarError) -> Self {
        AppError::config(format!("env var error: {e}"))
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        self.status()
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status();
        let code = self.code().as_str().to_string();
        let problem_details = ProblemDetails {
            type_: format!("https://gamehall.app/errors/{code}"),
            title: Self::humanize_code(&code),
            status: status.as_u16(),
            detail: self.detail(),
            code,
        };

        HttpResponse::build(status)
            .content_type("application/problem+json")
            .json(problem_details)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::domain::{ResourceKind, ValidationKind};

    #[test]
    fn domain_validation_maps_to_bad_request() {
        let err: AppError =
            DomainError::validation(ValidationKind::OutOfTurn, "Not your turn").into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), ErrorCode::OutOfTurn);
    }

    #[test]
    fn domain_resource_maps_to_payment_required() {
        let err: AppError =
            DomainError::resource(ResourceKind::InsufficientBalance, "Balance too low").into();
        assert_eq!(err.status(), StatusCode::PAYMENT_REQUIRED);
    }

    #[test]
    fn humanize_code_title_cases_words() {
        assert_eq!(AppError::humanize_code("ROOM_NOT_FOUND"), "Room Not Found");
    }
}
