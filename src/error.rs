//! Error types for the library server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Broad classification of a business-rule failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    Forbidden,
    Validation,
}

impl ErrorKind {
    pub fn status(self) -> StatusCode {
        match self {
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
        }
    }
}

/// Business-rule violations raised by the catalog, registry and lending engine.
///
/// These are expected outcomes of a request, never infrastructure failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Book with ID {0} was not found")]
    BookNotFound(i32),

    #[error("Member with ID {0} was not found")]
    MemberNotFound(i32),

    #[error("Borrowing transaction with ID {0} was not found")]
    TransactionNotFound(i32),

    #[error("A book with this ISBN already exists")]
    IsbnAlreadyExists,

    #[error("A member with this email already exists")]
    EmailAlreadyExists,

    #[error("No copies available to borrow")]
    NoCopiesAvailable,

    #[error("Cannot return more copies than total")]
    CannotReturnMore,

    #[error("Member account is not active")]
    MemberNotActive,

    #[error("Member has reached borrowing limit of {limit}")]
    BorrowingLimitExceeded { limit: i32 },

    #[error("Member has already borrowed this book")]
    AlreadyBorrowed,

    #[error("Book is not available for borrowing")]
    BookNotAvailable,

    #[error("Transaction is not in active status")]
    TransactionNotActive,
}

impl DomainError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::BookNotFound(_)
            | DomainError::MemberNotFound(_)
            | DomainError::TransactionNotFound(_) => ErrorKind::NotFound,
            DomainError::MemberNotActive => ErrorKind::Forbidden,
            _ => ErrorKind::Conflict,
        }
    }

    /// Stable machine-readable code, `<Entity>.<Reason>`
    pub fn code(&self) -> &'static str {
        match self {
            DomainError::BookNotFound(_) => "Book.NotFound",
            DomainError::MemberNotFound(_) => "Member.NotFound",
            DomainError::TransactionNotFound(_) => "BorrowingTransaction.NotFound",
            DomainError::IsbnAlreadyExists => "Book.IsbnAlreadyExists",
            DomainError::EmailAlreadyExists => "Member.EmailAlreadyExists",
            DomainError::NoCopiesAvailable => "Book.NoCopiesAvailable",
            DomainError::CannotReturnMore => "Book.CannotReturnMore",
            DomainError::MemberNotActive => "Member.NotActive",
            DomainError::BorrowingLimitExceeded { .. } => "Member.BorrowingLimitExceeded",
            DomainError::AlreadyBorrowed => "BorrowingTransaction.AlreadyBorrowed",
            DomainError::BookNotAvailable => "BorrowingTransaction.BookNotAvailable",
            DomainError::TransactionNotActive => "BorrowingTransaction.NotActive",
        }
    }
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// The business-rule error carried by this error, if any
    pub fn domain(&self) -> Option<&DomainError> {
        match self {
            AppError::Domain(e) => Some(e),
            _ => None,
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
    }
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub code: String,
    pub error: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, error, message) = match &self {
            AppError::Domain(e) => (e.kind().status(), e.code(), format!("{:?}", e.kind()), e.to_string()),
            AppError::Validation(msg) => (
                ErrorKind::Validation.status(),
                "Request.Invalid",
                format!("{:?}", ErrorKind::Validation),
                msg.clone(),
            ),
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Server.Database",
                    "Internal".to_string(),
                    "Database error".to_string(),
                )
            }
            AppError::Migration(e) => {
                tracing::error!("Migration error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Server.Migration",
                    "Internal".to_string(),
                    "Internal server error".to_string(),
                )
            }
            AppError::Config(e) => {
                tracing::error!("Configuration error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Server.Config",
                    "Internal".to_string(),
                    "Internal server error".to_string(),
                )
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Server.Internal",
                    "Internal".to_string(),
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse {
            code: code.to_string(),
            error,
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
