//! # API Error Handling
//!
//! Every failure leaves a handler as an [`ApiError`] and is rendered as the
//! failed envelope:
//!
//! ```json
//! { "status": "failed", "message": "stock not enough for product 7: available 3, requested 5" }
//! ```
//!
//! ## Status Mapping
//! ```text
//! ┌─────────────────────────┬──────────────────────────────────────────┐
//! │ ErrorCode               │ Raised by                                │
//! ├─────────────────────────┼──────────────────────────────────────────┤
//! │ VALIDATION_ERROR   400  │ ValidationError, TooManyLines, bad JSON  │
//! │ UNAUTHORIZED       401  │ missing / stale / invalid token          │
//! │ FORBIDDEN          403  │ cashier on an admin route                │
//! │ NOT_FOUND          404  │ DbError::NotFound, *NotFound, fallback   │
//! │ CONFLICT           409  │ duplicates, refunded, stock, references  │
//! │ STORAGE_ERROR      502  │ connection, query, transaction, pool     │
//! │ INTERNAL_ERROR     500  │ corrupt data, hashing, token signing     │
//! └─────────────────────────┴──────────────────────────────────────────┘
//! ```
//!
//! Storage and internal failures are logged with their detail and answered
//! with a generic message.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use pos_core::{CoreError, ValidationError};
use pos_db::{DbError, WorkflowError};

use crate::response::FAILED;

/// Error codes for categorizing failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationError,
    Unauthorized,
    Forbidden,
    NotFound,
    Conflict,
    StorageError,
    InternalError,
}

impl ErrorCode {
    pub fn status(&self) -> StatusCode {
        match self {
            ErrorCode::ValidationError => StatusCode::BAD_REQUEST,
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::Forbidden => StatusCode::FORBIDDEN,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::Conflict => StatusCode::CONFLICT,
            ErrorCode::StorageError => StatusCode::BAD_GATEWAY,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error returned by handlers and middleware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationError, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Conflict, message)
    }

    /// Logs `detail` and hides it behind a generic message.
    pub fn internal(detail: impl std::fmt::Display) -> Self {
        tracing::error!("Internal error: {}", detail);
        Self::new(ErrorCode::InternalError, "internal server error")
    }

    /// `404` for a missing entity, worded like [`DbError::NotFound`].
    pub fn entity_not_found(entity: &str, id: i64) -> Self {
        Self::not_found(format!("{entity} with id {id} not found"))
    }
}

#[derive(Serialize)]
struct FailedBody<'a> {
    status: &'static str,
    message: &'a str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = FailedBody {
            status: FAILED,
            message: &self.message,
        };
        (self.code.status(), Json(body)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

/// Converts database errors to API errors.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { .. } => ApiError::not_found(err.to_string()),
            DbError::UniqueViolation { .. } => ApiError::conflict(err.to_string()),
            DbError::ForeignKeyViolation { message } => {
                tracing::warn!("Foreign key violation: {}", message);
                ApiError::conflict("record is still referenced by other data")
            }
            DbError::ConnectionFailed(_)
            | DbError::MigrationFailed(_)
            | DbError::QueryFailed(_)
            | DbError::TransactionFailed(_)
            | DbError::PoolExhausted => {
                tracing::error!("Database operation failed: {}", err);
                ApiError::new(ErrorCode::StorageError, err.to_string())
            }
            DbError::InvalidData { .. } | DbError::Internal(_) => ApiError::internal(err),
        }
    }
}

/// Converts core errors to API errors.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ProductNotFound(_)
            | CoreError::ItemProductMissing { .. }
            | CoreError::CustomerNotFound(_)
            | CoreError::OrderNotFound(_) => ApiError::not_found(err.to_string()),
            CoreError::InsufficientStock { .. } | CoreError::AlreadyRefunded(_) => {
                ApiError::conflict(err.to_string())
            }
            CoreError::TooManyLines { .. }
            | CoreError::AmountOverflow { .. }
            | CoreError::Validation(_) => ApiError::validation(err.to_string()),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::validation(err.to_string())
    }
}

impl From<WorkflowError> for ApiError {
    fn from(err: WorkflowError) -> Self {
        match err {
            WorkflowError::Core(e) => e.into(),
            WorkflowError::Db(e) => e.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_error_status() {
        let cases = [
            (CoreError::ProductNotFound(1), StatusCode::NOT_FOUND),
            (CoreError::AlreadyRefunded("TRX-1".into()), StatusCode::CONFLICT),
            (
                CoreError::InsufficientStock {
                    product_id: 1,
                    available: 0,
                    requested: 2,
                },
                StatusCode::CONFLICT,
            ),
            (
                ValidationError::required("items").into(),
                StatusCode::BAD_REQUEST,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(ApiError::from(err).code.status(), status);
        }
    }

    #[test]
    fn test_storage_error_is_surfaced() {
        let err = ApiError::from(DbError::QueryFailed("no such table: orders".into()));
        assert_eq!(err.code, ErrorCode::StorageError);
        assert_eq!(err.code.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(err.message, "Query failed: no such table: orders");

        let err = ApiError::from(WorkflowError::Db(DbError::TransactionFailed(
            "database is locked".into(),
        )));
        assert_eq!(err.code.status(), StatusCode::BAD_GATEWAY);
        assert!(err.message.contains("database is locked"));
    }

    #[test]
    fn test_duplicate_is_conflict() {
        let err = ApiError::from(WorkflowError::Db(DbError::duplicate("username", "kasir1")));
        assert_eq!(err.code, ErrorCode::Conflict);
        assert_eq!(err.message, "username 'kasir1' already exists");
    }
}
