use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use rust_decimal::Decimal;
use serde::Serialize;

/// Failure of a core ledger operation.
///
/// None of these are retried internally; the caller decides what to show.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("state conflict: {0}")]
    StateConflict(String),

    /// The referenced transaction exists but is not of the kind the operation acts on.
    #[error("wrong transaction type: {0}")]
    WrongType(String),

    #[error("insufficient balance: required {required}, available {available} (short by {shortfall})")]
    InsufficientFunds {
        required: Decimal,
        available: Decimal,
        shortfall: Decimal,
    },

    /// The unit of work was rolled back; no partial effects remain.
    #[error("operation failed: {0}")]
    OperationFailed(#[from] sqlx::Error),
}

impl LedgerError {
    pub fn insufficient(required: Decimal, available: Decimal) -> Self {
        LedgerError::InsufficientFunds {
            required,
            available,
            shortfall: (required - available).max(Decimal::ZERO),
        }
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unprocessable: {0}")]
    Unprocessable(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::Unprocessable(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.clone()),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".into()),
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".into())
            }
        };

        (
            status,
            Json(ErrorBody {
                success: false,
                error: message,
            }),
        )
            .into_response()
    }
}

impl From<LedgerError> for AppError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::Validation(msg) => AppError::BadRequest(msg),
            LedgerError::NotFound(msg) => AppError::NotFound(msg),
            LedgerError::StateConflict(msg) => AppError::Conflict(msg),
            e @ LedgerError::WrongType(_) => AppError::BadRequest(e.to_string()),
            e @ LedgerError::InsufficientFunds { .. } => AppError::Unprocessable(e.to_string()),
            LedgerError::OperationFailed(e) => AppError::Internal(e.into()),
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::Internal(e.into())
    }
}
