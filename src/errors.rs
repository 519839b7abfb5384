use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("availability window overlaps with an existing window")]
    OverlappingAvailability,

    #[error("selected time slot is not available")]
    SlotNotAvailable,

    #[error("invalid status transition from {from} to {to}")]
    InvalidStatusTransition { from: String, to: String },

    #[error("cancellation deadline has passed")]
    CancellationDeadlinePassed,

    #[error("unauthorized")]
    Unauthorized,

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Stable machine-readable code, independent of the human message.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::InvalidArgument(_) => "INVALID_ARGUMENT",
            AppError::OverlappingAvailability => "OVERLAPPING_AVAILABILITY",
            AppError::SlotNotAvailable => "SLOT_NOT_AVAILABLE",
            AppError::InvalidStatusTransition { .. } => "INVALID_STATUS_TRANSITION",
            AppError::CancellationDeadlinePassed => "CANCELLATION_DEADLINE_PASSED",
            AppError::Unauthorized => "UNAUTHORIZED",
            AppError::Database(_) => "INTERNAL",
            AppError::Internal(_) => "INTERNAL",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            AppError::OverlappingAvailability => StatusCode::CONFLICT,
            AppError::SlotNotAvailable => StatusCode::CONFLICT,
            AppError::InvalidStatusTransition { .. } => StatusCode::BAD_REQUEST,
            AppError::CancellationDeadlinePassed => StatusCode::FORBIDDEN,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "request failed");
        }

        let body = serde_json::json!({ "code": self.code(), "error": self.to_string() });
        (status, axum::Json(body)).into_response()
    }
}
