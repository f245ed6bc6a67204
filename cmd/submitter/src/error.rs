//! Maps the shared `ErrorKind` taxonomy (§7) plus a handful of submitter-
//! local failure modes onto HTTP responses, following `control::error::
//! AppError`'s `IntoResponse` pattern.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use models::{ApiError, ErrorKind};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Kind(#[from] ErrorKind),

    #[error("unknown job")]
    NotFound,

    #[error("queue unavailable")]
    QueueUnavailable,

    #[error("durable store unavailable")]
    StoreUnavailable,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<store::Error> for AppError {
    fn from(err: store::Error) -> Self {
        match err {
            store::Error::InsufficientCredits {
                required,
                available,
            } => AppError::Kind(ErrorKind::insufficient_credits(required, available)),
            other => AppError::Other(anyhow::anyhow!(other)),
        }
    }
}

impl From<netguard::SsrfError> for AppError {
    fn from(err: netguard::SsrfError) -> Self {
        AppError::Kind(ErrorKind::validation("INVALID_VIDEO_URL", format!("Invalid video URL: {err}")))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, kind) = match self {
            AppError::Kind(kind) => (status_for_kind(&kind), kind),
            AppError::NotFound => (
                StatusCode::NOT_FOUND,
                ErrorKind::validation("NOT_FOUND", "job not found"),
            ),
            AppError::QueueUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorKind::InfrastructureTransient {
                    code: "QUEUE_UNAVAILABLE".to_string(),
                    message: "work queue is unavailable".to_string(),
                },
            ),
            AppError::StoreUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorKind::InfrastructureTransient {
                    code: "STORE_UNAVAILABLE".to_string(),
                    message: "durable store is unavailable".to_string(),
                },
            ),
            AppError::Other(err) => {
                tracing::error!(error = %err, "unhandled submitter error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorKind::InfrastructurePermanent {
                        code: "INTERNAL".to_string(),
                        message: "internal error".to_string(),
                    },
                )
            }
        };

        (status, Json(ApiError::new(kind))).into_response()
    }
}

fn status_for_kind(kind: &ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation { .. } => StatusCode::BAD_REQUEST,
        ErrorKind::Authentication { .. } => StatusCode::UNAUTHORIZED,
        ErrorKind::Quota { .. } => StatusCode::PAYMENT_REQUIRED,
        ErrorKind::InfrastructureTransient { .. } => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::InfrastructurePermanent { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        ErrorKind::Content { .. } => StatusCode::BAD_REQUEST,
        ErrorKind::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
    }
}
