/// The stable error taxonomy (§7). Each variant is a distinct `kind` on
/// the wire, with a stable `code` string and a human-readable message.
#[derive(Debug, Clone, thiserror::Error, serde::Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ErrorKind {
    #[error("validation error: {message}")]
    Validation { code: String, message: String },

    #[error("authentication error: {message}")]
    Authentication { code: String, message: String },

    #[error("insufficient credits: required {required}, available {available}")]
    Quota {
        code: String,
        required: i64,
        available: i64,
    },

    #[error("infrastructure error: {message}")]
    InfrastructureTransient { code: String, message: String },

    #[error("infrastructure error: {message}")]
    InfrastructurePermanent { code: String, message: String },

    #[error("content error: {message}")]
    Content { code: String, message: String },

    #[error("timeout: {message}")]
    Timeout { code: String, message: String },
}

impl ErrorKind {
    pub fn code(&self) -> &str {
        match self {
            ErrorKind::Validation { code, .. }
            | ErrorKind::Authentication { code, .. }
            | ErrorKind::Quota { code, .. }
            | ErrorKind::InfrastructureTransient { code, .. }
            | ErrorKind::InfrastructurePermanent { code, .. }
            | ErrorKind::Content { code, .. }
            | ErrorKind::Timeout { code, .. } => code,
        }
    }

    pub fn validation(code: &str, message: impl Into<String>) -> Self {
        ErrorKind::Validation {
            code: code.to_string(),
            message: message.into(),
        }
    }

    pub fn insufficient_credits(required: i64, available: i64) -> Self {
        ErrorKind::Quota {
            code: "INSUFFICIENT_CREDITS".to_string(),
            required,
            available,
        }
    }
}

/// Wire envelope for HTTP error responses.
#[derive(Debug, serde::Serialize)]
pub struct ApiError {
    pub error: ErrorKind,
}

impl ApiError {
    pub fn new(error: ErrorKind) -> Self {
        Self { error }
    }
}
