#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("database error")]
    Sqlx(#[from] sqlx::Error),

    #[error("insufficient credits: required {required}, available {available}")]
    InsufficientCredits { required: i64, available: i64 },

    #[error("blob store error")]
    Blob(#[source] anyhow::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
