#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("redis error")]
    Redis(#[from] redis::RedisError),

    #[error("malformed queue message")]
    Malformed(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
