use crate::Error;
use async_trait::async_trait;
use sqlx::{PgPool, Row};

/// Resolves a bearer token to the user it authenticates (§6 "bearer" auth).
/// Identity issuance itself is an external collaborator (§1); this is just
/// the lookup table the durable store exposes for it.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn user_for_token(&self, token: &str) -> Result<Option<uuid::Uuid>, Error>;
}

pub struct PgTokenStore {
    pool: PgPool,
}

impl PgTokenStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TokenStore for PgTokenStore {
    async fn user_for_token(&self, token: &str) -> Result<Option<uuid::Uuid>, Error> {
        let row = sqlx::query("SELECT user_id FROM api_tokens WHERE token = $1")
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| r.try_get("user_id")).transpose().map_err(Error::Sqlx)
    }
}
