use crate::Error;
use async_trait::async_trait;
use models::{Balance, JobId, LedgerEntryKind};
use sqlx::{PgPool, Row};

/// The append-only credit ledger (§3, §4.2). Every mutation is recorded as
/// a signed `delta` row; the balance is the running sum. Reserve/release/
/// finalize are idempotent per `(user_id, job_id)` so a retried webhook or
/// re-delivered queue message cannot double-charge.
#[async_trait]
pub trait Ledger: Send + Sync {
    async fn balance(&self, user_id: uuid::Uuid) -> Result<Balance, Error>;

    /// Reserves `amount` credits against a job, failing with
    /// `Error::InsufficientCredits` if the available balance can't cover it.
    /// A second reservation for the same `(user_id, job_id)` is a no-op.
    async fn reserve(&self, user_id: uuid::Uuid, job_id: &JobId, amount: i64) -> Result<(), Error>;

    /// Releases a previously-held reservation in full, e.g. on submission
    /// failure before any work began. No-op if nothing is reserved.
    async fn release(&self, user_id: uuid::Uuid, job_id: &JobId) -> Result<(), Error>;

    /// Converts a reservation into a final charge of `actual_amount`
    /// (which may be less than the original reservation, e.g. `auto` mode
    /// falling through to the cheaper crop backend). No-op if the job has
    /// already been finalized.
    async fn finalize(
        &self,
        user_id: uuid::Uuid,
        job_id: &JobId,
        actual_amount: i64,
    ) -> Result<(), Error>;

    async fn grant(&self, user_id: uuid::Uuid, amount: i64) -> Result<(), Error>;
}

pub struct PgLedger {
    pool: PgPool,
}

impl PgLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn has_entry(
        &self,
        user_id: uuid::Uuid,
        job_id: &JobId,
        kind: LedgerEntryKind,
    ) -> Result<bool, Error> {
        let row = sqlx::query(
            "SELECT 1 FROM ledger_entries WHERE user_id = $1 AND job_id = $2 AND kind = $3",
        )
        .bind(user_id)
        .bind(job_id.as_str())
        .bind(kind)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.is_some())
    }
}

#[async_trait]
impl Ledger for PgLedger {
    async fn balance(&self, user_id: uuid::Uuid) -> Result<Balance, Error> {
        let row = sqlx::query(
            "SELECT COALESCE(SUM(delta), 0)::bigint AS available FROM ledger_entries WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(Balance {
            available: row.try_get("available")?,
        })
    }

    async fn reserve(&self, user_id: uuid::Uuid, job_id: &JobId, amount: i64) -> Result<(), Error> {
        if self.has_entry(user_id, job_id, LedgerEntryKind::Reserve).await? {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            "SELECT COALESCE(SUM(delta), 0)::bigint AS available FROM ledger_entries
             WHERE user_id = $1 FOR UPDATE",
        )
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;
        let available: i64 = row.try_get("available")?;

        if available < amount {
            return Err(Error::InsufficientCredits {
                required: amount,
                available,
            });
        }

        sqlx::query(
            "INSERT INTO ledger_entries (id, user_id, job_id, kind, delta, created_at)
             VALUES ($1, $2, $3, $4, $5, now())",
        )
        .bind(uuid::Uuid::new_v4())
        .bind(user_id)
        .bind(job_id.as_str())
        .bind(LedgerEntryKind::Reserve)
        .bind(-amount)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn release(&self, user_id: uuid::Uuid, job_id: &JobId) -> Result<(), Error> {
        if !self.has_entry(user_id, job_id, LedgerEntryKind::Reserve).await? {
            return Ok(());
        }
        if self.has_entry(user_id, job_id, LedgerEntryKind::Release).await?
            || self.has_entry(user_id, job_id, LedgerEntryKind::Finalize).await?
        {
            return Ok(());
        }

        let reserved: i64 = sqlx::query(
            "SELECT COALESCE(SUM(delta), 0)::bigint AS delta FROM ledger_entries
             WHERE user_id = $1 AND job_id = $2 AND kind = 'reserve'",
        )
        .bind(user_id)
        .bind(job_id.as_str())
        .fetch_one(&self.pool)
        .await?
        .try_get("delta")?;

        sqlx::query(
            "INSERT INTO ledger_entries (id, user_id, job_id, kind, delta, created_at)
             VALUES ($1, $2, $3, $4, $5, now())",
        )
        .bind(uuid::Uuid::new_v4())
        .bind(user_id)
        .bind(job_id.as_str())
        .bind(LedgerEntryKind::Release)
        .bind(-reserved)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn finalize(
        &self,
        user_id: uuid::Uuid,
        job_id: &JobId,
        actual_amount: i64,
    ) -> Result<(), Error> {
        if self.has_entry(user_id, job_id, LedgerEntryKind::Finalize).await?
            || self.has_entry(user_id, job_id, LedgerEntryKind::Release).await?
        {
            return Ok(());
        }

        let reserved: i64 = sqlx::query(
            "SELECT COALESCE(SUM(delta), 0)::bigint AS delta FROM ledger_entries
             WHERE user_id = $1 AND job_id = $2 AND kind = 'reserve'",
        )
        .bind(user_id)
        .bind(job_id.as_str())
        .fetch_one(&self.pool)
        .await?
        .try_get("delta")?;

        // `reserved` is stored negative; the refund makes up the difference
        // between what was held and what was actually consumed.
        let refund = (-reserved) - actual_amount;

        sqlx::query(
            "INSERT INTO ledger_entries (id, user_id, job_id, kind, delta, created_at)
             VALUES ($1, $2, $3, $4, $5, now())",
        )
        .bind(uuid::Uuid::new_v4())
        .bind(user_id)
        .bind(job_id.as_str())
        .bind(LedgerEntryKind::Finalize)
        .bind(refund)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn grant(&self, user_id: uuid::Uuid, amount: i64) -> Result<(), Error> {
        sqlx::query(
            "INSERT INTO ledger_entries (id, user_id, job_id, kind, delta, created_at)
             VALUES ($1, $2, NULL, $3, $4, now())",
        )
        .bind(uuid::Uuid::new_v4())
        .bind(user_id)
        .bind(LedgerEntryKind::Grant)
        .bind(amount)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
