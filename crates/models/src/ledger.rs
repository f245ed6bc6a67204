use crate::JobId;
use chrono::{DateTime, Utc};

/// The kind of an append-only credit ledger entry (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LedgerEntryKind {
    Grant,
    Purchase,
    Reserve,
    Release,
    Finalize,
}

/// A single append-only ledger entry. The current balance for a user is the
/// sum of `delta` across all of their entries.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct LedgerEntry {
    pub id: uuid::Uuid,
    pub user_id: uuid::Uuid,
    pub job_id: Option<JobId>,
    pub kind: LedgerEntryKind,
    pub delta: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct Balance {
    pub available: i64,
}
