use async_trait::async_trait;

use super::record::{BalanceInput, BalanceRecord};
use crate::error::AppError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BalanceError {
    #[error("balance record {0} not found")]
    Missing(String),
    #[error("balance snapshot error: {0}")]
    Snapshot(String),
    #[error("balance store unavailable: {0}")]
    Unavailable(String),
}

impl From<BalanceError> for AppError {
    fn from(err: BalanceError) -> Self {
        match err {
            BalanceError::Missing(_) => AppError::NotFound { code: "balance_missing".into(), message: err.to_string() },
            BalanceError::Snapshot(_) => AppError::Io { code: "balance_snapshot".into(), message: err.to_string() },
            BalanceError::Unavailable(_) => AppError::Backend { code: "balance_unavailable".into(), message: err.to_string() },
        }
    }
}

/// Fields for a new record; the store assigns `id` and `updated_at`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceDraft {
    pub user_id: String,
    pub plan_label: String,
    pub balance: String,
}

/// Persistence seam for balance rows. No cross-call locking is implied.
#[async_trait]
pub trait BalanceStore: Send + Sync {
    async fn find_by_user(&self, user_id: &str) -> Result<Vec<BalanceRecord>, BalanceError>;
    async fn update(&self, id: &str, plan_label: &str, balance: &str) -> Result<BalanceRecord, BalanceError>;
    async fn create(&self, draft: BalanceDraft) -> Result<BalanceRecord, BalanceError>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum UpsertOutcome {
    Created(BalanceRecord),
    Updated(BalanceRecord),
}

impl UpsertOutcome {
    pub fn record(&self) -> &BalanceRecord {
        match self {
            UpsertOutcome::Created(r) | UpsertOutcome::Updated(r) => r,
        }
    }

    pub fn created(&self) -> bool { matches!(self, UpsertOutcome::Created(_)) }
}

/// The user's most recently modified record, if any.
pub async fn latest_balance(store: &dyn BalanceStore, user_id: &str) -> Result<Option<BalanceRecord>, BalanceError> {
    let rows = store.find_by_user(user_id).await?;
    Ok(rows.into_iter().max_by_key(|r| r.updated_at))
}

/// Update the user's latest record in place, or create the first one.
///
/// Check-then-act: concurrent first upserts for one user may both create.
/// `latest_balance` tolerates that by always preferring the newest row.
pub async fn upsert_balance(
    store: &dyn BalanceStore,
    user_id: &str,
    plan_label: &str,
    balance: &BalanceInput,
) -> Result<UpsertOutcome, BalanceError> {
    let amount = balance.normalize();
    match latest_balance(store, user_id).await? {
        Some(existing) => {
            let rec = store.update(&existing.id, plan_label, &amount).await?;
            tracing::debug!(user_id, id = %rec.id, balance = %amount, "balance updated");
            Ok(UpsertOutcome::Updated(rec))
        }
        None => {
            let draft = BalanceDraft { user_id: user_id.to_string(), plan_label: plan_label.to_string(), balance: amount };
            let rec = store.create(draft).await?;
            tracing::info!(user_id, id = %rec.id, "balance record created");
            Ok(UpsertOutcome::Created(rec))
        }
    }
}
