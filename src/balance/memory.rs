//! In-memory balance store with optional JSON snapshot persistence.
//!
//! When opened on a directory, the full record list is written to
//! `<dir>/balances.json` on every mutation (write-to-temp then rename) and
//! read back on open. A mutation becomes visible only once its snapshot write
//! succeeded.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;

use super::record::BalanceRecord;
use super::store::{BalanceDraft, BalanceError, BalanceStore};

const SNAPSHOT_FILE: &str = "balances.json";

#[derive(Clone, Default)]
pub struct MemoryBalanceStore {
    records: Arc<RwLock<Vec<BalanceRecord>>>,
    snapshot: Option<PathBuf>,
}

impl MemoryBalanceStore {
    pub fn new() -> Self { Self::default() }

    pub fn open(dir: &Path) -> Result<Self, BalanceError> {
        std::fs::create_dir_all(dir).map_err(|e| BalanceError::Snapshot(format!("{}: {e}", dir.display())))?;
        let path = dir.join(SNAPSHOT_FILE);
        let records = match std::fs::read(&path) {
            Ok(bytes) => serde_json::from_slice::<Vec<BalanceRecord>>(&bytes)
                .map_err(|e| BalanceError::Snapshot(format!("{}: {e}", path.display())))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(BalanceError::Snapshot(format!("{}: {e}", path.display()))),
        };
        tracing::info!(path = %path.display(), records = records.len(), "balance snapshot loaded");
        Ok(Self { records: Arc::new(RwLock::new(records)), snapshot: Some(path) })
    }

    /// Insert rows as-is (ids and timestamps preserved). Used for imports and to
    /// reproduce duplicate rows left by racing upserts.
    pub fn import(&self, rows: impl IntoIterator<Item = BalanceRecord>) -> Result<(), BalanceError> {
        let mut g = self.records.write();
        let mut next = g.clone();
        next.extend(rows);
        self.persist(&next)?;
        *g = next;
        Ok(())
    }

    pub fn len(&self) -> usize { self.records.read().len() }
    pub fn is_empty(&self) -> bool { self.records.read().is_empty() }

    fn persist(&self, rows: &[BalanceRecord]) -> Result<(), BalanceError> {
        let Some(path) = &self.snapshot else { return Ok(()); };
        let bytes = serde_json::to_vec_pretty(rows).map_err(|e| BalanceError::Snapshot(e.to_string()))?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, bytes).map_err(|e| BalanceError::Snapshot(format!("{}: {e}", tmp.display())))?;
        std::fs::rename(&tmp, path).map_err(|e| BalanceError::Snapshot(format!("{}: {e}", path.display())))
    }
}

#[async_trait]
impl BalanceStore for MemoryBalanceStore {
    async fn find_by_user(&self, user_id: &str) -> Result<Vec<BalanceRecord>, BalanceError> {
        Ok(self.records.read().iter().filter(|r| r.user_id == user_id).cloned().collect())
    }

    async fn update(&self, id: &str, plan_label: &str, balance: &str) -> Result<BalanceRecord, BalanceError> {
        let mut g = self.records.write();
        let mut next = g.clone();
        let rec = next.iter_mut().find(|r| r.id == id).ok_or_else(|| BalanceError::Missing(id.to_string()))?;
        rec.plan_label = plan_label.to_string();
        rec.balance = Some(balance.to_string());
        // Keep timestamps monotonic per row even if the clock steps back
        rec.updated_at = Utc::now().max(rec.updated_at);
        let out = rec.clone();
        self.persist(&next)?;
        *g = next;
        Ok(out)
    }

    async fn create(&self, draft: BalanceDraft) -> Result<BalanceRecord, BalanceError> {
        let rec = BalanceRecord {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: draft.user_id,
            plan_label: draft.plan_label,
            balance: Some(draft.balance),
            updated_at: Utc::now(),
        };
        let mut g = self.records.write();
        let mut next = g.clone();
        next.push(rec.clone());
        self.persist(&next)?;
        *g = next;
        Ok(rec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn update_of_unknown_id_is_missing() {
        let s = MemoryBalanceStore::new();
        let err = s.update("nope", "Full", "1.00").await.unwrap_err();
        assert_eq!(err, BalanceError::Missing("nope".into()));
    }

    #[tokio::test]
    async fn snapshot_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let s = MemoryBalanceStore::open(dir.path()).unwrap();
        s.create(BalanceDraft { user_id: "u1".into(), plan_label: "Installment".into(), balance: "250.00".into() }).await.unwrap();
        drop(s);
        let reopened = MemoryBalanceStore::open(dir.path()).unwrap();
        let rows = reopened.find_by_user("u1").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].plan_label, "Installment");
        assert!(!dir.path().join("balances.json.tmp").exists());
    }

    #[tokio::test]
    async fn failed_snapshot_write_leaves_rows_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("data");
        let s = MemoryBalanceStore::open(&data).unwrap();
        let first = s.create(BalanceDraft { user_id: "u1".into(), plan_label: "Full".into(), balance: "10.00".into() }).await.unwrap();
        std::fs::remove_dir_all(&data).unwrap();

        let err = s.create(BalanceDraft { user_id: "u2".into(), plan_label: "Full".into(), balance: "5.00".into() }).await.unwrap_err();
        assert!(matches!(err, BalanceError::Snapshot(_)));
        assert_eq!(s.len(), 1);
        assert!(s.find_by_user("u2").await.unwrap().is_empty());

        assert!(matches!(s.update(&first.id, "Installment", "99.00").await, Err(BalanceError::Snapshot(_))));
        let rows = s.find_by_user("u1").await.unwrap();
        assert_eq!(rows[0].balance.as_deref(), Some("10.00"));
        assert_eq!(rows[0].plan_label, "Full");

        assert!(s.import([first.clone()]).is_err());
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn corrupt_snapshot_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(SNAPSHOT_FILE), b"{not json").unwrap();
        assert!(matches!(MemoryBalanceStore::open(dir.path()), Err(BalanceError::Snapshot(_))));
    }
}
