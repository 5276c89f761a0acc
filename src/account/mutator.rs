use serde::{Deserialize, Serialize};

use super::settle::settle_all;
use crate::identity::{AdminUsers, IdentityError, UserField};

/// Body of `PATCH /api/admin/users/{user_id}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountMutation {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl AccountMutation {
    /// Present fields in issue order (name, then email). Blank strings count as absent.
    pub fn fields(&self) -> Vec<(UserField, &str)> {
        let mut out = Vec::with_capacity(2);
        if let Some(n) = self.full_name.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            out.push((UserField::Name, n));
        }
        if let Some(e) = self.email.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            out.push((UserField::Email, e));
        }
        out
    }

    pub fn is_empty(&self) -> bool { self.fields().is_empty() }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOutcome {
    Skipped,
    Applied { fields: usize },
}

/// Apply every present field as an independent, concurrent update.
///
/// All updates settle before this returns. On failure the first failure (issue
/// order) is returned and updates that succeeded stay applied: there is no
/// rollback across fields.
pub async fn apply_account_mutation(
    admin: &dyn AdminUsers,
    user_id: &str,
    request: &AccountMutation,
) -> Result<MutationOutcome, IdentityError> {
    let fields = request.fields();
    if fields.is_empty() {
        tracing::debug!(user_id, "account mutation skipped: no fields");
        return Ok(MutationOutcome::Skipped);
    }
    let ops = fields.iter().map(|&(field, value)| async move {
        admin.update_user_field(user_id, field, value).await.map(|_| field)
    });
    let settled = settle_all(ops).await;
    if settled.failures() > 0 {
        let applied: Vec<&str> = settled.succeeded().map(|f| f.as_str()).collect();
        tracing::warn!(user_id, ?applied, failures = settled.failures(), "account mutation partially failed; applied fields are kept");
    }
    let applied = settled.into_first_failure()?;
    tracing::info!(user_id, fields = applied.len(), "account mutation applied");
    Ok(MutationOutcome::Applied { fields: applied.len() })
}
