//! Seams to the external identity backend. The portal consumes these; the
//! REST adapter in `http` and the in-process adapter in `memory` provide them.

use std::sync::Arc;

use async_trait::async_trait;

use super::principal::SessionUser;
use crate::error::AppError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    #[error("identity backend unreachable: {0}")]
    Transport(String),
    /// Non-success answer from the backend; `message` is the backend's own text when it sent one.
    #[error("{message}")]
    Status { status: u16, message: String },
    #[error("malformed identity response: {0}")]
    Decode(String),
}

impl IdentityError {
    pub fn status(&self) -> Option<u16> {
        match self {
            IdentityError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<IdentityError> for AppError {
    fn from(err: IdentityError) -> Self {
        let code = match err.status() {
            Some(s) => format!("identity_{s}"),
            None => "identity_unavailable".to_string(),
        };
        AppError::Backend { code, message: err.to_string() }
    }
}

/// Account fields the admin endpoint can change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UserField {
    Name,
    Email,
}

impl UserField {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserField::Name => "name",
            UserField::Email => "email",
        }
    }
}

/// Session-scoped view of the identity backend.
#[async_trait]
pub trait IdentityBackend: Send + Sync {
    /// The user behind the bound session. `Ok(None)` when there is no session.
    async fn current_user(&self) -> Result<Option<SessionUser>, IdentityError>;

    /// Fetch the role record for `user_id`, creating it when absent. Returns the raw
    /// stored role string; callers normalize it.
    async fn get_or_create_role(
        &self,
        user_id: &str,
        email: Option<&str>,
        name: Option<&str>,
    ) -> Result<String, IdentityError>;
}

/// Privileged account operations. Requires the administrative credential.
#[async_trait]
pub trait AdminUsers: Send + Sync {
    async fn update_user_field(&self, user_id: &str, field: UserField, value: &str) -> Result<(), IdentityError>;
}

/// Binds a caller's session token (if any) to an `IdentityBackend` for one request.
pub trait SessionBinder: Send + Sync {
    fn bind(&self, session: Option<&str>) -> Arc<dyn IdentityBackend>;
}
