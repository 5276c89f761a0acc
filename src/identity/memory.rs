//! In-process identity backend. Used by tests and by local runs without a real
//! identity service.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::principal::SessionUser;
use super::provider::{AdminUsers, IdentityBackend, IdentityError, SessionBinder, UserField};

#[derive(Debug, Default)]
struct Inner {
    users: HashMap<String, SessionUser>,
    roles: HashMap<String, String>,
    /// session token -> user id
    sessions: HashMap<String, String>,
    failures: HashMap<UserField, IdentityError>,
    role_creations: usize,
}

#[derive(Clone, Default)]
pub struct MemoryIdentity {
    inner: Arc<RwLock<Inner>>,
    session: Option<String>,
}

impl MemoryIdentity {
    pub fn new() -> Self { Self::default() }

    pub fn add_user(&self, user: SessionUser) {
        self.inner.write().users.insert(user.id.clone(), user);
    }

    pub fn set_role(&self, user_id: &str, role: &str) {
        self.inner.write().roles.insert(user_id.to_string(), role.to_string());
    }

    pub fn open_session(&self, token: &str, user_id: &str) {
        self.inner.write().sessions.insert(token.to_string(), user_id.to_string());
    }

    pub fn close_session(&self, token: &str) {
        self.inner.write().sessions.remove(token);
    }

    /// Make every update of `field` fail with the given status and message.
    pub fn fail_field(&self, field: UserField, status: u16, message: &str) {
        self.inner.write().failures.insert(field, IdentityError::Status { status, message: message.to_string() });
    }

    pub fn user(&self, user_id: &str) -> Option<SessionUser> {
        self.inner.read().users.get(user_id).cloned()
    }

    pub fn role_of(&self, user_id: &str) -> Option<String> {
        self.inner.read().roles.get(user_id).cloned()
    }

    pub fn role_creations(&self) -> usize { self.inner.read().role_creations }

    /// A view of the same backend bound to `token`.
    pub fn session_view(&self, token: Option<&str>) -> Self {
        Self { inner: self.inner.clone(), session: token.map(|t| t.to_string()) }
    }
}

#[async_trait]
impl IdentityBackend for MemoryIdentity {
    async fn current_user(&self) -> Result<Option<SessionUser>, IdentityError> {
        let Some(token) = self.session.as_deref() else { return Ok(None); };
        let g = self.inner.read();
        Ok(g.sessions.get(token).and_then(|uid| g.users.get(uid)).cloned())
    }

    async fn get_or_create_role(&self, user_id: &str, _email: Option<&str>, _name: Option<&str>) -> Result<String, IdentityError> {
        let mut g = self.inner.write();
        if let Some(r) = g.roles.get(user_id) { return Ok(r.clone()); }
        g.role_creations += 1;
        g.roles.insert(user_id.to_string(), "student".to_string());
        Ok("student".to_string())
    }
}

#[async_trait]
impl AdminUsers for MemoryIdentity {
    async fn update_user_field(&self, user_id: &str, field: UserField, value: &str) -> Result<(), IdentityError> {
        // Yield so concurrent field updates interleave like real network calls
        tokio::task::yield_now().await;
        let mut g = self.inner.write();
        if let Some(err) = g.failures.get(&field) { return Err(err.clone()); }
        let Some(user) = g.users.get_mut(user_id) else {
            return Err(IdentityError::Status { status: 404, message: format!("user {user_id} not found") });
        };
        match field {
            UserField::Name => user.name = Some(value.to_string()),
            UserField::Email => user.email = Some(value.to_string()),
        }
        Ok(())
    }
}

impl SessionBinder for MemoryIdentity {
    fn bind(&self, session: Option<&str>) -> Arc<dyn IdentityBackend> {
        Arc::new(self.session_view(session))
    }
}
