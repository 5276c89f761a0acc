//! Session → role resolution.
//!
//! `RoleResolver` publishes its state on a `watch` channel so gates and guards
//! can observe it. Each `resolve()` call takes a ticket; a result is published
//! only while its ticket is still current and the resolver has not been torn
//! down. Stale results are dropped silently.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::watch;

use crate::identity::{IdentityBackend, IdentityError, Role, SessionUser};
use crate::tprintln;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolverState {
    Loading,
    Unauthenticated,
    Authenticated { user: SessionUser, role: Role },
}

impl ResolverState {
    pub fn is_loading(&self) -> bool { matches!(self, ResolverState::Loading) }

    pub fn role(&self) -> Option<Role> {
        match self {
            ResolverState::Authenticated { role, .. } => Some(*role),
            _ => None,
        }
    }

    pub fn user(&self) -> Option<&SessionUser> {
        match self {
            ResolverState::Authenticated { user, .. } => Some(user),
            _ => None,
        }
    }
}

/// One-shot resolution without any publication. Request handlers use this directly.
pub async fn resolve_session(backend: &dyn IdentityBackend) -> Result<ResolverState, IdentityError> {
    let Some(user) = backend.current_user().await? else {
        return Ok(ResolverState::Unauthenticated);
    };
    let raw = backend.get_or_create_role(&user.id, user.email_hint(), user.name_hint()).await?;
    let role = Role::normalize(Some(&raw));
    Ok(ResolverState::Authenticated { user, role })
}

pub struct RoleResolver {
    backend: Arc<dyn IdentityBackend>,
    tx: watch::Sender<ResolverState>,
    epoch: AtomicU64,
    closed: AtomicBool,
}

impl RoleResolver {
    pub fn new(backend: Arc<dyn IdentityBackend>) -> Self {
        let (tx, _rx) = watch::channel(ResolverState::Loading);
        Self { backend, tx, epoch: AtomicU64::new(0), closed: AtomicBool::new(false) }
    }

    pub fn subscribe(&self) -> watch::Receiver<ResolverState> { self.tx.subscribe() }

    pub fn snapshot(&self) -> ResolverState { self.tx.borrow().clone() }

    /// Resolve the session and publish the outcome.
    ///
    /// Backend failures are returned to the caller; observers see the
    /// least-privileged state consistent with what was learned (no session when
    /// the session lookup failed, `Student` when only the role lookup failed).
    pub async fn resolve(&self) -> Result<ResolverState, IdentityError> {
        let ticket = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        let user = match self.backend.current_user().await {
            Ok(Some(u)) => u,
            Ok(None) => {
                self.publish(ticket, ResolverState::Unauthenticated);
                return Ok(ResolverState::Unauthenticated);
            }
            Err(e) => {
                tracing::warn!(error = %e, "session lookup failed");
                self.publish(ticket, ResolverState::Unauthenticated);
                return Err(e);
            }
        };
        match self.backend.get_or_create_role(&user.id, user.email_hint(), user.name_hint()).await {
            Ok(raw) => {
                let state = ResolverState::Authenticated { role: Role::normalize(Some(&raw)), user };
                self.publish(ticket, state.clone());
                Ok(state)
            }
            Err(e) => {
                tracing::warn!(error = %e, user_id = %user.id, "role lookup failed");
                self.publish(ticket, ResolverState::Authenticated { user, role: Role::Student });
                Err(e)
            }
        }
    }

    /// Stop publishing. In-flight resolutions finish but their results are discarded.
    pub fn teardown(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.epoch.fetch_add(1, Ordering::SeqCst);
    }

    pub fn is_torn_down(&self) -> bool { self.closed.load(Ordering::SeqCst) }

    fn publish(&self, ticket: u64, state: ResolverState) -> bool {
        if self.is_torn_down() || self.epoch.load(Ordering::SeqCst) != ticket {
            tprintln!("resolver.discard ticket={} state={:?}", ticket, state);
            return false;
        }
        self.tx.send_replace(state);
        true
    }
}
