use std::sync::Arc;

use super::gate::{GateEvent, RouteGate};
use super::policy::AccessPolicy;
use super::resolver::ResolverState;
use super::rules::{RouteRule, RouteTable};
use crate::identity::Role;

/// What a guarded subtree yields for the current snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Guarded<T> {
    /// Nothing is produced (loading, or a redirect is already under way).
    Hidden,
    Redirect(String),
    Content(T),
}

impl<T> Guarded<T> {
    pub fn content(self) -> Option<T> {
        match self {
            Guarded::Content(t) => Some(t),
            _ => None,
        }
    }
}

/// Component-level guard with its own allow-list, independent of the global
/// route table. Uses the policy only for the login path and role homes.
pub struct RoleGuard {
    allow: Vec<Role>,
    gate: RouteGate,
}

impl RoleGuard {
    pub fn new(policy: &AccessPolicy, allow: impl IntoIterator<Item = Role>) -> Self {
        let allow: Vec<Role> = allow.into_iter().collect();
        let scoped = AccessPolicy {
            routes: RouteTable::new(vec![RouteRule::new("/", allow.iter().copied())]),
            ..policy.clone()
        };
        Self { allow, gate: RouteGate::new(Arc::new(scoped)) }
    }

    pub fn allow_list(&self) -> &[Role] { &self.allow }

    /// Start guarding a new navigation at `path` (used as the login return target).
    pub fn navigate(&mut self, path: &str) { self.gate.navigate(path); }

    pub fn redirect_complete(&mut self) { self.gate.handle(GateEvent::RedirectComplete); }

    /// Evaluate against `snapshot`. `content` is only invoked when access is granted.
    pub fn render<T>(&mut self, snapshot: &ResolverState, content: impl FnOnce() -> T) -> Guarded<T> {
        if let Some(location) = self.gate.observe(snapshot) {
            return Guarded::Redirect(location);
        }
        if self.gate.may_render() { Guarded::Content(content()) } else { Guarded::Hidden }
    }
}
