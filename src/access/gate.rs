//! Route authorization gate.
//!
//! `decide` is the pure rule evaluation. `RouteGate` wraps it in a per-navigation
//! state machine:
//!
//! | phase              | Navigate | Observe(snapshot)                   | RedirectComplete |
//! |--------------------|----------|-------------------------------------|------------------|
//! | Pending            | Pending  | Wait: stay / Allow: Allowed / Redirect: DeniedRedirecting | stay |
//! | Allowed            | Pending  | same as Pending                      | stay             |
//! | DeniedRedirecting  | Pending  | stay (no second redirect)            | Settled          |
//! | Settled            | Pending  | stay                                 | stay             |

use std::sync::Arc;

use tokio::sync::watch;

use super::policy::AccessPolicy;
use super::resolver::ResolverState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Role/session not known yet; do nothing.
    Wait,
    Allow,
    Redirect(String),
}

pub fn decide(policy: &AccessPolicy, path: &str, snapshot: &ResolverState) -> Decision {
    if snapshot.is_loading() { return Decision::Wait; }
    let Some(rule) = policy.routes.matching(path) else { return Decision::Allow; };
    match snapshot.role() {
        None => Decision::Redirect(policy.login_redirect(path)),
        Some(role) if rule.permits(role) => Decision::Allow,
        Some(role) => Decision::Redirect(policy.home_for(role).to_string()),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatePhase {
    Pending,
    Allowed,
    DeniedRedirecting { location: String },
    Settled,
}

#[derive(Debug, Clone, Copy)]
pub enum GateEvent<'a> {
    Navigate(&'a str),
    Observe(&'a ResolverState),
    RedirectComplete,
}

pub struct RouteGate {
    policy: Arc<AccessPolicy>,
    path: String,
    phase: GatePhase,
}

impl RouteGate {
    pub fn new(policy: Arc<AccessPolicy>) -> Self {
        Self { policy, path: String::new(), phase: GatePhase::Pending }
    }

    pub fn phase(&self) -> &GatePhase { &self.phase }
    pub fn path(&self) -> &str { &self.path }
    pub fn may_render(&self) -> bool { self.phase == GatePhase::Allowed }

    /// Apply one event. Returns the redirect location when this event fires one.
    pub fn handle(&mut self, event: GateEvent<'_>) -> Option<String> {
        match (&self.phase, event) {
            (_, GateEvent::Navigate(path)) => {
                self.path = path.to_string();
                self.phase = GatePhase::Pending;
                None
            }
            (GatePhase::DeniedRedirecting { .. } | GatePhase::Settled, GateEvent::Observe(_)) => None,
            (GatePhase::Pending | GatePhase::Allowed, GateEvent::Observe(snapshot)) => {
                match decide(&self.policy, &self.path, snapshot) {
                    Decision::Wait => None,
                    Decision::Allow => {
                        self.phase = GatePhase::Allowed;
                        None
                    }
                    Decision::Redirect(location) => {
                        tracing::debug!(path = %self.path, %location, "route denied; redirecting");
                        self.phase = GatePhase::DeniedRedirecting { location: location.clone() };
                        Some(location)
                    }
                }
            }
            (GatePhase::DeniedRedirecting { .. }, GateEvent::RedirectComplete) => {
                self.phase = GatePhase::Settled;
                None
            }
            (_, GateEvent::RedirectComplete) => None,
        }
    }

    pub fn navigate(&mut self, path: &str) { self.handle(GateEvent::Navigate(path)); }

    pub fn observe(&mut self, snapshot: &ResolverState) -> Option<String> {
        self.handle(GateEvent::Observe(snapshot))
    }

    /// Follow resolver updates until the current navigation is allowed or
    /// redirected. Only the call that fires the redirect returns `Redirect`;
    /// once a redirect is under way (or settled) this returns `Decision::Wait`
    /// until the next `navigate`. Also `Wait` if the resolver goes away first.
    pub async fn follow(&mut self, rx: &mut watch::Receiver<ResolverState>) -> Decision {
        loop {
            let snapshot = rx.borrow_and_update().clone();
            if let Some(location) = self.observe(&snapshot) { return Decision::Redirect(location); }
            match &self.phase {
                GatePhase::Allowed => return Decision::Allow,
                GatePhase::DeniedRedirecting { .. } | GatePhase::Settled => return Decision::Wait,
                GatePhase::Pending => {}
            }
            if rx.changed().await.is_err() { return Decision::Wait; }
        }
    }
}
