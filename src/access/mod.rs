//! Route authorization: session/role resolution, the navigation gate and the
//! component-level guard.

mod rules;
mod policy;
mod navigation;
pub mod resolver;
pub mod gate;
pub mod guard;

pub use rules::{RouteRule, RouteTable};
pub use policy::{AccessPolicy, DEFAULT_LOGIN_PATH};
pub use navigation::{NavItem, NavigationTable};
pub use resolver::{resolve_session, ResolverState, RoleResolver};
pub use gate::{decide, Decision, GateEvent, GatePhase, RouteGate};
pub use guard::{Guarded, RoleGuard};
