use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::rules::{RouteRule, RouteTable};
use crate::identity::Role;

pub const DEFAULT_LOGIN_PATH: &str = "/login";

/// Route rules plus redirect targets. Loaded once at start and shared read-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AccessPolicy {
    pub routes: RouteTable,
    pub login_path: String,
    /// Per-role landing paths; roles not listed fall back to `Role::default_home`.
    pub homes: BTreeMap<Role, String>,
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self {
            routes: RouteTable::new(vec![
                RouteRule::new("/admin", [Role::Admin]),
                RouteRule::new("/cashier", [Role::Cashier]),
                RouteRule::new("/business-office", [Role::BusinessOffice]),
                RouteRule::new("/student", [Role::Student]),
            ]),
            login_path: DEFAULT_LOGIN_PATH.to_string(),
            homes: BTreeMap::new(),
        }
    }
}

impl AccessPolicy {
    pub fn with_routes(routes: RouteTable) -> Self {
        Self { routes, ..Default::default() }
    }

    pub fn home_for(&self, role: Role) -> &str {
        self.homes.get(&role).map(String::as_str).unwrap_or_else(|| role.default_home())
    }

    /// Login location carrying the URL-encoded original path as `redirect`.
    pub fn login_redirect(&self, original_path: &str) -> String {
        format!("{}?redirect={}", self.login_path, urlencoding::encode(original_path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_redirect_encodes_path() {
        let p = AccessPolicy::default();
        assert_eq!(p.login_redirect("/admin/users"), "/login?redirect=%2Fadmin%2Fusers");
        assert_eq!(p.login_redirect("/student?tab=a b"), "/login?redirect=%2Fstudent%3Ftab%3Da%20b");
    }

    #[test]
    fn homes_override_defaults() {
        let mut p = AccessPolicy::default();
        p.homes.insert(Role::Cashier, "/cashier/desk".into());
        assert_eq!(p.home_for(Role::Cashier), "/cashier/desk");
        assert_eq!(p.home_for(Role::Admin), "/admin");
    }

    #[test]
    fn deserializes_with_aliases_and_defaults() {
        let raw = serde_json::json!({
            "routes": [{"prefix": "/finance", "allow": ["Business_Office", "admin"]}],
            "homes": {"business_office": "/finance"}
        });
        let p: AccessPolicy = serde_json::from_value(raw).unwrap();
        assert_eq!(p.login_path, DEFAULT_LOGIN_PATH);
        assert!(p.routes.matching("/finance/q1").unwrap().permits(Role::BusinessOffice));
        assert_eq!(p.home_for(Role::BusinessOffice), "/finance");
    }
}
