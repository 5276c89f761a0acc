use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::identity::Role;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavItem {
    pub label: String,
    pub path: String,
    /// Icon reference understood by the frontend (not an asset path).
    #[serde(default)]
    pub icon: Option<String>,
}

impl NavItem {
    fn new(label: &str, path: &str, icon: &str) -> Self {
        Self { label: label.to_string(), path: path.to_string(), icon: Some(icon.to_string()) }
    }
}

/// Role → ordered navigation entries. Immutable once built; handed to the
/// server through `AppState`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NavigationTable {
    entries: BTreeMap<Role, Vec<NavItem>>,
}

impl Default for NavigationTable {
    fn default() -> Self {
        let mut entries = BTreeMap::new();
        entries.insert(Role::Admin, vec![
            NavItem::new("Dashboard", "/admin", "layout-dashboard"),
            NavItem::new("Users", "/admin/users", "users"),
            NavItem::new("Payments", "/admin/payments", "credit-card"),
            NavItem::new("Reports", "/admin/reports", "bar-chart"),
        ]);
        entries.insert(Role::Cashier, vec![
            NavItem::new("Dashboard", "/cashier", "layout-dashboard"),
            NavItem::new("Payments", "/cashier/payments", "credit-card"),
        ]);
        entries.insert(Role::BusinessOffice, vec![
            NavItem::new("Dashboard", "/business-office", "layout-dashboard"),
            NavItem::new("Balances", "/business-office/balances", "wallet"),
            NavItem::new("Reports", "/business-office/reports", "bar-chart"),
        ]);
        entries.insert(Role::Student, vec![
            NavItem::new("Dashboard", "/student", "layout-dashboard"),
            NavItem::new("My Balance", "/student/balance", "wallet"),
            NavItem::new("Pay Tuition", "/student/payments", "credit-card"),
        ]);
        Self { entries }
    }
}

impl NavigationTable {
    pub fn new(entries: BTreeMap<Role, Vec<NavItem>>) -> Self { Self { entries } }

    pub fn items_for(&self, role: Role) -> &[NavItem] {
        self.entries.get(&role).map(Vec::as_slice).unwrap_or(&[])
    }
}
