use serde::{Deserialize, Serialize};

use crate::identity::Role;

/// Roles permitted under a path prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteRule {
    pub prefix: String,
    pub allow: Vec<Role>,
}

impl RouteRule {
    pub fn new(prefix: impl Into<String>, allow: impl IntoIterator<Item = Role>) -> Self {
        Self { prefix: prefix.into(), allow: allow.into_iter().collect() }
    }

    fn normalized_prefix(&self) -> &str { self.prefix.trim_end_matches('/') }

    /// Segment-aware prefix match: `/admin` covers `/admin` and `/admin/users`
    /// but not `/administrator`. A `/` prefix covers every path.
    pub fn applies_to(&self, path: &str) -> bool {
        let path = strip_query(path);
        let prefix = self.normalized_prefix();
        if prefix.is_empty() { return true; }
        match path.strip_prefix(prefix) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }

    pub fn permits(&self, role: Role) -> bool { self.allow.contains(&role) }
}

fn strip_query(path: &str) -> &str {
    path.split(['?', '#']).next().unwrap_or(path)
}

/// Ordered rule list. Lookups pick the longest applicable prefix; on equal length
/// the rule declared first wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RouteTable {
    rules: Vec<RouteRule>,
}

impl RouteTable {
    pub fn new(rules: Vec<RouteRule>) -> Self { Self { rules } }

    pub fn rules(&self) -> &[RouteRule] { &self.rules }

    pub fn matching(&self, path: &str) -> Option<&RouteRule> {
        let mut best: Option<&RouteRule> = None;
        for rule in self.rules.iter().filter(|r| r.applies_to(path)) {
            let longer = match best {
                Some(b) => rule.normalized_prefix().len() > b.normalized_prefix().len(),
                None => true,
            };
            if longer { best = Some(rule); }
        }
        best
    }
}
