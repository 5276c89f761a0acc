use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Portal roles. Every authenticated user maps to exactly one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Role {
    Admin,
    Cashier,
    BusinessOffice,
    Student,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Admin, Role::Cashier, Role::BusinessOffice, Role::Student];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Cashier => "cashier",
            Role::BusinessOffice => "business-office",
            Role::Student => "student",
        }
    }

    /// Landing path used when no access policy overrides it.
    pub fn default_home(&self) -> &'static str {
        match self {
            Role::Admin => "/admin",
            Role::Cashier => "/cashier",
            Role::BusinessOffice => "/business-office",
            Role::Student => "/student",
        }
    }

    /// Strict parse of a stored role value. Case-insensitive; `_`, `-` and spaces
    /// are interchangeable separators.
    pub fn parse(raw: &str) -> Option<Role> {
        let canon: String = raw
            .trim()
            .chars()
            .map(|c| if c == '_' || c == ' ' { '-' } else { c.to_ascii_lowercase() })
            .collect();
        match canon.as_str() {
            "admin" => Some(Role::Admin),
            "cashier" => Some(Role::Cashier),
            "business-office" | "businessoffice" => Some(Role::BusinessOffice),
            "student" => Some(Role::Student),
            _ => None,
        }
    }

    /// Lenient normalization used when resolving sessions: anything absent or
    /// unrecognized becomes `Student`.
    pub fn normalize(raw: Option<&str>) -> Role {
        raw.and_then(Role::parse).unwrap_or(Role::Student)
    }
}

impl Default for Role {
    fn default() -> Self { Role::Student }
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::parse(s).ok_or_else(|| format!("unknown role: {s}"))
    }
}

impl TryFrom<String> for Role {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> { value.parse() }
}

impl From<Role> for String {
    fn from(role: Role) -> Self { role.as_str().to_string() }
}
