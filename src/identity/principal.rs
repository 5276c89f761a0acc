use serde::{Deserialize, Serialize};

/// The user behind the current session, as reported by the identity backend.
/// Read per navigation/request and never persisted by the portal.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionUser {
    #[serde(alias = "$id")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl SessionUser {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into(), ..Default::default() }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self { self.name = Some(name.into()); self }
    pub fn with_email(mut self, email: impl Into<String>) -> Self { self.email = Some(email.into()); self }

    // Backends report "no name" as an empty string
    pub fn name_hint(&self) -> Option<&str> { self.name.as_deref().filter(|s| !s.trim().is_empty()) }
    pub fn email_hint(&self) -> Option<&str> { self.email.as_deref().filter(|s| !s.trim().is_empty()) }
}
