//! REST adapter for the identity backend.
//!
//! Requests carry `x-project-id`, plus either `x-session` (caller-scoped calls)
//! or `x-api-key` (admin calls). Error bodies of the form `{"message": ..}` are
//! surfaced verbatim in `IdentityError::Status`.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Method, StatusCode, Url};
use serde::Deserialize;
use serde_json::json;

use super::principal::SessionUser;
use super::provider::{AdminUsers, IdentityBackend, IdentityError, SessionBinder, UserField};
use crate::config::{ConfigError, IdentitySettings, ENV_IDENTITY_ENDPOINT};

const HEADER_PROJECT: &str = "x-project-id";
const HEADER_SESSION: &str = "x-session";
const HEADER_API_KEY: &str = "x-api-key";

#[derive(Clone)]
pub struct HttpIdentityClient {
    base: Url,
    project: String,
    api_key: Option<String>,
    session: Option<String>,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct RoleDoc {
    #[serde(default)]
    role: Option<String>,
}

impl HttpIdentityClient {
    /// Session-scoped client; never sends the admin key.
    pub fn new(settings: &IdentitySettings) -> Result<Self, ConfigError> {
        let base = Url::parse(&settings.endpoint)
            .map_err(|e| ConfigError::Invalid { name: ENV_IDENTITY_ENDPOINT, reason: e.to_string() })?;
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| ConfigError::Invalid { name: ENV_IDENTITY_ENDPOINT, reason: e.to_string() })?;
        Ok(Self { base, project: settings.project.clone(), api_key: None, session: None, client })
    }

    /// Admin client; fails when the administrative credential is not configured.
    pub fn admin(settings: &IdentitySettings) -> Result<Self, ConfigError> {
        let key = settings.require_api_key()?.to_string();
        let mut c = Self::new(settings)?;
        c.api_key = Some(key);
        Ok(c)
    }

    pub fn with_session(&self, session: Option<&str>) -> Self {
        let mut c = self.clone();
        c.session = session.map(|s| s.to_string());
        c
    }

    fn url(&self, segments: &[&str]) -> String {
        let mut out = self.base.as_str().trim_end_matches('/').to_string();
        for s in segments {
            out.push('/');
            out.push_str(&urlencoding::encode(s));
        }
        out
    }

    fn request(&self, method: Method, segments: &[&str]) -> reqwest::RequestBuilder {
        let mut rb = self.client.request(method, self.url(segments)).header(HEADER_PROJECT, &self.project);
        if let Some(s) = &self.session { rb = rb.header(HEADER_SESSION, s); }
        if let Some(k) = &self.api_key { rb = rb.header(HEADER_API_KEY, k); }
        rb
    }
}

async fn send(rb: reqwest::RequestBuilder) -> Result<reqwest::Response, IdentityError> {
    rb.send().await.map_err(|e| IdentityError::Transport(e.to_string()))
}

async fn status_error(resp: reqwest::Response) -> IdentityError {
    let status = resp.status();
    let body: serde_json::Value = resp.json().await.unwrap_or(serde_json::Value::Null);
    let message = body
        .get("message")
        .and_then(|m| m.as_str())
        .map(|s| s.to_string())
        .unwrap_or_else(|| format!("identity backend returned HTTP {status}"));
    IdentityError::Status { status: status.as_u16(), message }
}

#[async_trait]
impl IdentityBackend for HttpIdentityClient {
    async fn current_user(&self) -> Result<Option<SessionUser>, IdentityError> {
        if self.session.is_none() { return Ok(None); }
        let resp = send(self.request(Method::GET, &["account"])).await?;
        match resp.status() {
            s if s.is_success() => resp.json::<SessionUser>().await.map(Some).map_err(|e| IdentityError::Decode(e.to_string())),
            // Expired or unknown session: no user, not an error
            StatusCode::UNAUTHORIZED => Ok(None),
            _ => Err(status_error(resp).await),
        }
    }

    async fn get_or_create_role(&self, user_id: &str, email: Option<&str>, name: Option<&str>) -> Result<String, IdentityError> {
        let resp = send(self.request(Method::GET, &["roles", user_id])).await?;
        let resp = match resp.status() {
            s if s.is_success() => resp,
            StatusCode::NOT_FOUND => {
                tracing::debug!(user_id, "role record absent; creating");
                let body = json!({ "userId": user_id, "email": email, "name": name });
                let created = send(self.request(Method::POST, &["roles"]).json(&body)).await?;
                if !created.status().is_success() { return Err(status_error(created).await); }
                created
            }
            _ => return Err(status_error(resp).await),
        };
        let doc: RoleDoc = resp.json().await.map_err(|e| IdentityError::Decode(e.to_string()))?;
        Ok(doc.role.unwrap_or_default())
    }
}

#[async_trait]
impl AdminUsers for HttpIdentityClient {
    async fn update_user_field(&self, user_id: &str, field: UserField, value: &str) -> Result<(), IdentityError> {
        let body = match field {
            UserField::Name => json!({ "name": value }),
            UserField::Email => json!({ "email": value }),
        };
        let resp = send(self.request(Method::PATCH, &["users", user_id, field.as_str()]).json(&body)).await?;
        if resp.status().is_success() { Ok(()) } else { Err(status_error(resp).await) }
    }
}

impl SessionBinder for HttpIdentityClient {
    fn bind(&self, session: Option<&str>) -> Arc<dyn IdentityBackend> {
        Arc::new(self.with_session(session))
    }
}
