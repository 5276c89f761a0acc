//!
//! portal HTTP server
//! ------------------
//! Axum-based HTTP API for the tuition portal's access-control core.
//!
//! Responsibilities:
//! - Admin account mutation (`PATCH /api/admin/users/{user_id}`).
//! - Server-side route decisions and navigation for the caller's session.
//! - Balance record lookup and upsert.
//!
//! Identity collaborators that could not be configured are kept as their
//! `ConfigError`; endpoints needing them answer 500 with that message.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info, warn};

use crate::access::{decide, resolve_session, AccessPolicy, Decision, NavigationTable, ResolverState};
use crate::account::{apply_account_mutation, AccountMutation, MutationOutcome};
use crate::balance::{latest_balance, parse_balance, upsert_balance, BalanceInput, BalanceStore, MemoryBalanceStore};
use crate::config::{AccessConfig, ConfigError, IdentitySettings, PortalConfig};
use crate::error::AppError;
use crate::identity::{AdminUsers, HttpIdentityClient, SessionBinder};

pub const SESSION_COOKIE: &str = "portal_session";

/// Shared server state injected into all handlers.
#[derive(Clone)]
pub struct AppState {
    pub policy: Arc<AccessPolicy>,
    pub navigation: Arc<NavigationTable>,
    pub sessions: Result<Arc<dyn SessionBinder>, ConfigError>,
    pub admin: Result<Arc<dyn AdminUsers>, ConfigError>,
    pub balances: Arc<dyn BalanceStore>,
}

impl AppState {
    pub fn new(
        access: AccessConfig,
        sessions: Result<Arc<dyn SessionBinder>, ConfigError>,
        admin: Result<Arc<dyn AdminUsers>, ConfigError>,
        balances: Arc<dyn BalanceStore>,
    ) -> Self {
        Self {
            policy: Arc::new(access.policy),
            navigation: Arc::new(access.navigation),
            sessions,
            admin,
            balances,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "portal ok" }))
        .route("/api/admin/users/{user_id}", patch(patch_account))
        .route("/api/access", get(access_check))
        .route("/api/navigation", get(navigation))
        .route("/api/balances/{user_id}", get(get_balance).put(put_balance))
        .with_state(state)
}

/// Build collaborators from configuration and serve on `config.http_port`.
pub async fn run(config: PortalConfig) -> anyhow::Result<()> {
    use anyhow::Context;

    let access = config.load_access()?;
    let balances: Arc<dyn BalanceStore> = match &config.data_dir {
        Some(dir) => Arc::new(MemoryBalanceStore::open(dir).with_context(|| format!("While opening balance store under {}", dir.display()))?),
        None => {
            warn!("no data directory configured; balances are kept in memory only");
            Arc::new(MemoryBalanceStore::new())
        }
    };
    let identity = IdentitySettings::from_env();
    let sessions = identity.clone().and_then(|s| HttpIdentityClient::new(&s)).map(|c| Arc::new(c) as Arc<dyn SessionBinder>);
    let admin = identity.and_then(|s| HttpIdentityClient::admin(&s)).map(|c| Arc::new(c) as Arc<dyn AdminUsers>);
    if let Err(e) = &sessions { error!("session lookups disabled: {e}"); }
    if let Err(e) = &admin { error!("admin account endpoint disabled: {e}"); }

    let state = AppState::new(access, sessions, admin, balances);
    let addr: SocketAddr = format!("0.0.0.0:{}", config.http_port).parse()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    serve(listener, state).await
}

pub async fn serve(listener: tokio::net::TcpListener, state: AppState) -> anyhow::Result<()> {
    axum::serve(listener, router(state)).await?;
    Ok(())
}

fn parse_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let cookie = headers.get("cookie")?;
    let s = cookie.to_str().ok()?;
    for part in s.split(';') {
        let p = part.trim();
        if let Some((k, v)) = p.split_once('=') {
            if k == name && !v.is_empty() { return Some(v.to_string()); }
        }
    }
    None
}

fn account_failure(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({"ok": false, "error": message.into()}))).into_response()
}

/// `PATCH /api/admin/users/{user_id}`.
///
/// Not session- or role-checked here: callers are expected to reach it only
/// through admin pages behind the route gate, and the identity backend enforces
/// the administrative key. An empty or `null` body is a skipped no-op. A body
/// that is not a JSON object answers 400 `{ok: false, error}`; configuration and
/// backend failures answer 500 `{ok: false, error}`.
async fn patch_account(State(state): State<AppState>, Path(user_id): Path<String>, body: Bytes) -> Response {
    let admin = match &state.admin {
        Ok(a) => a.clone(),
        Err(e) => {
            error!(%user_id, "account mutation refused: {e}");
            return account_failure(StatusCode::INTERNAL_SERVER_ERROR, e.to_string());
        }
    };
    let request: AccountMutation = if body.iter().all(u8::is_ascii_whitespace) {
        AccountMutation::default()
    } else {
        match serde_json::from_slice::<Option<AccountMutation>>(&body) {
            Ok(r) => r.unwrap_or_default(),
            Err(e) => return account_failure(StatusCode::BAD_REQUEST, format!("invalid body: {e}")),
        }
    };
    match apply_account_mutation(admin.as_ref(), &user_id, &request).await {
        Ok(MutationOutcome::Skipped) => (StatusCode::OK, Json(json!({"ok": true, "skipped": true}))).into_response(),
        Ok(MutationOutcome::Applied { .. }) => (StatusCode::OK, Json(json!({"ok": true}))).into_response(),
        Err(e) => {
            error!(%user_id, "account mutation failed: {e}");
            account_failure(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

async fn resolve_caller(state: &AppState, headers: &HeaderMap) -> Result<ResolverState, AppError> {
    let binder = state.sessions.as_ref().map_err(|e| AppError::from(e.clone()))?;
    let token = parse_cookie(headers, SESSION_COOKIE);
    let backend = binder.bind(token.as_deref());
    Ok(resolve_session(backend.as_ref()).await?)
}

#[derive(Debug, Deserialize)]
struct AccessQuery { path: String }

async fn access_check(State(state): State<AppState>, headers: HeaderMap, Query(q): Query<AccessQuery>) -> Response {
    let snapshot = match resolve_caller(&state, &headers).await {
        Ok(s) => s,
        Err(e) => {
            error!("access check failed: {e}");
            return e.into_response();
        }
    };
    let role = snapshot.role();
    match decide(&state.policy, &q.path, &snapshot) {
        Decision::Allow => Json(json!({"decision": "allow", "role": role})).into_response(),
        Decision::Redirect(location) => {
            tracing::debug!(path = %q.path, %location, "access redirect");
            Json(json!({"decision": "redirect", "location": location, "role": role})).into_response()
        }
        Decision::Wait => Json(json!({"decision": "pending"})).into_response(),
    }
}

async fn navigation(State(state): State<AppState>, headers: HeaderMap) -> Response {
    match resolve_caller(&state, &headers).await {
        Ok(ResolverState::Authenticated { role, .. }) => {
            Json(json!({"role": role, "items": state.navigation.items_for(role)})).into_response()
        }
        Ok(_) => AppError::auth("no_session", "sign in required").into_response(),
        Err(e) => {
            error!("navigation lookup failed: {e}");
            e.into_response()
        }
    }
}

async fn get_balance(State(state): State<AppState>, Path(user_id): Path<String>) -> Response {
    match latest_balance(state.balances.as_ref(), &user_id).await {
        Ok(Some(rec)) => {
            let amount = parse_balance(Some(&rec));
            Json(json!({"status": "ok", "record": rec, "amount": amount})).into_response()
        }
        Ok(None) => AppError::not_found("no_balance", "no balance record for user").into_response(),
        Err(e) => {
            error!(%user_id, "balance lookup failed: {e}");
            AppError::from(e).into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BalancePayload {
    #[serde(default)]
    plan_label: String,
    balance: BalanceInput,
}

/// `PUT /api/balances/{user_id}`. Like the admin account endpoint, this is not
/// session-checked; it is served to business-office pages behind the route gate.
async fn put_balance(State(state): State<AppState>, Path(user_id): Path<String>, Json(payload): Json<BalancePayload>) -> Response {
    match upsert_balance(state.balances.as_ref(), &user_id, &payload.plan_label, &payload.balance).await {
        Ok(outcome) => {
            let status = if outcome.created() { StatusCode::CREATED } else { StatusCode::OK };
            (status, Json(json!({"status": "ok", "created": outcome.created(), "record": outcome.record()}))).into_response()
        }
        Err(e) => {
            error!(%user_id, "balance upsert failed: {e}");
            AppError::from(e).into_response()
        }
    }
}
