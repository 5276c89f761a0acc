//! HTTP tests for session-scoped endpoints (access checks, navigation) and the
//! balance endpoints, against an in-process portal server.

use std::sync::Arc;

use anyhow::Result;
use serde_json::{json, Value};
use tokio::task::JoinHandle;

use tuition_portal::access::{AccessPolicy, NavItem, NavigationTable, RouteRule, RouteTable};
use tuition_portal::balance::{BalanceRecord, BalanceStore, MemoryBalanceStore};
use tuition_portal::config::{AccessConfig, ConfigError, ENV_IDENTITY_ENDPOINT};
use tuition_portal::identity::{AdminUsers, MemoryIdentity, Role, SessionBinder, SessionUser};
use tuition_portal::server::{serve, AppState, SESSION_COOKIE};

async fn start_portal(state: AppState) -> (JoinHandle<()>, String) {
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", 0)).await.expect("bind 127.0.0.1:0");
    let addr = listener.local_addr().expect("local addr");
    let handle = tokio::spawn(async move {
        if let Err(e) = serve(listener, state).await {
            eprintln!("portal server task error: {e:?}");
        }
    });
    (handle, format!("http://{addr}"))
}

fn identity() -> MemoryIdentity {
    let id = MemoryIdentity::new();
    id.add_user(SessionUser::new("cash1").with_name("Cam"));
    id.set_role("cash1", "cashier");
    id.open_session("cash-token", "cash1");
    id.add_user(SessionUser::new("stud1").with_name("Sam"));
    id.open_session("stud-token", "stud1");
    id
}

fn state(identity: &MemoryIdentity, access: AccessConfig, balances: Arc<dyn BalanceStore>) -> AppState {
    AppState::new(
        access,
        Ok(Arc::new(identity.clone()) as Arc<dyn SessionBinder>),
        Ok(Arc::new(identity.clone()) as Arc<dyn AdminUsers>),
        balances,
    )
}

async fn get(base: &str, path: &str, session: Option<&str>) -> Result<(u16, Value)> {
    let mut rb = reqwest::Client::new().get(format!("{base}{path}"));
    if let Some(tok) = session {
        rb = rb.header("cookie", format!("{SESSION_COOKIE}={tok}"));
    }
    let resp = rb.send().await?;
    let status = resp.status().as_u16();
    Ok((status, resp.json().await?))
}

#[tokio::test]
async fn access_check_reflects_caller_role() -> Result<()> {
    let id = identity();
    let (handle, base) = start_portal(state(&id, AccessConfig::default(), Arc::new(MemoryBalanceStore::new()))).await;

    let (status, body) = get(&base, "/api/access?path=/cashier/payments", Some("cash-token")).await?;
    assert_eq!(status, 200);
    assert_eq!(body, json!({"decision": "allow", "role": "cashier"}));

    let (_, body) = get(&base, "/api/access?path=/admin", Some("cash-token")).await?;
    assert_eq!(body, json!({"decision": "redirect", "location": "/cashier", "role": "cashier"}));

    let (_, body) = get(&base, "/api/access?path=/admin/users", None).await?;
    assert_eq!(body["decision"], "redirect");
    assert_eq!(body["location"], "/login?redirect=%2Fadmin%2Fusers");
    assert_eq!(body["role"], Value::Null);

    // First visit creates the student role record
    let (_, body) = get(&base, "/api/access?path=/student", Some("stud-token")).await?;
    assert_eq!(body["decision"], "allow");
    assert_eq!(id.role_of("stud1").as_deref(), Some("student"));

    handle.abort();
    Ok(())
}

#[tokio::test]
async fn access_file_rules_and_homes_are_honored() -> Result<()> {
    let id = identity();
    let access = AccessConfig {
        policy: AccessPolicy {
            routes: RouteTable::new(vec![
                RouteRule::new("/finance", [Role::Cashier, Role::BusinessOffice]),
                RouteRule::new("/finance/audit", [Role::Admin]),
            ]),
            login_path: "/signin".into(),
            homes: [(Role::Cashier, "/till".to_string())].into_iter().collect(),
        },
        navigation: NavigationTable::default(),
    };
    let (handle, base) = start_portal(state(&id, access, Arc::new(MemoryBalanceStore::new()))).await;

    let (_, body) = get(&base, "/api/access?path=/finance/ledger", Some("cash-token")).await?;
    assert_eq!(body["decision"], "allow");
    let (_, body) = get(&base, "/api/access?path=/finance/audit/2024", Some("cash-token")).await?;
    assert_eq!(body["location"], "/till");
    let (_, body) = get(&base, "/api/access?path=/financereports", None).await?;
    assert_eq!(body["decision"], "allow");
    let (_, body) = get(&base, "/api/access?path=/finance", None).await?;
    assert_eq!(body["location"], "/signin?redirect=%2Ffinance");

    handle.abort();
    Ok(())
}

#[tokio::test]
async fn navigation_requires_session_and_follows_role() -> Result<()> {
    let id = identity();
    let mut entries = std::collections::BTreeMap::new();
    entries.insert(Role::Cashier, vec![NavItem { label: "Till".into(), path: "/cashier".into(), icon: None }]);
    let access = AccessConfig { policy: AccessPolicy::default(), navigation: NavigationTable::new(entries) };
    let (handle, base) = start_portal(state(&id, access, Arc::new(MemoryBalanceStore::new()))).await;

    let (status, body) = get(&base, "/api/navigation", Some("cash-token")).await?;
    assert_eq!(status, 200);
    assert_eq!(body["role"], "cashier");
    assert_eq!(body["items"], json!([{"label": "Till", "path": "/cashier", "icon": null}]));

    let (status, body) = get(&base, "/api/navigation", Some("stud-token")).await?;
    assert_eq!(status, 200);
    assert_eq!(body["items"], json!([]));

    let (status, body) = get(&base, "/api/navigation", None).await?;
    assert_eq!(status, 401);
    assert_eq!(body["code"], "no_session");

    handle.abort();
    Ok(())
}

#[tokio::test]
async fn unconfigured_identity_answers_500() -> Result<()> {
    let mut st = state(&identity(), AccessConfig::default(), Arc::new(MemoryBalanceStore::new()));
    st.sessions = Err(ConfigError::Missing(ENV_IDENTITY_ENDPOINT));
    let (handle, base) = start_portal(st).await;

    let (status, body) = get(&base, "/api/access?path=/admin", Some("cash-token")).await?;
    assert_eq!(status, 500);
    assert_eq!(body["status"], "error");
    assert_eq!(body["code"], "missing_config");

    handle.abort();
    Ok(())
}

#[tokio::test]
async fn balance_upsert_creates_once_then_updates() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let store = Arc::new(MemoryBalanceStore::open(tmp.path())?);
    let (handle, base) = start_portal(state(&identity(), AccessConfig::default(), store.clone())).await;
    let client = reqwest::Client::new();

    let (status, _) = get(&base, "/api/balances/stud1", None).await?;
    assert_eq!(status, 404);

    let resp = client.put(format!("{base}/api/balances/stud1")).json(&json!({"planLabel": "Installment", "balance": 1500})).send().await?;
    assert_eq!(resp.status().as_u16(), 201);
    let body: Value = resp.json().await?;
    assert_eq!(body["created"], true);
    assert_eq!(body["record"]["balance"], "1500.00");
    assert_eq!(body["record"]["plan-label"], "Installment");
    let first_id = body["record"]["id"].clone();

    let resp = client.put(format!("{base}/api/balances/stud1")).json(&json!({"planLabel": "Full", "balance": "16,522.98"})).send().await?;
    assert_eq!(resp.status().as_u16(), 200);
    let body: Value = resp.json().await?;
    assert_eq!(body["created"], false);
    assert_eq!(body["record"]["id"], first_id);
    assert_eq!(store.len(), 1);

    let (status, body) = get(&base, "/api/balances/stud1", None).await?;
    assert_eq!(status, 200);
    assert_eq!(body["record"]["balance"], "16522.98");
    assert_eq!(body["amount"], 16522.98);

    // Persisted snapshot reloads with the single row
    let reopened = MemoryBalanceStore::open(tmp.path())?;
    assert_eq!(reopened.find_by_user("stud1").await?.len(), 1);

    handle.abort();
    Ok(())
}

#[tokio::test]
async fn duplicate_rows_resolve_to_newest() -> Result<()> {
    let store = Arc::new(MemoryBalanceStore::new());
    let now = chrono::Utc::now();
    let row = |id: &str, balance: &str, age_secs: i64| BalanceRecord {
        id: id.into(),
        user_id: "stud1".into(),
        plan_label: "Full".into(),
        balance: Some(balance.into()),
        updated_at: now - chrono::Duration::seconds(age_secs),
    };
    store.import([row("older", "10.00", 60), row("newer", "20.00", 5)])?;
    let (handle, base) = start_portal(state(&identity(), AccessConfig::default(), store.clone())).await;

    let (_, body) = get(&base, "/api/balances/stud1", None).await?;
    assert_eq!(body["record"]["id"], "newer");

    let resp = reqwest::Client::new().put(format!("{base}/api/balances/stud1")).json(&json!({"balance": 5})).send().await?;
    let body: Value = resp.json().await?;
    assert_eq!(body["record"]["id"], "newer");
    assert_eq!(body["record"]["balance"], "5.00");
    assert_eq!(store.len(), 2);

    handle.abort();
    Ok(())
}

#[tokio::test]
async fn malformed_stored_balance_reads_as_no_amount() -> Result<()> {
    let store = Arc::new(MemoryBalanceStore::new());
    store.import([BalanceRecord {
        id: "r1".into(),
        user_id: "stud1".into(),
        plan_label: String::new(),
        balance: Some("n/a".into()),
        updated_at: chrono::Utc::now(),
    }])?;
    let (handle, base) = start_portal(state(&identity(), AccessConfig::default(), store)).await;

    let (status, body) = get(&base, "/api/balances/stud1", None).await?;
    assert_eq!(status, 200);
    assert_eq!(body["amount"], Value::Null);

    handle.abort();
    Ok(())
}
