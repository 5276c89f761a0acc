use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One balance row. The backend stores the plan label under the hyphenated
/// key `plan-label`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceRecord {
    pub id: String,
    pub user_id: String,
    #[serde(rename = "plan-label", default)]
    pub plan_label: String,
    /// Two-fraction-digit decimal string. May be missing or malformed in stored data.
    #[serde(default)]
    pub balance: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Balance as supplied by callers: a JSON number or a string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BalanceInput {
    Number(f64),
    Text(String),
}

impl From<f64> for BalanceInput {
    fn from(v: f64) -> Self { BalanceInput::Number(v) }
}

impl From<&str> for BalanceInput {
    fn from(v: &str) -> Self { BalanceInput::Text(v.to_string()) }
}

impl BalanceInput {
    /// Fixed-point form stored by upserts. Non-finite or unparseable input is "0.00".
    pub fn normalize(&self) -> String {
        match self {
            BalanceInput::Number(v) => format_amount(*v),
            BalanceInput::Text(s) => parse_amount(s).map(format_amount).unwrap_or_else(zero),
        }
    }
}

fn zero() -> String { "0.00".to_string() }

/// Two-fraction-digit form. Values that round to zero are `"0.00"`, never `"-0.00"`.
pub fn format_amount(v: f64) -> String {
    if !v.is_finite() { return zero(); }
    let out = format!("{v:.2}");
    if out == "-0.00" { zero() } else { out }
}

/// Parse a stored amount, ignoring thousands separators. `None` unless finite.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Numeric balance of a possibly-absent record. Never fails on malformed data.
pub fn parse_balance(record: Option<&BalanceRecord>) -> Option<f64> {
    record.and_then(|r| r.balance.as_deref()).and_then(parse_amount)
}
