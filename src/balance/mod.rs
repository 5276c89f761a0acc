//! Balance records: one authoritative row per user, upserted by user id.

mod record;
mod store;
pub mod memory;

pub use record::{format_amount, parse_amount, parse_balance, BalanceInput, BalanceRecord};
pub use store::{latest_balance, upsert_balance, BalanceDraft, BalanceError, BalanceStore, UpsertOutcome};
pub use memory::MemoryBalanceStore;
