//! Admin account mutation: multi-field updates against the identity backend
//! with partial-failure reporting.

pub mod settle;
mod mutator;

pub use mutator::{apply_account_mutation, AccountMutation, MutationOutcome};
pub use settle::{settle_all, Settlement};
