//! Core domain entities
//!
//! Plain data structures exchanged between the CSV side and the remote
//! accounting API - no I/O here.

mod account;
pub mod currency;
pub mod result;
mod transaction;

pub use account::Account;
pub use currency::{Preference, TransactionCurrency};
pub use transaction::{
    AccountRef, PseudoSplit, PseudoTransaction, StoredTransaction, TransactionGroupRequest,
    TransactionSplitRequest, TransactionType,
};
