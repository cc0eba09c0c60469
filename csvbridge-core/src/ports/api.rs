//! Accounting API port
//!
//! The import pipeline only ever talks to the remote bookkeeping system
//! through this trait. The HTTP implementation lives in
//! `adapters::firefly`; tests use in-memory fakes.

use serde::Serialize;

use crate::domain::result::Result;
use crate::domain::{
    Account, Preference, StoredTransaction, TransactionCurrency, TransactionGroupRequest,
};

/// Version information reported by the API
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SystemInfo {
    pub version: String,
    pub api_version: String,
    pub os: Option<String>,
}

/// Remote accounting API
///
/// Each call is a single attempt. Any failure (transport, HTTP status,
/// undecodable body) is reported as `Error::Api`.
pub trait AccountingApi: Send + Sync {
    /// Fetch an account by ID
    fn get_account(&self, id: i64) -> Result<Account>;

    /// Fetch a user preference by name (e.g. "currencyPreference")
    fn get_preference(&self, name: &str) -> Result<Preference>;

    /// Fetch a currency by ISO code
    fn get_currency(&self, code: &str) -> Result<TransactionCurrency>;

    /// Store one transaction group
    fn store_transaction(&self, request: &TransactionGroupRequest) -> Result<StoredTransaction>;

    /// Fetch server version information
    fn about(&self) -> Result<SystemInfo>;
}
