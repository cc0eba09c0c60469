//! Account domain model

use serde::{Deserialize, Serialize};

/// An account as known by the remote accounting API
///
/// Only the fields the import pipeline reads are kept. `account_type` is the
/// API's own vocabulary ("asset", "expense", "revenue", "liabilities", ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub name: String,
    pub account_type: String,
    pub currency_id: Option<i64>,
    /// ISO 4217 currency code, normalized to uppercase
    pub currency_code: Option<String>,
    pub iban: Option<String>,
    pub account_number: Option<String>,
    pub active: bool,
}

impl Account {
    /// Create a new asset account with required fields
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            account_type: "asset".to_string(),
            currency_id: None,
            currency_code: None,
            iban: None,
            account_number: None,
            active: true,
        }
    }

    /// Whether this is an asset account (the side a CSV export belongs to)
    pub fn is_asset(&self) -> bool {
        self.account_type.eq_ignore_ascii_case("asset")
    }

    /// Normalize currency code to uppercase
    pub fn normalize_currency(currency: &str) -> String {
        currency.trim().to_uppercase()
    }
}
