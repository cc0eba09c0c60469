//! Currency and preference models

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Name of the preference that holds the user's default currency code
pub const CURRENCY_PREFERENCE: &str = "currencyPreference";

/// Currency used when the preference carries no code
pub const FALLBACK_CURRENCY_CODE: &str = "EUR";

/// A currency as known by the remote accounting API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionCurrency {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub symbol: String,
    pub decimal_places: u32,
    pub enabled: bool,
}

impl TransactionCurrency {
    pub fn new(id: i64, code: impl Into<String>) -> Self {
        let code = code.into();
        Self {
            id,
            name: code.clone(),
            symbol: code.clone(),
            code,
            decimal_places: 2,
            enabled: true,
        }
    }
}

/// A user preference
///
/// `data` is whatever JSON the API stored under the preference name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preference {
    pub name: String,
    pub data: JsonValue,
}

impl Preference {
    /// Currency code stored in this preference
    ///
    /// The stored string is not passed through as is: it is trimmed and
    /// uppercased, so `" usd "` asks the API for `USD`. Besides null, blank
    /// and non-string data also count as unset and give
    /// [`FALLBACK_CURRENCY_CODE`].
    pub fn currency_code(&self) -> String {
        match &self.data {
            JsonValue::String(s) if !s.trim().is_empty() => s.trim().to_uppercase(),
            _ => FALLBACK_CURRENCY_CODE.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pref(data: JsonValue) -> Preference {
        Preference {
            name: CURRENCY_PREFERENCE.to_string(),
            data,
        }
    }

    #[test]
    fn test_currency_code_from_preference() {
        assert_eq!(pref(json!("usd")).currency_code(), "USD");
        assert_eq!(pref(json!("GBP")).currency_code(), "GBP");
        assert_eq!(pref(json!(" chf\n")).currency_code(), "CHF");
    }

    #[test]
    fn test_currency_code_fallback() {
        assert_eq!(pref(JsonValue::Null).currency_code(), "EUR");
        assert_eq!(pref(json!("  ")).currency_code(), "EUR");
        assert_eq!(pref(json!(42)).currency_code(), "EUR");
    }
}
