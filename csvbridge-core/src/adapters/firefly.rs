//! Firefly III API client
//!
//! Implements the [`AccountingApi`] port over the Firefly III REST API
//! (JSON:API style envelopes: `{ "data": { "id": "1", "attributes": {...} } }`).
//!
//! API Documentation: https://api-docs.firefly-iii.org/

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::config::ConnectionSettings;
use crate::domain::result::{Error as DomainError, Result as DomainResult};
use crate::domain::{
    Account, Preference, StoredTransaction, TransactionCurrency, TransactionGroupRequest,
};
use crate::ports::{AccountingApi, SystemInfo};

// =============================================================================
// API Response Models
// =============================================================================

/// `{ "data": ... }` envelope
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

/// JSON:API resource object
#[derive(Debug, Deserialize)]
struct Resource<A> {
    #[serde(deserialize_with = "deserialize_id")]
    id: i64,
    attributes: A,
}

#[derive(Debug, Deserialize)]
struct AccountAttributes {
    name: String,
    #[serde(rename = "type", default)]
    account_type: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_id")]
    currency_id: Option<i64>,
    #[serde(default)]
    currency_code: Option<String>,
    #[serde(default)]
    iban: Option<String>,
    #[serde(default)]
    account_number: Option<String>,
    #[serde(default)]
    active: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct PreferenceAttributes {
    name: String,
    #[serde(default)]
    data: JsonValue,
}

#[derive(Debug, Deserialize)]
struct CurrencyAttributes {
    code: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    symbol: Option<String>,
    #[serde(default)]
    decimal_places: Option<u32>,
    #[serde(default)]
    enabled: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct CreatedResource {
    #[serde(deserialize_with = "deserialize_id")]
    id: i64,
}

#[derive(Debug, Deserialize)]
struct AboutData {
    version: String,
    api_version: String,
    #[serde(default)]
    os: Option<String>,
}

/// Error body, e.g. 422 validation failures
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    errors: BTreeMap<String, Vec<String>>,
}

/// Deserialize an ID that can be a number or a numeric string
fn deserialize_id<'de, D>(deserializer: D) -> std::result::Result<i64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;
    let value: JsonValue = Deserialize::deserialize(deserializer)?;
    parse_id(&value).ok_or_else(|| D::Error::custom("expected numeric id"))
}

/// Deserialize an optional ID that can be a number, a numeric string or null
fn deserialize_optional_id<'de, D>(deserializer: D) -> std::result::Result<Option<i64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;
    let value: Option<JsonValue> = Option::deserialize(deserializer)?;
    match value {
        None | Some(JsonValue::Null) => Ok(None),
        Some(JsonValue::String(s)) if s.is_empty() => Ok(None),
        Some(v) => parse_id(&v)
            .map(Some)
            .ok_or_else(|| D::Error::custom("expected numeric id")),
    }
}

fn parse_id(value: &JsonValue) -> Option<i64> {
    match value {
        JsonValue::Number(n) => n.as_i64(),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

// =============================================================================
// Firefly HTTP Client
// =============================================================================

/// Firefly III API client
#[derive(Debug)]
pub struct FireflyClient {
    client: Client,
    base_url: String,
    access_token: String,
    timeout: Duration,
}

impl FireflyClient {
    /// Create a client from connection settings
    ///
    /// `verify = false` turns off certificate validation; the timeout applies
    /// to every request.
    pub fn new(settings: &ConnectionSettings) -> DomainResult<Self> {
        settings.validate()?;

        let timeout = settings.timeout_duration();
        let client = Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(!settings.verify)
            .build()
            .map_err(|e| DomainError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: settings.url.trim().trim_end_matches('/').to_string(),
            access_token: settings.access_token.trim().to_string(),
            timeout,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1/{}", self.base_url, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .bearer_auth(&self.access_token)
            .header(reqwest::header::ACCEPT, "application/json")
    }

    fn get_json<T: DeserializeOwned>(&self, path: &str) -> DomainResult<T> {
        let url = self.url(path);
        tracing::debug!("GET {}", url);

        let response = self
            .authorized(self.client.get(&url))
            .send()
            .map_err(|e| self.map_request_error(e))?;

        let response = self.check_response_status(response)?;
        response
            .json()
            .map_err(|e| DomainError::api(format!("Failed to parse response from {}: {}", path, e)))
    }

    /// Map request errors to user-friendly messages
    fn map_request_error(&self, error: reqwest::Error) -> DomainError {
        if error.is_timeout() {
            DomainError::api(format!(
                "Connection timed out after {} seconds",
                self.timeout.as_secs_f64()
            ))
        } else if error.is_connect() {
            DomainError::api(format!("Unable to connect to {}", self.base_url))
        } else {
            DomainError::api(format!("Request failed: {}", error))
        }
    }

    /// Check response status and return appropriate errors
    fn check_response_status(&self, response: Response) -> DomainResult<Response> {
        let status = response.status().as_u16();
        if response.status().is_success() {
            return Ok(response);
        }

        let body: ErrorBody = response
            .text()
            .ok()
            .and_then(|text| serde_json::from_str(&text).ok())
            .unwrap_or_default();

        let message = match status {
            401 => "Authentication failed. Your access token may be invalid or expired.".to_string(),
            403 => "Access denied. Please check the permissions of your access token.".to_string(),
            404 => "Resource not found.".to_string(),
            422 => format_validation_error(&body),
            429 => "Rate limit exceeded. Please wait a moment and try again.".to_string(),
            _ => match body.message {
                Some(m) if !m.is_empty() => format!("HTTP {}: {}", status, m),
                _ => format!("HTTP {}", status),
            },
        };

        Err(DomainError::api_status(status, message))
    }
}

fn format_validation_error(body: &ErrorBody) -> String {
    let mut message = body
        .message
        .clone()
        .unwrap_or_else(|| "The given data was invalid.".to_string());
    for (field, problems) in &body.errors {
        message.push_str(&format!(" [{}: {}]", field, problems.join(" ")));
    }
    message
}

impl AccountingApi for FireflyClient {
    fn get_account(&self, id: i64) -> DomainResult<Account> {
        let envelope: Envelope<Resource<AccountAttributes>> =
            self.get_json(&format!("accounts/{}", id))?;
        let resource = envelope.data;
        let attrs = resource.attributes;

        Ok(Account {
            id: resource.id,
            name: attrs.name,
            account_type: attrs.account_type.unwrap_or_else(|| "asset".to_string()),
            currency_id: attrs.currency_id,
            currency_code: attrs.currency_code.map(|c| Account::normalize_currency(&c)),
            iban: attrs.iban.filter(|v| !v.is_empty()),
            account_number: attrs.account_number.filter(|v| !v.is_empty()),
            active: attrs.active.unwrap_or(true),
        })
    }

    fn get_preference(&self, name: &str) -> DomainResult<Preference> {
        let envelope: Envelope<Resource<PreferenceAttributes>> =
            self.get_json(&format!("preferences/{}", name))?;
        let attrs = envelope.data.attributes;

        Ok(Preference {
            name: attrs.name,
            data: attrs.data,
        })
    }

    fn get_currency(&self, code: &str) -> DomainResult<TransactionCurrency> {
        let envelope: Envelope<Resource<CurrencyAttributes>> =
            self.get_json(&format!("currencies/{}", code))?;
        let resource = envelope.data;
        let attrs = resource.attributes;

        Ok(TransactionCurrency {
            id: resource.id,
            name: attrs.name.unwrap_or_else(|| attrs.code.clone()),
            symbol: attrs.symbol.unwrap_or_else(|| attrs.code.clone()),
            code: attrs.code,
            decimal_places: attrs.decimal_places.unwrap_or(2),
            enabled: attrs.enabled.unwrap_or(true),
        })
    }

    fn store_transaction(&self, request: &TransactionGroupRequest) -> DomainResult<StoredTransaction> {
        let url = self.url("transactions");
        tracing::debug!("POST {}", url);

        let response = self
            .authorized(self.client.post(&url))
            .json(request)
            .send()
            .map_err(|e| self.map_request_error(e))?;

        let response = self.check_response_status(response)?;
        let envelope: Envelope<CreatedResource> = response
            .json()
            .map_err(|e| DomainError::api(format!("Failed to parse stored transaction: {}", e)))?;

        Ok(StoredTransaction {
            group_id: envelope.data.id,
        })
    }

    fn about(&self) -> DomainResult<SystemInfo> {
        let envelope: Envelope<AboutData> = self.get_json("about")?;
        Ok(SystemInfo {
            version: envelope.data.version,
            api_version: envelope.data.api_version,
            os: envelope.data.os,
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
