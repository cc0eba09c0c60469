//! Configuration management
//!
//! Settings live in `settings.json` inside the csvbridge directory:
//! ```json
//! {
//!   "connection": { "url": "https://firefly.example", "accessToken": "...", "verify": true, "timeout": 30.0 },
//!   "transactionTasks": ["amount", "tags", "currency", "accounts", ...],
//!   "profiles": { "bank": { "defaultAccount": 1, "roles": ["date", "description", "amount"] } }
//! }
//! ```
//!
//! Connection settings can be overridden from the environment, which is how
//! the access token is usually provided.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::domain::result::{Error as DomainError, Result as DomainResult};
use crate::services::mapper::ColumnRole;
use crate::services::tasks::TaskKind;

pub const URL_ENV: &str = "FIREFLY_III_URL";
pub const ACCESS_TOKEN_ENV: &str = "FIREFLY_III_ACCESS_TOKEN";
pub const VERIFY_TLS_ENV: &str = "CSVBRIDGE_VERIFY_TLS";
pub const TIMEOUT_ENV: &str = "CSVBRIDGE_TIMEOUT";

const DEFAULT_TIMEOUT_SECS: f64 = 30.0;

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    connection: ConnectionSettings,
    #[serde(default)]
    transaction_tasks: Option<Vec<TaskKind>>,
    #[serde(default)]
    profiles: BTreeMap<String, ImportProfile>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

/// How to reach the accounting API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionSettings {
    #[serde(default)]
    pub url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub access_token: String,
    /// Verify TLS certificates
    #[serde(default = "default_true")]
    pub verify: bool,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: f64,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            url: String::new(),
            access_token: String::new(),
            verify: true,
            timeout: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl ConnectionSettings {
    /// Check that the settings can be used to build a client
    pub fn validate(&self) -> DomainResult<()> {
        if self.url.trim().is_empty() {
            return Err(DomainError::Config(format!(
                "no API URL configured (set connection.url or {})",
                URL_ENV
            )));
        }
        let parsed = Url::parse(self.url.trim())
            .map_err(|e| DomainError::Config(format!("invalid API URL '{}': {}", self.url, e)))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(DomainError::Config(format!(
                "API URL must use http or https, got '{}'",
                parsed.scheme()
            )));
        }
        if self.access_token.trim().is_empty() {
            return Err(DomainError::Config(format!(
                "no access token configured (set {})",
                ACCESS_TOKEN_ENV
            )));
        }
        if !(self.timeout.is_finite() && self.timeout > 0.0) {
            return Err(DomainError::Config(format!(
                "timeout must be a positive number of seconds, got {}",
                self.timeout
            )));
        }
        Ok(())
    }

    pub fn timeout_duration(&self) -> Duration {
        Duration::from_secs_f64(self.timeout)
    }
}

/// csvbridge configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub connection: ConnectionSettings,
    /// Tasks applied to every line, in order
    pub transaction_tasks: Vec<TaskKind>,
    pub profiles: BTreeMap<String, ImportProfile>,
    // Keep the raw settings for preservation when saving
    _raw_settings: SettingsFile,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            connection: ConnectionSettings::default(),
            transaction_tasks: TaskKind::default_order(),
            profiles: BTreeMap::new(),
            _raw_settings: SettingsFile::default(),
        }
    }
}

impl Config {
    /// Load config from the csvbridge directory and apply env overrides
    pub fn load(dir: &Path) -> Result<Self> {
        let settings_path = dir.join("settings.json");

        let raw: SettingsFile = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)?;
            match serde_json::from_str(&content) {
                Ok(raw) => raw,
                Err(e) => {
                    tracing::warn!("ignoring unreadable {}: {}", settings_path.display(), e);
                    SettingsFile::default()
                }
            }
        } else {
            SettingsFile::default()
        };

        let mut connection = raw.connection.clone();
        apply_env_overrides(&mut connection, |key| std::env::var(key).ok());

        Ok(Self {
            connection,
            transaction_tasks: raw
                .transaction_tasks
                .clone()
                .unwrap_or_else(TaskKind::default_order),
            profiles: raw.profiles.clone(),
            _raw_settings: raw,
        })
    }

    /// Save config to the csvbridge directory
    ///
    /// Only the profiles and the task list are written back. The access
    /// token is never persisted from the environment.
    pub fn save(&self, dir: &Path) -> Result<()> {
        let settings_path = dir.join("settings.json");

        let mut settings = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)?;
            serde_json::from_str::<SettingsFile>(&content).unwrap_or_default()
        } else {
            self._raw_settings.clone()
        };

        settings.transaction_tasks = Some(self.transaction_tasks.clone());
        settings.profiles = self.profiles.clone();

        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(&settings_path, content)?;
        Ok(())
    }

    /// Get a profile by name
    pub fn profile(&self, name: &str) -> Option<&ImportProfile> {
        self.profiles.get(name)
    }
}

fn apply_env_overrides(
    connection: &mut ConnectionSettings,
    get: impl Fn(&str) -> Option<String>,
) {
    if let Some(url) = get(URL_ENV).filter(|v| !v.trim().is_empty()) {
        connection.url = url;
    }
    if let Some(token) = get(ACCESS_TOKEN_ENV).filter(|v| !v.trim().is_empty()) {
        connection.access_token = token;
    }
    match get(VERIFY_TLS_ENV).as_deref() {
        Some("true" | "1" | "yes" | "TRUE" | "YES") => connection.verify = true,
        Some("false" | "0" | "no" | "FALSE" | "NO") => connection.verify = false,
        _ => {}
    }
    if let Some(timeout) = get(TIMEOUT_ENV).and_then(|v| v.trim().parse::<f64>().ok()) {
        connection.timeout = timeout;
    }
}

/// Column delimiter of the CSV file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Delimiter {
    #[default]
    Comma,
    Semicolon,
    Tab,
}

impl Delimiter {
    pub fn as_byte(self) -> u8 {
        match self {
            Delimiter::Comma => b',',
            Delimiter::Semicolon => b';',
            Delimiter::Tab => b'\t',
        }
    }
}

/// Decimal separator used in amount columns
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecimalSeparator {
    /// 1,234.56
    #[default]
    Dot,
    /// 1.234,56
    Comma,
}

/// Import profile: how to read one bank's CSV export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportProfile {
    /// Asset account used when a line names none
    #[serde(default)]
    pub default_account: Option<i64>,
    #[serde(default)]
    pub delimiter: Delimiter,
    #[serde(default = "default_true")]
    pub has_headers: bool,
    #[serde(default)]
    pub date_format: Option<String>,
    #[serde(default)]
    pub decimal_separator: DecimalSeparator,
    /// Role of each column, by position
    #[serde(default)]
    pub roles: Vec<ColumnRole>,
    /// Skip lines that an earlier run already submitted
    #[serde(default = "default_true")]
    pub ignore_duplicate_lines: bool,
    /// Ask the API to reject transactions it already knows
    #[serde(default)]
    pub error_if_duplicate_hash: bool,
    /// Let the API run its rules on new transactions
    #[serde(default = "default_true")]
    pub apply_rules: bool,
    /// Convert non UTF-8 files instead of rejecting them
    #[serde(default)]
    pub convert_encoding: bool,
}

impl Default for ImportProfile {
    fn default() -> Self {
        Self {
            default_account: None,
            delimiter: Delimiter::Comma,
            has_headers: true,
            date_format: None,
            decimal_separator: DecimalSeparator::Dot,
            roles: Vec::new(),
            ignore_duplicate_lines: true,
            error_if_duplicate_hash: false,
            apply_rules: true,
            convert_encoding: false,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_timeout() -> f64 {
    DEFAULT_TIMEOUT_SECS
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn valid_connection() -> ConnectionSettings {
        ConnectionSettings {
            url: "https://firefly.example.com".to_string(),
            access_token: "token".to_string(),
            ..ConnectionSettings::default()
        }
    }

    #[test]
    fn test_defaults_without_settings_file() {
        let dir = tempdir().unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.transaction_tasks, TaskKind::default_order());
        assert!(config.profiles.is_empty());
        assert!(config.connection.verify);
    }

    #[test]
    fn test_load_profiles_and_tasks() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("settings.json"),
            r#"{
                "connection": { "url": "https://ff.local", "verify": false, "timeout": 5 },
                "transactionTasks": ["amount", "positive-amount"],
                "profiles": {
                    "bank": {
                        "defaultAccount": 7,
                        "delimiter": "semicolon",
                        "decimalSeparator": "comma",
                        "roles": ["date", "description", "amount"]
                    }
                },
                "somethingElse": 1
            }"#,
        )
        .unwrap();

        let config = Config::load(dir.path()).unwrap();
        assert!(!config.connection.verify);
        assert_eq!(config.connection.timeout, 5.0);
        assert_eq!(
            config.transaction_tasks,
            vec![TaskKind::Amount, TaskKind::PositiveAmount]
        );

        let profile = config.profile("bank").unwrap();
        assert_eq!(profile.default_account, Some(7));
        assert_eq!(profile.delimiter, Delimiter::Semicolon);
        assert_eq!(profile.decimal_separator, DecimalSeparator::Comma);
        assert_eq!(profile.roles.len(), 3);
        assert!(profile.has_headers);
        assert!(profile.ignore_duplicate_lines);
    }

    #[test]
    fn test_save_preserves_unknown_keys() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("settings.json"),
            r#"{ "somethingElse": { "keep": true } }"#,
        )
        .unwrap();

        let mut config = Config::load(dir.path()).unwrap();
        config
            .profiles
            .insert("new".to_string(), ImportProfile::default());
        config.save(dir.path()).unwrap();

        let content = std::fs::read_to_string(dir.path().join("settings.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value["somethingElse"]["keep"], true);
        assert!(value["profiles"]["new"].is_object());
    }

    #[test]
    fn test_env_overrides() {
        let mut connection = ConnectionSettings::default();
        apply_env_overrides(&mut connection, |key| match key {
            URL_ENV => Some("https://env.example".to_string()),
            ACCESS_TOKEN_ENV => Some("secret".to_string()),
            VERIFY_TLS_ENV => Some("no".to_string()),
            TIMEOUT_ENV => Some("12.5".to_string()),
            _ => None,
        });
        assert_eq!(connection.url, "https://env.example");
        assert_eq!(connection.access_token, "secret");
        assert!(!connection.verify);
        assert_eq!(connection.timeout, 12.5);
    }

    #[test]
    fn test_connection_validation() {
        assert!(valid_connection().validate().is_ok());

        let mut missing_url = valid_connection();
        missing_url.url = String::new();
        assert!(missing_url.validate().is_err());

        let mut bad_scheme = valid_connection();
        bad_scheme.url = "ftp://firefly.example.com".to_string();
        assert!(bad_scheme.validate().is_err());

        let mut no_token = valid_connection();
        no_token.access_token = " ".to_string();
        let err = no_token.validate().unwrap_err();
        assert!(err.to_string().contains(ACCESS_TOKEN_ENV));

        let mut zero_timeout = valid_connection();
        zero_timeout.timeout = 0.0;
        assert!(zero_timeout.validate().is_err());
    }

    #[test]
    fn test_delimiter_bytes() {
        assert_eq!(Delimiter::Comma.as_byte(), b',');
        assert_eq!(Delimiter::Semicolon.as_byte(), b';');
        assert_eq!(Delimiter::Tab.as_byte(), b'\t');
    }
}
