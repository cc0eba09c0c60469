//! Mock Firefly III API server for testing
//!
//! Serves the handful of endpoints the importer uses:
//! - GET /api/v1/about
//! - GET /api/v1/accounts/{id}
//! - GET /api/v1/preferences/{name}
//! - GET /api/v1/currencies/{code}
//! - POST /api/v1/transactions (bodies are recorded for inspection)

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use serde_json::{json, Value as JsonValue};

/// Configuration for mock data
#[derive(Debug, Clone)]
pub struct MockConfig {
    /// Existing asset account IDs
    pub account_ids: Vec<i64>,
    /// Value of the currencyPreference `data` attribute
    pub currency_preference: JsonValue,
    /// Currency codes the server knows
    pub currencies: Vec<String>,
    /// Answer every request with 401
    pub fail_auth: bool,
    /// Answer the preference endpoint with 500
    pub fail_preference: bool,
    /// Reject stored transactions whose description contains this text (422)
    pub reject_description: Option<String>,
    /// Answer every authenticated request with this status (e.g. 403, 429)
    pub force_status: Option<u16>,
    /// Wait this long before answering
    pub response_delay: Option<Duration>,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            account_ids: vec![1],
            currency_preference: json!("EUR"),
            currencies: vec!["EUR".to_string(), "USD".to_string()],
            fail_auth: false,
            fail_preference: false,
            reject_description: None,
            force_status: None,
            response_delay: None,
        }
    }
}

struct ServerState {
    config: MockConfig,
    stored: Mutex<Vec<JsonValue>>,
    next_group_id: AtomicI64,
}

/// Mock Firefly server for testing
pub struct MockFireflyServer {
    port: u16,
    running: Arc<AtomicBool>,
    state: Arc<ServerState>,
    thread_handle: Option<thread::JoinHandle<()>>,
}

impl MockFireflyServer {
    /// Start a new mock server on a random available port
    pub fn start(config: MockConfig) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let port = listener.local_addr()?.port();
        let running = Arc::new(AtomicBool::new(true));
        let state = Arc::new(ServerState {
            config,
            stored: Mutex::new(Vec::new()),
            next_group_id: AtomicI64::new(100),
        });

        // Non-blocking so the accept loop can observe shutdown
        listener.set_nonblocking(true)?;

        let running_clone = running.clone();
        let state_clone = state.clone();
        let thread_handle = thread::spawn(move || {
            while running_clone.load(Ordering::SeqCst) {
                match listener.accept() {
                    Ok((stream, _)) => {
                        let state = state_clone.clone();
                        thread::spawn(move || handle_connection(stream, &state));
                    }
                    Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                        thread::sleep(std::time::Duration::from_millis(10));
                    }
                    Err(_) => break,
                }
            }
        });

        Ok(Self {
            port,
            running,
            state,
            thread_handle: Some(thread_handle),
        })
    }

    /// Get the base URL for this mock server
    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    /// Bodies of every accepted POST /transactions
    pub fn stored_transactions(&self) -> Vec<JsonValue> {
        self.state.stored.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for MockFireflyServer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Read headers, then as much body as Content-Length announces
fn read_request(stream: &mut TcpStream) -> Option<(String, String)> {
    stream.set_nonblocking(false).ok()?;
    let mut data = Vec::new();
    let mut buffer = [0u8; 4096];

    let header_end = loop {
        let n = stream.read(&mut buffer).ok()?;
        if n == 0 {
            return None;
        }
        data.extend_from_slice(&buffer[..n]);
        if let Some(pos) = data.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&data[..header_end]).to_string();
    let content_length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while data.len() < header_end + content_length {
        let n = stream.read(&mut buffer).ok()?;
        if n == 0 {
            break;
        }
        data.extend_from_slice(&buffer[..n]);
    }

    let body = String::from_utf8_lossy(&data[header_end..]).to_string();
    Some((head, body))
}

fn handle_connection(mut stream: TcpStream, state: &ServerState) {
    let Some((head, body)) = read_request(&mut stream) else {
        return;
    };
    let config = &state.config;

    if let Some(delay) = config.response_delay {
        thread::sleep(delay);
    }

    let first_line = head.lines().next().unwrap_or("");
    let parts: Vec<&str> = first_line.split_whitespace().collect();
    if parts.len() < 2 {
        send_response(&mut stream, 400, "Bad Request", r#"{"message":"Invalid request"}"#);
        return;
    }
    let method = parts[0];
    let path = parts[1].split('?').next().unwrap_or(parts[1]);

    let has_valid_auth = head.to_lowercase().contains("authorization: bearer test_");
    if config.fail_auth || !has_valid_auth {
        send_response(&mut stream, 401, "Unauthorized", r#"{"message":"Unauthenticated."}"#);
        return;
    }

    if let Some(status) = config.force_status {
        let text = match status {
            403 => "Forbidden",
            429 => "Too Many Requests",
            _ => "Error",
        };
        send_response(&mut stream, status, text, r#"{"message":"forced"}"#);
        return;
    }

    let segments: Vec<&str> = path
        .trim_start_matches("/api/v1/")
        .split('/')
        .filter(|s| !s.is_empty())
        .collect();

    match (method, segments.as_slice()) {
        ("GET", ["about"]) => {
            let body = json!({
                "data": { "version": "6.1.0", "api_version": "2.1.0", "os": "Linux" }
            });
            send_json(&mut stream, 200, "OK", &body);
        }
        ("GET", ["accounts", id]) => match id.parse::<i64>() {
            Ok(id) if config.account_ids.contains(&id) => {
                let body = json!({
                    "data": {
                        "type": "accounts",
                        "id": id.to_string(),
                        "attributes": {
                            "name": format!("Checking {}", id),
                            "type": "asset",
                            "currency_id": "1",
                            "currency_code": "EUR",
                            "iban": "NL00BANK0123456789",
                            "active": true
                        }
                    }
                });
                send_json(&mut stream, 200, "OK", &body);
            }
            _ => send_response(&mut stream, 404, "Not Found", r#"{"message":"Resource not found"}"#),
        },
        ("GET", ["preferences", name]) => {
            if config.fail_preference {
                send_response(&mut stream, 500, "Internal Server Error", r#"{"message":"boom"}"#);
                return;
            }
            let body = json!({
                "data": {
                    "type": "preferences",
                    "id": "1",
                    "attributes": { "name": name, "data": config.currency_preference }
                }
            });
            send_json(&mut stream, 200, "OK", &body);
        }
        ("GET", ["currencies", code]) => {
            match config.currencies.iter().position(|c| c.eq_ignore_ascii_case(code)) {
                Some(index) => {
                    let code = &config.currencies[index];
                    let body = json!({
                        "data": {
                            "type": "currencies",
                            "id": (index + 1).to_string(),
                            "attributes": {
                                "code": code,
                                "name": format!("Currency {}", code),
                                "symbol": "¤",
                                "decimal_places": 2,
                                "enabled": true
                            }
                        }
                    });
                    send_json(&mut stream, 200, "OK", &body);
                }
                None => send_response(&mut stream, 404, "Not Found", r#"{"message":"Resource not found"}"#),
            }
        }
        ("POST", ["transactions"]) => {
            let Ok(payload) = serde_json::from_str::<JsonValue>(&body) else {
                send_response(&mut stream, 400, "Bad Request", r#"{"message":"Invalid JSON"}"#);
                return;
            };

            if let Some(reject) = &config.reject_description {
                let rejected = payload["transactions"]
                    .as_array()
                    .map(|splits| {
                        splits.iter().any(|s| {
                            s["description"]
                                .as_str()
                                .map(|d| d.contains(reject.as_str()))
                                .unwrap_or(false)
                        })
                    })
                    .unwrap_or(false);
                if rejected {
                    let body = json!({
                        "message": "The given data was invalid.",
                        "errors": { "transactions.0.description": ["Duplicate of transaction #1."] }
                    });
                    send_json(&mut stream, 422, "Unprocessable Entity", &body);
                    return;
                }
            }

            let id = state.next_group_id.fetch_add(1, Ordering::SeqCst);
            if let Ok(mut stored) = state.stored.lock() {
                stored.push(payload);
            }
            let body = json!({
                "data": { "type": "transactions", "id": id.to_string(), "attributes": {} }
            });
            send_json(&mut stream, 200, "OK", &body);
        }
        ("GET", _) | ("POST", _) => {
            send_response(&mut stream, 404, "Not Found", r#"{"message":"Endpoint not found"}"#)
        }
        _ => send_response(&mut stream, 405, "Method Not Allowed", r#"{"message":"Method not allowed"}"#),
    }
}

fn send_json(stream: &mut TcpStream, status: u16, status_text: &str, body: &JsonValue) {
    send_response(stream, status, status_text, &body.to_string());
}

fn send_response(stream: &mut TcpStream, status: u16, status_text: &str, body: &str) {
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        status_text,
        body.len(),
        body
    );
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    use super::*;
    use crate::adapters::firefly::FireflyClient;
    use crate::config::ConnectionSettings;
    use crate::domain::{AccountRef, PseudoSplit, PseudoTransaction};
    use crate::ports::AccountingApi;

    fn client_for(server: &MockFireflyServer, token: &str) -> FireflyClient {
        FireflyClient::new(&ConnectionSettings {
            url: server.base_url(),
            access_token: token.to_string(),
            timeout: 5.0,
            ..ConnectionSettings::default()
        })
        .unwrap()
    }

    fn request(description: &str) -> crate::domain::TransactionGroupRequest {
        PseudoTransaction::single(PseudoSplit {
            date: NaiveDate::from_ymd_opt(2024, 1, 2),
            amount: Some(Decimal::new(995, 2)),
            description: Some(description.to_string()),
            source: AccountRef::by_id(1),
            destination: AccountRef {
                name: Some("Shop".to_string()),
                ..AccountRef::default()
            },
            ..PseudoSplit::default()
        })
        .to_request(false, true)
        .unwrap()
    }

    #[test]
    fn test_about() {
        let server = MockFireflyServer::start(MockConfig::default()).unwrap();
        let info = client_for(&server, "test_token").about().unwrap();
        assert_eq!(info.version, "6.1.0");
        assert_eq!(info.api_version, "2.1.0");
    }

    #[test]
    fn test_get_account() {
        let server = MockFireflyServer::start(MockConfig {
            account_ids: vec![1, 42],
            ..Default::default()
        })
        .unwrap();
        let account = client_for(&server, "test_token").get_account(42).unwrap();
        assert_eq!(account.id, 42);
        assert_eq!(account.name, "Checking 42");
        assert_eq!(account.currency_id, Some(1));
        assert!(account.is_asset());
    }

    #[test]
    fn test_get_missing_account_is_404() {
        let server = MockFireflyServer::start(MockConfig::default()).unwrap();
        let err = client_for(&server, "test_token").get_account(99).unwrap_err();
        assert_eq!(err.status(), Some(404));
    }

    #[test]
    fn test_preference_and_currency() {
        let server = MockFireflyServer::start(MockConfig {
            currency_preference: json!("USD"),
            ..Default::default()
        })
        .unwrap();
        let client = client_for(&server, "test_token");

        let pref = client.get_preference("currencyPreference").unwrap();
        assert_eq!(pref.currency_code(), "USD");

        let currency = client.get_currency(&pref.currency_code()).unwrap();
        assert_eq!(currency.code, "USD");
        assert_eq!(currency.id, 2);
    }

    #[test]
    fn test_auth_failure() {
        let server = MockFireflyServer::start(MockConfig::default()).unwrap();
        let err = client_for(&server, "wrong_token").about().unwrap_err();
        assert_eq!(err.status(), Some(401));
        assert!(err.to_string().contains("Authentication failed"));
    }

    #[test]
    fn test_forbidden() {
        let server = MockFireflyServer::start(MockConfig {
            force_status: Some(403),
            ..Default::default()
        })
        .unwrap();
        let err = client_for(&server, "test_token").about().unwrap_err();
        assert_eq!(err.status(), Some(403));
        assert!(err.to_string().contains("Access denied"));
    }

    #[test]
    fn test_rate_limited() {
        let server = MockFireflyServer::start(MockConfig {
            force_status: Some(429),
            ..Default::default()
        })
        .unwrap();
        let err = client_for(&server, "test_token").get_account(1).unwrap_err();
        assert_eq!(err.status(), Some(429));
        assert!(err.to_string().contains("Rate limit exceeded"));
    }

    #[test]
    fn test_timeout() {
        let server = MockFireflyServer::start(MockConfig {
            response_delay: Some(Duration::from_secs(2)),
            ..Default::default()
        })
        .unwrap();
        let client = FireflyClient::new(&ConnectionSettings {
            url: server.base_url(),
            access_token: "test_token".to_string(),
            timeout: 0.25,
            ..ConnectionSettings::default()
        })
        .unwrap();

        let err = client.about().unwrap_err();
        assert_eq!(err.status(), None);
        assert!(err.to_string().contains("Connection timed out after 0.25 seconds"));
    }

    #[test]
    fn test_connection_refused() {
        // Grab a free port, then release it so nothing is listening
        let port = TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let url = format!("http://127.0.0.1:{}", port);
        let client = FireflyClient::new(&ConnectionSettings {
            url: url.clone(),
            access_token: "test_token".to_string(),
            timeout: 5.0,
            ..ConnectionSettings::default()
        })
        .unwrap();

        let err = client.about().unwrap_err();
        assert!(err.to_string().contains(&format!("Unable to connect to {}", url)));
    }

    #[test]
    fn test_store_transaction() {
        let server = MockFireflyServer::start(MockConfig::default()).unwrap();
        let stored = client_for(&server, "test_token")
            .store_transaction(&request("Groceries"))
            .unwrap();
        assert_eq!(stored.group_id, 100);

        let bodies = server.stored_transactions();
        assert_eq!(bodies.len(), 1);
        assert_eq!(bodies[0]["transactions"][0]["description"], "Groceries");
        assert_eq!(bodies[0]["transactions"][0]["amount"], "9.95");
    }

    #[test]
    fn test_store_transaction_validation_error() {
        let server = MockFireflyServer::start(MockConfig {
            reject_description: Some("DUPLICATE".to_string()),
            ..Default::default()
        })
        .unwrap();
        let err = client_for(&server, "test_token")
            .store_transaction(&request("DUPLICATE payment"))
            .unwrap_err();
        assert_eq!(err.status(), Some(422));
        assert!(err.to_string().contains("Duplicate of transaction"));
        assert!(server.stored_transactions().is_empty());
    }

    #[test]
    fn test_processor_over_http() {
        use crate::services::{PseudoTransactionProcessor, TaskKind};

        let server = MockFireflyServer::start(MockConfig {
            currency_preference: json!("usd"),
            ..Default::default()
        })
        .unwrap();
        let client = client_for(&server, "test_token");
        let processor =
            PseudoTransactionProcessor::new(&client, &TaskKind::default_order(), Some(1)).unwrap();
        assert_eq!(processor.default_currency().code, "USD");
        assert_eq!(processor.default_account().map(|a| a.id), Some(1));
    }

    #[test]
    fn test_processor_reports_preference_failure() {
        use crate::services::PseudoTransactionProcessor;

        let server = MockFireflyServer::start(MockConfig {
            fail_preference: true,
            ..Default::default()
        })
        .unwrap();
        let client = client_for(&server, "test_token");
        let err = PseudoTransactionProcessor::new(&client, &[], Some(1))
            .err()
            .unwrap();
        assert_eq!(err.to_string(), "Could not load the users currency preference.");
    }
}
