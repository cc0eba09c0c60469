//! Pseudo transaction processor
//!
//! Loads the default context from the accounting API once, then pushes every
//! line through the configured tasks.

use crate::domain::currency::CURRENCY_PREFERENCE;
use crate::domain::result::{Error, Result};
use crate::domain::{Account, PseudoTransaction, TransactionCurrency};
use crate::ports::AccountingApi;
use crate::services::tasks::{build_tasks, Task, TaskContext, TaskKind};

/// Runs the configured tasks over converted lines
pub struct PseudoTransactionProcessor {
    tasks: Vec<Box<dyn Task>>,
    default_account: Option<Account>,
    default_currency: TransactionCurrency,
}

impl PseudoTransactionProcessor {
    /// Fetch the default account and currency, then instantiate the tasks
    ///
    /// The three requests run one after the other and the first failure
    /// aborts with an importer error. The account is only requested when an
    /// ID is configured.
    pub fn new(
        api: &dyn AccountingApi,
        task_kinds: &[TaskKind],
        default_account_id: Option<i64>,
    ) -> Result<Self> {
        let default_account = match default_account_id {
            Some(id) => Some(api.get_account(id).map_err(|e| {
                tracing::error!("could not load default account {}: {}", id, e);
                Error::importer(format!(
                    "The default account in your configuration file ({}) does not exist.",
                    id
                ))
            })?),
            None => None,
        };

        let preference = api.get_preference(CURRENCY_PREFERENCE).map_err(|e| {
            tracing::error!("could not load currency preference: {}", e);
            Error::importer("Could not load the users currency preference.")
        })?;

        let code = preference.currency_code();
        let default_currency = api.get_currency(&code).map_err(|e| {
            tracing::error!("could not load currency {}: {}", code, e);
            Error::importer(format!(
                "The default currency (\"{}\") could not be loaded.",
                code
            ))
        })?;

        let tasks = build_tasks(task_kinds);
        if default_account.is_none() {
            for task in tasks.iter().filter(|t| t.requires_default_account()) {
                tracing::warn!(
                    "task '{}' needs a default account but none is configured",
                    task.name()
                );
            }
        }

        Ok(Self {
            tasks,
            default_account,
            default_currency,
        })
    }

    pub fn default_account(&self) -> Option<&Account> {
        self.default_account.as_ref()
    }

    pub fn default_currency(&self) -> &TransactionCurrency {
        &self.default_currency
    }

    /// Names of the tasks in execution order
    pub fn task_names(&self) -> Vec<&'static str> {
        self.tasks.iter().map(|t| t.name()).collect()
    }

    /// Process all lines, keeping their order
    pub fn process_pseudo(&self, lines: Vec<PseudoTransaction>) -> Vec<PseudoTransaction> {
        let count = lines.len();
        tracing::info!("Converting {} lines into transactions", count);

        let processed = lines
            .into_iter()
            .enumerate()
            .map(|(i, line)| {
                tracing::info!("Now processing line {}/{}", i + 1, count);
                self.process_pseudo_line(line)
            })
            .collect();

        tracing::info!("Done converting {} lines", count);
        processed
    }

    /// Run every task over one line
    pub fn process_pseudo_line(&self, line: PseudoTransaction) -> PseudoTransaction {
        self.tasks.iter().fold(line, |line, task| {
            let ctx = TaskContext {
                account: self
                    .default_account
                    .as_ref()
                    .filter(|_| task.requires_default_account()),
                currency: Some(&self.default_currency)
                    .filter(|_| task.requires_transaction_currency()),
            };
            tracing::debug!("running task {}", task.name());
            task.process(line, &ctx)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use rust_decimal::Decimal;
    use serde_json::json;

    use crate::domain::{
        AccountRef, Preference, PseudoSplit, StoredTransaction, TransactionGroupRequest,
        TransactionType,
    };
    use crate::ports::SystemInfo;

    /// In-memory API recording which calls were made
    #[derive(Default)]
    struct FakeApi {
        accounts: Vec<Account>,
        preference: Option<serde_json::Value>,
        currencies: Vec<TransactionCurrency>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeApi {
        fn standard() -> Self {
            Self {
                accounts: vec![Account::new(1, "Checking")],
                preference: Some(json!("EUR")),
                currencies: vec![TransactionCurrency::new(12, "EUR")],
                ..Self::default()
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl AccountingApi for FakeApi {
        fn get_account(&self, id: i64) -> Result<Account> {
            self.calls.lock().unwrap().push(format!("account:{}", id));
            self.accounts
                .iter()
                .find(|a| a.id == id)
                .cloned()
                .ok_or_else(|| Error::api_status(404, "Resource not found"))
        }

        fn get_preference(&self, name: &str) -> Result<Preference> {
            self.calls.lock().unwrap().push(format!("preference:{}", name));
            self.preference
                .clone()
                .map(|data| Preference {
                    name: name.to_string(),
                    data,
                })
                .ok_or_else(|| Error::api("connection refused"))
        }

        fn get_currency(&self, code: &str) -> Result<TransactionCurrency> {
            self.calls.lock().unwrap().push(format!("currency:{}", code));
            self.currencies
                .iter()
                .find(|c| c.code == code)
                .cloned()
                .ok_or_else(|| Error::api_status(404, "Resource not found"))
        }

        fn store_transaction(&self, _request: &TransactionGroupRequest) -> Result<StoredTransaction> {
            Err(Error::api("not used"))
        }

        fn about(&self) -> Result<SystemInfo> {
            Ok(SystemInfo::default())
        }
    }

    fn line(amount: &str) -> PseudoTransaction {
        PseudoTransaction::single(PseudoSplit {
            amount: Some(amount.parse().unwrap()),
            destination: AccountRef {
                name: Some("Shop".to_string()),
                ..AccountRef::default()
            },
            ..PseudoSplit::default()
        })
    }

    #[test]
    fn test_loads_context_in_order() {
        let api = FakeApi::standard();
        let processor =
            PseudoTransactionProcessor::new(&api, &TaskKind::default_order(), Some(1)).unwrap();

        assert_eq!(
            api.calls(),
            vec!["account:1", "preference:currencyPreference", "currency:EUR"]
        );
        assert_eq!(processor.default_account().map(|a| a.id), Some(1));
        assert_eq!(processor.default_currency().id, 12);
    }

    #[test]
    fn test_no_account_request_without_id() {
        let api = FakeApi::standard();
        PseudoTransactionProcessor::new(&api, &TaskKind::default_order(), None).unwrap();
        assert_eq!(api.calls(), vec!["preference:currencyPreference", "currency:EUR"]);
    }

    #[test]
    fn test_missing_account_error() {
        let api = FakeApi::standard();
        let err = PseudoTransactionProcessor::new(&api, &[], Some(99))
            .err()
            .unwrap();
        assert!(matches!(err, Error::Importer(_)));
        assert_eq!(
            err.to_string(),
            "The default account in your configuration file (99) does not exist."
        );
        // Aborts before any other request
        assert_eq!(api.calls(), vec!["account:99"]);
    }

    #[test]
    fn test_missing_preference_error() {
        let api = FakeApi {
            preference: None,
            ..FakeApi::standard()
        };
        let err = PseudoTransactionProcessor::new(&api, &[], Some(1))
            .err()
            .unwrap();
        assert_eq!(err.to_string(), "Could not load the users currency preference.");
        assert_eq!(api.calls().len(), 2);
    }

    #[test]
    fn test_missing_currency_error() {
        let api = FakeApi {
            preference: Some(json!("JPY")),
            ..FakeApi::standard()
        };
        let err = PseudoTransactionProcessor::new(&api, &[], None)
            .err()
            .unwrap();
        assert_eq!(
            err.to_string(),
            "The default currency (\"JPY\") could not be loaded."
        );
    }

    #[test]
    fn test_empty_preference_falls_back_to_eur() {
        let api = FakeApi {
            preference: Some(serde_json::Value::Null),
            ..FakeApi::standard()
        };
        let processor = PseudoTransactionProcessor::new(&api, &[], None).unwrap();
        assert_eq!(processor.default_currency().code, "EUR");
    }

    #[test]
    fn test_process_pseudo_keeps_order_and_count() {
        let api = FakeApi::standard();
        let processor =
            PseudoTransactionProcessor::new(&api, &TaskKind::default_order(), Some(1)).unwrap();

        let out = processor.process_pseudo(vec![line("-5"), line("10"), line("-1.5")]);
        assert_eq!(out.len(), 3);

        let first = &out[0].transactions[0];
        assert_eq!(first.transaction_type, TransactionType::Withdrawal);
        assert_eq!(first.amount, Some(Decimal::new(5, 0)));
        assert_eq!(first.source.id, Some(1));
        assert_eq!(first.currency_id, Some(12));
        assert_eq!(first.description.as_deref(), Some("(no description)"));

        let second = &out[1].transactions[0];
        assert_eq!(second.transaction_type, TransactionType::Deposit);
        assert_eq!(second.source.name.as_deref(), Some("Shop"));
        assert_eq!(second.destination.id, Some(1));

        assert_eq!(out[2].transactions[0].amount, Some(Decimal::new(15, 1)));
    }

    #[test]
    fn test_context_only_for_tasks_that_need_it() {
        let api = FakeApi::standard();
        // Without the accounts task the default account is never applied
        let processor = PseudoTransactionProcessor::new(
            &api,
            &[TaskKind::Amount, TaskKind::Currency],
            Some(1),
        )
        .unwrap();
        let out = processor.process_pseudo_line(line("-3"));
        assert!(out.transactions[0].source.is_empty());
        assert_eq!(out.transactions[0].currency_code.as_deref(), Some("EUR"));
        assert_eq!(processor.task_names(), vec!["amount", "currency"]);
    }

    #[test]
    fn test_empty_task_list_is_identity() {
        let api = FakeApi::standard();
        let processor = PseudoTransactionProcessor::new(&api, &[], None).unwrap();
        let input = line("-3");
        assert_eq!(processor.process_pseudo_line(input.clone()), input);
    }
}
