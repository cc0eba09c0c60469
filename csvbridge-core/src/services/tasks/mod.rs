//! Row transform tasks
//!
//! Every mapped line runs through the configured tasks in order; the output
//! of one task is the input of the next. Tasks are pure functions of the line
//! and the default context they asked for.

mod accounts;
mod amount;
mod currency;
mod defaults;
mod tags;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::{Account, PseudoTransaction, TransactionCurrency};

pub use accounts::AccountsTask;
pub use amount::AmountTask;
pub use currency::CurrencyTask;
pub use defaults::{EmptyAccountsTask, EmptyDescriptionTask, PositiveAmountTask};
pub use tags::TagsTask;

/// Default context handed to a task
///
/// `account` is only set for tasks that require the default account and
/// `currency` only for tasks that require the transaction currency.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskContext<'a> {
    pub account: Option<&'a Account>,
    pub currency: Option<&'a TransactionCurrency>,
}

/// A transformation applied to each pseudo transaction
pub trait Task: Send + Sync {
    /// Name used in logs and settings
    fn name(&self) -> &'static str;

    fn requires_default_account(&self) -> bool {
        false
    }

    fn requires_transaction_currency(&self) -> bool {
        false
    }

    fn process(&self, line: PseudoTransaction, ctx: &TaskContext<'_>) -> PseudoTransaction;
}

/// Task names as they appear in `transactionTasks`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskKind {
    Amount,
    Tags,
    Currency,
    Accounts,
    EmptyAccounts,
    EmptyDescription,
    PositiveAmount,
}

impl TaskKind {
    /// Order used when settings do not name any tasks
    pub fn default_order() -> Vec<TaskKind> {
        vec![
            TaskKind::Amount,
            TaskKind::Tags,
            TaskKind::Currency,
            TaskKind::Accounts,
            TaskKind::EmptyAccounts,
            TaskKind::EmptyDescription,
            TaskKind::PositiveAmount,
        ]
    }

    pub fn build(self) -> Box<dyn Task> {
        match self {
            TaskKind::Amount => Box::new(AmountTask),
            TaskKind::Tags => Box::new(TagsTask),
            TaskKind::Currency => Box::new(CurrencyTask),
            TaskKind::Accounts => Box::new(AccountsTask),
            TaskKind::EmptyAccounts => Box::new(EmptyAccountsTask),
            TaskKind::EmptyDescription => Box::new(EmptyDescriptionTask),
            TaskKind::PositiveAmount => Box::new(PositiveAmountTask),
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.build().name())
    }
}

/// Instantiate tasks in the given order
pub fn build_tasks(kinds: &[TaskKind]) -> Vec<Box<dyn Task>> {
    kinds.iter().map(|kind| kind.build()).collect()
}
