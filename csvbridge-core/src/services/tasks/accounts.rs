use super::{Task, TaskContext};
use crate::domain::{Account, AccountRef, PseudoTransaction, TransactionType};

/// Puts the default account on the asset side of each split
///
/// The mapper writes the CSV's own account to `source` and the counterparty
/// to `destination`. Deposits flow the other way, so their sides are swapped.
/// When the file names its own account and the counterparty is the default
/// account, the split is a transfer between the two.
pub struct AccountsTask;

impl Task for AccountsTask {
    fn name(&self) -> &'static str {
        "accounts"
    }

    fn requires_default_account(&self) -> bool {
        true
    }

    fn process(&self, mut line: PseudoTransaction, ctx: &TaskContext<'_>) -> PseudoTransaction {
        for split in &mut line.transactions {
            let opposing_is_default = ctx
                .account
                .map(|account| refers_to(&split.destination, account))
                .unwrap_or(false);

            let source_from_file = !split.source.is_empty();
            if !source_from_file {
                if let Some(account) = ctx.account {
                    split.source = AccountRef {
                        id: Some(account.id),
                        name: Some(account.name.clone()),
                        ..AccountRef::default()
                    };
                }
            }

            if split.transaction_type == TransactionType::Deposit {
                std::mem::swap(&mut split.source, &mut split.destination);
            }

            if opposing_is_default
                && source_from_file
                && !refers_to_same(&split.source, &split.destination)
            {
                split.transaction_type = TransactionType::Transfer;
            }
        }
        line
    }
}

fn refers_to(side: &AccountRef, account: &Account) -> bool {
    if let Some(id) = side.id {
        return id == account.id;
    }
    match (side.iban.as_deref(), account.iban.as_deref()) {
        (Some(a), Some(b)) if !a.is_empty() => a.eq_ignore_ascii_case(b),
        _ => false,
    }
}

fn refers_to_same(a: &AccountRef, b: &AccountRef) -> bool {
    matches!((a.id, b.id), (Some(x), Some(y)) if x == y)
}
