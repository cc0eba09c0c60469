use rust_decimal::Decimal;

use super::{Task, TaskContext};
use crate::domain::{PseudoSplit, PseudoTransaction, TransactionType};

/// Resolves the signed amount and the transaction type
///
/// The `amount` column wins. Otherwise debit columns count as money out,
/// credit columns as money in and negated columns are flipped. A zero value
/// only wins when no other column holds a non-zero one.
pub struct AmountTask;

impl Task for AmountTask {
    fn name(&self) -> &'static str {
        "amount"
    }

    fn process(&self, mut line: PseudoTransaction, _ctx: &TaskContext<'_>) -> PseudoTransaction {
        for split in &mut line.transactions {
            split.amount = resolve(split);
            if let Some(amount) = split.amount {
                split.transaction_type = if amount < Decimal::ZERO {
                    TransactionType::Withdrawal
                } else {
                    TransactionType::Deposit
                };
            }
        }
        line
    }
}

fn resolve(split: &PseudoSplit) -> Option<Decimal> {
    let candidates = [
        split.amount,
        split.amount_debit.map(|a| -a.abs()),
        split.amount_credit.map(|a| a.abs()),
        split.amount_negated.map(|a| -a),
    ];

    candidates
        .iter()
        .flatten()
        .find(|a| !a.is_zero())
        .or_else(|| candidates.iter().flatten().next())
        .copied()
}
