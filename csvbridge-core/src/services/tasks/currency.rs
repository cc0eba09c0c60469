use super::{Task, TaskContext};
use crate::domain::PseudoTransaction;

/// Applies the default currency
///
/// Lines that name no currency at all get the default one. A foreign amount
/// in the line's own currency is not foreign and is dropped.
pub struct CurrencyTask;

impl Task for CurrencyTask {
    fn name(&self) -> &'static str {
        "currency"
    }

    fn requires_transaction_currency(&self) -> bool {
        true
    }

    fn process(&self, mut line: PseudoTransaction, ctx: &TaskContext<'_>) -> PseudoTransaction {
        let Some(currency) = ctx.currency else {
            return line;
        };

        for split in &mut line.transactions {
            if split.currency_id.is_none() && split.currency_code.is_none() {
                split.currency_id = Some(currency.id);
                split.currency_code = Some(currency.code.clone());
            }

            let native = split.currency_code.as_deref().unwrap_or(currency.code.as_str());
            if split.foreign_currency_code.as_deref() == Some(native) {
                split.foreign_amount = None;
                split.foreign_currency_code = None;
            }
        }
        line
    }
}
