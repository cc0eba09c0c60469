//! Small cleanup tasks that run at the end of the chain

use super::{Task, TaskContext};
use crate::domain::{AccountRef, PseudoTransaction};

const NO_NAME: &str = "(no name)";
const NO_DESCRIPTION: &str = "(no description)";

/// Names account sides that carry no identifier at all
pub struct EmptyAccountsTask;

impl Task for EmptyAccountsTask {
    fn name(&self) -> &'static str {
        "empty-accounts"
    }

    fn process(&self, mut line: PseudoTransaction, _ctx: &TaskContext<'_>) -> PseudoTransaction {
        for split in &mut line.transactions {
            fill_name(&mut split.source);
            fill_name(&mut split.destination);
        }
        line
    }
}

fn fill_name(side: &mut AccountRef) {
    if side.is_empty() {
        side.name = Some(NO_NAME.to_string());
    }
}

/// Gives every split a description
pub struct EmptyDescriptionTask;

impl Task for EmptyDescriptionTask {
    fn name(&self) -> &'static str {
        "empty-description"
    }

    fn process(&self, mut line: PseudoTransaction, _ctx: &TaskContext<'_>) -> PseudoTransaction {
        for split in &mut line.transactions {
            let blank = split
                .description
                .as_deref()
                .map(|d| d.trim().is_empty())
                .unwrap_or(true);
            if blank {
                split.description = Some(NO_DESCRIPTION.to_string());
            }
        }
        line
    }
}

/// Makes amounts positive; the direction is carried by the type and accounts
pub struct PositiveAmountTask;

impl Task for PositiveAmountTask {
    fn name(&self) -> &'static str {
        "positive-amount"
    }

    fn process(&self, mut line: PseudoTransaction, _ctx: &TaskContext<'_>) -> PseudoTransaction {
        for split in &mut line.transactions {
            split.amount = split.amount.map(|a| a.abs());
            split.foreign_amount = split.foreign_amount.map(|a| a.abs());
        }
        line
    }
}
