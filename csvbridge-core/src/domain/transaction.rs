//! Pseudo transaction model
//!
//! A pseudo transaction is a CSV line that has been mapped onto transaction
//! fields but not yet validated by the remote API. Tasks transform it step by
//! step until it can be turned into a [`TransactionGroupRequest`].

use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::result::{Error, Result};

/// Kind of transaction as understood by the accounting API
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    #[default]
    Withdrawal,
    Deposit,
    Transfer,
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransactionType::Withdrawal => "withdrawal",
            TransactionType::Deposit => "deposit",
            TransactionType::Transfer => "transfer",
        };
        f.write_str(s)
    }
}

/// Reference to an account by any of the identifiers the API accepts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRef {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub iban: Option<String>,
    pub number: Option<String>,
}

impl AccountRef {
    /// True when no identifier is present at all
    pub fn is_empty(&self) -> bool {
        self.id.is_none()
            && is_blank(self.name.as_deref())
            && is_blank(self.iban.as_deref())
            && is_blank(self.number.as_deref())
    }

    pub fn by_id(id: i64) -> Self {
        Self {
            id: Some(id),
            ..Self::default()
        }
    }
}

/// One split of a pseudo transaction
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PseudoSplit {
    pub transaction_type: TransactionType,
    pub date: Option<NaiveDate>,
    pub amount: Option<Decimal>,
    pub amount_debit: Option<Decimal>,
    pub amount_credit: Option<Decimal>,
    pub amount_negated: Option<Decimal>,
    pub foreign_amount: Option<Decimal>,
    pub foreign_currency_code: Option<String>,
    pub currency_id: Option<i64>,
    pub currency_code: Option<String>,
    pub description: Option<String>,
    /// Asset side as read from the CSV; swapped with `destination` for deposits
    pub source: AccountRef,
    pub destination: AccountRef,
    pub tags: Vec<String>,
    pub notes: Option<String>,
    pub category_name: Option<String>,
    pub budget_name: Option<String>,
    pub external_id: Option<String>,
    pub internal_reference: Option<String>,
}

/// A converted CSV line
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PseudoTransaction {
    pub group_title: Option<String>,
    pub transactions: Vec<PseudoSplit>,
}

impl PseudoTransaction {
    /// Wrap a single split
    pub fn single(split: PseudoSplit) -> Self {
        Self {
            group_title: None,
            transactions: vec![split],
        }
    }

    /// Build the API request for this line
    ///
    /// Every split needs a date and an amount by now; tasks are expected to
    /// have resolved everything else.
    pub fn to_request(
        &self,
        error_if_duplicate_hash: bool,
        apply_rules: bool,
    ) -> Result<TransactionGroupRequest> {
        if self.transactions.is_empty() {
            return Err(Error::validation("line produced no transactions"));
        }

        let transactions = self
            .transactions
            .iter()
            .enumerate()
            .map(|(index, split)| split.to_request(index))
            .collect::<Result<Vec<_>>>()?;

        Ok(TransactionGroupRequest {
            error_if_duplicate_hash,
            apply_rules,
            group_title: self.group_title.clone(),
            transactions,
        })
    }
}

impl PseudoSplit {
    fn to_request(&self, index: usize) -> Result<TransactionSplitRequest> {
        let date = self
            .date
            .ok_or_else(|| Error::validation(format!("split {} has no date", index)))?;
        let amount = self
            .amount
            .ok_or_else(|| Error::validation(format!("split {} has no amount", index)))?;

        Ok(TransactionSplitRequest {
            transaction_type: self.transaction_type,
            date: date.format("%Y-%m-%d").to_string(),
            amount: amount.normalize().to_string(),
            description: self.description.clone().unwrap_or_default(),
            source_id: self.source.id,
            source_name: self.source.name.clone(),
            source_iban: self.source.iban.clone(),
            source_number: self.source.number.clone(),
            destination_id: self.destination.id,
            destination_name: self.destination.name.clone(),
            destination_iban: self.destination.iban.clone(),
            destination_number: self.destination.number.clone(),
            currency_id: self.currency_id,
            currency_code: self.currency_code.clone(),
            foreign_amount: self.foreign_amount.map(|a| a.normalize().to_string()),
            foreign_currency_code: self.foreign_currency_code.clone(),
            tags: self.tags.clone(),
            notes: self.notes.clone(),
            category_name: self.category_name.clone(),
            budget_name: self.budget_name.clone(),
            external_id: self.external_id.clone(),
            internal_reference: self.internal_reference.clone(),
        })
    }
}

/// Body of `POST /api/v1/transactions`
#[derive(Debug, Clone, Serialize)]
pub struct TransactionGroupRequest {
    pub error_if_duplicate_hash: bool,
    pub apply_rules: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_title: Option<String>,
    pub transactions: Vec<TransactionSplitRequest>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransactionSplitRequest {
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    pub date: String,
    pub amount: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_iban: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_iban: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub foreign_amount: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub foreign_currency_code: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub internal_reference: Option<String>,
}

/// A transaction group the API accepted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredTransaction {
    pub group_id: i64,
}

fn is_blank(value: Option<&str>) -> bool {
    value.map(|v| v.trim().is_empty()).unwrap_or(true)
}
