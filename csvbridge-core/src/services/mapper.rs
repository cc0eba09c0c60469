//! Row mapper - turns CSV records into pseudo transactions
//!
//! Every column has a [`ColumnRole`]. The mapper only copies values into the
//! matching fields; interpreting them (signs, default account, currency) is
//! the job of the tasks that run afterwards.

use chrono::NaiveDate;
use csv::StringRecord;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::{DecimalSeparator, ImportProfile};
use crate::domain::result::{Error, Result};
use crate::domain::{Account, PseudoSplit, PseudoTransaction};
use crate::services::reader::CsvReader;

/// What a CSV column contains
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ColumnRole {
    #[default]
    #[serde(alias = "_ignore")]
    Ignore,
    Date,
    Description,
    Amount,
    AmountDebit,
    AmountCredit,
    AmountNegated,
    AccountId,
    AccountName,
    AccountIban,
    AccountNumber,
    OpposingId,
    OpposingName,
    OpposingIban,
    OpposingNumber,
    CurrencyCode,
    ForeignAmount,
    ForeignCurrencyCode,
    TagsComma,
    TagsSpace,
    Note,
    CategoryName,
    BudgetName,
    ExternalId,
    InternalReference,
}

impl ColumnRole {
    fn is_amount(self) -> bool {
        matches!(
            self,
            ColumnRole::Amount
                | ColumnRole::AmountDebit
                | ColumnRole::AmountCredit
                | ColumnRole::AmountNegated
        )
    }
}

/// One mapped CSV line
#[derive(Debug, Clone)]
pub struct MappedLine {
    /// Position among the data lines, starting at 0
    pub index: usize,
    /// Line of the file the record starts on, counting the header
    pub line: u64,
    /// Hash of the raw fields, used to recognise lines seen before
    pub fingerprint: String,
    pub transaction: PseudoTransaction,
    /// Values that could not be interpreted
    pub warnings: Vec<String>,
}

/// Maps records according to a profile's column roles
#[derive(Debug, Clone)]
pub struct RoleMapper {
    roles: Vec<ColumnRole>,
    date_format: Option<String>,
    decimal_separator: DecimalSeparator,
}

impl RoleMapper {
    pub fn new(profile: &ImportProfile) -> Result<Self> {
        if profile.roles.iter().all(|r| *r == ColumnRole::Ignore) {
            return Err(Error::Config("the import profile has no column roles".to_string()));
        }
        if !profile.roles.iter().any(|r| r.is_amount()) {
            return Err(Error::Config(
                "the import profile needs at least one amount column".to_string(),
            ));
        }

        Ok(Self {
            roles: profile.roles.clone(),
            date_format: profile.date_format.clone(),
            decimal_separator: profile.decimal_separator,
        })
    }

    /// Map every record of a reader
    ///
    /// Completely empty records are skipped; they do not consume an index.
    pub fn map_reader(&self, reader: &mut CsvReader) -> Result<Vec<MappedLine>> {
        let mut lines = Vec::new();
        for record in reader.records() {
            let record = record?;
            if record.iter().all(|field| field.is_empty()) {
                continue;
            }
            let (transaction, warnings) = self.map_record(&record);
            lines.push(MappedLine {
                index: lines.len(),
                line: record.position().map(|p| p.line()).unwrap_or(0),
                fingerprint: fingerprint(&record),
                transaction,
                warnings,
            });
        }
        Ok(lines)
    }

    /// Map a single record
    pub fn map_record(&self, record: &StringRecord) -> (PseudoTransaction, Vec<String>) {
        let mut split = PseudoSplit::default();
        let mut warnings = Vec::new();
        let mut descriptions: Vec<&str> = Vec::new();
        let mut notes: Vec<&str> = Vec::new();

        for (column, value) in record.iter().enumerate() {
            let role = self.roles.get(column).copied().unwrap_or_default();
            if role == ColumnRole::Ignore || value.is_empty() {
                continue;
            }

            match role {
                ColumnRole::Ignore => {}
                ColumnRole::Date => match parse_date(value, self.date_format.as_deref()) {
                    Some(date) => split.date = Some(date),
                    None => warnings.push(format!("Could not parse date '{}'", value)),
                },
                ColumnRole::Description => descriptions.push(value),
                ColumnRole::Note => notes.push(value),
                ColumnRole::Amount
                | ColumnRole::AmountDebit
                | ColumnRole::AmountCredit
                | ColumnRole::AmountNegated
                | ColumnRole::ForeignAmount => {
                    let Some(amount) = parse_amount(value, self.decimal_separator) else {
                        warnings.push(format!("Could not parse amount '{}'", value));
                        continue;
                    };
                    let slot = match role {
                        ColumnRole::Amount => &mut split.amount,
                        ColumnRole::AmountDebit => &mut split.amount_debit,
                        ColumnRole::AmountCredit => &mut split.amount_credit,
                        ColumnRole::AmountNegated => &mut split.amount_negated,
                        _ => &mut split.foreign_amount,
                    };
                    *slot = Some(amount);
                }
                ColumnRole::AccountId | ColumnRole::OpposingId => match value.parse::<i64>() {
                    Ok(id) if role == ColumnRole::AccountId => split.source.id = Some(id),
                    Ok(id) => split.destination.id = Some(id),
                    Err(_) => warnings.push(format!("Could not parse account id '{}'", value)),
                },
                ColumnRole::AccountName => split.source.name = Some(value.to_string()),
                ColumnRole::AccountIban => split.source.iban = Some(normalize_iban(value)),
                ColumnRole::AccountNumber => split.source.number = Some(value.to_string()),
                ColumnRole::OpposingName => split.destination.name = Some(value.to_string()),
                ColumnRole::OpposingIban => split.destination.iban = Some(normalize_iban(value)),
                ColumnRole::OpposingNumber => split.destination.number = Some(value.to_string()),
                ColumnRole::CurrencyCode => {
                    split.currency_code = Some(Account::normalize_currency(value))
                }
                ColumnRole::ForeignCurrencyCode => {
                    split.foreign_currency_code = Some(Account::normalize_currency(value))
                }
                ColumnRole::TagsComma => split
                    .tags
                    .extend(value.split(',').map(|t| t.to_string())),
                ColumnRole::TagsSpace => split
                    .tags
                    .extend(value.split_whitespace().map(|t| t.to_string())),
                ColumnRole::CategoryName => split.category_name = Some(value.to_string()),
                ColumnRole::BudgetName => split.budget_name = Some(value.to_string()),
                ColumnRole::ExternalId => split.external_id = Some(value.to_string()),
                ColumnRole::InternalReference => {
                    split.internal_reference = Some(value.to_string())
                }
            }
        }

        if !descriptions.is_empty() {
            split.description = Some(descriptions.join(" "));
        }
        if !notes.is_empty() {
            split.notes = Some(notes.join(" "));
        }

        (PseudoTransaction::single(split), warnings)
    }
}

/// Fingerprint of a raw record
///
/// Each field is prefixed with its length so field boundaries are part of
/// the hash.
pub fn fingerprint(record: &StringRecord) -> String {
    let mut hasher = Sha256::new();
    for field in record.iter() {
        hasher.update((field.len() as u64).to_le_bytes());
        hasher.update(field.as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// Parse a date with the profile format, falling back to common formats
pub fn parse_date(s: &str, format: Option<&str>) -> Option<NaiveDate> {
    let s = s.trim();
    if let Some(fmt) = format {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Some(date);
        }
    }

    let formats = [
        "%Y-%m-%d",
        "%Y%m%d",
        "%d-%m-%Y",
        "%d.%m.%Y",
        "%m/%d/%Y",
        "%d/%m/%Y",
        "%Y/%m/%d",
    ];

    formats
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .or_else(|| {
            // ISO timestamps: keep the date part
            s.get(..10)
                .filter(|_| s.len() > 10)
                .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
        })
}

/// Parse an amount as written in bank exports
///
/// Handles `(12.00)` and trailing-minus `12.00-` negatives, currency symbols,
/// and thousands separators according to `separator`.
pub fn parse_amount(s: &str, separator: DecimalSeparator) -> Option<Decimal> {
    let s = s.trim();

    let (negative, s) = if s.starts_with('(') && s.ends_with(')') && s.len() >= 2 {
        (true, &s[1..s.len() - 1])
    } else if s.len() > 1 && s.ends_with('-') {
        (true, &s[..s.len() - 1])
    } else {
        (false, s)
    };

    let cleaned: String = s
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-'))
        .collect();

    let normalized = match separator {
        DecimalSeparator::Dot => cleaned.replace(',', ""),
        DecimalSeparator::Comma => cleaned.replace('.', "").replace(',', "."),
    };

    let mut amount: Decimal = normalized.parse().ok()?;
    if negative && amount > Decimal::ZERO {
        amount = -amount;
    }
    Some(amount)
}

fn normalize_iban(value: &str) -> String {
    value
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase()
}

/// Suggest column roles from header names
///
/// The first column matching a pattern gets the role; columns matching
/// nothing are ignored.
pub fn detect_roles(headers: &[String]) -> Vec<ColumnRole> {
    let rules: [(ColumnRole, &str); 12] = [
        (ColumnRole::Date, r"^(booking |transaction |trans |txn |value |posted? )?date$|^posted$|^dt$"),
        (ColumnRole::AmountDebit, r"^(debit|dr|withdrawal|debit amount|money out)$"),
        (ColumnRole::AmountCredit, r"^(credit|cr|deposit|credit amount|money in)$"),
        (ColumnRole::Amount, r"amount|^amt$|^total$|^value$"),
        (ColumnRole::Description, r"description|^desc$|memo|details|narration|purpose"),
        (ColumnRole::OpposingIban, r"^(counterparty|opposing|beneficiary) ?iban$"),
        (ColumnRole::OpposingName, r"payee|merchant|counterparty|beneficiary|^name$"),
        (ColumnRole::AccountIban, r"^(account )?iban$"),
        (ColumnRole::CurrencyCode, r"^currency( code)?$"),
        (ColumnRole::CategoryName, r"^category$"),
        (ColumnRole::TagsComma, r"^tags?$"),
        (ColumnRole::ExternalId, r"^(transaction id|reference|ref)$"),
    ];

    let compiled: Vec<(ColumnRole, Regex)> = rules
        .iter()
        .filter_map(|(role, pattern)| Regex::new(pattern).ok().map(|re| (*role, re)))
        .collect();

    let mut roles = vec![ColumnRole::Ignore; headers.len()];
    let mut taken: Vec<ColumnRole> = Vec::new();

    for (column, header) in headers.iter().enumerate() {
        let header = header.trim().to_lowercase();
        for (role, re) in &compiled {
            if taken.contains(role) || !re.is_match(&header) {
                continue;
            }
            // A single amount column wins over debit/credit pairs
            if role.is_amount() && taken.contains(&ColumnRole::Amount) {
                break;
            }
            roles[column] = *role;
            taken.push(*role);
            break;
        }
    }

    roles
}
