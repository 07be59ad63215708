use std::collections::BTreeMap;
use std::io::Read;

use serde::{Deserialize, Deserializer};
use tax_core::{NewTransaction, RepositoryError, TransactionKind, TransactionRepository};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors that can occur when loading transaction exports.
#[derive(Debug, Error)]
pub enum TransactionLoaderError {
    #[error("CSV parse error: {0}")]
    CsvParse(String),

    #[error("Row {row}: date '{date}' does not start with a four-digit year")]
    InvalidDate { row: usize, date: String },

    #[error("Row {row}: company name is empty")]
    MissingCompany { row: usize },

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<csv::Error> for TransactionLoaderError {
    fn from(err: csv::Error) -> Self {
        TransactionLoaderError::CsvParse(err.to_string())
    }
}

/// One line of a transaction export.
///
/// | column               | notes |
/// |----------------------|-------|
/// | `company`            | company name; created on first load |
/// | `date`               | `YYYY-MM-DD` or a timestamp starting with it |
/// | `kind`               | `revenue`, `material_expense`, `labor_expense`, `contract_labor_expense`, `payroll_tax`, `social_security` |
/// | `source_category`    | `material` or `labor_contractor`, optional |
/// | `parent_id`          | parent expense of a line item, optional |
/// | `amount`             | kept as text, `1,234.50` allowed |
/// | `vat_amount`         | optional |
/// | `withholding_amount` | optional |
/// | `outside_company`    | `true`/`false`/`1`/`0`/`yes`/`no`, blank is false |
/// | `cancelled`          | as above |
///
/// Amounts and dates are stored as written. The engine reports rows it
/// cannot read when it computes a year.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TransactionCsvRecord {
    pub company: String,
    pub date: String,
    pub kind: String,
    #[serde(default)]
    pub source_category: Option<String>,
    #[serde(default)]
    pub parent_id: Option<i64>,
    pub amount: String,
    #[serde(default)]
    pub vat_amount: Option<String>,
    #[serde(default)]
    pub withholding_amount: Option<String>,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub outside_company: bool,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub cancelled: bool,
}

fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    match s.as_deref().map(|s| s.trim().to_ascii_lowercase()).as_deref() {
        None | Some("") | Some("0") | Some("false") | Some("no") => Ok(false),
        Some("1") | Some("true") | Some("yes") => Ok(true),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected a yes/no flag, got '{}'",
            other
        ))),
    }
}

fn blank_to_none(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Year a stored date belongs to, matching how storage scopes snapshots.
fn record_year(
    row: usize,
    date: &str,
) -> Result<i32, TransactionLoaderError> {
    date.trim()
        .get(0..4)
        .filter(|prefix| prefix.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|prefix| prefix.parse().ok())
        .ok_or_else(|| TransactionLoaderError::InvalidDate {
            row,
            date: date.to_string(),
        })
}

/// Totals from one load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub companies_created: usize,
    pub replaced: u64,
    pub inserted: usize,
}

/// Loader for transaction exports in CSV form.
///
/// Writes through [`TransactionRepository`], so any registered backend can
/// be filled.
pub struct TransactionLoader;

impl TransactionLoader {
    /// Parse transaction records from a CSV reader.
    pub fn parse<R: Read>(reader: R) -> Result<Vec<TransactionCsvRecord>, TransactionLoaderError> {
        let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let mut records = Vec::new();

        for result in csv_reader.deserialize() {
            let record: TransactionCsvRecord = result?;
            records.push(record);
        }

        Ok(records)
    }

    /// Load parsed records into the repository.
    ///
    /// Records are grouped by (company, year). For each group the company is
    /// looked up by name and created when missing, then the stored year is
    /// replaced by the group in one repository transaction. Loading the same
    /// export twice leaves the store unchanged.
    ///
    /// Every row is validated before anything is written. A repository
    /// failure stops the load; groups already replaced stay replaced and the
    /// failing group keeps its previous rows.
    pub async fn load<R: TransactionRepository + ?Sized>(
        repo: &R,
        records: &[TransactionCsvRecord],
    ) -> Result<LoadSummary, TransactionLoaderError> {
        let mut groups: BTreeMap<(&str, i32), Vec<&TransactionCsvRecord>> = BTreeMap::new();

        for (index, record) in records.iter().enumerate() {
            // Header is row 1.
            let row = index + 2;
            let company = record.company.trim();
            if company.is_empty() {
                return Err(TransactionLoaderError::MissingCompany { row });
            }
            if TransactionKind::parse(&record.kind).is_none() {
                warn!(row, kind = %record.kind, "unrecognised kind; it will not contribute to any month");
            }
            let year = record_year(row, &record.date)?;
            groups.entry((company, year)).or_default().push(record);
        }

        let mut summary = LoadSummary::default();

        for ((company_name, year), group) in groups {
            let company = match repo.get_company_by_name(company_name).await {
                Ok(company) => company,
                Err(RepositoryError::NotFound) => {
                    summary.companies_created += 1;
                    info!(company = company_name, "creating company");
                    repo.create_company(company_name).await?
                }
                Err(other) => return Err(other.into()),
            };

            let transactions: Vec<NewTransaction> = group
                .iter()
                .map(|record| NewTransaction {
                    company_id: company.id,
                    parent_id: record.parent_id,
                    date: record.date.clone(),
                    kind: record.kind.clone(),
                    source_category: blank_to_none(&record.source_category),
                    amount: record.amount.clone(),
                    vat_amount: blank_to_none(&record.vat_amount),
                    withholding_amount: blank_to_none(&record.withholding_amount),
                    outside_company: record.outside_company,
                    cancelled: record.cancelled,
                })
                .collect();

            let replaced = repo
                .replace_transactions(company.id, year, &transactions)
                .await?;
            summary.replaced += replaced;
            summary.inserted += transactions.len();

            debug!(
                company = company_name,
                year,
                replaced,
                inserted = group.len(),
                "company year loaded"
            );
        }

        Ok(summary)
    }
}
