mod annual_summary;
mod company;
mod monthly_bucket;
mod tax_rates;
mod transaction;

pub use annual_summary::AnnualSummary;
pub use company::Company;
pub use monthly_bucket::{BucketField, MONTHS_PER_YEAR, MonthlyBucket};
pub use tax_rates::{TaxRates, TaxRatesError};
pub use transaction::{NewTransaction, SourceCategory, TransactionKind, TransactionRecord};
