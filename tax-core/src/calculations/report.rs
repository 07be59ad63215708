//! Entry points for a company/year computation.
//!
//! Every input is an explicit parameter; there is no ambient selection
//! state. Each call starts from the snapshot it is given, so concurrent
//! calls for different companies or years share nothing.

use serde::Serialize;
use tracing::info;

use crate::calculations::aggregator::{MonthlyAggregator, MonthlyBuckets};
use crate::calculations::annual::AnnualTaxCalculator;
use crate::calculations::classifier::{SkippedRecord, TransactionClassifier};
use crate::models::{AnnualSummary, TaxRates, TransactionRecord};

/// Twelve months of figures plus the records that could not be read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlyReport {
    pub company_id: i64,
    pub year: i32,
    pub buckets: MonthlyBuckets,
    pub skipped: Vec<SkippedRecord>,
    /// Records left out on purpose: other years, unknown kinds, payroll tax.
    pub dropped: usize,
}

/// Classifies and aggregates one company/year snapshot.
///
/// `records` must be the complete snapshot for the year; the caller is
/// responsible for having scoped it to `company_id`.
pub fn compute_monthly(
    records: &[TransactionRecord],
    year: i32,
    company_id: i64,
    rates: &TaxRates,
) -> MonthlyReport {
    let classification = TransactionClassifier::new(year).classify_all(records);
    let aggregation =
        MonthlyAggregator::new(rates.clone()).aggregate(&classification.contributions);
    let mut skipped = classification.skipped;
    skipped.extend(aggregation.skipped);

    info!(
        company_id,
        year,
        records = records.len(),
        skipped = skipped.len(),
        dropped = classification.dropped,
        "monthly figures computed"
    );

    MonthlyReport {
        company_id,
        year,
        buckets: aggregation.buckets,
        skipped,
        dropped: classification.dropped,
    }
}

/// Reduces twelve buckets to the annual summary.
pub fn compute_annual(
    buckets: &MonthlyBuckets,
    rates: &TaxRates,
) -> AnnualSummary {
    AnnualTaxCalculator::new(rates.clone()).calculate(buckets)
}
