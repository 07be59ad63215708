//! Monthly aggregation.
//!
//! Folds classified contributions into twelve [`MonthlyBucket`]s, index 0
//! being January, then runs the derived-field passes in a fixed order:
//!
//! 1. every additive field is summed from the contributions;
//! 2. `contract_labor_withholding` is set from the settled
//!    `contract_labor_cost` of the same month;
//! 3. `vat_to_pay` is set from the previous month (see [`super::vat`]).
//!
//! The passes overwrite rather than accumulate, so re-running them on the
//! same buckets gives the same result.
//!
//! A record whose amounts would push a total past [`accumulation_limit`] is
//! left out whole and reported as skipped.

use rust_decimal::Decimal;
use tracing::warn;

use crate::calculations::classifier::{ClassificationError, Contribution, SkippedRecord};
use crate::calculations::vat::apply_vat_lag;
use crate::models::{MONTHS_PER_YEAR, MonthlyBucket, TaxRates};

/// Twelve buckets for one company and year.
pub type MonthlyBuckets = [MonthlyBucket; MONTHS_PER_YEAR];

/// Twelve zeroed buckets, months 0 to 11.
pub fn empty_buckets() -> MonthlyBuckets {
    std::array::from_fn(|month| MonthlyBucket::empty(month as u8))
}

/// Largest magnitude a monthly or yearly field total may reach.
///
/// With every total inside this bound, the VAT lag difference, the yearly
/// sums and the net-profit difference all stay inside `Decimal`'s range.
pub fn accumulation_limit() -> Decimal {
    Decimal::MAX / Decimal::from(16)
}

/// Aggregated buckets plus the records whose amounts could not be added.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aggregation {
    pub buckets: MonthlyBuckets,
    /// None of these records' amounts are in `buckets`.
    pub skipped: Vec<SkippedRecord>,
}

#[derive(Debug, Clone)]
pub struct MonthlyAggregator {
    rates: TaxRates,
}

impl MonthlyAggregator {
    pub fn new(rates: TaxRates) -> Self {
        Self { rates }
    }

    /// Aggregates a complete snapshot's contributions.
    ///
    /// The contributions must cover the whole year: the VAT lag pass reads
    /// every month's final totals, so partial batches give wrong figures.
    /// A record's contributions must be adjacent, as
    /// [`TransactionClassifier::classify_all`] emits them; each record is
    /// added whole or not at all.
    ///
    /// [`TransactionClassifier::classify_all`]: crate::calculations::TransactionClassifier::classify_all
    pub fn aggregate(
        &self,
        contributions: &[Contribution],
    ) -> Aggregation {
        let limit = accumulation_limit();
        let mut buckets = empty_buckets();
        let mut year_totals = MonthlyBucket::empty(0);
        let mut skipped = Vec::new();

        for record in contributions.chunk_by(|a, b| a.record_id == b.record_id) {
            let record_id = record[0].record_id;
            if let Err(error) = accumulate(&mut buckets, &mut year_totals, record, limit) {
                warn!(record_id, %error, "record skipped");
                skipped.push(SkippedRecord { record_id, error });
            }
        }

        self.apply_contract_labor_withholding(&mut buckets);
        apply_vat_lag(&mut buckets);

        Aggregation { buckets, skipped }
    }

    /// Sets each month's contract-labor withholding from its contract-labor
    /// cost. Must run after all costs are summed.
    pub fn apply_contract_labor_withholding(
        &self,
        buckets: &mut MonthlyBuckets,
    ) {
        for bucket in buckets.iter_mut() {
            bucket.contract_labor_withholding =
                bucket.contract_labor_cost * self.rates.contract_labor_withholding_rate;
        }
    }
}

/// Adds one record's contributions, committing only if every month and
/// year total stays within `limit`.
fn accumulate(
    buckets: &mut MonthlyBuckets,
    year_totals: &mut MonthlyBucket,
    record: &[Contribution],
    limit: Decimal,
) -> Result<(), ClassificationError> {
    let mut staged = buckets.clone();
    let mut staged_totals = year_totals.clone();
    let within = |total: Option<Decimal>| total.is_some_and(|t| t.abs() <= limit);

    for contribution in record {
        let Some(bucket) = staged.get_mut(usize::from(contribution.month)) else {
            warn!(
                month = contribution.month,
                field = contribution.field.as_str(),
                "contribution month out of range; ignored"
            );
            continue;
        };
        let month_ok = within(bucket.checked_add(contribution.field, contribution.amount));
        let year_ok = within(staged_totals.checked_add(contribution.field, contribution.amount));
        if !(month_ok && year_ok) {
            return Err(ClassificationError::AmountOutOfRange {
                field: contribution.field.as_str(),
                amount: contribution.amount,
            });
        }
    }

    *buckets = staged;
    *year_totals = staged_totals;
    Ok(())
}

impl Default for MonthlyAggregator {
    fn default() -> Self {
        Self::new(TaxRates::default())
    }
}
