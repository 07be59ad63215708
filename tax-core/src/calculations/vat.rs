//! VAT payable with a one-month remittance lag.
//!
//! VAT collected and paid in month `m - 1` is settled in month `m`:
//!
//! ```text
//! vat_to_pay[0] = 0
//! vat_to_pay[m] = expense_vat[m - 1] - income_vat[m - 1]
//! ```
//!
//! A negative figure is an input-VAT credit and is kept as-is. No credit is
//! carried into later months.

use rust_decimal::Decimal;
use tracing::debug;

use crate::calculations::aggregator::MonthlyBuckets;

/// VAT payable in `month` given the settled buckets. `month` is zero-based;
/// anything past December yields `None`.
pub fn vat_payable(
    buckets: &MonthlyBuckets,
    month: usize,
) -> Option<Decimal> {
    match month {
        0 => Some(Decimal::ZERO),
        m if m < buckets.len() => {
            let previous = &buckets[m - 1];
            Some(previous.expense_vat - previous.income_vat)
        }
        _ => None,
    }
}

/// Writes `vat_to_pay` into every bucket. Needs every month's VAT totals to
/// be final.
pub fn apply_vat_lag(buckets: &mut MonthlyBuckets) {
    let payable: Vec<Decimal> = (0..buckets.len())
        .map(|m| vat_payable(buckets, m).unwrap_or(Decimal::ZERO))
        .collect();

    for (bucket, vat_to_pay) in buckets.iter_mut().zip(payable) {
        if vat_to_pay < Decimal::ZERO {
            debug!(
                month = bucket.month,
                vat_to_pay = %vat_to_pay,
                "input VAT exceeds output VAT; negative VAT payable kept"
            );
        }
        bucket.vat_to_pay = vat_to_pay;
    }
}
