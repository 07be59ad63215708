//! Withholding by source.
//!
//! Combines the three withholding figures the aggregator already produced:
//! revenue-side, direct labor, and contract labor (a fixed share of the
//! month's contract-labor cost). Only revenue-side withholding is credited
//! against corporate tax; see [`super::annual`].

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{AnnualSummary, MonthlyBucket};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithholdingBreakdown {
    pub revenue: Decimal,
    pub direct_labor: Decimal,
    pub contract_labor: Decimal,
    pub total: Decimal,
}

impl WithholdingBreakdown {
    pub fn new(
        revenue: Decimal,
        direct_labor: Decimal,
        contract_labor: Decimal,
    ) -> Self {
        Self {
            revenue,
            direct_labor,
            contract_labor,
            total: revenue + direct_labor + contract_labor,
        }
    }

    pub fn for_month(bucket: &MonthlyBucket) -> Self {
        Self::new(
            bucket.income_withholding,
            bucket.labor_withholding,
            bucket.contract_labor_withholding,
        )
    }

    pub fn for_year(summary: &AnnualSummary) -> Self {
        Self::new(
            summary.income_withholding,
            summary.labor_withholding,
            summary.contract_labor_withholding,
        )
    }
}
