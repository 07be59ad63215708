//! What-if tax planning.
//!
//! Layers hypothetical VAT and withholding on top of the real figures and
//! reports the resulting liability. Nothing here writes back into the
//! buckets or the summary; each projection is a fresh value.
//!
//! - **Month scope**: projected VAT payable, projected total withholding,
//!   and social security (passed through unchanged) for one month.
//! - **Year scope**: corporate tax after crediting accumulated revenue-side
//!   withholding plus the hypothetical extra, and the saving compared with
//!   the real annual tax payable. The saving stops growing once the
//!   adjusted tax reaches zero.
//!
//! Negative hypotheticals are accepted and model a reduction. Text that is
//! not a number is rejected rather than read as zero.
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use tax_core::calculations::{AnnualTaxCalculator, PlanningProjector, empty_buckets};
//!
//! let mut buckets = empty_buckets();
//! buckets[0].income = dec!(100000);
//! let summary = AnnualTaxCalculator::default().calculate(&buckets);
//!
//! let projection = PlanningProjector::new(&buckets, &summary)
//!     .project_year(dec!(5000))
//!     .unwrap();
//!
//! assert_eq!(projection.annual_tax_payable, dec!(20000));
//! assert_eq!(projection.adjusted_annual_tax, dec!(15000));
//! assert_eq!(projection.tax_saving, dec!(5000));
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::calculations::aggregator::MonthlyBuckets;
use crate::calculations::common::{ParseDecimalError, floor_at_zero, parse_optional_decimal};
use crate::calculations::withholding::WithholdingBreakdown;
use crate::models::{AnnualSummary, MONTHS_PER_YEAR};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlanningError {
    #[error("invalid {field}: {source}")]
    InvalidDecimal {
        field: &'static str,
        #[source]
        source: ParseDecimalError,
    },

    #[error("month index must be between 0 and 11, got {0}")]
    InvalidMonth(usize),

    #[error("{0} is too large to project")]
    Overflow(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanningScope {
    /// Zero-based month.
    Month(u8),
    Year,
}

/// A single what-if request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanningAdjustment {
    pub scope: PlanningScope,
    pub additional_vat: Decimal,
    pub additional_withholding: Decimal,
}

impl PlanningAdjustment {
    /// Builds an adjustment from user-entered text.
    ///
    /// A blank field means no adjustment. Anything else must be a number.
    ///
    /// ```
    /// use rust_decimal_macros::dec;
    /// use tax_core::calculations::{PlanningAdjustment, PlanningError, PlanningScope};
    ///
    /// let adjustment = PlanningAdjustment::parse(PlanningScope::Month(2), "1,500", "").unwrap();
    /// assert_eq!(adjustment.additional_vat, dec!(1500));
    /// assert_eq!(adjustment.additional_withholding, dec!(0));
    ///
    /// let err = PlanningAdjustment::parse(PlanningScope::Year, "", "12O0").unwrap_err();
    /// assert!(matches!(err, PlanningError::InvalidDecimal { field: "additional_withholding", .. }));
    /// ```
    pub fn parse(
        scope: PlanningScope,
        additional_vat: &str,
        additional_withholding: &str,
    ) -> Result<Self, PlanningError> {
        let additional_vat = parse_optional_decimal(Some(additional_vat)).map_err(|source| {
            PlanningError::InvalidDecimal {
                field: "additional_vat",
                source,
            }
        })?;
        let additional_withholding = parse_optional_decimal(Some(additional_withholding))
            .map_err(|source| PlanningError::InvalidDecimal {
                field: "additional_withholding",
                source,
            })?;

        Ok(Self {
            scope,
            additional_vat,
            additional_withholding,
        })
    }
}

/// Display-only figures for one month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyProjection {
    pub month: u8,
    pub vat_to_pay: Decimal,
    pub projected_vat: Decimal,
    pub withholding: WithholdingBreakdown,
    pub projected_withholding: Decimal,
    pub projected_social_security: Decimal,
}

/// Display-only figures for the year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnualProjection {
    pub corporate_tax: Decimal,
    pub accumulated_withholding: Decimal,
    pub additional_withholding: Decimal,
    pub adjusted_withholding: Decimal,
    pub annual_tax_payable: Decimal,
    pub adjusted_annual_tax: Decimal,
    /// `annual_tax_payable - adjusted_annual_tax`.
    pub tax_saving: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Projection {
    Month(MonthlyProjection),
    Year(AnnualProjection),
}

/// Projects adjustments over already computed buckets and summary.
#[derive(Debug, Clone, Copy)]
pub struct PlanningProjector<'a> {
    buckets: &'a MonthlyBuckets,
    summary: &'a AnnualSummary,
}

impl<'a> PlanningProjector<'a> {
    pub fn new(
        buckets: &'a MonthlyBuckets,
        summary: &'a AnnualSummary,
    ) -> Self {
        Self { buckets, summary }
    }

    /// Dispatches on [`PlanningAdjustment::scope`]. Year scope uses only the
    /// withholding figure.
    pub fn project(
        &self,
        adjustment: &PlanningAdjustment,
    ) -> Result<Projection, PlanningError> {
        match adjustment.scope {
            PlanningScope::Month(month) => self
                .project_month(usize::from(month), adjustment)
                .map(Projection::Month),
            PlanningScope::Year => {
                if !adjustment.additional_vat.is_zero() {
                    debug!(
                        additional_vat = %adjustment.additional_vat,
                        "additional VAT has no effect on the annual projection"
                    );
                }
                self.project_year(adjustment.additional_withholding)
                    .map(Projection::Year)
            }
        }
    }

    pub fn project_month(
        &self,
        month: usize,
        adjustment: &PlanningAdjustment,
    ) -> Result<MonthlyProjection, PlanningError> {
        if month >= MONTHS_PER_YEAR {
            return Err(PlanningError::InvalidMonth(month));
        }
        let bucket = &self.buckets[month];
        let withholding = WithholdingBreakdown::for_month(bucket);

        let projected_vat = bucket
            .vat_to_pay
            .checked_add(adjustment.additional_vat)
            .ok_or(PlanningError::Overflow("projected_vat"))?;
        let projected_withholding = withholding
            .total
            .checked_add(adjustment.additional_withholding)
            .ok_or(PlanningError::Overflow("projected_withholding"))?;

        Ok(MonthlyProjection {
            month: bucket.month,
            vat_to_pay: bucket.vat_to_pay,
            projected_vat,
            withholding,
            projected_withholding,
            projected_social_security: bucket.social_security,
        })
    }

    pub fn project_year(
        &self,
        additional_withholding: Decimal,
    ) -> Result<AnnualProjection, PlanningError> {
        let adjusted_withholding = self
            .summary
            .accumulated_withholding
            .checked_add(additional_withholding)
            .ok_or(PlanningError::Overflow("adjusted_withholding"))?;
        let adjusted_annual_tax = self
            .summary
            .corporate_tax
            .checked_sub(adjusted_withholding)
            .map(floor_at_zero)
            .ok_or(PlanningError::Overflow("adjusted_annual_tax"))?;
        let tax_saving = self
            .summary
            .annual_tax_payable
            .checked_sub(adjusted_annual_tax)
            .ok_or(PlanningError::Overflow("tax_saving"))?;

        Ok(AnnualProjection {
            corporate_tax: self.summary.corporate_tax,
            accumulated_withholding: self.summary.accumulated_withholding,
            additional_withholding,
            adjusted_withholding,
            annual_tax_payable: self.summary.annual_tax_payable,
            adjusted_annual_tax,
            tax_saving,
        })
    }
}
