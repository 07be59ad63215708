//! Annual corporate-tax calculation.
//!
//! Reduces the twelve monthly buckets of a company/year to an
//! [`AnnualSummary`].
//!
//! # Steps
//!
//! | Step | Description |
//! |------|-------------|
//! | 1    | Sum every additive bucket field across the year |
//! | 2    | Labor cost net of withholding: labor cost − labor withholding |
//! | 3    | Net profit: income − material − step 2 − contract labor − salary − social security |
//! | 4    | Corporate tax: step 3 × 20% when positive, otherwise 0 |
//! | 5    | Accumulated withholding: yearly revenue-side withholding |
//! | 6    | Annual tax payable: step 4 − step 5, minimum 0 |
//!
//! Labor-side withholding is not credited in step 5. That asymmetry is the
//! business rule as it stands and is kept.
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use tax_core::TaxRates;
//! use tax_core::calculations::{AnnualTaxCalculator, empty_buckets};
//!
//! let mut buckets = empty_buckets();
//! buckets[0].income = dec!(1000000);
//! buckets[0].income_withholding = dec!(10000);
//! buckets[3].material_cost = dec!(300000);
//! buckets[5].labor_cost = dec!(200000);
//! buckets[5].labor_withholding = dec!(20000);
//! buckets[8].contract_labor_cost = dec!(100000);
//! buckets[11].social_security = dec!(15000);
//!
//! let summary = AnnualTaxCalculator::new(TaxRates::default()).calculate(&buckets);
//!
//! assert_eq!(summary.net_profit, dec!(405000));
//! assert_eq!(summary.corporate_tax, dec!(81000));
//! assert_eq!(summary.annual_tax_payable, dec!(71000));
//! ```

use rust_decimal::Decimal;
use tracing::debug;

use crate::calculations::aggregator::MonthlyBuckets;
use crate::calculations::common::floor_at_zero;
use crate::models::{AnnualSummary, MonthlyBucket, TaxRates};

#[derive(Debug, Clone)]
pub struct AnnualTaxCalculator {
    rates: TaxRates,
}

impl AnnualTaxCalculator {
    pub fn new(rates: TaxRates) -> Self {
        Self { rates }
    }

    /// Calculates the annual summary. Pure; safe to call on every refresh.
    pub fn calculate(
        &self,
        buckets: &MonthlyBuckets,
    ) -> AnnualSummary {
        // Step 1
        let sum = |read: fn(&MonthlyBucket) -> Decimal| -> Decimal {
            buckets.iter().map(read).sum()
        };
        let income = sum(|b| b.income);
        let income_vat = sum(|b| b.income_vat);
        let income_withholding = sum(|b| b.income_withholding);
        let expense_vat = sum(|b| b.expense_vat);
        let material_cost = sum(|b| b.material_cost);
        let labor_cost = sum(|b| b.labor_cost);
        let labor_withholding = sum(|b| b.labor_withholding);
        let contract_labor_cost = sum(|b| b.contract_labor_cost);
        let contract_labor_withholding = sum(|b| b.contract_labor_withholding);
        let salary = sum(|b| b.salary);
        let social_security = sum(|b| b.social_security);

        // Step 2
        let labor_cost_net_of_withholding =
            self.labor_cost_net_of_withholding(labor_cost, labor_withholding);

        // Step 3
        let net_profit = self.net_profit(
            income,
            material_cost,
            labor_cost_net_of_withholding,
            contract_labor_cost,
            salary,
            social_security,
        );

        // Step 4
        let corporate_tax = self.corporate_tax(net_profit);

        // Step 5
        let accumulated_withholding = income_withholding;

        // Step 6
        let annual_tax_payable = self.annual_tax_payable(corporate_tax, accumulated_withholding);

        debug!(
            net_profit = %net_profit,
            corporate_tax = %corporate_tax,
            annual_tax_payable = %annual_tax_payable,
            "annual tax calculated"
        );

        AnnualSummary {
            income,
            income_vat,
            income_withholding,
            expense_vat,
            material_cost,
            labor_cost,
            labor_withholding,
            contract_labor_cost,
            contract_labor_withholding,
            salary,
            social_security,
            labor_cost_net_of_withholding,
            net_profit,
            corporate_tax,
            accumulated_withholding,
            annual_tax_payable,
        }
    }

    fn labor_cost_net_of_withholding(
        &self,
        labor_cost: Decimal,
        labor_withholding: Decimal,
    ) -> Decimal {
        labor_cost - labor_withholding
    }

    fn net_profit(
        &self,
        income: Decimal,
        material_cost: Decimal,
        labor_cost_net: Decimal,
        contract_labor_cost: Decimal,
        salary: Decimal,
        social_security: Decimal,
    ) -> Decimal {
        income - material_cost - labor_cost_net - contract_labor_cost - salary - social_security
    }

    /// Losses never produce negative tax.
    pub fn corporate_tax(
        &self,
        net_profit: Decimal,
    ) -> Decimal {
        if net_profit > Decimal::ZERO {
            net_profit * self.rates.corporate_tax_rate
        } else {
            Decimal::ZERO
        }
    }

    /// Corporate tax after the withholding credit, floored at zero.
    pub fn annual_tax_payable(
        &self,
        corporate_tax: Decimal,
        withholding_credit: Decimal,
    ) -> Decimal {
        floor_at_zero(corporate_tax - withholding_credit)
    }
}

impl Default for AnnualTaxCalculator {
    fn default() -> Self {
        Self::new(TaxRates::default())
    }
}
