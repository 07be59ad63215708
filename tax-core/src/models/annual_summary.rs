use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Yearly totals and corporate-tax figures for one company.
///
/// Recomputed from the twelve monthly buckets whenever the selection
/// changes; never updated incrementally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnualSummary {
    pub income: Decimal,
    pub income_vat: Decimal,
    pub income_withholding: Decimal,
    pub expense_vat: Decimal,
    pub material_cost: Decimal,
    pub labor_cost: Decimal,
    pub labor_withholding: Decimal,
    pub contract_labor_cost: Decimal,
    pub contract_labor_withholding: Decimal,
    pub salary: Decimal,
    pub social_security: Decimal,

    /// `labor_cost - labor_withholding`.
    pub labor_cost_net_of_withholding: Decimal,
    pub net_profit: Decimal,
    /// Zero whenever `net_profit` is not positive.
    pub corporate_tax: Decimal,
    /// Revenue-side withholding only; labor-side withholding is not credited.
    pub accumulated_withholding: Decimal,
    /// `max(0, corporate_tax - accumulated_withholding)`.
    pub annual_tax_payable: Decimal,
}
