use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub const MONTHS_PER_YEAR: usize = 12;

/// Additive [`MonthlyBucket`] fields, i.e. the ones summed straight from
/// line items. `contract_labor_withholding` and `vat_to_pay` are derived and
/// deliberately absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BucketField {
    Income,
    IncomeVat,
    IncomeWithholding,
    ExpenseVat,
    MaterialCost,
    LaborCost,
    LaborWithholding,
    ContractLaborCost,
    Salary,
    SocialSecurity,
}

impl BucketField {
    pub const ALL: [BucketField; 10] = [
        Self::Income,
        Self::IncomeVat,
        Self::IncomeWithholding,
        Self::ExpenseVat,
        Self::MaterialCost,
        Self::LaborCost,
        Self::LaborWithholding,
        Self::ContractLaborCost,
        Self::Salary,
        Self::SocialSecurity,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::IncomeVat => "income_vat",
            Self::IncomeWithholding => "income_withholding",
            Self::ExpenseVat => "expense_vat",
            Self::MaterialCost => "material_cost",
            Self::LaborCost => "labor_cost",
            Self::LaborWithholding => "labor_withholding",
            Self::ContractLaborCost => "contract_labor_cost",
            Self::Salary => "salary",
            Self::SocialSecurity => "social_security",
        }
    }
}

/// One calendar month of aggregated figures for a single company and year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyBucket {
    /// Zero-based month, 0 = January.
    pub month: u8,
    pub income: Decimal,
    pub income_vat: Decimal,
    pub income_withholding: Decimal,
    pub expense_vat: Decimal,
    pub material_cost: Decimal,
    pub labor_cost: Decimal,
    pub labor_withholding: Decimal,
    pub contract_labor_cost: Decimal,
    /// Always `contract_labor_cost` times the contract-labor withholding rate.
    pub contract_labor_withholding: Decimal,
    /// Reserved for payroll salary figures; nothing feeds it yet.
    pub salary: Decimal,
    pub social_security: Decimal,
    /// Previous month's `expense_vat - income_vat`. May be negative.
    pub vat_to_pay: Decimal,
}

impl MonthlyBucket {
    pub fn empty(month: u8) -> Self {
        Self {
            month,
            income: Decimal::ZERO,
            income_vat: Decimal::ZERO,
            income_withholding: Decimal::ZERO,
            expense_vat: Decimal::ZERO,
            material_cost: Decimal::ZERO,
            labor_cost: Decimal::ZERO,
            labor_withholding: Decimal::ZERO,
            contract_labor_cost: Decimal::ZERO,
            contract_labor_withholding: Decimal::ZERO,
            salary: Decimal::ZERO,
            social_security: Decimal::ZERO,
            vat_to_pay: Decimal::ZERO,
        }
    }

    pub fn get(&self, field: BucketField) -> Decimal {
        match field {
            BucketField::Income => self.income,
            BucketField::IncomeVat => self.income_vat,
            BucketField::IncomeWithholding => self.income_withholding,
            BucketField::ExpenseVat => self.expense_vat,
            BucketField::MaterialCost => self.material_cost,
            BucketField::LaborCost => self.labor_cost,
            BucketField::LaborWithholding => self.labor_withholding,
            BucketField::ContractLaborCost => self.contract_labor_cost,
            BucketField::Salary => self.salary,
            BucketField::SocialSecurity => self.social_security,
        }
    }

    /// Adds `amount` to `field` and returns the new total. On overflow the
    /// bucket is left unchanged and `None` is returned.
    pub fn checked_add(
        &mut self,
        field: BucketField,
        amount: Decimal,
    ) -> Option<Decimal> {
        let slot = match field {
            BucketField::Income => &mut self.income,
            BucketField::IncomeVat => &mut self.income_vat,
            BucketField::IncomeWithholding => &mut self.income_withholding,
            BucketField::ExpenseVat => &mut self.expense_vat,
            BucketField::MaterialCost => &mut self.material_cost,
            BucketField::LaborCost => &mut self.labor_cost,
            BucketField::LaborWithholding => &mut self.labor_withholding,
            BucketField::ContractLaborCost => &mut self.contract_labor_cost,
            BucketField::Salary => &mut self.salary,
            BucketField::SocialSecurity => &mut self.social_security,
        };
        *slot = slot.checked_add(amount)?;
        Some(*slot)
    }
}
