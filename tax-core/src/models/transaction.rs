use serde::{Deserialize, Serialize};

/// What a stored line item represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Revenue,
    MaterialExpense,
    LaborExpense,
    ContractLaborExpense,
    PayrollTax,
    SocialSecurity,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Revenue => "revenue",
            Self::MaterialExpense => "material_expense",
            Self::LaborExpense => "labor_expense",
            Self::ContractLaborExpense => "contract_labor_expense",
            Self::PayrollTax => "payroll_tax",
            Self::SocialSecurity => "social_security",
        }
    }

    /// Case-insensitive; surrounding whitespace is ignored.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "revenue" => Some(Self::Revenue),
            "material_expense" => Some(Self::MaterialExpense),
            "labor_expense" => Some(Self::LaborExpense),
            "contract_labor_expense" => Some(Self::ContractLaborExpense),
            "payroll_tax" => Some(Self::PayrollTax),
            "social_security" => Some(Self::SocialSecurity),
            _ => None,
        }
    }

    /// Expense kinds whose bucket is chosen by [`SourceCategory`].
    pub fn is_categorised_expense(&self) -> bool {
        matches!(self, Self::MaterialExpense | Self::ContractLaborExpense)
    }
}

/// Expense line-item category recorded by the purchasing screens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceCategory {
    Material,
    LaborContractor,
}

impl SourceCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Material => "material",
            Self::LaborContractor => "labor_contractor",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "material" => Some(Self::Material),
            "labor_contractor" => Some(Self::LaborContractor),
            _ => None,
        }
    }
}

/// A line item as handed over by the storage layer.
///
/// Dates, kinds and amounts are kept as the text the store holds. The
/// classifier is the only place that interprets them, so a bad historical
/// row ends up in the skipped list instead of failing the whole snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: i64,
    /// Parent expense of a line item. Line items sharing a parent carry the
    /// parent's VAT, which is counted once.
    pub parent_id: Option<i64>,
    pub date: String,
    pub kind: String,
    pub source_category: Option<String>,
    pub amount: String,
    pub vat_amount: Option<String>,
    pub withholding_amount: Option<String>,
}

/// For inserting new line items (no id).
///
/// `outside_company` and `cancelled` only matter to storage: rows with
/// either flag set are never returned in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTransaction {
    pub company_id: i64,
    pub parent_id: Option<i64>,
    pub date: String,
    pub kind: String,
    pub source_category: Option<String>,
    pub amount: String,
    pub vat_amount: Option<String>,
    pub withholding_amount: Option<String>,
    pub outside_company: bool,
    pub cancelled: bool,
}
