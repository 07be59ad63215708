use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by [`TaxRates::validate`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TaxRatesError {
    #[error("VAT rate must be between 0 and 1, got {0}")]
    InvalidVatRate(Decimal),

    #[error("contract labor withholding rate must be between 0 and 1, got {0}")]
    InvalidContractLaborWithholdingRate(Decimal),

    #[error("corporate tax rate must be between 0 and 1, got {0}")]
    InvalidCorporateTaxRate(Decimal),
}

/// The single fixed tax scheme the engine implements.
///
/// `vat_rate` is informational: VAT is taken from the recorded `vat_amount`
/// of each line item and never recomputed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxRates {
    pub vat_rate: Decimal,
    pub contract_labor_withholding_rate: Decimal,
    pub corporate_tax_rate: Decimal,
}

impl Default for TaxRates {
    fn default() -> Self {
        Self {
            vat_rate: Decimal::new(7, 2),
            contract_labor_withholding_rate: Decimal::new(3, 2),
            corporate_tax_rate: Decimal::new(20, 2),
        }
    }
}

impl TaxRates {
    /// Checks every rate lies in `[0, 1]`.
    ///
    /// ```
    /// use rust_decimal_macros::dec;
    /// use tax_core::{TaxRates, TaxRatesError};
    ///
    /// let rates = TaxRates {
    ///     corporate_tax_rate: dec!(1.5),
    ///     ..TaxRates::default()
    /// };
    ///
    /// assert_eq!(
    ///     rates.validate(),
    ///     Err(TaxRatesError::InvalidCorporateTaxRate(dec!(1.5)))
    /// );
    /// ```
    pub fn validate(&self) -> Result<(), TaxRatesError> {
        if !is_fraction(self.vat_rate) {
            return Err(TaxRatesError::InvalidVatRate(self.vat_rate));
        }
        if !is_fraction(self.contract_labor_withholding_rate) {
            return Err(TaxRatesError::InvalidContractLaborWithholdingRate(
                self.contract_labor_withholding_rate,
            ));
        }
        if !is_fraction(self.corporate_tax_rate) {
            return Err(TaxRatesError::InvalidCorporateTaxRate(
                self.corporate_tax_rate,
            ));
        }
        Ok(())
    }
}

fn is_fraction(rate: Decimal) -> bool {
    rate >= Decimal::ZERO && rate <= Decimal::ONE
}
