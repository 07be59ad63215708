//! Transaction classification.
//!
//! Turns raw [`TransactionRecord`]s into [`Contribution`]s: an amount, the
//! [`BucketField`] it adds to and the zero-based month it belongs to.
//!
//! # Rules
//!
//! | Kind                     | Contributes to |
//! |--------------------------|----------------|
//! | `revenue`                | `income`, `income_vat`, `income_withholding` |
//! | `material_expense`       | by category: `material_cost` or `contract_labor_cost`; parent VAT to `expense_vat` |
//! | `contract_labor_expense` | by category: `material_cost` or `contract_labor_cost`; parent VAT to `expense_vat` |
//! | `labor_expense`          | `labor_cost`, `labor_withholding` |
//! | `social_security`        | `social_security` |
//! | `payroll_tax`            | nothing (recognised, no bucket column) |
//!
//! Records dated outside the requested year, records of an unknown kind and
//! expense lines with an unknown category are dropped without error, since
//! upstream data is heterogeneous. Records whose date or amount cannot be
//! read are reported back as [`SkippedRecord`]s so the caller can surface
//! them; they never abort the computation.
//!
//! Outside-company revenue must already be filtered out by the caller.
//! Everything handed to the classifier is treated as in scope.

use std::collections::HashSet;
use std::fmt::Display;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Serialize, Serializer};
use thiserror::Error;
use tracing::{debug, warn};

use crate::calculations::common::{ParseDecimalError, parse_decimal, parse_optional_decimal};
use crate::models::{BucketField, SourceCategory, TransactionKind, TransactionRecord};

/// A record that could not be read.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClassificationError {
    #[error("unparseable date '{0}'")]
    InvalidDate(String),

    #[error("invalid {field}: {source}")]
    InvalidAmount {
        field: &'static str,
        #[source]
        source: ParseDecimalError,
    },

    #[error("{field} of {amount} takes the running total out of range")]
    AmountOutOfRange {
        field: &'static str,
        amount: Decimal,
    },
}

/// Why a readable record contributes nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropReason {
    OutsideYear(i32),
    UnrecognisedKind(String),
    UnrecognisedCategory(String),
    NoBucket(TransactionKind),
}

/// One amount destined for one field of one month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Contribution {
    /// Id of the record the amount came from.
    pub record_id: i64,
    pub month: u8,
    pub field: BucketField,
    pub amount: Decimal,
}

/// VAT recorded on an expense's parent, attributed once per parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpenseVat {
    pub parent_id: Option<i64>,
    pub amount: Decimal,
}

/// The bucket contributions of a single readable, in-scope record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedRecord {
    pub month: u8,
    pub contributions: Vec<Contribution>,
    pub expense_vat: Option<ExpenseVat>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    Classified(ClassifiedRecord),
    Dropped(DropReason),
}

/// A malformed record left out of the computation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRecord {
    pub record_id: i64,
    #[serde(serialize_with = "serialize_display")]
    pub error: ClassificationError,
}

fn serialize_display<T: Display, S: Serializer>(
    value: &T,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

/// Result of classifying a whole snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    /// In snapshot order.
    pub contributions: Vec<Contribution>,
    pub skipped: Vec<SkippedRecord>,
    pub dropped: usize,
}

/// Classifies records for one calendar year.
#[derive(Debug, Clone, Copy)]
pub struct TransactionClassifier {
    year: i32,
}

impl TransactionClassifier {
    pub fn new(year: i32) -> Self {
        Self { year }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    /// Classifies a single record.
    ///
    /// Expense VAT is returned separately in [`ClassifiedRecord::expense_vat`]
    /// because only the whole snapshot knows whether a parent expense has
    /// already been counted; [`Self::classify_all`] resolves that.
    pub fn classify(
        &self,
        record: &TransactionRecord,
    ) -> Result<RecordOutcome, ClassificationError> {
        let Some(kind) = TransactionKind::parse(&record.kind) else {
            return Ok(RecordOutcome::Dropped(DropReason::UnrecognisedKind(
                record.kind.clone(),
            )));
        };

        let date = parse_record_date(&record.date)
            .ok_or_else(|| ClassificationError::InvalidDate(record.date.clone()))?;
        if date.year() != self.year {
            return Ok(RecordOutcome::Dropped(DropReason::OutsideYear(date.year())));
        }
        let month = date.month0() as u8;

        let amount = parse_decimal(&record.amount).map_err(|source| {
            ClassificationError::InvalidAmount {
                field: "amount",
                source,
            }
        })?;

        let classified = match kind {
            TransactionKind::Revenue => ClassifiedRecord {
                month,
                contributions: vec![
                    Contribution {
                        record_id: record.id,
                        month,
                        field: BucketField::Income,
                        amount,
                    },
                    Contribution {
                        record_id: record.id,
                        month,
                        field: BucketField::IncomeVat,
                        amount: vat_amount(record)?,
                    },
                    Contribution {
                        record_id: record.id,
                        month,
                        field: BucketField::IncomeWithholding,
                        amount: withholding_amount(record)?,
                    },
                ],
                expense_vat: None,
            },
            TransactionKind::MaterialExpense | TransactionKind::ContractLaborExpense => {
                let field = match expense_category(kind, record.source_category.as_deref()) {
                    Ok(SourceCategory::Material) => BucketField::MaterialCost,
                    Ok(SourceCategory::LaborContractor) => BucketField::ContractLaborCost,
                    Err(category) => {
                        return Ok(RecordOutcome::Dropped(DropReason::UnrecognisedCategory(
                            category,
                        )));
                    }
                };
                ClassifiedRecord {
                    month,
                    contributions: vec![Contribution {
                        record_id: record.id,
                        month,
                        field,
                        amount,
                    }],
                    expense_vat: Some(ExpenseVat {
                        parent_id: record.parent_id,
                        amount: vat_amount(record)?,
                    }),
                }
            }
            TransactionKind::LaborExpense => ClassifiedRecord {
                month,
                contributions: vec![
                    Contribution {
                        record_id: record.id,
                        month,
                        field: BucketField::LaborCost,
                        amount,
                    },
                    Contribution {
                        record_id: record.id,
                        month,
                        field: BucketField::LaborWithholding,
                        amount: withholding_amount(record)?,
                    },
                ],
                expense_vat: None,
            },
            TransactionKind::SocialSecurity => ClassifiedRecord {
                month,
                contributions: vec![Contribution {
                    record_id: record.id,
                    month,
                    field: BucketField::SocialSecurity,
                    amount,
                }],
                expense_vat: None,
            },
            TransactionKind::PayrollTax => {
                return Ok(RecordOutcome::Dropped(DropReason::NoBucket(kind)));
            }
        };

        Ok(RecordOutcome::Classified(classified))
    }

    /// Classifies a full snapshot, collecting malformed records instead of
    /// failing on them.
    pub fn classify_all(
        &self,
        records: &[TransactionRecord],
    ) -> Classification {
        let mut classification = Classification::default();
        let mut parents_with_vat: HashSet<i64> = HashSet::new();

        for record in records {
            match self.classify(record) {
                Ok(RecordOutcome::Classified(classified)) => {
                    classification
                        .contributions
                        .extend(classified.contributions);

                    if let Some(vat) = classified.expense_vat {
                        let first_for_parent = match vat.parent_id {
                            Some(parent_id) => parents_with_vat.insert(parent_id),
                            None => true,
                        };
                        if first_for_parent {
                            classification.contributions.push(Contribution {
                                record_id: record.id,
                                month: classified.month,
                                field: BucketField::ExpenseVat,
                                amount: vat.amount,
                            });
                        }
                    }
                }
                Ok(RecordOutcome::Dropped(reason)) => {
                    debug!(
                        record_id = record.id,
                        year = self.year,
                        ?reason,
                        "record dropped from classification"
                    );
                    classification.dropped += 1;
                }
                Err(error) => {
                    warn!(
                        record_id = record.id,
                        %error,
                        "malformed record skipped"
                    );
                    classification.skipped.push(SkippedRecord {
                        record_id: record.id,
                        error,
                    });
                }
            }
        }

        classification
    }
}

/// Reads `YYYY-MM-DD`, RFC 3339 timestamps and `YYYY-MM-DD HH:MM:SS`.
pub fn parse_record_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(s) {
        return Some(timestamp.date_naive());
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|timestamp| timestamp.date())
}

/// Category of an expense line; an unknown category comes back as `Err`.
fn expense_category(
    kind: TransactionKind,
    source_category: Option<&str>,
) -> Result<SourceCategory, String> {
    match source_category.map(str::trim).filter(|c| !c.is_empty()) {
        Some(category) => SourceCategory::parse(category).ok_or_else(|| category.to_string()),
        None if kind == TransactionKind::ContractLaborExpense => {
            Ok(SourceCategory::LaborContractor)
        }
        None => Ok(SourceCategory::Material),
    }
}

fn vat_amount(record: &TransactionRecord) -> Result<Decimal, ClassificationError> {
    parse_optional_decimal(record.vat_amount.as_deref()).map_err(|source| {
        ClassificationError::InvalidAmount {
            field: "vat_amount",
            source,
        }
    })
}

fn withholding_amount(record: &TransactionRecord) -> Result<Decimal, ClassificationError> {
    parse_optional_decimal(record.withholding_amount.as_deref()).map_err(|source| {
        ClassificationError::InvalidAmount {
            field: "withholding_amount",
            source,
        }
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;
    use tracing_subscriber::fmt::format::FmtSpan;

    use super::*;

    /// Routes classifier logs to the test output.
    fn init_test_tracing() -> tracing::subscriber::DefaultGuard {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_span_events(FmtSpan::NONE)
            .with_test_writer()
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    fn record(
        id: i64,
        date: &str,
        kind: &str,
        amount: &str,
    ) -> TransactionRecord {
        TransactionRecord {
            id,
            parent_id: None,
            date: date.to_string(),
            kind: kind.to_string(),
            source_category: None,
            amount: amount.to_string(),
            vat_amount: None,
            withholding_amount: None,
        }
    }

    fn classified(outcome: RecordOutcome) -> ClassifiedRecord {
        match outcome {
            RecordOutcome::Classified(c) => c,
            other => panic!("expected Classified, got {other:?}"),
        }
    }

    // =========================================================================
    // date parsing
    // =========================================================================

    #[test]
    fn parse_record_date_accepts_plain_dates() {
        assert_eq!(
            parse_record_date("2024-03-15"),
            NaiveDate::from_ymd_opt(2024, 3, 15)
        );
    }

    #[test]
    fn parse_record_date_accepts_rfc3339() {
        assert_eq!(
            parse_record_date("2024-12-31T23:00:00+07:00"),
            NaiveDate::from_ymd_opt(2024, 12, 31)
        );
    }

    #[test]
    fn parse_record_date_accepts_sql_timestamps() {
        assert_eq!(
            parse_record_date("2024-01-02 08:30:00"),
            NaiveDate::from_ymd_opt(2024, 1, 2)
        );
    }

    #[test]
    fn parse_record_date_rejects_garbage() {
        assert_eq!(parse_record_date("15/03/2024"), None);
        assert_eq!(parse_record_date(""), None);
    }

    // =========================================================================
    // single-record rules
    // =========================================================================

    #[test]
    fn revenue_feeds_income_vat_and_withholding() {
        let mut r = record(1, "2024-01-10", "revenue", "100000");
        r.vat_amount = Some("7000".to_string());
        r.withholding_amount = Some("3000".to_string());

        let c = classified(TransactionClassifier::new(2024).classify(&r).unwrap());

        assert_eq!(c.month, 0);
        assert_eq!(
            c.contributions,
            vec![
                Contribution {
                    record_id: 1,
                    month: 0,
                    field: BucketField::Income,
                    amount: dec!(100000),
                },
                Contribution {
                    record_id: 1,
                    month: 0,
                    field: BucketField::IncomeVat,
                    amount: dec!(7000),
                },
                Contribution {
                    record_id: 1,
                    month: 0,
                    field: BucketField::IncomeWithholding,
                    amount: dec!(3000),
                },
            ]
        );
        assert_eq!(c.expense_vat, None);
    }

    #[test]
    fn material_category_goes_to_material_cost() {
        let mut r = record(2, "2024-03-05", "material_expense", "50000");
        r.source_category = Some("material".to_string());
        r.vat_amount = Some("3500".to_string());

        let c = classified(TransactionClassifier::new(2024).classify(&r).unwrap());

        assert_eq!(c.month, 2);
        assert_eq!(c.contributions[0].field, BucketField::MaterialCost);
        assert_eq!(
            c.expense_vat,
            Some(ExpenseVat {
                parent_id: None,
                amount: dec!(3500),
            })
        );
    }

    #[test]
    fn source_category_overrides_expense_kind() {
        let mut r = record(3, "2024-03-05", "material_expense", "20000");
        r.source_category = Some("labor_contractor".to_string());

        let c = classified(TransactionClassifier::new(2024).classify(&r).unwrap());

        assert_eq!(c.contributions[0].field, BucketField::ContractLaborCost);
    }

    #[test]
    fn contract_labor_kind_defaults_to_labor_contractor() {
        let r = record(4, "2024-03-05", "contract_labor_expense", "20000");

        let c = classified(TransactionClassifier::new(2024).classify(&r).unwrap());

        assert_eq!(c.contributions[0].field, BucketField::ContractLaborCost);
        assert_eq!(c.contributions[0].amount, dec!(20000));
    }

    #[test]
    fn unknown_category_is_dropped() {
        let mut r = record(5, "2024-03-05", "material_expense", "1000");
        r.source_category = Some("equipment".to_string());

        let outcome = TransactionClassifier::new(2024).classify(&r).unwrap();

        assert_eq!(
            outcome,
            RecordOutcome::Dropped(DropReason::UnrecognisedCategory("equipment".to_string()))
        );
    }

    #[test]
    fn labor_expense_feeds_labor_cost_and_withholding() {
        let mut r = record(6, "2024-07-20", "labor_expense", "10000");
        r.withholding_amount = Some("300".to_string());

        let c = classified(TransactionClassifier::new(2024).classify(&r).unwrap());

        assert_eq!(c.month, 6);
        assert_eq!(c.contributions[0].field, BucketField::LaborCost);
        assert_eq!(c.contributions[0].amount, dec!(10000));
        assert_eq!(c.contributions[1].field, BucketField::LaborWithholding);
        assert_eq!(c.contributions[1].amount, dec!(300));
    }

    #[test]
    fn social_security_feeds_social_security() {
        let r = record(7, "2024-12-01", "social_security", "750");

        let c = classified(TransactionClassifier::new(2024).classify(&r).unwrap());

        assert_eq!(
            c.contributions,
            vec![Contribution {
                record_id: 7,
                month: 11,
                field: BucketField::SocialSecurity,
                amount: dec!(750),
            }]
        );
    }

    #[test]
    fn payroll_tax_is_recognised_but_has_no_bucket() {
        let r = record(8, "2024-02-01", "payroll_tax", "1200");

        let outcome = TransactionClassifier::new(2024).classify(&r).unwrap();

        assert_eq!(
            outcome,
            RecordOutcome::Dropped(DropReason::NoBucket(TransactionKind::PayrollTax))
        );
    }

    #[test]
    fn record_outside_year_is_dropped() {
        let r = record(9, "2023-12-31", "revenue", "5000");

        let outcome = TransactionClassifier::new(2024).classify(&r).unwrap();

        assert_eq!(outcome, RecordOutcome::Dropped(DropReason::OutsideYear(2023)));
    }

    #[test]
    fn unknown_kind_is_dropped() {
        let r = record(10, "2024-01-01", "refund", "5000");

        let outcome = TransactionClassifier::new(2024).classify(&r).unwrap();

        assert_eq!(
            outcome,
            RecordOutcome::Dropped(DropReason::UnrecognisedKind("refund".to_string()))
        );
    }

    #[test]
    fn bad_date_is_an_error() {
        let r = record(11, "not a date", "revenue", "5000");

        let result = TransactionClassifier::new(2024).classify(&r);

        assert_eq!(
            result,
            Err(ClassificationError::InvalidDate("not a date".to_string()))
        );
    }

    #[test]
    fn bad_amount_is_an_error() {
        let r = record(12, "2024-01-01", "revenue", "five");

        let result = TransactionClassifier::new(2024).classify(&r);

        assert!(matches!(
            result,
            Err(ClassificationError::InvalidAmount {
                field: "amount",
                ..
            })
        ));
    }

    #[test]
    fn bad_vat_amount_is_an_error() {
        let mut r = record(13, "2024-01-01", "material_expense", "100");
        r.vat_amount = Some("7%".to_string());

        let result = TransactionClassifier::new(2024).classify(&r);

        assert!(matches!(
            result,
            Err(ClassificationError::InvalidAmount {
                field: "vat_amount",
                ..
            })
        ));
    }

    // =========================================================================
    // whole-snapshot classification
    // =========================================================================

    #[test]
    fn classify_all_attributes_parent_vat_once() {
        let mut line_a = record(20, "2024-05-02", "material_expense", "6000");
        line_a.parent_id = Some(500);
        line_a.vat_amount = Some("700".to_string());
        let mut line_b = record(21, "2024-05-02", "contract_labor_expense", "4000");
        line_b.parent_id = Some(500);
        line_b.vat_amount = Some("700".to_string());

        let result = TransactionClassifier::new(2024).classify_all(&[line_a, line_b]);

        let vat: Vec<_> = result
            .contributions
            .iter()
            .filter(|c| c.field == BucketField::ExpenseVat)
            .collect();
        assert_eq!(vat.len(), 1);
        assert_eq!(vat[0].amount, dec!(700));
        assert_eq!(vat[0].month, 4);
    }

    #[test]
    fn classify_all_counts_vat_of_unparented_lines_individually() {
        let mut a = record(30, "2024-05-02", "material_expense", "100");
        a.vat_amount = Some("7".to_string());
        let mut b = record(31, "2024-05-03", "material_expense", "200");
        b.vat_amount = Some("14".to_string());

        let result = TransactionClassifier::new(2024).classify_all(&[a, b]);

        let total_vat: Decimal = result
            .contributions
            .iter()
            .filter(|c| c.field == BucketField::ExpenseVat)
            .map(|c| c.amount)
            .sum();
        assert_eq!(total_vat, dec!(21));
    }

    #[test]
    fn classify_all_collects_skipped_and_keeps_going() {
        let _guard = init_test_tracing();
        let good = record(40, "2024-02-01", "revenue", "1000");
        let bad = record(41, "2024-02-31", "revenue", "1000");
        let dropped = record(42, "2025-01-01", "revenue", "1000");

        let result = TransactionClassifier::new(2024).classify_all(&[good, bad, dropped]);

        assert_eq!(result.skipped.len(), 1);
        assert_eq!(result.skipped[0].record_id, 41);
        assert_eq!(result.dropped, 1);
        assert_eq!(
            result
                .contributions
                .iter()
                .filter(|c| c.field == BucketField::Income)
                .count(),
            1
        );
    }
}
