//! Tax accrual and planning calculations.
//!
//! Data flows one way: classifier → aggregator → {VAT lag, withholding} →
//! annual calculator → planning projector. Every step is a pure function of
//! its inputs.

pub mod aggregator;
pub mod annual;
pub mod classifier;
pub mod common;
pub mod planning;
pub mod report;
pub mod vat;
pub mod withholding;

pub use aggregator::{
    Aggregation, MonthlyAggregator, MonthlyBuckets, accumulation_limit, empty_buckets,
};
pub use annual::AnnualTaxCalculator;
pub use classifier::{
    Classification, ClassificationError, Contribution, DropReason, RecordOutcome, SkippedRecord,
    TransactionClassifier,
};
pub use planning::{
    AnnualProjection, MonthlyProjection, PlanningAdjustment, PlanningError, PlanningProjector,
    PlanningScope, Projection,
};
pub use report::{MonthlyReport, compute_annual, compute_monthly};
pub use vat::{apply_vat_lag, vat_payable};
pub use withholding::WithholdingBreakdown;
