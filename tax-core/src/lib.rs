pub mod calculations;
pub mod db;
pub mod models;

pub use calculations::{MonthlyReport, compute_annual, compute_monthly};
pub use db::repository::{RepositoryError, TransactionRepository};
pub use models::*;
