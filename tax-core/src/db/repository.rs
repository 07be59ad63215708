use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Company, NewTransaction, TransactionRecord};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("Record not found")]
    NotFound,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Storage for companies and their transaction line items.
///
/// The engine only ever reads [`TransactionRepository::get_transactions`],
/// once per computation.
#[async_trait]
pub trait TransactionRepository: Send + Sync {
    // Companies
    async fn create_company(&self, name: &str) -> Result<Company, RepositoryError>;
    async fn get_company(&self, id: i64) -> Result<Company, RepositoryError>;
    async fn get_company_by_name(&self, name: &str) -> Result<Company, RepositoryError>;
    async fn list_companies(&self) -> Result<Vec<Company>, RepositoryError>;

    // Transactions
    async fn insert_transaction(
        &self,
        transaction: &NewTransaction,
    ) -> Result<i64, RepositoryError>;

    /// Snapshot of one company's year. Outside-company and cancelled rows
    /// are excluded; dates, kinds and amounts are returned as stored.
    /// Rows whose date does not start with a four-digit year belong to no
    /// year and are included in every snapshot, so the engine reports them.
    async fn get_transactions(
        &self,
        company_id: i64,
        year: i32,
    ) -> Result<Vec<TransactionRecord>, RepositoryError>;

    async fn list_transaction_years(&self, company_id: i64) -> Result<Vec<i32>, RepositoryError>;

    /// Removes every stored row of a company's year, returning the count.
    async fn delete_transactions(
        &self,
        company_id: i64,
        year: i32,
    ) -> Result<u64, RepositoryError>;

    /// Swaps a company's stored year for `transactions` as one unit and
    /// returns how many rows were removed. On error the year is unchanged.
    async fn replace_transactions(
        &self,
        company_id: i64,
        year: i32,
        transactions: &[NewTransaction],
    ) -> Result<u64, RepositoryError>;
}
