use std::str::FromStr;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqliteRow};
use sqlx::{Executor, Row, Sqlite};
use tax_core::{Company, NewTransaction, RepositoryError, TransactionRecord, TransactionRepository};
use tracing::debug;

use crate::column::{get_optional_text, get_text};

pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    /// Opens `database_url`, creating the file when missing.
    ///
    /// Accepts sqlx URLs (`sqlite:accrual.db`, `sqlite::memory:`) as well as
    /// a bare path or `:memory:`.
    pub async fn new(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("Invalid database URL: {}", database_url))?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePool::connect_with(options)
            .await
            .with_context(|| format!("Failed to connect to database: {}", database_url))?;
        Ok(Self { pool })
    }

    pub async fn new_with_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run database migrations")?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn db_err(e: sqlx::Error) -> RepositoryError {
    RepositoryError::Database(e.to_string())
}

fn row_to_company(row: &SqliteRow) -> Result<Company, RepositoryError> {
    Ok(Company {
        id: row.try_get("id").map_err(db_err)?,
        name: row.try_get("name").map_err(db_err)?,
        created_at: row
            .try_get::<DateTime<Utc>, _>("created_at")
            .map_err(|e| RepositoryError::Database(format!("Failed to get created_at: {}", e)))?,
    })
}

fn row_to_transaction(row: &SqliteRow) -> Result<TransactionRecord, RepositoryError> {
    Ok(TransactionRecord {
        id: row.try_get("id").map_err(db_err)?,
        parent_id: row.try_get("parent_id").map_err(db_err)?,
        date: get_text(row, "date")?,
        kind: get_text(row, "kind")?,
        source_category: get_optional_text(row, "source_category")?,
        amount: get_text(row, "amount")?,
        vat_amount: get_optional_text(row, "vat_amount")?,
        withholding_amount: get_optional_text(row, "withholding_amount")?,
    })
}

/// Dates are stored as text starting `YYYY`; a year is matched on that prefix.
fn year_prefix(year: i32) -> String {
    format!("{:04}", year)
}

async fn insert_row<'c, E>(
    executor: E,
    transaction: &NewTransaction,
) -> Result<i64, RepositoryError>
where
    E: Executor<'c, Database = Sqlite>,
{
    let result = sqlx::query(
        "INSERT INTO transactions (
            company_id, parent_id, date, kind, source_category,
            amount, vat_amount, withholding_amount, outside_company, cancelled
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(transaction.company_id)
    .bind(transaction.parent_id)
    .bind(&transaction.date)
    .bind(&transaction.kind)
    .bind(&transaction.source_category)
    .bind(&transaction.amount)
    .bind(&transaction.vat_amount)
    .bind(&transaction.withholding_amount)
    .bind(transaction.outside_company)
    .bind(transaction.cancelled)
    .execute(executor)
    .await
    .map_err(db_err)?;

    Ok(result.last_insert_rowid())
}

async fn delete_year<'c, E>(
    executor: E,
    company_id: i64,
    year: i32,
) -> Result<u64, RepositoryError>
where
    E: Executor<'c, Database = Sqlite>,
{
    let result = sqlx::query("DELETE FROM transactions WHERE company_id = ? AND substr(date, 1, 4) = ?")
        .bind(company_id)
        .bind(year_prefix(year))
        .execute(executor)
        .await
        .map_err(db_err)?;

    Ok(result.rows_affected())
}

#[async_trait]
impl TransactionRepository for SqliteRepository {
    async fn create_company(
        &self,
        name: &str,
    ) -> Result<Company, RepositoryError> {
        let result = sqlx::query("INSERT INTO companies (name, created_at) VALUES (?, ?)")
            .bind(name)
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        self.get_company(result.last_insert_rowid()).await
    }

    async fn get_company(
        &self,
        id: i64,
    ) -> Result<Company, RepositoryError> {
        let row = sqlx::query("SELECT id, name, created_at FROM companies WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
            .ok_or(RepositoryError::NotFound)?;

        row_to_company(&row)
    }

    async fn get_company_by_name(
        &self,
        name: &str,
    ) -> Result<Company, RepositoryError> {
        let row = sqlx::query("SELECT id, name, created_at FROM companies WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
            .ok_or(RepositoryError::NotFound)?;

        row_to_company(&row)
    }

    async fn list_companies(&self) -> Result<Vec<Company>, RepositoryError> {
        let rows = sqlx::query("SELECT id, name, created_at FROM companies ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        rows.iter().map(row_to_company).collect()
    }

    async fn insert_transaction(
        &self,
        transaction: &NewTransaction,
    ) -> Result<i64, RepositoryError> {
        insert_row(&self.pool, transaction).await
    }

    async fn get_transactions(
        &self,
        company_id: i64,
        year: i32,
    ) -> Result<Vec<TransactionRecord>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, parent_id, date, kind, source_category,
                    amount, vat_amount, withholding_amount
             FROM transactions
             WHERE company_id = ?
               AND (substr(date, 1, 4) = ?
                    OR substr(date, 1, 4) NOT GLOB '[0-9][0-9][0-9][0-9]')
               AND outside_company = 0
               AND cancelled = 0
             ORDER BY date, id",
        )
        .bind(company_id)
        .bind(year_prefix(year))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        debug!(company_id, year, rows = rows.len(), "transaction snapshot read");

        rows.iter().map(row_to_transaction).collect()
    }

    async fn list_transaction_years(
        &self,
        company_id: i64,
    ) -> Result<Vec<i32>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT DISTINCT CAST(substr(date, 1, 4) AS INTEGER) AS year
             FROM transactions
             WHERE company_id = ?
               AND substr(date, 1, 4) GLOB '[0-9][0-9][0-9][0-9]'
               AND cancelled = 0
             ORDER BY year DESC",
        )
        .bind(company_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter()
            .map(|row| row.try_get("year").map_err(db_err))
            .collect()
    }

    async fn delete_transactions(
        &self,
        company_id: i64,
        year: i32,
    ) -> Result<u64, RepositoryError> {
        delete_year(&self.pool, company_id, year).await
    }

    async fn replace_transactions(
        &self,
        company_id: i64,
        year: i32,
        transactions: &[NewTransaction],
    ) -> Result<u64, RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let deleted = delete_year(&mut *tx, company_id, year).await?;
        for transaction in transactions {
            insert_row(&mut *tx, transaction).await?;
        }

        tx.commit().await.map_err(db_err)?;
        debug!(company_id, year, deleted, inserted = transactions.len(), "year replaced");
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use sqlx::sqlite::SqlitePoolOptions;

    use super::*;

    async fn setup_test_db() -> SqliteRepository {
        let pool = SqlitePoolOptions::new()
            .connect("sqlite::memory:")
            .await
            .expect("Failed to create in-memory database");

        let repo = SqliteRepository::new_with_pool(pool).await;
        repo.run_migrations()
            .await
            .expect("Failed to run migrations");
        repo
    }

    fn new_transaction(
        company_id: i64,
        date: &str,
        kind: &str,
        amount: &str,
    ) -> NewTransaction {
        NewTransaction {
            company_id,
            parent_id: None,
            date: date.to_string(),
            kind: kind.to_string(),
            source_category: None,
            amount: amount.to_string(),
            vat_amount: None,
            withholding_amount: None,
            outside_company: false,
            cancelled: false,
        }
    }

    // =========================================================================
    // companies
    // =========================================================================

    #[tokio::test]
    async fn test_create_and_get_company() {
        let repo = setup_test_db().await;

        let created = repo.create_company("Acme Builders").await.unwrap();
        let fetched = repo.get_company(created.id).await.unwrap();

        assert_eq!(fetched, created);
        assert_eq!(fetched.name, "Acme Builders");
    }

    #[tokio::test]
    async fn test_get_company_not_found() {
        let repo = setup_test_db().await;

        assert_eq!(repo.get_company(42).await, Err(RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn test_get_company_by_name() {
        let repo = setup_test_db().await;
        let created = repo.create_company("Acme Builders").await.unwrap();

        let fetched = repo.get_company_by_name("Acme Builders").await.unwrap();

        assert_eq!(fetched.id, created.id);
        assert_eq!(
            repo.get_company_by_name("Nobody").await,
            Err(RepositoryError::NotFound)
        );
    }

    #[tokio::test]
    async fn test_duplicate_company_name_is_rejected() {
        let repo = setup_test_db().await;
        repo.create_company("Acme Builders").await.unwrap();

        let result = repo.create_company("Acme Builders").await;

        assert!(matches!(result, Err(RepositoryError::Database(_))));
    }

    #[tokio::test]
    async fn test_list_companies_sorted_by_name() {
        let repo = setup_test_db().await;
        repo.create_company("Zenith Co").await.unwrap();
        repo.create_company("Acme Builders").await.unwrap();

        let names: Vec<String> = repo
            .list_companies()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();

        assert_eq!(names, vec!["Acme Builders", "Zenith Co"]);
    }

    // =========================================================================
    // transactions
    // =========================================================================

    #[tokio::test]
    async fn test_insert_and_read_snapshot() {
        let repo = setup_test_db().await;
        let company = repo.create_company("Acme Builders").await.unwrap();
        let mut revenue = new_transaction(company.id, "2024-01-15", "revenue", "100000");
        revenue.vat_amount = Some("7000".to_string());
        revenue.withholding_amount = Some("3000".to_string());

        let id = repo.insert_transaction(&revenue).await.unwrap();
        let records = repo.get_transactions(company.id, 2024).await.unwrap();

        assert_eq!(
            records,
            vec![TransactionRecord {
                id,
                parent_id: None,
                date: "2024-01-15".to_string(),
                kind: "revenue".to_string(),
                source_category: None,
                amount: "100000".to_string(),
                vat_amount: Some("7000".to_string()),
                withholding_amount: Some("3000".to_string()),
            }]
        );
    }

    #[tokio::test]
    async fn test_snapshot_excludes_outside_company_and_cancelled_rows() {
        let repo = setup_test_db().await;
        let company = repo.create_company("Acme Builders").await.unwrap();
        let mut outside = new_transaction(company.id, "2024-02-01", "revenue", "500");
        outside.outside_company = true;
        let mut cancelled = new_transaction(company.id, "2024-02-02", "revenue", "600");
        cancelled.cancelled = true;
        let kept = new_transaction(company.id, "2024-02-03", "revenue", "700");
        repo.insert_transaction(&outside).await.unwrap();
        repo.insert_transaction(&cancelled).await.unwrap();
        repo.insert_transaction(&kept).await.unwrap();

        let records = repo.get_transactions(company.id, 2024).await.unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].amount, "700");
    }

    #[tokio::test]
    async fn test_snapshot_is_scoped_to_company_and_year() {
        let repo = setup_test_db().await;
        let acme = repo.create_company("Acme Builders").await.unwrap();
        let zenith = repo.create_company("Zenith Co").await.unwrap();
        repo.insert_transaction(&new_transaction(acme.id, "2024-03-01", "revenue", "1"))
            .await
            .unwrap();
        repo.insert_transaction(&new_transaction(acme.id, "2023-12-31", "revenue", "2"))
            .await
            .unwrap();
        repo.insert_transaction(&new_transaction(zenith.id, "2024-03-01", "revenue", "3"))
            .await
            .unwrap();

        let records = repo.get_transactions(acme.id, 2024).await.unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].amount, "1");
    }

    #[tokio::test]
    async fn test_snapshot_is_ordered_by_date() {
        let repo = setup_test_db().await;
        let company = repo.create_company("Acme Builders").await.unwrap();
        for date in ["2024-09-01", "2024-01-01", "2024-05-01"] {
            repo.insert_transaction(&new_transaction(company.id, date, "revenue", "1"))
                .await
                .unwrap();
        }

        let dates: Vec<String> = repo
            .get_transactions(company.id, 2024)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.date)
            .collect();

        assert_eq!(dates, vec!["2024-01-01", "2024-05-01", "2024-09-01"]);
    }

    #[tokio::test]
    async fn test_numeric_amounts_written_by_other_tools_are_stored_as_text() {
        let repo = setup_test_db().await;
        let company = repo.create_company("Acme Builders").await.unwrap();
        sqlx::query(
            "INSERT INTO transactions (company_id, date, kind, amount, vat_amount)
             VALUES (?, '2024-04-01', 'material_expense', 50000, 3500.5)",
        )
        .bind(company.id)
        .execute(repo.pool())
        .await
        .unwrap();

        let storage: (String, String) = sqlx::query_as(
            "SELECT typeof(amount), typeof(vat_amount) FROM transactions",
        )
        .fetch_one(repo.pool())
        .await
        .unwrap();
        let records = repo.get_transactions(company.id, 2024).await.unwrap();

        assert_eq!(storage, ("text".to_string(), "text".to_string()));
        assert_eq!(records[0].amount, "50000");
        assert_eq!(records[0].vat_amount, Some("3500.5".to_string()));
    }

    #[tokio::test]
    async fn test_snapshot_includes_rows_without_a_leading_year() {
        let repo = setup_test_db().await;
        let company = repo.create_company("Acme Builders").await.unwrap();
        for date in ["2024-03-15", "03/15/2024", "2023-03-15"] {
            repo.insert_transaction(&new_transaction(company.id, date, "revenue", "1000"))
                .await
                .unwrap();
        }

        let records = repo.get_transactions(company.id, 2024).await.unwrap();
        let report = tax_core::compute_monthly(
            &records,
            2024,
            company.id,
            &tax_core::TaxRates::default(),
        );

        let dates: Vec<&str> = records.iter().map(|r| r.date.as_str()).collect();
        assert_eq!(dates, vec!["03/15/2024", "2024-03-15"]);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].record_id, records[0].id);
        assert_eq!(report.buckets[2].income, rust_decimal::Decimal::from(1000));
    }

    #[tokio::test]
    async fn test_list_transaction_years_newest_first() {
        let repo = setup_test_db().await;
        let company = repo.create_company("Acme Builders").await.unwrap();
        for date in ["2023-06-01", "2024-01-01", "2024-02-01", "garbage"] {
            repo.insert_transaction(&new_transaction(company.id, date, "revenue", "1"))
                .await
                .unwrap();
        }

        let years = repo.list_transaction_years(company.id).await.unwrap();

        assert_eq!(years, vec![2024, 2023]);
    }

    #[tokio::test]
    async fn test_delete_transactions_removes_only_that_year() {
        let repo = setup_test_db().await;
        let company = repo.create_company("Acme Builders").await.unwrap();
        repo.insert_transaction(&new_transaction(company.id, "2024-01-01", "revenue", "1"))
            .await
            .unwrap();
        repo.insert_transaction(&new_transaction(company.id, "2024-12-01", "revenue", "2"))
            .await
            .unwrap();
        repo.insert_transaction(&new_transaction(company.id, "2023-01-01", "revenue", "3"))
            .await
            .unwrap();

        let deleted = repo.delete_transactions(company.id, 2024).await.unwrap();

        assert_eq!(deleted, 2);
        assert!(repo.get_transactions(company.id, 2024).await.unwrap().is_empty());
        assert_eq!(repo.get_transactions(company.id, 2023).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_replace_transactions_swaps_the_year() {
        let repo = setup_test_db().await;
        let company = repo.create_company("Acme Builders").await.unwrap();
        repo.insert_transaction(&new_transaction(company.id, "2024-01-01", "revenue", "1"))
            .await
            .unwrap();
        repo.insert_transaction(&new_transaction(company.id, "2023-01-01", "revenue", "2"))
            .await
            .unwrap();

        let replaced = repo
            .replace_transactions(
                company.id,
                2024,
                &[
                    new_transaction(company.id, "2024-06-01", "revenue", "10"),
                    new_transaction(company.id, "2024-07-01", "revenue", "20"),
                ],
            )
            .await
            .unwrap();

        let amounts: Vec<String> = repo
            .get_transactions(company.id, 2024)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.amount)
            .collect();
        assert_eq!(replaced, 1);
        assert_eq!(amounts, vec!["10", "20"]);
        assert_eq!(repo.get_transactions(company.id, 2023).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_replace_leaves_the_year_untouched() {
        let repo = setup_test_db().await;
        let company = repo.create_company("Acme Builders").await.unwrap();
        repo.insert_transaction(&new_transaction(company.id, "2024-01-01", "revenue", "1"))
            .await
            .unwrap();

        let result = repo
            .replace_transactions(
                company.id,
                2024,
                &[
                    new_transaction(company.id, "2024-06-01", "revenue", "10"),
                    new_transaction(999, "2024-07-01", "revenue", "20"),
                ],
            )
            .await;

        let records = repo.get_transactions(company.id, 2024).await.unwrap();
        assert!(matches!(result, Err(RepositoryError::Database(_))));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].amount, "1");
    }

    #[tokio::test]
    async fn test_insert_for_unknown_company_fails() {
        let repo = setup_test_db().await;

        let result = repo
            .insert_transaction(&new_transaction(99, "2024-01-01", "revenue", "1"))
            .await;

        assert!(matches!(result, Err(RepositoryError::Database(_))));
    }
}
