use anyhow::{Context, Result, bail};
use serde::Serialize;
use tax_core::calculations::{PlanningAdjustment, PlanningProjector, Projection};
use tax_core::db::RepositoryRegistry;
use tax_core::{
    AnnualSummary, Company, MonthlyReport, RepositoryError, TaxRates, TransactionRepository,
    compute_annual, compute_monthly,
};
use tax_db_sqlite::SqliteRepositoryFactory;
use tracing::{debug, info};

/// Builds a [`RepositoryRegistry`] with every backend compiled into this
/// binary.
pub fn build_registry() -> RepositoryRegistry {
    let mut registry = RepositoryRegistry::new();
    registry.register(Box::new(SqliteRepositoryFactory));
    registry
}

/// A company and the years it has transactions for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompanyListing {
    pub id: i64,
    pub name: String,
    pub years: Vec<i32>,
}

pub async fn list_companies(repo: &dyn TransactionRepository) -> Result<Vec<CompanyListing>> {
    let companies = repo.list_companies().await.context("Failed to list companies")?;
    let mut listings = Vec::with_capacity(companies.len());
    for company in companies {
        let years = repo
            .list_transaction_years(company.id)
            .await
            .with_context(|| format!("Failed to list years for '{}'", company.name))?;
        listings.push(CompanyListing {
            id: company.id,
            name: company.name,
            years,
        });
    }
    Ok(listings)
}

/// Finds a company by numeric id or by exact name.
pub async fn resolve_company(
    repo: &dyn TransactionRepository,
    selector: &str,
) -> Result<Company> {
    let selector = selector.trim();
    let lookup = match selector.parse::<i64>() {
        Ok(id) => repo.get_company(id).await,
        Err(_) => repo.get_company_by_name(selector).await,
    };
    match lookup {
        Ok(company) => Ok(company),
        Err(RepositoryError::NotFound) => bail!("no company matches '{}'", selector),
        Err(other) => Err(other).with_context(|| format!("Failed to look up '{}'", selector)),
    }
}

/// Monthly buckets and annual summary for one company/year, computed from a
/// single snapshot read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccrualView {
    pub company: Company,
    pub report: MonthlyReport,
    pub summary: AnnualSummary,
}

impl AccrualView {
    pub async fn load(
        repo: &dyn TransactionRepository,
        company_selector: &str,
        year: i32,
        rates: &TaxRates,
    ) -> Result<Self> {
        let company = resolve_company(repo, company_selector).await?;
        let records = repo
            .get_transactions(company.id, year)
            .await
            .with_context(|| format!("Failed to read {} transactions for '{}'", year, company.name))?;
        debug!(company = %company.name, year, records = records.len(), "snapshot loaded");

        let report = compute_monthly(&records, year, company.id, rates);
        let summary = compute_annual(&report.buckets, rates);
        info!(
            company = %company.name,
            year,
            annual_tax_payable = %summary.annual_tax_payable,
            "accrual view ready"
        );

        Ok(Self {
            company,
            report,
            summary,
        })
    }

    pub fn plan(
        &self,
        adjustment: &PlanningAdjustment,
    ) -> Result<Projection> {
        PlanningProjector::new(&self.report.buckets, &self.summary)
            .project(adjustment)
            .context("Invalid planning request")
    }
}
