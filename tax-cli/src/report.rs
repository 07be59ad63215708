//! Plain-text rendering of engine results.
//!
//! Figures are rounded half-up to two places here and nowhere else.

use std::fmt::{self, Write};

use rust_decimal::Decimal;
use tax_core::calculations::common::round_half_up;
use tax_core::calculations::{
    AnnualProjection, MonthlyProjection, Projection, WithholdingBreakdown,
};
use tax_core::{AnnualSummary, MonthlyReport};

use crate::app::CompanyListing;

const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Two decimal places with `,` thousands separators.
pub fn fmt_currency(val: Decimal) -> String {
    let rounded = format!("{:.2}", round_half_up(val));
    let (sign, digits) = match rounded.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", rounded.as_str()),
    };
    let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits, "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    format!("{sign}{grouped}.{frac_part}")
}

fn month_name(month: u8) -> &'static str {
    MONTH_NAMES.get(usize::from(month)).copied().unwrap_or("?")
}

pub fn render_companies(
    companies: &[CompanyListing],
    out: &mut impl Write,
) -> fmt::Result {
    if companies.is_empty() {
        return writeln!(out, "No companies loaded.");
    }
    writeln!(out, "{:>4}  {:<32}  Years", "ID", "Company")?;
    for listing in companies {
        let years: Vec<String> = listing.years.iter().map(|y| y.to_string()).collect();
        writeln!(
            out,
            "{:>4}  {:<32}  {}",
            listing.id,
            listing.name,
            if years.is_empty() {
                "-".to_string()
            } else {
                years.join(", ")
            }
        )?;
    }
    Ok(())
}

pub fn render_monthly(
    company: &str,
    report: &MonthlyReport,
    out: &mut impl Write,
) -> fmt::Result {
    writeln!(out, "{} - {} monthly figures", company, report.year)?;
    writeln!(
        out,
        "{:<5}{:>15}{:>13}{:>13}{:>13}{:>15}{:>15}{:>13}{:>15}{:>13}{:>13}{:>14}",
        "Month",
        "Income",
        "Income VAT",
        "Income WHT",
        "Expense VAT",
        "Material",
        "Labor",
        "Labor WHT",
        "Contract",
        "Contract WHT",
        "Social Sec",
        "VAT to pay",
    )?;
    for bucket in &report.buckets {
        writeln!(
            out,
            "{:<5}{:>15}{:>13}{:>13}{:>13}{:>15}{:>15}{:>13}{:>15}{:>13}{:>13}{:>14}",
            month_name(bucket.month),
            fmt_currency(bucket.income),
            fmt_currency(bucket.income_vat),
            fmt_currency(bucket.income_withholding),
            fmt_currency(bucket.expense_vat),
            fmt_currency(bucket.material_cost),
            fmt_currency(bucket.labor_cost),
            fmt_currency(bucket.labor_withholding),
            fmt_currency(bucket.contract_labor_cost),
            fmt_currency(bucket.contract_labor_withholding),
            fmt_currency(bucket.social_security),
            fmt_currency(bucket.vat_to_pay),
        )?;
    }

    if !report.skipped.is_empty() {
        writeln!(out)?;
        writeln!(out, "Skipped {} unreadable record(s):", report.skipped.len())?;
        for skipped in &report.skipped {
            writeln!(out, "  #{}: {}", skipped.record_id, skipped.error)?;
        }
    }
    Ok(())
}

fn render_withholding(
    withholding: &WithholdingBreakdown,
    out: &mut impl Write,
) -> fmt::Result {
    writeln!(
        out,
        "Withholding:      revenue {:>14}   labor {:>14}   contract {:>14}",
        fmt_currency(withholding.revenue),
        fmt_currency(withholding.direct_labor),
        fmt_currency(withholding.contract_labor),
    )
}

pub fn render_annual(
    company: &str,
    year: i32,
    summary: &AnnualSummary,
    out: &mut impl Write,
) -> fmt::Result {
    writeln!(out, "{} - {} annual summary", company, year)?;
    writeln!(
        out,
        "Income:           {:>16}   Income VAT:    {:>16}\n\
         Material:         {:>16}   Expense VAT:   {:>16}\n\
         Labor (net WHT):  {:>16}   Contract:      {:>16}\n\
         Salary:           {:>16}   Social sec.:   {:>16}",
        fmt_currency(summary.income),
        fmt_currency(summary.income_vat),
        fmt_currency(summary.material_cost),
        fmt_currency(summary.expense_vat),
        fmt_currency(summary.labor_cost_net_of_withholding),
        fmt_currency(summary.contract_labor_cost),
        fmt_currency(summary.salary),
        fmt_currency(summary.social_security),
    )?;
    render_withholding(&WithholdingBreakdown::for_year(summary), out)?;
    writeln!(
        out,
        "\nNet profit:       {:>16}\n\
         Corporate tax:    {:>16}\n\
         Withholding credit:{:>15}\n\
         ANNUAL TAX DUE:   {:>16}",
        fmt_currency(summary.net_profit),
        fmt_currency(summary.corporate_tax),
        fmt_currency(summary.accumulated_withholding),
        fmt_currency(summary.annual_tax_payable),
    )
}

pub fn render_month_projection(
    projection: &MonthlyProjection,
    out: &mut impl Write,
) -> fmt::Result {
    writeln!(out, "What-if for {}", month_name(projection.month))?;
    writeln!(
        out,
        "VAT to pay:       {:>16}   Projected:     {:>16}",
        fmt_currency(projection.vat_to_pay),
        fmt_currency(projection.projected_vat),
    )?;
    render_withholding(&projection.withholding, out)?;
    writeln!(
        out,
        "Total withholding:{:>17}   Projected:     {:>16}\n\
         Social security:  {:>16}",
        fmt_currency(projection.withholding.total),
        fmt_currency(projection.projected_withholding),
        fmt_currency(projection.projected_social_security),
    )
}

pub fn render_year_projection(
    projection: &AnnualProjection,
    out: &mut impl Write,
) -> fmt::Result {
    writeln!(out, "What-if for the year")?;
    writeln!(
        out,
        "Corporate tax:    {:>16}\n\
         Withholding:      {:>16}   + additional {:>16}   = {:>16}\n\
         Tax due now:      {:>16}\n\
         Tax due adjusted: {:>16}\n\
         Saving:           {:>16}",
        fmt_currency(projection.corporate_tax),
        fmt_currency(projection.accumulated_withholding),
        fmt_currency(projection.additional_withholding),
        fmt_currency(projection.adjusted_withholding),
        fmt_currency(projection.annual_tax_payable),
        fmt_currency(projection.adjusted_annual_tax),
        fmt_currency(projection.tax_saving),
    )
}

pub fn render_projection(
    projection: &Projection,
    out: &mut impl Write,
) -> fmt::Result {
    match projection {
        Projection::Month(p) => render_month_projection(p, out),
        Projection::Year(p) => render_year_projection(p, out),
    }
}
