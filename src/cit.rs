use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::Result;
use crate::fmt::{amount, naira};
use crate::ledger::LedgerAggregator;
use crate::settings::TaxRules;
use crate::validation::validate_amount;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CitTaxableIncome {
    pub total_income: f64,
    pub business_expense_categories: Vec<String>,
    pub expense_breakdown: BTreeMap<String, f64>,
    pub total_business_expenses: f64,
    /// Revenue less every deductible business expense; may be negative.
    pub taxable_income: f64,
    pub calculation_formula: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CitCalculation {
    pub total_revenue: f64,
    pub revenue_threshold: f64,
    pub exemption_applied: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exemption_reason: Option<String>,
    pub tax_rate: f64,
    pub taxable_income: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub taxable_income_breakdown: Option<CitTaxableIncome>,
    pub tax_liability: f64,
    pub effective_tax_rate: f64,
    pub calculation_note: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CitCalculation {
    fn degraded(threshold: f64, error: String) -> Self {
        Self {
            total_revenue: 0.0,
            revenue_threshold: threshold,
            exemption_applied: false,
            exemption_reason: None,
            tax_rate: 0.0,
            taxable_income: 0.0,
            taxable_income_breakdown: None,
            tax_liability: 0.0,
            effective_tax_rate: 0.0,
            calculation_note: String::new(),
            error: Some(error),
        }
    }
}

/// Revenue less every deductible business expense in `expense_breakdown`.
pub fn cit_taxable_income(
    total_income: f64,
    expense_breakdown: &BTreeMap<String, f64>,
) -> Result<CitTaxableIncome> {
    let total_income = validate_amount(total_income, "total_income", false)?;
    for (category, total) in expense_breakdown {
        validate_amount(*total, category, false)?;
    }
    let total_business_expenses: f64 = expense_breakdown.values().sum();
    Ok(CitTaxableIncome {
        total_income,
        business_expense_categories: expense_breakdown.keys().cloned().collect(),
        expense_breakdown: expense_breakdown.clone(),
        total_business_expenses,
        taxable_income: total_income - total_business_expenses,
        calculation_formula: "Total Income - All Business Expenses",
    })
}

/// Companies Income Tax on supplied figures: small companies (revenue at or
/// below the threshold) are exempt, and their expenses are not examined.
/// Larger ones pay a flat rate on revenue less all deductible business
/// expenses.
pub fn compute_cit(
    revenue: f64,
    expense_breakdown: &BTreeMap<String, f64>,
    rules: &TaxRules,
) -> Result<CitCalculation> {
    let threshold = rules.cit_revenue_threshold;
    let revenue = validate_amount(revenue, "total_income", false)?;

    if revenue <= threshold {
        return Ok(CitCalculation {
            total_revenue: revenue,
            revenue_threshold: threshold,
            exemption_applied: true,
            exemption_reason: Some(format!(
                "Small company exemption (revenue ≤{})",
                naira(threshold).trim_end_matches(".00")
            )),
            tax_rate: 0.0,
            taxable_income: 0.0,
            taxable_income_breakdown: None,
            tax_liability: 0.0,
            effective_tax_rate: 0.0,
            calculation_note: "No tax liability due to small company exemption".to_string(),
            error: None,
        });
    }

    let breakdown = cit_taxable_income(revenue, expense_breakdown)?;
    let taxable_income = breakdown.taxable_income;
    let rate = rules.cit_rate;
    let tax_liability = validate_amount(taxable_income.max(0.0) * rate, "tax_liability", false)?;

    Ok(CitCalculation {
        total_revenue: revenue,
        revenue_threshold: threshold,
        exemption_applied: false,
        exemption_reason: None,
        tax_rate: rate,
        taxable_income,
        taxable_income_breakdown: Some(breakdown),
        tax_liability,
        effective_tax_rate: tax_liability / revenue * 100.0,
        calculation_note: format!(
            "Taxable Income × {:.0}% = ₦{} × {:.0}% = ₦{}",
            rate * 100.0,
            amount(taxable_income),
            rate * 100.0,
            amount(tax_liability)
        ),
        error: None,
    })
}

/// Runs [`compute_cit`] on a taxpayer's ledger.
pub struct CitCalculator<'a> {
    aggregator: &'a LedgerAggregator<'a>,
    rules: &'a TaxRules,
}

impl<'a> CitCalculator<'a> {
    pub fn new(aggregator: &'a LedgerAggregator<'a>, rules: &'a TaxRules) -> Self {
        Self { aggregator, rules }
    }

    fn business_expenses(&self, taxpayer_id: &str, tax_year: i32) -> BTreeMap<String, f64> {
        let categories = self.aggregator.registry().cit_deductible_keys();
        self.aggregator
            .get_expenses_by_categories(taxpayer_id, tax_year, &categories)
    }

    pub fn try_calculate(&self, taxpayer_id: &str, tax_year: i32) -> Result<CitCalculation> {
        let revenue = self.aggregator.get_total_income(taxpayer_id, tax_year);
        let threshold = self.rules.cit_revenue_threshold;
        tracing::info!("CIT revenue {revenue} against threshold {threshold} for {taxpayer_id}");

        let expenses = if revenue > threshold {
            self.business_expenses(taxpayer_id, tax_year)
        } else {
            BTreeMap::new()
        };
        let calc = compute_cit(revenue, &expenses, self.rules)?;
        if calc.exemption_applied {
            tracing::info!("CIT small company exemption for {taxpayer_id} in {tax_year}");
        } else {
            tracing::info!("CIT liability {} for {taxpayer_id} in {tax_year}", calc.tax_liability);
        }
        Ok(calc)
    }

    /// Like [`try_calculate`](Self::try_calculate) but reports failures as a
    /// zeroed result carrying the error.
    pub fn calculate(&self, taxpayer_id: &str, tax_year: i32) -> CitCalculation {
        self.try_calculate(taxpayer_id, tax_year).unwrap_or_else(|e| {
            tracing::error!("CIT calculation failed for {taxpayer_id} in {tax_year}: {e}");
            CitCalculation::degraded(self.rules.cit_revenue_threshold, e.to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::categories::CategoryRegistry;
    use crate::ledger::{LedgerSource, MemoryLedger};

    fn run(ledger: &MemoryLedger) -> CitCalculation {
        let reg = CategoryRegistry::nta_2025();
        let rules = TaxRules::default();
        let agg = LedgerAggregator::new(ledger, &reg);
        CitCalculator::new(&agg, &rules).calculate("acme", 2025)
    }

    #[test]
    fn test_exempt_at_threshold() {
        let ledger = MemoryLedger::new(&CategoryRegistry::nta_2025()).receipt("acme", 2025, 50_000_000.0);
        let calc = run(&ledger);
        assert!(calc.exemption_applied);
        assert_eq!(calc.tax_liability, 0.0);
        assert_eq!(calc.tax_rate, 0.0);
        assert_eq!(calc.effective_tax_rate, 0.0);
        assert_eq!(
            calc.exemption_reason.as_deref(),
            Some("Small company exemption (revenue ≤₦50,000,000)")
        );
    }

    #[test]
    fn test_just_above_threshold_no_expenses() {
        let revenue = 50_000_000.01;
        let ledger = MemoryLedger::new(&CategoryRegistry::nta_2025()).receipt("acme", 2025, revenue);
        let calc = run(&ledger);
        assert!(!calc.exemption_applied);
        assert_eq!(calc.tax_liability, revenue * 0.30);
        assert!((calc.effective_tax_rate - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_large_company() {
        let ledger = MemoryLedger::new(&CategoryRegistry::nta_2025())
            .receipt("acme", 2025, 80_000_000.0)
            .payment("acme", 2025, "cogs", 10_000_000.0)
            .payment("acme", 2025, "staff_wages", 6_000_000.0)
            .payment("acme", 2025, "rent_utilities", 2_000_000.0)
            .payment("acme", 2025, "statutory_legal", 2_000_000.0)
            .payment("acme", 2025, "personal_expenses", 9_000_000.0);
        let calc = run(&ledger);
        assert_eq!(calc.taxable_income, 60_000_000.0);
        assert!((calc.tax_liability - 18_000_000.0).abs() < 1e-6);
        assert!((calc.effective_tax_rate - 22.5).abs() < 1e-9);
        let breakdown = calc.taxable_income_breakdown.unwrap();
        assert_eq!(breakdown.expense_breakdown.len(), 7);
        assert_eq!(breakdown.total_business_expenses, 20_000_000.0);
        assert!(!breakdown.expense_breakdown.contains_key("personal_expenses"));
    }

    #[test]
    fn test_expenses_above_revenue_floor_liability() {
        let ledger = MemoryLedger::new(&CategoryRegistry::nta_2025())
            .receipt("acme", 2025, 60_000_000.0)
            .payment("acme", 2025, "cogs", 70_000_000.0);
        let calc = run(&ledger);
        assert_eq!(calc.taxable_income, -10_000_000.0);
        assert_eq!(calc.tax_liability, 0.0);
        assert_eq!(calc.effective_tax_rate, 0.0);
    }

    #[test]
    fn test_failure_is_degraded() {
        let ledger = MemoryLedger::new(&CategoryRegistry::nta_2025()).receipt("acme", 2025, f64::NAN);
        let calc = run(&ledger);
        assert!(calc.error.is_some());
        assert_eq!(calc.tax_liability, 0.0);
        assert_eq!(calc.revenue_threshold, 50_000_000.0);
    }

    #[test]
    fn test_custom_threshold() {
        let ledger = MemoryLedger::new(&CategoryRegistry::nta_2025()).receipt("acme", 2025, 30_000_000.0);
        let reg = CategoryRegistry::nta_2025();
        let rules = TaxRules {
            cit_revenue_threshold: 25_000_000.0,
            ..TaxRules::default()
        };
        let agg = LedgerAggregator::new(&ledger, &reg);
        let calc = CitCalculator::new(&agg, &rules).try_calculate("acme", 2025).unwrap();
        assert!(!calc.exemption_applied);
        assert!((calc.tax_liability - 9_000_000.0).abs() < 1e-6);
    }

    /// Counts ledger reads so a single calculation can be checked for
    /// re-reading income.
    struct CountingLedger {
        inner: MemoryLedger,
        income_reads: std::cell::Cell<usize>,
    }

    impl LedgerSource for CountingLedger {
        fn total_income(&self, id: &str, year: i32) -> Result<f64> {
            self.income_reads.set(self.income_reads.get() + 1);
            self.inner.total_income(id, year)
        }

        fn expense_totals(&self, id: &str, year: i32, cats: &[&str]) -> Result<Vec<(String, f64)>> {
            self.inner.expense_totals(id, year, cats)
        }

        fn payment_records(
            &self,
            id: &str,
            year: i32,
            cats: &[&str],
        ) -> Result<Vec<crate::models::CashflowRecord>> {
            self.inner.payment_records(id, year, cats)
        }

        fn entity_type(&self, id: &str) -> Result<Option<String>> {
            self.inner.entity_type(id)
        }
    }

    #[test]
    fn test_income_read_once_per_calculation() {
        let ledger = CountingLedger {
            inner: MemoryLedger::new(&CategoryRegistry::nta_2025())
                .receipt("acme", 2025, 80_000_000.0)
                .payment("acme", 2025, "cogs", 20_000_000.0),
            income_reads: std::cell::Cell::new(0),
        };
        let reg = CategoryRegistry::nta_2025();
        let rules = TaxRules::default();
        let agg = LedgerAggregator::new(&ledger, &reg);
        let calc = CitCalculator::new(&agg, &rules).try_calculate("acme", 2025).unwrap();
        assert!((calc.tax_liability - 18_000_000.0).abs() < 1e-6);
        assert_eq!(ledger.income_reads.get(), 1);
    }

    #[test]
    fn test_compute_cit_on_supplied_figures() {
        let rules = TaxRules::default();
        let expenses = BTreeMap::from([
            ("cogs".to_string(), 18_000_000.0),
            ("statutory_legal".to_string(), 2_000_000.0),
        ]);
        let calc = compute_cit(80_000_000.0, &expenses, &rules).unwrap();
        assert_eq!(calc.taxable_income, 60_000_000.0);
        assert!((calc.effective_tax_rate - 22.5).abs() < 1e-9);

        // Exempt companies are not held to their expense figures.
        let bad = BTreeMap::from([("cogs".to_string(), f64::NAN)]);
        assert!(compute_cit(40_000_000.0, &bad, &rules).unwrap().exemption_applied);
        assert!(compute_cit(60_000_000.0, &bad, &rules).is_err());
    }
}
