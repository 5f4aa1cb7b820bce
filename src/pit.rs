//! Personal Income Tax for sole proprietors, computed in four steps:
//! net business profit, statutory deduction, rent relief, progressive bands.
//!
//! Each step returns a full breakdown so the figure can be audited. A step
//! that fails is replaced by a pass-through breakdown carrying the error, and
//! the remaining steps still run.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::bands::{apply_bands, BandTax};
use crate::categories::{RENT_UTILITIES, STATUTORY_LEGAL};
use crate::error::Result;
use crate::fmt::amount;
use crate::ledger::LedgerAggregator;
use crate::settings::TaxRules;
use crate::validation::validate_amount;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetBusinessProfit {
    pub step: u8,
    pub step_name: &'static str,
    pub total_income: f64,
    pub deductible_categories: Vec<String>,
    pub expense_breakdown: BTreeMap<String, f64>,
    pub total_deductible_expenses: f64,
    pub net_business_profit: f64,
    pub calculation_formula: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl NetBusinessProfit {
    const NAME: &'static str = "Net Business Profit Calculation";

    fn degraded(error: String) -> Self {
        Self {
            step: 1,
            step_name: Self::NAME,
            total_income: 0.0,
            deductible_categories: Vec::new(),
            expense_breakdown: BTreeMap::new(),
            total_deductible_expenses: 0.0,
            net_business_profit: 0.0,
            calculation_formula: "",
            error: Some(error),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatutoryDeduction {
    pub step: u8,
    pub step_name: &'static str,
    pub net_business_profit_input: f64,
    pub statutory_legal_expenses: f64,
    pub adjusted_profit_after_statutory: f64,
    pub calculation_formula: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StatutoryDeduction {
    const NAME: &'static str = "Statutory & Legal Contributions Deduction";

    fn degraded(net_business_profit: f64, error: String) -> Self {
        Self {
            step: 2,
            step_name: Self::NAME,
            net_business_profit_input: net_business_profit,
            statutory_legal_expenses: 0.0,
            adjusted_profit_after_statutory: net_business_profit,
            calculation_formula: "",
            error: Some(error),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RentRelief {
    pub step: u8,
    pub step_name: &'static str,
    pub adjusted_profit_input: f64,
    pub annual_rent_utilities_expenses: f64,
    pub rent_relief_rate_amount: f64,
    pub max_rent_relief_cap: f64,
    pub calculated_rent_relief: f64,
    pub rent_relief_calculation: String,
    /// May be negative; Step 4 floors it at zero.
    pub taxable_income_after_rent_relief: f64,
    pub calculation_formula: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RentRelief {
    const NAME: &'static str = "Rent Relief Calculation and Application";

    fn degraded(adjusted_profit: f64, cap: f64, error: String) -> Self {
        Self {
            step: 3,
            step_name: Self::NAME,
            adjusted_profit_input: adjusted_profit,
            annual_rent_utilities_expenses: 0.0,
            rent_relief_rate_amount: 0.0,
            max_rent_relief_cap: cap,
            calculated_rent_relief: 0.0,
            rent_relief_calculation: String::new(),
            taxable_income_after_rent_relief: adjusted_profit,
            calculation_formula: String::new(),
            error: Some(error),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressiveTax {
    pub step: u8,
    pub step_name: &'static str,
    pub taxable_income: f64,
    pub total_tax_liability: f64,
    pub effective_tax_rate: f64,
    pub tax_band_breakdown: Vec<BandTax>,
    pub calculation_note: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProgressiveTax {
    const NAME: &'static str = "Progressive Tax Band Application";

    fn degraded(taxable_income: f64, error: String) -> Self {
        Self {
            step: 4,
            step_name: Self::NAME,
            taxable_income,
            total_tax_liability: 0.0,
            effective_tax_rate: 0.0,
            tax_band_breakdown: Vec::new(),
            calculation_note: "",
            error: Some(error),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PitSummary {
    pub total_income: f64,
    pub total_deductible_expenses: f64,
    pub statutory_expenses: f64,
    pub rent_relief: f64,
    pub taxable_income: f64,
    pub final_tax_liability: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PitCalculation {
    pub step1_net_business_profit: NetBusinessProfit,
    pub step2_statutory_deductions: StatutoryDeduction,
    pub step3_rent_relief: RentRelief,
    pub step4_progressive_tax: ProgressiveTax,
    pub final_tax_liability: f64,
    pub effective_tax_rate: f64,
    pub summary: PitSummary,
}

impl PitCalculation {
    /// Messages from every step that ran degraded.
    pub fn step_errors(&self) -> Vec<&str> {
        [
            self.step1_net_business_profit.error.as_deref(),
            self.step2_statutory_deductions.error.as_deref(),
            self.step3_rent_relief.error.as_deref(),
            self.step4_progressive_tax.error.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

/// Figures the four steps run on, however they were obtained.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PitInputs {
    pub total_income: f64,
    /// Totals for the six main business categories.
    pub business_expenses: BTreeMap<String, f64>,
    pub statutory_legal_expenses: f64,
    /// Rent the Step 3 relief is computed from.
    pub annual_rent: f64,
}

/// Step 1: income less the six main business categories. Personal and
/// statutory expenses are not part of this sum.
pub fn net_business_profit(
    total_income: f64,
    expense_breakdown: &BTreeMap<String, f64>,
) -> Result<NetBusinessProfit> {
    let total_income = validate_amount(total_income, "total_income", false)?;
    for (category, total) in expense_breakdown {
        validate_amount(*total, category, false)?;
    }
    let total_deductible_expenses: f64 = expense_breakdown.values().sum();
    let net_business_profit = total_income - total_deductible_expenses;

    Ok(NetBusinessProfit {
        step: 1,
        step_name: NetBusinessProfit::NAME,
        total_income,
        deductible_categories: expense_breakdown.keys().cloned().collect(),
        expense_breakdown: expense_breakdown.clone(),
        total_deductible_expenses,
        net_business_profit,
        calculation_formula: "Total Income - Sum of 6 Deductible Categories",
        error: None,
    })
}

/// Step 2: subtract statutory & legal contributions.
pub fn statutory_deduction(net_business_profit: f64, statutory_legal_expenses: f64) -> Result<StatutoryDeduction> {
    let statutory_legal_expenses =
        validate_amount(statutory_legal_expenses, "statutory_legal_expenses", false)?;
    Ok(StatutoryDeduction {
        step: 2,
        step_name: StatutoryDeduction::NAME,
        net_business_profit_input: net_business_profit,
        statutory_legal_expenses,
        adjusted_profit_after_statutory: net_business_profit - statutory_legal_expenses,
        calculation_formula: "Net Business Profit - Statutory & Legal Contributions",
        error: None,
    })
}

/// Step 3: relief of `min(rate × rent, cap)`.
pub fn rent_relief(adjusted_profit: f64, annual_rent: f64, rules: &TaxRules) -> Result<RentRelief> {
    let annual_rent = validate_amount(annual_rent, "annual_rent_utilities_expenses", false)?;
    let rate = rules.rent_relief_rate;
    let cap = rules.rent_relief_cap;

    let (rate_amount, relief, explanation) = if annual_rent <= 0.0 {
        (0.0, 0.0, "No rent expenses found".to_string())
    } else {
        let rate_amount = annual_rent * rate;
        let relief = rate_amount.min(cap);
        let explanation = format!(
            "min({:.0}% of {}, NGN {}) = min({}, {}) = {}",
            rate * 100.0,
            amount(annual_rent),
            amount(cap),
            amount(rate_amount),
            amount(cap),
            amount(relief)
        );
        (rate_amount, relief, explanation)
    };

    Ok(RentRelief {
        step: 3,
        step_name: RentRelief::NAME,
        adjusted_profit_input: adjusted_profit,
        annual_rent_utilities_expenses: annual_rent,
        rent_relief_rate_amount: rate_amount,
        max_rent_relief_cap: cap,
        calculated_rent_relief: relief,
        rent_relief_calculation: explanation,
        taxable_income_after_rent_relief: adjusted_profit - relief,
        calculation_formula: format!(
            "Adjusted Profit - min({:.0}% of Rent Expenses, NGN {})",
            rate * 100.0,
            amount(cap)
        ),
        error: None,
    })
}

/// Step 4: band the (already floored) taxable income. The effective
/// rate is measured against total income, not taxable income.
pub fn progressive_tax(taxable_income: f64, total_income: f64, rules: &TaxRules) -> Result<ProgressiveTax> {
    let taxable_income = validate_amount(taxable_income, "taxable_income", false)?;
    if taxable_income <= 0.0 {
        return Ok(ProgressiveTax {
            step: 4,
            step_name: ProgressiveTax::NAME,
            taxable_income,
            total_tax_liability: 0.0,
            effective_tax_rate: 0.0,
            tax_band_breakdown: Vec::new(),
            calculation_note: "No tax liability due to zero or negative taxable income",
            error: None,
        });
    }

    let (tax_band_breakdown, total_tax) = apply_bands(taxable_income, &rules.pit_bands);
    let total_tax = validate_amount(total_tax, "final_tax_liability", false)?;
    let effective_tax_rate = if total_income > 0.0 {
        total_tax / total_income * 100.0
    } else {
        0.0
    };

    Ok(ProgressiveTax {
        step: 4,
        step_name: ProgressiveTax::NAME,
        taxable_income,
        total_tax_liability: total_tax,
        effective_tax_rate,
        tax_band_breakdown,
        calculation_note: "Progressive tax bands applied to taxable income",
        error: None,
    })
}

/// Runs all four steps over `inputs`. Never fails: a failing step is logged
/// and replaced by its pass-through breakdown.
pub fn compute_pit(inputs: &PitInputs, rules: &TaxRules) -> PitCalculation {
    let step1 = net_business_profit(inputs.total_income, &inputs.business_expenses).unwrap_or_else(|e| {
        tracing::warn!("PIT step 1 degraded: {e}");
        NetBusinessProfit::degraded(e.to_string())
    });
    tracing::info!("PIT step 1: net business profit {}", step1.net_business_profit);

    let profit = step1.net_business_profit;
    let step2 = statutory_deduction(profit, inputs.statutory_legal_expenses).unwrap_or_else(|e| {
        tracing::warn!("PIT step 2 degraded: {e}");
        StatutoryDeduction::degraded(profit, e.to_string())
    });
    tracing::info!("PIT step 2: adjusted profit {}", step2.adjusted_profit_after_statutory);

    let adjusted = step2.adjusted_profit_after_statutory;
    let step3 = rent_relief(adjusted, inputs.annual_rent, rules).unwrap_or_else(|e| {
        tracing::warn!("PIT step 3 degraded: {e}");
        RentRelief::degraded(adjusted, rules.rent_relief_cap, e.to_string())
    });
    tracing::info!(
        "PIT step 3: rent relief {}, taxable income {}",
        step3.calculated_rent_relief,
        step3.taxable_income_after_rent_relief
    );

    let taxable_income = step3.taxable_income_after_rent_relief.max(0.0);
    let step4 = progressive_tax(taxable_income, step1.total_income, rules).unwrap_or_else(|e| {
        tracing::warn!("PIT step 4 degraded: {e}");
        ProgressiveTax::degraded(taxable_income, e.to_string())
    });

    let final_tax_liability = step4.total_tax_liability;
    tracing::info!("PIT step 4: taxable income {taxable_income}, total tax {final_tax_liability}");

    PitCalculation {
        summary: PitSummary {
            total_income: step1.total_income,
            total_deductible_expenses: step1.total_deductible_expenses,
            statutory_expenses: step2.statutory_legal_expenses,
            rent_relief: step3.calculated_rent_relief,
            taxable_income,
            final_tax_liability,
        },
        effective_tax_rate: step4.effective_tax_rate,
        final_tax_liability,
        step1_net_business_profit: step1,
        step2_statutory_deductions: step2,
        step3_rent_relief: step3,
        step4_progressive_tax: step4,
    }
}

/// Runs the four steps on a taxpayer's ledger. Rent relief is taken from
/// the same rent & utilities total that Step 1 deducts.
pub struct PitCalculator<'a> {
    aggregator: &'a LedgerAggregator<'a>,
    rules: &'a TaxRules,
}

impl<'a> PitCalculator<'a> {
    pub fn new(aggregator: &'a LedgerAggregator<'a>, rules: &'a TaxRules) -> Self {
        Self { aggregator, rules }
    }

    fn expense(&self, taxpayer_id: &str, tax_year: i32, category: &str) -> f64 {
        self.aggregator
            .get_expenses_by_categories(taxpayer_id, tax_year, &[category])
            .get(category)
            .copied()
            .unwrap_or(0.0)
    }

    /// Reads every figure the four steps need, once.
    pub fn inputs(&self, taxpayer_id: &str, tax_year: i32) -> PitInputs {
        let categories = self.aggregator.registry().main_business_keys();
        PitInputs {
            total_income: self.aggregator.get_total_income(taxpayer_id, tax_year),
            business_expenses: self
                .aggregator
                .get_expenses_by_categories(taxpayer_id, tax_year, &categories),
            statutory_legal_expenses: self.expense(taxpayer_id, tax_year, STATUTORY_LEGAL),
            annual_rent: self.expense(taxpayer_id, tax_year, RENT_UTILITIES),
        }
    }

    pub fn net_business_profit(&self, taxpayer_id: &str, tax_year: i32) -> Result<NetBusinessProfit> {
        let categories = self.aggregator.registry().main_business_keys();
        net_business_profit(
            self.aggregator.get_total_income(taxpayer_id, tax_year),
            &self
                .aggregator
                .get_expenses_by_categories(taxpayer_id, tax_year, &categories),
        )
    }

    pub fn statutory_deduction(
        &self,
        net_business_profit: f64,
        taxpayer_id: &str,
        tax_year: i32,
    ) -> Result<StatutoryDeduction> {
        statutory_deduction(net_business_profit, self.expense(taxpayer_id, tax_year, STATUTORY_LEGAL))
    }

    pub fn rent_relief(&self, adjusted_profit: f64, taxpayer_id: &str, tax_year: i32) -> Result<RentRelief> {
        rent_relief(adjusted_profit, self.expense(taxpayer_id, tax_year, RENT_UTILITIES), self.rules)
    }

    pub fn progressive_tax(&self, taxable_income: f64, total_income: f64) -> Result<ProgressiveTax> {
        progressive_tax(taxable_income, total_income, self.rules)
    }

    pub fn calculate(&self, taxpayer_id: &str, tax_year: i32) -> PitCalculation {
        let calc = compute_pit(&self.inputs(taxpayer_id, tax_year), self.rules);
        tracing::info!(
            "completed PIT calculation for {taxpayer_id} in {tax_year}: final tax {}",
            calc.final_tax_liability
        );
        calc
    }
}
