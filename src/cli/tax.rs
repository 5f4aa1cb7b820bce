use colored::Colorize;
use comfy_table::{Cell, Table};

use ficore::categories::CategoryRegistry;
use ficore::cit::CitCalculation;
use ficore::engine::{CalculationResult, Liability, TaxEngine};
use ficore::error::{ErrorResponse, Result};
use ficore::fmt::{naira, percent};
use ficore::ledger::SqliteLedger;
use ficore::pit::PitCalculation;
use ficore::settings::load_settings;

use super::{current_year, db_path, open_ledger, print_json};

pub fn run(taxpayer: &str, year: Option<i32>, json: bool) -> Result<()> {
    let settings = load_settings();
    let registry = CategoryRegistry::nta_2025();
    let conn = if db_path().exists() {
        Some(open_ledger()?)
    } else {
        None
    };
    let ledger = conn.as_ref().map(SqliteLedger::new);

    let mut engine = TaxEngine::new(&registry, &settings.rules).with_current_year(current_year);
    if let Some(ledger) = &ledger {
        engine = engine.with_ledger(ledger);
    }

    let result = match engine.calculate_tax_liability(taxpayer, year) {
        Ok(result) => result,
        Err(e) => {
            if json {
                print_json(&ErrorResponse::from_error(&e, Some(taxpayer)))?;
            }
            return Err(e);
        }
    };

    if json {
        return print_json(&result);
    }
    print_header(&result);
    match &result.liability {
        Liability::Pit(pit) => print_pit(pit),
        Liability::Cit(cit) => print_cit(cit),
    }
    Ok(())
}

fn print_header(result: &CalculationResult) {
    let info = result.entity_type.info();
    println!(
        "{} {} ({})",
        "Tax year".bold(),
        result.tax_year,
        result.taxpayer_id
    );
    println!("{} {}", "Entity".bold(), info.name);
    println!("{} {}\n", "Tax".bold(), info.tax_type);
}

pub(crate) fn print_pit(pit: &PitCalculation) {
    let mut table = Table::new();
    table.set_header(vec!["Step", "Description", "Amount"]);
    let s1 = &pit.step1_net_business_profit;
    let s2 = &pit.step2_statutory_deductions;
    let s3 = &pit.step3_rent_relief;
    let rows = [
        ("", "Total income", s1.total_income),
        ("1", "Less business expenses", s1.total_deductible_expenses),
        ("", "Net business profit", s1.net_business_profit),
        ("2", "Less statutory & legal", s2.statutory_legal_expenses),
        ("", "Adjusted profit", s2.adjusted_profit_after_statutory),
        ("3", "Less rent relief", s3.calculated_rent_relief),
        ("", "Taxable income", pit.summary.taxable_income),
    ];
    for (step, label, value) in rows {
        table.add_row(vec![Cell::new(step), Cell::new(label), Cell::new(naira(value))]);
    }
    table.add_row(vec![
        Cell::new("4"),
        Cell::new("Tax liability".bold()),
        Cell::new(naira(pit.final_tax_liability).bold()),
    ]);
    println!("Personal Income Tax\n{table}");

    if !pit.step4_progressive_tax.tax_band_breakdown.is_empty() {
        let mut bands = Table::new();
        bands.set_header(vec!["Band", "Rate", "Taxable", "Tax"]);
        for band in &pit.step4_progressive_tax.tax_band_breakdown {
            bands.add_row(vec![
                Cell::new(&band.band_description),
                Cell::new(percent(band.tax_rate * 100.0)),
                Cell::new(naira(band.taxable_amount_in_band)),
                Cell::new(naira(band.tax_in_band)),
            ]);
        }
        println!("\nTax Bands\n{bands}");
    }

    println!("\nEffective rate: {}", percent(pit.effective_tax_rate));
    for err in pit.step_errors() {
        println!("{} {err}", "Warning:".yellow().bold());
    }
}

pub(crate) fn print_cit(cit: &CitCalculation) {
    let mut table = Table::new();
    table.set_header(vec!["Item", "Amount"]);
    table.add_row(vec![Cell::new("Total revenue"), Cell::new(naira(cit.total_revenue))]);
    table.add_row(vec![
        Cell::new("Small company threshold"),
        Cell::new(naira(cit.revenue_threshold)),
    ]);
    if let Some(breakdown) = &cit.taxable_income_breakdown {
        table.add_row(vec![
            Cell::new("Less business expenses"),
            Cell::new(naira(breakdown.total_business_expenses)),
        ]);
    }
    table.add_row(vec![Cell::new("Taxable income"), Cell::new(naira(cit.taxable_income))]);
    table.add_row(vec![Cell::new("Rate"), Cell::new(percent(cit.tax_rate * 100.0))]);
    table.add_row(vec![
        Cell::new("Tax liability".bold()),
        Cell::new(naira(cit.tax_liability).bold()),
    ]);
    println!("Companies Income Tax\n{table}");

    if let Some(reason) = &cit.exemption_reason {
        println!("\n{} {reason}", "Exempt:".green().bold());
    }
    println!("\nEffective rate: {}", percent(cit.effective_tax_rate));
    if let Some(err) = &cit.error {
        println!("{} {err}", "Warning:".yellow().bold());
    }
}
