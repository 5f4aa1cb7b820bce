use ficore::categories::CategoryRegistry;
use ficore::db;
use ficore::error::Result;
use ficore::fmt::naira;
use ficore::validation::{parse_amount, validate_taxpayer_id};

use super::{open_ledger, resolve_year};

pub fn receipt(taxpayer: &str, amount: &str, year: Option<i32>, description: Option<&str>) -> Result<()> {
    let taxpayer = validate_taxpayer_id(taxpayer)?;
    let year = resolve_year(year)?;
    let amount = parse_amount(amount, "amount", false)?;
    let conn = open_ledger()?;
    let id = db::record_receipt(&conn, taxpayer, year, amount, description)?;
    println!("Recorded receipt #{id}: {} for {taxpayer} ({year})", naira(amount));
    Ok(())
}

pub fn payment(
    taxpayer: &str,
    category: &str,
    amount: &str,
    year: Option<i32>,
    description: Option<&str>,
) -> Result<()> {
    let taxpayer = validate_taxpayer_id(taxpayer)?;
    let year = resolve_year(year)?;
    let amount = parse_amount(amount, "amount", false)?;
    let registry = CategoryRegistry::nta_2025();
    let conn = open_ledger()?;
    let id = db::record_payment(&conn, &registry, taxpayer, year, category, amount, description)?;
    let note = if registry.is_tax_deductible(category) {
        ""
    } else {
        " (not tax deductible)"
    };
    println!(
        "Recorded payment #{id}: {} under {} for {taxpayer} ({year}){note}",
        naira(amount),
        category.trim()
    );
    Ok(())
}
