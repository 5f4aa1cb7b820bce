use ficore::db::{get_annual_rent, set_annual_rent};
use ficore::error::Result;
use ficore::fmt::naira;
use ficore::validation::{parse_amount, validate_taxpayer_id};

use super::open_ledger;

pub fn set(taxpayer: &str, amount: &str) -> Result<()> {
    let taxpayer = validate_taxpayer_id(taxpayer)?;
    let amount = parse_amount(amount, "annual_rent", false)?;
    let conn = open_ledger()?;
    set_annual_rent(&conn, taxpayer, amount)?;
    println!("Annual rent for {taxpayer} set to {}", naira(amount));
    Ok(())
}

pub fn show(taxpayer: &str) -> Result<()> {
    let taxpayer = validate_taxpayer_id(taxpayer)?;
    let conn = open_ledger()?;
    match get_annual_rent(&conn, taxpayer)? {
        Some(rent) => println!("{taxpayer}: annual rent {}", naira(rent)),
        None => println!("{taxpayer}: no annual rent stored"),
    }
    Ok(())
}
