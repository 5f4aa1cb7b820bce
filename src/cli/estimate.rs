use colored::Colorize;

use ficore::categories::CategoryRegistry;
use ficore::db::get_annual_rent;
use ficore::engine::Liability;
use ficore::entity::{get_entity_type, EntityType};
use ficore::error::{ErrorResponse, Result, TaxError};
use ficore::estimate::{estimate, EstimateInputs};
use ficore::ledger::SqliteLedger;
use ficore::settings::load_settings;
use ficore::validation::validate_taxpayer_id;

use super::tax::{print_cit, print_pit};
use super::{db_path, open_ledger, print_json};

fn parse_expense_arg(arg: &str) -> Result<(String, String)> {
    match arg.split_once('=') {
        Some((category, amount)) => Ok((category.trim().to_string(), amount.trim().to_string())),
        None => Err(TaxError::validation(
            "expense",
            arg,
            format!("Expected CATEGORY=AMOUNT, got '{arg}'"),
        )),
    }
}

pub fn run(
    income: &str,
    expenses: &[String],
    rent: Option<&str>,
    taxpayer: Option<&str>,
    entity: Option<&str>,
    json: bool,
) -> Result<()> {
    let settings = load_settings();
    let registry = CategoryRegistry::nta_2025();
    let expenses = expenses
        .iter()
        .map(|e| parse_expense_arg(e))
        .collect::<Result<Vec<_>>>()?;
    let taxpayer = taxpayer.map(validate_taxpayer_id).transpose()?;

    let conn = match taxpayer {
        Some(_) if db_path().exists() => Some(open_ledger()?),
        _ => None,
    };
    let entity_type = match (entity, &conn, taxpayer) {
        (Some(key), _, _) => key.parse::<EntityType>()?,
        (None, Some(conn), Some(id)) => get_entity_type(&SqliteLedger::new(conn), id),
        _ => EntityType::default(),
    };

    let mut inputs = EstimateInputs::from_raw(&registry, income, &expenses, rent);
    if inputs.annual_rent.is_none() {
        if let (Some(conn), Some(id)) = (&conn, taxpayer) {
            inputs.annual_rent = get_annual_rent(conn, id)?;
        }
    }

    let result = match estimate(&inputs, entity_type, &registry, &settings.rules) {
        Ok(result) => result,
        Err(e) => {
            if json {
                print_json(&ErrorResponse::from_error(&e, taxpayer))?;
            }
            return Err(e);
        }
    };

    if json {
        return print_json(&result);
    }
    let info = result.entity_type.info();
    println!("{} {} ({})\n", "Estimate".bold(), info.name, info.tax_type);
    match &result.liability {
        Liability::Pit(pit) => print_pit(pit),
        Liability::Cit(cit) => print_cit(cit),
    }
    for warning in &result.calculation_warnings {
        println!("{} {warning}", "Warning:".yellow().bold());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_expense_arg() {
        assert_eq!(
            parse_expense_arg(" cogs = 1,000 ").unwrap(),
            ("cogs".to_string(), "1,000".to_string())
        );
        assert_eq!(parse_expense_arg("cogs").unwrap_err().code(), "VALIDATION_ERROR");
    }
}
