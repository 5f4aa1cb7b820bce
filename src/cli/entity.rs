use comfy_table::{Cell, Table};

use ficore::entity::{get_entity_type, set_entity_type, EntityType};
use ficore::error::Result;
use ficore::ledger::SqliteLedger;
use ficore::validation::validate_taxpayer_id;

use super::open_ledger;

pub fn set(taxpayer: &str, entity_type: &str) -> Result<()> {
    let taxpayer = validate_taxpayer_id(taxpayer)?;
    let entity: EntityType = entity_type.parse()?;
    let conn = open_ledger()?;
    set_entity_type(&conn, taxpayer, entity)?;
    println!("Set {taxpayer} to {} ({})", entity.info().name, entity.info().tax_type);
    Ok(())
}

pub fn show(taxpayer: &str) -> Result<()> {
    let taxpayer = validate_taxpayer_id(taxpayer)?;
    let conn = open_ledger()?;
    let entity = get_entity_type(&SqliteLedger::new(&conn), taxpayer);
    let info = entity.info();
    println!("{taxpayer}: {entity} ({})\n  {}", info.name, info.tax_type);
    Ok(())
}

pub fn types() -> Result<()> {
    let mut table = Table::new();
    table.set_header(vec!["Key", "Name", "Tax", "Details"]);
    for entity in EntityType::ALL {
        let info = entity.info();
        table.add_row(vec![
            Cell::new(entity.key()),
            Cell::new(info.name),
            Cell::new(info.tax_type),
            Cell::new(info.tax_details),
        ]);
    }
    println!("Entity Types\n{table}");
    Ok(())
}
