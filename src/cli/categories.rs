use colored::Colorize;
use comfy_table::{Cell, Table};

use ficore::categories::CategoryRegistry;
use ficore::error::Result;

pub fn list() -> Result<()> {
    let registry = CategoryRegistry::nta_2025();

    let mut table = Table::new();
    table.set_header(vec!["Key", "Name", "Deductible", "Examples"]);
    for (key, label) in registry.form_choices() {
        let Some(cat) = registry.get_category_metadata(key) else {
            continue;
        };
        let deductible = if cat.tax_deductible {
            "yes".green()
        } else {
            "no".red()
        };
        table.add_row(vec![
            Cell::new(key),
            Cell::new(label),
            Cell::new(deductible),
            Cell::new(cat.examples.join(", ")),
        ]);
    }
    println!("Expense Categories (NTA 2025)\n{table}");
    Ok(())
}
