use std::path::Path;

use rusqlite::Connection;

use crate::categories::CategoryRegistry;
use crate::error::{Result, TaxError};
use crate::models::CashflowKind;
use crate::validation::validate_amount;

pub const DB_FILE: &str = "ficore.db";

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS cashflows (
    id INTEGER PRIMARY KEY,
    taxpayer_id TEXT NOT NULL,
    type TEXT NOT NULL CHECK (type IN ('receipt', 'payment')),
    expense_category TEXT,
    amount REAL NOT NULL,
    tax_year INTEGER NOT NULL,
    is_tax_deductible INTEGER DEFAULT 0,
    description TEXT,
    created_at TEXT DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_cashflows_taxpayer_year
    ON cashflows (taxpayer_id, tax_year, type);

CREATE TABLE IF NOT EXISTS entities (
    taxpayer_id TEXT PRIMARY KEY,
    business_entity_type TEXT NOT NULL,
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS annual_rents (
    taxpayer_id TEXT PRIMARY KEY,
    annual_rent REAL NOT NULL,
    updated_at TEXT DEFAULT (datetime('now'))
);
";

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

pub fn record_receipt(
    conn: &Connection,
    taxpayer_id: &str,
    tax_year: i32,
    amount: f64,
    description: Option<&str>,
) -> Result<i64> {
    let amount = validate_amount(amount, "amount", false)?;
    conn.execute(
        "INSERT INTO cashflows (taxpayer_id, type, amount, tax_year, description) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![taxpayer_id, CashflowKind::Receipt.key(), amount, tax_year, description],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Stores a categorised payment; the deductible flag comes from `registry`.
pub fn record_payment(
    conn: &Connection,
    registry: &CategoryRegistry,
    taxpayer_id: &str,
    tax_year: i32,
    category: &str,
    amount: f64,
    description: Option<&str>,
) -> Result<i64> {
    let problems = registry.validate_category_assignment(category, amount, description);
    if !problems.is_empty() {
        return Err(TaxError::validation("expense_category", category, problems.join("; ")));
    }
    let category = category.trim();
    conn.execute(
        "INSERT INTO cashflows \
         (taxpayer_id, type, expense_category, amount, tax_year, is_tax_deductible, description) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        rusqlite::params![
            taxpayer_id,
            CashflowKind::Payment.key(),
            category,
            amount,
            tax_year,
            registry.is_tax_deductible(category),
            description
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Stores the annual rent used for rent relief in estimates.
pub fn set_annual_rent(conn: &Connection, taxpayer_id: &str, annual_rent: f64) -> Result<()> {
    let annual_rent = validate_amount(annual_rent, "annual_rent", false)?;
    conn.execute(
        "INSERT INTO annual_rents (taxpayer_id, annual_rent) VALUES (?1, ?2) \
         ON CONFLICT(taxpayer_id) DO UPDATE SET \
         annual_rent = excluded.annual_rent, updated_at = datetime('now')",
        rusqlite::params![taxpayer_id, annual_rent],
    )?;
    tracing::info!("updated annual rent for {taxpayer_id}");
    Ok(())
}

pub fn get_annual_rent(conn: &Connection, taxpayer_id: &str) -> Result<Option<f64>> {
    let mut stmt = conn.prepare("SELECT annual_rent FROM annual_rents WHERE taxpayer_id = ?1")?;
    let mut rows = stmt.query_map([taxpayer_id], |row| row.get::<_, f64>(0))?;
    Ok(rows.next().transpose()?)
}
