use std::collections::{BTreeMap, HashMap};

use rusqlite::types::ToSql;
use rusqlite::Connection;

use crate::categories::CategoryRegistry;
use crate::error::Result;
use crate::models::{CashflowKind, CashflowRecord};

/// Read access to a taxpayer's bookkeeping records.
///
/// Implementations report absence as zero or empty rather than as an error;
/// errors mean the store itself could not be read.
pub trait LedgerSource {
    /// Sum of receipt amounts for the taxpayer and year.
    fn total_income(&self, taxpayer_id: &str, tax_year: i32) -> Result<f64>;

    /// Grouped payment totals for the given categories. Categories without
    /// payments may be omitted.
    fn expense_totals(
        &self,
        taxpayer_id: &str,
        tax_year: i32,
        categories: &[&str],
    ) -> Result<Vec<(String, f64)>>;

    /// Individual payment records in the given categories.
    fn payment_records(
        &self,
        taxpayer_id: &str,
        tax_year: i32,
        categories: &[&str],
    ) -> Result<Vec<CashflowRecord>>;

    /// Stored entity type key, if the taxpayer has one.
    fn entity_type(&self, taxpayer_id: &str) -> Result<Option<String>>;
}

// ---------------------------------------------------------------------------
// SQLite
// ---------------------------------------------------------------------------

pub struct SqliteLedger<'c> {
    conn: &'c Connection,
}

impl<'c> SqliteLedger<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }
}

fn category_placeholders(first: usize, count: usize) -> String {
    (first..first + count)
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ")
}

impl LedgerSource for SqliteLedger<'_> {
    fn total_income(&self, taxpayer_id: &str, tax_year: i32) -> Result<f64> {
        let total: f64 = self.conn.query_row(
            "SELECT COALESCE(SUM(amount), 0.0) FROM cashflows \
             WHERE taxpayer_id = ?1 AND type = 'receipt' AND tax_year = ?2",
            rusqlite::params![taxpayer_id, tax_year],
            |row| row.get(0),
        )?;
        Ok(total)
    }

    fn expense_totals(
        &self,
        taxpayer_id: &str,
        tax_year: i32,
        categories: &[&str],
    ) -> Result<Vec<(String, f64)>> {
        if categories.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT expense_category, SUM(amount) as total FROM cashflows \
             WHERE taxpayer_id = ?1 AND type = 'payment' AND tax_year = ?2 \
             AND expense_category IN ({}) \
             GROUP BY expense_category",
            category_placeholders(3, categories.len())
        );
        let mut params: Vec<&dyn ToSql> = vec![&taxpayer_id, &tax_year];
        params.extend(categories.iter().map(|c| c as &dyn ToSql));
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params.as_slice(), |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
        })?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    fn payment_records(
        &self,
        taxpayer_id: &str,
        tax_year: i32,
        categories: &[&str],
    ) -> Result<Vec<CashflowRecord>> {
        if categories.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT id, taxpayer_id, expense_category, amount, tax_year, is_tax_deductible, description \
             FROM cashflows \
             WHERE taxpayer_id = ?1 AND type = 'payment' AND tax_year = ?2 \
             AND expense_category IN ({}) \
             ORDER BY created_at DESC, id DESC",
            category_placeholders(3, categories.len())
        );
        let mut params: Vec<&dyn ToSql> = vec![&taxpayer_id, &tax_year];
        params.extend(categories.iter().map(|c| c as &dyn ToSql));
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params.as_slice(), |row| {
            Ok(CashflowRecord {
                id: row.get(0)?,
                taxpayer_id: row.get(1)?,
                kind: CashflowKind::Payment,
                expense_category: row.get(2)?,
                amount: row.get(3)?,
                tax_year: row.get(4)?,
                is_tax_deductible: row.get(5)?,
                description: row.get(6)?,
            })
        })?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    fn entity_type(&self, taxpayer_id: &str) -> Result<Option<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT business_entity_type FROM entities WHERE taxpayer_id = ?1")?;
        let mut rows = stmt.query_map([taxpayer_id], |row| row.get::<_, String>(0))?;
        Ok(rows.next().transpose()?)
    }
}

// ---------------------------------------------------------------------------
// In-memory
// ---------------------------------------------------------------------------

/// A ledger held entirely in memory, for callers that already have the
/// records loaded. Payment deductibility comes from `registry`.
#[derive(Debug, Clone)]
pub struct MemoryLedger {
    registry: CategoryRegistry,
    records: Vec<CashflowRecord>,
    entities: HashMap<String, String>,
}

impl MemoryLedger {
    pub fn new(registry: &CategoryRegistry) -> Self {
        Self {
            registry: *registry,
            records: Vec::new(),
            entities: HashMap::new(),
        }
    }

    pub fn receipt(mut self, taxpayer_id: &str, tax_year: i32, amount: f64) -> Self {
        self.records.push(CashflowRecord {
            id: None,
            taxpayer_id: taxpayer_id.to_string(),
            kind: CashflowKind::Receipt,
            expense_category: None,
            amount,
            tax_year,
            is_tax_deductible: false,
            description: None,
        });
        self
    }

    pub fn payment(mut self, taxpayer_id: &str, tax_year: i32, category: &str, amount: f64) -> Self {
        self.records.push(CashflowRecord {
            id: None,
            taxpayer_id: taxpayer_id.to_string(),
            kind: CashflowKind::Payment,
            expense_category: Some(category.to_string()),
            amount,
            tax_year,
            is_tax_deductible: self.registry.is_tax_deductible(category),
            description: None,
        });
        self
    }

    pub fn entity(mut self, taxpayer_id: &str, entity_type: &str) -> Self {
        self.entities.insert(taxpayer_id.to_string(), entity_type.to_string());
        self
    }

    fn payments<'a>(
        &'a self,
        taxpayer_id: &'a str,
        tax_year: i32,
        categories: &'a [&'a str],
    ) -> impl Iterator<Item = &'a CashflowRecord> + 'a {
        self.records.iter().filter(move |r| {
            r.kind == CashflowKind::Payment
                && r.taxpayer_id == taxpayer_id
                && r.tax_year == tax_year
                && r.expense_category
                    .as_deref()
                    .is_some_and(|c| categories.contains(&c))
        })
    }
}

impl LedgerSource for MemoryLedger {
    fn total_income(&self, taxpayer_id: &str, tax_year: i32) -> Result<f64> {
        Ok(self
            .records
            .iter()
            .filter(|r| r.kind == CashflowKind::Receipt && r.taxpayer_id == taxpayer_id && r.tax_year == tax_year)
            .map(|r| r.amount)
            .sum())
    }

    fn expense_totals(
        &self,
        taxpayer_id: &str,
        tax_year: i32,
        categories: &[&str],
    ) -> Result<Vec<(String, f64)>> {
        let mut totals: BTreeMap<String, f64> = BTreeMap::new();
        for r in self.payments(taxpayer_id, tax_year, categories) {
            if let Some(cat) = &r.expense_category {
                *totals.entry(cat.clone()).or_insert(0.0) += r.amount;
            }
        }
        Ok(totals.into_iter().collect())
    }

    fn payment_records(
        &self,
        taxpayer_id: &str,
        tax_year: i32,
        categories: &[&str],
    ) -> Result<Vec<CashflowRecord>> {
        Ok(self.payments(taxpayer_id, tax_year, categories).cloned().collect())
    }

    fn entity_type(&self, taxpayer_id: &str) -> Result<Option<String>> {
        Ok(self.entities.get(taxpayer_id).cloned())
    }
}

// ---------------------------------------------------------------------------
// Aggregator
// ---------------------------------------------------------------------------

/// Sums a taxpayer's records for the calculators. Never fails: data-access
/// problems are logged and reported as zero.
pub struct LedgerAggregator<'a> {
    source: &'a dyn LedgerSource,
    registry: &'a CategoryRegistry,
}

impl<'a> LedgerAggregator<'a> {
    pub fn new(source: &'a dyn LedgerSource, registry: &'a CategoryRegistry) -> Self {
        Self { source, registry }
    }

    pub fn registry(&self) -> &'a CategoryRegistry {
        self.registry
    }

    pub fn get_total_income(&self, taxpayer_id: &str, tax_year: i32) -> f64 {
        match self.source.total_income(taxpayer_id, tax_year) {
            Ok(total) => {
                tracing::info!("total income for {taxpayer_id} in {tax_year}: {total}");
                total
            }
            Err(e) => {
                tracing::error!("error retrieving total income for {taxpayer_id} in {tax_year}: {e}");
                0.0
            }
        }
    }

    /// Every requested category is present in the result, defaulting to 0.0.
    pub fn get_expenses_by_categories(
        &self,
        taxpayer_id: &str,
        tax_year: i32,
        categories: &[&str],
    ) -> BTreeMap<String, f64> {
        for key in categories {
            if !self.registry.is_valid_category(key) {
                tracing::warn!("aggregating unknown expense category {key:?}");
            }
        }
        let mut totals: BTreeMap<String, f64> =
            categories.iter().map(|c| (c.to_string(), 0.0)).collect();

        match self.source.expense_totals(taxpayer_id, tax_year, categories) {
            Ok(grouped) => {
                for (category, amount) in grouped {
                    if let Some(slot) = totals.get_mut(&category) {
                        *slot = amount;
                    }
                }
                tracing::info!("expenses by category for {taxpayer_id} in {tax_year}: {totals:?}");
                return totals;
            }
            Err(e) => {
                tracing::error!(
                    "expense aggregation failed for {taxpayer_id} in {tax_year}, summing records instead: {e}"
                );
            }
        }

        match self.source.payment_records(taxpayer_id, tax_year, categories) {
            Ok(records) => {
                for record in records {
                    let Some(category) = record.expense_category.as_deref() else {
                        continue;
                    };
                    if let Some(slot) = totals.get_mut(category) {
                        *slot += record.amount;
                    }
                }
                totals
            }
            Err(e) => {
                tracing::error!("fallback expense query also failed for {taxpayer_id} in {tax_year}: {e}");
                categories.iter().map(|c| (c.to_string(), 0.0)).collect()
            }
        }
    }
}
