pub mod categories;
pub mod entity;
pub mod estimate;
pub mod init;
pub mod record;
pub mod rent;
pub mod tax;

use std::path::PathBuf;

use chrono::{Datelike, Utc};
use clap::{Parser, Subcommand};
use rusqlite::Connection;

use ficore::db::{get_connection, DB_FILE};
use ficore::error::{Result, TaxError};
use ficore::settings::get_data_dir;
use ficore::validation::validate_tax_year;

#[derive(Parser)]
#[command(name = "ficore", version, about = "NTA 2025 tax liability engine for Nigerian small businesses.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Choose a data directory and initialize the ledger database.
    Init {
        /// Path for ficore data (default: ~/Documents/ficore)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
    },
    /// Record receipts and payments in the ledger.
    Record {
        #[command(subcommand)]
        command: RecordCommands,
    },
    /// Manage a taxpayer's business entity type.
    Entity {
        #[command(subcommand)]
        command: EntityCommands,
    },
    /// List the NTA 2025 expense categories.
    Categories,
    /// Calculate a taxpayer's tax liability.
    Tax {
        /// Taxpayer identifier
        taxpayer: String,
        /// Tax year (default: current year)
        #[arg(long)]
        year: Option<i32>,
        /// Print the full calculation as JSON
        #[arg(long)]
        json: bool,
    },
    /// Estimate tax on figures given on the command line.
    Estimate {
        /// Total income for the year in naira
        income: String,
        /// An expense as CATEGORY=AMOUNT; repeatable
        #[arg(long = "expense", value_name = "CATEGORY=AMOUNT")]
        expenses: Vec<String>,
        /// Annual rent for rent relief (default: stored rent, else rent_utilities)
        #[arg(long)]
        rent: Option<String>,
        /// Use this taxpayer's entity type and stored rent
        #[arg(long)]
        taxpayer: Option<String>,
        /// Entity type: sole_proprietor or limited_liability
        #[arg(long)]
        entity: Option<String>,
        /// Print the full calculation as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage a taxpayer's annual rent for estimates.
    Rent {
        #[command(subcommand)]
        command: RentCommands,
    },
}

#[derive(Subcommand)]
pub enum RentCommands {
    /// Store the annual rent used for rent relief.
    Set { taxpayer: String, amount: String },
    /// Show the stored annual rent.
    Show { taxpayer: String },
}

#[derive(Subcommand)]
pub enum RecordCommands {
    /// Record income received.
    Receipt {
        taxpayer: String,
        /// Amount in naira; commas allowed
        amount: String,
        #[arg(long)]
        year: Option<i32>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Record a categorised expense.
    Payment {
        taxpayer: String,
        /// Expense category key (see `ficore categories`)
        category: String,
        /// Amount in naira; commas allowed
        amount: String,
        #[arg(long)]
        year: Option<i32>,
        #[arg(long)]
        description: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum EntityCommands {
    /// Set the entity type: sole_proprietor or limited_liability.
    Set { taxpayer: String, entity_type: String },
    /// Show the entity type used for a taxpayer.
    Show { taxpayer: String },
    /// List supported entity types.
    Types,
}

pub(crate) fn db_path() -> PathBuf {
    get_data_dir().join(DB_FILE)
}

/// Opens the ledger database, failing if `ficore init` has not been run.
pub(crate) fn open_ledger() -> Result<Connection> {
    let path = db_path();
    if !path.exists() {
        return Err(TaxError::insufficient(
            format!("No ledger database at {}. Run `ficore init` first.", path.display()),
            &["ledger"],
        ));
    }
    get_connection(&path)
}

pub(crate) fn current_year() -> i32 {
    Utc::now().year()
}

pub(crate) fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let out = serde_json::to_string_pretty(value).map_err(|e| TaxError::calculation(e.to_string()))?;
    println!("{out}");
    Ok(())
}

pub(crate) fn resolve_year(year: Option<i32>) -> Result<i32> {
    validate_tax_year(year, current_year())
}
