//! Nigeria Tax Act 2025 liability engine.
//!
//! [`engine::TaxEngine`] resolves a taxpayer's business entity type and
//! routes to the four-step personal income tax calculation
//! ([`pit::PitCalculator`]) or the companies income tax calculation
//! ([`cit::CitCalculator`]). Ledger data is read through
//! [`ledger::LedgerSource`]; a SQLite-backed implementation lives in
//! [`ledger::SqliteLedger`].

use std::sync::Once;

pub mod bands;
pub mod categories;
pub mod cit;
pub mod db;
pub mod engine;
pub mod entity;
pub mod error;
pub mod estimate;
pub mod fmt;
pub mod ledger;
pub mod models;
pub mod pit;
pub mod settings;
pub mod validation;

static TRACING_INIT: Once = Once::new();

/// Installs the global stderr subscriber. `RUST_LOG` directives are honoured
/// alongside `ficore=info`.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, EnvFilter};

        let mut filter = EnvFilter::from_default_env();
        if let Ok(directive) = "ficore=info".parse() {
            filter = filter.add_directive(directive);
        }

        fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
    });
}
