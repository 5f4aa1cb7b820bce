use std::fmt;
use std::str::FromStr;

use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TaxError};
use crate::ledger::LedgerSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    #[default]
    SoleProprietor,
    LimitedLiability,
}

/// Presentation details for an entity type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EntityTypeInfo {
    pub name: &'static str,
    pub description: &'static str,
    pub tax_type: &'static str,
    pub tax_details: &'static str,
}

impl EntityType {
    pub const ALL: [EntityType; 2] = [EntityType::SoleProprietor, EntityType::LimitedLiability];

    pub fn key(&self) -> &'static str {
        match self {
            Self::SoleProprietor => "sole_proprietor",
            Self::LimitedLiability => "limited_liability",
        }
    }

    pub fn info(&self) -> EntityTypeInfo {
        match self {
            Self::SoleProprietor => EntityTypeInfo {
                name: "Individual/Sole Proprietor",
                description: "Personal business, freelancer, or individual trader",
                tax_type: "Personal Income Tax (PIT)",
                tax_details: "Progressive tax bands with NGN 800,000 exemption",
            },
            Self::LimitedLiability => EntityTypeInfo {
                name: "Registered Limited Liability Company",
                description: "Incorporated company with RC number",
                tax_type: "Companies Income Tax (CIT)",
                tax_details: "0% for revenue up to NGN 50M, 30% for revenue above NGN 50M",
            },
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for EntityType {
    type Err = TaxError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "sole_proprietor" => Ok(Self::SoleProprietor),
            "limited_liability" => Ok(Self::LimitedLiability),
            other => Err(TaxError::validation(
                "entity_type",
                other,
                format!("Invalid entity type: {other}. Must be one of: sole_proprietor, limited_liability"),
            )),
        }
    }
}

/// Resolves which tax regime applies to a taxpayer. Never fails: anything
/// other than a recognised stored value means sole proprietor.
pub fn get_entity_type(ledger: &dyn LedgerSource, taxpayer_id: &str) -> EntityType {
    match ledger.entity_type(taxpayer_id) {
        Ok(Some(raw)) => match raw.parse::<EntityType>() {
            Ok(entity) => {
                tracing::info!("entity type for {taxpayer_id}: {entity}");
                entity
            }
            Err(_) => {
                tracing::warn!("unrecognised entity type {raw:?} for {taxpayer_id}, defaulting to sole_proprietor");
                EntityType::SoleProprietor
            }
        },
        Ok(None) => {
            tracing::info!("no entity type for {taxpayer_id}, defaulting to sole_proprietor");
            EntityType::SoleProprietor
        }
        Err(e) => {
            tracing::error!("error retrieving entity type for {taxpayer_id}: {e}");
            EntityType::SoleProprietor
        }
    }
}

/// Upserts a taxpayer's entity type in the SQLite store.
pub fn set_entity_type(conn: &Connection, taxpayer_id: &str, entity: EntityType) -> Result<()> {
    conn.execute(
        "INSERT INTO entities (taxpayer_id, business_entity_type) VALUES (?1, ?2) \
         ON CONFLICT(taxpayer_id) DO UPDATE SET \
         business_entity_type = excluded.business_entity_type, updated_at = datetime('now')",
        rusqlite::params![taxpayer_id, entity.key()],
    )?;
    tracing::info!("updated entity type for {taxpayer_id} to {entity}");
    Ok(())
}
