//! Tax estimates on figures a caller types in rather than on the ledger.
//!
//! Inputs are forgiving: negative or unreadable amounts become zero and are
//! reported back as warnings alongside the result.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::categories::{CategoryRegistry, RENT_UTILITIES, STATUTORY_LEGAL};
use crate::cit::compute_cit;
use crate::engine::{Liability, CALCULATION_VERSION};
use crate::entity::EntityType;
use crate::error::Result;
use crate::pit::{compute_pit, PitInputs};
use crate::settings::TaxRules;
use crate::validation::parse_amount;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct EstimateInputs {
    pub total_income: f64,
    /// Totals by category key; unknown keys are dropped when sanitising.
    pub expenses: BTreeMap<String, f64>,
    /// Rent the relief is computed from. `None` falls back to the
    /// rent & utilities expense.
    pub annual_rent: Option<f64>,
    pub warnings: Vec<String>,
}

enum Parsed {
    Amount(f64),
    Negative,
    Invalid,
}

fn parse_input(raw: &str, field: &str) -> Parsed {
    match parse_amount(raw, field, true) {
        Ok(value) if value < 0.0 => Parsed::Negative,
        Ok(value) => Parsed::Amount(value),
        Err(_) => Parsed::Invalid,
    }
}

impl EstimateInputs {
    /// Builds inputs from user-entered text, collecting a warning for every
    /// value that had to be adjusted.
    pub fn from_raw(
        registry: &CategoryRegistry,
        total_income: &str,
        expenses: &[(String, String)],
        annual_rent: Option<&str>,
    ) -> Self {
        let mut warnings = Vec::new();

        let total_income = match parse_input(total_income, "total_income") {
            Parsed::Amount(v) => v,
            Parsed::Negative => {
                warnings.push("Income was negative, adjusted to zero".to_string());
                0.0
            }
            Parsed::Invalid => {
                warnings.push("Invalid income value, using zero".to_string());
                0.0
            }
        };

        let mut totals: BTreeMap<String, f64> = BTreeMap::new();
        for (category, raw) in expenses {
            let key = category.trim();
            if !registry.is_valid_category(key) {
                warnings.push(format!("Unknown expense category {key}, ignored"));
                continue;
            }
            let amount = match parse_input(raw, key) {
                Parsed::Amount(v) => v,
                Parsed::Negative => {
                    warnings.push(format!("Negative expense for {key}, adjusted to zero"));
                    0.0
                }
                Parsed::Invalid => {
                    warnings.push(format!("Invalid expense amount for {key}, using zero"));
                    0.0
                }
            };
            if registry.is_personal(key) && amount > 0.0 {
                warnings.push(format!("{key} is not tax deductible and was not deducted"));
            }
            *totals.entry(key.to_string()).or_insert(0.0) += amount;
        }

        let annual_rent = annual_rent.map(|raw| match parse_input(raw, "annual_rent") {
            Parsed::Amount(v) => v,
            Parsed::Negative => {
                warnings.push("Annual rent was negative, adjusted to zero".to_string());
                0.0
            }
            Parsed::Invalid => {
                warnings.push("Invalid annual rent value, using zero".to_string());
                0.0
            }
        });

        Self {
            total_income,
            expenses: totals,
            annual_rent,
            warnings,
        }
    }

    fn expense(&self, key: &str) -> f64 {
        self.expenses.get(key).copied().unwrap_or(0.0)
    }

    fn pick(&self, keys: &[&str]) -> BTreeMap<String, f64> {
        keys.iter().map(|k| (k.to_string(), self.expense(k))).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Estimate {
    pub entity_type: EntityType,
    pub calculation_timestamp: DateTime<Utc>,
    pub calculation_version: &'static str,
    #[serde(flatten)]
    pub liability: Liability,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub calculation_warnings: Vec<String>,
}

/// Runs the calculator for `entity_type` on `inputs`.
pub fn estimate(
    inputs: &EstimateInputs,
    entity_type: EntityType,
    registry: &CategoryRegistry,
    rules: &TaxRules,
) -> Result<Estimate> {
    rules.validate()?;
    let liability = match entity_type {
        EntityType::SoleProprietor => {
            let business_expenses = inputs.pick(&registry.main_business_keys());
            let annual_rent = inputs
                .annual_rent
                .unwrap_or_else(|| inputs.expense(RENT_UTILITIES));
            Liability::Pit(compute_pit(
                &PitInputs {
                    total_income: inputs.total_income,
                    business_expenses,
                    statutory_legal_expenses: inputs.expense(STATUTORY_LEGAL),
                    annual_rent,
                },
                rules,
            ))
        }
        EntityType::LimitedLiability => Liability::Cit(compute_cit(
            inputs.total_income,
            &inputs.pick(&registry.cit_deductible_keys()),
            rules,
        )?),
    };
    liability.ensure_complete()?;

    tracing::info!(
        calculation_type = entity_type.info().tax_type,
        warnings = inputs.warnings.len(),
        "tax estimate completed"
    );
    Ok(Estimate {
        entity_type,
        calculation_timestamp: Utc::now(),
        calculation_version: CALCULATION_VERSION,
        liability,
        calculation_warnings: inputs.warnings.clone(),
    })
}
