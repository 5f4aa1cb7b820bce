use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;

use crate::categories::CategoryRegistry;
use crate::cit::{CitCalculation, CitCalculator};
use crate::entity::{get_entity_type, EntityType};
use crate::error::{Result, TaxError, INCOMPLETE_RESULT};
use crate::ledger::{LedgerAggregator, LedgerSource};
use crate::pit::{PitCalculation, PitCalculator};
use crate::settings::TaxRules;
use crate::validation::{validate_tax_year, validate_taxpayer_id};

pub const CALCULATION_VERSION: &str = "2.0";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "calculation_type")]
pub enum Liability {
    #[serde(rename = "PIT")]
    Pit(PitCalculation),
    #[serde(rename = "CIT")]
    Cit(CitCalculation),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalculationResult {
    pub taxpayer_id: String,
    pub tax_year: i32,
    pub entity_type: EntityType,
    pub calculation_timestamp: DateTime<Utc>,
    pub calculation_version: &'static str,
    #[serde(flatten)]
    pub liability: Liability,
}

impl Liability {
    pub fn taxable_income(&self) -> f64 {
        match self {
            Self::Pit(pit) => pit.summary.taxable_income,
            Self::Cit(cit) => cit.taxable_income,
        }
    }

    pub fn tax_liability(&self) -> f64 {
        match self {
            Self::Pit(pit) => pit.final_tax_liability,
            Self::Cit(cit) => cit.tax_liability,
        }
    }

    pub fn effective_tax_rate(&self) -> f64 {
        match self {
            Self::Pit(pit) => pit.effective_tax_rate,
            Self::Cit(cit) => cit.effective_tax_rate,
        }
    }

    /// Names of required figures that are not usable numbers.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let liability_field = match self {
            Self::Pit(_) => "final_tax_liability",
            Self::Cit(_) => "tax_liability",
        };
        let mut missing = Vec::new();
        if !self.tax_liability().is_finite() {
            missing.push(liability_field);
        }
        if !self.effective_tax_rate().is_finite() {
            missing.push("effective_tax_rate");
        }
        missing
    }

    /// Fails with `INCOMPLETE_RESULT` when [`missing_fields`](Self::missing_fields)
    /// is not empty.
    pub fn ensure_complete(&self) -> Result<()> {
        let missing = self.missing_fields();
        if missing.is_empty() {
            return Ok(());
        }
        let mut err = TaxError::with_code(
            INCOMPLETE_RESULT,
            format!("Calculation result missing required fields: {missing:?}"),
        );
        if let TaxError::Calculation { details, .. } = &mut err {
            details.insert("missing_fields".to_string(), serde_json::json!(missing));
        }
        Err(err)
    }
}

impl CalculationResult {
    pub fn taxable_income(&self) -> f64 {
        self.liability.taxable_income()
    }

    pub fn tax_liability(&self) -> f64 {
        self.liability.tax_liability()
    }

    pub fn effective_tax_rate(&self) -> f64 {
        self.liability.effective_tax_rate()
    }
}

pub(crate) fn system_year() -> i32 {
    Utc::now().year()
}

/// Routes a taxpayer to the PIT or CIT calculator and stamps the result.
pub struct TaxEngine<'a> {
    ledger: Option<&'a dyn LedgerSource>,
    registry: &'a CategoryRegistry,
    rules: &'a TaxRules,
    current_year: fn() -> i32,
}

impl<'a> TaxEngine<'a> {
    pub fn new(registry: &'a CategoryRegistry, rules: &'a TaxRules) -> Self {
        Self {
            ledger: None,
            registry,
            rules,
            current_year: system_year,
        }
    }

    pub fn with_ledger(mut self, ledger: &'a dyn LedgerSource) -> Self {
        self.ledger = Some(ledger);
        self
    }

    /// Overrides the clock used to default and bound the tax year.
    pub fn with_current_year(mut self, current_year: fn() -> i32) -> Self {
        self.current_year = current_year;
        self
    }

    pub fn calculate_tax_liability(
        &self,
        taxpayer_id: &str,
        tax_year: Option<i32>,
    ) -> Result<CalculationResult> {
        let taxpayer_id = validate_taxpayer_id(taxpayer_id)?;
        let tax_year = validate_tax_year(tax_year, (self.current_year)())?;
        log_calculation_attempt("ROUTING", tax_year);

        let ledger = self.ledger.ok_or_else(|| {
            TaxError::insufficient("A ledger is required to calculate tax", &["ledger"])
        })?;

        let entity_type = get_entity_type(ledger, taxpayer_id);
        tracing::info!("calculating tax liability for {taxpayer_id} ({entity_type}) in {tax_year}");

        let liability = self
            .dispatch(ledger, entity_type, taxpayer_id, tax_year)
            .map_err(|e| e.unexpected("calculate_tax_liability"))?;

        liability.ensure_complete()?;

        tracing::info!("tax calculation completed for {taxpayer_id}");
        Ok(CalculationResult {
            taxpayer_id: taxpayer_id.to_string(),
            tax_year,
            entity_type,
            calculation_timestamp: Utc::now(),
            calculation_version: CALCULATION_VERSION,
            liability,
        })
    }

    /// Older name for [`calculate_tax_liability`](Self::calculate_tax_liability).
    pub fn calculate_four_step_tax_liability(
        &self,
        taxpayer_id: &str,
        tax_year: Option<i32>,
    ) -> Result<CalculationResult> {
        self.calculate_tax_liability(taxpayer_id, tax_year)
    }

    fn dispatch(
        &self,
        ledger: &dyn LedgerSource,
        entity_type: EntityType,
        taxpayer_id: &str,
        tax_year: i32,
    ) -> Result<Liability> {
        self.rules.validate()?;
        let aggregator = LedgerAggregator::new(ledger, self.registry);
        let liability = match entity_type {
            EntityType::SoleProprietor => {
                log_calculation_attempt("PIT", tax_year);
                Liability::Pit(PitCalculator::new(&aggregator, self.rules).calculate(taxpayer_id, tax_year))
            }
            EntityType::LimitedLiability => {
                log_calculation_attempt("CIT", tax_year);
                Liability::Cit(CitCalculator::new(&aggregator, self.rules).calculate(taxpayer_id, tax_year))
            }
        };
        Ok(liability)
    }
}

/// Summary only; ledger figures and taxpayer details stay out of the log.
fn log_calculation_attempt(calculation_type: &str, tax_year: i32) {
    tracing::info!(
        calculation_type,
        tax_year,
        started_at = %Utc::now().to_rfc3339(),
        "tax calculation attempt"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::MemoryLedger;

    fn year_2026() -> i32 {
        2026
    }

    fn scenario() -> MemoryLedger {
        MemoryLedger::new(&CategoryRegistry::nta_2025())
            .receipt("ada", 2025, 5_000_000.0)
            .payment("ada", 2025, "office_admin", 200_000.0)
            .payment("ada", 2025, "staff_wages", 300_000.0)
            .payment("ada", 2025, "rent_utilities", 1_000_000.0)
            .payment("ada", 2025, "statutory_legal", 50_000.0)
            .entity("acme", "limited_liability")
            .receipt("acme", 2025, 80_000_000.0)
            .payment("acme", 2025, "cogs", 18_000_000.0)
            .payment("acme", 2025, "statutory_legal", 2_000_000.0)
    }

    #[test]
    fn test_routes_sole_proprietor_to_pit() {
        let ledger = scenario();
        let reg = CategoryRegistry::nta_2025();
        let rules = TaxRules::default();
        let engine = TaxEngine::new(&reg, &rules).with_ledger(&ledger).with_current_year(year_2026);
        let result = engine.calculate_tax_liability("ada", Some(2025)).unwrap();
        assert_eq!(result.entity_type, EntityType::SoleProprietor);
        assert!(matches!(result.liability, Liability::Pit(_)));
        assert!((result.tax_liability() - 375_000.0).abs() < 1e-6);
        assert!((result.effective_tax_rate() - 7.5).abs() < 1e-9);
        assert_eq!(result.taxable_income(), 3_250_000.0);
        assert_eq!(result.calculation_version, "2.0");
    }

    #[test]
    fn test_routes_company_to_cit() {
        let ledger = scenario();
        let reg = CategoryRegistry::nta_2025();
        let rules = TaxRules::default();
        let engine = TaxEngine::new(&reg, &rules).with_ledger(&ledger).with_current_year(year_2026);
        let result = engine.calculate_tax_liability("acme", Some(2025)).unwrap();
        assert_eq!(result.entity_type, EntityType::LimitedLiability);
        assert!((result.tax_liability() - 18_000_000.0).abs() < 1e-6);
        assert!((result.effective_tax_rate() - 22.5).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_taxpayer_goes_to_pit() {
        let ledger = scenario();
        let reg = CategoryRegistry::nta_2025();
        let rules = TaxRules::default();
        let engine = TaxEngine::new(&reg, &rules).with_ledger(&ledger).with_current_year(year_2026);
        let result = engine.calculate_tax_liability("stranger", Some(2025)).unwrap();
        assert_eq!(result.entity_type, EntityType::SoleProprietor);
        assert!(matches!(result.liability, Liability::Pit(_)));
        assert_eq!(result.tax_liability(), 0.0);
    }

    #[test]
    fn test_idempotent_numbers() {
        let ledger = scenario();
        let reg = CategoryRegistry::nta_2025();
        let rules = TaxRules::default();
        let engine = TaxEngine::new(&reg, &rules).with_ledger(&ledger).with_current_year(year_2026);
        for id in ["ada", "acme"] {
            let a = engine.calculate_tax_liability(id, Some(2025)).unwrap();
            let b = engine.calculate_tax_liability(id, Some(2025)).unwrap();
            assert_eq!(a.liability, b.liability);
            assert_eq!(a.tax_liability().to_bits(), b.tax_liability().to_bits());
            assert_eq!(a.effective_tax_rate().to_bits(), b.effective_tax_rate().to_bits());
        }
    }

    #[test]
    fn test_rejects_empty_taxpayer() {
        let ledger = scenario();
        let reg = CategoryRegistry::nta_2025();
        let rules = TaxRules::default();
        let engine = TaxEngine::new(&reg, &rules).with_ledger(&ledger);
        let err = engine.calculate_tax_liability("  ", Some(2025)).unwrap_err();
        assert!(matches!(err, TaxError::Validation { ref field, .. } if field == "taxpayer_id"));
    }

    #[test]
    fn test_tax_year_validation_and_default() {
        let ledger = scenario();
        let reg = CategoryRegistry::nta_2025();
        let rules = TaxRules::default();
        let engine = TaxEngine::new(&reg, &rules).with_ledger(&ledger).with_current_year(year_2026);
        assert_eq!(engine.calculate_tax_liability("ada", None).unwrap().tax_year, 2026);
        assert_eq!(engine.calculate_tax_liability("ada", Some(2027)).unwrap().tax_year, 2027);
        for bad in [2019, 2028] {
            let err = engine.calculate_tax_liability("ada", Some(bad)).unwrap_err();
            assert_eq!(err.code(), "VALIDATION_ERROR");
        }
    }

    #[test]
    fn test_missing_ledger_is_insufficient_data() {
        let reg = CategoryRegistry::nta_2025();
        let rules = TaxRules::default();
        let engine = TaxEngine::new(&reg, &rules).with_current_year(year_2026);
        let err = engine.calculate_tax_liability("ada", Some(2025)).unwrap_err();
        match err {
            TaxError::InsufficientData { missing, .. } => assert_eq!(missing, vec!["ledger"]),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_invalid_rules_surface_as_validation() {
        let ledger = scenario();
        let reg = CategoryRegistry::nta_2025();
        let mut rules = TaxRules::default();
        rules.pit_bands.clear();
        let engine = TaxEngine::new(&reg, &rules).with_ledger(&ledger).with_current_year(year_2026);
        let err = engine.calculate_tax_liability("ada", Some(2025)).unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }

    #[test]
    fn test_missing_fields_detection() {
        let ledger = MemoryLedger::new(&CategoryRegistry::nta_2025()).entity("acme", "limited_liability").receipt("acme", 2025, 60_000_000.0);
        let reg = CategoryRegistry::nta_2025();
        let rules = TaxRules::default();
        let agg = LedgerAggregator::new(&ledger, &reg);
        let mut cit = CitCalculator::new(&agg, &rules).calculate("acme", 2025);
        assert!(Liability::Cit(cit.clone()).missing_fields().is_empty());
        cit.tax_liability = f64::NAN;
        cit.effective_tax_rate = f64::INFINITY;
        let err = Liability::Cit(cit.clone()).ensure_complete().unwrap_err();
        assert_eq!(err.code(), "INCOMPLETE_RESULT");
        assert_eq!(
            err.details()["missing_fields"],
            serde_json::json!(["tax_liability", "effective_tax_rate"])
        );
        assert_eq!(
            Liability::Cit(cit).missing_fields(),
            vec!["tax_liability", "effective_tax_rate"]
        );
    }

    #[test]
    fn test_serializes_with_calculation_type_tag() {
        let ledger = scenario();
        let reg = CategoryRegistry::nta_2025();
        let rules = TaxRules::default();
        let engine = TaxEngine::new(&reg, &rules).with_ledger(&ledger).with_current_year(year_2026);
        let json = serde_json::to_value(engine.calculate_tax_liability("ada", Some(2025)).unwrap()).unwrap();
        assert_eq!(json["calculation_type"], "PIT");
        assert_eq!(json["entity_type"], "sole_proprietor");
        assert_eq!(json["step3_rent_relief"]["calculated_rent_relief"], 200_000.0);
        assert!(json["step4_progressive_tax"]["tax_band_breakdown"].is_array());

        let json = serde_json::to_value(engine.calculate_tax_liability("acme", Some(2025)).unwrap()).unwrap();
        assert_eq!(json["calculation_type"], "CIT");
        assert_eq!(json["exemption_applied"], false);
    }

    #[test]
    fn test_alias_matches() {
        let ledger = scenario();
        let reg = CategoryRegistry::nta_2025();
        let rules = TaxRules::default();
        let engine = TaxEngine::new(&reg, &rules).with_ledger(&ledger).with_current_year(year_2026);
        let a = engine.calculate_four_step_tax_liability("ada", Some(2025)).unwrap();
        let b = engine.calculate_tax_liability("ada", Some(2025)).unwrap();
        assert_eq!(a.liability, b.liability);
    }
}
