use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::bands::{nta_2025_bands, validate_bands, TaxBand};
use crate::error::{Result, TaxError};

/// Rates, caps and thresholds the calculators run on. Defaults are the
/// NTA 2025 figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaxRules {
    pub pit_bands: Vec<TaxBand>,
    pub rent_relief_rate: f64,
    pub rent_relief_cap: f64,
    pub cit_revenue_threshold: f64,
    pub cit_rate: f64,
}

impl Default for TaxRules {
    fn default() -> Self {
        Self {
            pit_bands: nta_2025_bands(),
            rent_relief_rate: 0.20,
            rent_relief_cap: 500_000.0,
            cit_revenue_threshold: 50_000_000.0,
            cit_rate: 0.30,
        }
    }
}

impl TaxRules {
    pub fn validate(&self) -> Result<()> {
        validate_bands(&self.pit_bands)?;
        for (field, rate) in [
            ("rent_relief_rate", self.rent_relief_rate),
            ("cit_rate", self.cit_rate),
        ] {
            if !(0.0..=1.0).contains(&rate) {
                return Err(TaxError::validation(
                    field,
                    rate,
                    format!("{field} must be between 0 and 1, got {rate}"),
                ));
            }
        }
        for (field, value) in [
            ("rent_relief_cap", self.rent_relief_cap),
            ("cit_revenue_threshold", self.cit_revenue_threshold),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(TaxError::validation(
                    field,
                    value,
                    format!("{field} must be a non-negative amount, got {value}"),
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub data_dir: String,
    #[serde(default)]
    pub rules: TaxRules,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir().to_string_lossy().to_string(),
            rules: TaxRules::default(),
        }
    }
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("ficore")
}

fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Documents")
        .join("ficore")
}

pub fn load_settings() -> Settings {
    let path = settings_path();
    if path.exists() {
        let content = std::fs::read_to_string(&path).unwrap_or_default();
        match serde_json::from_str(&content) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!("ignoring unreadable settings at {}: {e}", path.display());
                Settings::default()
            }
        }
    } else {
        Settings::default()
    }
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    let dir = config_dir();
    std::fs::create_dir_all(&dir)?;
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| TaxError::Settings(e.to_string()))?;
    std::fs::write(settings_path(), format!("{json}\n"))?;
    Ok(())
}

pub fn get_data_dir() -> PathBuf {
    PathBuf::from(&load_settings().data_dir)
}

pub fn shellexpand_path(path: &str) -> String {
    if path.starts_with('~') {
        if let Some(home) = dirs::home_dir() {
            return path.replacen('~', &home.to_string_lossy(), 1);
        }
    }
    std::fs::canonicalize(path)
        .unwrap_or_else(|_| PathBuf::from(path))
        .to_string_lossy()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let mut settings = Settings {
            data_dir: "/tmp/test".to_string(),
            rules: TaxRules::default(),
        };
        settings.rules.cit_rate = 0.25;
        let json = serde_json::to_string_pretty(&settings).unwrap();
        std::fs::write(&path, &json).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        let loaded: Settings = serde_json::from_str(&content).unwrap();
        assert_eq!(loaded.data_dir, "/tmp/test");
        assert_eq!(loaded.rules.cit_rate, 0.25);
        assert!(loaded.rules.pit_bands[5].max.is_infinite());
    }

    #[test]
    fn test_missing_rules_use_nta_2025() {
        let json = r#"{"data_dir": "/tmp/test"}"#;
        let s: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(s.rules, TaxRules::default());
        assert_eq!(s.rules.rent_relief_cap, 500_000.0);
    }

    #[test]
    fn test_partial_rules_merge_with_defaults() {
        let json = r#"{"data_dir": "/tmp/test", "rules": {"cit_revenue_threshold": 25000000.0}}"#;
        let s: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(s.rules.cit_revenue_threshold, 25_000_000.0);
        assert_eq!(s.rules.cit_rate, 0.30);
        assert_eq!(s.rules.pit_bands.len(), 6);
    }

    #[test]
    fn test_default_rules_validate() {
        TaxRules::default().validate().unwrap();
    }

    #[test]
    fn test_invalid_rules_rejected() {
        let mut rules = TaxRules::default();
        rules.cit_rate = 3.0;
        assert_eq!(rules.validate().unwrap_err().code(), "VALIDATION_ERROR");

        let mut rules = TaxRules::default();
        rules.rent_relief_cap = -1.0;
        assert!(rules.validate().is_err());

        let mut rules = TaxRules::default();
        rules.pit_bands.remove(2);
        assert!(rules.validate().is_err());
    }

    #[test]
    fn test_default_settings() {
        let s = Settings::default();
        assert!(s.data_dir.ends_with("ficore"));
    }
}
