use serde::{Deserialize, Serialize};

use crate::error::{Result, TaxError};

/// One marginal-rate interval. Both ends are inclusive; `max` is
/// `f64::INFINITY` for the top band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxBand {
    pub min: f64,
    #[serde(with = "unbounded")]
    pub max: f64,
    pub rate: f64,
    pub description: String,
}

impl TaxBand {
    pub fn new(min: f64, max: f64, rate: f64, description: &str) -> Self {
        Self {
            min,
            max,
            rate,
            description: description.to_string(),
        }
    }
}

/// Serializes an infinite upper bound as `null`.
mod unbounded {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, s: S) -> Result<S::Ok, S::Error> {
        if value.is_infinite() {
            s.serialize_none()
        } else {
            s.serialize_some(value)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(d)?.unwrap_or(f64::INFINITY))
    }
}

pub fn nta_2025_bands() -> Vec<TaxBand> {
    vec![
        TaxBand::new(0.0, 800_000.0, 0.0, "First NGN 800,000 (Tax-free)"),
        TaxBand::new(800_001.0, 3_000_000.0, 0.15, "Next NGN 2,200,000 (15%)"),
        TaxBand::new(3_000_001.0, 12_000_000.0, 0.18, "Next NGN 9,000,000 (18%)"),
        TaxBand::new(12_000_001.0, 25_000_000.0, 0.21, "Next NGN 13,000,000 (21%)"),
        TaxBand::new(25_000_001.0, 50_000_000.0, 0.23, "Next NGN 25,000,000 (23%)"),
        TaxBand::new(50_000_001.0, f64::INFINITY, 0.25, "Above NGN 50,000,000 (25%)"),
    ]
}

/// Bands must start at zero, follow on from each other (`min = prev.max + 1`)
/// and end unbounded.
pub fn validate_bands(bands: &[TaxBand]) -> Result<()> {
    let Some(first) = bands.first() else {
        return Err(TaxError::validation("tax_bands", "[]", "At least one tax band is required"));
    };
    if first.min != 0.0 {
        return Err(TaxError::validation(
            "tax_bands",
            first.min,
            format!("First tax band must start at 0, not {}", first.min),
        ));
    }
    for (i, band) in bands.iter().enumerate() {
        if !(0.0..=1.0).contains(&band.rate) {
            return Err(TaxError::validation(
                "tax_bands",
                band.rate,
                format!("Band {} rate {} is outside 0..=1", i + 1, band.rate),
            ));
        }
        if band.max < band.min {
            return Err(TaxError::validation(
                "tax_bands",
                band.max,
                format!("Band {} ends ({}) before it starts ({})", i + 1, band.max, band.min),
            ));
        }
        if i > 0 {
            let prev = &bands[i - 1];
            if band.min != prev.max + 1.0 {
                return Err(TaxError::validation(
                    "tax_bands",
                    band.min,
                    format!(
                        "Band {} must start at {} to follow the previous band",
                        i + 1,
                        prev.max + 1.0
                    ),
                ));
            }
        }
    }
    if let Some(last) = bands.last() {
        if last.max.is_finite() {
            return Err(TaxError::validation(
                "tax_bands",
                last.max,
                "The last tax band must be unbounded",
            ));
        }
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BandTax {
    pub band_description: String,
    pub band_min: f64,
    /// `None` for the unbounded top band.
    pub band_max: Option<f64>,
    pub tax_rate: f64,
    pub taxable_amount_in_band: f64,
    pub tax_in_band: f64,
    pub band_formula: String,
}

/// Applies `bands` to `taxable_income` using the inclusive-bound convention:
/// a band reached by the income contributes
/// `min(income, band.max) - band.min + 1`.
///
/// Returns the per-band breakdown (empty for non-positive income) and the
/// total tax.
pub fn apply_bands(taxable_income: f64, bands: &[TaxBand]) -> (Vec<BandTax>, f64) {
    if taxable_income <= 0.0 {
        return (Vec::new(), 0.0);
    }
    let mut total = 0.0;
    let mut breakdown = Vec::new();
    for band in bands {
        if taxable_income < band.min {
            continue;
        }
        let upper = if taxable_income > band.max {
            band.max
        } else {
            taxable_income
        };
        let amount = upper - band.min + 1.0;
        let tax = amount * band.rate;
        total += tax;
        breakdown.push(BandTax {
            band_description: band.description.clone(),
            band_min: band.min,
            band_max: band.max.is_finite().then_some(band.max),
            tax_rate: band.rate,
            taxable_amount_in_band: amount,
            tax_in_band: tax,
            band_formula: format!(
                "{} × {:.1}% = {}",
                crate::fmt::amount(amount),
                band.rate * 100.0,
                crate::fmt::amount(tax)
            ),
        });
    }
    (breakdown, total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nta_2025_bands_are_valid() {
        let bands = nta_2025_bands();
        assert_eq!(bands.len(), 6);
        validate_bands(&bands).unwrap();
        let rates: Vec<f64> = bands.iter().map(|b| b.rate).collect();
        assert_eq!(rates, vec![0.0, 0.15, 0.18, 0.21, 0.23, 0.25]);
    }

    #[test]
    fn test_validate_rejects_gap() {
        let mut bands = nta_2025_bands();
        bands[2].min = 3_000_500.0;
        let err = validate_bands(&bands).unwrap_err();
        assert!(err.to_string().contains("Band 3 must start at 3000001"));
    }

    #[test]
    fn test_validate_rejects_bounded_top() {
        let mut bands = nta_2025_bands();
        bands[5].max = 90_000_000.0;
        assert!(validate_bands(&bands).is_err());
    }

    #[test]
    fn test_validate_rejects_bad_rate_and_start() {
        let mut bands = nta_2025_bands();
        bands[1].rate = 1.5;
        assert!(validate_bands(&bands).is_err());
        let mut bands = nta_2025_bands();
        bands[0].min = 1.0;
        assert!(validate_bands(&bands).is_err());
        assert!(validate_bands(&[]).is_err());
    }

    #[test]
    fn test_zero_and_negative_income() {
        let bands = nta_2025_bands();
        assert_eq!(apply_bands(0.0, &bands), (Vec::new(), 0.0));
        assert_eq!(apply_bands(-5000.0, &bands), (Vec::new(), 0.0));
    }

    #[test]
    fn test_income_within_first_band_is_tax_free() {
        let (breakdown, total) = apply_bands(500_000.0, &nta_2025_bands());
        assert_eq!(total, 0.0);
        assert_eq!(breakdown.len(), 1);
        assert_eq!(breakdown[0].taxable_amount_in_band, 500_001.0);
    }

    #[test]
    fn test_inclusive_convention() {
        let (breakdown, total) = apply_bands(3_250_000.0, &nta_2025_bands());
        let amounts: Vec<f64> = breakdown.iter().map(|b| b.taxable_amount_in_band).collect();
        assert_eq!(amounts, vec![800_001.0, 2_200_000.0, 250_000.0]);
        assert!((breakdown[1].tax_in_band - 330_000.0).abs() < 1e-6);
        assert!((breakdown[2].tax_in_band - 45_000.0).abs() < 1e-6);
        assert!((total - 375_000.0).abs() < 1e-6);
        // Every reached band is covered; the zero-based first band adds one.
        assert_eq!(amounts.iter().sum::<f64>(), 3_250_000.0 + 1.0);
    }

    #[test]
    fn test_band_boundaries() {
        let bands = nta_2025_bands();
        let (b, t) = apply_bands(800_000.0, &bands);
        assert_eq!((b.len(), t), (1, 0.0));
        let (b, t) = apply_bands(800_001.0, &bands);
        assert_eq!(b.len(), 2);
        assert!((t - 0.15).abs() < 1e-9);
        // Between 800,000 and 800,001 the second band is not yet reached.
        let (b, _) = apply_bands(800_000.5, &bands);
        assert_eq!(b.len(), 1);
    }

    #[test]
    fn test_top_band_is_unbounded() {
        let (breakdown, total) = apply_bands(60_000_000.0, &nta_2025_bands());
        assert_eq!(breakdown.len(), 6);
        assert_eq!(breakdown[5].band_max, None);
        assert_eq!(breakdown[5].taxable_amount_in_band, 10_000_000.0);
        let expected = 800_001.0 * 0.0
            + 2_200_000.0 * 0.15
            + 9_000_000.0 * 0.18
            + 13_000_000.0 * 0.21
            + 25_000_000.0 * 0.23
            + 10_000_000.0 * 0.25;
        assert!((total - expected).abs() < 1e-6);
    }

    #[test]
    fn test_band_sum_covers_income_plus_one() {
        let bands = nta_2025_bands();
        for income in [1.0, 799_999.5, 3_000_000.0, 12_345_678.9, 49_999_999.0, 75_000_000.25] {
            let (breakdown, _) = apply_bands(income, &bands);
            let covered: f64 = breakdown.iter().map(|b| b.taxable_amount_in_band).sum();
            assert!((covered - (income + 1.0)).abs() < 1e-6, "income {income}: covered {covered}");
        }
    }

    #[test]
    fn test_monotonic() {
        let bands = nta_2025_bands();
        let mut prev = 0.0;
        let mut income = 0.0;
        while income < 60_000_000.0 {
            let (_, t) = apply_bands(income, &bands);
            assert!(t >= prev, "tax fell at income {income}");
            prev = t;
            income += 123_456.7;
        }
        for edge in [800_000.0, 3_000_000.0, 12_000_000.0, 25_000_000.0, 50_000_000.0] {
            let (_, below) = apply_bands(edge, &bands);
            let (_, mid) = apply_bands(edge + 0.5, &bands);
            let (_, above) = apply_bands(edge + 1.0, &bands);
            assert!(below <= mid && mid <= above, "non-monotonic around {edge}");
        }
    }

    #[test]
    fn test_band_serde_uses_null_for_unbounded() {
        let json = serde_json::to_value(&nta_2025_bands()[5]).unwrap();
        assert!(json["max"].is_null());
        let back: TaxBand = serde_json::from_value(json).unwrap();
        assert!(back.max.is_infinite());
    }
}
