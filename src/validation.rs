use crate::error::{Result, TaxError};

pub const FIRST_TAX_YEAR: i32 = 2020;
const MAX_AMOUNT: f64 = 1e12;

/// Checks a monetary figure flowing between calculation steps.
pub fn validate_amount(value: f64, field: &str, allow_negative: bool) -> Result<f64> {
    if !value.is_finite() {
        return Err(TaxError::validation(
            field,
            value,
            format!("Invalid {field}: {value} is not a finite number"),
        ));
    }
    if !allow_negative && value < 0.0 {
        return Err(TaxError::validation(
            field,
            value,
            format!("{field} cannot be negative: {value}"),
        ));
    }
    if value.abs() > MAX_AMOUNT {
        return Err(TaxError::validation(
            field,
            value,
            format!("{field} is unreasonably large: {value}"),
        ));
    }
    Ok(value)
}

/// Parses user-entered text into an amount. Blank input counts as zero.
pub fn parse_amount(raw: &str, field: &str, allow_negative: bool) -> Result<f64> {
    let cleaned = raw.trim().replace(',', "");
    if cleaned.is_empty() {
        return Ok(0.0);
    }
    let value: f64 = cleaned.parse().map_err(|_| {
        TaxError::validation(
            field,
            raw,
            format!("Invalid {field}: cannot convert '{raw}' to number"),
        )
    })?;
    validate_amount(value, field, allow_negative)
}

/// Missing years fall back to `current_year`; anything outside
/// `[2020, current_year + 1]` is rejected.
pub fn validate_tax_year(tax_year: Option<i32>, current_year: i32) -> Result<i32> {
    let Some(year) = tax_year else {
        return Ok(current_year);
    };
    if year < FIRST_TAX_YEAR || year > current_year + 1 {
        return Err(TaxError::validation(
            "tax_year",
            year,
            format!(
                "Invalid tax year: {year}. Must be between {FIRST_TAX_YEAR} and {}",
                current_year + 1
            ),
        ));
    }
    Ok(year)
}

pub fn validate_taxpayer_id(taxpayer_id: &str) -> Result<&str> {
    let trimmed = taxpayer_id.trim();
    if trimmed.is_empty() {
        return Err(TaxError::validation(
            "taxpayer_id",
            taxpayer_id,
            "Taxpayer ID is required",
        ));
    }
    Ok(trimmed)
}
