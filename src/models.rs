use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CashflowKind {
    Receipt,
    Payment,
}

impl CashflowKind {
    pub fn key(&self) -> &'static str {
        match self {
            Self::Receipt => "receipt",
            Self::Payment => "payment",
        }
    }
}

impl fmt::Display for CashflowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// One bookkeeping entry as the tax engine sees it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CashflowRecord {
    pub id: Option<i64>,
    pub taxpayer_id: String,
    pub kind: CashflowKind,
    pub expense_category: Option<String>,
    pub amount: f64,
    pub tax_year: i32,
    pub is_tax_deductible: bool,
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_keys_and_display() {
        assert_eq!(CashflowKind::Receipt.key(), "receipt");
        assert_eq!(CashflowKind::Payment.to_string(), "payment");
        assert_eq!(serde_json::to_value(CashflowKind::Receipt).unwrap(), "receipt");
    }
}
