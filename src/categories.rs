use serde::Serialize;

pub const OFFICE_ADMIN: &str = "office_admin";
pub const STAFF_WAGES: &str = "staff_wages";
pub const BUSINESS_TRAVEL: &str = "business_travel";
pub const RENT_UTILITIES: &str = "rent_utilities";
pub const MARKETING_SALES: &str = "marketing_sales";
pub const COGS: &str = "cogs";
pub const PERSONAL_EXPENSES: &str = "personal_expenses";
pub const STATUTORY_LEGAL: &str = "statutory_legal";

/// The six business categories deducted in Step 1 of the PIT calculation.
pub const MAIN_BUSINESS_CATEGORIES: [&str; 6] = [
    OFFICE_ADMIN,
    STAFF_WAGES,
    BUSINESS_TRAVEL,
    RENT_UTILITIES,
    MARKETING_SALES,
    COGS,
];

/// Everything a company may deduct for CIT: the main six plus statutory & legal.
pub const CIT_DEDUCTIBLE_CATEGORIES: [&str; 7] = [
    OFFICE_ADMIN,
    STAFF_WAGES,
    BUSINESS_TRAVEL,
    RENT_UTILITIES,
    MARKETING_SALES,
    COGS,
    STATUTORY_LEGAL,
];

const MAX_ASSIGNMENT_AMOUNT: f64 = 999_999_999.99;
const MAX_DESCRIPTION_LEN: usize = 1000;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpenseCategory {
    pub key: &'static str,
    pub name: &'static str,
    pub tax_deductible: bool,
    pub is_personal: bool,
    pub is_statutory: bool,
    pub description: &'static str,
    pub examples: &'static [&'static str],
}

const NTA_2025_CATEGORIES: &[ExpenseCategory] = &[
    ExpenseCategory {
        key: OFFICE_ADMIN,
        name: "Office & Admin",
        tax_deductible: true,
        is_personal: false,
        is_statutory: false,
        description: "Office supplies, stationery, internet/data, utility bills",
        examples: &["Office supplies", "Stationery", "Internet/Data", "Electricity"],
    },
    ExpenseCategory {
        key: STAFF_WAGES,
        name: "Staff & Wages",
        tax_deductible: true,
        is_personal: false,
        is_statutory: false,
        description: "Employee salaries, wages, and related costs",
        examples: &["Salaries", "Wages", "Staff benefits", "Payroll costs"],
    },
    ExpenseCategory {
        key: BUSINESS_TRAVEL,
        name: "Business Travel & Transport",
        tax_deductible: true,
        is_personal: false,
        is_statutory: false,
        description: "Fuel, vehicle maintenance, and travel expenses for business",
        examples: &["Fuel", "Vehicle maintenance", "Business travel", "Transport costs"],
    },
    ExpenseCategory {
        key: RENT_UTILITIES,
        name: "Rent & Utilities",
        tax_deductible: true,
        is_personal: false,
        is_statutory: false,
        description: "Rent for shop or business office",
        examples: &["Shop rent", "Office rent", "Business premises rent"],
    },
    ExpenseCategory {
        key: MARKETING_SALES,
        name: "Marketing & Sales",
        tax_deductible: true,
        is_personal: false,
        is_statutory: false,
        description: "Advertising, social media promotion, business cards",
        examples: &["Advertising", "Social media promotion", "Business cards"],
    },
    ExpenseCategory {
        key: COGS,
        name: "Cost of Goods Sold (COGS)",
        tax_deductible: true,
        is_personal: false,
        is_statutory: false,
        description: "Direct costs of producing goods or services",
        examples: &["Raw materials", "Manufacturing costs", "Direct labor"],
    },
    ExpenseCategory {
        key: PERSONAL_EXPENSES,
        name: "Personal Expenses",
        tax_deductible: false,
        is_personal: true,
        is_statutory: false,
        description: "Personal expenses not related to business",
        examples: &["Personal meals", "Personal shopping", "Family expenses"],
    },
    ExpenseCategory {
        key: STATUTORY_LEGAL,
        name: "Statutory & Legal Contributions",
        tax_deductible: true,
        is_personal: false,
        is_statutory: true,
        description: "Accounting, legal, and consulting fees directly related to business",
        examples: &["Accounting fees", "Legal fees", "Consulting fees"],
    },
];

/// Read-only lookup over a fixed set of expense categories.
///
/// Unknown keys never fail: every flag query answers `false`.
#[derive(Debug, Clone, Copy)]
pub struct CategoryRegistry {
    categories: &'static [ExpenseCategory],
}

impl Default for CategoryRegistry {
    fn default() -> Self {
        Self::nta_2025()
    }
}

impl CategoryRegistry {
    pub const fn nta_2025() -> Self {
        Self {
            categories: NTA_2025_CATEGORIES,
        }
    }

    pub const fn from_static(categories: &'static [ExpenseCategory]) -> Self {
        Self { categories }
    }

    pub fn is_valid_category(&self, key: &str) -> bool {
        self.get_category_metadata(key).is_some()
    }

    pub fn get_category_metadata(&self, key: &str) -> Option<&'static ExpenseCategory> {
        let key = key.trim();
        if key.is_empty() {
            return None;
        }
        let found = self.categories.iter().find(|c| c.key == key);
        if found.is_none() {
            tracing::debug!("unknown expense category: {key}");
        }
        found
    }

    pub fn is_tax_deductible(&self, key: &str) -> bool {
        self.get_category_metadata(key)
            .map(|c| c.tax_deductible)
            .unwrap_or(false)
    }

    pub fn is_personal(&self, key: &str) -> bool {
        self.get_category_metadata(key)
            .map(|c| c.is_personal)
            .unwrap_or(false)
    }

    pub fn is_statutory(&self, key: &str) -> bool {
        self.get_category_metadata(key)
            .map(|c| c.is_statutory)
            .unwrap_or(false)
    }

    pub fn all(&self) -> &'static [ExpenseCategory] {
        self.categories
    }

    /// Deductible, non-statutory categories (the Step 1 set for PIT).
    pub fn main_business_keys(&self) -> Vec<&'static str> {
        self.categories
            .iter()
            .filter(|c| c.tax_deductible && !c.is_personal && !c.is_statutory)
            .map(|c| c.key)
            .collect()
    }

    /// Every deductible business category, statutory included (the CIT set).
    pub fn cit_deductible_keys(&self) -> Vec<&'static str> {
        self.categories
            .iter()
            .filter(|c| c.tax_deductible && !c.is_personal)
            .map(|c| c.key)
            .collect()
    }

    /// `(key, label)` pairs sorted by label for pick lists.
    pub fn form_choices(&self) -> Vec<(&'static str, String)> {
        let mut choices: Vec<(&'static str, String)> = self
            .categories
            .iter()
            .map(|c| {
                let label = if c.is_personal {
                    format!("{} (Not Tax Deductible)", c.name)
                } else {
                    c.name.to_string()
                };
                (c.key, label)
            })
            .collect();
        choices.sort_by(|a, b| a.1.cmp(&b.1));
        choices
    }

    /// Returns every problem with assigning `amount` to `key`; empty means valid.
    pub fn validate_category_assignment(
        &self,
        key: &str,
        amount: f64,
        description: Option<&str>,
    ) -> Vec<String> {
        let mut errors = Vec::new();
        if !self.is_valid_category(key) {
            errors.push(format!("Invalid expense category: {key}"));
        }
        if !amount.is_finite() || amount < 0.0 {
            errors.push("Amount must be a positive number".to_string());
        } else if amount == 0.0 {
            errors.push("Amount cannot be zero".to_string());
        } else if amount > MAX_ASSIGNMENT_AMOUNT {
            errors.push("Amount is too large (maximum: ₦999,999,999.99)".to_string());
        }
        if let Some(desc) = description {
            if desc.trim().chars().count() > MAX_DESCRIPTION_LEN {
                errors.push("Description cannot exceed 1000 characters".to_string());
            }
        }
        errors
    }
}
