//! Owner demographics and category budgets used for reporting and alerts.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Used to personalise alert messages
    #[serde(default)]
    pub name: Option<String>,
    pub age: u32,
    pub yearly_income: f64,
    pub country: String,
}

impl Default for UserProfile {
    fn default() -> Self {
        Self {
            name: None,
            age: 30,
            yearly_income: 50000.0,
            country: "Unknown".to_string(),
        }
    }
}

/// Monthly spending ceiling for one category. A non-positive ceiling disables alerts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryBudget {
    pub name: String,
    pub max_budget: f64,
}

impl CategoryBudget {
    pub fn new(name: impl Into<String>, max_budget: f64) -> Self {
        Self {
            name: name.into(),
            max_budget,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.max_budget > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_defaults() {
        let p = UserProfile::default();
        assert_eq!(p.age, 30);
        assert_eq!(p.yearly_income, 50000.0);
        assert_eq!(p.country, "Unknown");
    }

    #[test]
    fn test_zero_budget_is_disabled() {
        assert!(!CategoryBudget::new("Groceries", 0.0).is_enabled());
        assert!(CategoryBudget::new("Groceries", 5000.0).is_enabled());
    }
}
