//! Category taxonomy and behavioral tag catalog used as classification guidance.

/// Used when an owner has not defined any categories.
pub const DEFAULT_CATEGORIES: [&str; 13] = [
    "Groceries",
    "Restaurants",
    "Transport",
    "Utilities",
    "Rent",
    "Entertainment",
    "Shopping",
    "Medical",
    "Fees",
    "Subscriptions",
    "Transfer",
    "Income",
    "Other",
];

/// Category assigned when the oracle gave no usable answer.
pub const FALLBACK_CATEGORY: &str = "Other";

pub const BEHAVIORAL_TAGS: [&str; 23] = [
    "essential",
    "recurring",
    "subscription",
    "impulse",
    "luxury",
    "late-night",
    "weekend",
    "family",
    "work",
    "refund",
    "one-off",
    "DopamineHit",
    "RetailTherapy",
    "VampireSpend",
    "BoredomBuy",
    "PaydaySplurge",
    "WeekendWarrior",
    "SurvivalMode",
    "SubscriptionTrap",
    "MinimumDueTrap",
    "InterestLeak",
    "UtilizationSpike",
    "CreditRotation",
];

/// Heuristic descriptions for the pattern tags (tag, guidance).
pub const TAG_HEURISTICS: [(&str, &str); 12] = [
    ("DopamineHit", "Small, non-essential luxury purchases; frequent; coffee chains or premium snacks."),
    ("RetailTherapy", "Large shopping at fashion/electronics after period of no activity."),
    ("VampireSpend", "Small recurring leaks like multiple tiny OTT or app store purchases."),
    ("BoredomBuy", "Late night non-essential shopping between 23:00 and 04:00."),
    ("PaydaySplurge", "Significant discretionary spend within 48-72 hours after salary credit."),
    ("WeekendWarrior", "High velocity spend on Fridays/Saturdays compared to other days."),
    ("SurvivalMode", "Essential-only spend in last 5 days of month (groceries, fuel, utilities)."),
    ("SubscriptionTrap", "Monthly recurring debits rarely used; lack of related active spend."),
    ("MinimumDueTrap", "Credit card payment equals minimum due rather than total due."),
    ("InterestLeak", "Finance charges or late fees appearing on credit card statement."),
    ("UtilizationSpike", "Single transaction consumes >30% of total credit limit."),
    ("CreditRotation", "Using one card to pay off another or ATM cash withdrawal from a credit card."),
];

/// Owner categories when present, otherwise the defaults.
pub fn effective_categories(owner_categories: Vec<String>) -> Vec<String> {
    let cleaned: Vec<String> = owner_categories
        .into_iter()
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect();

    if cleaned.is_empty() {
        default_categories()
    } else {
        cleaned
    }
}

pub fn default_categories() -> Vec<String> {
    DEFAULT_CATEGORIES.iter().map(|c| c.to_string()).collect()
}
