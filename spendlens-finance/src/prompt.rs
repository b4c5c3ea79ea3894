//! Prompt builders for the oracle: batch classification, insights, budget roasts.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::json;
use spendlens_core::{
    AggregateStats, CategoryBudget, Direction, NormalizedTransaction, StatementSource, UserProfile,
    BEHAVIORAL_TAGS, DEFAULT_CONFIDENCE_THRESHOLD, TAG_HEURISTICS,
};

#[derive(Debug, Clone, Serialize)]
pub struct ExampleInput {
    pub date: &'static str,
    pub transaction_details: &'static str,
    pub transaction_type: &'static str,
    pub amount: f64,
    pub statement_type: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExampleOutput {
    pub category: &'static str,
    pub tags: &'static [&'static str],
    pub confidence: f64,
    pub requires_human_verification: bool,
    pub reasoning: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct FewShotExample {
    pub input: ExampleInput,
    pub output: ExampleOutput,
}

pub const FEW_SHOT_EXAMPLES: [FewShotExample; 5] = [
    FewShotExample {
        input: ExampleInput {
            date: "01Nov,2025",
            transaction_details: "PaidtoBlinkit",
            transaction_type: "Debit",
            amount: 425.0,
            statement_type: "UPI",
        },
        output: ExampleOutput {
            category: "Groceries",
            tags: &["essential", "recurring"],
            confidence: 0.93,
            requires_human_verification: false,
            reasoning: "Grocery purchase via UPI.",
        },
    },
    FewShotExample {
        input: ExampleInput {
            date: "18-10-2025",
            transaction_details: "POS/NETFLIX/MUMBAI/181025/08:41/481907",
            transaction_type: "Debit",
            amount: 649.0,
            statement_type: "Bank",
        },
        output: ExampleOutput {
            category: "Subscriptions",
            tags: &["subscription", "recurring"],
            confidence: 0.98,
            requires_human_verification: false,
            reasoning: "Recurring OTT subscription.",
        },
    },
    FewShotExample {
        input: ExampleInput {
            date: "03Nov,2025",
            transaction_details: "PaidtoUttarGujaratVij(UGVCL)",
            transaction_type: "Debit",
            amount: 5873.22,
            statement_type: "UPI",
        },
        output: ExampleOutput {
            category: "Utilities",
            tags: &["essential", "recurring"],
            confidence: 0.96,
            requires_human_verification: false,
            reasoning: "Electricity bill.",
        },
    },
    FewShotExample {
        input: ExampleInput {
            date: "29-10-2025",
            transaction_details: "NEFT/CITIN25645632712/CAPITAL ONE SERVICES (I) PVT/CITI BANK/",
            transaction_type: "Credit",
            amount: 165611.0,
            statement_type: "Bank",
        },
        output: ExampleOutput {
            category: "Income",
            tags: &["work", "recurring"],
            confidence: 0.98,
            requires_human_verification: false,
            reasoning: "Salary credit via NEFT.",
        },
    },
    FewShotExample {
        input: ExampleInput {
            date: "27-09-2025",
            transaction_details: "IMPS Chrgs Incl GST",
            transaction_type: "Debit",
            amount: 5.9,
            statement_type: "Bank",
        },
        output: ExampleOutput {
            category: "Fees",
            tags: &["one-off"],
            confidence: 0.88,
            requires_human_verification: false,
            reasoning: "Bank fee.",
        },
    },
];

/// One transaction as the oracle sees it.
#[derive(Debug, Clone, Serialize)]
pub struct PromptInput<'a> {
    pub id: i64,
    pub date: Option<String>,
    pub transaction_details: &'a str,
    pub transaction_type: Direction,
    pub amount: f64,
    pub statement_type: Option<StatementSource>,
}

impl<'a> PromptInput<'a> {
    /// `None` for records the store never assigned an id.
    pub fn from_record(t: &'a NormalizedTransaction) -> Option<Self> {
        Some(Self {
            id: t.id?,
            date: t.date.map(|d| d.format("%Y-%m-%d").to_string()),
            transaction_details: &t.details,
            transaction_type: t.direction,
            amount: t.amount,
            statement_type: t.statement_source,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct ClassificationRequest<'a> {
    pub task: &'static str,
    pub categories: &'a [String],
    pub tags: &'static [&'static str],
    pub apply_heuristics_first: bool,
    pub tag_heuristics: BTreeMap<&'static str, &'static str>,
    pub rules: serde_json::Value,
    pub few_shot_examples: &'static [FewShotExample],
    pub inputs: Vec<PromptInput<'a>>,
}

impl<'a> ClassificationRequest<'a> {
    pub fn new(batch: &'a [NormalizedTransaction], categories: &'a [String]) -> Self {
        let high = format!(">= {DEFAULT_CONFIDENCE_THRESHOLD}");
        let doubtful = format!("< {DEFAULT_CONFIDENCE_THRESHOLD}");

        Self {
            task: "Categorize and tag transactions. Return JSON array.",
            categories,
            tags: &BEHAVIORAL_TAGS,
            apply_heuristics_first: true,
            tag_heuristics: TAG_HEURISTICS.iter().copied().collect(),
            rules: json!({
                "output_schema": {
                    "id": "int",
                    "category": "str",
                    "tags": "list[str]",
                    "confidence": "float[0,1]",
                    "requires_human_verification": "bool"
                },
                "confidence_definition": {
                    "high": high,
                    "doubtful": doubtful
                }
            }),
            few_shot_examples: &FEW_SHOT_EXAMPLES,
            inputs: batch.iter().filter_map(PromptInput::from_record).collect(),
        }
    }

    pub fn to_prompt(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[derive(Debug, Serialize)]
struct BudgetCeiling {
    max: f64,
}

/// Narrative report prompt over the owner's aggregates and demographics.
pub fn build_insights_prompt(
    profile: &UserProfile,
    stats: &AggregateStats,
    budgets: &[CategoryBudget],
) -> serde_json::Result<String> {
    let category_stats = serde_json::to_string_pretty(&stats.categories)?;
    let tag_stats = serde_json::to_string_pretty(&stats.tags)?;
    let ceilings: BTreeMap<&str, BudgetCeiling> = budgets
        .iter()
        .map(|b| (b.name.as_str(), BudgetCeiling { max: b.max_budget }))
        .collect();
    let category_budgets = serde_json::to_string_pretty(&ceilings)?;

    Ok(format!(
        r#"### Persona
You are an elite Financial Behavioral Analyst. Your goal is to analyze structured banking data (categorized monthly debits/credits, age, income, and location) to provide deep, actionable psychological and financial insights.

### Inputs Provided
- User Demographics: Age {age}, Yearly Income {income}, Country {country}.
- Financial Data:
  - Category Stats: {category_stats}
  - Category Budgets: {category_budgets}
  - Behavioral Tag Stats: {tag_stats}

### Tasks
Please generate a report covering the following five areas:

1. **"Life Stage" Alignment:** Analyze if the spending patterns are typical for the user's age and income in their specific country. Are they over-investing in "Wants" when they should be building "Foundations" (e.g., property, retirement)?
2. **Emotional Spending Triggers:** Correlate behavioral tags (like "Impulse" or "Late Night") with category spikes. Identify what emotional state might be driving "leakage" in the budget.
3. **Peer Benchmarking:** Using your knowledge of financial standards in {country}, compare their savings rate and discretionary spending against high-performers in their income bracket.
4. **Burn Rate & Runway:** Calculate the "Core Survival Cost" (Needs only). Determine how many months the user could sustain their lifestyle if income dropped to zero.
5. **Rule-of-Thumb Audit:** Audit the data against the 50/30/20 rule. Provide a specific "Red/Yellow/Green" status for each segment and one "Golden Move" to fix the biggest imbalance.

### Output Style
- Tone: Professional, empathetic, and direct.
- Format: Use Markdown headers and bullet points. Avoid generic advice; use the specific numbers provided.
"#,
        age = profile.age,
        income = profile.yearly_income,
        country = profile.country,
    ))
}

/// Short scolding message for an exceeded category budget.
pub fn build_roast_prompt(category: &str, spent: f64, limit: f64, profile: Option<&UserProfile>) -> String {
    let mut who = String::new();
    if let Some(p) = profile {
        if let Some(name) = p.name.as_deref().filter(|n| !n.trim().is_empty()) {
            who.push_str(&format!("The user's name is {name}. "));
        }
        who.push_str(&format!("The user is {} years old.", p.age));
    }

    format!(
        "You are a witty, sarcastic, and slightly mean financial advisor.\n\
         {who}\n\
         The user has exceeded their budget for the category '{category}'.\n\
         They spent ₹{spent:.2} but their limit was ₹{limit:.2}.\n\n\
         Write a short, personalized, quirky, and roasting message (max 2-3 sentences) scolding them for this financial irresponsibility.\n\
         Use their name if provided.\n\
         Use Indian currency symbol (₹). Make it memorable, funny, and stinging but not offensive.\n"
    )
}
