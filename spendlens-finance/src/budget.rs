//! Monthly budget monitor run after a classification batch is persisted.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use crate::oracle::{Oracle, ResponseMode};
use crate::prompt::build_roast_prompt;
use crate::store::Store;

pub const ROAST_FALLBACK: &str = "You've exceeded your budget. Try to spend less next time!";

/// Categories that never trigger an alert.
const UNBUDGETED: &str = "Uncategorized";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetAlert {
    pub owner_id: String,
    pub email: String,
    pub category: String,
    pub spent: f64,
    pub limit: f64,
    pub message: String,
}

/// Delivery of budget alerts (email in production).
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn budget_exceeded(&self, alert: BudgetAlert) -> anyhow::Result<()>;
}

/// Writes alerts to the log instead of sending them anywhere.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn budget_exceeded(&self, alert: BudgetAlert) -> anyhow::Result<()> {
        tracing::warn!(
            owner = %alert.owner_id,
            email = %alert.email,
            category = %alert.category,
            spent = alert.spent,
            limit = alert.limit,
            message = %alert.message,
            "budget exceeded"
        );
        Ok(())
    }
}

pub struct BudgetMonitor {
    store: Arc<dyn Store>,
    oracle: Arc<dyn Oracle>,
    notifier: Arc<dyn Notifier>,
    timezone: Tz,
}

impl BudgetMonitor {
    pub fn new(store: Arc<dyn Store>, oracle: Arc<dyn Oracle>, notifier: Arc<dyn Notifier>, timezone: Tz) -> Self {
        Self {
            store,
            oracle,
            notifier,
            timezone,
        }
    }

    /// Today in the monitor's timezone; budgets are per calendar month there.
    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.timezone).date_naive()
    }

    /// Check every category a run touched. Returns the alerts that were sent.
    pub async fn check_categories<'a>(
        &self,
        owner: &str,
        email: Option<&str>,
        categories: impl IntoIterator<Item = &'a str>,
        today: NaiveDate,
    ) -> Vec<BudgetAlert> {
        let Some(email) = email.filter(|e| !e.trim().is_empty()) else {
            tracing::warn!(owner, "no email for owner; budget alerts skipped");
            return Vec::new();
        };

        let mut sent = Vec::new();
        for category in categories {
            if category == UNBUDGETED {
                continue;
            }
            if let Some(alert) = self.check(owner, email, category, today).await {
                sent.push(alert);
            }
        }
        sent
    }

    /// One category. `None` when there is no enabled budget, it is not exceeded,
    /// or something on the way failed (logged).
    pub async fn check(&self, owner: &str, email: &str, category: &str, today: NaiveDate) -> Option<BudgetAlert> {
        let budgets = match self.store.budgets(owner).await {
            Ok(b) => b,
            Err(e) => {
                tracing::error!(owner, error = %e, "failed to read budgets");
                return None;
            }
        };
        let limit = budgets
            .iter()
            .find(|b| b.name == category)
            .filter(|b| b.is_enabled())?
            .max_budget;

        let spent = match self.store.debit_total(owner, category, today).await {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(owner, category, error = %e, "failed to total monthly spend");
                return None;
            }
        };
        if spent <= limit {
            return None;
        }

        tracing::info!(owner, category, spent, limit, "budget exceeded");

        let profile = self.store.profile(owner).await.unwrap_or_else(|e| {
            tracing::warn!(owner, error = %e, "profile unavailable for alert");
            None
        });
        let message = self.roast(category, spent, limit, profile.as_ref()).await;

        let alert = BudgetAlert {
            owner_id: owner.to_string(),
            email: email.to_string(),
            category: category.to_string(),
            spent,
            limit,
            message,
        };
        if let Err(e) = self.notifier.budget_exceeded(alert.clone()).await {
            tracing::error!(owner, category, error = %e, "budget alert delivery failed");
            return None;
        }
        Some(alert)
    }

    async fn roast(
        &self,
        category: &str,
        spent: f64,
        limit: f64,
        profile: Option<&spendlens_core::UserProfile>,
    ) -> String {
        let prompt = build_roast_prompt(category, spent, limit, profile);
        match self.oracle.generate(&prompt, ResponseMode::Text).await {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => ROAST_FALLBACK.to_string(),
            Err(e) => {
                tracing::warn!(error = %e, "roast generation failed; using fallback");
                ROAST_FALLBACK.to_string()
            }
        }
    }
}
