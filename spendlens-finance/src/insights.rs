//! Aggregation and the narrative insights report.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use spendlens_core::{AggregateStats, ClassificationResult, UserProfile, VerificationStatus};

use crate::oracle::{Oracle, ResponseMode};
use crate::prompt::build_insights_prompt;
use crate::store::Store;

pub const NO_VERIFIED_DATA: &str =
    "No verified financial data found. Please upload and verify bank statements first.";
pub const INSIGHTS_FAILED: &str = "Failed to generate insights. Please try again later.";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InsightsReport {
    pub owner_id: String,
    pub stats: AggregateStats,
    pub text: String,
    /// `false` when `text` is one of the fixed fallback messages
    pub generated: bool,
}

pub struct InsightsEngine {
    store: Arc<dyn Store>,
    oracle: Arc<dyn Oracle>,
}

impl InsightsEngine {
    pub fn new(store: Arc<dyn Store>, oracle: Arc<dyn Oracle>) -> Self {
        Self { store, oracle }
    }

    /// Trusted history plus `current`. Stored rows that `current` also carries
    /// count once, from `current`.
    pub async fn aggregate(&self, owner: &str, current: &[ClassificationResult]) -> AggregateStats {
        let mut history = self
            .store
            .fetch_by_status(Some(owner), &VerificationStatus::TRUSTED, None)
            .await
            .unwrap_or_else(|e| {
                tracing::error!(owner, error = %e, "failed to fetch verified transactions");
                Vec::new()
            });
        let current_ids: HashSet<i64> = current.iter().map(|r| r.id).collect();
        history.retain(|t| t.id.is_none_or(|id| !current_ids.contains(&id)));
        AggregateStats::compute(&history, current)
    }

    pub async fn generate(&self, owner: &str, current: &[ClassificationResult]) -> InsightsReport {
        let stats = self.aggregate(owner, current).await;

        let fallback = |stats: AggregateStats, text: &str| InsightsReport {
            owner_id: owner.to_string(),
            stats,
            text: text.to_string(),
            generated: false,
        };

        if stats.is_empty() {
            tracing::warn!(owner, "no verified transactions for insights");
            return fallback(stats, NO_VERIFIED_DATA);
        }

        let profile = match self.store.profile(owner).await {
            Ok(p) => p.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(owner, error = %e, "profile unavailable; using defaults");
                UserProfile::default()
            }
        };
        let budgets = self.store.budgets(owner).await.unwrap_or_else(|e| {
            tracing::error!(owner, error = %e, "failed to read category budgets for insights");
            Vec::new()
        });

        let prompt = match build_insights_prompt(&profile, &stats, &budgets) {
            Ok(p) => p,
            Err(e) => {
                tracing::error!(owner, error = %e, "failed to build insights prompt");
                return fallback(stats, INSIGHTS_FAILED);
            }
        };

        let text = match self.oracle.generate(&prompt, ResponseMode::Text).await {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => {
                tracing::warn!(owner, "oracle returned empty insights");
                return fallback(stats, INSIGHTS_FAILED);
            }
            Err(e) => {
                tracing::error!(owner, error = %e, "insights oracle call failed");
                return fallback(stats, INSIGHTS_FAILED);
            }
        };

        tracing::info!(owner, len = text.len(), "insights generated");
        if let Err(e) = self.store.save_insight(owner, &text).await {
            tracing::error!(owner, error = %e, "failed to persist insights");
        }

        InsightsReport {
            owner_id: owner.to_string(),
            stats,
            text,
            generated: true,
        }
    }
}
