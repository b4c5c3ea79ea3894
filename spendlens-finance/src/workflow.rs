//! Classification orchestrator.
//!
//! A run is a small state machine:
//!
//! ```text
//! FetchBatch -> Classify -> BehavioralAnalysis -> Done
//!                        \-> FlagForReview -----/
//! ```
//!
//! `step` consumes the current stage and returns the next one. Every failure
//! on the way degrades (empty batch, empty verdict list) instead of aborting,
//! so a run always reaches `Done`. Persistence and budget checks happen after
//! the machine halts, whichever branch it took.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use spendlens_core::{
    effective_categories, route_batch, ClassificationResult, NormalizedTransaction, Route,
    VerificationDecision, VerificationStatus, DEFAULT_CONFIDENCE_THRESHOLD,
};

use crate::budget::{BudgetMonitor, Notifier};
use crate::oracle::{Oracle, ResponseMode};
use crate::prompt::ClassificationRequest;
use crate::store::Store;
use crate::verdict::{decode_verdicts, Verdict};

pub const DEFAULT_BATCH_SIZE: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorkflowConfig {
    pub batch_size: usize,
    pub threshold: f64,
    /// Calendar used for monthly budget windows
    pub timezone: Tz,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            timezone: chrono_tz::Asia::Kolkata,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    FetchBatch,
    Classify {
        batch: Vec<NormalizedTransaction>,
        categories: Vec<String>,
    },
    BehavioralAnalysis {
        results: Vec<ClassificationResult>,
    },
    FlagForReview {
        results: Vec<ClassificationResult>,
    },
    Done {
        path: Route,
        results: Vec<ClassificationResult>,
    },
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::FetchBatch => "fetch_batch",
            Stage::Classify { .. } => "classify",
            Stage::BehavioralAnalysis { .. } => "behavioral_analysis",
            Stage::FlagForReview { .. } => "flag_for_review",
            Stage::Done { .. } => "done",
        }
    }
}

/// What a finished run reports back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOutcome {
    pub path: Route,
    pub processed: usize,
    pub flagged_count: usize,
    /// Results needing a human, for the review queue
    pub flagged: Vec<ClassificationResult>,
    /// Budget alerts raised after persistence
    pub alerts: usize,
}

/// Apply the verification gate to every transaction of the batch.
///
/// Exactly one result per transaction that has an id, in batch order. A
/// transaction with no verdict gets the fallback result.
pub fn merge(batch: &[NormalizedTransaction], verdicts: Vec<Verdict>, threshold: f64) -> Vec<ClassificationResult> {
    let mut by_id: HashMap<i64, Verdict> = HashMap::with_capacity(verdicts.len());
    for v in verdicts {
        by_id.entry(v.id).or_insert(v);
    }

    batch
        .iter()
        .filter_map(|t| {
            let Some(id) = t.id else {
                tracing::warn!(details = %t.details, "unsaved transaction in batch skipped");
                return None;
            };
            let result = match by_id.remove(&id) {
                None => ClassificationResult::missing(id, t.details.clone(), t.amount, t.direction),
                Some(v) => ClassificationResult {
                    id,
                    details: t.details.clone(),
                    amount: t.amount,
                    direction: t.direction,
                    decision: VerificationDecision::decide(v.confidence, v.requires_human_verification, threshold),
                    category: v.category,
                    tags: v.tags,
                    confidence: v.confidence,
                },
            };
            Some(result)
        })
        .collect()
}

pub struct ClassificationWorkflow {
    store: Arc<dyn Store>,
    oracle: Arc<dyn Oracle>,
    monitor: BudgetMonitor,
    config: WorkflowConfig,
}

impl ClassificationWorkflow {
    pub fn new(
        store: Arc<dyn Store>,
        oracle: Arc<dyn Oracle>,
        notifier: Arc<dyn Notifier>,
        config: WorkflowConfig,
    ) -> Self {
        let monitor = BudgetMonitor::new(store.clone(), oracle.clone(), notifier, config.timezone);
        Self {
            store,
            oracle,
            monitor,
            config,
        }
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    /// Run the machine to completion, persist every result, then check budgets.
    pub async fn run(&self, owner: Option<&str>, email: Option<&str>) -> RunOutcome {
        let mut stage = Stage::FetchBatch;
        let (path, results) = loop {
            tracing::debug!(owner = owner.unwrap_or("*"), stage = stage.name(), "workflow step");
            stage = self.step(owner, stage).await;
            if let Stage::Done { path, results } = stage {
                break (path, results);
            }
        };

        let touched = self.persist(&results).await;

        let alerts = match owner {
            Some(owner) if !touched.is_empty() => {
                let today = self.monitor.today();
                self.monitor
                    .check_categories(owner, email, touched.iter().map(String::as_str), today)
                    .await
                    .len()
            }
            _ => 0,
        };

        let flagged: Vec<ClassificationResult> = results.iter().filter(|r| r.needs_review()).cloned().collect();

        tracing::info!(
            owner = owner.unwrap_or("*"),
            path = ?path,
            processed = results.len(),
            flagged = flagged.len(),
            "classification run finished"
        );

        RunOutcome {
            path,
            processed: results.len(),
            flagged_count: flagged.len(),
            flagged,
            alerts,
        }
    }

    /// One transition.
    pub async fn step(&self, owner: Option<&str>, stage: Stage) -> Stage {
        match stage {
            Stage::FetchBatch => {
                let (batch, categories) = self.fetch_batch(owner).await;
                Stage::Classify { batch, categories }
            }
            Stage::Classify { batch, categories } => {
                let results = self.classify(&batch, &categories).await;
                match route_batch(&results, self.config.threshold) {
                    Route::BehavioralAnalysis => Stage::BehavioralAnalysis { results },
                    Route::FlagForReview => Stage::FlagForReview { results },
                }
            }
            Stage::BehavioralAnalysis { results } => Stage::Done {
                path: Route::BehavioralAnalysis,
                results,
            },
            Stage::FlagForReview { results } => Stage::Done {
                path: Route::FlagForReview,
                results,
            },
            done @ Stage::Done { .. } => done,
        }
    }

    async fn fetch_batch(&self, owner: Option<&str>) -> (Vec<NormalizedTransaction>, Vec<String>) {
        let categories = match owner {
            Some(o) => match self.store.categories(o).await {
                Ok(cats) => effective_categories(cats),
                Err(e) => {
                    tracing::error!(owner = o, error = %e, "failed to read categories; using defaults");
                    effective_categories(Vec::new())
                }
            },
            None => effective_categories(Vec::new()),
        };

        let batch = self
            .store
            .fetch_by_status(owner, &[VerificationStatus::Unverified], Some(self.config.batch_size))
            .await
            .unwrap_or_else(|e| {
                tracing::error!(owner = owner.unwrap_or("*"), error = %e, "failed to fetch unverified batch");
                Vec::new()
            });

        tracing::info!(owner = owner.unwrap_or("*"), fetched = batch.len(), "fetched unverified transactions");
        (batch, categories)
    }

    async fn classify(&self, batch: &[NormalizedTransaction], categories: &[String]) -> Vec<ClassificationResult> {
        if batch.is_empty() {
            tracing::info!("nothing to classify");
            return Vec::new();
        }

        let verdicts = match ClassificationRequest::new(batch, categories).to_prompt() {
            Ok(prompt) => self.ask_oracle(&prompt).await,
            Err(e) => {
                tracing::error!(error = %e, "failed to build classification prompt");
                Vec::new()
            }
        };

        merge(batch, verdicts, self.config.threshold)
    }

    async fn ask_oracle(&self, prompt: &str) -> Vec<Verdict> {
        let raw = match self.oracle.generate(prompt, ResponseMode::Json).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::error!(error = %e, "classification oracle call failed");
                return Vec::new();
            }
        };
        match decode_verdicts(&raw) {
            Ok(v) => v,
            Err(e) => {
                tracing::error!(error = %e, "could not decode oracle verdicts");
                Vec::new()
            }
        }
    }

    /// Write every result back. Returns the categories that were written.
    async fn persist(&self, results: &[ClassificationResult]) -> BTreeSet<String> {
        let mut touched = BTreeSet::new();
        for r in results {
            match self
                .store
                .apply_classification(r.id, &r.category, &r.tags, r.status())
                .await
            {
                Ok(()) => {
                    touched.insert(r.category.clone());
                }
                Err(e) => tracing::error!(id = r.id, error = %e, "failed to persist classification"),
            }
        }
        touched
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use spendlens_core::Direction;

    fn txn(id: i64, details: &str) -> NormalizedTransaction {
        let mut t = NormalizedTransaction::new(NaiveDate::from_ymd_opt(2025, 11, 1), details, 100.0, Direction::Debit);
        t.id = Some(id);
        t
    }

    fn verdict(id: i64, confidence: f64) -> Verdict {
        Verdict {
            id,
            category: "Groceries".into(),
            tags: vec!["essential".into()],
            confidence,
            requires_human_verification: false,
        }
    }

    #[test]
    fn test_merge_is_total() {
        let batch = vec![txn(1, "A"), txn(2, "B"), txn(3, "C")];
        let results = merge(&batch, vec![verdict(2, 0.9), verdict(99, 0.9)], 0.85);

        assert_eq!(results.len(), 3);
        assert_eq!(results.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(results[0].category, "Other");
        assert_eq!(results[0].confidence, 0.0);
        assert!(results[0].needs_review());
        assert_eq!(results[1].decision, VerificationDecision::AiVerified);
        assert!(results[2].needs_review());
    }

    #[test]
    fn test_merge_honours_oracle_flag_and_threshold() {
        let batch = vec![txn(1, "A"), txn(2, "B")];
        let mut flagged = verdict(1, 0.99);
        flagged.requires_human_verification = true;
        let results = merge(&batch, vec![flagged, verdict(2, 0.84)], 0.85);
        assert!(results.iter().all(|r| r.needs_review()));
    }

    #[test]
    fn test_merge_first_duplicate_wins() {
        let batch = vec![txn(1, "A")];
        let mut second = verdict(1, 0.95);
        second.category = "Shopping".into();
        let results = merge(&batch, vec![verdict(1, 0.95), second], 0.85);
        assert_eq!(results[0].category, "Groceries");
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(Stage::FetchBatch.name(), "fetch_batch");
        let done = Stage::Done {
            path: Route::FlagForReview,
            results: Vec::new(),
        };
        assert_eq!(done.name(), "done");
    }
}
