//! Classification results, the verification gate, and batch routing.
//!
//! The gate is deterministic: the oracle proposes a category, tags and a
//! confidence, and only this module decides whether a human must look at it.

use serde::{Deserialize, Serialize};

use crate::finance::{Direction, VerificationStatus};
use crate::taxonomy::FALLBACK_CATEGORY;

pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.85;

/// Outcome of the verification gate for one transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationDecision {
    AiVerified,
    RequiredHumanVerification,
}

impl VerificationDecision {
    /// `AiVerified` iff `confidence >= threshold` and the oracle did not ask for a human.
    pub fn decide(confidence: f64, requires_human_verification: bool, threshold: f64) -> Self {
        if confidence >= threshold && !requires_human_verification {
            VerificationDecision::AiVerified
        } else {
            VerificationDecision::RequiredHumanVerification
        }
    }

    pub fn status(&self) -> VerificationStatus {
        match self {
            VerificationDecision::AiVerified => VerificationStatus::AiVerified,
            VerificationDecision::RequiredHumanVerification => {
                VerificationStatus::RequiredHumanVerification
            }
        }
    }
}

/// Merged classification for one transaction of a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub id: i64,
    pub details: String,
    pub amount: f64,
    pub direction: Direction,
    pub category: String,
    pub tags: Vec<String>,
    pub confidence: f64,
    pub decision: VerificationDecision,
}

impl ClassificationResult {
    /// The result used when the oracle returned nothing for this id.
    pub fn missing(id: i64, details: impl Into<String>, amount: f64, direction: Direction) -> Self {
        Self {
            id,
            details: details.into(),
            amount,
            direction,
            category: FALLBACK_CATEGORY.to_string(),
            tags: Vec::new(),
            confidence: 0.0,
            decision: VerificationDecision::RequiredHumanVerification,
        }
    }

    pub fn needs_review(&self) -> bool {
        self.decision == VerificationDecision::RequiredHumanVerification
    }

    pub fn status(&self) -> VerificationStatus {
        self.decision.status()
    }
}

/// Branch taken by a classification run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    /// Every result in the batch was trusted.
    BehavioralAnalysis,
    /// At least one result needs a human, or the batch was empty.
    FlagForReview,
}

/// All-or-nothing routing over a merged batch.
pub fn route_batch(results: &[ClassificationResult], threshold: f64) -> Route {
    if results.is_empty() {
        return Route::FlagForReview;
    }

    let all_trusted = results
        .iter()
        .all(|r| r.decision == VerificationDecision::AiVerified && r.confidence >= threshold);

    if all_trusted {
        Route::BehavioralAnalysis
    } else {
        Route::FlagForReview
    }
}
