//! Per-category and per-tag spend totals for reporting.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::classification::ClassificationResult;
use crate::finance::{round_money, Direction, NormalizedTransaction};
use crate::taxonomy::FALLBACK_CATEGORY;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DirectionTotals {
    pub credit_total: f64,
    pub debit_total: f64,
}

impl DirectionTotals {
    fn add(&mut self, amount: f64, direction: Direction) {
        match direction {
            Direction::Credit => self.credit_total = round_money(self.credit_total + amount),
            Direction::Debit => self.debit_total = round_money(self.debit_total + amount),
        }
    }
}

/// Totals keyed by category and, separately, by tag.
///
/// A transaction contributes its full amount to every one of its tags, so tag
/// totals do not sum to category totals.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateStats {
    pub categories: BTreeMap<String, DirectionTotals>,
    pub tags: BTreeMap<String, DirectionTotals>,
}

impl AggregateStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recompute from the stored trusted history plus the current run's results.
    pub fn compute(history: &[NormalizedTransaction], current: &[ClassificationResult]) -> Self {
        let mut stats = Self::new();
        for t in history {
            let category = t.category.as_deref().unwrap_or(FALLBACK_CATEGORY);
            stats.record(category, &t.tags, t.amount, t.direction);
        }
        for r in current {
            stats.record(&r.category, &r.tags, r.amount, r.direction);
        }
        stats
    }

    pub fn record(&mut self, category: &str, tags: &[String], amount: f64, direction: Direction) {
        self.categories
            .entry(category.to_string())
            .or_default()
            .add(amount, direction);

        for tag in tags {
            self.tags.entry(tag.clone()).or_default().add(amount, direction);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn total_debit(&self) -> f64 {
        round_money(self.categories.values().map(|t| t.debit_total).sum())
    }

    pub fn total_credit(&self) -> f64 {
        round_money(self.categories.values().map(|t| t.credit_total).sum())
    }
}
