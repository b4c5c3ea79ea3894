//! In-process store with a JSON snapshot, used by the CLI and tests.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use spendlens_core::{default_categories, CategoryBudget, NormalizedTransaction, UserProfile, VerificationStatus};

use crate::store::{ProfileStore, StoreError, StoreResult, TaxonomyStore, TransactionStore};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    pub owner_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Ledger {
    #[serde(default)]
    pub next_id: i64,
    #[serde(default)]
    pub transactions: Vec<NormalizedTransaction>,
    /// owner -> categories with their monthly ceilings
    #[serde(default)]
    pub budgets: HashMap<String, Vec<CategoryBudget>>,
    #[serde(default)]
    pub profiles: HashMap<String, UserProfile>,
    #[serde(default)]
    pub insights: Vec<Insight>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    ledger: RwLock<Ledger>,
}

fn same_month(a: NaiveDate, b: NaiveDate) -> bool {
    a.year() == b.year() && a.month() == b.month()
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_ledger(ledger: Ledger) -> Self {
        Self {
            ledger: RwLock::new(ledger),
        }
    }

    /// Load a snapshot, or start empty when the file does not exist yet.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::new());
        }
        let raw = std::fs::read_to_string(path)?;
        let ledger: Ledger = serde_json::from_str(&raw)?;
        Ok(Self::from_ledger(ledger))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> StoreResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string_pretty(&*self.read()?)?;
        std::fs::write(path, raw)?;
        Ok(())
    }

    /// Upsert one ceiling. An owner's first budget also seeds the default
    /// taxonomy (ceiling 0) so the classification categories never shrink.
    pub fn set_budget(&self, owner: &str, budget: CategoryBudget) -> StoreResult<()> {
        let mut ledger = self.write()?;
        let budgets = ledger.budgets.entry(owner.to_string()).or_default();
        if budgets.is_empty() {
            budgets.extend(default_categories().into_iter().map(|name| CategoryBudget::new(name, 0.0)));
        }
        match budgets.iter_mut().find(|b| b.name == budget.name) {
            Some(existing) => existing.max_budget = budget.max_budget,
            None => budgets.push(budget),
        }
        Ok(())
    }

    pub fn set_profile(&self, owner: &str, profile: UserProfile) -> StoreResult<()> {
        self.write()?.profiles.insert(owner.to_string(), profile);
        Ok(())
    }

    pub fn insights(&self, owner: &str) -> StoreResult<Vec<Insight>> {
        Ok(self
            .read()?
            .insights
            .iter()
            .filter(|i| i.owner_id == owner)
            .cloned()
            .collect())
    }

    pub fn transaction(&self, id: i64) -> StoreResult<NormalizedTransaction> {
        self.read()?
            .transactions
            .iter()
            .find(|t| t.id == Some(id))
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    pub fn len(&self) -> StoreResult<usize> {
        Ok(self.read()?.transactions.len())
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Ledger>> {
        self.ledger
            .read()
            .map_err(|e| StoreError::Backend(format!("ledger lock poisoned: {e}")))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Ledger>> {
        self.ledger
            .write()
            .map_err(|e| StoreError::Backend(format!("ledger lock poisoned: {e}")))
    }
}

#[async_trait]
impl TransactionStore for MemoryStore {
    async fn upsert_transactions(&self, records: Vec<NormalizedTransaction>) -> StoreResult<usize> {
        let mut ledger = self.write()?;
        let mut seen: HashSet<_> = ledger.transactions.iter().map(|t| t.natural_key()).collect();

        let mut inserted = 0;
        for mut record in records {
            if !seen.insert(record.natural_key()) {
                continue;
            }
            ledger.next_id += 1;
            record.id = Some(ledger.next_id);
            ledger.transactions.push(record);
            inserted += 1;
        }

        tracing::debug!(inserted, total = ledger.transactions.len(), "upserted transactions");
        Ok(inserted)
    }

    async fn fetch_by_status(
        &self,
        owner: Option<&str>,
        statuses: &[VerificationStatus],
        limit: Option<usize>,
    ) -> StoreResult<Vec<NormalizedTransaction>> {
        let ledger = self.read()?;
        Ok(ledger
            .transactions
            .iter()
            .filter(|t| owner.is_none_or(|o| t.owner_id.as_deref() == Some(o)))
            .filter(|t| statuses.contains(&t.verification_status))
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    async fn apply_classification(
        &self,
        id: i64,
        category: &str,
        tags: &[String],
        status: VerificationStatus,
    ) -> StoreResult<()> {
        let mut ledger = self.write()?;
        let txn = ledger
            .transactions
            .iter_mut()
            .find(|t| t.id == Some(id))
            .ok_or(StoreError::NotFound(id))?;

        txn.category = Some(category.to_string());
        txn.tags = tags.to_vec();
        txn.verification_status = status;
        Ok(())
    }

    async fn debit_total(&self, owner: &str, category: &str, month: NaiveDate) -> StoreResult<f64> {
        let ledger = self.read()?;
        let total = ledger
            .transactions
            .iter()
            .filter(|t| t.owner_id.as_deref() == Some(owner))
            .filter(|t| t.is_debit() && t.category.as_deref() == Some(category))
            .filter(|t| t.date.is_some_and(|d| same_month(d, month)))
            .map(|t| t.amount)
            .sum::<f64>();
        Ok(spendlens_core::round_money(total))
    }
}

#[async_trait]
impl TaxonomyStore for MemoryStore {
    async fn categories(&self, owner: &str) -> StoreResult<Vec<String>> {
        Ok(self
            .read()?
            .budgets
            .get(owner)
            .map(|b| b.iter().map(|c| c.name.clone()).collect())
            .unwrap_or_default())
    }

    async fn budgets(&self, owner: &str) -> StoreResult<Vec<CategoryBudget>> {
        Ok(self.read()?.budgets.get(owner).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn profile(&self, owner: &str) -> StoreResult<Option<UserProfile>> {
        Ok(self.read()?.profiles.get(owner).cloned())
    }

    async fn save_insight(&self, owner: &str, content: &str) -> StoreResult<()> {
        self.write()?.insights.push(Insight {
            owner_id: owner.to_string(),
            content: content.to_string(),
            created_at: Utc::now(),
        });
        Ok(())
    }
}
