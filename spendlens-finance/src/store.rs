//! Storage seams for transactions, owner taxonomy and profiles.
//!
//! The relational backend is an external collaborator; the workflow only
//! talks to these traits. `MemoryStore` implements all of them in-process.

use async_trait::async_trait;
use chrono::NaiveDate;
use spendlens_core::{CategoryBudget, NormalizedTransaction, UserProfile, VerificationStatus};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("transaction {0} not found")]
    NotFound(i64),

    #[error("store backend error: {0}")]
    Backend(String),

    #[error("store io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Insert records, silently skipping natural-key conflicts. Returns the inserted count.
    async fn upsert_transactions(&self, records: Vec<NormalizedTransaction>) -> StoreResult<usize>;

    /// Transactions in any of `statuses`, oldest first. `owner = None` spans all owners.
    async fn fetch_by_status(
        &self,
        owner: Option<&str>,
        statuses: &[VerificationStatus],
        limit: Option<usize>,
    ) -> StoreResult<Vec<NormalizedTransaction>>;

    async fn apply_classification(
        &self,
        id: i64,
        category: &str,
        tags: &[String],
        status: VerificationStatus,
    ) -> StoreResult<()>;

    /// Sum of debits in `category` during the calendar month containing `month`.
    async fn debit_total(&self, owner: &str, category: &str, month: NaiveDate) -> StoreResult<f64>;
}

#[async_trait]
pub trait TaxonomyStore: Send + Sync {
    /// Owner-defined category names; empty when the owner has none.
    async fn categories(&self, owner: &str) -> StoreResult<Vec<String>>;
    async fn budgets(&self, owner: &str) -> StoreResult<Vec<CategoryBudget>>;
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn profile(&self, owner: &str) -> StoreResult<Option<UserProfile>>;
    async fn save_insight(&self, owner: &str, content: &str) -> StoreResult<()>;
}

/// Everything the workflow needs from a backend.
pub trait Store: TransactionStore + TaxonomyStore + ProfileStore {}

impl<T: TransactionStore + TaxonomyStore + ProfileStore + ?Sized> Store for T {}
