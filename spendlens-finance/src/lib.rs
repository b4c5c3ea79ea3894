//! spendlens-finance: classification workflow, oracle client, store seams, budget alerts, insights and jobs

pub mod budget;
pub mod insights;
pub mod jobs;
pub mod memory;
pub mod oracle;
pub mod prompt;
pub mod store;
pub mod verdict;
pub mod workflow;

pub use budget::{BudgetAlert, BudgetMonitor, LogNotifier, Notifier, ROAST_FALLBACK};
pub use insights::{InsightsEngine, InsightsReport, INSIGHTS_FAILED, NO_VERIFIED_DATA};
pub use jobs::{JobBoard, JobKind, JobRecord, JobStatus};
pub use memory::{Insight, Ledger, MemoryStore};
pub use oracle::{GeminiConfig, GeminiOracle, Oracle, OracleError, ResponseMode};
pub use prompt::{ClassificationRequest, FEW_SHOT_EXAMPLES};
pub use store::{ProfileStore, Store, StoreError, StoreResult, TaxonomyStore, TransactionStore};
pub use verdict::{decode_verdicts, Verdict, VerdictError};
pub use workflow::{merge, ClassificationWorkflow, RunOutcome, Stage, WorkflowConfig, DEFAULT_BATCH_SIZE};
