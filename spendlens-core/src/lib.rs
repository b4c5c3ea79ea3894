//! spendlens-core: canonical transaction model, taxonomy, verification gate and aggregates

pub mod aggregate;
pub mod classification;
pub mod finance;
pub mod profile;
pub mod taxonomy;

pub use aggregate::{AggregateStats, DirectionTotals};
pub use classification::{
    route_batch, ClassificationResult, Route, VerificationDecision, DEFAULT_CONFIDENCE_THRESHOLD,
};
pub use finance::{
    round_money, Direction, NaturalKey, NormalizedTransaction, StatementSource, VerificationStatus,
};
pub use profile::{CategoryBudget, UserProfile};
pub use taxonomy::{
    default_categories, effective_categories, BEHAVIORAL_TAGS, DEFAULT_CATEGORIES,
    FALLBACK_CATEGORY, TAG_HEURISTICS,
};
