//! spendlens-ingest: statement documents, issuer extractors, format detection and record materialization.

pub mod detect;
pub mod load;
pub mod materialize;
pub mod normalize;
pub mod parsers;
pub mod types;

pub use detect::StatementFormat;
pub use load::load_document;
pub use materialize::{ingest_document, to_record, to_records, IngestReport};
pub use types::{Page, RawAmount, RawStatementDocument, RawTransactionTuple, Table};
