//! Record materializer: raw extractor tuples to canonical transactions.

use spendlens_core::{NormalizedTransaction, StatementSource};

use crate::detect::StatementFormat;
use crate::normalize::{clean_details, normalize_amount, normalize_date, normalize_direction};
use crate::types::{RawStatementDocument, RawTransactionTuple};

/// Normalize one tuple. Unparseable dates become `None`, bad amounts `0.0`.
pub fn to_record(
    raw: &RawTransactionTuple,
    source: Option<StatementSource>,
    owner: Option<&str>,
) -> NormalizedTransaction {
    // Direction reads the raw text; cleaning strips the "received from" cue
    let direction = normalize_direction(raw.direction, &raw.details);
    let details = clean_details(&raw.details);

    let mut record = NormalizedTransaction::new(
        normalize_date(&raw.date),
        details,
        normalize_amount(&raw.amount),
        direction,
    );
    record.statement_source = source;
    record.owner_id = owner.map(str::to_string);
    record
}

pub fn to_records(
    raw: &[RawTransactionTuple],
    source: Option<StatementSource>,
    owner: Option<&str>,
) -> Vec<NormalizedTransaction> {
    raw.iter().map(|t| to_record(t, source, owner)).collect()
}

/// What one document produced.
#[derive(Debug, Clone)]
pub struct IngestReport {
    pub format: StatementFormat,
    pub tuples: usize,
    pub records: Vec<NormalizedTransaction>,
}

impl IngestReport {
    pub fn undated(&self) -> usize {
        self.records.iter().filter(|r| r.date.is_none()).count()
    }
}

/// Detect, extract and materialize a single document.
pub fn ingest_document(
    doc: &RawStatementDocument,
    source: Option<StatementSource>,
    owner: Option<&str>,
) -> IngestReport {
    let format = StatementFormat::for_document(doc);
    let tuples = format.extract(doc);

    tracing::info!(
        format = %format,
        filename = doc.filename.as_deref().unwrap_or("-"),
        rows = tuples.len(),
        "extracted statement"
    );

    IngestReport {
        format,
        tuples: tuples.len(),
        records: to_records(&tuples, source, owner),
    }
}
