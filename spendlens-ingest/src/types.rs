use serde::{Deserialize, Serialize};
use spendlens_core::Direction;

/// One table as extracted from a page: rows of optional cells.
pub type Table = Vec<Vec<Option<String>>>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Page {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub tables: Vec<Table>,
}

/// Statement content handed over by the document provider (PDF-to-text, OCR, CSV export).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawStatementDocument {
    /// Original upload name; some layouts are only recognisable by it
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub pages: Vec<Page>,
}

impl RawStatementDocument {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            filename: None,
            pages: vec![Page {
                text: text.into(),
                tables: Vec::new(),
            }],
        }
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn first_page_text(&self) -> &str {
        self.pages.first().map(|p| p.text.as_str()).unwrap_or("")
    }

    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.pages.iter().flat_map(|p| p.tables.iter())
    }
}

/// Amount as found on the statement, before normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawAmount {
    Number(f64),
    Text(String),
}

impl From<f64> for RawAmount {
    fn from(v: f64) -> Self {
        RawAmount::Number(v)
    }
}

/// One transaction as an extractor saw it. Not yet validated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTransactionTuple {
    pub date: String,
    pub details: String,
    pub amount: RawAmount,
    /// `None` lets the materializer infer direction from the details
    #[serde(default)]
    pub direction: Option<Direction>,
}

impl RawTransactionTuple {
    pub fn new(
        date: impl Into<String>,
        details: impl Into<String>,
        amount: f64,
        direction: Direction,
    ) -> Self {
        Self {
            date: date.into(),
            details: details.into(),
            amount: RawAmount::Number(amount),
            direction: Some(direction),
        }
    }

    pub fn amount_value(&self) -> f64 {
        match &self.amount {
            RawAmount::Number(v) => *v,
            RawAmount::Text(s) => crate::normalize::parse_amount(s),
        }
    }
}
