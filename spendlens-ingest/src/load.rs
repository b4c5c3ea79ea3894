//! Load statement documents prepared by an external PDF-to-text step.
//!
//! `.json` is a serialized `RawStatementDocument`; `.csv` becomes a single
//! page whose one table is the CSV grid (text is the rows joined by spaces);
//! anything else is read as plain text, pages split on form feeds.

use std::path::Path;

use anyhow::{Context, Result};

use crate::types::{Page, RawStatementDocument, Table};

const PAGE_BREAK: char = '\u{c}';

pub fn load_document(path: impl AsRef<Path>) -> Result<RawStatementDocument> {
    let path = path.as_ref();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let mut doc = match ext.as_str() {
        "json" => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_str::<RawStatementDocument>(&raw)
                .with_context(|| format!("parsing {}", path.display()))?
        }
        "csv" => load_csv(path)?,
        _ => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            from_plain_text(&raw)
        }
    };

    if doc.filename.is_none() {
        doc.filename = path.file_name().and_then(|n| n.to_str()).map(str::to_string);
    }
    Ok(doc)
}

fn from_plain_text(raw: &str) -> RawStatementDocument {
    RawStatementDocument {
        filename: None,
        pages: raw
            .split(PAGE_BREAK)
            .map(|text| Page {
                text: text.to_string(),
                tables: Vec::new(),
            })
            .collect(),
    }
}

fn load_csv(path: &Path) -> Result<RawStatementDocument> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;

    let mut table: Table = Vec::new();
    let mut text = String::new();

    for result in rdr.records() {
        let record = result?;
        let row: Vec<Option<String>> = record
            .iter()
            .map(|c| Some(c.to_string()).filter(|c| !c.trim().is_empty()))
            .collect();

        let line: Vec<&str> = record.iter().map(str::trim).filter(|c| !c.is_empty()).collect();
        text.push_str(&line.join(" "));
        text.push('\n');

        table.push(row);
    }

    Ok(RawStatementDocument {
        filename: None,
        pages: vec![Page {
            text,
            tables: vec![table],
        }],
    })
}
