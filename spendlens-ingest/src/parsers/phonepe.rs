//! PhonePe UPI statement extractor (text)
//!
//! Rows come out of PDF-to-text in two shapes:
//!   Nov 25, 2025 Paid to Zomato Debit INR 500.00
//! or split across lines, with the amount trailing a later line:
//!   Nov 25, 2025 Received from SUPARNA ... Credit INR
//!   08:45 PM Transaction ID T2511252045 30000.00

use anyhow::Result;
use regex::Regex;
use spendlens_core::Direction;

use crate::normalize::parse_amount;
use crate::parsers::{lookahead_amount, rows_or_empty};
use crate::types::{RawStatementDocument, RawTransactionTuple};

const LOOKAHEAD_LINES: usize = 3;

/// `Some` when the line carries the keyword, the amount is its last token, and positive.
fn single_line(line: &str, date: &str) -> Option<RawTransactionTuple> {
    let (keyword, direction) = if line.contains("Credit") {
        ("Credit", Direction::Credit)
    } else if line.contains("Debit") {
        ("Debit", Direction::Debit)
    } else {
        return None;
    };

    let amount = line.split_whitespace().last().map(parse_amount)?;
    if amount <= 0.0 {
        return None;
    }

    let details = line
        .split(keyword)
        .next()
        .unwrap_or("")
        .replace(date, "")
        .trim()
        .to_string();

    Some(RawTransactionTuple::new(date, details, amount, direction))
}

/// Parse one page of extracted statement text.
pub fn parse_phonepe_text(text: &str) -> Result<Vec<RawTransactionTuple>> {
    let date_re = Regex::new(r"[A-Za-z]{3}\s\d{1,2},\s\d{4}")?;

    let lines: Vec<&str> = text.lines().collect();
    let mut out = Vec::new();

    for (i, line) in lines.iter().enumerate() {
        let Some(m) = date_re.find(line) else {
            continue;
        };
        let date = m.as_str();

        if let Some(txn) = single_line(line, date) {
            out.push(txn);
            continue;
        }

        // Multi-line block: keywords here, amount somewhere below
        let mut direction = if line.contains("Credit") || line.contains("Received") {
            Direction::Credit
        } else {
            Direction::Debit
        };

        let details = line
            .replace(date, "")
            .replace("Credit", "")
            .replace("Debit", "")
            .replace("INR", "");
        let details = details
            .trim()
            .trim_start_matches(|c: char| matches!(c, '-' | '–' | '—'))
            .trim()
            .to_string();

        let Some(amount) = lookahead_amount(&lines[i..], LOOKAHEAD_LINES, |l| date_re.is_match(l)) else {
            continue;
        };

        if direction == Direction::Debit && details.to_lowercase().contains("received") {
            direction = Direction::Credit;
        }

        out.push(RawTransactionTuple::new(date, details, amount, direction));
    }

    Ok(out)
}

pub fn extract(doc: &RawStatementDocument) -> Vec<RawTransactionTuple> {
    doc.pages
        .iter()
        .enumerate()
        .flat_map(|(i, page)| rows_or_empty("phonepe", i, parse_phonepe_text(&page.text)))
        .collect()
}
