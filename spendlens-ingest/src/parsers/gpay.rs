//! Google Pay transaction statement extractor (text)
//!
//! The PDF text dump glues words together and puts the date on its own
//! anchor; amounts follow a rupee sign:
//!   01Nov,2025 PaidtoBlinkit ₹425
//!   03Nov,2025
//!   ReceivedfromRahul ₹1,200.50

use anyhow::Result;
use regex::Regex;
use spendlens_core::Direction;

use crate::normalize::parse_amount;
use crate::parsers::{lookahead_amount, rows_or_empty};
use crate::types::{RawStatementDocument, RawTransactionTuple};

const RUPEE: char = '₹';
const LOOKAHEAD_LINES: usize = 3;

/// Parse one page of extracted statement text.
pub fn parse_gpay_text(text: &str) -> Result<Vec<RawTransactionTuple>> {
    let date_re = Regex::new(r"\d{2}[A-Za-z]{3},\d{4}")?;

    let lines: Vec<&str> = text.lines().collect();
    let mut out = Vec::new();
    let mut current_date: Option<String> = None;

    for (i, line) in lines.iter().enumerate() {
        if let Some(m) = date_re.find(line) {
            current_date = Some(m.as_str().to_string());
        }
        let Some(date) = current_date.as_deref() else {
            continue;
        };
        let Some((left, right)) = line.split_once(RUPEE) else {
            continue;
        };

        let mut details = date_re.replace_all(left, "").trim().to_string();
        if details.is_empty() && i > 0 {
            details = date_re.replace_all(lines[i - 1], "").trim().to_string();
        }

        let amount = right
            .split_whitespace()
            .next()
            .map(parse_amount)
            .filter(|v| *v > 0.0)
            .or_else(|| lookahead_amount(&lines[i..], LOOKAHEAD_LINES, |l| date_re.is_match(l)));
        let Some(amount) = amount else {
            tracing::debug!(line = i, "rupee sign without an amount");
            continue;
        };

        let direction = if details.contains("Received") {
            Direction::Credit
        } else {
            Direction::Debit
        };

        out.push(RawTransactionTuple::new(date, details, amount, direction));
    }

    Ok(out)
}

pub fn extract(doc: &RawStatementDocument) -> Vec<RawTransactionTuple> {
    doc.pages
        .iter()
        .enumerate()
        .flat_map(|(i, page)| rows_or_empty("gpay", i, parse_gpay_text(&page.text)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_carried_forward() {
        let text = r#"
Transaction statement period 01 November 2025 - 30 November 2025
Date&time Transactiondetails Amount
01Nov,2025 PaidtoBlinkit ₹425
UPITransactionID:530512345678
PaidtoSwiggy ₹349.00
03Nov,2025
ReceivedfromRahul ₹1,200.50
"#;
        let txns = parse_gpay_text(text).unwrap();
        assert_eq!(txns.len(), 3);

        assert_eq!(txns[0].date, "01Nov,2025");
        assert_eq!(txns[0].details, "PaidtoBlinkit");
        assert_eq!(txns[0].amount_value(), 425.0);
        assert_eq!(txns[0].direction, Some(Direction::Debit));

        assert_eq!(txns[1].date, "01Nov,2025");
        assert_eq!(txns[1].details, "PaidtoSwiggy");

        assert_eq!(txns[2].date, "03Nov,2025");
        assert_eq!(txns[2].amount_value(), 1200.5);
        assert_eq!(txns[2].direction, Some(Direction::Credit));
    }

    #[test]
    fn test_lines_before_first_date_are_ignored() {
        let text = "Sent ₹12,000\nReceived ₹30,000\n";
        assert!(parse_gpay_text(text).unwrap().is_empty());
    }

    #[test]
    fn test_details_from_previous_line_and_amount_below() {
        let text = "05Nov,2025 PaidtoUGVCL\n₹\n5,873.22\n";
        let txns = parse_gpay_text(text).unwrap();
        assert_eq!(txns.len(), 1);
        assert_eq!(txns[0].details, "PaidtoUGVCL");
        assert_eq!(txns[0].amount_value(), 5873.22);
    }
}
