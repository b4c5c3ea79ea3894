//! Best-effort extractor for layouts no issuer module recognises.
//!
//! Any line carrying a date-shaped token is a candidate row; the amount is
//! the rightmost token that reads as a positive decimal.
//!   12/10/2025 UPI-SWIGGY-HYDERABAD 349.00 Dr 10,651.00
//!   2025-10-14 Salary Credit 2025 85000.00

use anyhow::Result;
use regex::Regex;
use spendlens_core::Direction;

use crate::parsers::rows_or_empty;
use crate::types::{RawStatementDocument, RawTransactionTuple};

const YEAR_RANGE: std::ops::RangeInclusive<f64> = 1900.0..=2100.0;

/// Rightmost positive decimal token, skipping times and bare years.
fn rightmost_amount<'a>(tokens: &[&'a str], amount_re: &Regex) -> Option<(&'a str, f64)> {
    for token in tokens.iter().rev() {
        if token.contains(':') {
            continue;
        }
        let cleaned: String = token.chars().filter(|c| c.is_ascii_digit() || *c == '.').collect();
        let cleaned = cleaned.trim_matches('.');
        if !amount_re.is_match(cleaned) {
            continue;
        }
        let Ok(value) = cleaned.parse::<f64>() else {
            continue;
        };
        if value <= 0.0 {
            continue;
        }
        if YEAR_RANGE.contains(&value) && value.fract() == 0.0 && !token.contains('.') {
            continue;
        }
        return Some((token, value));
    }
    None
}

/// Parse one page of extracted statement text.
pub fn parse_generic_text(text: &str) -> Result<Vec<RawTransactionTuple>> {
    let date_re = Regex::new(
        r"\b(?:\d{1,2}[-/]\d{1,2}[-/]\d{2,4}|\d{1,2}\s+[A-Za-z]{3}\s+\d{2,4}|\d{4}[-/]\d{1,2}[-/]\d{1,2})\b",
    )?;
    // case-sensitive: "CREDIT CARD" bill payments are money out
    let credit_re = Regex::new(r"\b(?:Cr|Credit|Received)\b")?;
    let amount_re = Regex::new(r"^\d+(?:\.\d{1,2})?$")?;

    let mut out = Vec::new();

    for line in text.lines() {
        let Some(m) = date_re.find(line) else {
            continue;
        };
        let date = m.as_str();
        let rest = line.replacen(date, "", 1);
        let tokens: Vec<&str> = rest.split_whitespace().collect();

        let Some((amount_token, amount)) = rightmost_amount(&tokens, &amount_re) else {
            continue;
        };

        let direction = if credit_re.is_match(&rest) {
            Direction::Credit
        } else {
            Direction::Debit
        };

        let mut dropped = false;
        let details = tokens
            .iter()
            .filter(|t| {
                if !dropped && **t == amount_token {
                    dropped = true;
                    return false;
                }
                true
            })
            .copied()
            .collect::<Vec<_>>()
            .join(" ");

        out.push(RawTransactionTuple::new(date, details, amount, direction));
    }

    Ok(out)
}

pub fn extract(doc: &RawStatementDocument) -> Vec<RawTransactionTuple> {
    doc.pages
        .iter()
        .enumerate()
        .flat_map(|(i, page)| rows_or_empty("generic", i, parse_generic_text(&page.text)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rightmost_decimal_wins() {
        let text = "12/10/2025 UPI-SWIGGY-HYDERABAD 349.00 Dr 10,651.00";
        let txns = parse_generic_text(text).unwrap();
        assert_eq!(txns.len(), 1);
        assert_eq!(txns[0].date, "12/10/2025");
        assert_eq!(txns[0].amount_value(), 10651.0);
        assert_eq!(txns[0].details, "UPI-SWIGGY-HYDERABAD 349.00 Dr");
        assert_eq!(txns[0].direction, Some(Direction::Debit));
    }

    #[test]
    fn test_bare_year_is_not_an_amount() {
        let txns = parse_generic_text("14 Oct 2025 Interest paid 2025").unwrap();
        assert!(txns.is_empty());

        let txns = parse_generic_text("14 Oct 2025 Interest paid 2025.00").unwrap();
        assert_eq!(txns.len(), 1);
        assert_eq!(txns[0].amount_value(), 2025.0);
    }

    #[test]
    fn test_credit_keywords() {
        let text = "2025-10-14 Salary Credit 85000.00\n2025-10-15 NEFT Cr 1500\n2025-10-16 ATM WDL 2000.50";
        let txns = parse_generic_text(text).unwrap();
        assert_eq!(txns.len(), 3);
        assert_eq!(txns[0].direction, Some(Direction::Credit));
        assert_eq!(txns[1].direction, Some(Direction::Credit));
        assert_eq!(txns[1].amount_value(), 1500.0);
        assert_eq!(txns[2].direction, Some(Direction::Debit));
    }

    #[test]
    fn test_uppercase_credit_card_payment_is_debit() {
        let txns = parse_generic_text("12/10/2025 CREDIT CARD BILL PAYMENT 5000.00").unwrap();
        assert_eq!(txns.len(), 1);
        assert_eq!(txns[0].direction, Some(Direction::Debit));
        assert_eq!(txns[0].amount_value(), 5000.0);

        let txns = parse_generic_text("13/10/2025 Received from Rahul 1200.00").unwrap();
        assert_eq!(txns[0].direction, Some(Direction::Credit));
    }

    #[test]
    fn test_times_and_undated_lines_are_skipped() {
        let text = "Statement generated at 10:45\n01-11-2025 10:45 POS AMAZON 1.5\nOpening balance 5000.00";
        let txns = parse_generic_text(text).unwrap();
        assert_eq!(txns.len(), 1);
        assert_eq!(txns[0].amount_value(), 1.5);
        assert_eq!(txns[0].details, "10:45 POS AMAZON");
    }
}
