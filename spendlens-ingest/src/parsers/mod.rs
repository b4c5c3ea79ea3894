//! Issuer-specific statement extractors plus a generic fallback.
//!
//! Each module exposes a fallible `parse_*` working on one page's text or
//! tables and an infallible `extract` over a whole document. `extract` logs
//! and drops whatever a page could not yield.

pub mod axis_bank;
pub mod generic;
pub mod gpay;
pub mod phonepe;
pub mod sbi_card;

use anyhow::Result;

use crate::normalize::parse_amount;
use crate::types::RawTransactionTuple;

/// Run a per-page parser, turning a failure into zero rows.
pub(crate) fn rows_or_empty(
    issuer: &'static str,
    page: usize,
    parsed: Result<Vec<RawTransactionTuple>>,
) -> Vec<RawTransactionTuple> {
    match parsed {
        Ok(rows) => rows,
        Err(e) => {
            tracing::warn!(issuer, page, error = %e, "page yielded no transactions");
            Vec::new()
        }
    }
}

/// A bare decimal such as `30000.00` or `425` (commas allowed).
///
/// Integers of ten or more digits are UTR/reference numbers, not amounts.
pub(crate) fn standalone_amount(token: &str) -> Option<f64> {
    let t = token.replace(',', "");
    let (int_part, frac_part) = match t.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (t.as_str(), None),
    };

    if int_part.is_empty() || !int_part.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    match frac_part {
        Some(f) if f.is_empty() || !f.chars().all(|c| c.is_ascii_digit()) => return None,
        None if int_part.len() >= 10 => return None,
        _ => {}
    }

    Some(parse_amount(&t)).filter(|v| *v > 0.0)
}

/// Look up to `max` lines past `lines[0]` for a line ending in a standalone amount.
///
/// Stops early at a line for which `stop` holds (the next transaction's anchor).
pub(crate) fn lookahead_amount(lines: &[&str], max: usize, stop: impl Fn(&str) -> bool) -> Option<f64> {
    for next in lines.iter().skip(1).take(max) {
        if stop(next) {
            return None;
        }
        if let Some(amount) = next.split_whitespace().last().and_then(standalone_amount) {
            return Some(amount);
        }
    }
    None
}
