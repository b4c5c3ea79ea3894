//! Token normalizer: canonical dates, amounts, details and direction.
//!
//! Every function here is total. Bad input degrades to `None`, `0.0` or the
//! default direction instead of an error, so one odd row never sinks a batch.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use spendlens_core::{round_money, Direction};

use crate::types::RawAmount;

/// Layouts seen across issuers, tried in order.
const DATE_FORMATS: [&str; 9] = [
    "%d%b,%Y",   // 01Nov,2025 (Google Pay)
    "%d %b %y",  // 16 Nov 25 (SBI Card)
    "%d-%m-%Y",  // 18-10-2025 (Axis)
    "%b %d, %Y", // Nov 25, 2025 (PhonePe)
    "%d %b %Y",  // 25 Nov 2025
    "%d/%m/%Y",
    "%d-%b-%Y",
    "%Y/%m/%d",  // generic fallback rows
    "%d-%m-%y",
];

fn plausible(d: NaiveDate) -> Option<NaiveDate> {
    (1900..=2100).contains(&d.year()).then_some(d)
}

/// Parse a statement date. Falls back to ISO-8601 date or date-time.
pub fn normalize_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    for fmt in DATE_FORMATS {
        if let Some(d) = NaiveDate::parse_from_str(s, fmt).ok().and_then(plausible) {
            return Some(d);
        }
    }

    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return plausible(d);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return plausible(dt.date_naive());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return plausible(dt.date());
        }
    }

    None
}

/// Strip currency symbols and separators and parse. `0.0` on failure.
pub fn parse_amount(raw: &str) -> f64 {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    let cleaned = cleaned.trim_matches('.');

    cleaned.parse::<f64>().ok().filter(|v| v.is_finite()).unwrap_or(0.0)
}

/// Non-negative, two decimal places, `0.0` when unparseable.
pub fn normalize_amount(raw: &RawAmount) -> f64 {
    let v = match raw {
        RawAmount::Number(v) if v.is_finite() => *v,
        RawAmount::Number(_) => 0.0,
        RawAmount::Text(s) => parse_amount(s),
    };
    round_money(v.abs())
}

fn strip_prefix_ci<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    s.get(..prefix.len())
        .filter(|head| head.eq_ignore_ascii_case(prefix))
        .map(|_| &s[prefix.len()..])
}

fn strip_boilerplate(s: &str) -> &str {
    for (verb, particle) in [("paid", "to"), ("received", "from")] {
        if let Some(rest) = strip_prefix_ci(s, verb) {
            if let Some(rest) = strip_prefix_ci(rest.trim_start(), particle) {
                return rest.trim_start();
            }
        }
    }
    s
}

/// Drop "Paid to"/"Received from" lead-ins and dash runs, collapse whitespace.
pub fn clean_details(raw: &str) -> String {
    let s = strip_boilerplate(raw.trim());
    let s = s.trim_start_matches(|c: char| matches!(c, '-' | '–' | '—')).trim_start();
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Keep an extractor-supplied direction, otherwise infer from the details.
pub fn normalize_direction(supplied: Option<Direction>, details: &str) -> Direction {
    if let Some(d) = supplied {
        return d;
    }

    let d = details.to_lowercase();
    if d.contains("received") {
        return Direction::Credit;
    }
    // paid / debit / imps / ecom pur / pos all read as money out, as does everything else
    Direction::Debit
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_issuer_date_layouts() {
        assert_eq!(normalize_date("01Nov,2025"), Some(ymd(2025, 11, 1)));
        assert_eq!(normalize_date("16 Nov 25"), Some(ymd(2025, 11, 16)));
        assert_eq!(normalize_date("18-10-2025"), Some(ymd(2025, 10, 18)));
        assert_eq!(normalize_date("Nov 25, 2025"), Some(ymd(2025, 11, 25)));
        assert_eq!(normalize_date("25 Nov 2025"), Some(ymd(2025, 11, 25)));
        assert_eq!(normalize_date("25/11/2025"), Some(ymd(2025, 11, 25)));
    }

    #[test]
    fn test_generic_row_date_shapes() {
        assert_eq!(normalize_date("2025/10/14"), Some(ymd(2025, 10, 14)));
        assert_eq!(normalize_date("14-10-25"), Some(ymd(2025, 10, 14)));
        assert_eq!(normalize_date("14-Oct-2025"), Some(ymd(2025, 10, 14)));
    }

    #[test]
    fn test_iso_fallback() {
        assert_eq!(normalize_date("2025-11-25"), Some(ymd(2025, 11, 25)));
        assert_eq!(normalize_date("2025-11-25T10:15:00"), Some(ymd(2025, 11, 25)));
        assert_eq!(normalize_date("2025-11-25T10:15:00+05:30"), Some(ymd(2025, 11, 25)));
    }

    #[test]
    fn test_unparseable_date_is_none() {
        assert_eq!(normalize_date(""), None);
        assert_eq!(normalize_date("Opening Balance"), None);
        assert_eq!(normalize_date("31 Feb 2025"), None);
    }

    #[test]
    fn test_parse_amount_strips_noise() {
        assert_eq!(parse_amount("1,014.00 C"), 1014.0);
        assert_eq!(parse_amount("₹425"), 425.0);
        assert_eq!(parse_amount("Rs.5,873.22"), 5873.22);
        assert_eq!(parse_amount("INR"), 0.0);
        assert_eq!(parse_amount("-15.00"), -15.0);
    }

    #[test]
    fn test_rendered_amount_round_trips() {
        let rendered = format!("{:.2}", 425.0);
        assert_eq!(rendered, "425.00");
        assert_eq!(normalize_amount(&RawAmount::Text(rendered)), 425.0);
    }

    #[test]
    fn test_normalize_amount_is_non_negative_two_dp() {
        assert_eq!(normalize_amount(&RawAmount::Number(-15.0)), 15.0);
        assert_eq!(normalize_amount(&RawAmount::Number(5.899)), 5.9);
        assert_eq!(normalize_amount(&RawAmount::Text("garbage".into())), 0.0);
        assert_eq!(normalize_amount(&RawAmount::Number(f64::NAN)), 0.0);

        for v in [0.001, 1.005, 99.999, 12345.678] {
            let a = normalize_amount(&RawAmount::Number(v));
            assert!(a >= 0.0);
            assert!(((a * 100.0).round() - a * 100.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_clean_details() {
        assert_eq!(clean_details("PaidtoBlinkit"), "Blinkit");
        assert_eq!(clean_details("Paid to  Swiggy   Instamart"), "Swiggy Instamart");
        assert_eq!(clean_details("RECEIVED FROM Suparna"), "Suparna");
        assert_eq!(clean_details("—-- UPI/Transfer"), "UPI/Transfer");
        assert_eq!(clean_details("  CARD \n CASHBACK "), "CARD CASHBACK");
        assert_eq!(clean_details("₹ refund"), "₹ refund");
    }

    #[test]
    fn test_normalize_direction() {
        assert_eq!(normalize_direction(Some(Direction::Credit), "Paid to X"), Direction::Credit);
        assert_eq!(normalize_direction(None, "Received from Mom"), Direction::Credit);
        assert_eq!(normalize_direction(None, "IMPS/P2A/1234"), Direction::Debit);
        assert_eq!(normalize_direction(None, "something"), Direction::Debit);
    }
}
