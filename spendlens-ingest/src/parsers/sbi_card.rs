//! SBI Card statement extractor (tables)
//!
//! Expected table after PDF table extraction:
//!   ['Date', 'Transaction Details', 'Amount ( ` )']
//!   ['16 Nov 25\n26 Nov 25', 'CARD CASHBACK\nAMAZON PAY', '1,014.00 C\n2,499.00 D']
//!
//! Statements without ruling lines come out with several physical rows merged
//! into one cell, one per line. Cells are split on newlines and zipped by
//! position up to the shortest list; extra lines in longer cells are dropped.

use anyhow::Result;
use regex::Regex;
use spendlens_core::Direction;

use crate::normalize::parse_amount;
use crate::parsers::rows_or_empty;
use crate::types::{RawStatementDocument, RawTransactionTuple, Table};

fn cell(row: &[Option<String>], idx: usize) -> &str {
    row.get(idx).and_then(|c| c.as_deref()).unwrap_or("")
}

/// Header mentions Date and Amount, and some row's amount cell ends in C/D.
fn is_transactions_table(table: &Table, amount_re: &Regex) -> bool {
    let Some(header) = table.first() else {
        return false;
    };
    if table.len() < 2 {
        return false;
    }

    let has_date = header.iter().flatten().any(|h| h.contains("Date"));
    let has_amount = header.iter().flatten().any(|h| h.contains("Amount"));
    if !(has_date && has_amount) {
        return false;
    }

    table[1..]
        .iter()
        .any(|row| row.len() >= 3 && amount_re.is_match(cell(row, 2)))
}

/// Parse the transaction tables of one page.
pub fn parse_sbi_card_tables(tables: &[Table]) -> Result<Vec<RawTransactionTuple>> {
    let amount_re = Regex::new(r"[\d,]+(?:\.\d+)?\s*(?P<suffix>[CD])")?;

    let mut out = Vec::new();

    for table in tables {
        if !is_transactions_table(table, &amount_re) {
            continue;
        }

        let start = match table.first() {
            Some(header) if cell(header, 0).contains("Date") => 1,
            _ => 0,
        };

        for row in &table[start..] {
            let (date_cell, details_cell, amount_cell) = (cell(row, 0), cell(row, 1), cell(row, 2));
            if row.len() < 3 || date_cell.is_empty() || details_cell.is_empty() || amount_cell.is_empty() {
                continue;
            }

            let dates: Vec<&str> = date_cell.split('\n').collect();
            let details: Vec<&str> = details_cell.split('\n').collect();
            let amounts: Vec<&str> = amount_cell.split('\n').collect();

            let count = dates.len().min(details.len()).min(amounts.len());
            let longest = dates.len().max(details.len()).max(amounts.len());
            if longest > count {
                tracing::debug!(kept = count, longest, "ragged SBI Card row; extra lines dropped");
            }

            for i in 0..count {
                let amount_raw = amounts[i];
                let direction = match amount_re.captures(amount_raw).and_then(|c| c.name("suffix")) {
                    Some(m) if m.as_str() == "C" => Direction::Credit,
                    _ => Direction::Debit,
                };

                let amount = parse_amount(amount_raw);
                if amount > 0.0 {
                    out.push(RawTransactionTuple::new(
                        dates[i].trim(),
                        details[i].trim(),
                        amount,
                        direction,
                    ));
                }
            }
        }
    }

    Ok(out)
}

pub fn extract(doc: &RawStatementDocument) -> Vec<RawTransactionTuple> {
    doc.pages
        .iter()
        .enumerate()
        .flat_map(|(i, page)| rows_or_empty("sbi_card", i, parse_sbi_card_tables(&page.tables)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<Option<String>> {
        cells
            .iter()
            .map(|c| if c.is_empty() { None } else { Some(c.to_string()) })
            .collect()
    }

    fn header() -> Vec<Option<String>> {
        row(&["Date", "Transaction Details", "Amount ( ` )"])
    }

    #[test]
    fn test_merged_cells_split_into_rows() {
        let table = vec![
            header(),
            row(&[
                "16 Nov 25\n26 Nov 25",
                "CARD CASHBACK\nREFUND AMAZON",
                "1,014.00 C\n2,499.00 C",
            ]),
        ];

        let txns = parse_sbi_card_tables(&[table]).unwrap();
        assert_eq!(txns.len(), 2);
        assert_eq!(txns[0].date, "16 Nov 25");
        assert_eq!(txns[0].details, "CARD CASHBACK");
        assert_eq!(txns[0].amount_value(), 1014.0);
        assert_eq!(txns[0].direction, Some(Direction::Credit));
        assert_eq!(txns[1].amount_value(), 2499.0);
        assert_eq!(txns[1].direction, Some(Direction::Credit));
    }

    #[test]
    fn test_debit_suffix_and_missing_suffix() {
        let table = vec![
            header(),
            row(&["02 Nov 25", "SWIGGY BANGALORE", "349.00 D"]),
            row(&["03 Nov 25", "FUEL SURCHARGE", "12.50"]),
        ];
        let txns = parse_sbi_card_tables(&[table]).unwrap();
        assert_eq!(txns.len(), 2);
        assert_eq!(txns[0].direction, Some(Direction::Debit));
        assert_eq!(txns[1].direction, Some(Direction::Debit));
    }

    #[test]
    fn test_ragged_cells_zip_to_shortest() {
        let table = vec![
            header(),
            row(&["16 Nov 25\n17 Nov 25\n18 Nov 25", "A\nB", "10.00 D\n20.00 D\n30.00 D"]),
        ];
        let txns = parse_sbi_card_tables(&[table]).unwrap();
        assert_eq!(txns.len(), 2);
        assert_eq!(txns[1].details, "B");
        assert_eq!(txns[1].amount_value(), 20.0);
    }

    #[test]
    fn test_non_transaction_tables_are_ignored() {
        let summary = vec![
            row(&["Statement Date", "Total Amount Due", "Minimum Due"]),
            row(&["20 Nov 25", "12,345.00", "620.00"]),
        ];
        let no_header = vec![row(&["16 Nov 25", "X", "10.00 C"])];
        assert!(parse_sbi_card_tables(&[summary, no_header]).unwrap().is_empty());
    }

    #[test]
    fn test_zero_amounts_are_skipped() {
        let table = vec![header(), row(&["16 Nov 25", "REVERSAL", "0.00 C"]), row(&["17 Nov 25", "X", "5.00 C"])];
        let txns = parse_sbi_card_tables(&[table]).unwrap();
        assert_eq!(txns.len(), 1);
        assert!(txns.iter().all(|t| t.amount_value() > 0.0));
    }
}
