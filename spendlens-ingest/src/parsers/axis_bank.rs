//! Axis Bank account statement extractor (tables)
//!
//! Expected table columns:
//!   Tran Date | Chq No | Particulars | Debit | Credit | Balance | Init. Br
//!   18-10-2025 |      | POS/NETFLIX/MUMBAI/... | 649.00 |  | 1,20,351.00 | 123

use anyhow::Result;
use spendlens_core::Direction;

use crate::normalize::parse_amount;
use crate::parsers::rows_or_empty;
use crate::types::{RawStatementDocument, RawTransactionTuple, Table};

const MIN_COLUMNS: usize = 5;

fn cell(row: &[Option<String>], idx: usize) -> Option<&str> {
    row.get(idx)
        .and_then(|c| c.as_deref())
        .map(str::trim)
        .filter(|c| !c.is_empty())
}

/// Parse the transaction tables of one page.
pub fn parse_axis_bank_tables(tables: &[Table]) -> Result<Vec<RawTransactionTuple>> {
    let mut out = Vec::new();

    for table in tables {
        let start = match table.first().and_then(|h| cell(h, 0)) {
            Some(first) if first.contains("Tran Date") => 1,
            _ => 0,
        };

        for row in table.iter().skip(start) {
            if row.len() < MIN_COLUMNS {
                continue;
            }
            // Opening/closing balance rows carry no date
            let Some(date) = cell(row, 0) else {
                continue;
            };

            let details = cell(row, 2).unwrap_or("").replace('\n', " ");

            let (amount, direction) = match (cell(row, 3), cell(row, 4)) {
                (Some(debit), _) => (parse_amount(debit), Direction::Debit),
                (None, Some(credit)) => (parse_amount(credit), Direction::Credit),
                (None, None) => continue,
            };

            if amount > 0.0 {
                out.push(RawTransactionTuple::new(date, details, amount, direction));
            }
        }
    }

    Ok(out)
}

pub fn extract(doc: &RawStatementDocument) -> Vec<RawTransactionTuple> {
    doc.pages
        .iter()
        .enumerate()
        .flat_map(|(i, page)| rows_or_empty("axis_bank", i, parse_axis_bank_tables(&page.tables)))
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

    fn statement_table() -> Table {
        vec![
            row(&["Tran Date", "Chq No", "Particulars", "Debit", "Credit", "Balance", "Init. Br"]),
            row(&["", "", "OPENING BALANCE", "", "", "10,000.00", ""]),
            row(&["18-10-2025", "", "POS/NETFLIX/MUMBAI/\n181025/08:41/481907", "649.00", "", "9,351.00", "123"]),
            row(&["29-10-2025", "", "NEFT/CITIN25645632712/CAPITAL ONE", "", "1,65,611.00", "1,74,962.00", "123"]),
            row(&["27-09-2025", "", "IMPS Chrgs Incl GST", "5.90", "", "1,74,956.10", "123"]),
        ]
    }

    #[test]
    fn test_parses_debit_and_credit_columns() {
        let txns = parse_axis_bank_tables(&[statement_table()]).unwrap();
        assert_eq!(txns.len(), 3);

        assert_eq!(txns[0].date, "18-10-2025");
        assert_eq!(txns[0].details, "POS/NETFLIX/MUMBAI/ 181025/08:41/481907");
        assert_eq!(txns[0].amount_value(), 649.0);
        assert_eq!(txns[0].direction, Some(Direction::Debit));

        assert_eq!(txns[1].amount_value(), 165611.0);
        assert_eq!(txns[1].direction, Some(Direction::Credit));

        assert_eq!(txns[2].amount_value(), 5.9);
    }

    #[test]
    fn test_short_rows_are_skipped() {
        let table = vec![row(&["18-10-2025", "", "X", "10.00"])];
        assert!(parse_axis_bank_tables(&[table]).unwrap().is_empty());
    }

    #[test]
    fn test_extract_walks_every_page() {
        let doc = RawStatementDocument {
            filename: None,
            pages: vec![
                crate::types::Page { text: String::new(), tables: vec![statement_table()] },
                crate::types::Page { text: String::new(), tables: vec![statement_table()] },
            ],
        };
        assert_eq!(extract(&doc).len(), 6);
    }
}
