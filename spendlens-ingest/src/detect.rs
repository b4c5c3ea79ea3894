//! Format detector: pick one extractor from first-page text and filename.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::parsers;
use crate::types::{RawStatementDocument, RawTransactionTuple};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementFormat {
    PhonePe,
    SbiCard,
    AxisBank,
    GPay,
    Generic,
}

impl StatementFormat {
    /// Signature checks in fixed priority order. Never fails; unknown
    /// layouts fall through to `Generic`.
    pub fn detect(first_page_text: &str, filename: Option<&str>) -> Self {
        let name = filename.unwrap_or("");
        let in_either = |needle: &str| first_page_text.contains(needle) || name.contains(needle);

        if in_either("PhonePe") {
            StatementFormat::PhonePe
        } else if in_either("SBI Card") {
            StatementFormat::SbiCard
        } else if first_page_text.contains("Axis Account")
            || first_page_text.to_uppercase().contains("AXIS BANK")
        {
            StatementFormat::AxisBank
        } else if name.to_lowercase().contains("gpay")
            || first_page_text.to_lowercase().contains("google pay")
        {
            StatementFormat::GPay
        } else {
            StatementFormat::Generic
        }
    }

    pub fn for_document(doc: &RawStatementDocument) -> Self {
        Self::detect(doc.first_page_text(), doc.filename.as_deref())
    }

    pub fn extract(&self, doc: &RawStatementDocument) -> Vec<RawTransactionTuple> {
        match self {
            StatementFormat::PhonePe => parsers::phonepe::extract(doc),
            StatementFormat::SbiCard => parsers::sbi_card::extract(doc),
            StatementFormat::AxisBank => parsers::axis_bank::extract(doc),
            StatementFormat::GPay => parsers::gpay::extract(doc),
            StatementFormat::Generic => parsers::generic::extract(doc),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            StatementFormat::PhonePe => "PhonePe",
            StatementFormat::SbiCard => "SBI Card",
            StatementFormat::AxisBank => "Axis Bank",
            StatementFormat::GPay => "Google Pay",
            StatementFormat::Generic => "generic",
        }
    }
}

impl fmt::Display for StatementFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signatures() {
        assert_eq!(StatementFormat::detect("PhonePe Transaction Statement", None), StatementFormat::PhonePe);
        assert_eq!(StatementFormat::detect("", Some("PhonePe_Statement_Nov.pdf")), StatementFormat::PhonePe);
        assert_eq!(StatementFormat::detect("SBI Card Monthly Statement", None), StatementFormat::SbiCard);
        assert_eq!(StatementFormat::detect("Statement of Axis Account No", None), StatementFormat::AxisBank);
        assert_eq!(StatementFormat::detect("axis bank ltd", None), StatementFormat::AxisBank);
        assert_eq!(StatementFormat::detect("", Some("GPay_Transaction_Statement.pdf")), StatementFormat::GPay);
        assert_eq!(StatementFormat::detect("Google Pay statement", None), StatementFormat::GPay);
        assert_eq!(StatementFormat::detect("HDFC BANK", Some("hdfc.pdf")), StatementFormat::Generic);
    }

    #[test]
    fn test_case_sensitive_issuers() {
        assert_eq!(StatementFormat::detect("phonepe", None), StatementFormat::Generic);
        assert_eq!(StatementFormat::detect("sbi card", None), StatementFormat::Generic);
    }

    #[test]
    fn test_priority_order() {
        // PhonePe wins over a Google Pay mention
        assert_eq!(
            StatementFormat::detect("PhonePe export, also on Google Pay", None),
            StatementFormat::PhonePe
        );
        assert_eq!(StatementFormat::detect("SBI Card paid from AXIS BANK", None), StatementFormat::SbiCard);
    }

    #[test]
    fn test_empty_input_is_generic() {
        assert_eq!(StatementFormat::detect("", None), StatementFormat::Generic);
    }
}
