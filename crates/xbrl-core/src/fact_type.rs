//! Fact type classification.
//!
//! This module defines [`FactType`] and the two ways a type is assigned to a
//! concept: from the `type` attribute of a schema element
//! ([`FactType::from_xsd_type`]) or, when no schema definition is available,
//! from the concept's local name ([`FactType::infer`]).

use serde::{Deserialize, Serialize};
use std::fmt;

/// The data type of an XBRL fact.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FactType {
    /// Currency amount.
    Monetary,
    /// Arbitrary decimal number.
    Decimal,
    /// Whole number.
    Integer,
    /// Plain text.
    String,
    /// `true`/`false` flag.
    Boolean,
    /// Calendar date.
    Date,
    /// Number of shares.
    Shares,
    /// Dimensionless number (ratios, percentages, rates).
    Pure,
    /// Amount per share (currency divided by shares).
    PerShare,
    /// Escaped or HTML text block (notes, policies).
    TextBlock,
    /// Dimension domain or member.
    DomainMember,
    /// Could not be classified.
    #[default]
    Unknown,
}

/// Local-name fragments that mark a monetary concept.
const MONETARY_KEYWORDS: &[&str] = &[
    "revenue",
    "income",
    "expense",
    "asset",
    "liability",
    "equity",
    "cash",
    "debt",
    "profit",
    "loss",
    "cost",
    "amount",
    "value",
    "price",
];

const DATE_KEYWORDS: &[&str] = &["dateof", "asofdate", "datetime", "effectivedate"];

const STRING_KEYWORDS: &[&str] = &["description", "name", "text", "address", "title"];

impl FactType {
    /// Returns true for types whose facts always carry a numeric value.
    #[must_use]
    pub const fn is_numeric(&self) -> bool {
        matches!(
            self,
            Self::Monetary | Self::Decimal | Self::Integer | Self::Shares | Self::Pure
        )
    }

    /// Returns true for numeric types plus per-share amounts.
    #[must_use]
    pub const fn is_quantitative(&self) -> bool {
        self.is_numeric() || matches!(self, Self::PerShare)
    }

    /// Classifies a concept by its local name.
    ///
    /// Rules are evaluated in a fixed order and the first match wins:
    /// text block, per-share, shares, boolean, date, pure, monetary, integer,
    /// string. Earlier categories deliberately shadow the broader ones that
    /// follow, e.g. `EntityCommonStockSharesOutstanding` is [`FactType::Shares`].
    #[must_use]
    pub fn infer(local_name: &str) -> Self {
        let lower = local_name.to_ascii_lowercase();
        let contains_any = |needles: &[&str]| needles.iter().any(|n| lower.contains(n));

        if local_name.ends_with("TextBlock") || lower.contains("policytext") {
            Self::TextBlock
        } else if contains_any(&["pershare", "eps"]) {
            Self::PerShare
        } else if contains_any(&["shares", "stockissued", "sharesoutstanding"]) {
            Self::Shares
        } else if has_word_prefix(local_name, "Is")
            || has_word_prefix(local_name, "Has")
            || lower.ends_with("flag")
            || lower.ends_with("indicator")
        {
            Self::Boolean
        } else if lower.ends_with("date") || contains_any(DATE_KEYWORDS) {
            Self::Date
        } else if contains_any(&["ratio", "percentage", "percent", "rate"]) {
            Self::Pure
        } else if contains_any(MONETARY_KEYWORDS) {
            Self::Monetary
        } else if contains_any(&["count", "number", "quantity"]) {
            Self::Integer
        } else if contains_any(STRING_KEYWORDS) {
            Self::String
        } else {
            Self::Unknown
        }
    }

    /// Maps a schema `type` attribute (e.g. `xbrli:monetaryItemType`) to a fact type.
    #[must_use]
    pub fn from_xsd_type(type_name: &str) -> Self {
        let local = type_name.rsplit(':').next().unwrap_or(type_name);
        match local {
            "monetaryItemType" => Self::Monetary,
            "sharesItemType" => Self::Shares,
            "perShareItemType" => Self::PerShare,
            "pureItemType" | "percentItemType" => Self::Pure,
            "decimalItemType" | "floatItemType" | "doubleItemType" | "areaItemType"
            | "volumeItemType" | "massItemType" | "energyItemType" | "lengthItemType" => {
                Self::Decimal
            }
            "integerItemType"
            | "nonNegativeIntegerItemType"
            | "positiveIntegerItemType"
            | "nonPositiveIntegerItemType"
            | "negativeIntegerItemType"
            | "intItemType"
            | "longItemType"
            | "shortItemType" => Self::Integer,
            "booleanItemType" => Self::Boolean,
            "dateItemType" | "dateTimeItemType" | "gYearItemType" | "gMonthDayItemType"
            | "gYearMonthItemType" | "dateUnionItemType" => Self::Date,
            "textBlockItemType" | "escapedItemType" => Self::TextBlock,
            "domainItemType" => Self::DomainMember,
            "stringItemType"
            | "normalizedStringItemType"
            | "tokenItemType"
            | "anyURIItemType"
            | "internationalNameItemType"
            | "centralIndexKeyItemType"
            | "fiscalPeriodItemType"
            | "submissionTypeItemType"
            | "edgarExchangeCodeItemType"
            | "fileNumberItemType"
            | "filerCategoryItemType"
            | "stateOrProvinceItemType"
            | "tradingSymbolItemType"
            | "gMonthItemType"
            | "gDayItemType" => Self::String,
            _ => Self::Unknown,
        }
    }
}

/// True when `name` starts with `prefix` followed by an upper-case letter,
/// so `IsEntityFiler` matches `Is` while `IssuanceOfDebt` does not.
fn has_word_prefix(name: &str, prefix: &str) -> bool {
    name.strip_prefix(prefix)
        .and_then(|rest| rest.chars().next())
        .is_some_and(char::is_uppercase)
}

impl fmt::Display for FactType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Monetary => "MONETARY",
            Self::Decimal => "DECIMAL",
            Self::Integer => "INTEGER",
            Self::String => "STRING",
            Self::Boolean => "BOOLEAN",
            Self::Date => "DATE",
            Self::Shares => "SHARES",
            Self::Pure => "PURE",
            Self::PerShare => "PER_SHARE",
            Self::TextBlock => "TEXT_BLOCK",
            Self::DomainMember => "DOMAIN_MEMBER",
            Self::Unknown => "UNKNOWN",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("AccountingPoliciesTextBlock", FactType::TextBlock)]
    #[case("RevenueRecognitionPolicyTextBlock", FactType::TextBlock)]
    #[case("EarningsPerShareBasic", FactType::PerShare)]
    #[case("IncomeLossPerShareDiluted", FactType::PerShare)]
    #[case("EntityCommonStockSharesOutstanding", FactType::Shares)]
    #[case("StockIssuedDuringPeriodValueNewIssues", FactType::Shares)]
    #[case("AmendmentFlag", FactType::Boolean)]
    #[case("IsEntityEmergingGrowthCompany", FactType::Boolean)]
    #[case("DocumentPeriodEndDate", FactType::Date)]
    #[case("EffectiveIncomeTaxRateReconciliationAtFederalStatutoryIncomeTaxRate", FactType::Pure)]
    #[case("Assets", FactType::Monetary)]
    #[case("NetIncomeLoss", FactType::Monetary)]
    #[case("NumberOfReportableSegments", FactType::Integer)]
    #[case("EntityRegistrantName", FactType::String)]
    #[case("DocumentType", FactType::Unknown)]
    fn test_infer(#[case] name: &str, #[case] expected: FactType) {
        assert_eq!(FactType::infer(name), expected);
    }

    #[test]
    fn test_shares_precede_monetary() {
        // "Value" would match the monetary rule, shares wins by precedence.
        assert_eq!(
            FactType::infer("WeightedAverageNumberOfSharesOutstandingBasic"),
            FactType::Shares
        );
        assert_eq!(FactType::infer("SharesOutstanding"), FactType::Shares);
    }

    #[test]
    fn test_text_block_precedes_everything() {
        assert_eq!(
            FactType::infer("EarningsPerShareTextBlock"),
            FactType::TextBlock
        );
    }

    #[rstest]
    #[case("HasSubsidiaries", FactType::Boolean)]
    #[case("IsEntityFiler", FactType::Boolean)]
    #[case("IssuanceOfDebt", FactType::Monetary)]
    #[case("HashRate", FactType::Pure)]
    #[case("isPrimary", FactType::Unknown)]
    fn test_is_prefix_requires_word_boundary(#[case] name: &str, #[case] expected: FactType) {
        assert_eq!(FactType::infer(name), expected);
    }

    #[test]
    fn test_numeric_classification() {
        assert!(FactType::Monetary.is_numeric());
        assert!(FactType::Shares.is_numeric());
        assert!(FactType::Pure.is_numeric());
        assert!(!FactType::PerShare.is_numeric());
        assert!(FactType::PerShare.is_quantitative());
        assert!(!FactType::TextBlock.is_quantitative());
    }

    #[rstest]
    #[case("xbrli:monetaryItemType", FactType::Monetary)]
    #[case("num:perShareItemType", FactType::PerShare)]
    #[case("xbrli:sharesItemType", FactType::Shares)]
    #[case("dtr-types:percentItemType", FactType::Pure)]
    #[case("dtr-types:textBlockItemType", FactType::TextBlock)]
    #[case("dtr-types:domainItemType", FactType::DomainMember)]
    #[case("xbrli:booleanItemType", FactType::Boolean)]
    #[case("xbrli:stringItemType", FactType::String)]
    #[case("custom:somethingElse", FactType::Unknown)]
    fn test_from_xsd_type(#[case] type_name: &str, #[case] expected: FactType) {
        assert_eq!(FactType::from_xsd_type(type_name), expected);
    }
}
